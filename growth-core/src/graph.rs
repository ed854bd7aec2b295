//! Space-colonization growth graph.
//!
//! A [`GrowthGraph`] grows a tree of [`Segment`]s from a root towards a set
//! of leaves (attraction points). Each [`GrowthGraph::grow`] call is one
//! discrete step (see [`crate::phases`]); once no leaf can reach any tip
//! the graph is exhausted and further steps do nothing.
//!
//! The tip index is rebuilt from scratch every step rather than updated
//! in place, so the quadtree never needs to support deletion.
//!
//! Partly inspired by <https://github.com/jasonwebb/2d-space-colonization-experiments>.

use glam::Vec2;
use log::debug;
use rand::Rng;

use crate::{
    config::{Gravity, GrowthConfig, GrowthMode},
    field::{HeightMap, ScalarField},
    geometry::Area,
    influence_buffer::InfluenceBuffer,
    phases::{self, ActiveTips},
    quadtree::Quadtree,
    skeleton::{self, SkeletonThreshold},
    tree::{Segment, SegmentTree},
    types::{SegmentId, TipId},
};

/// Growth tunables of one graph.
///
/// The five fields are evaluated at the *tip* origin, except
/// `max_distance`, which is evaluated at the leaf.
#[derive(Clone, Debug)]
pub struct GrowthParams {
    /// A leaf closer than this to its tip is consumed.
    pub min_distance: ScalarField,
    /// Reach of a leaf.
    pub max_distance: ScalarField,
    /// 0 keeps the tip direction, 1 points straight at the leaf.
    pub dynamics: ScalarField,
    pub step_size: ScalarField,
    /// Length of the random offset added to every new segment.
    pub random_deviation: ScalarField,
    pub mode: GrowthMode,
    /// `None` lets a segment have any number of children.
    pub max_children: Option<usize>,
    pub min_depth: u32,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            min_distance: ScalarField::Constant(5.0),
            max_distance: ScalarField::Constant(100.0),
            dynamics: ScalarField::Constant(1.0),
            step_size: ScalarField::Constant(4.0),
            random_deviation: ScalarField::Constant(0.0),
            mode: GrowthMode::Open,
            max_children: Some(3),
            min_depth: 1,
        }
    }
}

impl GrowthParams {
    /// Maps every configured range over `height_map`.
    pub fn from_config(config: &GrowthConfig, height_map: &HeightMap) -> Self {
        Self {
            min_distance: config.min_distance.field(height_map),
            max_distance: config.max_distance.field(height_map),
            dynamics: config.dynamics.field(height_map),
            step_size: config.step_size.field(height_map),
            random_deviation: config.random_deviation.field(height_map),
            mode: config.mode,
            max_children: config.max_children.max(),
            min_depth: config.min_depth,
        }
    }
}

#[derive(Debug)]
pub struct GrowthGraph {
    params: GrowthParams,
    gravity: Option<Gravity>,

    area: Area,
    leaves: Vec<Vec2>,
    consumed_leaves: Vec<Vec2>,
    exhausted: bool,

    tree: SegmentTree,
    root: Option<SegmentId>,
    active: ActiveTips,
    last_new_segments: Vec<SegmentId>,
}

impl GrowthGraph {
    pub fn new(params: GrowthParams) -> Self {
        let area = Area::default();
        Self {
            params,
            gravity: None,
            area,
            leaves: Vec::new(),
            consumed_leaves: Vec::new(),
            exhausted: false,
            tree: SegmentTree::new(),
            root: None,
            active: ActiveTips::new(area),
            last_new_segments: Vec::new(),
        }
    }

    pub fn set_gravity(&mut self, gravity: Gravity) {
        self.gravity = Some(gravity);
    }

    /// Moves the gravity point. Does nothing if no gravity was set.
    pub fn set_gravity_position(&mut self, point: Vec2) {
        if let Some(gravity) = self.gravity.as_mut() {
            gravity.point = Some(point);
        }
    }

    pub fn unset_gravity_position(&mut self) {
        if let Some(gravity) = self.gravity.as_mut() {
            gravity.point = None;
        }
    }

    pub fn gravity(&self) -> Option<&Gravity> {
        self.gravity.as_ref()
    }

    /// Starts a new tree and runs up to `iterations` growth steps.
    ///
    /// Any previous tree is discarded. The graph takes the leaves over and
    /// consumes them as it grows; tips outside `area` are never indexed.
    ///
    /// ### Parameters
    /// - `leaves` - Attraction points.
    /// - `area` - Bounds of the tip index.
    /// - `origin` - Root position.
    /// - `start_direction` - Root direction; normalized here.
    /// - `iterations` - Steps to run right away (stops early on exhaustion).
    /// - `rng` - Source of the random deviation.
    ///
    /// ### Returns
    /// The id of the root segment.
    pub fn generate(
        &mut self,
        leaves: Vec<Vec2>,
        area: Area,
        origin: Vec2,
        start_direction: Vec2,
        iterations: usize,
        rng: &mut impl Rng,
    ) -> SegmentId {
        self.exhausted = false;
        self.area = area;
        self.leaves = leaves;
        self.consumed_leaves.clear();
        self.last_new_segments.clear();

        self.tree.clear();
        let root = self.tree.add_root(origin, start_direction.normalize_or_zero());
        self.root = Some(root);

        self.active = ActiveTips::new(area);
        self.active
            .insert_segment(&self.tree, root, self.params.max_children);

        debug!(
            "generating growth graph from {origin:?} with {} leaves",
            self.leaves.len()
        );

        for _ in 0..iterations {
            if self.exhausted {
                break;
            }
            self.grow(rng);
        }

        root
    }

    /// Runs one growth step.
    ///
    /// ### Returns
    /// `true` if the graph is exhausted (either already, or because no leaf
    /// reached any tip during this step), `false` otherwise.
    pub fn grow(&mut self, rng: &mut impl Rng) -> bool {
        if self.exhausted {
            return true;
        }

        let attraction = phases::attraction_phase(
            &self.tree,
            &self.leaves,
            &mut self.active,
            &self.params,
            self.gravity.as_ref(),
        );

        if !attraction.found_one {
            debug!(
                "growth graph exhausted: {} segments, {} leaves left",
                self.tree.len(),
                self.leaves.len()
            );
            self.exhausted = true;
            self.last_new_segments.clear();
            return true;
        }

        let (next, mut new_segments) =
            phases::growth_phase(&mut self.tree, &mut self.active, &self.params, rng);

        let connectors = phases::kill_phase(
            &mut self.tree,
            &mut self.leaves,
            &mut self.consumed_leaves,
            attraction,
            &self.active,
            &self.params,
        );
        new_segments.extend(connectors);

        self.active = next;
        self.last_new_segments = new_segments;
        false
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Leaves that have not been consumed yet.
    pub fn leaves(&self) -> &[Vec2] {
        &self.leaves
    }

    pub fn consumed_leaves(&self) -> &[Vec2] {
        &self.consumed_leaves
    }

    /// Index of the tips that may grow in the next step.
    pub fn segments(&self) -> &Quadtree<TipId> {
        &self.active.index
    }

    /// Tips referenced by [`GrowthGraph::segments`].
    pub fn tips(&self) -> &InfluenceBuffer {
        &self.active.tips
    }

    pub fn tree(&self) -> &SegmentTree {
        &self.tree
    }

    pub fn root(&self) -> Option<SegmentId> {
        self.root
    }

    /// Segments created by the last growth step, in creation order.
    pub fn last_new_segments(&self) -> &[SegmentId] {
        &self.last_new_segments
    }

    pub fn area(&self) -> Area {
        self.area
    }

    pub fn params(&self) -> &GrowthParams {
        &self.params
    }

    pub fn mode(&self) -> GrowthMode {
        self.params.mode
    }

    /// Pre-order walk from the root; see [`SegmentTree::traverse`].
    pub fn traverse(&self, callback: impl FnMut(SegmentId, &Segment, Option<&Segment>, u32)) {
        if let Some(root) = self.root {
            self.tree.traverse(root, callback);
        }
    }

    /// Stamps depth and reverse depth on every segment and returns the
    /// largest depth.
    pub fn calculate_depths(&mut self) -> Option<u32> {
        self.root.and_then(|root| self.tree.calculate_depths(root))
    }

    pub fn max_depth(&self) -> Option<u32> {
        self.tree.max_depth()
    }

    /// Simplified copy of the current tree; see [`skeleton::to_skeleton`].
    pub fn to_skeleton(&mut self, threshold: &SkeletonThreshold) -> SegmentTree {
        self.calculate_depths();
        match self.root {
            Some(root) => skeleton::to_skeleton(&self.tree, root, threshold),
            None => SegmentTree::new(),
        }
    }
}
