//! The three phases of one growth step.
//!
//! A step of [`crate::graph::GrowthGraph::grow`] runs:
//! 1. [`attraction_phase`]: every leaf looks up the tips it pulls on and
//!    adds its pull to their accumulators in the [`InfluenceBuffer`].
//! 2. [`growth_phase`]: every influenced tip grows one new segment and,
//!    together with it, is carried into a freshly built [`ActiveTips`].
//! 3. [`kill_phase`]: leaves that were reached are removed (closed modes
//!    also attach connector segments ending at the leaf).

use glam::Vec2;
use log::trace;
use rand::Rng;

use crate::{
    config::{Gravity, GrowthMode},
    geometry::{Area, Circle, clamp, map_linear, random_unit_vector},
    graph::GrowthParams,
    influence_buffer::{InfluenceBuffer, Tip},
    quadtree::Quadtree,
    tree::SegmentTree,
    types::{SegmentId, TipId},
};

/// Capacity of the per-step tip quadtree.
const TIP_CAPACITY: usize = 8;
/// Depth limit of the per-step tip quadtree.
const TIP_MAX_DEPTH: u32 = 3;

/// Tips that may grow during one step, indexed by their origin.
#[derive(Debug)]
pub struct ActiveTips {
    pub tips: InfluenceBuffer,
    pub index: Quadtree<TipId>,
}

impl ActiveTips {
    pub fn new(area: Area) -> Self {
        Self {
            tips: InfluenceBuffer::new(),
            index: Quadtree::new(area, TIP_CAPACITY, TIP_MAX_DEPTH),
        }
    }

    /// Adds `tip`, located at `origin`. Tips outside the area are dropped.
    pub fn insert(&mut self, origin: Vec2, tip: Tip) -> Option<TipId> {
        if !self.index.area().contains(origin) {
            return None;
        }
        let id = self.tips.carry(tip);
        self.index.insert(origin, id);
        Some(id)
    }

    /// Adds a fresh tip for `segment`.
    pub fn insert_segment(&mut self, tree: &SegmentTree, segment: SegmentId, max_children: Option<usize>) -> Option<TipId> {
        let s = &tree[segment];
        self.insert(
            s.origin,
            Tip {
                segment,
                direction: s.direction,
                new_direction: s.direction,
                interactions: 0,
                max_children,
                reached: false,
            },
        )
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }
}

/// What the attraction phase found.
#[derive(Debug, Default)]
pub struct Attraction {
    /// At least one leaf had a tip in reach (and, in closed modes, an
    /// unreached one).
    pub found_one: bool,
    /// Open mode: per leaf, whether it was consumed.
    pub consumed: Vec<bool>,
    /// Closed modes: leaves with a non-empty neighbourhood and that
    /// neighbourhood.
    pub interacting_leaves: Vec<(usize, Vec<TipId>)>,
}

/// Adds the gravity pull at `position` to `direction`.
pub fn add_gravity(gravity: Option<&Gravity>, position: Vec2, direction: Vec2) -> Vec2 {
    let Some((gravity, point)) = gravity.and_then(|g| g.point.map(|p| (g, p))) else {
        return direction;
    };

    let to_point = point - position;
    let distance = to_point.length();

    let factor = map_linear(
        clamp(distance, gravity.min_range, gravity.max_range),
        gravity.min_range,
        gravity.max_range,
        gravity.min,
        gravity.max,
    );
    let force = factor.powf(gravity.pow);

    direction + to_point.normalize_or_zero() * force
}

/// Direction a tip at `origin` heading `direction` wants to take towards
/// `leaf`, before accumulation.
fn desired_direction(
    params: &GrowthParams,
    gravity: Option<&Gravity>,
    origin: Vec2,
    direction: Vec2,
    leaf: Vec2,
) -> Vec2 {
    let dynamics = params.dynamics.eval(origin);
    let towards = (leaf - origin).normalize_or_zero();
    add_gravity(gravity, origin, direction.lerp(towards, dynamics))
}

#[inline]
fn is_full(tree: &SegmentTree, tip: &Tip) -> bool {
    tip.max_children
        .is_some_and(|max| tree[tip.segment].children.len() >= max)
}

/// Closest tip to `leaf` that can still take children, within
/// `max_distance(leaf)`.
pub fn closest_tip(
    tree: &SegmentTree,
    active: &ActiveTips,
    params: &GrowthParams,
    leaf: Vec2,
) -> Option<TipId> {
    let max_distance = params.max_distance.eval(leaf);
    let mut min_dist_sq = max_distance * max_distance;
    let mut closest = None;

    active
        .index
        .circle_query_with(&Circle::around(leaf, max_distance), &mut |entry| {
            if is_full(tree, active.tips.get(entry.data)) {
                return;
            }
            let dist_sq = leaf.distance_squared(entry.point);
            if dist_sq < min_dist_sq {
                closest = Some(entry.data);
                min_dist_sq = dist_sq;
            }
        });

    closest
}

/// Tips in the relative neighbourhood of `leaf`.
///
/// A tip `t` within `max_distance(leaf)` is a neighbour unless another
/// nearby tip `o` is at least as close to the leaf and closer to `t` than
/// the leaf is. Full tips are never neighbours but still shadow others.
pub fn relative_neighbors(
    tree: &SegmentTree,
    active: &ActiveTips,
    params: &GrowthParams,
    leaf: Vec2,
) -> Vec<TipId> {
    let max_distance = params.max_distance.eval(leaf);
    let nearby = active.index.circle_query(&Circle::around(leaf, max_distance));

    let mut neighbors = Vec::new();
    for (i, candidate) in nearby.iter().enumerate() {
        if is_full(tree, active.tips.get(candidate.data)) {
            continue;
        }

        let leaf_to_candidate = candidate.point.distance_squared(leaf);
        let shadowed = nearby.iter().enumerate().any(|(j, other)| {
            if i == j {
                return false;
            }
            let leaf_to_other = other.point.distance_squared(leaf);
            leaf_to_other <= leaf_to_candidate
                && leaf_to_candidate > candidate.point.distance_squared(other.point)
        });

        if !shadowed {
            neighbors.push(candidate.data);
        }
    }
    neighbors
}

/// Accumulates the pull of every leaf onto the tips it reaches.
///
/// Leaves are visited from last to first. In open mode a leaf pulls on its
/// [`closest_tip`], or is marked consumed when that tip is already within
/// `min_distance(tip)`. In the closed modes a leaf pulls on its
/// [`relative_neighbors`]; neighbours within kill distance are flagged
/// `reached` instead.
///
/// ### Parameters
/// - `tree` - Segment tree; read for tip positions and child counts.
/// - `leaves` - Unconsumed leaves.
/// - `active` - Tips of this step; their accumulators are updated.
/// - `params` - Growth fields and mode.
/// - `gravity` - Optional gravity added to every pull.
pub fn attraction_phase(
    tree: &SegmentTree,
    leaves: &[Vec2],
    active: &mut ActiveTips,
    params: &GrowthParams,
    gravity: Option<&Gravity>,
) -> Attraction {
    let mut attraction = Attraction {
        found_one: false,
        consumed: vec![false; leaves.len()],
        interacting_leaves: Vec::new(),
    };

    for (i, &leaf) in leaves.iter().enumerate().rev() {
        match params.mode {
            GrowthMode::Open => {
                let Some(id) = closest_tip(tree, active, params, leaf) else {
                    continue;
                };
                attraction.found_one = true;

                let segment = &tree[active.tips.get(id).segment];
                let min_distance = params.min_distance.eval(segment.origin);

                if leaf.distance_squared(segment.origin) < min_distance * min_distance {
                    attraction.consumed[i] = true;
                } else {
                    let dir = desired_direction(params, gravity, segment.origin, segment.direction, leaf);
                    active.tips.add(id, dir);
                }
            }

            GrowthMode::Closed | GrowthMode::BrokenClosed => {
                let neighbors = relative_neighbors(tree, active, params, leaf);

                for &id in &neighbors {
                    let segment = &tree[active.tips.get(id).segment];
                    let min_distance = params.min_distance.eval(segment.origin);

                    if leaf.distance_squared(segment.origin) < min_distance * min_distance {
                        active.tips.get_mut(id).reached = true;

                        let has_open_neighbor = neighbors.iter().any(|&n| {
                            let tip = active.tips.get(n);
                            !tip.reached && tree[tip.segment].children.is_empty()
                        });
                        if has_open_neighbor {
                            active.tips.mark_influenced(id);
                        }
                        continue;
                    }

                    if !active.tips.get(id).reached {
                        attraction.found_one = true;
                    }

                    let dir = desired_direction(params, gravity, segment.origin, segment.direction, leaf);
                    active.tips.add(id, dir);
                }

                if !neighbors.is_empty() {
                    attraction.interacting_leaves.push((i, neighbors));
                }
            }
        }
    }

    attraction
}

/// Grows one segment from every influenced tip and builds the tip set of
/// the next step.
///
/// Tips that were not influenced this step are not carried over. In the
/// closed modes, reached tips deeper than `min_depth` stop growing: they
/// are carried unchanged ([`GrowthMode::Closed`]) or dropped
/// ([`GrowthMode::BrokenClosed`]).
///
/// ### Returns
/// The next step's tips and the ids of the segments created, in creation
/// order.
pub fn growth_phase(
    tree: &mut SegmentTree,
    active: &mut ActiveTips,
    params: &GrowthParams,
    rng: &mut impl Rng,
) -> (ActiveTips, Vec<SegmentId>) {
    let mut next = ActiveTips::new(active.index.area());
    let mut new_segments = Vec::with_capacity(16);

    let influenced: Vec<TipId> = active.tips.influenced_indices().collect();
    for id in influenced {
        let tip = active.tips.get(id);
        let (origin, depth) = {
            let segment = &tree[tip.segment];
            (segment.origin, segment.depth)
        };

        if tip.reached && depth > params.min_depth {
            if params.mode != GrowthMode::BrokenClosed {
                next.insert(origin, tip.clone());
            }
            continue;
        }

        let dir = active.tips.normalized_dir(id);
        let step_size = params.step_size.eval(origin);
        let random_deviation = params.random_deviation.eval(origin);

        let position = origin + dir * step_size + random_unit_vector(rng) * random_deviation;
        let child = tree.add_child(tip.segment, position, dir);

        active.tips.reset(id);
        next.insert(origin, active.tips.get(id).clone());
        next.insert_segment(tree, child, params.max_children);
        new_segments.push(child);
    }

    trace!(
        "growth phase: {} new segments, {} active tips",
        new_segments.len(),
        next.len()
    );
    (next, new_segments)
}

/// Removes reached leaves from `leaves`, appending them to `consumed`.
///
/// Closed modes decide here: walking a leaf's neighbourhood in order, the
/// walk stops at the first unreached tip and the leaf survives; every
/// reached tip seen before that and within `min_distance` gets a connector
/// segment ending exactly at the leaf. The leaf is consumed if all its
/// neighbours were reached and at least one was close enough.
///
/// ### Returns
/// Ids of the connector segments created.
pub fn kill_phase(
    tree: &mut SegmentTree,
    leaves: &mut Vec<Vec2>,
    consumed: &mut Vec<Vec2>,
    attraction: Attraction,
    active: &ActiveTips,
    params: &GrowthParams,
) -> Vec<SegmentId> {
    let Attraction {
        consumed: mut is_consumed,
        interacting_leaves,
        ..
    } = attraction;
    let mut connectors = Vec::new();

    for (i, neighbors) in interacting_leaves {
        let leaf = leaves[i];
        let mut all_reached = true;
        let mut one_in_kill_distance = false;

        for id in neighbors {
            let tip = active.tips.get(id);
            if !tip.reached {
                all_reached = false;
                break;
            }

            let origin = tree[tip.segment].origin;
            let min_distance = params.min_distance.eval(origin);
            if leaf.distance_squared(origin) <= min_distance * min_distance {
                one_in_kill_distance = true;
                connectors.push(tree.add_child(tip.segment, leaf, tip.new_direction.normalize_or_zero()));
            }
        }

        is_consumed[i] = all_reached && one_in_kill_distance;
    }

    let mut index = 0;
    leaves.retain(|leaf| {
        let keep = !is_consumed[index];
        if !keep {
            consumed.push(*leaf);
        }
        index += 1;
        keep
    });

    connectors
}
