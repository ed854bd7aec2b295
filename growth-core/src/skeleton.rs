//! Skeleton simplification of a grown tree.
//!
//! Runs of single-child segments that barely turn are merged into one
//! segment. The input tree is left untouched; a new [`SegmentTree`] is
//! built instead.

use std::f32::consts::PI;

use crate::{
    tree::{Segment, SegmentTree},
    types::SegmentId,
};

/// Largest turn angle (radians, `0..=2π`) that is still merged.
pub enum SkeletonThreshold<'a> {
    Constant(f32),
    /// Called with the child segment about to be merged and the largest
    /// depth of the tree.
    Varying(&'a dyn Fn(&Segment, u32) -> f32),
}

impl SkeletonThreshold<'_> {
    fn eval(&self, child: &Segment, max_depth: u32) -> f32 {
        match self {
            Self::Constant(t) => *t,
            Self::Varying(f) => f(child, max_depth),
        }
    }
}

impl From<f32> for SkeletonThreshold<'_> {
    fn from(t: f32) -> Self {
        Self::Constant(t)
    }
}

/// Turn angle between two unit directions, `π * (1 - a·b)`.
#[inline]
pub fn turn_angle(a: glam::Vec2, b: glam::Vec2) -> f32 {
    PI * (1.0 - a.dot(b))
}

/// Builds the simplified copy of the subtree below `root`.
///
/// From every kept segment, single-child chains are followed while the
/// turn angle to the next segment stays within the threshold. The kept
/// segment then takes the origin, direction and children of the last
/// segment of the chain. Segments with several children end a chain.
///
/// Depths of the source tree should be current (see
/// [`SegmentTree::calculate_depths`]) when a [`SkeletonThreshold::Varying`]
/// threshold reads them.
///
/// ### Returns
/// The simplified tree; its root has id 0. Empty if `root` is not in `tree`.
pub fn to_skeleton(tree: &SegmentTree, root: SegmentId, threshold: &SkeletonThreshold) -> SegmentTree {
    let mut skeleton = SegmentTree::new();
    if tree.get(root).is_none() {
        return skeleton;
    }

    let max_depth = tree.max_depth().unwrap_or(0);
    let mut stack: Vec<(SegmentId, Option<SegmentId>)> = vec![(root, None)];

    while let Some((start, parent)) = stack.pop() {
        let mut current = start;
        while let [child] = tree[current].children[..] {
            let angle = turn_angle(tree[current].direction, tree[child].direction);
            if angle > threshold.eval(&tree[child], max_depth) {
                break;
            }
            current = child;
        }

        let end = &tree[current];
        let id = match parent {
            None => skeleton.add_root(end.origin, end.direction),
            Some(parent) => skeleton.add_child(parent, end.origin, end.direction),
        };
        stack.extend(end.children.iter().rev().map(|&c| (c, Some(id))));
    }

    skeleton
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::cell::Cell;

    #[test]
    fn straight_chain_collapses_to_its_end() {
        let mut tree = SegmentTree::new();
        let mut last = tree.add_root(Vec2::ZERO, Vec2::X);
        for i in 1..=5 {
            last = tree.add_child(last, Vec2::new(i as f32, 0.0), Vec2::X);
        }

        let skeleton = to_skeleton(&tree, 0, &SkeletonThreshold::Constant(0.01));
        assert_eq!(skeleton.len(), 1);
        assert_eq!(skeleton[0].origin, Vec2::new(5.0, 0.0));
        assert!(skeleton[0].children.is_empty());

        // A negative threshold never merges.
        let copy = to_skeleton(&tree, 0, &SkeletonThreshold::Constant(-1.0));
        assert_eq!(copy.len(), tree.len());
        assert_eq!(copy[5].origin, tree[last].origin);
    }

    #[test]
    fn branch_points_end_chains() {
        let mut tree = SegmentTree::new();
        let root = tree.add_root(Vec2::ZERO, Vec2::X);
        let a = tree.add_child(root, Vec2::new(1.0, 0.0), Vec2::X);
        let b = tree.add_child(a, Vec2::new(2.0, 0.0), Vec2::X);
        tree.add_child(b, Vec2::new(2.0, 1.0), Vec2::Y);
        let d = tree.add_child(b, Vec2::new(3.0, 0.0), Vec2::X);
        tree.add_child(d, Vec2::new(4.0, 0.0), Vec2::X);

        let skeleton = to_skeleton(&tree, root, &SkeletonThreshold::Constant(0.01));
        assert_eq!(skeleton.len(), 3);
        assert_eq!(skeleton[0].origin, Vec2::new(2.0, 0.0));
        assert_eq!(skeleton[0].children, vec![1, 2]);
        assert_eq!(skeleton[1].origin, Vec2::new(2.0, 1.0));
        assert_eq!(skeleton[2].origin, Vec2::new(4.0, 0.0));
        assert_eq!(skeleton[2].depth, 1);
    }

    #[test]
    fn sharp_turns_are_kept() {
        let mut tree = SegmentTree::new();
        let root = tree.add_root(Vec2::ZERO, Vec2::X);
        let a = tree.add_child(root, Vec2::new(1.0, 0.0), Vec2::X);
        let b = tree.add_child(a, Vec2::new(1.0, 1.0), Vec2::Y);
        tree.add_child(b, Vec2::new(1.0, 2.0), Vec2::Y);

        // Right angle: π/2 > 0.1.
        let skeleton = to_skeleton(&tree, root, &SkeletonThreshold::Constant(0.1));
        assert_eq!(skeleton.len(), 2);
        assert_eq!(skeleton[0].origin, Vec2::new(1.0, 0.0));
        assert_eq!(skeleton[0].direction, Vec2::X);
        assert_eq!(skeleton[1].origin, Vec2::new(1.0, 2.0));
        assert_eq!(skeleton[1].direction, Vec2::Y);
        assert_eq!(skeleton[1].parent, Some(0));

        // Anything up to a full reversal merges with a 2π threshold.
        let merged = to_skeleton(&tree, root, &(2.0 * PI).into());
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn varying_threshold_sees_depths() {
        let mut tree = SegmentTree::new();
        let root = tree.add_root(Vec2::ZERO, Vec2::X);
        let a = tree.add_child(root, Vec2::new(1.0, 0.0), Vec2::X);
        let b = tree.add_child(a, Vec2::new(2.0, 0.0), Vec2::X);
        tree.add_child(b, Vec2::new(3.0, 0.0), Vec2::X);
        assert_eq!(tree.calculate_depths(root), Some(3));

        let calls = Cell::new(0);
        // Only merge segments in the upper half of the tree.
        let upper_half = |child: &Segment, max_depth: u32| {
            calls.set(calls.get() + 1);
            assert_eq!(max_depth, 3);
            if child.depth * 2 <= max_depth { 1.0_f32 } else { -1.0 }
        };
        let skeleton = to_skeleton(&tree, root, &SkeletonThreshold::Varying(&upper_half));

        assert_eq!(skeleton.len(), 3);
        assert_eq!(skeleton[0].origin, Vec2::new(1.0, 0.0));
        assert_eq!(skeleton[1].origin, Vec2::new(2.0, 0.0));
        assert_eq!(skeleton[2].origin, Vec2::new(3.0, 0.0));
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn missing_root_gives_empty_tree() {
        let tree = SegmentTree::new();
        assert!(to_skeleton(&tree, 0, &SkeletonThreshold::Constant(1.0)).is_empty());
    }
}
