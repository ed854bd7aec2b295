use crate::types::{SegmentId, TipId};
use glam::Vec2;

/// Growth state of one active tip during a single step.
///
/// `new_direction` starts out as the segment's own direction, so the
/// accumulated sum is always biased towards continuing straight.
#[derive(Clone, Debug, PartialEq)]
pub struct Tip {
    pub segment: SegmentId,
    /// Segment direction at the time the tip was created.
    pub direction: Vec2,
    pub new_direction: Vec2,
    pub interactions: u32,
    /// `None` means unlimited children.
    pub max_children: Option<usize>,
    /// Closed modes only: a leaf came within kill distance of this tip.
    pub reached: bool,
}

/// Tips that are allowed to grow during one step, with their accumulated
/// directional influence.
///
/// The per-step quadtree stores [`TipId`]s into this buffer. A fresh buffer
/// is built for every step; tips carried over from the previous step are
/// moved into it with [`InfluenceBuffer::carry`].
///
/// Tips that received at least one influence are remembered in the order
/// of their first influence, which is the order the growth phase visits
/// them in.
#[derive(Debug, Default)]
pub struct InfluenceBuffer {
    tips: Vec<Tip>,
    influenced: Vec<TipId>,
    is_influenced: Vec<bool>,
}

impl InfluenceBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty buffer with room for `len` tips.
    ///
    /// ### Parameters
    /// - `len` - Number of tips expected this step.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            tips: Vec::with_capacity(len),
            influenced: Vec::with_capacity(len),
            is_influenced: Vec::with_capacity(len),
        }
    }

    /// Registers a new tip for `segment`.
    ///
    /// ### Parameters
    /// - `segment` - The segment whose end grows.
    /// - `direction` - The segment's direction; also the starting value of
    ///   the accumulator.
    /// - `max_children` - Child limit, `None` for unlimited.
    ///
    /// ### Returns
    /// The id of the new tip.
    pub fn push(&mut self, segment: SegmentId, direction: Vec2, max_children: Option<usize>) -> TipId {
        self.carry(Tip {
            segment,
            direction,
            new_direction: direction,
            interactions: 0,
            max_children,
            reached: false,
        })
    }

    /// Moves an existing tip (with its `reached` flag and counters) into
    /// this buffer.
    pub fn carry(&mut self, tip: Tip) -> TipId {
        let id = self.tips.len();
        self.tips.push(tip);
        self.is_influenced.push(false);
        id
    }

    #[inline]
    pub fn get(&self, id: TipId) -> &Tip {
        &self.tips[id]
    }

    #[inline]
    pub fn get_mut(&mut self, id: TipId) -> &mut Tip {
        &mut self.tips[id]
    }

    /// Adds one directional influence to a tip.
    ///
    /// `dir` is added to the accumulator, the interaction counter is
    /// incremented and the tip is marked as influenced.
    ///
    /// ### Panics
    /// Panics if `id` is out of bounds.
    #[inline]
    pub fn add(&mut self, id: TipId, dir: Vec2) {
        let tip = &mut self.tips[id];
        tip.new_direction += dir;
        tip.interactions += 1;
        self.mark_influenced(id);
    }

    /// Marks a tip as taking part in the growth phase without adding any
    /// direction to it.
    pub fn mark_influenced(&mut self, id: TipId) {
        if !self.is_influenced[id] {
            self.is_influenced[id] = true;
            self.influenced.push(id);
        }
    }

    #[inline]
    pub fn is_influenced(&self, id: TipId) -> bool {
        self.is_influenced[id]
    }

    /// Influenced tips in the order they were first influenced.
    pub fn influenced_indices(&self) -> impl Iterator<Item = TipId> + '_ {
        self.influenced.iter().copied()
    }

    /// Normalized accumulated direction of a tip (zero if it cancelled out).
    #[inline]
    pub fn normalized_dir(&self, id: TipId) -> Vec2 {
        self.tips[id].new_direction.normalize_or_zero()
    }

    /// Restores the accumulator of a tip to its segment direction once it
    /// has grown.
    pub fn reset(&mut self, id: TipId) {
        let tip = &mut self.tips[id];
        tip.new_direction = tip.direction;
        tip.interactions = 0;
    }

    pub fn len(&self) -> usize {
        self.tips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tips.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tip> {
        self.tips.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_starts_accumulator_at_segment_direction() {
        let mut buf = InfluenceBuffer::new();
        let id = buf.push(7, Vec2::X, Some(3));

        let tip = buf.get(id);
        assert_eq!(tip.segment, 7);
        assert_eq!(tip.new_direction, Vec2::X);
        assert_eq!(tip.interactions, 0);
        assert!(!tip.reached);
        assert!(!buf.is_influenced(id));
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn add_accumulates_and_counts() {
        let mut buf = InfluenceBuffer::with_capacity(2);
        let a = buf.push(0, Vec2::X, None);
        let b = buf.push(1, Vec2::Y, None);

        buf.add(a, Vec2::new(0.0, 1.0));
        buf.add(a, Vec2::new(0.0, 1.0));

        assert_eq!(buf.get(a).new_direction, Vec2::new(1.0, 2.0));
        assert_eq!(buf.get(a).interactions, 2);
        assert!(buf.is_influenced(a));
        assert!(!buf.is_influenced(b));
    }

    #[test]
    fn influenced_indices_follow_first_influence_order() {
        let mut buf = InfluenceBuffer::new();
        for i in 0..4 {
            buf.push(i, Vec2::X, None);
        }
        buf.add(2, Vec2::X);
        buf.add(0, Vec2::X);
        buf.add(2, Vec2::X);
        buf.mark_influenced(3);

        let ids: Vec<TipId> = buf.influenced_indices().collect();
        assert_eq!(ids, vec![2, 0, 3]);
    }

    #[test]
    fn normalized_dir_handles_cancellation() {
        let mut buf = InfluenceBuffer::new();
        let id = buf.push(0, Vec2::X, None);
        buf.add(id, Vec2::new(-1.0, 0.0));
        assert_eq!(buf.normalized_dir(id), Vec2::ZERO);

        buf.add(id, Vec2::new(0.0, 3.0));
        assert_eq!(buf.normalized_dir(id), Vec2::Y);
    }

    #[test]
    fn reset_keeps_reached_flag_but_clears_accumulator() {
        let mut buf = InfluenceBuffer::new();
        let id = buf.push(4, Vec2::Y, Some(1));
        buf.add(id, Vec2::X);
        buf.get_mut(id).reached = true;
        buf.reset(id);

        let mut next = InfluenceBuffer::new();
        let carried = next.carry(buf.get(id).clone());
        let tip = next.get(carried);
        assert_eq!(tip.segment, 4);
        assert_eq!(tip.new_direction, Vec2::Y);
        assert_eq!(tip.interactions, 0);
        assert!(tip.reached);
        assert!(!next.is_influenced(carried));
    }
}
