/// Identifier for a segment in a [`crate::tree::SegmentTree`].
///
/// This is an index into the tree's arena, and is only meaningful within
/// the lifetime of a given tree (it is invalidated by
/// [`crate::tree::SegmentTree::clear`]).
pub type SegmentId = usize;

/// Identifier for an active tip in a [`crate::influence_buffer::InfluenceBuffer`].
///
/// Tip ids are rebuilt every growth step, so they must never be kept
/// across calls to [`crate::graph::GrowthGraph::grow`].
pub type TipId = usize;
