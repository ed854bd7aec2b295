use crate::types::SegmentId;
use glam::Vec2;

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub origin: Vec2,
    pub direction: Vec2,
    pub parent: Option<SegmentId>,
    pub children: Vec<SegmentId>,
    pub depth: u32,
    pub reverse_depth: Option<u32>,
}

/// Arena of [`Segment`]s forming a single rooted tree.
///
/// Segments are only ever appended; the host reads them through shared
/// references and cannot rewire the structure.
#[derive(Clone, Debug, Default)]
pub struct SegmentTree {
    segments: Vec<Segment>,
    max_depth: Option<u32>,
}

impl Segment {
    pub fn new_root(origin: Vec2, direction: Vec2) -> Self {
        Self {
            origin,
            direction,
            parent: None,
            children: Vec::with_capacity(2),
            depth: 0,
            reverse_depth: None,
        }
    }

    pub fn new_child(origin: Vec2, direction: Vec2, parent: SegmentId, parent_depth: u32) -> Self {
        Self {
            origin,
            direction,
            parent: Some(parent),
            children: Vec::with_capacity(2),
            depth: parent_depth + 1,
            reverse_depth: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl SegmentTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every segment. Previously handed out ids become invalid.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.max_depth = None;
    }

    pub fn add_root(&mut self, origin: Vec2, direction: Vec2) -> SegmentId {
        let id = self.segments.len();
        self.segments.push(Segment::new_root(origin, direction));
        id
    }

    pub fn add_child(&mut self, parent: SegmentId, origin: Vec2, direction: Vec2) -> SegmentId {
        let id = self.segments.len();
        let depth = self.segments[parent].depth;
        self.segments.push(Segment::new_child(origin, direction, parent, depth));
        self.segments[parent].children.push(id);
        id
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Pre-order depth-first walk starting at `root`.
    ///
    /// The callback receives the segment id, the segment, its parent (if
    /// any) and the distance from `root` (0 for `root` itself). Children
    /// are visited in insertion order.
    pub fn traverse(
        &self,
        root: SegmentId,
        mut callback: impl FnMut(SegmentId, &Segment, Option<&Segment>, u32),
    ) {
        if root >= self.segments.len() {
            return;
        }

        let mut stack = vec![(root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let segment = &self.segments[id];
            let parent = if id == root {
                None
            } else {
                segment.parent.map(|p| &self.segments[p])
            };
            callback(id, segment, parent, depth);

            stack.extend(segment.children.iter().rev().map(|&c| (c, depth + 1)));
        }
    }

    /// Re-stamps `depth` (distance from `root`) and `reverse_depth` (number
    /// of segments on the longest path down to a tip, 1 for a tip) of every
    /// segment below `root`, and records the largest depth.
    pub fn calculate_depths(&mut self, root: SegmentId) -> Option<u32> {
        let mut order = Vec::with_capacity(self.segments.len());
        let mut max_depth = None;
        self.traverse(root, |id, _, _, depth| {
            order.push((id, depth));
            max_depth = Some(max_depth.map_or(depth, |m: u32| m.max(depth)));
        });

        for &(id, depth) in &order {
            self.segments[id].depth = depth;
        }

        // Reverse pre-order visits every child before its parent.
        for &(id, _) in order.iter().rev() {
            let below = self.segments[id]
                .children
                .iter()
                .filter_map(|&c| self.segments[c].reverse_depth)
                .max()
                .unwrap_or(0);
            self.segments[id].reverse_depth = Some(below + 1);
        }

        self.max_depth = max_depth;
        max_depth
    }

    /// Largest depth found by the last [`SegmentTree::calculate_depths`].
    pub fn max_depth(&self) -> Option<u32> {
        self.max_depth
    }
}

impl std::ops::Index<SegmentId> for SegmentTree {
    type Output = Segment;

    fn index(&self, id: SegmentId) -> &Segment {
        &self.segments[id]
    }
}

/// Host-owned per-segment values (line thickness, colour, ...), kept out
/// of [`Segment`] so the core never sees them.
#[derive(Clone, Debug)]
pub struct SideTable<T> {
    values: Vec<Option<T>>,
}

impl<T> Default for SideTable<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T> SideTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: SegmentId) -> Option<&T> {
        self.values.get(id).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: SegmentId) -> Option<&mut T> {
        self.values.get_mut(id).and_then(Option::as_mut)
    }

    pub fn insert(&mut self, id: SegmentId, value: T) -> Option<T> {
        if id >= self.values.len() {
            self.values.resize_with(id + 1, || None);
        }
        self.values[id].replace(value)
    }

    /// Value for `id`, inserting `default()` first if there is none.
    pub fn get_or_insert_with(&mut self, id: SegmentId, default: impl FnOnce() -> T) -> &mut T {
        if id >= self.values.len() {
            self.values.resize_with(id + 1, || None);
        }
        self.values[id].get_or_insert_with(default)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }
}
