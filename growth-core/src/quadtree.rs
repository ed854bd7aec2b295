//! Point quadtree with per-entry payload and circle queries.
//!
//! The tree never deletes or rebalances. Callers that need a changing set
//! of points (the growth graph) build a fresh tree instead.

use glam::Vec2;

use crate::geometry::{Area, Circle};

/// A point stored in a [`Quadtree`] together with its payload.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry<T> {
    pub point: Vec2,
    pub data: T,
}

/// One node of a quadtree; the root node is the tree.
///
/// A node keeps entries locally until it holds `capacity` of them, then
/// splits into four equal quadrants and forwards further inserts. Nodes at
/// `max_depth` never split. Quadrants are indexed `ix + 2 * iy` where
/// `ix`/`iy` are 0 for the low half and 1 for the high half of each axis.
#[derive(Debug)]
pub struct Quadtree<T> {
    area: Area,
    capacity: usize,
    max_depth: u32,
    depth: u32,
    size: usize,
    pre_divide: bool,
    entries: Vec<Entry<T>>,
    nodes: Option<Box<[Quadtree<T>; 4]>>,
}

impl<T> Quadtree<T> {
    pub fn new(area: Area, capacity: usize, max_depth: u32) -> Self {
        Self::with_depth(area, capacity, max_depth, 1, false)
    }

    /// Like [`Quadtree::new`], but a node splits as soon as it reaches
    /// `capacity` instead of on the first insert past it.
    pub fn with_pre_divide(area: Area, capacity: usize, max_depth: u32) -> Self {
        Self::with_depth(area, capacity, max_depth, 1, true)
    }

    fn with_depth(area: Area, capacity: usize, max_depth: u32, depth: u32, pre_divide: bool) -> Self {
        Self {
            area,
            capacity,
            max_depth,
            depth,
            size: 0,
            pre_divide,
            entries: Vec::with_capacity(capacity),
            nodes: None,
        }
    }

    /// Inserts `point` with its payload.
    ///
    /// Returns `false` and leaves the tree untouched if the point lies
    /// outside the (half-open) area of this node.
    pub fn insert(&mut self, point: Vec2, data: T) -> bool {
        if !self.area.contains(point) {
            return false;
        }

        self.size += 1;

        if self.entries.len() < self.capacity || self.depth >= self.max_depth {
            self.entries.push(Entry { point, data });

            if self.pre_divide
                && self.entries.len() == self.capacity
                && self.depth < self.max_depth
                && self.nodes.is_none()
            {
                self.subdivide();
            }
            return true;
        }

        if self.nodes.is_none() {
            self.subdivide();
        }

        let index = self.quadrant(point);
        if let Some(nodes) = self.nodes.as_mut()
            && let Err(data) = nodes[index].insert_inner(point, data)
        {
            // Rounding at the split line can leave the point just outside
            // every child; keep it here so it stays queryable.
            self.entries.push(Entry { point, data });
        }
        true
    }

    /// Insert that hands the payload back on rejection.
    fn insert_inner(&mut self, point: Vec2, data: T) -> Result<(), T> {
        if !self.area.contains(point) {
            return Err(data);
        }
        self.insert(point, data);
        Ok(())
    }

    pub fn insert_all(&mut self, items: impl IntoIterator<Item = (Vec2, T)>) {
        for (point, data) in items {
            self.insert(point, data);
        }
    }

    /// Quadrant index of a point known to lie inside this node.
    fn quadrant(&self, point: Vec2) -> usize {
        let Area { x, y, w, h } = self.area;
        let ix = (2.0 * (point.x - x) / w).floor().clamp(0.0, 1.0) as usize;
        let iy = (2.0 * (point.y - y) / h).floor().clamp(0.0, 1.0) as usize;
        ix + 2 * iy
    }

    fn subdivide(&mut self) {
        let Area { x, y, w, h } = self.area;
        let (hw, hh) = (w / 2.0, h / 2.0);
        let (capacity, max_depth, depth, pre_divide) =
            (self.capacity, self.max_depth, self.depth + 1, self.pre_divide);

        self.nodes = Some(Box::new(std::array::from_fn(|i| {
            let (cx, cy) = ((i % 2) as f32, (i / 2) as f32);
            let area = Area::new(x + cx * hw, y + cy * hh, hw, hh);
            Quadtree::with_depth(area, capacity, max_depth, depth, pre_divide)
        })));
    }

    /// Calls `f` for every entry strictly inside `circle`.
    ///
    /// Local entries are visited first (in insertion order), then the
    /// children in quadrant order. Subtrees whose area misses the circle
    /// are skipped.
    pub fn circle_query_with<'a>(&'a self, circle: &Circle, f: &mut impl FnMut(&'a Entry<T>)) {
        if !self.area.intersects_circle(circle) {
            return;
        }

        for entry in &self.entries {
            if circle.contains(entry.point) {
                f(entry);
            }
        }

        for node in self.children() {
            node.circle_query_with(circle, f);
        }
    }

    /// All entries strictly inside `circle`.
    pub fn circle_query(&self, circle: &Circle) -> Vec<&Entry<T>> {
        let mut found = Vec::new();
        self.circle_query_with(circle, &mut |e| found.push(e));
        found
    }

    /// Positions of all entries strictly inside `circle`.
    pub fn circle_query_points(&self, circle: &Circle) -> Vec<Vec2> {
        let mut found = Vec::new();
        self.circle_query_with(circle, &mut |e| found.push(e.point));
        found
    }

    /// Payloads of all entries strictly inside `circle`.
    pub fn circle_query_data(&self, circle: &Circle) -> Vec<&T> {
        let mut found = Vec::new();
        self.circle_query_with(circle, &mut |e| found.push(&e.data));
        found
    }

    /// Deepest node whose area contains `point`, or `None` if the point is
    /// outside the tree.
    pub fn lowest_node(&self, point: Vec2) -> Option<&Self> {
        self.node_at_level(point, usize::MAX)
    }

    /// Node containing `point` that is `level` levels below this one, or
    /// the lowest such node if the tree is shallower there.
    ///
    /// Deliberately total: a shallow branch yields its lowest node instead
    /// of `None`, so [`Quadtree::lowest_node`] is the `usize::MAX` case.
    pub fn node_at_level(&self, point: Vec2, level: usize) -> Option<&Self> {
        if !self.area.contains(point) {
            return None;
        }

        if level == 0 || !self.is_subdivided() {
            return Some(self);
        }

        self.children()
            .iter()
            .find_map(|node| node.node_at_level(point, level - 1))
    }

    /// Pre-order depth-first walk over this node and all its descendants.
    pub fn traverse_nodes<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        for node in self.children() {
            node.traverse_nodes(f);
        }
    }

    /// Calls `f` for each direct child (none if the node is not split).
    pub fn traverse_children<'a>(&'a self, f: impl FnMut(&'a Self)) {
        self.children().iter().for_each(f);
    }

    /// Calls `f` for every stored entry along with the node holding it.
    pub fn traverse_entries<'a>(&'a self, f: &mut impl FnMut(&'a Entry<T>, &'a Self)) {
        for entry in &self.entries {
            f(entry, self);
        }
        for node in self.children() {
            node.traverse_entries(f);
        }
    }

    pub fn flattened_nodes(&self) -> Vec<&Self> {
        let mut nodes = Vec::new();
        self.traverse_nodes(&mut |n| nodes.push(n));
        nodes
    }

    /// Nodes that were never split.
    ///
    /// This is the structural notion of a leaf. An empty node is not a
    /// leaf if it was split, and a leaf may hold entries.
    pub fn leaf_nodes(&self) -> Vec<&Self> {
        let mut nodes = Vec::new();
        self.traverse_nodes(&mut |n| {
            if !n.is_subdivided() {
                nodes.push(n);
            }
        });
        nodes
    }

    pub fn children(&self) -> &[Self] {
        match &self.nodes {
            Some(nodes) => &nodes[..],
            None => &[],
        }
    }

    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    pub fn is_subdivided(&self) -> bool {
        self.nodes.is_some()
    }

    pub fn area(&self) -> Area {
        self.area
    }

    /// Entries stored directly in this node (not in its children).
    pub fn entries(&self) -> &[Entry<T>] {
        &self.entries
    }

    /// Number of successful inserts through this node.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Depth of this node; the root is at depth 1.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::random;
    use rand::{Rng, SeedableRng, rngs::StdRng};

    fn area() -> Area {
        Area::new(0.0, 0.0, 100.0, 100.0)
    }

    fn random_points(rng: &mut impl Rng, n: usize) -> Vec<Vec2> {
        (0..n)
            .map(|_| Vec2::new(random(rng, 0.0, 100.0), random(rng, 0.0, 100.0)))
            .collect()
    }

    #[test]
    fn insert_outside_area_is_rejected() {
        let mut tree = Quadtree::new(area(), 4, 5);
        assert!(tree.insert(Vec2::new(10.0, 10.0), 0));
        assert_eq!(tree.size(), 1);

        assert!(!tree.insert(Vec2::new(100.0, 50.0), 1));
        assert!(!tree.insert(Vec2::new(-1.0, 50.0), 2));
        assert!(!tree.insert(Vec2::new(50.0, 100.0), 3));
        assert_eq!(tree.size(), 1);
        assert_eq!(tree.circle_query(&Circle::new(50.0, 50.0, 500.0)).len(), 1);
    }

    #[test]
    fn zero_radius_finds_nothing_but_epsilon_finds_the_point() {
        let mut rng = StdRng::seed_from_u64(7);
        let points = random_points(&mut rng, 200);
        let mut tree = Quadtree::new(area(), 4, 6);
        for (i, p) in points.iter().enumerate() {
            assert!(tree.insert(*p, i));
        }

        for (i, p) in points.iter().enumerate() {
            assert!(tree.circle_query(&Circle::around(*p, 0.0)).is_empty());

            let found = tree.circle_query_data(&Circle::around(*p, 1e-3));
            assert!(found.contains(&&i), "point {i} at {p:?} not found");
        }
    }

    #[test]
    fn circle_query_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(11);
        let points = random_points(&mut rng, 500);

        for &(capacity, max_depth, pre_divide) in
            &[(1, 10, false), (4, 6, false), (8, 3, false), (4, 6, true), (16, 1, false)]
        {
            let mut tree = if pre_divide {
                Quadtree::with_pre_divide(area(), capacity, max_depth)
            } else {
                Quadtree::new(area(), capacity, max_depth)
            };
            tree.insert_all(points.iter().copied().enumerate().map(|(i, p)| (p, i)));
            assert_eq!(tree.size(), points.len());

            for _ in 0..50 {
                let circle = Circle::new(
                    random(&mut rng, -20.0, 120.0),
                    random(&mut rng, -20.0, 120.0),
                    random(&mut rng, 0.0, 40.0),
                );

                let mut found: Vec<usize> =
                    tree.circle_query_data(&circle).into_iter().copied().collect();
                found.sort_unstable();

                let expected: Vec<usize> = points
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| circle.contains(**p))
                    .map(|(i, _)| i)
                    .collect();

                assert_eq!(
                    found, expected,
                    "capacity={capacity}, max_depth={max_depth}, pre_divide={pre_divide}"
                );
            }
        }
    }

    #[test]
    fn node_splits_on_first_insert_past_capacity() {
        let mut tree = Quadtree::new(area(), 2, 4);
        tree.insert(Vec2::new(10.0, 10.0), ());
        tree.insert(Vec2::new(90.0, 10.0), ());
        assert!(!tree.is_subdivided());
        assert_eq!(tree.entries().len(), 2);

        tree.insert(Vec2::new(10.0, 90.0), ());
        assert!(tree.is_subdivided());
        assert_eq!(tree.child_count(), 4);
        // Existing entries stay where they are; the new one goes to quadrant 2.
        assert_eq!(tree.entries().len(), 2);
        assert_eq!(tree.children()[2].entries().len(), 1);
        assert_eq!(tree.children()[2].area(), Area::new(0.0, 50.0, 50.0, 50.0));
        assert_eq!(tree.children()[2].depth(), 2);
    }

    #[test]
    fn pre_divide_splits_when_capacity_is_reached() {
        let mut tree = Quadtree::with_pre_divide(area(), 2, 4);
        tree.insert(Vec2::new(10.0, 10.0), ());
        assert!(!tree.is_subdivided());
        tree.insert(Vec2::new(60.0, 60.0), ());
        assert!(tree.is_subdivided());

        tree.insert(Vec2::new(70.0, 20.0), ());
        assert_eq!(tree.children()[1].entries().len(), 1);
    }

    #[test]
    fn max_depth_nodes_keep_accepting_entries() {
        let mut tree = Quadtree::new(area(), 1, 1);
        for i in 0..10 {
            tree.insert(Vec2::new(i as f32, i as f32), i);
        }
        assert!(!tree.is_subdivided());
        assert_eq!(tree.entries().len(), 10);
    }

    #[test]
    fn local_entries_are_reported_before_children() {
        let mut tree = Quadtree::new(area(), 1, 4);
        tree.insert(Vec2::new(75.0, 75.0), "first");
        tree.insert(Vec2::new(25.0, 25.0), "second");
        tree.insert(Vec2::new(30.0, 30.0), "third");

        let found = tree.circle_query_data(&Circle::new(50.0, 50.0, 100.0));
        assert_eq!(found[0], &"first");
        assert_eq!(found.len(), 3);
    }

    #[test]
    fn traversals_visit_every_node_and_entry() {
        let mut rng = StdRng::seed_from_u64(5);
        let points = random_points(&mut rng, 100);
        let mut tree = Quadtree::new(area(), 4, 5);
        tree.insert_all(points.iter().map(|p| (*p, ())));

        let mut entry_count = 0;
        tree.traverse_entries(&mut |entry, node| {
            assert!(node.area().contains(entry.point));
            entry_count += 1;
        });
        assert_eq!(entry_count, 100);

        let nodes = tree.flattened_nodes();
        assert!(std::ptr::eq(nodes[0], &tree));
        let leaves = tree.leaf_nodes();
        assert!(leaves.iter().all(|n| n.child_count() == 0));
        // A split node always has exactly four children.
        assert_eq!(nodes.len(), 1 + 4 * (nodes.len() - leaves.len()));

        let mut direct = 0;
        tree.traverse_children(|_| direct += 1);
        assert_eq!(direct, 4);
    }

    #[test]
    fn lowest_node_contains_the_point() {
        let mut rng = StdRng::seed_from_u64(9);
        let points = random_points(&mut rng, 64);
        let mut tree = Quadtree::new(area(), 2, 6);
        tree.insert_all(points.iter().map(|p| (*p, ())));

        for p in &points {
            let node = tree.lowest_node(*p).unwrap();
            assert!(node.area().contains(*p));
            assert!(!node.is_subdivided());
        }
        assert!(tree.lowest_node(Vec2::new(-5.0, 5.0)).is_none());

        let top = tree.node_at_level(points[0], 0).unwrap();
        assert!(std::ptr::eq(top, &tree));
        let one_down = tree.node_at_level(points[0], 1).unwrap();
        assert_eq!(one_down.depth(), 2);
    }

    #[test]
    fn shallow_branches_answer_with_their_lowest_node() {
        let mut tree = Quadtree::new(area(), 4, 6);
        tree.insert(Vec2::new(10.0, 10.0), ());

        let node = tree.node_at_level(Vec2::new(10.0, 10.0), 3).unwrap();
        assert!(std::ptr::eq(node, &tree));

        // An unsplit node is a leaf whether or not it holds entries.
        let empty: Quadtree<()> = Quadtree::new(area(), 4, 6);
        assert_eq!(empty.leaf_nodes().len(), 1);
        assert_eq!(tree.leaf_nodes().len(), 1);
    }
}
