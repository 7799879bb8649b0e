//! Spatial index over the partitions of a page.
//!
//! Partitions live in an arena addressed by [`PartId`]; ids are stable for
//! the lifetime of the grid and a partition absorbed into another leaves a
//! tombstone behind. Membership in the index is tracked separately: a
//! partition can be taken out of the index while it is being modified and
//! put back afterwards.
//!
//! Searches return snapshots of ids, so the grid may be mutated while a
//! result is being walked. Callers skip ids that are no longer indexed.
//!
//! A partition without glyphs has an empty box. It counts as indexed but is
//! kept out of the R-tree, so no search ever returns it.

use rstar::{AABB, RTree, RTreeObject};

use crate::geometry::BBox;
use crate::partition::Partition;

/// Stable handle of a partition in a [`PartitionGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartId(usize);

impl PartId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Direction of a side search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Horizontal {
    Left,
    Right,
}

/// Direction of a vertical search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    Up,
    Down,
}

#[derive(Clone, Debug)]
struct GridEntry {
    id: PartId,
    bbox: BBox,
}

impl PartialEq for GridEntry {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl RTreeObject for GridEntry {
    type Envelope = AABB<[i32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.left, self.bbox.bottom],
            [self.bbox.right, self.bbox.top],
        )
    }
}

/// Bucketed view of the page used for neighbour searches.
pub struct PartitionGrid {
    gridsize: i32,
    page: BBox,
    gridwidth: i32,
    gridheight: i32,
    /// Arena; `None` marks an absorbed partition.
    parts: Vec<Option<Partition>>,
    /// Box each partition was indexed with, `None` when not indexed.
    indexed: Vec<Option<BBox>>,
    indexed_count: usize,
    tree: RTree<GridEntry>,
}

impl PartitionGrid {
    /// Creates an empty grid covering `page` with cells of `gridsize` pixels.
    pub fn new(gridsize: i32, page: BBox) -> Self {
        let gridsize = gridsize.max(1);
        let gridwidth = ((page.width() + gridsize - 1) / gridsize).max(1);
        let gridheight = ((page.height() + gridsize - 1) / gridsize).max(1);
        Self {
            gridsize,
            page,
            gridwidth,
            gridheight,
            parts: Vec::new(),
            indexed: Vec::new(),
            indexed_count: 0,
            tree: RTree::new(),
        }
    }

    pub fn gridsize(&self) -> i32 {
        self.gridsize
    }

    pub fn page(&self) -> BBox {
        self.page
    }

    /// Adds a partition to the arena and indexes it.
    pub fn add(&mut self, part: Partition) -> PartId {
        let id = PartId(self.parts.len());
        self.parts.push(Some(part));
        self.indexed.push(None);
        self.insert(id);
        id
    }

    /// Indexes `id` with its current box. No-op when already indexed.
    ///
    /// # Panics
    /// Panics if `id` was absorbed.
    pub fn insert(&mut self, id: PartId) {
        if self.indexed[id.0].is_some() {
            return;
        }
        let bbox = self.parts[id.0]
            .as_ref()
            .unwrap_or_else(|| panic!("inserting absorbed partition {id:?}"))
            .bbox();
        self.indexed[id.0] = Some(bbox);
        self.indexed_count += 1;
        if !bbox.is_empty() {
            self.tree.insert(GridEntry { id, bbox });
        }
    }

    /// Takes `id` out of the index. Returns false if it was not indexed.
    pub fn remove(&mut self, id: PartId) -> bool {
        let Some(bbox) = self.indexed.get_mut(id.0).and_then(Option::take) else {
            return false;
        };
        self.indexed_count -= 1;
        if !bbox.is_empty() {
            self.tree.remove(&GridEntry { id, bbox });
        }
        true
    }

    /// True if `id` is currently indexed.
    pub fn contains(&self, id: PartId) -> bool {
        self.indexed.get(id.0).is_some_and(Option::is_some)
    }

    /// True if `id` has not been absorbed into another partition.
    pub fn is_alive(&self, id: PartId) -> bool {
        self.parts.get(id.0).is_some_and(Option::is_some)
    }

    /// Number of indexed partitions.
    pub fn len(&self) -> usize {
        self.indexed_count
    }

    pub fn is_empty(&self) -> bool {
        self.indexed_count == 0
    }

    pub fn get(&self, id: PartId) -> Option<&Partition> {
        self.parts.get(id.0).and_then(Option::as_ref)
    }

    /// Mutable access. The box must not change while `id` is indexed.
    pub fn get_mut(&mut self, id: PartId) -> Option<&mut Partition> {
        self.parts.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Shorthand for [`PartitionGrid::get`] on an id known to be alive.
    ///
    /// # Panics
    /// Panics if `id` was absorbed.
    pub fn part(&self, id: PartId) -> &Partition {
        self.get(id)
            .unwrap_or_else(|| panic!("partition {id:?} was absorbed"))
    }

    /// Mutable counterpart of [`PartitionGrid::part`].
    pub fn part_mut(&mut self, id: PartId) -> &mut Partition {
        self.get_mut(id)
            .unwrap_or_else(|| panic!("partition {id:?} was absorbed"))
    }

    /// Moves every glyph of `from` into `into` and tombstones `from`.
    ///
    /// `from` is taken out of the index if needed; `into` must not be
    /// indexed since its box is about to change.
    ///
    /// # Panics
    /// Panics if the ids are equal, either one was absorbed, or `into` is
    /// still indexed.
    pub fn absorb(&mut self, into: PartId, from: PartId) {
        assert_ne!(into, from, "a partition cannot absorb itself");
        assert!(
            !self.contains(into),
            "partition {into:?} must be removed from the grid before absorbing"
        );
        self.remove(from);
        let other = self.parts[from.0]
            .take()
            .unwrap_or_else(|| panic!("absorbing dead partition {from:?}"));
        self.part_mut(into).absorb(other);
    }

    /// Indexed partitions in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (PartId, &Partition)> {
        self.indexed
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_some())
            .filter_map(|(i, _)| self.parts[i].as_ref().map(|p| (PartId(i), p)))
    }

    /// All partitions ever added and not absorbed, indexed or not.
    pub fn alive(&self) -> impl Iterator<Item = (PartId, &Partition)> {
        self.parts
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (PartId(i), p)))
    }

    /// Union of the boxes of all indexed partitions.
    pub fn super_bbox(&self) -> BBox {
        self.iter().map(|(_, p)| p.bbox()).collect()
    }

    /// Grid cell holding pixel `(x, y)`, clamped to the grid.
    pub fn grid_coords(&self, x: i32, y: i32) -> (i32, i32) {
        let gx = (x - self.page.left).div_euclid(self.gridsize);
        let gy = (y - self.page.bottom).div_euclid(self.gridsize);
        (
            gx.clamp(0, self.gridwidth - 1),
            gy.clamp(0, self.gridheight - 1),
        )
    }

    fn cell_left(&self, gx: i32) -> i32 {
        self.page.left + gx * self.gridsize
    }

    fn cell_bottom(&self, gy: i32) -> i32 {
        self.page.bottom + gy * self.gridsize
    }

    fn collect_sorted<K: Ord>(
        &self,
        env: AABB<[i32; 2]>,
        key: impl Fn(&BBox) -> K,
    ) -> Vec<PartId> {
        let mut hits: Vec<(K, PartId)> = self
            .tree
            .locate_in_envelope_intersecting(&env)
            .map(|e| (key(&e.bbox), e.id))
            .collect();
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        hits.into_iter().map(|(_, id)| id).collect()
    }

    /// Every indexed partition once, top grid row first and left to right
    /// within a row. A partition is placed at the cell of its bottom-left
    /// corner.
    pub fn full_search(&self) -> Vec<PartId> {
        let mut hits: Vec<(i32, i32, PartId)> = self
            .tree
            .iter()
            .map(|e| {
                let (gx, gy) = self.grid_coords(e.bbox.left, e.bbox.bottom);
                (-gy, gx, e.id)
            })
            .collect();
        hits.sort_unstable();
        hits.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Partitions touching the square of `radius` cells around the cell of
    /// `(x, y)`, nearest ring first.
    pub fn radius_search(&self, x: i32, y: i32, radius: i32) -> Vec<PartId> {
        let (gx, gy) = self.grid_coords(x, y);
        let env = AABB::from_corners(
            [self.cell_left(gx - radius), self.cell_bottom(gy - radius)],
            [
                self.cell_left(gx + radius + 1) - 1,
                self.cell_bottom(gy + radius + 1) - 1,
            ],
        );
        self.collect_sorted(env, |b| {
            let (l, bt) = self.grid_coords(b.left, b.bottom);
            let (r, t) = self.grid_coords(b.right, b.top);
            let dx = if gx < l { l - gx } else { (gx - r).max(0) };
            let dy = if gy < bt { bt - gy } else { (gy - t).max(0) };
            dx.max(dy)
        })
    }

    /// Partitions overlapping rows `ymin..=ymax`, from the grid column of
    /// `x` outwards in `dir`, nearest first.
    pub fn side_search(&self, x: i32, ymin: i32, ymax: i32, dir: Horizontal) -> Vec<PartId> {
        let (gx, _) = self.grid_coords(x, ymin);
        let env = match dir {
            Horizontal::Right => AABB::from_corners(
                [self.cell_left(gx), ymin],
                [i32::MAX, ymax],
            ),
            Horizontal::Left => AABB::from_corners(
                [i32::MIN, ymin],
                [self.cell_left(gx + 1) - 1, ymax],
            ),
        };
        self.collect_sorted(env, |b| match dir {
            Horizontal::Right => (b.left - x).max(0),
            Horizontal::Left => (x - b.right).max(0),
        })
    }

    /// Partitions overlapping columns `xmin..=xmax`, from the grid row of
    /// `y` outwards in `dir`, nearest first.
    pub fn vertical_search(&self, xmin: i32, xmax: i32, y: i32, dir: Vertical) -> Vec<PartId> {
        let (_, gy) = self.grid_coords(xmin, y);
        let env = match dir {
            Vertical::Up => AABB::from_corners(
                [xmin, self.cell_bottom(gy)],
                [xmax, i32::MAX],
            ),
            Vertical::Down => AABB::from_corners(
                [xmin, i32::MIN],
                [xmax, self.cell_bottom(gy + 1) - 1],
            ),
        };
        self.collect_sorted(env, |b| match dir {
            Vertical::Up => (b.bottom - y).max(0),
            Vertical::Down => (y - b.top).max(0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::{BlobRegionType, TextFlow};
    use crate::partition::PartitionType;

    fn grid_with(boxes: &[BBox]) -> (PartitionGrid, Vec<PartId>) {
        let mut grid = PartitionGrid::new(10, BBox::new(0, 0, 1000, 1000));
        let ids = boxes
            .iter()
            .map(|&b| grid.add(Partition::fake(b, PartitionType::FlowingText)))
            .collect();
        (grid, ids)
    }

    #[test]
    fn test_empty_partition_is_never_found() {
        let (mut grid, ids) = grid_with(&[BBox::new(100, 100, 200, 130)]);
        let empty = grid.add(Partition::new(
            PartitionType::FlowingText,
            BlobRegionType::Text,
            TextFlow::Chain,
        ));
        assert!(grid.contains(empty));
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.iter().count(), 2);
        assert_eq!(grid.full_search(), vec![ids[0]]);
        assert_eq!(grid.radius_search(150, 115, 50), vec![ids[0]]);
        assert_eq!(grid.super_bbox(), BBox::new(100, 100, 200, 130));
        assert!(grid.remove(empty));
        assert!(!grid.contains(empty));
        grid.insert(empty);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_add_remove_insert() {
        let (mut grid, ids) = grid_with(&[BBox::new(0, 0, 10, 10), BBox::new(50, 50, 60, 60)]);
        assert_eq!(grid.len(), 2);
        assert!(grid.remove(ids[0]));
        assert!(!grid.remove(ids[0]));
        assert!(!grid.contains(ids[0]));
        assert!(grid.is_alive(ids[0]));
        assert_eq!(grid.full_search(), vec![ids[1]]);
        grid.insert(ids[0]);
        grid.insert(ids[0]);
        assert_eq!(grid.len(), 2);
    }

    #[test]
    fn test_full_search_order() {
        let (grid, ids) = grid_with(&[
            BBox::new(500, 100, 600, 120),
            BBox::new(0, 900, 100, 920),
            BBox::new(100, 100, 200, 120),
            BBox::new(800, 905, 900, 915),
        ]);
        assert_eq!(grid.full_search(), vec![ids[1], ids[3], ids[2], ids[0]]);
    }

    #[test]
    fn test_absorb_tombstones() {
        let (mut grid, ids) = grid_with(&[BBox::new(0, 0, 10, 10), BBox::new(5, 5, 30, 30)]);
        grid.remove(ids[0]);
        grid.absorb(ids[0], ids[1]);
        assert!(!grid.is_alive(ids[1]));
        assert!(!grid.contains(ids[1]));
        assert_eq!(grid.part(ids[0]).bbox(), BBox::new(0, 0, 30, 30));
        grid.insert(ids[0]);
        assert_eq!(grid.super_bbox(), BBox::new(0, 0, 30, 30));
    }

    #[test]
    #[should_panic(expected = "cannot absorb itself")]
    fn test_absorb_self_panics() {
        let (mut grid, ids) = grid_with(&[BBox::new(0, 0, 10, 10)]);
        grid.remove(ids[0]);
        grid.absorb(ids[0], ids[0]);
    }

    #[test]
    fn test_radius_search_nearest_first() {
        let (grid, ids) = grid_with(&[
            BBox::new(300, 300, 310, 310),
            BBox::new(105, 105, 110, 110),
            BBox::new(130, 100, 140, 110),
        ]);
        assert_eq!(grid.radius_search(105, 105, 5), vec![ids[1], ids[2]]);
        assert_eq!(grid.radius_search(105, 105, 30).len(), 3);
    }

    #[test]
    fn test_side_search() {
        let (grid, ids) = grid_with(&[
            BBox::new(100, 100, 200, 120),
            BBox::new(400, 105, 450, 115),
            BBox::new(250, 100, 300, 120),
            BBox::new(250, 500, 300, 520),
        ]);
        assert_eq!(
            grid.side_search(200, 100, 120, Horizontal::Right),
            vec![ids[0], ids[2], ids[1]]
        );
        assert_eq!(
            grid.side_search(250, 100, 120, Horizontal::Left),
            vec![ids[2], ids[0]]
        );
    }

    #[test]
    fn test_vertical_search() {
        let (grid, ids) = grid_with(&[
            BBox::new(100, 100, 200, 120),
            BBox::new(100, 300, 200, 320),
            BBox::new(100, 200, 200, 220),
            BBox::new(600, 200, 700, 220),
        ]);
        assert_eq!(
            grid.vertical_search(100, 200, 120, Vertical::Up),
            vec![ids[0], ids[2], ids[1]]
        );
        assert_eq!(
            grid.vertical_search(100, 200, 300, Vertical::Down),
            vec![ids[1], ids[2], ids[0]]
        );
    }
}
