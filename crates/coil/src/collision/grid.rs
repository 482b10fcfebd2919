//! Uniform spatial hash used by the collision broad phase.
//!
//! Each item lands in exactly one cell, the one containing its position. Pairs
//! are only produced for items sharing a cell, so two colliders on opposite
//! sides of a cell boundary are never tested against each other. The grid is
//! cleared and refilled every frame; nothing is updated incrementally.

use std::collections::HashMap;

use crate::math::Vec2;

/// Integer cell coordinate.
pub type Cell = (i32, i32);

#[derive(Debug, Clone)]
pub struct SpatialHashGrid<T> {
    cell_size: f32,
    cells: HashMap<Cell, Vec<T>>,
}

impl<T: Copy + PartialEq> SpatialHashGrid<T> {
    /// Create an empty grid. Non-positive sizes fall back to 1.0.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 {
            cell_size
        } else {
            log::warn!("Spatial hash cell size {cell_size} is not positive, using 1.0");
            1.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// `floor(position / cell_size)` on both axes.
    pub fn cell_of(&self, position: Vec2) -> Cell {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    /// Empty every bucket. Cells that were occupied keep their allocation for
    /// the next frame; cells left empty for a whole frame are dropped.
    pub fn clear(&mut self) {
        self.cells.retain(|_, bucket| {
            let occupied = !bucket.is_empty();
            bucket.clear();
            occupied
        });
    }

    /// Append `item` to the bucket covering `position`. Each item must be
    /// inserted at most once between clears.
    pub fn insert(&mut self, item: T, position: Vec2) {
        let cell = self.cell_of(position);
        let bucket = self.cells.entry(cell).or_default();
        debug_assert!(!bucket.contains(&item), "item inserted twice in one frame");
        bucket.push(item);
    }

    /// Number of cells the map currently holds, empty ones included.
    pub fn allocated_cells(&self) -> usize {
        self.cells.len()
    }

    /// Items currently in `cell`.
    pub fn bucket(&self, cell: Cell) -> &[T] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of non-empty buckets.
    pub fn occupied_cells(&self) -> usize {
        self.cells.values().filter(|b| !b.is_empty()).count()
    }

    /// Total number of inserted items.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call `callback(a, b)` once for every unordered pair sharing a bucket.
    pub fn compute_collisions(&self, mut callback: impl FnMut(T, T)) {
        for bucket in self.cells.values() {
            for (i, &a) in bucket.iter().enumerate() {
                for &b in &bucket[i + 1..] {
                    callback(a, b);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(grid: &SpatialHashGrid<u32>) -> Vec<(u32, u32)> {
        let mut out = Vec::new();
        grid.compute_collisions(|a, b| out.push((a.min(b), a.max(b))));
        out.sort();
        out
    }

    #[test]
    fn cell_is_floor_of_position_over_size() {
        let grid = SpatialHashGrid::<u32>::new(50.0);
        assert_eq!(grid.cell_of(Vec2::new(0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec2::new(49.9, 99.0)), (0, 1));
        assert_eq!(grid.cell_of(Vec2::new(-0.1, -50.0)), (-1, -1));
        assert_eq!(grid.cell_of(Vec2::new(-50.1, 150.0)), (-2, 3));
    }

    #[test]
    fn cell_lookup_is_pure() {
        let grid = SpatialHashGrid::<u32>::new(32.0);
        let p = Vec2::new(123.4, -77.7);
        assert_eq!(grid.cell_of(p), grid.cell_of(p));
    }

    #[test]
    fn empty_grid_yields_no_pairs() {
        let grid = SpatialHashGrid::<u32>::new(50.0);
        assert!(pairs(&grid).is_empty());
    }

    #[test]
    fn same_bucket_items_pair_once() {
        let mut grid = SpatialHashGrid::new(50.0);
        grid.insert(1, Vec2::new(10.0, 10.0));
        grid.insert(2, Vec2::new(20.0, 20.0));
        grid.insert(3, Vec2::new(30.0, 30.0));
        assert_eq!(pairs(&grid), vec![(1, 2), (1, 3), (2, 3)]);
    }

    #[test]
    fn adjacent_cells_are_never_paired() {
        let mut grid = SpatialHashGrid::new(50.0);
        grid.insert(1, Vec2::new(49.9, 10.0));
        grid.insert(2, Vec2::new(50.1, 10.0));
        assert!(pairs(&grid).is_empty());
    }

    #[test]
    fn reinsert_does_not_duplicate() {
        let mut grid = SpatialHashGrid::new(50.0);
        for _ in 0..3 {
            grid.clear();
            grid.insert(7, Vec2::new(5.0, 5.0));
            assert_eq!(grid.len(), 1);
            assert_eq!(grid.bucket((0, 0)), &[7]);
        }
        assert_eq!(grid.occupied_cells(), 1);
    }

    #[test]
    fn wandering_item_does_not_grow_the_map() {
        let mut grid = SpatialHashGrid::new(10.0);
        for frame in 0..1000 {
            grid.clear();
            grid.insert(1u32, Vec2::new(frame as f32 * 10.0, 0.0));
            assert!(grid.allocated_cells() <= 2);
        }
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.bucket((999, 0)), &[1]);
    }

    #[test]
    fn clear_empties_all_buckets() {
        let mut grid = SpatialHashGrid::new(10.0);
        grid.insert(1, Vec2::new(0.0, 0.0));
        grid.insert(2, Vec2::new(100.0, 0.0));
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }
}
