//! Navigation grid builder used by the world crate.

use std::collections::VecDeque;

use phantom_maze_core::{CellCoord, GridNode, GridView, TileSource};

/// Dense walkability table derived from an installed tile layout.
///
/// Every cell within the layout bounds owns exactly one node, stored in
/// row-major order so coordinates map to unique indices. Walkable cells are
/// additionally collected into an ordered list that supports constant time
/// uniform sampling. The grid never changes after it has been built.
#[derive(Clone, Debug, Default)]
pub struct PathfindingGrid {
    columns: u32,
    rows: u32,
    nodes: Vec<GridNode>,
    walkable: Vec<CellCoord>,
}

impl PathfindingGrid {
    /// Builds a grid covering every cell reported by the tile source.
    #[must_use]
    pub fn build<S>(source: &S) -> Self
    where
        S: TileSource + ?Sized,
    {
        let (columns, rows) = source.dimensions();
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        let mut nodes = Vec::with_capacity(capacity);
        let mut walkable = Vec::new();

        for row in 0..rows {
            for column in 0..columns {
                let (Ok(column), Ok(row)) = (i32::try_from(column), i32::try_from(row)) else {
                    continue;
                };
                let cell = CellCoord::new(column, row);
                let open = source.tile_at(cell).is_some_and(|tile| tile.is_walkable());
                nodes.push(GridNode::new(cell, open));
                if open {
                    walkable.push(cell);
                }
            }
        }

        Self {
            columns,
            rows,
            nodes,
            walkable,
        }
    }

    /// Number of columns covered by the grid.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of rows covered by the grid.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }

    /// Number of cells agents may traverse.
    #[must_use]
    pub fn walkable_count(&self) -> usize {
        self.walkable.len()
    }

    /// Borrows the grid as a read-only view.
    #[must_use]
    pub fn view(&self) -> GridView<'_> {
        GridView::new(self.columns, self.rows, &self.nodes, &self.walkable)
    }

    /// Counts the walkable cells connected to `origin` through four-neighbor steps.
    ///
    /// Returns zero when `origin` itself is blocked or outside the grid.
    #[must_use]
    pub fn reachable_from(&self, origin: CellCoord) -> usize {
        let view = self.view();
        let Some(start) = view.index_of(origin) else {
            return 0;
        };
        if !view.is_walkable(origin) {
            return 0;
        }

        let mut visited = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        visited[start] = true;
        queue.push_back(origin);
        let mut reached = 0;

        while let Some(cell) = queue.pop_front() {
            reached += 1;
            for neighbor in cell.cardinal_neighbors() {
                if !view.is_walkable(neighbor) {
                    continue;
                }
                let Some(index) = view.index_of(neighbor) else {
                    continue;
                };
                if visited[index] {
                    continue;
                }
                visited[index] = true;
                queue.push_back(neighbor);
            }
        }

        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use phantom_maze_core::{Tile, TileLayout};

    fn layout_with_walls(columns: u32, rows: u32, walls: &[CellCoord]) -> TileLayout {
        let mut layout = TileLayout::filled(columns, rows, Tile::Path);
        for wall in walls {
            assert!(layout.set(*wall, Tile::Wall));
        }
        layout
    }

    #[test]
    fn build_creates_one_node_per_cell() {
        let layout = layout_with_walls(4, 3, &[CellCoord::new(1, 1)]);
        let grid = PathfindingGrid::build(&layout);
        let view = grid.view();

        assert_eq!(view.node_count(), 12);
        assert_eq!(grid.walkable_count(), 11);
        assert!(!view.is_walkable(CellCoord::new(1, 1)));
        assert!(view.is_walkable(CellCoord::new(3, 2)));
        assert_eq!(
            view.lookup(CellCoord::new(2, 1)).map(GridNode::position),
            Some(CellCoord::new(2, 1))
        );
    }

    #[test]
    fn portal_tiles_are_walkable() {
        let mut layout = TileLayout::filled(2, 1, Tile::Wall);
        assert!(layout.set(CellCoord::new(1, 0), Tile::Portal));
        let grid = PathfindingGrid::build(&layout);

        assert_eq!(grid.view().walkable_cells(), &[CellCoord::new(1, 0)]);
    }

    #[test]
    fn reachable_from_stops_at_walls() {
        let walls = [CellCoord::new(1, 0), CellCoord::new(1, 1), CellCoord::new(1, 2)];
        let layout = layout_with_walls(3, 3, &walls);
        let grid = PathfindingGrid::build(&layout);

        assert_eq!(grid.reachable_from(CellCoord::new(0, 0)), 3);
        assert_eq!(grid.reachable_from(CellCoord::new(2, 2)), 3);
        assert_eq!(grid.reachable_from(CellCoord::new(1, 1)), 0);
        assert_eq!(grid.reachable_from(CellCoord::new(5, 5)), 0);
    }
}
