#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Procedural maze generator.
//!
//! Mazes are grown with a randomized frontier (Prim's) algorithm on the odd
//! coordinates of the grid, which yields a perfect maze: exactly one corridor
//! connects any two open cells. The perfect maze is then doubled in size so
//! corridors are two cells wide, and finally a rectangular arena with a portal
//! centerpiece is opened in the middle.

use phantom_maze_core::{CellCoord, MazeError, RenderSink, Tile, TileLayout};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

const FRONTIER_OFFSETS: [(i32, i32); 4] = [(2, 0), (-2, 0), (0, 2), (0, -2)];
const PORTAL_SIZE: u32 = 2;

/// Configuration parameters required to construct the maze generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    columns: u32,
    rows: u32,
    arena_columns: u32,
    arena_rows: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a configuration for a maze of the provided size before expansion.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, rng_seed: u64) -> Self {
        Self {
            columns,
            rows,
            arena_columns: 6,
            arena_rows: 6,
            rng_seed,
        }
    }

    /// Overrides the size of the central arena measured on the expanded grid.
    #[must_use]
    pub const fn with_arena(mut self, columns: u32, rows: u32) -> Self {
        self.arena_columns = columns;
        self.arena_rows = rows;
        self
    }

    /// Number of maze columns before expansion.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of maze rows before expansion.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(21, 21, 0)
    }
}

/// Seeded generator that produces finished maze layouts.
#[derive(Debug)]
pub struct MazeGenerator {
    config: Config,
    rng: ChaCha8Rng,
}

impl MazeGenerator {
    /// Creates a new generator using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Generates a perfect maze, expands it and carves the central arena.
    ///
    /// Successive calls continue the same random stream and therefore yield
    /// different mazes.
    pub fn generate(&mut self) -> Result<TileLayout, MazeError> {
        let maze = carve_perfect_maze(self.config.columns, self.config.rows, &mut self.rng)?;
        let mut layout = expand(&maze);
        carve_arena(&mut layout, self.config.arena_columns, self.config.arena_rows);
        debug!(
            columns = layout.columns(),
            rows = layout.rows(),
            open = layout.count(Tile::Path) + layout.count(Tile::Portal),
            "generated maze"
        );
        Ok(layout)
    }
}

/// Grows a perfect maze whose corridors run along odd coordinates.
///
/// Every cell starts as a wall. Dimensions must be odd and at least three so
/// that the outer ring stays solid.
pub fn carve_perfect_maze<R>(columns: u32, rows: u32, rng: &mut R) -> Result<TileLayout, MazeError>
where
    R: Rng + ?Sized,
{
    if columns < 3 || rows < 3 || columns % 2 == 0 || rows % 2 == 0 {
        return Err(MazeError::InvalidDimensions { columns, rows });
    }
    let (Ok(width), Ok(height)) = (i32::try_from(columns), i32::try_from(rows)) else {
        return Err(MazeError::InvalidDimensions { columns, rows });
    };

    let mut layout = TileLayout::filled(columns, rows, Tile::Wall);
    let mut frontier = Frontier::new(width, height);

    let start = CellCoord::new(odd_start(width, rng), odd_start(height, rng));
    let _ = layout.set(start, Tile::Path);
    frontier.extend_from(start, &layout);

    let mut carved_from = Vec::with_capacity(FRONTIER_OFFSETS.len());
    while let Some(cell) = frontier.take_random(rng) {
        carved_from.clear();
        carved_from.extend(
            FRONTIER_OFFSETS
                .iter()
                .map(|(dx, dy)| cell.offset(*dx, *dy))
                .filter(|neighbor| layout.tile(*neighbor) == Some(Tile::Path)),
        );
        if carved_from.is_empty() {
            continue;
        }

        let anchor = carved_from[rng.gen_range(0..carved_from.len())];
        let midpoint = CellCoord::new(
            (cell.column() + anchor.column()) / 2,
            (cell.row() + anchor.row()) / 2,
        );
        let _ = layout.set(cell, Tile::Path);
        let _ = layout.set(midpoint, Tile::Path);
        frontier.extend_from(cell, &layout);
    }

    Ok(layout)
}

/// Doubles the layout so that every cell becomes a two-by-two block.
#[must_use]
pub fn expand(layout: &TileLayout) -> TileLayout {
    let mut expanded = TileLayout::filled(
        layout.columns().saturating_mul(2),
        layout.rows().saturating_mul(2),
        Tile::Wall,
    );
    for (cell, tile) in layout.iter() {
        let origin = CellCoord::new(cell.column() * 2, cell.row() * 2);
        for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            let _ = expanded.set(origin.offset(dx, dy), tile);
        }
    }
    expanded
}

/// Opens a centered rectangle and places the portal block at its middle.
///
/// The rectangle is clamped to the layout bounds. The portal occupies the
/// two-by-two block ending at the center cell and is skipped entirely when
/// it would not fit.
pub fn carve_arena(layout: &mut TileLayout, arena_columns: u32, arena_rows: u32) {
    let (column_start, column_end) = centered_span(layout.columns(), arena_columns);
    let (row_start, row_end) = centered_span(layout.rows(), arena_rows);
    for row in row_start..row_end {
        for column in column_start..column_end {
            let _ = layout.set(cell_at(column, row), Tile::Path);
        }
    }

    let portal_column = (layout.columns() / 2).checked_sub(1);
    let portal_row = (layout.rows() / 2).checked_sub(1);
    let (Some(portal_column), Some(portal_row)) = (portal_column, portal_row) else {
        return;
    };
    if portal_column + PORTAL_SIZE > layout.columns() || portal_row + PORTAL_SIZE > layout.rows() {
        return;
    }

    for row in portal_row..portal_row + PORTAL_SIZE {
        for column in portal_column..portal_column + PORTAL_SIZE {
            let _ = layout.set(cell_at(column, row), Tile::Portal);
        }
    }
}

/// Clears the sink and draws every tile of the layout once.
pub fn render<S>(layout: &TileLayout, sink: &mut S)
where
    S: RenderSink + ?Sized,
{
    sink.clear_all();
    for (cell, tile) in layout.iter() {
        sink.render_tile(cell, tile);
    }
}

fn centered_span(dimension: u32, size: u32) -> (u32, u32) {
    let center = dimension / 2;
    let start = center.saturating_sub(size / 2);
    let end = start.saturating_add(size).min(dimension);
    (start, end)
}

fn cell_at(column: u32, row: u32) -> CellCoord {
    CellCoord::new(
        i32::try_from(column).unwrap_or(i32::MAX),
        i32::try_from(row).unwrap_or(i32::MAX),
    )
}

fn odd_start<R>(dimension: i32, rng: &mut R) -> i32
where
    R: Rng + ?Sized,
{
    let value = rng.gen_range(1..dimension - 1);
    if value % 2 == 0 {
        value + 1
    } else {
        value
    }
}

/// Frontier cells waiting to be connected, each admitted at most once.
#[derive(Debug)]
struct Frontier {
    width: i32,
    height: i32,
    cells: Vec<CellCoord>,
    admitted: Vec<bool>,
}

impl Frontier {
    fn new(width: i32, height: i32) -> Self {
        let capacity = usize::try_from(width).unwrap_or(0) * usize::try_from(height).unwrap_or(0);
        Self {
            width,
            height,
            cells: Vec::new(),
            admitted: vec![false; capacity],
        }
    }

    fn extend_from(&mut self, cell: CellCoord, layout: &TileLayout) {
        for (dx, dy) in FRONTIER_OFFSETS {
            let candidate = cell.offset(dx, dy);
            let inside = candidate.column() > 0
                && candidate.column() < self.width - 1
                && candidate.row() > 0
                && candidate.row() < self.height - 1;
            if !inside || layout.tile(candidate) != Some(Tile::Wall) {
                continue;
            }

            let Some(slot) = self.slot(candidate) else {
                continue;
            };
            if std::mem::replace(&mut self.admitted[slot], true) {
                continue;
            }
            self.cells.push(candidate);
        }
    }

    fn take_random<R>(&mut self, rng: &mut R) -> Option<CellCoord>
    where
        R: Rng + ?Sized,
    {
        if self.cells.is_empty() {
            return None;
        }
        let index = rng.gen_range(0..self.cells.len());
        Some(self.cells.swap_remove(index))
    }

    fn slot(&self, cell: CellCoord) -> Option<usize> {
        let index = cell.row().checked_mul(self.width)?.checked_add(cell.column())?;
        usize::try_from(index).ok()
    }
}
