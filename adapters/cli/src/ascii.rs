//! Plain-text presentation of maze layouts.

use phantom_maze_core::{CellCoord, RenderSink, Tile};

/// Character used for a tile in ASCII output.
pub(crate) const fn glyph(tile: Tile) -> char {
    match tile {
        Tile::Wall => '#',
        Tile::Path => '.',
        Tile::Portal => 'O',
    }
}

/// Tile drawn with the provided character, if any.
pub(crate) const fn tile_from_glyph(symbol: char) -> Option<Tile> {
    match symbol {
        '#' => Some(Tile::Wall),
        '.' => Some(Tile::Path),
        'O' => Some(Tile::Portal),
        _ => None,
    }
}

/// Render sink that accumulates tiles into a character grid.
#[derive(Debug)]
pub(crate) struct AsciiSink {
    columns: usize,
    rows: usize,
    glyphs: Vec<char>,
}

impl AsciiSink {
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        let columns = columns as usize;
        let rows = rows as usize;
        Self {
            columns,
            rows,
            glyphs: vec![' '; columns * rows],
        }
    }

    /// Joins the drawn rows with newlines.
    pub(crate) fn into_string(self) -> String {
        let mut output = String::with_capacity((self.columns + 1) * self.rows);
        for row in self.glyphs.chunks(self.columns.max(1)) {
            output.extend(row.iter());
            output.push('\n');
        }
        output
    }
}

impl RenderSink for AsciiSink {
    fn clear_all(&mut self) {
        self.glyphs.fill(' ');
    }

    fn render_tile(&mut self, cell: CellCoord, tile: Tile) {
        let (Ok(column), Ok(row)) = (usize::try_from(cell.column()), usize::try_from(cell.row()))
        else {
            return;
        };
        if column >= self.columns || row >= self.rows {
            return;
        }
        self.glyphs[row * self.columns + column] = glyph(tile);
    }
}
