//! Positional queries over a parsed cell sequence.
//!
//! All functions expect `cells` in document order, as produced by
//! [`CellParser::parse`](super::CellParser::parse).

use tower_lsp::lsp_types::Position;

use super::Cell;

/// The cell containing `position`, if any.
pub fn current_cell(cells: &[Cell], position: Position) -> Option<&Cell> {
    cells.iter().find(|cell| cell.contains(position))
}

/// The first cell after `position`, never the one containing it.
pub fn next_cell(cells: &[Cell], position: Position) -> Option<&Cell> {
    cells
        .iter()
        .find(|cell| cell.range.start >= position && !cell.contains(position))
}

/// The last cell before `position`, never the one containing it.
pub fn previous_cell(cells: &[Cell], position: Position) -> Option<&Cell> {
    cells_above(cells, position).last()
}

/// Cells that lie entirely before `position`.
pub fn cells_above(cells: &[Cell], position: Position) -> impl Iterator<Item = &Cell> {
    cells
        .iter()
        .filter(move |cell| cell.range.start < position && !cell.contains(position))
}

/// The cell containing `position` and every cell after it.
pub fn cells_from(cells: &[Cell], position: Position) -> impl Iterator<Item = &Cell> {
    cells.iter().filter(move |cell| cell.range.end > position)
}

/// Where the cursor lands when moving to `cell`: the first line after the
/// marker, or the marker itself for an empty cell.
pub fn cursor_in(cell: &Cell) -> Position {
    let line = (cell.range.start.line + 1).min(cell.range.end.line);
    Position::new(line, 0)
}

/// Where "insert cell" puts the new snippet: after the cell containing
/// `position`, or at `position` itself when it is outside every cell.
pub fn insertion_point(cells: &[Cell], position: Position) -> Position {
    current_cell(cells, position)
        .map(|cell| cell.range.end)
        .unwrap_or(position)
}
