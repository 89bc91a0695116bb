//! Active-cell border highlighting.

use tower_lsp::lsp_types::{Position, Url};

use super::ext::CellDecorationParams;
use crate::cells::Cell;
use crate::document::LineIndex;

/// Top and bottom border lines for every cell containing `cursor`.
pub fn cell_decorations(
    uri: &Url,
    cells: &[Cell],
    cursor: Position,
    line_index: &LineIndex,
) -> CellDecorationParams {
    let mut decorations = CellDecorationParams {
        uri: Some(uri.clone()),
        ..Default::default()
    };

    for cell in cells.iter().filter(|cell| cell.contains(cursor)) {
        decorations.top.push(line_index.line_range(cell.start_line()));
        decorations.bottom.push(line_index.line_range(cell.end_line()));
    }
    decorations
}
