//! Gutter actions for cells.

use serde_json::Value;
use tower_lsp::lsp_types::{CodeLens, Command, Range, Url};

use super::commands::CellCommand;
use crate::cells::Cell;

fn lens(uri: &Url, range: Range, title: &str, command: CellCommand) -> CodeLens {
    CodeLens {
        range,
        command: Some(Command {
            title: title.to_string(),
            command: command.id().to_string(),
            arguments: Some(vec![
                Value::String(uri.to_string()),
                Value::from(range.start.line),
            ]),
        }),
        data: None,
    }
}

/// "Run Cell" on every cell, "Run Above" on all but the first, and
/// "Run Next" on all but the last.
pub fn code_lenses(uri: &Url, cells: &[Cell]) -> Vec<CodeLens> {
    let mut lenses = Vec::with_capacity(cells.len() * 3);
    for (i, cell) in cells.iter().enumerate() {
        lenses.push(lens(uri, cell.range, "$(run) Run Cell", CellCommand::RunCurrentCell));
        if i > 0 {
            lenses.push(lens(uri, cell.range, "Run Above", CellCommand::RunAboveCells));
        }
        if i + 1 < cells.len() {
            lenses.push(lens(uri, cell.range, "Run Next", CellCommand::RunNextCell));
        }
    }
    lenses
}
