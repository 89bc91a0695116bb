//! Code cells: parsing, positional queries, and the commands built on them.
//!
//! This module provides:
//! - `CellParser` and the per-language registry
//! - `navigate` queries (current/next/previous cell, run ranges)
//! - `CodeCellManager`, which runs, moves between, and inserts cells

mod manager;
pub mod navigate;
mod parser;

pub use manager::{CodeCellManager, EditorSurface};
pub use parser::{parse_cells, parser_for, supported_language_ids, Cell, CellKind, CellParser};
