//! Cell commands: run, move between, and insert cells.
//!
//! A [`CodeCellManager`] is built per command for one document. It holds no
//! state of its own; every query re-reads the current snapshot from the
//! [`DocumentStore`], so it always sees the latest text.

use std::sync::Arc;

use tower_lsp::lsp_types::{Position, Url};
use tracing::{debug, warn};

use super::{navigate, Cell};
use crate::document::{DocumentState, DocumentStore};
use crate::error::Result;
use crate::run::{ExecuteCode, RunQueue};

/// The parts of the editor the cell commands drive.
#[tower_lsp::async_trait]
pub trait EditorSurface: Send + Sync {
    /// Show the document and put the cursor at `cursor`.
    async fn reveal(&self, uri: &Url, cursor: Position) -> Result<()>;

    /// Insert `text` at `at`. Returns whether the editor applied the edit.
    async fn insert_text(&self, uri: &Url, at: Position, text: &str) -> Result<bool>;

    /// Surface a non-fatal problem to the user.
    async fn show_warning(&self, message: String);
}

/// Executes cell commands for a single document.
pub struct CodeCellManager<'a> {
    uri: Url,
    cursor: Position,
    documents: &'a DocumentStore,
    executor: &'a dyn ExecuteCode,
    editor: &'a dyn EditorSurface,
    queue: &'a RunQueue,
}

impl<'a> CodeCellManager<'a> {
    /// `cursor` is used whenever a command is not given an explicit line.
    pub fn new(
        uri: Url,
        cursor: Position,
        documents: &'a DocumentStore,
        executor: &'a dyn ExecuteCode,
        editor: &'a dyn EditorSurface,
        queue: &'a RunQueue,
    ) -> Self {
        Self {
            uri,
            cursor,
            documents,
            executor,
            editor,
            queue,
        }
    }

    fn cursor(&self, line: Option<u32>) -> Position {
        line.map(|line| Position::new(line, 0))
            .unwrap_or(self.cursor)
    }

    fn document(&self) -> Option<Arc<DocumentState>> {
        self.documents.indexed(&self.uri)
    }

    fn find(&self, line: Option<u32>, query: fn(&[Cell], Position) -> Option<&Cell>) -> Option<Cell> {
        let document = self.document()?;
        query(document.cells()?, self.cursor(line)).copied()
    }

    pub fn current_cell(&self, line: Option<u32>) -> Option<Cell> {
        self.find(line, navigate::current_cell)
    }

    pub fn next_cell(&self, line: Option<u32>) -> Option<Cell> {
        self.find(line, navigate::next_cell)
    }

    pub fn previous_cell(&self, line: Option<u32>) -> Option<Cell> {
        self.find(line, navigate::previous_cell)
    }

    /// Run cells one after another, each finishing before the next starts.
    ///
    /// A failed cell is reported and the rest still run.
    async fn run_cells(&self, document: &DocumentState, cells: Vec<Cell>) {
        if cells.is_empty() {
            return;
        }

        let _turn = self.queue.acquire().await;
        for cell in &cells {
            let code = document.cell_text(cell);
            debug!(uri = %self.uri, line = cell.start_line(), "running cell");
            if let Err(err) = self.executor.execute(&document.language_id, code).await {
                warn!(uri = %self.uri, line = cell.start_line(), error = %err, "cell failed");
                self.editor
                    .show_warning(format!("Failed to execute cell: {err}"))
                    .await;
            }
        }
    }

    async fn run_selected(
        &self,
        line: Option<u32>,
        select: impl FnOnce(&[Cell], Position) -> Vec<Cell>,
    ) {
        let Some(document) = self.document() else {
            return;
        };
        let Some(cells) = document.cells() else {
            return;
        };
        let selected = select(cells, self.cursor(line));
        self.run_cells(&document, selected).await;
    }

    pub async fn run_current_cell(&self, line: Option<u32>) {
        self.run_selected(line, |cells, cursor| {
            navigate::current_cell(cells, cursor).into_iter().copied().collect()
        })
        .await;
    }

    /// Run the current cell, then move to the next one whether or not the
    /// run succeeded.
    pub async fn run_current_and_advance(&self, line: Option<u32>) {
        self.run_current_cell(line).await;
        self.go_to_next_cell(line).await;
    }

    pub async fn run_next_cell(&self, line: Option<u32>) {
        self.run_selected(line, |cells, cursor| {
            navigate::next_cell(cells, cursor).into_iter().copied().collect()
        })
        .await;
    }

    pub async fn run_all_cells(&self) {
        self.run_selected(None, |cells, _| cells.to_vec()).await;
    }

    pub async fn run_above_cells(&self, line: Option<u32>) {
        self.run_selected(line, |cells, cursor| {
            navigate::cells_above(cells, cursor).copied().collect()
        })
        .await;
    }

    pub async fn run_current_and_below(&self, line: Option<u32>) {
        self.run_selected(line, |cells, cursor| {
            navigate::cells_from(cells, cursor).copied().collect()
        })
        .await;
    }

    async fn go_to_cell(&self, cell: &Cell) {
        let cursor = navigate::cursor_in(cell);
        if let Err(err) = self.editor.reveal(&self.uri, cursor).await {
            warn!(uri = %self.uri, error = %err, "failed to reveal cell");
        }
    }

    pub async fn go_to_previous_cell(&self, line: Option<u32>) {
        if let Some(cell) = self.previous_cell(line) {
            self.go_to_cell(&cell).await;
        }
    }

    pub async fn go_to_next_cell(&self, line: Option<u32>) {
        if let Some(cell) = self.next_cell(line) {
            self.go_to_cell(&cell).await;
        }
    }

    /// Insert an empty cell after the current one (or at the cursor) and move
    /// into it.
    pub async fn insert_code_cell(&self, line: Option<u32>) {
        let Some(document) = self.document() else {
            return;
        };
        let Some(parser) = document.parser() else {
            return;
        };

        let cursor = self.cursor(line);
        let location = navigate::insertion_point(document.cells().unwrap_or_default(), cursor);
        let snippet = parser.new_cell();

        match self.editor.insert_text(&self.uri, location, snippet).await {
            Ok(true) => {
                self.documents
                    .insert(&self.uri, document.version, location, snippet);
                self.go_to_next_cell(Some(location.line)).await;
            }
            Ok(false) => debug!(uri = %self.uri, "editor declined cell insertion"),
            Err(err) => {
                self.editor
                    .show_warning(format!("Failed to insert cell: {err}"))
                    .await;
            }
        }
    }
}
