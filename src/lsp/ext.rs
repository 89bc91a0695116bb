//! Custom `stata/*` protocol extensions.
//!
//! Standard LSP has no notion of cursor tracking, editor decorations, or
//! context keys, so those travel over these methods.

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::notification::Notification;
use tower_lsp::lsp_types::request::Request;
use tower_lsp::lsp_types::{Position, Range, Url};

/// Client → server: the active editor or its selection changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionParams {
    pub uri: Url,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Range>,
}

pub enum DidChangeSelection {}

impl Notification for DidChangeSelection {
    type Params = SelectionParams;
    const METHOD: &'static str = "stata/didChangeSelection";
}

/// Server → client: borders to draw around the cell under the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellDecorationParams {
    pub uri: Option<Url>,
    /// Whole first lines of the active cells.
    pub top: Vec<Range>,
    /// Whole last lines of the active cells.
    pub bottom: Vec<Range>,
}

impl CellDecorationParams {
    /// Removes every border in `uri`.
    pub fn cleared(uri: &Url) -> Self {
        Self {
            uri: Some(uri.clone()),
            ..Default::default()
        }
    }
}

pub enum CellDecorations {}

impl Notification for CellDecorations {
    type Params = CellDecorationParams;
    const METHOD: &'static str = "stata/cellDecorations";
}

/// Server → client: UI enablement flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextKeys {
    pub supports_code_cells: bool,
    pub has_code_cells: bool,
}

pub enum SetContext {}

impl Notification for SetContext {
    type Params = ContextKeys;
    const METHOD: &'static str = "stata/setContext";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInInteractiveParams {
    pub code: String,
}

/// Server → client: append code to the interactive window and execute it.
pub enum RunInInteractive {}

impl Request for RunInInteractive {
    type Params = RunInInteractiveParams;
    type Result = ();
    const METHOD: &'static str = "stata/runInInteractive";
}

/// Server → client: open (or reuse) the interactive window.
pub enum OpenInteractive {}

impl Request for OpenInteractive {
    type Params = ();
    type Result = ();
    const METHOD: &'static str = "stata/openInteractive";
}
