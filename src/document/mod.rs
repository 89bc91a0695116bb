//! Document state management and text utilities.
//!
//! This module provides:
//! - `LineIndex` for line lookup and LSP position <-> byte offset conversion
//! - `DocumentState` and `DocumentStore` for document lifecycle management

mod state;
mod text;

pub use state::{resolve_language_id, DocumentState, DocumentStore};
pub use text::LineIndex;
