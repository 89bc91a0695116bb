//! LSP presentation: lenses, decorations, context flags, commands and the
//! custom `stata/*` protocol.

mod client;
mod code_lens;
mod commands;
mod context;
mod decorations;
pub mod ext;

pub use client::{ClientEditor, ClientKernel};
pub use code_lens::code_lenses;
pub use commands::{CellCommand, CommandArgs};
pub use context::context_keys;
pub use decorations::cell_decorations;
