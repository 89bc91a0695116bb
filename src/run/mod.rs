//! Execution backends.
//!
//! Cells are executed by handing their text to an [`ExecuteCode`]
//! implementation:
//! - [`InteractiveWindow`]: a notebook-style session owned by the client
//! - [`NativeApp`]: the desktop application, driven through OS automation
//!
//! [`send`] selects line ranges for the whole-document send commands.

mod interactive;
mod native;
pub mod send;

use tokio::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};

pub use interactive::{split_magics, InteractiveTransport, InteractiveWindow, MagicSplit};
pub use native::{
    applescript_commands, do_saved_file, escape_applescript, NativeApp, MAX_COMMAND_LEN,
};

/// The only language any backend executes.
pub const STATA_LANGUAGE_ID: &str = "stata";

/// Something that can run a chunk of code and report when it is done.
#[tower_lsp::async_trait]
pub trait ExecuteCode: Send + Sync {
    async fn execute(&self, language_id: &str, code: &str) -> Result<()>;
}

/// Reject anything that is not Stata before it reaches a backend.
pub(crate) fn ensure_stata(language_id: &str) -> Result<()> {
    if language_id == STATA_LANGUAGE_ID {
        Ok(())
    } else {
        Err(Error::UnsupportedLanguage(language_id.to_string()))
    }
}

/// FIFO gate serializing run requests.
///
/// A run request holds its turn until every cell it covers has finished, so
/// a second request waits behind the first instead of interleaving with it.
#[derive(Debug, Default)]
pub struct RunQueue {
    turn: Mutex<()>,
}

impl RunQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for every earlier request to finish.
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.turn.lock().await
    }
}
