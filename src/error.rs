//! Error types for stata-cells.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for stata-cells operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised at the execution and editor boundaries.
///
/// Cell parsing never fails; these only come from dispatching code to a
/// backend, talking to the client, or reading configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// No backend can execute code for this language.
    #[error("execution not supported for language: {0}")]
    UnsupportedLanguage(String),

    /// The native application cannot be driven on this platform.
    #[error("sending code to Stata is not supported on {0}")]
    UnsupportedPlatform(&'static str),

    /// AppleScript rejects commands above a fixed size.
    #[error("code to send must be <= {max} characters (got {len})")]
    CommandTooLong { len: usize, max: usize },

    /// `$HOME` is needed to stage code for the clipboard.
    #[error("HOME environment variable is not set")]
    HomeNotSet,

    /// A helper program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    Script {
        program: String,
        status: String,
        stderr: String,
    },

    /// The LSP client rejected or failed a request.
    #[error("client request failed: {0}")]
    Client(String),

    /// Settings file could not be parsed.
    #[error("invalid settings in {}: {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tower_lsp::jsonrpc::Error> for Error {
    fn from(err: tower_lsp::jsonrpc::Error) -> Self {
        Error::Client(err.to_string())
    }
}
