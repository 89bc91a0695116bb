//! Notebook-style interactive window backend.
//!
//! The window itself lives in the client; this side prepares code chunks and
//! forwards them one request at a time. Stata "magic" directives (`*%set`,
//! `*%%head`, ...) must reach the kernel on their own, so they are split out
//! and sent ahead of the remaining code.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::{ensure_stata, ExecuteCode};
use crate::error::Result;

static MAGIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\*+\s*%{1,2}(head|tail|fbrowse|fhead|ftail|locals|delimit|help|set|status|echo|noecho|quietly|qui)",
    )
    .unwrap()
});

static MAGIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*+\s*").unwrap());

/// A code chunk separated into directives and the remaining body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MagicSplit {
    /// Directives with the leading comment stars removed, in source order.
    pub magics: Vec<String>,
    /// Everything else, or None when nothing but directives remain.
    pub body: Option<String>,
}

/// Split a chunk into magic directives and the code that follows them.
///
/// Trailing whitespace is dropped first; a blank chunk yields nothing.
pub fn split_magics(code: &str) -> MagicSplit {
    let trimmed = code.trim_end();
    if trimmed.trim().is_empty() {
        return MagicSplit::default();
    }

    let (magic_lines, other_lines): (Vec<&str>, Vec<&str>) =
        trimmed.split('\n').partition(|line| MAGIC.is_match(line));

    let magics = magic_lines
        .into_iter()
        .map(|line| MAGIC_PREFIX.replace(line, "").into_owned())
        .collect();
    let body = (!other_lines.is_empty()).then(|| other_lines.join("\n"));

    MagicSplit { magics, body }
}

/// Channel to the client-side interactive window.
#[tower_lsp::async_trait]
pub trait InteractiveTransport: Send + Sync {
    /// Open the window (or reuse an open one).
    async fn open(&self) -> Result<()>;

    /// Append `code` as a new notebook cell and execute it.
    async fn send(&self, code: &str) -> Result<()>;
}

/// Interactive window backend.
#[derive(Debug)]
pub struct InteractiveWindow<T> {
    transport: T,
}

impl<T: InteractiveTransport> InteractiveWindow<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub async fn open(&self) -> Result<()> {
        self.transport.open().await
    }

    /// Send one chunk: each directive separately, then the body as one batch.
    pub async fn execute_chunk(&self, code: &str) -> Result<()> {
        let split = split_magics(code);

        for magic in &split.magics {
            debug!(directive = %magic, "sending magic directive");
            self.transport.send(magic).await?;
        }

        if let Some(body) = split.body {
            self.transport.send(&body).await?;
        }
        Ok(())
    }
}

#[tower_lsp::async_trait]
impl<T: InteractiveTransport> ExecuteCode for InteractiveWindow<T> {
    async fn execute(&self, language_id: &str, code: &str) -> Result<()> {
        ensure_stata(language_id)?;
        self.execute_chunk(code).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::error::Error;

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    #[tower_lsp::async_trait]
    impl InteractiveTransport for Recording {
        async fn open(&self) -> Result<()> {
            Ok(())
        }

        async fn send(&self, code: &str) -> Result<()> {
            if self.fail_on == Some(code) {
                return Err(Error::Client("kernel busy".to_string()));
            }
            self.sent.lock().unwrap().push(code.to_string());
            Ok(())
        }
    }

    #[test]
    fn blank_chunk_sends_nothing() {
        assert_eq!(split_magics("  \n\t\n"), MagicSplit::default());
    }

    #[test]
    fn plain_code_is_one_batch() {
        let split = split_magics("sysuse auto\nsummarize price\n\n");
        assert!(split.magics.is_empty());
        assert_eq!(split.body.as_deref(), Some("sysuse auto\nsummarize price"));
    }

    #[test]
    fn directives_are_stripped_and_hoisted() {
        let split = split_magics("sysuse auto\n*%head 5\n**  %%set graph_format svg\nlist");
        assert_eq!(split.magics, vec!["%head 5", "%%set graph_format svg"]);
        assert_eq!(split.body.as_deref(), Some("sysuse auto\nlist"));
    }

    #[test]
    fn ordinary_comments_stay_in_body() {
        let split = split_magics("* a comment\n*% not a directive\nregress y x");
        assert!(split.magics.is_empty());
        assert_eq!(
            split.body.as_deref(),
            Some("* a comment\n*% not a directive\nregress y x")
        );
    }

    #[test]
    fn directives_only_has_no_body() {
        let split = split_magics("*%echo\n*%qui");
        assert_eq!(split.magics, vec!["%echo", "%qui"]);
        assert_eq!(split.body, None);
    }

    #[tokio::test]
    async fn execute_sends_directives_first() {
        let window = InteractiveWindow::new(Recording::default());
        window
            .execute("stata", "display 1\n*%set rmagic\ndisplay 2")
            .await
            .unwrap();

        let sent = window.transport.sent.lock().unwrap().clone();
        assert_eq!(sent, vec!["%set rmagic", "display 1\ndisplay 2"]);
    }

    #[tokio::test]
    async fn execute_rejects_other_languages() {
        let window = InteractiveWindow::new(Recording::default());
        let err = window.execute("python", "print(1)").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
        assert!(window.transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_stops_the_chunk() {
        let window = InteractiveWindow::new(Recording {
            fail_on: Some("%echo"),
            ..Default::default()
        });
        assert!(window.execute("stata", "*%echo\ndisplay 1").await.is_err());
        assert!(window.transport.sent.lock().unwrap().is_empty());
    }
}
