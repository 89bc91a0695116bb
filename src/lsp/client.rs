//! Editor and interactive-window adapters over the LSP client connection.

use std::collections::HashMap;

use tower_lsp::lsp_types::{
    MessageType, Position, Range, ShowDocumentParams, TextEdit, Url, WorkspaceEdit,
};
use tower_lsp::Client;
use tracing::debug;

use super::ext::{OpenInteractive, RunInInteractive, RunInInteractiveParams};
use crate::cells::EditorSurface;
use crate::error::{Error, Result};
use crate::run::InteractiveTransport;

/// Drives the client's editor.
#[derive(Debug, Clone)]
pub struct ClientEditor(pub Client);

#[tower_lsp::async_trait]
impl EditorSurface for ClientEditor {
    async fn reveal(&self, uri: &Url, cursor: Position) -> Result<()> {
        let response = self
            .0
            .show_document(ShowDocumentParams {
                uri: uri.clone(),
                external: Some(false),
                take_focus: Some(true),
                selection: Some(Range::new(cursor, cursor)),
            })
            .await?;
        if response {
            Ok(())
        } else {
            Err(Error::Client(format!("client refused to show {uri}")))
        }
    }

    async fn insert_text(&self, uri: &Url, at: Position, text: &str) -> Result<bool> {
        let edit = WorkspaceEdit {
            changes: Some(HashMap::from([(
                uri.clone(),
                vec![TextEdit::new(Range::new(at, at), text.to_string())],
            )])),
            ..Default::default()
        };
        let response = self.0.apply_edit(edit).await?;
        if let Some(reason) = &response.failure_reason {
            debug!(%uri, %reason, "edit not applied");
        }
        Ok(response.applied)
    }

    async fn show_warning(&self, message: String) {
        self.0.show_message(MessageType::WARNING, message).await;
    }
}

/// Sends code to the interactive window hosted by the client.
#[derive(Debug, Clone)]
pub struct ClientKernel(pub Client);

#[tower_lsp::async_trait]
impl InteractiveTransport for ClientKernel {
    async fn open(&self) -> Result<()> {
        self.0.send_request::<OpenInteractive>(()).await?;
        Ok(())
    }

    async fn send(&self, code: &str) -> Result<()> {
        self.0
            .send_request::<RunInInteractive>(RunInInteractiveParams {
                code: code.to_string(),
            })
            .await?;
        Ok(())
    }
}
