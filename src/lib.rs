//! Stata code cells language server.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde_json::Value;
use tower_lsp::jsonrpc::{self, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};
use tracing::{debug, info, warn};

mod cells;
mod debounce;
mod document;
mod error;
mod lsp;
mod run;
mod settings;

pub use cells::{
    navigate, parse_cells, parser_for, supported_language_ids, Cell, CellKind, CellParser,
    CodeCellManager, EditorSurface,
};
pub use debounce::Debouncer;
pub use document::{resolve_language_id, DocumentState, DocumentStore, LineIndex};
pub use error::Error;
pub use lsp::ext;
pub use lsp::{cell_decorations, code_lenses, context_keys, CellCommand, CommandArgs};
pub use run::{
    send, split_magics, ExecuteCode, InteractiveTransport, InteractiveWindow, MagicSplit,
    NativeApp, RunQueue,
};
pub use settings::{
    detect_stata_path, discover_settings, load_settings, parse_settings, stata_path_candidates,
    CellBackend, Settings,
};

use lsp::ext::{CellDecorationParams, CellDecorations, ContextKeys, SelectionParams, SetContext};
use lsp::{ClientEditor, ClientKernel};

/// Delay before decorations follow a text or configuration change.
const DECORATION_DEBOUNCE: Duration = Duration::from_millis(250);

const EMPTY_SEND: &str = "The editor looks empty, please add some Stata code";

/// The editor the user is typing in.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveEditor {
    uri: Url,
    position: Position,
    selection: Option<Range>,
}

/// State shared between request handlers and debounced refreshes.
#[derive(Debug)]
struct Shared {
    documents: DocumentStore,
    settings: RwLock<Settings>,
    active: RwLock<Option<ActiveEditor>>,
    queue: RunQueue,
    debouncer: Debouncer,
}

impl Shared {
    fn new() -> Self {
        Self {
            documents: DocumentStore::new(),
            settings: RwLock::new(Settings::default()),
            active: RwLock::new(None),
            queue: RunQueue::new(),
            debouncer: Debouncer::new(DECORATION_DEBOUNCE),
        }
    }

    fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_settings(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    fn active(&self) -> Option<ActiveEditor> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_active(&self, editor: ActiveEditor) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(editor);
    }

    /// Drop a closed document. Returns whether it was the active one, in
    /// which case there is no active editor afterwards.
    fn close(&self, uri: &Url) -> bool {
        self.documents.close(uri);
        let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|editor| &editor.uri == uri) {
            *active = None;
            true
        } else {
            false
        }
    }

    fn is_active(&self, uri: &Url) -> bool {
        self.active().is_some_and(|editor| &editor.uri == uri)
    }

    /// Context flags for the active document and, when there is an active
    /// editor, its cell borders.
    fn presentation(&self) -> (ContextKeys, Option<CellDecorationParams>) {
        let enabled = self.settings().use_interactive;
        let Some(active) = self.active() else {
            return (context_keys(enabled, None), None);
        };

        let document = self.documents.get(&active.uri);
        let keys = context_keys(enabled, document.as_deref());

        let decorations = match document.as_deref() {
            Some(doc) if enabled => match doc.cells() {
                Some(cells) => cell_decorations(&active.uri, cells, active.position, &doc.line_index),
                None => CellDecorationParams::cleared(&active.uri),
            },
            _ => CellDecorationParams::cleared(&active.uri),
        };
        (keys, Some(decorations))
    }

    async fn refresh_presentation(&self, client: &Client) {
        let (keys, decorations) = self.presentation();
        client.send_notification::<SetContext>(keys).await;
        if let Some(decorations) = decorations {
            client.send_notification::<CellDecorations>(decorations).await;
        }
    }
}

pub struct Backend {
    client: Client,
    shared: Arc<Shared>,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            shared: Arc::new(Shared::new()),
        }
    }

    /// Recompute decorations and context flags once edits settle.
    fn schedule_refresh(&self) {
        let client = self.client.clone();
        let shared = Arc::clone(&self.shared);
        self.shared.debouncer.schedule(async move {
            shared.refresh_presentation(&client).await;
        });
    }

    /// Cursor tracking from the client; refreshes presentation immediately.
    pub async fn did_change_selection(&self, params: SelectionParams) {
        debug!(uri = %params.uri, line = params.position.line, "selection changed");
        self.shared.set_active(ActiveEditor {
            uri: params.uri,
            position: params.position,
            selection: params.selection,
        });
        self.shared.debouncer.cancel();
        self.shared.refresh_presentation(&self.client).await;
    }

    fn executor(&self, settings: &Settings) -> Box<dyn ExecuteCode> {
        match settings.cell_backend {
            CellBackend::Interactive => {
                Box::new(InteractiveWindow::new(ClientKernel(self.client.clone())))
            }
            CellBackend::Native => Box::new(NativeApp::new(
                settings.which_app.clone(),
                settings.focus_window,
            )),
        }
    }

    async fn run_cell_command(
        &self,
        command: CellCommand,
        uri: Url,
        cursor: Position,
        line: Option<u32>,
        settings: &Settings,
    ) {
        if command == CellCommand::OpenInteractive {
            let window = InteractiveWindow::new(ClientKernel(self.client.clone()));
            if let Err(err) = window.open().await {
                tracing::error!(error = %err, "failed to open interactive window");
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to open interactive window: {err}"),
                    )
                    .await;
            }
            return;
        }

        let executor = self.executor(settings);
        let editor = ClientEditor(self.client.clone());
        let manager = CodeCellManager::new(
            uri,
            cursor,
            &self.shared.documents,
            executor.as_ref(),
            &editor,
            &self.shared.queue,
        );

        match command {
            CellCommand::RunCurrentCell => manager.run_current_cell(line).await,
            CellCommand::RunCurrentCellAndAdvance => manager.run_current_and_advance(line).await,
            CellCommand::RunNextCell => manager.run_next_cell(line).await,
            CellCommand::RunAllCells => manager.run_all_cells().await,
            CellCommand::RunAboveCells => manager.run_above_cells(line).await,
            CellCommand::RunCurrentAndBelow => manager.run_current_and_below(line).await,
            CellCommand::GoToPreviousCell => manager.go_to_previous_cell(line).await,
            CellCommand::GoToNextCell => manager.go_to_next_cell(line).await,
            CellCommand::InsertCodeCell => manager.insert_code_cell(line).await,
            _ => {}
        }
    }

    /// Line-oriented sends to the desktop application.
    async fn send_to_app(
        &self,
        command: CellCommand,
        uri: &Url,
        line: u32,
        selection: Option<Range>,
        settings: &Settings,
    ) {
        let Some(document) = self.shared.documents.get(uri) else {
            return;
        };
        let app = NativeApp::new(settings.which_app.clone(), settings.focus_window);
        let index = &document.line_index;

        let _turn = self.shared.queue.acquire().await;
        let outcome = match command {
            CellCommand::SendAll => match send::whole_document(uri, index) {
                Some(send::WholeDocument::SavedFile(command)) => app.dispatch(&command).await,
                Some(send::WholeDocument::Unsaved(code)) => app.send_code(&code).await,
                None => {
                    self.client.show_message(MessageType::ERROR, EMPTY_SEND).await;
                    return;
                }
            },
            _ => {
                let code = match command {
                    CellCommand::SendAbove => send::above(index, line),
                    CellCommand::SendCurrentAndBelow => send::current_and_below(index, line),
                    _ => send::selection_or_line(index, selection, line),
                };
                match code {
                    Some(code) => app.send_code(&code).await,
                    None => {
                        self.client.show_message(MessageType::ERROR, EMPTY_SEND).await;
                        return;
                    }
                }
            }
        };

        if let Err(err) = outcome {
            tracing::error!(%uri, command = command.id(), error = %err, "send failed");
            self.client
                .show_message(MessageType::ERROR, err.to_string())
                .await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let workspace_root = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .and_then(|f| f.uri.to_file_path().ok())
            .or_else(|| {
                #[allow(deprecated)]
                params.root_uri.as_ref()?.to_file_path().ok()
            });

        let mut settings = match &workspace_root {
            Some(root) => {
                let (settings, settings_dir) = discover_settings(root);
                debug!(dir = %settings_dir.display(), "settings resolved");
                settings
            }
            None => Settings::default(),
        };
        if let Some(options) = &params.initialization_options {
            settings = settings.merged_with(options);
        }
        if settings.stata_path.is_none() {
            settings.stata_path = detect_stata_path(&stata_path_candidates());
        }
        info!(
            use_interactive = settings.use_interactive,
            backend = ?settings.cell_backend,
            stata_path = ?settings.stata_path,
            "initializing"
        );
        self.shared.set_settings(settings);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                code_lens_provider: Some(CodeLensOptions {
                    resolve_provider: Some(false),
                }),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: CellCommand::ids(),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("initialized");
        self.client
            .log_message(MessageType::INFO, "Stata cells language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        self.shared.debouncer.cancel();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.clone();
        self.shared
            .documents
            .open(doc.uri, &doc.language_id, doc.text, doc.version);
        if self.shared.is_active(&uri) {
            self.schedule_refresh();
        }
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        // We use FULL sync, so there's exactly one change with the full text
        let Some(change) = params.content_changes.into_iter().next() else {
            return;
        };
        let uri = params.text_document.uri;
        self.shared
            .documents
            .change(uri.clone(), change.text, params.text_document.version);
        if self.shared.is_active(&uri) {
            self.schedule_refresh();
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        if self.shared.close(&uri) {
            self.shared.debouncer.cancel();
            self.client
                .send_notification::<CellDecorations>(CellDecorationParams::cleared(&uri))
                .await;
            self.shared.refresh_presentation(&self.client).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let previous = self.shared.settings();
        let settings = previous.merged_with(&params.settings);
        let toggled = settings.use_interactive != previous.use_interactive;
        if settings != previous {
            info!(use_interactive = settings.use_interactive, "settings changed");
        }
        self.shared.set_settings(settings);

        if toggled {
            if let Err(err) = self.client.code_lens_refresh().await {
                debug!(error = %err, "code lens refresh not supported");
            }
        }
        self.schedule_refresh();
    }

    async fn code_lens(&self, params: CodeLensParams) -> Result<Option<Vec<CodeLens>>> {
        if !self.shared.settings().use_interactive {
            return Ok(None);
        }
        let uri = &params.text_document.uri;
        let Some(document) = self.shared.documents.indexed(uri) else {
            return Ok(None);
        };
        Ok(document.cells().map(|cells| code_lenses(uri, cells)))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        let Some(command) = CellCommand::from_id(&params.command) else {
            warn!(command = %params.command, "unknown command");
            return Err(jsonrpc::Error::invalid_params(format!(
                "unknown command: {}",
                params.command
            )));
        };

        let settings = self.shared.settings();
        if command.is_cell_command() && !settings.use_interactive {
            debug!(command = command.id(), "interactive features disabled");
            return Ok(None);
        }

        let args = CommandArgs::parse(&params.arguments);
        let active = self.shared.active();
        let Some(uri) = args.uri.or_else(|| active.as_ref().map(|a| a.uri.clone())) else {
            debug!(command = command.id(), "no target document");
            return Ok(None);
        };
        let active = active.filter(|editor| editor.uri == uri);
        let cursor = active.as_ref().map(|a| a.position).unwrap_or_default();
        let selection = active.and_then(|a| a.selection);

        debug!(command = command.id(), %uri, line = ?args.line, "executing command");
        if command.is_cell_command() {
            self.run_cell_command(command, uri, cursor, args.line, &settings)
                .await;
        } else {
            let line = args.line.unwrap_or(cursor.line);
            self.send_to_app(command, &uri, line, selection, &settings)
                .await;
        }
        Ok(None)
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::build(Backend::new)
        .custom_method(
            <ext::DidChangeSelection as notification::Notification>::METHOD,
            Backend::did_change_selection,
        )
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///work/{path}")).unwrap()
    }

    fn focus(shared: &Shared, uri: &Url, line: u32) {
        shared.set_active(ActiveEditor {
            uri: uri.clone(),
            position: Position::new(line, 0),
            selection: None,
        });
    }

    #[test]
    fn service_can_be_created() {
        let (_service, _socket) = create_service();
    }

    #[test]
    fn no_active_editor_has_no_decorations() {
        let shared = Shared::new();
        let (keys, decorations) = shared.presentation();
        assert_eq!(keys, ContextKeys::default());
        assert!(decorations.is_none());
    }

    #[test]
    fn active_cell_is_decorated() {
        let shared = Shared::new();
        let u = uri("a.do");
        shared
            .documents
            .open(u.clone(), "stata", "* %%\na\n* %%\nb\nc".to_string(), 1);
        focus(&shared, &u, 3);

        let (keys, decorations) = shared.presentation();
        assert!(keys.supports_code_cells && keys.has_code_cells);
        let decorations = decorations.unwrap();
        assert_eq!(decorations.top[0].start.line, 2);
        assert_eq!(decorations.bottom[0].start.line, 4);
    }

    #[test]
    fn disabling_clears_decorations() {
        let shared = Shared::new();
        let u = uri("a.do");
        shared.documents.open(u.clone(), "stata", "* %%\na".to_string(), 1);
        focus(&shared, &u, 1);
        shared.set_settings(Settings {
            use_interactive: false,
            ..Settings::default()
        });

        let (keys, decorations) = shared.presentation();
        assert!(!keys.supports_code_cells);
        assert_eq!(decorations, Some(CellDecorationParams::cleared(&u)));
    }

    #[test]
    fn closing_the_active_document_resets_flags() {
        let shared = Shared::new();
        let u = uri("a.do");
        shared.documents.open(u.clone(), "stata", "* %%\na".to_string(), 1);
        focus(&shared, &u, 1);
        assert!(shared.presentation().0.has_code_cells);

        assert!(shared.close(&u));
        assert!(!shared.is_active(&u));
        let (keys, decorations) = shared.presentation();
        assert_eq!(keys, ContextKeys::default());
        assert!(decorations.is_none());
    }

    #[test]
    fn closing_another_document_keeps_the_active_one() {
        let shared = Shared::new();
        let active = uri("a.do");
        let other = uri("b.do");
        shared.documents.open(other.clone(), "stata", "* %%".to_string(), 1);
        focus(&shared, &active, 0);

        assert!(!shared.close(&other));
        assert!(shared.is_active(&active));
        assert!(shared.documents.get(&other).is_none());
    }

    #[test]
    fn only_the_active_document_is_active() {
        let shared = Shared::new();
        focus(&shared, &uri("a.do"), 0);
        assert!(shared.is_active(&uri("a.do")));
        assert!(!shared.is_active(&uri("b.do")));
    }
}
