//! Document state management: the per-document cell index cache.

use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::{Position, Url};
use tracing::debug;

use crate::cells::{parser_for, Cell, CellParser};

use super::text::LineIndex;

/// Extensions that are Stata regardless of what the client calls them.
const STATA_EXTENSIONS: &[&str] = &["do", "ado", "mata"];

/// Pick the language a document is indexed under.
///
/// The client's language id wins when a parser is registered for it;
/// otherwise Stata file extensions are recognized.
pub fn resolve_language_id(uri: &Url, client_language_id: &str) -> String {
    if parser_for(client_language_id).is_some() {
        return client_language_id.to_string();
    }

    let is_stata_file = uri
        .path()
        .rsplit_once('.')
        .map(|(_, ext)| STATA_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
        .unwrap_or(false);

    if is_stata_file {
        "stata".to_string()
    } else {
        client_language_id.to_string()
    }
}

/// Immutable snapshot of one open document and its cells.
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Pre-computed line index for position conversion.
    pub line_index: LineIndex,
    /// Language the document is indexed under.
    pub language_id: String,
    /// Document version from the client.
    pub version: i32,
    /// Cells, or None when the language has no parser.
    cells: Option<Arc<[Cell]>>,
}

impl DocumentState {
    /// Create a new document state, parsing cells if the language is supported.
    pub fn new(language_id: String, source: String, version: i32) -> Self {
        let line_index = LineIndex::new(source);
        let cells: Option<Arc<[Cell]>> =
            parser_for(&language_id).map(|parser| Arc::from(parser.parse(&line_index)));

        Self {
            line_index,
            language_id,
            version,
            cells,
        }
    }

    /// Parser for this document's language.
    pub fn parser(&self) -> Option<&'static CellParser> {
        parser_for(&self.language_id)
    }

    /// Cells in document order; None means "not indexed", which is
    /// different from an indexed document with zero cells.
    pub fn cells(&self) -> Option<&[Cell]> {
        self.cells.as_deref()
    }

    pub fn is_indexed(&self) -> bool {
        self.cells.is_some()
    }

    /// Executable text of a cell of this document.
    pub fn cell_text(&self, cell: &Cell) -> &str {
        match self.parser() {
            Some(parser) => parser.cell_text(cell, &self.line_index),
            None => "",
        }
    }

    pub fn source(&self) -> &str {
        self.line_index.source()
    }
}

/// Thread-safe storage for open documents.
///
/// Holds at most one snapshot per document. Every text change replaces the
/// snapshot wholesale, so readers never observe cells from older text.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<DocumentState>>,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Open or replace a document.
    pub fn open(
        &self,
        uri: Url,
        client_language_id: &str,
        source: String,
        version: i32,
    ) -> Arc<DocumentState> {
        let language_id = resolve_language_id(&uri, client_language_id);
        let state = Arc::new(DocumentState::new(language_id, source, version));
        debug!(
            %uri,
            language = %state.language_id,
            cells = state.cells().map(<[Cell]>::len),
            "indexed document"
        );
        self.documents.insert(uri, Arc::clone(&state));
        state
    }

    /// Re-index a document after its text changed.
    ///
    /// A document never seen before is opened with a language guessed from
    /// its extension.
    pub fn change(&self, uri: Url, source: String, version: i32) -> Arc<DocumentState> {
        let language_id = self
            .documents
            .get(&uri)
            .map(|state| state.language_id.clone())
            .unwrap_or_default();
        self.open(uri, &language_id, source, version)
    }

    /// Apply an insertion locally and re-index.
    ///
    /// Used right after the client applied the same edit, so queries issued
    /// before its change notification already see it. Does nothing when the
    /// stored version is no longer `expected_version`: the client's own change
    /// already landed and holds the edit. The local snapshot gets the next
    /// version so it never passes for the pre-edit text.
    pub fn insert(
        &self,
        uri: &Url,
        expected_version: i32,
        at: Position,
        text: &str,
    ) -> Option<Arc<DocumentState>> {
        let mut entry = self.documents.get_mut(uri)?;
        if entry.version != expected_version {
            debug!(%uri, expected_version, version = entry.version, "edit already synced");
            return None;
        }
        let offset = entry.line_index.position_to_offset(at)?;

        let mut source = entry.source().to_string();
        source.insert_str(offset, text);

        let state = Arc::new(DocumentState::new(
            entry.language_id.clone(),
            source,
            expected_version + 1,
        ));
        *entry = Arc::clone(&state);
        Some(state)
    }

    /// Close a document.
    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    /// Get a document's state.
    pub fn get(&self, uri: &Url) -> Option<Arc<DocumentState>> {
        self.documents.get(uri).map(|r| Arc::clone(&r))
    }

    /// Get a document's state only if it is indexed for cells.
    pub fn indexed(&self, uri: &Url) -> Option<Arc<DocumentState>> {
        self.get(uri).filter(|state| state.is_indexed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///work/{path}")).unwrap()
    }

    #[test]
    fn language_from_client_or_extension() {
        assert_eq!(resolve_language_id(&uri("a.txt"), "stata"), "stata");
        assert_eq!(resolve_language_id(&uri("a.DO"), "plaintext"), "stata");
        assert_eq!(resolve_language_id(&uri("lib.ado"), ""), "stata");
        assert_eq!(resolve_language_id(&uri("m.mata"), "plaintext"), "stata");
        assert_eq!(resolve_language_id(&uri("a.py"), "python"), "python");
    }

    #[test]
    fn unsupported_document_is_not_indexed() {
        let store = DocumentStore::new();
        store.open(uri("a.py"), "python", "* %%\nx".to_string(), 1);
        assert!(store.get(&uri("a.py")).is_some());
        assert!(store.indexed(&uri("a.py")).is_none());
    }

    #[test]
    fn indexed_with_zero_cells_is_distinct() {
        let store = DocumentStore::new();
        store.open(uri("a.do"), "stata", "sysuse auto".to_string(), 1);
        let state = store.indexed(&uri("a.do")).unwrap();
        assert_eq!(state.cells(), Some(&[][..]));
    }

    #[test]
    fn change_replaces_cells() {
        let store = DocumentStore::new();
        let u = uri("a.do");
        store.open(u.clone(), "stata", "* %%\nx".to_string(), 1);
        assert_eq!(store.get(&u).unwrap().cells().unwrap().len(), 1);

        store.change(u.clone(), "* %%\nx\n* %%\ny".to_string(), 2);
        let state = store.get(&u).unwrap();
        assert_eq!(state.version, 2);
        assert_eq!(state.cells().unwrap().len(), 2);
    }

    #[test]
    fn change_keeps_client_language() {
        let store = DocumentStore::new();
        let u = uri("notes.txt");
        store.open(u.clone(), "stata", String::new(), 1);
        store.change(u.clone(), "* %%\nx".to_string(), 2);
        assert_eq!(store.indexed(&u).unwrap().language_id, "stata");
    }

    #[test]
    fn repeated_queries_are_identical() {
        let store = DocumentStore::new();
        let u = uri("a.do");
        store.open(u.clone(), "stata", "* %%\na\n* %%\nb".to_string(), 1);
        let first = store.get(&u).unwrap();
        let second = store.get(&u).unwrap();
        assert_eq!(first.cells(), second.cells());
    }

    #[test]
    fn insert_reindexes_locally() {
        let store = DocumentStore::new();
        let u = uri("a.do");
        store.open(u.clone(), "stata", "* %%\na=1".to_string(), 3);

        let state = store.insert(&u, 3, Position::new(1, 3), "\n* %%\n").unwrap();
        assert_eq!(state.source(), "* %%\na=1\n* %%\n");
        assert_eq!(state.version, 4);
        assert_eq!(state.cells().unwrap().len(), 2);
    }

    #[test]
    fn insert_after_client_change_is_skipped() {
        let store = DocumentStore::new();
        let u = uri("a.do");
        store.open(u.clone(), "stata", "* %%\na=1".to_string(), 3);
        store.change(u.clone(), "* %%\na=1\n* %%\n".to_string(), 4);

        assert!(store.insert(&u, 3, Position::new(1, 3), "\n* %%\n").is_none());
        let state = store.get(&u).unwrap();
        assert_eq!(state.source(), "* %%\na=1\n* %%\n");
        assert_eq!(state.version, 4);
    }

    #[test]
    fn close_discards_index() {
        let store = DocumentStore::new();
        let u = uri("a.do");
        store.open(u.clone(), "stata", "* %%".to_string(), 1);
        store.close(&u);
        assert!(store.get(&u).is_none());
        assert!(store.insert(&u, 1, Position::new(0, 0), "x").is_none());
    }
}
