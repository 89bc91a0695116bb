//! Line-oriented code selection for the send commands.
//!
//! These ignore cell boundaries entirely: they cut the document by line and
//! hand the result to the desktop application.

use tower_lsp::lsp_types::{Position, Range, Url};

use super::native::do_saved_file;
use crate::document::LineIndex;

/// What "send all" hands to the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WholeDocument {
    /// Saved file: a single `do` command naming it.
    SavedFile(String),
    /// Untitled buffer: its text, staged in a temporary do-file.
    Unsaved(String),
}

fn non_blank(text: &str) -> Option<String> {
    (!text.trim().is_empty()).then(|| text.to_string())
}

/// The whole document.
pub fn all(index: &LineIndex) -> Option<String> {
    (!index.source().is_empty()).then(|| index.source().to_string())
}

/// Every line above `line`; nothing when the cursor is on the first line.
pub fn above(index: &LineIndex, line: u32) -> Option<String> {
    if line == 0 {
        return None;
    }
    let range = Range::new(Position::new(0, 0), index.line_end(line - 1));
    non_blank(index.slice(range))
}

/// `line` through the end of the document.
pub fn current_and_below(index: &LineIndex, line: u32) -> Option<String> {
    if line >= index.line_count() {
        return None;
    }
    let last = index.line_count() - 1;
    let range = Range::new(Position::new(line, 0), index.line_end(last));
    non_blank(index.slice(range))
}

/// The selected text, or the cursor line when the selection is empty.
pub fn selection_or_line(index: &LineIndex, selection: Option<Range>, line: u32) -> Option<String> {
    let range = match selection {
        Some(range) if range.start != range.end => range,
        _ => index.line_range(line),
    };
    non_blank(index.slice(range))
}

/// The whole document as a saved-file command or as text; nothing when the
/// document is empty, saved or not.
pub fn whole_document(uri: &Url, index: &LineIndex) -> Option<WholeDocument> {
    let code = all(index)?;
    match uri.to_file_path() {
        Ok(path) => Some(WholeDocument::SavedFile(do_saved_file(&path))),
        Err(()) => Some(WholeDocument::Unsaved(code)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> LineIndex {
        LineIndex::new("sysuse auto\nsummarize price\n\nregress price mpg".to_string())
    }

    #[test]
    fn all_requires_content() {
        assert_eq!(all(&LineIndex::new(String::new())), None);
        assert_eq!(all(&doc()).unwrap().lines().count(), 4);
    }

    #[test]
    fn above_stops_before_cursor_line() {
        assert_eq!(above(&doc(), 0), None);
        assert_eq!(above(&doc(), 2).as_deref(), Some("sysuse auto\nsummarize price"));
    }

    #[test]
    fn current_and_below_runs_to_end() {
        assert_eq!(
            current_and_below(&doc(), 1).as_deref(),
            Some("summarize price\n\nregress price mpg")
        );
        assert_eq!(current_and_below(&doc(), 10), None);
    }

    #[test]
    fn selection_wins_over_line() {
        let selection = Range::new(Position::new(1, 10), Position::new(1, 15));
        assert_eq!(
            selection_or_line(&doc(), Some(selection), 0).as_deref(),
            Some("price")
        );
    }

    #[test]
    fn empty_selection_falls_back_to_line() {
        let caret = Range::new(Position::new(3, 2), Position::new(3, 2));
        assert_eq!(
            selection_or_line(&doc(), Some(caret), 3).as_deref(),
            Some("regress price mpg")
        );
        assert_eq!(selection_or_line(&doc(), None, 2), None);
    }

    #[test]
    fn whole_document_saved_or_unsaved() {
        let saved = Url::parse("file:///work/analysis.do").unwrap();
        assert_eq!(
            whole_document(&saved, &doc()),
            Some(WholeDocument::SavedFile("do `\"/work/analysis.do\"'".to_string()))
        );

        let untitled = Url::parse("untitled:Untitled-1").unwrap();
        assert!(matches!(
            whole_document(&untitled, &doc()),
            Some(WholeDocument::Unsaved(code)) if code.starts_with("sysuse auto")
        ));
    }

    #[test]
    fn empty_saved_document_is_not_run() {
        let saved = Url::parse("file:///work/empty.do").unwrap();
        assert_eq!(whole_document(&saved, &LineIndex::new(String::new())), None);
    }
}
