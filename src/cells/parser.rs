//! Cell boundary parsing.
//!
//! Each supported language registers a [`CellParser`]: a small set of line
//! predicates plus the snippet used to insert a new cell. Parsing is a single
//! linear scan that never fails; malformed input at worst yields a degenerate
//! cell.

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{Position, Range};

use crate::document::LineIndex;

/// Classification of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    /// Executable code.
    Code,
    /// Prose, rendered rather than executed.
    Markdown,
}

/// A contiguous, typed span of a document.
///
/// `range.end` is the position just past the last character of the cell's
/// final line, so a cell always covers whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub range: Range,
    pub kind: CellKind,
}

impl Cell {
    pub fn new(start: Position, end: Position, kind: CellKind) -> Self {
        Self {
            range: Range::new(start, end),
            kind,
        }
    }

    /// Inclusive containment: a position at `end` is still inside the cell.
    pub fn contains(&self, position: Position) -> bool {
        self.range.start <= position && position <= self.range.end
    }

    /// Line of the marker that opened this cell.
    pub fn start_line(&self) -> u32 {
        self.range.start.line
    }

    pub fn end_line(&self) -> u32 {
        self.range.end.line
    }
}

/// Per-language strategy for recognizing cells.
#[derive(Debug)]
pub struct CellParser {
    /// Language identifier this parser is registered under.
    pub language_id: &'static str,
    is_cell_start: fn(&str) -> bool,
    is_cell_end: fn(&str) -> bool,
    cell_kind: fn(&str) -> CellKind,
    new_cell: &'static str,
}

impl CellParser {
    pub fn is_cell_start(&self, line: &str) -> bool {
        (self.is_cell_start)(line)
    }

    pub fn is_cell_end(&self, line: &str) -> bool {
        (self.is_cell_end)(line)
    }

    pub fn cell_kind(&self, line: &str) -> CellKind {
        (self.cell_kind)(line)
    }

    /// Snippet inserted by "insert cell".
    pub fn new_cell(&self) -> &'static str {
        self.new_cell
    }

    /// Partition a document into cells, in document order.
    ///
    /// A start marker closes the open cell at the end of the previous line.
    /// An end marker closes the open cell on its own line; lines after it
    /// belong to no cell until the next start marker. Whatever is still open
    /// on the final line is closed there. Content before the first marker is
    /// never part of a cell.
    pub fn parse(&self, index: &LineIndex) -> Vec<Cell> {
        let mut cells = Vec::new();
        let mut open: Option<(Position, CellKind)> = None;
        let last_line = index.line_count() - 1;

        for line in 0..=last_line {
            let text = index.line(line).unwrap_or("");

            if self.is_cell_start(text) {
                if let Some((start, kind)) = open.take() {
                    // An open cell implies an earlier marker, so line > 0
                    cells.push(Cell::new(start, index.line_end(line - 1), kind));
                }
                open = Some((Position::new(line, 0), self.cell_kind(text)));
            } else if self.is_cell_end(text) {
                if let Some((start, kind)) = open.take() {
                    cells.push(Cell::new(start, index.line_end(line), kind));
                }
            }

            if line == last_line {
                if let Some((start, kind)) = open.take() {
                    cells.push(Cell::new(start, index.line_end(line), kind));
                }
            }
        }

        cells.sort_by_key(|cell| cell.range.start);
        cells
    }

    /// Executable text of a cell: everything after the marker line.
    ///
    /// A cell that spans only its marker line has no text.
    pub fn cell_text<'a>(&self, cell: &Cell, index: &'a LineIndex) -> &'a str {
        if cell.range.start.line >= cell.range.end.line {
            return "";
        }
        let body = Range::new(
            Position::new(cell.range.start.line + 1, cell.range.start.character),
            cell.range.end,
        );
        index.slice(body)
    }
}

// No leading whitespace is allowed before the `*`.
static STATA_CELL_START: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\*\s*(%%)").unwrap());

fn stata_is_cell_start(line: &str) -> bool {
    STATA_CELL_START.is_match(line)
}

fn never(_line: &str) -> bool {
    false
}

fn always_code(_line: &str) -> CellKind {
    CellKind::Code
}

static STATA: CellParser = CellParser {
    language_id: "stata",
    is_cell_start: stata_is_cell_start,
    is_cell_end: never,
    cell_kind: always_code,
    new_cell: "\n* %%\n",
};

static PARSERS: &[&CellParser] = &[&STATA];

/// Look up the parser registered for a language.
pub fn parser_for(language_id: &str) -> Option<&'static CellParser> {
    PARSERS
        .iter()
        .copied()
        .find(|parser| parser.language_id == language_id)
}

/// Language identifiers that have a registered parser.
pub fn supported_language_ids() -> impl Iterator<Item = &'static str> {
    PARSERS.iter().map(|parser| parser.language_id)
}

/// Parse a document for the given language.
///
/// Unsupported languages produce no cells.
pub fn parse_cells(index: &LineIndex, language_id: &str) -> Vec<Cell> {
    parser_for(language_id)
        .map(|parser| parser.parse(index))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(lines: &[&str]) -> LineIndex {
        LineIndex::new(lines.join("\n"))
    }

    fn spans(cells: &[Cell]) -> Vec<(u32, u32)> {
        cells.iter().map(|c| (c.start_line(), c.end_line())).collect()
    }

    fn fenced_start(line: &str) -> bool {
        line.starts_with("<<")
    }

    fn fenced_end(line: &str) -> bool {
        line.starts_with(">>")
    }

    fn fenced_kind(line: &str) -> CellKind {
        if line.contains("md") {
            CellKind::Markdown
        } else {
            CellKind::Code
        }
    }

    /// Parser with an explicit end marker, for exercising the end branch.
    static FENCED: CellParser = CellParser {
        language_id: "fenced",
        is_cell_start: fenced_start,
        is_cell_end: fenced_end,
        cell_kind: fenced_kind,
        new_cell: "\n<<\n>>\n",
    };

    #[test]
    fn stata_marker_pattern() {
        let parser = parser_for("stata").unwrap();
        assert!(parser.is_cell_start("* %%"));
        assert!(parser.is_cell_start("*%%"));
        assert!(parser.is_cell_start("*   %% setup"));
        assert!(!parser.is_cell_start(" * %%"));
        assert!(!parser.is_cell_start("** %%"));
        assert!(!parser.is_cell_start("* % %"));
        assert!(!parser.is_cell_start("// %%"));
    }

    #[test]
    fn unsupported_language_has_no_parser() {
        assert!(parser_for("python").is_none());
        assert!(parse_cells(&index(&["* %%", "x"]), "python").is_empty());
        assert_eq!(supported_language_ids().collect::<Vec<_>>(), vec!["stata"]);
    }

    #[test]
    fn no_markers_yields_no_cells() {
        let doc = index(&["sysuse auto", "summarize price", "regress price mpg"]);
        assert!(parse_cells(&doc, "stata").is_empty());
    }

    #[test]
    fn empty_document_yields_no_cells() {
        assert!(parse_cells(&index(&[""]), "stata").is_empty());
    }

    #[test]
    fn start_marker_closes_previous_cell() {
        let doc = index(&["a", "b", "* %%", "c", "d", "* %%", "e"]);
        let cells = parse_cells(&doc, "stata");
        assert_eq!(spans(&cells), vec![(2, 4), (5, 6)]);
        assert_eq!(cells[0].range.end, Position::new(4, 1));
        assert_eq!(cells[1].range.end, Position::new(6, 1));
    }

    #[test]
    fn leading_content_is_outside_cells() {
        let doc = index(&["x=1", "* %%", "y=2", "z=3"]);
        let parser = parser_for("stata").unwrap();
        let cells = parser.parse(&doc);
        assert_eq!(spans(&cells), vec![(1, 3)]);
        assert_eq!(parser.cell_text(&cells[0], &doc), "y=2\nz=3");
    }

    #[test]
    fn adjacent_markers() {
        let doc = index(&["* %%", "* %%", "a=1"]);
        let parser = parser_for("stata").unwrap();
        let cells = parser.parse(&doc);
        assert_eq!(spans(&cells), vec![(0, 0), (1, 2)]);
        assert_eq!(parser.cell_text(&cells[0], &doc), "");
        assert_eq!(parser.cell_text(&cells[1], &doc), "a=1");
    }

    #[test]
    fn marker_on_final_line_has_no_text() {
        let doc = index(&["* %%", "a=1", "* %%"]);
        let parser = parser_for("stata").unwrap();
        let cells = parser.parse(&doc);
        assert_eq!(spans(&cells), vec![(0, 1), (2, 2)]);
        assert_eq!(parser.cell_text(&cells[1], &doc), "");
    }

    #[test]
    fn cell_text_excludes_marker_line() {
        let doc = index(&["* %% load data", "sysuse auto", "* %% model", "regress price mpg"]);
        let parser = parser_for("stata").unwrap();
        for cell in parser.parse(&doc) {
            let text = parser.cell_text(&cell, &doc);
            assert!(!text.contains("%%"), "marker leaked into {text:?}");
        }
    }

    #[test]
    fn cells_are_ordered_and_disjoint() {
        let doc = index(&[
            "* %%", "", "* %%", "* %%", "x", "y", "* %%", "", "", "* %%",
        ]);
        let cells = parse_cells(&doc, "stata");
        assert_eq!(cells.len(), 5);
        for pair in cells.windows(2) {
            assert!(pair[0].range.start < pair[1].range.start);
            assert!(pair[0].range.end < pair[1].range.start);
        }
    }

    #[test]
    fn end_marker_closes_cell_early() {
        let doc = index(&["<< md", "text", ">>", "loose", "<<", "code"]);
        let cells = FENCED.parse(&doc);
        assert_eq!(spans(&cells), vec![(0, 2), (4, 5)]);
        assert_eq!(cells[0].kind, CellKind::Markdown);
        assert_eq!(cells[1].kind, CellKind::Code);
    }

    #[test]
    fn end_marker_without_open_cell_is_ignored() {
        let doc = index(&[">>", "<<", "x"]);
        assert_eq!(spans(&FENCED.parse(&doc)), vec![(1, 2)]);
    }

    #[test]
    fn containment_is_inclusive() {
        let cell = Cell::new(Position::new(1, 0), Position::new(3, 3), CellKind::Code);
        assert!(cell.contains(Position::new(1, 0)));
        assert!(cell.contains(Position::new(3, 3)));
        assert!(!cell.contains(Position::new(3, 4)));
        assert!(!cell.contains(Position::new(0, 9)));
    }
}
