//! Command ids accepted by `workspace/executeCommand`.

use serde_json::Value;
use tower_lsp::lsp_types::Url;

/// Every command the server executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellCommand {
    RunCurrentCell,
    RunCurrentCellAndAdvance,
    RunNextCell,
    RunAllCells,
    RunAboveCells,
    RunCurrentAndBelow,
    GoToPreviousCell,
    GoToNextCell,
    InsertCodeCell,
    OpenInteractive,
    SendAll,
    SendAbove,
    SendCurrentAndBelow,
    SendSelectionOrCurrentLine,
}

impl CellCommand {
    pub const ALL: [CellCommand; 14] = [
        CellCommand::RunCurrentCell,
        CellCommand::RunCurrentCellAndAdvance,
        CellCommand::RunNextCell,
        CellCommand::RunAllCells,
        CellCommand::RunAboveCells,
        CellCommand::RunCurrentAndBelow,
        CellCommand::GoToPreviousCell,
        CellCommand::GoToNextCell,
        CellCommand::InsertCodeCell,
        CellCommand::OpenInteractive,
        CellCommand::SendAll,
        CellCommand::SendAbove,
        CellCommand::SendCurrentAndBelow,
        CellCommand::SendSelectionOrCurrentLine,
    ];

    pub fn id(self) -> &'static str {
        match self {
            CellCommand::RunCurrentCell => "stata.runCurrentCell",
            CellCommand::RunCurrentCellAndAdvance => "stata.runCurrentCellAndAdvance",
            CellCommand::RunNextCell => "stata.runNextCell",
            CellCommand::RunAllCells => "stata.runAllCells",
            CellCommand::RunAboveCells => "stata.runAboveCells",
            CellCommand::RunCurrentAndBelow => "stata.runCurrentAndBelow",
            CellCommand::GoToPreviousCell => "stata.goToPreviousCell",
            CellCommand::GoToNextCell => "stata.goToNextCell",
            CellCommand::InsertCodeCell => "stata.insertCodeCell",
            CellCommand::OpenInteractive => "stata.openInteractive",
            CellCommand::SendAll => "stata.sendAll",
            CellCommand::SendAbove => "stata.sendAbove",
            CellCommand::SendCurrentAndBelow => "stata.sendCurrentAndBelow",
            CellCommand::SendSelectionOrCurrentLine => "stata.sendSelectionOrCurrentLine",
        }
    }

    pub fn from_id(id: &str) -> Option<CellCommand> {
        Self::ALL.into_iter().find(|command| command.id() == id)
    }

    /// Cell commands go quiet while interactive features are disabled; the
    /// line-oriented sends do not depend on cells.
    pub fn is_cell_command(self) -> bool {
        !matches!(
            self,
            CellCommand::SendAll
                | CellCommand::SendAbove
                | CellCommand::SendCurrentAndBelow
                | CellCommand::SendSelectionOrCurrentLine
        )
    }

    /// Ids advertised in the server capabilities.
    pub fn ids() -> Vec<String> {
        Self::ALL.iter().map(|command| command.id().to_string()).collect()
    }
}

/// Positional `[uri?, line?]` command arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandArgs {
    pub uri: Option<Url>,
    pub line: Option<u32>,
}

impl CommandArgs {
    /// Lenient parse: anything unrecognizable is treated as absent.
    pub fn parse(arguments: &[Value]) -> CommandArgs {
        let uri = arguments
            .first()
            .and_then(Value::as_str)
            .and_then(|s| Url::parse(s).ok());
        let line = arguments
            .get(1)
            .and_then(Value::as_u64)
            .and_then(|line| u32::try_from(line).ok());
        CommandArgs { uri, line }
    }
}
