//! Desktop application backend.
//!
//! Code is staged in a temporary do-file and the application is told to run
//! it. On macOS the command goes through AppleScript; on Linux it is pasted
//! into the Stata window with `xclip` and `xdotool`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::process::Command;
use tracing::{debug, info};

use super::{ensure_stata, ExecuteCode};
use crate::error::{Error, Result};

/// Longest command AppleScript's `DoCommandAsync` accepts.
pub const MAX_COMMAND_LEN: usize = 8192;

/// File the Linux paste script reads from.
const LINUX_CODE_FILE: &str = ".stataRun_code";

// `keyup ctrl shift` releases modifiers the user may still be holding from the
// keybinding; otherwise ctrl+v arrives as a bare `v`.
const LINUX_PASTE_SCRIPT: &str = r#"
old_cb="$(xclip -o -selection clipboard)";
this_window="$(xdotool getactivewindow)" &&
stata_window="$(xdotool search --name --limit 1 "Stata/(IC|SE|MP)? 1[0-9].[0-9]")" &&
cat ~/.stataRun_code | xclip -i -selection clipboard &&
xdotool \
  keyup ctrl shift \
  windowactivate --sync $stata_window \
  key --clearmodifiers --delay 100 ctrl+v Return \
  windowactivate --sync $this_window;
printf "$old_cb" | xclip -i -selection clipboard
"#;

/// Escape backslashes and double quotes for an AppleScript string literal.
pub fn escape_applescript(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '\\' || c == '"' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// AppleScript statements that hand `command` to the application.
pub fn applescript_commands(app: &str, command: &str, focus: bool) -> Result<Vec<String>> {
    let escaped = escape_applescript(command);
    if escaped.len() > MAX_COMMAND_LEN {
        return Err(Error::CommandTooLong {
            len: escaped.len(),
            max: MAX_COMMAND_LEN,
        });
    }

    let mut statements = Vec::with_capacity(2);
    if focus {
        statements.push(format!("tell application \"{app}\" to activate"));
    }
    statements.push(format!(
        "tell application \"{app}\" to DoCommandAsync \"{escaped}\""
    ));
    Ok(statements)
}

/// Stata command running a saved do-file, quoted for paths with spaces.
pub fn do_saved_file(path: &Path) -> String {
    format!("do `\"{}\"'", path.display())
}

/// Temporary do-file location for one send.
fn staging_path() -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    std::env::temp_dir().join(format!("StataRun-{millis}.do"))
}

async fn run_program(program: &str, args: &[&str]) -> Result<()> {
    let output = Command::new(program).args(args).output().await?;
    if output.status.success() {
        return Ok(());
    }
    Err(Error::Script {
        program: program.to_string(),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

/// Drives the Stata desktop application.
#[derive(Debug, Clone)]
pub struct NativeApp {
    /// Application name used in AppleScript (e.g. `StataMP`).
    pub which_app: String,
    /// Bring the application to the front before sending.
    pub focus_window: bool,
}

impl NativeApp {
    pub fn new(which_app: impl Into<String>, focus_window: bool) -> Self {
        Self {
            which_app: which_app.into(),
            focus_window,
        }
    }

    /// Stage `code` in a temporary do-file and run it.
    pub async fn send_code(&self, code: &str) -> Result<()> {
        let path = staging_path();
        tokio::fs::write(&path, format!("{code}\n")).await?;
        debug!(path = %path.display(), "staged do-file");
        self.dispatch(&format!("do {}", path.display())).await
    }

    /// Deliver a single Stata command to the running application.
    pub async fn dispatch(&self, command: &str) -> Result<()> {
        if cfg!(target_os = "macos") {
            self.send_mac(command).await
        } else if cfg!(target_os = "linux") {
            self.send_linux(command).await
        } else {
            Err(Error::UnsupportedPlatform(std::env::consts::OS))
        }
    }

    async fn send_mac(&self, command: &str) -> Result<()> {
        for statement in applescript_commands(&self.which_app, command, self.focus_window)? {
            run_program("osascript", &["-e", &statement]).await?;
            info!(%statement, "applescript sent");
        }
        Ok(())
    }

    async fn send_linux(&self, command: &str) -> Result<()> {
        let home = std::env::var_os("HOME").ok_or(Error::HomeNotSet)?;
        let code_file = PathBuf::from(home).join(LINUX_CODE_FILE);
        tokio::fs::write(&code_file, command).await?;
        run_program("sh", &["-c", LINUX_PASTE_SCRIPT]).await?;
        info!("pasted command into Stata window");
        Ok(())
    }
}

#[tower_lsp::async_trait]
impl ExecuteCode for NativeApp {
    async fn execute(&self, language_id: &str, code: &str) -> Result<()> {
        ensure_stata(language_id)?;
        if code.trim().is_empty() {
            return Ok(());
        }
        self.send_code(code).await
    }
}
