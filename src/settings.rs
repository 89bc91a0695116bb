//! Settings infrastructure for stata-cells.
//!
//! Settings come from a `stata-cells.toml` file discovered from the workspace
//! root, overlaid by whatever the client sends in `initializationOptions` and
//! `workspace/didChangeConfiguration`.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Settings file name looked up by [`discover_settings`].
pub const SETTINGS_FILE: &str = "stata-cells.toml";

/// Where cell code is executed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CellBackend {
    /// Notebook-style interactive window in the client.
    #[default]
    Interactive,
    /// The Stata desktop application.
    Native,
}

/// Root settings structure.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Master switch for cells, lenses, highlighting and context flags.
    #[serde(alias = "useInteractive")]
    pub use_interactive: bool,

    /// Backend that receives cell code.
    #[serde(alias = "cellBackend")]
    pub cell_backend: CellBackend,

    /// Application name for AppleScript dispatch.
    #[serde(alias = "whichApp")]
    pub which_app: String,

    /// Bring the application to the front before sending.
    #[serde(alias = "focusWindow")]
    pub focus_window: bool,

    /// Stata installation directory.
    #[serde(alias = "stataPath")]
    pub stata_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_interactive: true,
            cell_backend: CellBackend::default(),
            which_app: "StataMP".to_string(),
            focus_window: false,
            stata_path: None,
        }
    }
}

/// Partial settings sent by the client; absent keys keep their value.
#[derive(Debug, Default, Deserialize)]
struct SettingsPatch {
    #[serde(alias = "useInteractive")]
    use_interactive: Option<bool>,
    #[serde(alias = "cellBackend")]
    cell_backend: Option<CellBackend>,
    #[serde(alias = "whichApp")]
    which_app: Option<String>,
    #[serde(alias = "focusWindow")]
    focus_window: Option<bool>,
    #[serde(alias = "stataPath")]
    stata_path: Option<PathBuf>,
}

impl Settings {
    /// Overlay client-provided JSON settings.
    ///
    /// Accepts either the settings object itself or one nested under a
    /// `"stata"` key. Malformed input leaves the settings unchanged.
    pub fn merged_with(&self, value: &Value) -> Settings {
        let value = value.get("stata").unwrap_or(value);
        if value.is_null() {
            return self.clone();
        }

        let patch: SettingsPatch = match serde_json::from_value(value.clone()) {
            Ok(patch) => patch,
            Err(e) => {
                warn!("ignoring malformed client settings: {}", e);
                return self.clone();
            }
        };

        Settings {
            use_interactive: patch.use_interactive.unwrap_or(self.use_interactive),
            cell_backend: patch.cell_backend.unwrap_or(self.cell_backend),
            which_app: patch.which_app.unwrap_or_else(|| self.which_app.clone()),
            focus_window: patch.focus_window.unwrap_or(self.focus_window),
            stata_path: patch.stata_path.or_else(|| self.stata_path.clone()),
        }
    }
}

/// Parse settings from TOML text.
pub fn parse_settings(path: &Path, content: &str) -> Result<Settings> {
    toml::from_str(content).map_err(|e| Error::Settings {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load settings from a settings file.
///
/// Returns default settings if the file doesn't exist or can't be parsed.
pub fn load_settings(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(content) => match parse_settings(path, &content) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("{}", e);
                Settings::default()
            }
        },
        Err(_) => Settings::default(),
    }
}

/// Discover the settings file by searching up the directory tree, then direct children.
///
/// Search order:
/// 1. Walk up from `start_dir` to filesystem root
/// 2. If not found, check immediate child directories of `start_dir`
///
/// Returns `(settings, settings_dir)` where `settings_dir` is the directory
/// containing the found file. If not found, returns
/// `(Settings::default(), start_dir)`.
pub fn discover_settings(start_dir: &Path) -> (Settings, PathBuf) {
    // Phase 1: Walk up from start_dir
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return (load_settings(&candidate), dir.to_path_buf());
        }
        current = dir.parent();
    }

    // Phase 2: Check immediate child directories
    if let Ok(entries) = std::fs::read_dir(start_dir) {
        for entry in entries.flatten() {
            if entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false) {
                let candidate = entry.path().join(SETTINGS_FILE);
                if candidate.is_file() {
                    return (load_settings(&candidate), entry.path());
                }
            }
        }
    }

    (Settings::default(), start_dir.to_path_buf())
}

/// Well-known Stata install directories for this platform, newest first.
pub fn stata_path_candidates() -> Vec<PathBuf> {
    if cfg!(target_os = "windows") {
        let program_files =
            std::env::var("ProgramFiles").unwrap_or_else(|_| "C:\\Program Files".to_string());
        let program_files_x86 = std::env::var("ProgramFiles(x86)")
            .unwrap_or_else(|_| "C:\\Program Files (x86)".to_string());
        [program_files, program_files_x86]
            .iter()
            .flat_map(|root| {
                ["Stata19", "Stata18", "Stata17"]
                    .iter()
                    .map(move |name| Path::new(root).join(name))
            })
            .collect()
    } else if cfg!(target_os = "macos") {
        [
            "/Applications/Stata19",
            "/Applications/Stata18",
            "/Applications/Stata17",
            "/Applications/StataNow",
            "/Applications/Stata",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    } else {
        [
            "/usr/local/stata19",
            "/usr/local/stata18",
            "/usr/local/stata17",
            "/usr/local/stata",
        ]
        .iter()
        .map(PathBuf::from)
        .collect()
    }
}

/// First existing Stata install directory among `candidates`.
pub fn detect_stata_path(candidates: &[PathBuf]) -> Option<PathBuf> {
    let found = candidates.iter().find(|path| path.is_dir()).cloned();
    debug!(?found, "stata install probe");
    found
}
