use std::path::PathBuf;

pub const DEFAULT_QALC_BINARY: &str = "qalc";
pub const DEFAULT_HINT_RESULT: &str = "Result: ";
pub const DEFAULT_HINT_WELCOME: &str = "Calculator";
pub const DEFAULT_ERROR_COLOR: &str = "PaleVioletRed";
pub const DEFAULT_HISTORY_MAX_LINES: usize = 100;
pub const DEFAULT_EVAL_TIMEOUT_SECS: u64 = 10;

/// Resolved runtime settings. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub no_bold: bool,
    pub no_unicode: bool,
    pub terse: bool,
    /// Hide history entirely: nothing is loaded, shown or saved.
    pub no_history: bool,
    /// Keep history for this session only.
    pub no_persist_history: bool,
    /// Save the last result to history when the session ends.
    pub auto_save: bool,
    /// Also save to history when a result is taken via custom input.
    pub history_on_custom_input: bool,
    pub qalc_binary: String,
    /// Post-command template with `{expression}` and `{result}` placeholders.
    pub command: Option<String>,
    pub hint_result: String,
    pub hint_welcome: String,
    pub error_color: String,
    pub history_path: PathBuf,
    pub history_max_lines: usize,
    pub eval_timeout_secs: u64,
}

impl Settings {
    pub fn history_enabled(&self) -> bool {
        !self.no_history
    }

    pub fn persist_history(&self) -> bool {
        !self.no_history && !self.no_persist_history
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            no_bold: false,
            no_unicode: false,
            terse: false,
            no_history: false,
            no_persist_history: false,
            auto_save: false,
            history_on_custom_input: false,
            qalc_binary: DEFAULT_QALC_BINARY.into(),
            command: None,
            hint_result: DEFAULT_HINT_RESULT.into(),
            hint_welcome: DEFAULT_HINT_WELCOME.into(),
            error_color: DEFAULT_ERROR_COLOR.into(),
            history_path: PathBuf::from("rcalc_history"),
            history_max_lines: DEFAULT_HISTORY_MAX_LINES,
            eval_timeout_secs: DEFAULT_EVAL_TIMEOUT_SECS,
        }
    }
}
