//! Configuration loading from TOML files, layered under command-line flags.
//!
//! Lookup order for the file:
//! 1. `--config <path>`
//! 2. `$RCALC_CONFIG` environment variable
//! 3. `~/.config/rcalc/config.toml`
//! 4. Built-in defaults (everything is optional)
//!
//! Flags given on the command line win over the file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Deserialize;

use rcalc_core::settings::{
    DEFAULT_ERROR_COLOR, DEFAULT_EVAL_TIMEOUT_SECS, DEFAULT_HINT_RESULT, DEFAULT_HINT_WELCOME,
    DEFAULT_HISTORY_MAX_LINES, DEFAULT_QALC_BINARY,
};
use rcalc_core::Settings;

/// Top-level configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub display: DisplayConfig,
    pub history: HistoryConfig,
    pub evaluator: EvaluatorConfig,
    pub command: CommandConfig,
}

/// How results are shown.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub no_bold: bool,
    pub no_unicode: bool,
    /// Ask the evaluator for the bare result only.
    pub terse: bool,
    pub hint_result: String,
    pub hint_welcome: String,
    pub error_color: String,
}

/// History behaviour.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// Write changes to the history file.
    pub persist: bool,
    /// Save the last result when the menu closes.
    pub auto_save: bool,
    /// Save results taken through custom input.
    pub save_on_custom_input: bool,
    pub max_lines: usize,
    /// History file path. Default: platform-specific data dir.
    pub path: Option<String>,
}

/// External evaluator.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    pub binary: String,
    /// 0 disables the timeout.
    pub timeout_secs: u64,
}

/// Post-command run on the chosen entry.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    /// Shell template with `{expression}` and `{result}` placeholders.
    pub template: Option<String>,
}

// --- Defaults ---

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            no_bold: false,
            no_unicode: false,
            terse: false,
            hint_result: DEFAULT_HINT_RESULT.into(),
            hint_welcome: DEFAULT_HINT_WELCOME.into(),
            error_color: DEFAULT_ERROR_COLOR.into(),
        }
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            auto_save: false,
            save_on_custom_input: false,
            max_lines: DEFAULT_HISTORY_MAX_LINES,
            path: None,
        }
    }
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_QALC_BINARY.into(),
            timeout_secs: DEFAULT_EVAL_TIMEOUT_SECS,
        }
    }
}

/// Command-line overrides, shared by every subcommand.
#[derive(Debug, Default, Args)]
pub struct SettingsArgs {
    /// Config file to read instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Do not bold the result
    #[arg(long, global = true)]
    pub no_bold: bool,

    /// Do not ask the evaluator for unicode output
    #[arg(long, global = true)]
    pub no_unicode: bool,

    /// Evaluator prints only the result, without the expression
    #[arg(long, global = true)]
    pub terse: bool,

    /// Disable history entirely
    #[arg(long, global = true)]
    pub no_history: bool,

    /// Keep history changes for this session only
    #[arg(long, global = true)]
    pub no_persist_history: bool,

    /// Save the last result to history when the menu closes
    #[arg(long, global = true)]
    pub auto_save: bool,

    /// Save results taken through custom input to history
    #[arg(long, global = true)]
    pub history_on_custom_input: bool,

    /// Evaluator binary
    #[arg(long, global = true, value_name = "PATH")]
    pub qalc_binary: Option<String>,

    /// Post-command template, e.g. "notify-send {expression} {result}"
    #[arg(long, global = true, value_name = "TEMPLATE")]
    pub command: Option<String>,

    /// Text shown before a result
    #[arg(long, global = true)]
    pub hint_result: Option<String>,

    /// Text shown when there is no result yet
    #[arg(long, global = true)]
    pub hint_welcome: Option<String>,

    /// Colour for warnings and errors
    #[arg(long, global = true)]
    pub error_color: Option<String>,

    /// History file
    #[arg(long, global = true, value_name = "PATH")]
    pub history_file: Option<PathBuf>,

    /// Maximum number of history entries kept on disk
    #[arg(long, global = true)]
    pub history_max_lines: Option<usize>,

    /// Seconds before an evaluation is abandoned (0 = never)
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = config_path(explicit);

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            return parse_config(&content).with_context(|| format!("parsing {}", p.display()));
        }
        if explicit.is_some() {
            anyhow::bail!("config file {} not found", p.display());
        }
    }

    Ok(Config::default())
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Resolve the config file path.
fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    if let Ok(p) = std::env::var("RCALC_CONFIG") {
        return Some(PathBuf::from(p));
    }

    dirs_home().map(|home| home.join(".config").join("rcalc").join("config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `rcalc config`).
pub fn show_config_path(explicit: Option<&Path>) -> String {
    match config_path(explicit) {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}

pub fn default_history_path() -> PathBuf {
    directories::ProjectDirs::from("", "", "rcalc")
        .map(|dirs| dirs.data_dir().join("history"))
        .unwrap_or_else(|| PathBuf::from("rcalc_history"))
}

/// Layer command-line flags over the file config.
pub fn resolve(config: Config, args: &SettingsArgs) -> Settings {
    let Config {
        display,
        history,
        evaluator,
        command,
    } = config;

    let history_path = args
        .history_file
        .clone()
        .or_else(|| history.path.map(PathBuf::from))
        .unwrap_or_else(default_history_path);

    Settings {
        no_bold: args.no_bold || display.no_bold,
        no_unicode: args.no_unicode || display.no_unicode,
        terse: args.terse || display.terse,
        no_history: args.no_history || !history.enabled,
        no_persist_history: args.no_persist_history || !history.persist,
        auto_save: args.auto_save || history.auto_save,
        history_on_custom_input: args.history_on_custom_input || history.save_on_custom_input,
        qalc_binary: args.qalc_binary.clone().unwrap_or(evaluator.binary),
        command: args.command.clone().or(command.template),
        hint_result: args.hint_result.clone().unwrap_or(display.hint_result),
        hint_welcome: args.hint_welcome.clone().unwrap_or(display.hint_welcome),
        error_color: args.error_color.clone().unwrap_or(display.error_color),
        history_path,
        history_max_lines: args.history_max_lines.unwrap_or(history.max_lines),
        eval_timeout_secs: args.timeout.unwrap_or(evaluator.timeout_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        settings: SettingsArgs,
    }

    fn resolve_cli(argv: &[&str]) -> Settings {
        let cli = TestCli::parse_from(argv);
        resolve(load_config(cli.settings.config.as_deref()).unwrap(), &cli.settings)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.history.enabled);
        assert_eq!(config.history.max_lines, 100);
        assert_eq!(config.evaluator.binary, "qalc");
        assert!(config.command.template.is_none());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml_str = r#"
[display]
terse = true
"#;
        let config = parse_config(toml_str).unwrap();
        assert!(config.display.terse);
        // Other fields should be defaults
        assert_eq!(config.display.hint_result, "Result: ");
        assert!(config.history.persist);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r##"
[display]
no_bold = true
no_unicode = true
terse = false
hint_result = "= "
hint_welcome = "qalc"
error_color = "#ff0000"

[history]
enabled = true
persist = false
auto_save = true
save_on_custom_input = true
max_lines = 20
path = "/tmp/rcalc-history"

[evaluator]
binary = "/usr/local/bin/qalc"
timeout_secs = 3

[command]
template = "wl-copy '{result}'"
"##;
        let config = parse_config(toml_str).unwrap();
        let settings = resolve(config, &SettingsArgs::default());
        assert!(settings.no_bold);
        assert!(settings.no_unicode);
        assert!(settings.no_persist_history);
        assert!(settings.auto_save);
        assert!(settings.history_on_custom_input);
        assert_eq!(settings.history_max_lines, 20);
        assert_eq!(settings.history_path, PathBuf::from("/tmp/rcalc-history"));
        assert_eq!(settings.qalc_binary, "/usr/local/bin/qalc");
        assert_eq!(settings.eval_timeout_secs, 3);
        assert_eq!(settings.command.as_deref(), Some("wl-copy '{result}'"));
        assert_eq!(settings.error_color, "#ff0000");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        assert!(parse_config("[history]\nmax_lines = \"lots\"\n").is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = resolve(Config::default(), &SettingsArgs::default());
        let expected = Settings {
            history_path: default_history_path(),
            ..Settings::default()
        };
        assert_eq!(settings, expected);
    }

    #[test]
    fn test_flags_override_file() {
        let config = parse_config(
            "[display]\nhint_result = \"file: \"\n[history]\nmax_lines = 5\n",
        )
        .unwrap();
        let args = SettingsArgs {
            hint_result: Some("flag: ".into()),
            no_history: true,
            history_file: Some(PathBuf::from("/tmp/h")),
            ..SettingsArgs::default()
        };
        let settings = resolve(config, &args);
        assert_eq!(settings.hint_result, "flag: ");
        assert_eq!(settings.history_max_lines, 5);
        assert!(settings.no_history);
        assert_eq!(settings.history_path, PathBuf::from("/tmp/h"));
    }

    #[test]
    fn test_parsed_flags_layer_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[display]\nhint_result = \"file: \"\nhint_welcome = \"file welcome\"\n\
             [history]\nmax_lines = 7\nauto_save = true\n\
             [command]\ntemplate = \"echo {result}\"\n",
        )
        .unwrap();

        let settings = resolve_cli(&[
            "rcalc",
            "--config",
            path.to_str().unwrap(),
            "--terse",
            "--hint-result",
            "flag: ",
            "--history-max-lines",
            "3",
            "--timeout",
            "0",
        ]);
        assert!(settings.terse);
        assert!(settings.auto_save);
        assert_eq!(settings.hint_result, "flag: ");
        assert_eq!(settings.hint_welcome, "file welcome");
        assert_eq!(settings.history_max_lines, 3);
        assert_eq!(settings.eval_timeout_secs, 0);
        assert_eq!(settings.command.as_deref(), Some("echo {result}"));
        assert_eq!(settings.qalc_binary, "qalc");
    }

    #[test]
    fn test_parsed_switches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        let history = dir.path().join("hist");

        let settings = resolve_cli(&[
            "rcalc",
            "--config",
            path.to_str().unwrap(),
            "--no-history",
            "--no-bold",
            "--qalc-binary",
            "/opt/qalc",
            "--history-file",
            history.to_str().unwrap(),
        ]);
        assert!(!settings.history_enabled());
        assert!(settings.no_bold);
        assert_eq!(settings.qalc_binary, "/opt/qalc");
        assert_eq!(settings.history_path, history);
        assert_eq!(settings.error_color, "PaleVioletRed");
    }

    #[test]
    fn test_malformed_config_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[display\nterse = true\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
