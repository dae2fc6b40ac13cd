use std::process::{Command, Stdio};

use tracing::info;

use rcalc_core::{split_equation, CalcError, CalcResult, Settings};

pub const EXPRESSION_PLACEHOLDER: &str = "{expression}";
pub const RESULT_PLACEHOLDER: &str = "{result}";

/// What happens to the entry the user picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostCommand {
    /// No template configured: the entry goes to standard output.
    Print(String),
    /// Template filled in with the entry, run through `sh -c`.
    Shell(String),
}

impl PostCommand {
    pub fn for_entry(entry: &str, settings: &Settings) -> Self {
        match &settings.command {
            Some(template) => Self::Shell(fill_template(template, entry, settings.terse)),
            None => Self::Print(entry.to_string()),
        }
    }

    /// Start a shell command without waiting for it. Returns the text the
    /// caller should write to standard output, if any.
    pub fn run(&self) -> CalcResult<Option<&str>> {
        match self {
            Self::Print(text) => Ok(Some(text)),
            Self::Shell(command) => {
                spawn_detached(command)?;
                Ok(None)
            }
        }
    }
}

/// Substitute the expression and result halves of `entry` into `template`.
/// A missing expression half becomes an empty string.
pub fn fill_template(template: &str, entry: &str, terse: bool) -> String {
    let (expression, result) = split_equation(entry, terse);
    template
        .replace(EXPRESSION_PLACEHOLDER, expression.unwrap_or(""))
        .replace(RESULT_PLACEHOLDER, result)
}

// The command is passed to the shell as one argv element, so it reaches
// `sh` byte for byte and glyphs such as × ÷ − ≈ need no escaping.
fn spawn_detached(command: &str) -> CalcResult<()> {
    info!(command, "running post-command");
    let mut cmd = Command::new("sh");
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }
    cmd.spawn()
        .map(drop)
        .map_err(|e| CalcError::Command(format!("cannot run '{command}': {e}")))
}
