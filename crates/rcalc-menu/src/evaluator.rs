use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use rcalc_core::{CalcError, CalcResult, Settings};

/// Refresh exchange rates at most once per day.
const EXCHANGE_RATE_DIRECTIVE: &str = "update_exchange_rates 1days";

/// Exit code the evaluator uses for malformed or incomplete input.
const BAD_INPUT_EXIT_CODE: i32 = 1;

/// Something that turns an expression into a textual result.
///
/// `Ok` carries the evaluator's raw output, which may itself describe an
/// input error. `Err` is reserved for failures of the evaluator itself.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(&self, input: &str) -> CalcResult<String>;
}

/// Runs `qalc` (or a compatible binary) once per expression.
#[derive(Debug, Clone)]
pub struct QalcEvaluator {
    binary: String,
    terse: bool,
    unicode: bool,
}

impl QalcEvaluator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            binary: settings.qalc_binary.clone(),
            terse: settings.terse,
            unicode: !settings.no_unicode,
        }
    }

    /// Full argument vector, program first.
    pub fn argv(&self, input: &str) -> Vec<String> {
        let mut argv = vec![
            self.binary.clone(),
            "-s".to_string(),
            EXCHANGE_RATE_DIRECTIVE.to_string(),
        ];
        if self.terse {
            argv.push("-t".to_string());
        }
        if self.unicode {
            argv.push("+u8".to_string());
        }
        argv.push(input.to_string());
        argv
    }
}

#[async_trait]
impl Evaluator for QalcEvaluator {
    async fn evaluate(&self, input: &str) -> CalcResult<String> {
        let argv = self.argv(input);
        debug!(?argv, "spawning evaluator");

        let child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CalcError::Evaluator(format!("cannot spawn '{}': {e}", self.binary)))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| CalcError::Evaluator(format!("reading output of '{}': {e}", self.binary)))?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        interpret_exit(&self.binary, output.status, text)
    }
}

/// Success and "bad input" both yield the captured output. Anything else
/// means the evaluator itself failed.
fn interpret_exit(binary: &str, status: ExitStatus, output: String) -> CalcResult<String> {
    if status.success() || status.code() == Some(BAD_INPUT_EXIT_CODE) {
        return Ok(output);
    }
    Err(CalcError::Evaluator(format!(
        "'{binary}' exited with {status}: {}",
        output.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_argv() {
        let evaluator = QalcEvaluator::new(&Settings::default());
        assert_eq!(
            evaluator.argv("2+2"),
            vec!["qalc", "-s", "update_exchange_rates 1days", "+u8", "2+2"]
        );
    }

    #[test]
    fn test_terse_without_unicode_argv() {
        let settings = Settings {
            terse: true,
            no_unicode: true,
            qalc_binary: "/opt/bin/qalc".into(),
            ..Settings::default()
        };
        assert_eq!(
            QalcEvaluator::new(&settings).argv("1 m to ft"),
            vec!["/opt/bin/qalc", "-s", "update_exchange_rates 1days", "-t", "1 m to ft"]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_codes() {
        use std::os::unix::process::ExitStatusExt;

        // raw wait status: exit code lives in the high byte
        let ok = ExitStatus::from_raw(0);
        let bad_input = ExitStatus::from_raw(1 << 8);
        let crashed = ExitStatus::from_raw(2 << 8);
        let killed = ExitStatus::from_raw(9);

        assert_eq!(interpret_exit("qalc", ok, "4".into()).unwrap(), "4");
        assert_eq!(
            interpret_exit("qalc", bad_input, "error: bad".into()).unwrap(),
            "error: bad"
        );
        assert!(matches!(
            interpret_exit("qalc", crashed, String::new()),
            Err(CalcError::Evaluator(_))
        ));
        assert!(matches!(
            interpret_exit("qalc", killed, String::new()),
            Err(CalcError::Evaluator(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_fatal() {
        let settings = Settings {
            qalc_binary: "/nonexistent/rcalc-test-qalc".into(),
            ..Settings::default()
        };
        let result = QalcEvaluator::new(&settings).evaluate("1+1").await;
        assert!(matches!(result, Err(CalcError::Evaluator(_))));
    }
}
