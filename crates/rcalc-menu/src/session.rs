//! Evaluation session: the latest result and the single in-flight evaluation.
//!
//! Evaluations run on a tokio task and report back through a channel. Each
//! submission gets a new generation number; completions from older
//! generations are dropped, so a slow evaluator can never overwrite the
//! result of a newer expression.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use rcalc_core::{is_error, CalcResult, Settings};

use crate::evaluator::Evaluator;

/// Result of one evaluation, tagged with the submission it answers.
#[derive(Debug)]
pub struct Completion {
    pub generation: u64,
    pub outcome: CalcResult<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Input unchanged; this is the current result.
    Cached(String),
    /// Evaluation started under this generation.
    Dispatched(u64),
}

pub struct EvaluationSession {
    settings: Settings,
    evaluator: Arc<dyn Evaluator>,
    last_result: String,
    previous_input: Option<String>,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
    completions: UnboundedSender<Completion>,
}

impl EvaluationSession {
    /// Create a session and the receiving end of its completion channel.
    pub fn new(
        settings: Settings,
        evaluator: Arc<dyn Evaluator>,
    ) -> (Self, UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            settings,
            evaluator,
            last_result: String::new(),
            previous_input: None,
            generation: 0,
            in_flight: None,
            completions: tx,
        };
        (session, rx)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn last_result(&self) -> &str {
        &self.last_result
    }

    pub fn previous_input(&self) -> Option<&str> {
        self.previous_input.as_deref()
    }

    /// Whether a submitted evaluation has not reported back yet.
    pub fn is_evaluating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// A result worth saving or handing to the post-command.
    pub fn has_usable_result(&self) -> bool {
        !self.last_result.is_empty() && !is_error(&self.last_result)
    }

    /// Evaluate `input` unless it is the input evaluated last.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, input: &str) -> Submission {
        if self.previous_input.as_deref() == Some(input) {
            debug!(input, "input unchanged, reusing last result");
            return Submission::Cached(self.last_result.clone());
        }
        self.previous_input = Some(input.to_string());

        if let Some(stale) = self.in_flight.take() {
            debug!(generation = self.generation, "aborting superseded evaluation");
            stale.abort();
        }
        self.generation += 1;
        let generation = self.generation;

        let evaluator = Arc::clone(&self.evaluator);
        let tx = self.completions.clone();
        let input = input.to_string();
        let limit = Duration::from_secs(self.settings.eval_timeout_secs);
        self.in_flight = Some(tokio::spawn(async move {
            // a zero limit disables the timeout
            let outcome = if limit.is_zero() {
                evaluator.evaluate(&input).await
            } else {
                match tokio::time::timeout(limit, evaluator.evaluate(&input)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(input = %input, secs = limit.as_secs(), "evaluation timed out");
                        Ok(format!(
                            "error: evaluation timed out after {}s",
                            limit.as_secs()
                        ))
                    }
                }
            };
            // receiver gone means the session is shutting down
            let _ = tx.send(Completion {
                generation,
                outcome,
            });
        }));

        Submission::Dispatched(generation)
    }

    /// Apply a completion. Returns `true` when the host should redraw.
    ///
    /// Completions from superseded submissions are ignored. A fatal
    /// evaluator failure is returned as an error.
    pub fn complete(&mut self, completion: Completion) -> CalcResult<bool> {
        if completion.generation != self.generation {
            debug!(
                stale = completion.generation,
                current = self.generation,
                "ignoring stale completion"
            );
            return Ok(false);
        }
        self.in_flight = None;
        let output = completion.outcome?;
        self.last_result = first_line(&output).to_string();
        debug!(result = %self.last_result, "evaluation finished");
        Ok(true)
    }

    /// Submit `input` and wait until its result is in.
    pub async fn evaluate_once(
        &mut self,
        input: &str,
        completions: &mut UnboundedReceiver<Completion>,
    ) -> CalcResult<&str> {
        if let Submission::Dispatched(_) = self.submit(input) {
            while let Some(completion) = completions.recv().await {
                if self.complete(completion)? {
                    break;
                }
            }
        }
        Ok(&self.last_result)
    }

    /// Status line for the host, as Pango markup.
    pub fn render_message(&self) -> String {
        if is_error(&self.last_result) {
            format!(
                "<span foreground=\"{}\">{}</span>",
                self.settings.error_color,
                escape_markup(&self.last_result)
            )
        } else if !self.last_result.is_empty() {
            let result = escape_markup(&self.last_result);
            if self.settings.no_bold {
                format!("{}{result}", self.settings.hint_result)
            } else {
                format!("{}<b>{result}</b>", self.settings.hint_result)
            }
        } else {
            self.settings.hint_welcome.clone()
        }
    }
}

impl Drop for EvaluationSession {
    fn drop(&mut self) {
        if let Some(task) = self.in_flight.take() {
            task.abort();
        }
    }
}

fn first_line(output: &str) -> &str {
    output.lines().next().unwrap_or("")
}

fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
