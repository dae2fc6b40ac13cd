use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info};

use rcalc_core::CalcError;
use rcalc_store::HistoryStore;

use crate::dispatch::{self, Directive, MenuAction};
use crate::post_command::PostCommand;
use crate::protocol::{Request, Response};
use crate::session::{Completion, EvaluationSession};

/// Run the host protocol on stdio. Returns when the host closes stdin or
/// the menu exits.
pub async fn run_server(
    session: EvaluationSession,
    completions: UnboundedReceiver<Completion>,
    history: HistoryStore,
) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(stdin, stdout, session, completions, history).await
}

enum Step {
    Reply(Response),
    Exit(Option<PostCommand>),
}

/// Protocol loop over arbitrary streams.
pub async fn serve<R, W>(
    reader: R,
    mut writer: W,
    mut session: EvaluationSession,
    mut completions: UnboundedReceiver<Completion>,
    mut history: HistoryStore,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("host closed input");
                    drain_in_flight(&mut writer, &mut session, &mut completions, &history).await?;
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let request: Request = match serde_json::from_str(line) {
                    Ok(r) => r,
                    Err(e) => {
                        error!("invalid host request: {e}");
                        write_response(&mut writer, &Response::error(format!("parse error: {e}"))).await?;
                        continue;
                    }
                };

                match handle_request(request, &mut session, &mut history)? {
                    Step::Reply(response) => write_response(&mut writer, &response).await?,
                    Step::Exit(post) => {
                        write_response(&mut writer, &Response::directive(Directive::Exit)).await?;
                        if let Some(post) = post {
                            if let Some(text) = post.run()? {
                                writer.write_all(format!("{text}\n").as_bytes()).await?;
                                writer.flush().await?;
                            }
                        }
                        info!("menu closed");
                        break;
                    }
                }
            }
            Some(completion) = completions.recv() => {
                if session.complete(completion)? {
                    write_response(&mut writer, &state(&session, &history)).await?;
                }
            }
        }
    }

    dispatch::finish(&session, &mut history)?;
    Ok(())
}

fn handle_request(
    request: Request,
    session: &mut EvaluationSession,
    history: &mut HistoryStore,
) -> anyhow::Result<Step> {
    let (action, row) = match request {
        Request::State => return Ok(Step::Reply(state(session, history))),
        Request::Input { text } => {
            session.submit(&text);
            return Ok(Step::Reply(state(session, history)));
        }
        Request::Action { code, action, row } => {
            match action.or_else(|| code.and_then(MenuAction::from_code)) {
                Some(action) => (action, row),
                None => {
                    return Ok(Step::Reply(Response::error(format!(
                        "unknown action (code {code:?})"
                    ))))
                }
            }
        }
    };

    let outcome = match dispatch::dispatch(action, row, session, history) {
        Ok(outcome) => outcome,
        Err(CalcError::InvalidRow(row)) => {
            return Ok(Step::Reply(Response::error(format!("no row {row}"))))
        }
        Err(e) => return Err(e.into()),
    };

    Ok(match outcome.directive {
        Directive::Exit => Step::Exit(outcome.post),
        Directive::Reload => Step::Reply(state(session, history)),
        other => Step::Reply(Response::directive(other)),
    })
}

/// Wait for an evaluation still running when the host went away, so the
/// final state (and auto-save) sees its result.
async fn drain_in_flight<W: AsyncWrite + Unpin>(
    writer: &mut W,
    session: &mut EvaluationSession,
    completions: &mut UnboundedReceiver<Completion>,
    history: &HistoryStore,
) -> anyhow::Result<()> {
    while session.is_evaluating() {
        let Some(completion) = completions.recv().await else {
            break;
        };
        if session.complete(completion)? {
            write_response(writer, &state(session, history)).await?;
        }
    }
    Ok(())
}

fn state(session: &EvaluationSession, history: &HistoryStore) -> Response {
    Response::State {
        message: session.render_message(),
        rows: dispatch::menu_rows(session, history),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> anyhow::Result<()> {
    let mut json = serde_json::to_string(response)?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rcalc_core::{HistoryEntry, Settings};
    use serde_json::Value;

    use crate::session::tests::session_with;

    async fn run(settings: Settings, history: HistoryStore, input: &str) -> (Vec<String>, HistoryStore) {
        let (session, rx, _) = session_with(settings);
        let mut out = Vec::new();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        // persist through a real file so the caller can inspect it
        let file_settings = Settings {
            history_path: path,
            ..Settings::default()
        };
        let mut backed = HistoryStore::open(&file_settings).unwrap();
        for entry in history.entries() {
            backed.append(entry.as_str()).unwrap();
        }
        serve(input.as_bytes(), &mut out, session, rx, backed).await.unwrap();
        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (lines, HistoryStore::open(&file_settings).unwrap())
    }

    fn json(line: &str) -> Value {
        serde_json::from_str(line).unwrap()
    }

    #[tokio::test]
    async fn test_input_then_eof_reports_result() {
        let (lines, history) = run(
            Settings::default(),
            HistoryStore::session_only(100),
            "{\"type\":\"input\",\"text\":\"2 + 2\"}\n",
        )
        .await;

        let last = json(lines.last().unwrap());
        assert_eq!(last["type"], "state");
        assert_eq!(last["message"], "Result: <b>2 + 2 = 4</b>");
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_auto_save_on_teardown() {
        let settings = Settings {
            auto_save: true,
            ..Settings::default()
        };
        let (_, history) = run(
            settings,
            HistoryStore::session_only(100),
            "{\"type\":\"input\",\"text\":\"1 + 3\"}\n",
        )
        .await;
        let saved: Vec<_> = history.entries().iter().map(HistoryEntry::as_str).collect();
        assert_eq!(saved, vec!["1 + 3 = 4"]);
    }

    #[tokio::test]
    async fn test_delete_and_accept_history_row() {
        let mut seed = HistoryStore::session_only(100);
        for e in ["a = 1", "b = 2", "c = 3"] {
            seed.append(e).unwrap();
        }
        let input = concat!(
            "{\"type\":\"state\"}\n",
            "{\"type\":\"action\",\"code\":1048576,\"row\":2}\n",
            "{\"type\":\"action\",\"action\":\"accept\",\"row\":1}\n",
        );
        let (lines, history) = run(Settings::default(), seed, input).await;

        assert_eq!(json(&lines[0])["rows"][1], "c = 3");
        assert_eq!(json(&lines[1])["rows"].as_array().unwrap().len(), 3);
        assert_eq!(json(&lines[2])["directive"], "exit");
        assert_eq!(lines[3], "c = 3");
        assert_eq!(lines.len(), 4);

        let left: Vec<_> = history.entries().iter().map(HistoryEntry::as_str).collect();
        assert_eq!(left, vec!["a = 1", "c = 3"]);
    }

    #[tokio::test]
    async fn test_bad_requests_get_errors() {
        let input = concat!(
            "not json\n",
            "{\"type\":\"action\",\"code\":0}\n",
            "{\"type\":\"action\",\"action\":\"delete\",\"row\":9}\n",
            "{\"type\":\"action\",\"code\":2097153}\n",
        );
        let (lines, _) = run(Settings::default(), HistoryStore::session_only(100), input).await;
        assert_eq!(json(&lines[0])["type"], "error");
        assert_eq!(json(&lines[1])["type"], "error");
        assert_eq!(json(&lines[2])["type"], "error");
        assert_eq!(json(&lines[3])["directive"], "switch");
        assert_eq!(json(&lines[3])["code"], 1);
    }
}
