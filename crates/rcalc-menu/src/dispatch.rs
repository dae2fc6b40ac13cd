//! Menu action dispatch.
//!
//! One call per user turn: the action and selected row decide the history
//! mutation, the post-command (if any) and what the host does next. All
//! state lives in the session and the history store.

use serde::Deserialize;
use tracing::debug;

use rcalc_core::{CalcError, CalcResult};
use rcalc_store::HistoryStore;

use crate::post_command::PostCommand;
use crate::session::EvaluationSession;

// Host action word: flag bits plus a 16-bit payload.
pub const MENU_OK: u32 = 0x0001_0000;
pub const MENU_CANCEL: u32 = 0x0002_0000;
pub const MENU_NEXT: u32 = 0x0004_0000;
pub const MENU_CUSTOM_INPUT: u32 = 0x0008_0000;
pub const MENU_ENTRY_DELETE: u32 = 0x0010_0000;
pub const MENU_QUICK_SWITCH: u32 = 0x0020_0000;
pub const MENU_PREVIOUS: u32 = 0x0040_0000;
pub const MENU_CUSTOM_COMMAND: u32 = 0x0080_0000;
pub const MENU_LOWER_MASK: u32 = 0x0000_FFFF;

/// Label of row 0 when history is enabled.
pub const ADD_ROW_LABEL: &str = "Add to history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    Accept,
    CustomInput,
    Delete,
    Cancel,
    Next,
    Previous,
    QuickSwitch(u32),
    CustomCommand(u32),
}

impl MenuAction {
    /// Decode the host's action word. `None` for words with no known flag.
    pub fn from_code(code: u32) -> Option<Self> {
        let payload = code & MENU_LOWER_MASK;
        if code & MENU_NEXT != 0 {
            Some(Self::Next)
        } else if code & MENU_PREVIOUS != 0 {
            Some(Self::Previous)
        } else if code & MENU_QUICK_SWITCH != 0 {
            Some(Self::QuickSwitch(payload))
        } else if code & MENU_CUSTOM_COMMAND != 0 {
            Some(Self::CustomCommand(payload))
        } else if code & MENU_CUSTOM_INPUT != 0 {
            Some(Self::CustomInput)
        } else if code & MENU_OK != 0 {
            Some(Self::Accept)
        } else if code & MENU_ENTRY_DELETE != 0 {
            Some(Self::Delete)
        } else if code & MENU_CANCEL != 0 {
            Some(Self::Cancel)
        } else {
            None
        }
    }
}

/// What the host should do after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Redraw with fresh rows and message.
    Reload,
    /// Close the menu.
    Exit,
    Next,
    Previous,
    /// Switch to the mode identified by the raw code.
    Switch(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub directive: Directive,
    pub post: Option<PostCommand>,
}

impl Outcome {
    fn reload() -> Self {
        Self {
            directive: Directive::Reload,
            post: None,
        }
    }

    fn navigate(directive: Directive) -> Self {
        Self {
            directive,
            post: None,
        }
    }

    fn exit_with(post: Option<PostCommand>) -> Self {
        Self {
            directive: Directive::Exit,
            post,
        }
    }
}

/// Handle one user turn.
pub fn dispatch(
    action: MenuAction,
    row: usize,
    session: &EvaluationSession,
    history: &mut HistoryStore,
) -> CalcResult<Outcome> {
    let settings = session.settings();
    debug!(?action, row, "dispatching menu action");

    let outcome = match action {
        MenuAction::Accept if row == 0 && settings.history_enabled() => {
            save_result(session, history)?;
            Outcome::reload()
        }
        MenuAction::Accept => {
            let entry = if settings.history_enabled() {
                history
                    .get(row)
                    .ok_or(CalcError::InvalidRow(row))?
                    .as_str()
            } else {
                session.last_result()
            };
            Outcome::exit_with(Some(PostCommand::for_entry(entry, settings)))
        }
        MenuAction::CustomInput => {
            if !session.has_usable_result() {
                return Ok(Outcome::reload());
            }
            if settings.history_enabled() && settings.history_on_custom_input {
                history.append(session.last_result())?;
            }
            Outcome::exit_with(Some(PostCommand::for_entry(
                session.last_result(),
                settings,
            )))
        }
        MenuAction::Delete => {
            if row > 0 && settings.history_enabled() {
                history.remove(row)?;
            }
            Outcome::reload()
        }
        MenuAction::Cancel => Outcome::exit_with(None),
        MenuAction::Next => Outcome::navigate(Directive::Next),
        MenuAction::Previous => Outcome::navigate(Directive::Previous),
        MenuAction::QuickSwitch(code) | MenuAction::CustomCommand(code) => {
            Outcome::navigate(Directive::Switch(code))
        }
    };
    Ok(outcome)
}

/// Append the current result to history if it is usable.
/// Returns whether anything was saved.
pub fn save_result(session: &EvaluationSession, history: &mut HistoryStore) -> CalcResult<bool> {
    if !session.settings().history_enabled() || !session.has_usable_result() {
        return Ok(false);
    }
    history.append(session.last_result())
}

/// Session teardown: auto-save the last result when configured.
pub fn finish(session: &EvaluationSession, history: &mut HistoryStore) -> CalcResult<()> {
    if session.settings().auto_save && save_result(session, history)? {
        debug!("auto-saved last result");
    }
    Ok(())
}

/// Rows shown by the host, top to bottom.
pub fn menu_rows(session: &EvaluationSession, history: &HistoryStore) -> Vec<String> {
    if session.settings().history_enabled() {
        std::iter::once(ADD_ROW_LABEL.to_string())
            .chain(history.newest_first().map(|e| e.to_string()))
            .collect()
    } else if session.last_result().is_empty() {
        Vec::new()
    } else {
        vec![session.last_result().to_string()]
    }
}
