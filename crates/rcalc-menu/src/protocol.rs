use serde::{Deserialize, Serialize};

use crate::dispatch::{Directive, MenuAction};

// ---------------------------------------------------------------------------
// Host -> rcalc
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// The text in the input box changed.
    Input { text: String },
    /// The user acted on a row. Either a raw host `code` or a named `action`.
    Action {
        #[serde(default)]
        code: Option<u32>,
        #[serde(default)]
        action: Option<MenuAction>,
        #[serde(default)]
        row: usize,
    },
    /// Ask for the current message and rows.
    State,
}

// ---------------------------------------------------------------------------
// rcalc -> host
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    State {
        message: String,
        rows: Vec<String>,
    },
    Directive {
        directive: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<u32>,
    },
    Error {
        message: String,
    },
}

impl Response {
    pub fn directive(directive: Directive) -> Self {
        let (name, code) = match directive {
            Directive::Reload => ("reload", None),
            Directive::Exit => ("exit", None),
            Directive::Next => ("next", None),
            Directive::Previous => ("previous", None),
            Directive::Switch(code) => ("switch", Some(code)),
        };
        Self::Directive {
            directive: name,
            code,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requests() {
        let req: Request = serde_json::from_str(r#"{"type":"input","text":"2+2"}"#).unwrap();
        assert!(matches!(req, Request::Input { text } if text == "2+2"));

        let req: Request =
            serde_json::from_str(r#"{"type":"action","code":1048576,"row":2}"#).unwrap();
        assert!(matches!(
            req,
            Request::Action { code: Some(0x0010_0000), action: None, row: 2 }
        ));

        let req: Request =
            serde_json::from_str(r#"{"type":"action","action":{"quick_switch":4}}"#).unwrap();
        assert!(matches!(
            req,
            Request::Action { code: None, action: Some(MenuAction::QuickSwitch(4)), row: 0 }
        ));

        let req: Request = serde_json::from_str(r#"{"type":"state"}"#).unwrap();
        assert!(matches!(req, Request::State));
    }

    #[test]
    fn test_serialize_responses() {
        let json = serde_json::to_string(&Response::directive(Directive::Switch(3))).unwrap();
        assert_eq!(json, r#"{"type":"directive","directive":"switch","code":3}"#);

        let json = serde_json::to_string(&Response::directive(Directive::Exit)).unwrap();
        assert_eq!(json, r#"{"type":"directive","directive":"exit"}"#);

        let json = serde_json::to_string(&Response::State {
            message: "Calculator".into(),
            rows: vec!["Add to history".into()],
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"type":"state","message":"Calculator","rows":["Add to history"]}"#
        );
    }
}
