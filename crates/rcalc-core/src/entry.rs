use std::fmt;

/// One accepted result, stored as a single line.
///
/// Embedded line breaks are folded into `;` so an entry never spans more
/// than one line of the history file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryEntry(String);

impl HistoryEntry {
    pub fn new(text: &str) -> Self {
        Self(text.trim().replace("\r\n", ";").replace(['\n', '\r'], ";"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for HistoryEntry {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HistoryEntry {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}
