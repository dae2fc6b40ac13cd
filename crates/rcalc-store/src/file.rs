use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use rcalc_core::{CalcError, CalcResult, HistoryEntry, HistoryLog};

/// Plain-text history file: one entry per line, oldest first, bounded to
/// `max_lines` lines.
pub struct HistoryFile {
    path: PathBuf,
    max_lines: usize,
}

impl HistoryFile {
    pub fn new(path: &Path, max_lines: usize) -> CalcResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                create_history_dir(parent)?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            max_lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents, `None` when the file does not exist yet.
    fn read_raw(&self) -> CalcResult<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CalcError::History(format!(
                "cannot read {}: {e}",
                self.path.display()
            ))),
        }
    }

    fn write_raw(&self, content: &str) -> CalcResult<()> {
        std::fs::write(&self.path, content).map_err(|e| {
            CalcError::History(format!("cannot write {}: {e}", self.path.display()))
        })
    }
}

impl HistoryLog for HistoryFile {
    fn read_entries(&self) -> CalcResult<Vec<HistoryEntry>> {
        Ok(parse_entries(self.read_raw()?.as_deref()))
    }

    fn append(&self, entry: &HistoryEntry) -> CalcResult<()> {
        let old = self.read_raw()?.unwrap_or_default();
        let mut lines = entry_lines(&old);
        lines.push(entry.as_str());
        debug!(path = %self.path.display(), "appending history entry");
        self.write_raw(&keep_last(&lines, self.max_lines).join("\n"))
    }

    fn remove(&self, storage_index: usize) -> CalcResult<()> {
        let raw = self.read_raw()?.unwrap_or_default();
        let mut lines = entry_lines(&raw);
        if storage_index >= lines.len() {
            return Err(CalcError::History(format!(
                "{} has no line {storage_index}",
                self.path.display()
            )));
        }
        lines.remove(storage_index);
        debug!(path = %self.path.display(), storage_index, "removing history line");
        self.write_raw(&lines.join("\n"))
    }

    fn clear(&self) -> CalcResult<()> {
        self.write_raw("")
    }
}

/// Split raw history file contents into entries. Blank lines are skipped.
fn parse_entries(raw: Option<&str>) -> Vec<HistoryEntry> {
    raw.map(|content| {
        entry_lines(content)
            .into_iter()
            .map(HistoryEntry::new)
            .collect()
    })
    .unwrap_or_default()
}

fn entry_lines(content: &str) -> Vec<&str> {
    content.lines().filter(|l| !l.trim().is_empty()).collect()
}

/// The last `max_lines` entries of `lines`.
fn keep_last<'a, 'b>(lines: &'a [&'b str], max_lines: usize) -> &'a [&'b str] {
    &lines[lines.len().saturating_sub(max_lines)..]
}

fn create_history_dir(dir: &Path) -> CalcResult<()> {
    let mut builder = std::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir).map_err(|e| {
        CalcError::History(format!(
            "cannot create history directory {}: {e}",
            dir.display()
        ))
    })
}
