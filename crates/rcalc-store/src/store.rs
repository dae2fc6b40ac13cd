use tracing::{debug, info};

use rcalc_core::{CalcError, CalcResult, HistoryEntry, HistoryLog, Settings};

use crate::file::HistoryFile;

/// In-memory history log, oldest first, optionally mirrored to a
/// [`HistoryLog`].
///
/// Display rows count from the newest entry: row 1 is the most recent
/// result and row `len()` the oldest. Row 0 belongs to the host's
/// "add to history" action and never maps to an entry.
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    log: Option<Box<dyn HistoryLog>>,
    max_entries: usize,
}

impl HistoryStore {
    /// Open the history described by `settings`.
    ///
    /// With history disabled nothing is read. With persistence disabled the
    /// file is read but never written.
    pub fn open(settings: &Settings) -> CalcResult<Self> {
        if !settings.history_enabled() {
            return Ok(Self::session_only(settings.history_max_lines));
        }
        let file = HistoryFile::new(&settings.history_path, settings.history_max_lines)?;
        let entries = file.read_entries()?;
        info!(
            path = %file.path().display(),
            entries = entries.len(),
            persist = settings.persist_history(),
            "history loaded"
        );
        let log: Option<Box<dyn HistoryLog>> = if settings.persist_history() {
            Some(Box::new(file))
        } else {
            None
        };
        Ok(Self::from_entries(entries, log, settings.history_max_lines))
    }

    /// History that lives only as long as this value.
    pub fn session_only(max_entries: usize) -> Self {
        Self::from_entries(Vec::new(), None, max_entries)
    }

    pub fn from_entries(
        entries: Vec<HistoryEntry>,
        log: Option<Box<dyn HistoryLog>>,
        max_entries: usize,
    ) -> Self {
        Self {
            entries,
            log,
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries oldest first, as stored.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entries in display order, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Entry shown at display row `display_index` (1 = newest).
    pub fn get(&self, display_index: usize) -> Option<&HistoryEntry> {
        self.storage_index(display_index)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    fn storage_index(&self, display_index: usize) -> CalcResult<usize> {
        if display_index == 0 || display_index > self.entries.len() {
            return Err(CalcError::InvalidRow(display_index));
        }
        Ok(self.entries.len() - display_index)
    }

    /// Append `text` as a new entry. Returns `false` if it was blank.
    pub fn append(&mut self, text: &str) -> CalcResult<bool> {
        let entry = HistoryEntry::new(text);
        if entry.is_blank() {
            return Ok(false);
        }
        if let Some(log) = &self.log {
            log.append(&entry)?;
        }
        debug!(entry = %entry, "history append");
        self.entries.push(entry);
        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
        }
        Ok(true)
    }

    /// Remove the entry at display row `display_index` (1 = newest).
    pub fn remove(&mut self, display_index: usize) -> CalcResult<HistoryEntry> {
        let idx = self.storage_index(display_index)?;
        if let Some(log) = &self.log {
            log.remove(idx)?;
        }
        let removed = self.entries.remove(idx);
        debug!(entry = %removed, display_index, "history remove");
        Ok(removed)
    }

    pub fn clear(&mut self) -> CalcResult<()> {
        if let Some(log) = &self.log {
            log.clear()?;
        }
        self.entries.clear();
        Ok(())
    }
}
