use crate::entry::HistoryEntry;
use crate::error::CalcResult;

/// Durable mirror of the history log, one entry per line, oldest first.
pub trait HistoryLog {
    fn read_entries(&self) -> CalcResult<Vec<HistoryEntry>>;
    /// Append an entry, dropping the oldest lines beyond the size bound.
    fn append(&self, entry: &HistoryEntry) -> CalcResult<()>;
    /// Remove the entry stored at `storage_index` (0 = oldest).
    fn remove(&self, storage_index: usize) -> CalcResult<()>;
    fn clear(&self) -> CalcResult<()>;
}
