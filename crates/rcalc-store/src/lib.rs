pub mod file;
pub mod store;

pub use file::HistoryFile;
pub use store::HistoryStore;
