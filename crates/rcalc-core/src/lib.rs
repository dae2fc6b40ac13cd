pub mod classify;
pub mod entry;
pub mod equation;
pub mod error;
pub mod history;
pub mod settings;

pub use classify::is_error;
pub use entry::HistoryEntry;
pub use equation::{split_equation, APPROX_SIGN};
pub use error::{CalcError, CalcResult};
pub use history::HistoryLog;
pub use settings::Settings;
