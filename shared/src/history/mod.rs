mod error;
mod version_history;

pub use error::HistoryError;
pub use version_history::VersionHistory;
