//! Persistence for plans and history. The calculator never touches storage
//! itself; callers load on startup and save after each change.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use thiserror::Error;

use crate::core::SavingsPlan;
use crate::history::HistoryEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored data is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("store lock poisoned")]
    Poisoned,
}

impl<T> From<std::sync::PoisonError<T>> for StoreError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

pub trait Store: Send + Sync {
    fn load_plans(&self) -> Result<Vec<SavingsPlan>, StoreError>;
    fn save_plans(&self, plans: &[SavingsPlan]) -> Result<(), StoreError>;
    fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError>;
    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StoreError>;
}
