use std::sync::Mutex;

use super::{Store, StoreError};
use crate::core::SavingsPlan;
use crate::history::HistoryEntry;

#[derive(Debug, Default)]
pub struct MemoryStore {
    plans: Mutex<Vec<SavingsPlan>>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn load_plans(&self) -> Result<Vec<SavingsPlan>, StoreError> {
        Ok(self.plans.lock()?.clone())
    }

    fn save_plans(&self, plans: &[SavingsPlan]) -> Result<(), StoreError> {
        *self.plans.lock()? = plans.to_vec();
        Ok(())
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        Ok(self.history.lock()?.clone())
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        *self.history.lock()? = entries.to_vec();
        Ok(())
    }
}
