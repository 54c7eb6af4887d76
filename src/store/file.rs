use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Store, StoreError};
use crate::core::SavingsPlan;
use crate::history::HistoryEntry;

const PLANS_FILE_NAME: &str = "plans.json";
const HISTORY_FILE_NAME: &str = "history.json";

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(JsonFileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let path = self.dir.join(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let items = serde_json::from_reader(BufReader::new(file))?;
        Ok(items)
    }

    fn write<T: Serialize>(&self, name: &str, items: &[T]) -> Result<(), StoreError> {
        let path = self.dir.join(name);
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, items)?;
        writer.flush()?;
        tracing::debug!(path = %path.display(), count = items.len(), "store written");
        Ok(())
    }
}

impl Store for JsonFileStore {
    fn load_plans(&self) -> Result<Vec<SavingsPlan>, StoreError> {
        self.read(PLANS_FILE_NAME)
    }

    fn save_plans(&self, plans: &[SavingsPlan]) -> Result<(), StoreError> {
        self.write(PLANS_FILE_NAME, plans)
    }

    fn load_history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        self.read(HISTORY_FILE_NAME)
    }

    fn save_history(&self, entries: &[HistoryEntry]) -> Result<(), StoreError> {
        self.write(HISTORY_FILE_NAME, entries)
    }
}
