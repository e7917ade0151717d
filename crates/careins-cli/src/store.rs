//! # File-Backed Round Store
//!
//! One pretty-printed JSON record per round, named `<round uuid>.json`,
//! in a single state directory. Writes go through a temporary file and a
//! rename so a crash never leaves a half-written record behind.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use careins_core::{CaregivingRoundId, ReceptionId};
use careins_round::{
    sort_records, CaregivingRoundRecord, CaregivingRoundRepository, RepositoryError,
};

#[derive(Debug)]
pub struct FileRoundRepository {
    dir: PathBuf,
    /// Serializes read-check-write sequences within this process.
    write_lock: Mutex<()>,
}

impl FileRoundRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, id: CaregivingRoundId) -> PathBuf {
        self.dir.join(format!("{}.json", id.as_uuid()))
    }

    fn read(path: &Path) -> Result<CaregivingRoundRecord, RepositoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| storage(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_str(&content)
            .map_err(|e| storage(format!("corrupt round record {}: {e}", path.display())))
    }

    fn write(&self, record: &CaregivingRoundRecord) -> Result<(), RepositoryError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            storage(format!(
                "failed to create state directory {}: {e}",
                self.dir.display()
            ))
        })?;
        let path = self.path_of(record.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| storage(format!("failed to encode round {}: {e}", record.id)))?;
        std::fs::write(&tmp, json)
            .map_err(|e| storage(format!("failed to write {}: {e}", tmp.display())))?;
        std::fs::rename(&tmp, &path)
            .map_err(|e| storage(format!("failed to replace {}: {e}", path.display())))
    }
}

fn storage(message: String) -> RepositoryError {
    RepositoryError::Storage(message)
}

impl CaregivingRoundRepository for FileRoundRepository {
    fn find_by_id(
        &self,
        id: CaregivingRoundId,
    ) -> Result<Option<CaregivingRoundRecord>, RepositoryError> {
        let path = self.path_of(id);
        if !path.is_file() {
            return Ok(None);
        }
        Self::read(&path).map(Some)
    }

    fn find_by_reception_id(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|record| record.reception_id == reception_id)
            .collect())
    }

    fn list(&self) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| storage(format!("failed to list {}: {e}", self.dir.display())))?;

        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                records.push(Self::read(&path)?);
            }
        }
        sort_records(&mut records);
        Ok(records)
    }

    fn insert(&self, mut record: CaregivingRoundRecord) -> Result<u64, RepositoryError> {
        let _guard = self.write_lock.lock();
        if self.path_of(record.id).exists() {
            return Err(RepositoryError::AlreadyExists(record.id));
        }
        record.version = 1;
        self.write(&record)?;
        Ok(1)
    }

    fn save(
        &self,
        mut record: CaregivingRoundRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let _guard = self.write_lock.lock();
        let stored = self
            .find_by_id(record.id)?
            .ok_or(RepositoryError::NotFound(record.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                round_id: record.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        record.version = expected_version + 1;
        self.write(&record)?;
        Ok(record.version)
    }
}
