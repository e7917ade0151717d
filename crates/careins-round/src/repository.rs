//! # Round Repository
//!
//! The storage seam of the round service. Implementations must provide
//! optimistic locking: `save` succeeds only if the stored version still
//! equals the version the caller loaded, and bumps it by one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use careins_core::{CaregivingRoundId, ReceptionId};

use crate::error::RepositoryError;
use crate::round::CaregivingRoundRecord;

pub trait CaregivingRoundRepository: Send + Sync {
    fn find_by_id(
        &self,
        id: CaregivingRoundId,
    ) -> Result<Option<CaregivingRoundRecord>, RepositoryError>;

    /// Every round of a reception, ordered by round number.
    fn find_by_reception_id(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, RepositoryError>;

    /// Every stored round, ordered by reception then round number.
    fn list(&self) -> Result<Vec<CaregivingRoundRecord>, RepositoryError>;

    /// Store a new round at version 1. Returns the stored version.
    fn insert(&self, record: CaregivingRoundRecord) -> Result<u64, RepositoryError>;

    /// Overwrite a round last loaded at `expected_version`. Returns the new
    /// version.
    fn save(
        &self,
        record: CaregivingRoundRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError>;
}

/// Orders records by reception, then round number.
pub fn sort_records(records: &mut [CaregivingRoundRecord]) {
    records.sort_by(|a, b| {
        a.reception_id
            .as_uuid()
            .cmp(b.reception_id.as_uuid())
            .then(a.caregiving_round_number.cmp(&b.caregiving_round_number))
    });
}

/// Thread-safe, cloneable in-memory repository.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoundRepository {
    data: Arc<RwLock<HashMap<CaregivingRoundId, CaregivingRoundRecord>>>,
}

impl InMemoryRoundRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CaregivingRoundRepository for InMemoryRoundRepository {
    fn find_by_id(
        &self,
        id: CaregivingRoundId,
    ) -> Result<Option<CaregivingRoundRecord>, RepositoryError> {
        Ok(self.data.read().get(&id).cloned())
    }

    fn find_by_reception_id(
        &self,
        reception_id: ReceptionId,
    ) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        let mut records: Vec<_> = self
            .data
            .read()
            .values()
            .filter(|record| record.reception_id == reception_id)
            .cloned()
            .collect();
        sort_records(&mut records);
        Ok(records)
    }

    fn list(&self) -> Result<Vec<CaregivingRoundRecord>, RepositoryError> {
        let mut records: Vec<_> = self.data.read().values().cloned().collect();
        sort_records(&mut records);
        Ok(records)
    }

    fn insert(&self, mut record: CaregivingRoundRecord) -> Result<u64, RepositoryError> {
        let mut guard = self.data.write();
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::AlreadyExists(record.id));
        }
        record.version = 1;
        guard.insert(record.id, record);
        Ok(1)
    }

    fn save(
        &self,
        mut record: CaregivingRoundRecord,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let mut guard = self.data.write();
        let stored = guard
            .get_mut(&record.id)
            .ok_or(RepositoryError::NotFound(record.id))?;
        if stored.version != expected_version {
            return Err(RepositoryError::VersionConflict {
                round_id: record.id,
                expected: expected_version,
                actual: stored.version,
            });
        }
        record.version = expected_version + 1;
        let version = record.version;
        *stored = record;
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careins_state::CaregivingStateData;

    fn record(reception_id: ReceptionId, number: u32) -> CaregivingRoundRecord {
        CaregivingRoundRecord {
            id: CaregivingRoundId::new(),
            caregiving_round_number: number,
            reception_id,
            caregiving_state_data: CaregivingStateData::initial(),
            billing_progressing_status: Default::default(),
            settlement_progressing_status: Default::default(),
            remarks: String::new(),
            version: 0,
        }
    }

    #[test]
    fn insert_then_find() {
        let repo = InMemoryRoundRepository::new();
        let r = record(ReceptionId::new(), 1);
        assert_eq!(repo.insert(r.clone()).unwrap(), 1);
        let found = repo.find_by_id(r.id).unwrap().unwrap();
        assert_eq!(found.version, 1);
        assert!(repo.find_by_id(CaregivingRoundId::new()).unwrap().is_none());
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let repo = InMemoryRoundRepository::new();
        let r = record(ReceptionId::new(), 1);
        repo.insert(r.clone()).unwrap();
        assert!(matches!(repo.insert(r), Err(RepositoryError::AlreadyExists(_))));
    }

    #[test]
    fn save_bumps_version_and_detects_conflicts() {
        let repo = InMemoryRoundRepository::new();
        let r = record(ReceptionId::new(), 1);
        repo.insert(r.clone()).unwrap();

        assert_eq!(repo.save(r.clone(), 1).unwrap(), 2);
        let err = repo.save(r.clone(), 1).unwrap_err();
        assert!(err.is_version_conflict());
        assert!(matches!(
            err,
            RepositoryError::VersionConflict { expected: 1, actual: 2, .. }
        ));
    }

    #[test]
    fn save_unknown_round_is_not_found() {
        let repo = InMemoryRoundRepository::new();
        let err = repo.save(record(ReceptionId::new(), 1), 1).unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[test]
    fn reception_rounds_are_ordered_by_number() {
        let repo = InMemoryRoundRepository::new();
        let reception = ReceptionId::new();
        for number in [3, 1, 2] {
            repo.insert(record(reception, number)).unwrap();
        }
        repo.insert(record(ReceptionId::new(), 1)).unwrap();

        let numbers: Vec<_> = repo
            .find_by_reception_id(reception)
            .unwrap()
            .iter()
            .map(|r| r.caregiving_round_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(repo.list().unwrap().len(), 4);
    }
}
