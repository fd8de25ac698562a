//! Entity persistence behind an async trait, with an in-memory
//! implementation backing tests and the demo service.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use al_types::{AlResult, StoreError};

use crate::records::Record;

/// The three persisted entity families, each its own keyspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Project,
    Cycle,
    Variant,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => write!(f, "project"),
            Self::Cycle => write!(f, "cycle"),
            Self::Variant => write!(f, "variant"),
        }
    }
}

/// Record persistence. Implementations are shared across tasks and must be
/// safe for concurrent use.
#[async_trait]
pub trait PersistenceService: Send + Sync + fmt::Debug {
    /// The most recently created record of a kind, if any.
    async fn get_latest(&self, kind: EntityKind) -> AlResult<Option<Record>>;

    /// All records of a kind, ordered by storage time.
    async fn list(&self, kind: EntityKind) -> AlResult<Vec<Record>>;

    async fn get(&self, kind: EntityKind, key: &str) -> AlResult<Option<Record>>;

    async fn put(&self, kind: EntityKind, key: &str, record: Record) -> AlResult<()>;

    /// Merge fields into an existing record. Missing key is an error, not an
    /// upsert.
    async fn update_fields(&self, kind: EntityKind, key: &str, fields: Record) -> AlResult<()>;

    /// All records of a kind whose `project_id` field matches, ordered by
    /// storage time.
    async fn query_by_partition(&self, kind: EntityKind, project_id: &str)
        -> AlResult<Vec<Record>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RecordKey {
    kind: EntityKind,
    key: String,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    record: Record,
    stored_at: DateTime<Utc>,
    sequence: u64,
}

impl StoredRecord {
    /// Creation instant for latest-record ordering: the entity's own
    /// `created_at` field when present, storage time otherwise.
    fn created_at(&self) -> DateTime<Utc> {
        self.record
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<DateTime<Utc>>().ok())
            .unwrap_or(self.stored_at)
    }
}

/// Concurrent in-memory record store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<RecordKey, RwLock<StoredRecord>>,
    counter: RwLock<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn next_sequence(&self) -> u64 {
        let mut counter = self.counter.write();
        *counter += 1;
        *counter
    }
}

#[async_trait]
impl PersistenceService for MemoryStore {
    async fn get_latest(&self, kind: EntityKind) -> AlResult<Option<Record>> {
        let mut latest: Option<(DateTime<Utc>, u64, Record)> = None;
        for entry in self.records.iter() {
            if entry.key().kind != kind {
                continue;
            }
            let stored = entry.value().read();
            let created = stored.created_at();
            // Ties on created_at fall back to insertion order
            let newer = match &latest {
                Some((best_created, best_seq, _)) => {
                    (created, stored.sequence) > (*best_created, *best_seq)
                }
                None => true,
            };
            if newer {
                latest = Some((created, stored.sequence, stored.record.clone()));
            }
        }
        Ok(latest.map(|(_, _, record)| record))
    }

    async fn list(&self, kind: EntityKind) -> AlResult<Vec<Record>> {
        let mut matches: Vec<(u64, Record)> = Vec::new();
        for entry in self.records.iter() {
            if entry.key().kind != kind {
                continue;
            }
            let stored = entry.value().read();
            matches.push((stored.sequence, stored.record.clone()));
        }
        matches.sort_by_key(|(sequence, _)| *sequence);
        Ok(matches.into_iter().map(|(_, record)| record).collect())
    }

    async fn get(&self, kind: EntityKind, key: &str) -> AlResult<Option<Record>> {
        let record_key = RecordKey {
            kind,
            key: key.to_string(),
        };
        Ok(self
            .records
            .get(&record_key)
            .map(|entry| entry.value().read().record.clone()))
    }

    async fn put(&self, kind: EntityKind, key: &str, record: Record) -> AlResult<()> {
        let record_key = RecordKey {
            kind,
            key: key.to_string(),
        };
        let stored = StoredRecord {
            record,
            stored_at: Utc::now(),
            sequence: self.next_sequence(),
        };
        debug!(%kind, key, "record stored");
        self.records.insert(record_key, RwLock::new(stored));
        Ok(())
    }

    async fn update_fields(&self, kind: EntityKind, key: &str, fields: Record) -> AlResult<()> {
        let record_key = RecordKey {
            kind,
            key: key.to_string(),
        };
        let entry = self
            .records
            .get(&record_key)
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.to_string(),
                key: key.to_string(),
            })?;
        let mut stored = entry.value().write();
        for (name, value) in fields {
            stored.record.insert(name, value);
        }
        debug!(%kind, key, "record fields updated");
        Ok(())
    }

    async fn query_by_partition(
        &self,
        kind: EntityKind,
        project_id: &str,
    ) -> AlResult<Vec<Record>> {
        let mut matches: Vec<(u64, Record)> = Vec::new();
        for entry in self.records.iter() {
            if entry.key().kind != kind {
                continue;
            }
            let stored = entry.value().read();
            let belongs = stored
                .record
                .get("project_id")
                .and_then(|v| v.as_str())
                .is_some_and(|id| id == project_id);
            if belongs {
                matches.push((stored.sequence, stored.record.clone()));
            }
        }
        matches.sort_by_key(|(sequence, _)| *sequence);
        Ok(matches.into_iter().map(|(_, record)| record).collect())
    }
}
