use crate::domain::lead::{Lead, LeadFilter, LeadId, LeadPatch};
use crate::domain::ports::LeadStore;
use crate::error::{ReminderError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, IteratorMode, Options};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family holding one JSON document per lead, keyed by lead id.
pub const CF_LEADS: &str = "leads";

/// A persistent lead store backed by RocksDB.
///
/// `Clone` shares the underlying `Arc<DB>`. Updates are serialized through a
/// write lock so the read-check-write of a conditional patch is atomic with
/// respect to other writers in this process.
#[derive(Clone)]
pub struct RocksDbLeadStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDbLeadStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring the
    /// `leads` column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_leads = ColumnFamilyDescriptor::new(CF_LEADS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_leads])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_LEADS)
            .ok_or_else(|| ReminderError::Store("leads column family not found".to_string()))
    }

    fn read(&self, id: &LeadId) -> Result<Option<Lead>> {
        let cf = self.cf()?;
        match self.db.get_pinned_cf(cf, id.as_str().as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write(&self, lead: &Lead) -> Result<()> {
        let cf = self.cf()?;
        let value = serde_json::to_vec(lead)?;
        self.db.put_cf(cf, lead.id.as_str().as_bytes(), value)?;
        Ok(())
    }
}

#[async_trait]
impl LeadStore for RocksDbLeadStore {
    async fn filter(&self, criteria: &LeadFilter) -> Result<Vec<Lead>> {
        let cf = self.cf()?;
        let mut leads = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            let lead: Lead = serde_json::from_slice(&value)?;
            if criteria.matches(&lead) {
                leads.push(lead);
            }
        }
        Ok(leads)
    }

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>> {
        self.read(id)
    }

    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead> {
        let _guard = self.write_lock.lock().await;
        let mut lead = self
            .read(id)?
            .ok_or_else(|| ReminderError::NotFound(id.clone()))?;
        patch.check_guard(&lead)?;
        lead.apply(&patch);
        self.write(&lead)?;
        Ok(lead)
    }

    async fn upsert(&self, lead: Lead) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(&lead)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn lead(id: &str) -> Lead {
        let created = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        Lead::new(id, format!("{id}@example.com"), created)
    }

    #[tokio::test]
    async fn test_rocksdb_open_cf() {
        let dir = tempdir().unwrap();
        let store = RocksDbLeadStore::open(dir.path()).expect("Failed to open RocksDB");
        assert!(store.db.cf_handle(CF_LEADS).is_some());
    }

    #[tokio::test]
    async fn test_rocksdb_lead_roundtrip_and_update() {
        let dir = tempdir().unwrap();
        let store = RocksDbLeadStore::open(dir.path()).unwrap();

        store.upsert(lead("a")).await.unwrap();
        let retrieved = store.get(&LeadId::new("a")).await.unwrap().unwrap();
        assert_eq!(retrieved, lead("a"));
        assert!(store.get(&LeadId::new("b")).await.unwrap().is_none());

        let updated = store
            .update(&LeadId::new("a"), LeadPatch::stale(0, 1))
            .await
            .unwrap();
        assert!(updated.is_stale());
        assert!(matches!(
            store.update(&LeadId::new("a"), LeadPatch::stale(0, 1)).await,
            Err(ReminderError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_rocksdb_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = RocksDbLeadStore::open(dir.path()).unwrap();
            store.upsert(lead("a")).await.unwrap();
            store.upsert(lead("b")).await.unwrap();
        }

        let store = RocksDbLeadStore::open(dir.path()).unwrap();
        let all = store.filter(&LeadFilter::pending()).await.unwrap();
        assert_eq!(all.len(), 2);
    }
}
