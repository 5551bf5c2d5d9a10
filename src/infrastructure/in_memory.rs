use crate::domain::lead::{Lead, LeadFilter, LeadId, LeadPatch};
use crate::domain::ports::LeadStore;
use crate::error::{ReminderError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory lead store.
///
/// Uses `Arc<RwLock<HashMap<LeadId, Lead>>>` so clones share the same data.
/// The concurrency guard of a `LeadPatch` is checked under the write lock,
/// making each update a compare-and-set.
#[derive(Default, Clone)]
pub struct InMemoryLeadStore {
    leads: Arc<RwLock<HashMap<LeadId, Lead>>>,
}

impl InMemoryLeadStore {
    /// Creates a new, empty in-memory lead store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_leads(leads: impl IntoIterator<Item = Lead>) -> Self {
        let store = Self::new();
        {
            let mut map = store.leads.write().await;
            for lead in leads {
                map.insert(lead.id.clone(), lead);
            }
        }
        store
    }

    /// Snapshot of every lead, sorted by id.
    pub async fn snapshot(&self) -> Vec<Lead> {
        let leads = self.leads.read().await;
        let mut all: Vec<Lead> = leads.values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn filter(&self, criteria: &LeadFilter) -> Result<Vec<Lead>> {
        let leads = self.leads.read().await;
        Ok(leads
            .values()
            .filter(|lead| criteria.matches(lead))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>> {
        let leads = self.leads.read().await;
        Ok(leads.get(id).cloned())
    }

    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead> {
        let mut leads = self.leads.write().await;
        let lead = leads
            .get_mut(id)
            .ok_or_else(|| ReminderError::NotFound(id.clone()))?;
        patch.check_guard(lead)?;
        lead.apply(&patch);
        Ok(lead.clone())
    }

    async fn upsert(&self, lead: Lead) -> Result<()> {
        let mut leads = self.leads.write().await;
        leads.insert(lead.id.clone(), lead);
        Ok(())
    }
}
