#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use leadremind::application::coordinator::ReminderCoordinator;
use leadremind::config::ReminderConfig;
use leadremind::domain::credential::{Credential, Role};
use leadremind::domain::lead::{Lead, LeadFilter, LeadId, LeadPatch};
use leadremind::domain::message::ReminderMessage;
use leadremind::domain::ports::{LeadStore, NotificationGateway};
use leadremind::error::{ReminderError, Result};
use leadremind::infrastructure::clock::FixedClock;
use leadremind::infrastructure::in_memory::InMemoryLeadStore;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

pub fn admin() -> Credential {
    Credential::new("ops@agency.dev", Role::Admin)
}

/// A fresh pending lead created `age` before `now()`.
pub fn lead(id: &str, age: Duration) -> Lead {
    Lead::new(id, format!("{id}@example.com"), now() - age)
}

/// A lead that already received `count` reminders, next one due at `due`.
pub fn reminded_lead(id: &str, count: u32, due: DateTime<Utc>) -> Lead {
    let mut lead = lead(id, Duration::days(30));
    lead.reminder_count = count;
    lead.next_reminder_at = Some(due);
    lead
}

pub fn coordinator_at(
    store: Arc<dyn LeadStore>,
    gateway: Arc<RecordingGateway>,
    at: DateTime<Utc>,
    config: ReminderConfig,
) -> ReminderCoordinator {
    ReminderCoordinator::new(store, gateway, Arc::new(FixedClock::new(at)), config).unwrap()
}

pub fn coordinator(store: &InMemoryLeadStore, gateway: Arc<RecordingGateway>) -> ReminderCoordinator {
    coordinator_at(
        Arc::new(store.clone()),
        gateway,
        now(),
        ReminderConfig::default(),
    )
}

pub async fn stored(store: &InMemoryLeadStore, id: &str) -> Lead {
    store.get(&LeadId::new(id)).await.unwrap().unwrap()
}

/// Gateway double that records deliveries, fails for chosen recipients and
/// tracks how many sends overlap.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<ReminderMessage>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<std::time::Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_delay(delay: std::time::Duration) -> Arc<Self> {
        Arc::new(Self {
            delay: Some(delay),
            ..Default::default()
        })
    }

    pub fn fail_for(&self, email: &str) {
        self.failing.lock().unwrap().insert(email.to_string());
    }

    pub fn recover(&self) {
        self.failing.lock().unwrap().clear();
    }

    pub fn sent(&self) -> Vec<ReminderMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, email: &str) -> usize {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.to == email)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send(&self, message: &ReminderMessage) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().unwrap().contains(&message.to) {
            return Err(ReminderError::Gateway(format!(
                "mailbox {} unavailable",
                message.to
            )));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Store wrapper that injects failures around an in-memory store.
#[derive(Clone, Default)]
pub struct FaultyStore {
    pub inner: InMemoryLeadStore,
    pub fail_query: bool,
    pub duplicate_results: bool,
    pub missing_on_update: HashSet<String>,
    pub broken_on_update: HashSet<String>,
}

#[async_trait]
impl LeadStore for FaultyStore {
    async fn filter(&self, criteria: &LeadFilter) -> Result<Vec<Lead>> {
        if self.fail_query {
            return Err(ReminderError::Store("connection refused".to_string()));
        }
        let mut leads = self.inner.filter(criteria).await?;
        if self.duplicate_results {
            leads.extend(leads.clone());
        }
        Ok(leads)
    }

    async fn get(&self, id: &LeadId) -> Result<Option<Lead>> {
        self.inner.get(id).await
    }

    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead> {
        if self.missing_on_update.contains(id.as_str()) {
            return Err(ReminderError::NotFound(id.clone()));
        }
        if self.broken_on_update.contains(id.as_str()) {
            return Err(ReminderError::Store("write rejected".to_string()));
        }
        self.inner.update(id, patch).await
    }

    async fn upsert(&self, lead: Lead) -> Result<()> {
        self.inner.upsert(lead).await
    }
}
