use super::lead::{Lead, LeadFilter, LeadId, LeadPatch};
use super::message::ReminderMessage;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Record store holding leads. Owned by the checkout flows; this crate only
/// reads pending leads and patches their reminder state.
#[async_trait]
pub trait LeadStore: Send + Sync {
    async fn filter(&self, criteria: &LeadFilter) -> Result<Vec<Lead>>;
    async fn get(&self, id: &LeadId) -> Result<Option<Lead>>;
    /// Applies `patch` and returns the updated lead.
    ///
    /// Fails with `NotFound` for unknown ids and with `Conflict` when the
    /// patch's concurrency guard does not match the stored lead.
    async fn update(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead>;
    /// Inserts or replaces a lead wholesale (imports and tests).
    async fn upsert(&self, lead: Lead) -> Result<()>;
}

/// Transactional email delivery.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, message: &ReminderMessage) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type LeadStoreRef = Arc<dyn LeadStore>;
pub type NotificationGatewayRef = Arc<dyn NotificationGateway>;
pub type ClockRef = Arc<dyn Clock>;
