use crate::error::{ReminderError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tag appended to a lead once every reminder has been used up.
pub const PAYMENT_STALE_TAG: &str = "payment_stale";

/// Opaque identifier of a lead, as assigned by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(String);

impl LeadId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LeadId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
}

/// A potential customer as seen by the reminder engine.
///
/// Only `reminder_count`, `next_reminder_at` and `marketing_tags` are ever
/// written by this crate; the rest is display data owned by the checkout flows.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Lead {
    pub id: LeadId,
    pub email: String,
    pub name: Option<String>,
    pub created_date: DateTime<Utc>,
    pub payment_status: PaymentStatus,
    /// Number of reminder emails already sent.
    pub reminder_count: u32,
    /// Due time of the next reminder. `None` before the first one and once exhausted.
    pub next_reminder_at: Option<DateTime<Utc>>,
    pub marketing_tags: BTreeSet<String>,
    pub service_sku: Option<String>,
    pub amount: Option<Decimal>,
    pub deal_value: Option<Decimal>,
}

impl Lead {
    /// Creates a fresh pending lead with no reminder history.
    pub fn new(id: impl Into<LeadId>, email: impl Into<String>, created_date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: None,
            created_date,
            payment_status: PaymentStatus::Pending,
            reminder_count: 0,
            next_reminder_at: None,
            marketing_tags: BTreeSet::new(),
            service_sku: None,
            amount: None,
            deal_value: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    pub fn is_stale(&self) -> bool {
        self.marketing_tags.contains(PAYMENT_STALE_TAG)
    }

    /// The figure quoted in reminder emails.
    pub fn quoted_amount(&self) -> Option<Decimal> {
        self.amount.or(self.deal_value)
    }

    /// Applies a partial update. Tag insertion is idempotent.
    pub fn apply(&mut self, patch: &LeadPatch) {
        if let Some(count) = patch.reminder_count {
            self.reminder_count = count;
        }
        if let Some(next) = patch.next_reminder_at {
            self.next_reminder_at = next;
        }
        self.marketing_tags.extend(patch.add_tags.iter().cloned());
    }
}

impl From<String> for LeadId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Loosely-typed record shape as it arrives from an external store or file.
///
/// Defaulting rules are applied once, in `TryFrom<LeadRecord> for Lead`.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct LeadRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_status: Option<PaymentStatus>,
    #[serde(default)]
    pub reminder_count: Option<u32>,
    #[serde(default)]
    pub next_reminder_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub marketing_tags: Option<String>,
    #[serde(default)]
    pub service_sku: Option<String>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub deal_value: Option<Decimal>,
}

impl TryFrom<LeadRecord> for Lead {
    type Error = ReminderError;

    fn try_from(record: LeadRecord) -> Result<Self> {
        let id = record.id.trim();
        if id.is_empty() {
            return Err(ReminderError::InvalidRecord("missing id".to_string()));
        }
        let email = record
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ReminderError::InvalidRecord(format!("lead {id} has no email")))?;
        let created_date = record
            .created_date
            .ok_or_else(|| ReminderError::InvalidRecord(format!("lead {id} has no created_date")))?;

        Ok(Self {
            id: LeadId::new(id),
            email,
            name: record.name.filter(|n| !n.trim().is_empty()),
            created_date,
            payment_status: record.payment_status.unwrap_or_default(),
            reminder_count: record.reminder_count.unwrap_or(0),
            next_reminder_at: record.next_reminder_at,
            marketing_tags: record
                .marketing_tags
                .as_deref()
                .map(parse_tags)
                .unwrap_or_default(),
            service_sku: record.service_sku.filter(|s| !s.trim().is_empty()),
            amount: record.amount,
            deal_value: record.deal_value,
        })
    }
}

impl From<&Lead> for LeadRecord {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id.to_string(),
            email: Some(lead.email.clone()),
            name: lead.name.clone(),
            created_date: Some(lead.created_date),
            payment_status: Some(lead.payment_status),
            reminder_count: Some(lead.reminder_count),
            next_reminder_at: lead.next_reminder_at,
            marketing_tags: Some(join_tags(&lead.marketing_tags)),
            service_sku: lead.service_sku.clone(),
            amount: lead.amount,
            deal_value: lead.deal_value,
        }
    }
}

/// Parses a `;`-separated tag list, dropping blanks and duplicates.
pub fn parse_tags(raw: &str) -> BTreeSet<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

pub fn join_tags(tags: &BTreeSet<String>) -> String {
    tags.iter().map(String::as_str).collect::<Vec<_>>().join(";")
}

/// Partial update of the reminder-related fields of a lead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadPatch {
    pub reminder_count: Option<u32>,
    /// `Some(None)` clears the due time.
    pub next_reminder_at: Option<Option<DateTime<Utc>>>,
    pub add_tags: BTreeSet<String>,
    /// Optimistic concurrency guard: the update is rejected with
    /// `ReminderError::Conflict` unless the stored count equals this value.
    pub expected_reminder_count: Option<u32>,
}

impl LeadPatch {
    /// State written after a reminder email went out.
    pub fn reminded(previous: u32, count: u32, next_reminder_at: DateTime<Utc>) -> Self {
        Self {
            reminder_count: Some(count),
            next_reminder_at: Some(Some(next_reminder_at)),
            add_tags: BTreeSet::new(),
            expected_reminder_count: Some(previous),
        }
    }

    /// Terminal state written once reminders are exhausted.
    pub fn stale(previous: u32, count: u32) -> Self {
        Self {
            reminder_count: Some(count),
            next_reminder_at: Some(None),
            add_tags: BTreeSet::from([PAYMENT_STALE_TAG.to_string()]),
            expected_reminder_count: Some(previous),
        }
    }

    /// Checks the concurrency guard against the currently stored lead.
    pub fn check_guard(&self, current: &Lead) -> Result<()> {
        match self.expected_reminder_count {
            Some(expected) if expected != current.reminder_count => Err(ReminderError::Conflict {
                id: current.id.clone(),
                expected,
                found: current.reminder_count,
            }),
            _ => Ok(()),
        }
    }
}

/// Selection criteria understood by every `LeadStore`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadFilter {
    pub payment_status: Option<PaymentStatus>,
}

impl LeadFilter {
    pub fn pending() -> Self {
        Self {
            payment_status: Some(PaymentStatus::Pending),
        }
    }

    pub fn matches(&self, lead: &Lead) -> bool {
        self.payment_status
            .is_none_or(|status| status == lead.payment_status)
    }
}
