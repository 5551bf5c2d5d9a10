use crate::domain::message::ServiceCatalog;
use crate::domain::policy::ReminderPolicy;
use crate::error::{ReminderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Upper bound for any policy day count (about a century).
pub const MAX_POLICY_DAYS: i64 = 36_500;

/// Runtime settings for a reminder run.
///
/// Every field has a default, so a config file only needs the keys it changes:
///
/// ```json
/// { "policy": { "max_reminders": 4 }, "concurrency": 2 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    pub policy: ReminderPolicy,
    /// Maximum number of leads processed at the same time.
    pub concurrency: usize,
    pub store_timeout_secs: u64,
    pub gateway_timeout_secs: u64,
    /// Link included in reminder emails, if any.
    pub payment_url: Option<String>,
    /// Extra or replacement SKU display names.
    pub service_names: BTreeMap<String, String>,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            policy: ReminderPolicy::default(),
            concurrency: 8,
            store_timeout_secs: 10,
            gateway_timeout_secs: 10,
            payment_url: None,
            service_names: BTreeMap::new(),
        }
    }
}

impl ReminderConfig {
    /// Loads a JSON config file and validates it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let config: Self = serde_json::from_slice(&bytes)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.policy.max_reminders == 0 {
            return Err(ReminderError::Config(
                "policy.max_reminders must be at least 1".to_string(),
            ));
        }
        if self.policy.reminder_interval_days <= 0 {
            return Err(ReminderError::Config(
                "policy.reminder_interval_days must be positive".to_string(),
            ));
        }
        if self.policy.first_reminder_delay_days < 0 {
            return Err(ReminderError::Config(
                "policy.first_reminder_delay_days must not be negative".to_string(),
            ));
        }
        if self.policy.reminder_interval_days > MAX_POLICY_DAYS
            || self.policy.first_reminder_delay_days > MAX_POLICY_DAYS
        {
            return Err(ReminderError::Config(format!(
                "policy day counts must not exceed {MAX_POLICY_DAYS}"
            )));
        }
        if self.concurrency == 0 {
            return Err(ReminderError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.store_timeout_secs == 0 || self.gateway_timeout_secs == 0 {
            return Err(ReminderError::Config(
                "timeouts must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn gateway_timeout(&self) -> Duration {
        Duration::from_secs(self.gateway_timeout_secs)
    }

    /// Default catalog with this config's overrides applied.
    pub fn service_catalog(&self) -> ServiceCatalog {
        let mut catalog = ServiceCatalog::default();
        catalog.extend(self.service_names.clone());
        catalog
    }
}
