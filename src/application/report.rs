use crate::domain::lead::LeadId;
use crate::domain::policy::ReminderAction;
use crate::error::ReminderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadErrorKind {
    GatewaySend,
    StoreUpdate,
    NotFound,
    Conflict,
    Timeout,
    /// The lead's task panicked or was aborted before reporting back.
    TaskFailed,
}

/// A failure confined to one lead. The run carries on without it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadError {
    pub lead_id: LeadId,
    pub kind: LeadErrorKind,
    pub error: String,
}

impl LeadError {
    /// Classifies `err`; `fallback` is used for errors without a dedicated kind.
    pub fn from_error(lead_id: LeadId, fallback: LeadErrorKind, err: &ReminderError) -> Self {
        let kind = match err {
            ReminderError::NotFound(_) => LeadErrorKind::NotFound,
            ReminderError::Conflict { .. } => LeadErrorKind::Conflict,
            ReminderError::Timeout { .. } => LeadErrorKind::Timeout,
            ReminderError::Gateway(_) => LeadErrorKind::GatewaySend,
            _ => fallback,
        };
        Self {
            lead_id,
            kind,
            error: err.to_string(),
        }
    }
}

/// How processing one eligible lead ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeadOutcome {
    Reminded,
    MarkedStale,
    Failed(LeadError),
}

/// Aggregate result of one reminder run.
///
/// `processed` counts every eligible lead the run attempted, failures
/// included, so `processed == reminded + marked_stale + errors.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub processed: usize,
    pub reminded: usize,
    pub marked_stale: usize,
    pub errors: Vec<LeadError>,
    pub total_pending_leads: usize,
    pub leads_eligible: usize,
}

impl RunReport {
    pub fn new(total_pending_leads: usize, leads_eligible: usize) -> Self {
        Self {
            total_pending_leads,
            leads_eligible,
            ..Default::default()
        }
    }

    pub fn record(&mut self, outcome: LeadOutcome) {
        self.processed += 1;
        match outcome {
            LeadOutcome::Reminded => self.reminded += 1,
            LeadOutcome::MarkedStale => self.marked_stale += 1,
            LeadOutcome::Failed(error) => self.errors.push(error),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedAction {
    pub lead_id: LeadId,
    pub action: ReminderAction,
}

/// What a run would do at `evaluated_at`, computed without side effects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub evaluated_at: DateTime<Utc>,
    pub total_pending_leads: usize,
    pub actions: Vec<PlannedAction>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_accounting_includes_failures() {
        let mut report = RunReport::new(5, 3);
        report.record(LeadOutcome::Reminded);
        report.record(LeadOutcome::MarkedStale);
        report.record(LeadOutcome::Failed(LeadError {
            lead_id: LeadId::new("lead-3"),
            kind: LeadErrorKind::GatewaySend,
            error: "smtp down".to_string(),
        }));

        assert_eq!(report.processed, 3);
        assert_eq!(
            report.processed,
            report.reminded + report.marked_stale + report.errors.len()
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn test_error_classification() {
        let id = LeadId::new("lead-1");
        let timeout = ReminderError::Timeout {
            operation: "email send",
            after: Duration::from_secs(1),
        };
        assert_eq!(
            LeadError::from_error(id.clone(), LeadErrorKind::GatewaySend, &timeout).kind,
            LeadErrorKind::Timeout
        );

        let missing = ReminderError::NotFound(id.clone());
        assert_eq!(
            LeadError::from_error(id.clone(), LeadErrorKind::StoreUpdate, &missing).kind,
            LeadErrorKind::NotFound
        );

        let store = ReminderError::Store("disk full".to_string());
        let error = LeadError::from_error(id, LeadErrorKind::StoreUpdate, &store);
        assert_eq!(error.kind, LeadErrorKind::StoreUpdate);
        assert_eq!(error.error, "Store error: disk full");
    }

    #[test]
    fn test_report_serializes_contract_fields() {
        let report = RunReport::new(2, 1);
        let json = serde_json::to_value(&report).unwrap();
        for field in [
            "processed",
            "reminded",
            "marked_stale",
            "errors",
            "total_pending_leads",
            "leads_eligible",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
    }
}
