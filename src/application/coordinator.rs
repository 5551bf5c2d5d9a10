use super::report::{LeadError, LeadErrorKind, LeadOutcome, PlannedAction, RunPlan, RunReport};
use crate::config::ReminderConfig;
use crate::domain::credential::Credential;
use crate::domain::lead::{Lead, LeadFilter, LeadId, LeadPatch};
use crate::domain::message::{ReminderMessage, ServiceCatalog};
use crate::domain::policy::ReminderAction;
use crate::domain::ports::{ClockRef, LeadStoreRef, NotificationGatewayRef};
use crate::error::{ReminderError, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Runs one batch pass of the payment-reminder escalation.
///
/// A run authorizes the caller, reads the clock once, fetches every pending
/// lead, evaluates the policy against that single timestamp and then works
/// through the eligible leads with bounded concurrency. Failures on one lead
/// are recorded in the report and never abort the others; only the initial
/// query is fatal.
pub struct ReminderCoordinator {
    processor: LeadProcessor,
    clock: ClockRef,
}

impl ReminderCoordinator {
    /// Creates a new `ReminderCoordinator`.
    ///
    /// # Arguments
    ///
    /// * `store` - Where leads are read from and written back to.
    /// * `gateway` - Delivers reminder emails.
    /// * `clock` - Source of the run timestamp.
    /// * `config` - Policy limits, concurrency, timeouts and message settings.
    ///
    /// Fails with `ReminderError::Config` when `config` does not validate.
    pub fn new(
        store: LeadStoreRef,
        gateway: NotificationGatewayRef,
        clock: ClockRef,
        config: ReminderConfig,
    ) -> Result<Self> {
        config.validate()?;
        let catalog = config.service_catalog();
        Ok(Self {
            processor: LeadProcessor {
                store,
                gateway,
                catalog: Arc::new(catalog),
                config: Arc::new(config),
            },
            clock,
        })
    }

    /// Executes a full reminder run on behalf of `credential`.
    pub async fn run(&self, credential: &Credential) -> Result<RunReport> {
        credential.authorize()?;
        let now = self.clock.now();
        info!(%now, "starting reminder run");

        let (total_pending, candidates) = self.candidates(now).await?;
        let mut report = RunReport::new(total_pending, candidates.len());

        let semaphore = Arc::new(Semaphore::new(self.processor.config.concurrency));
        let mut tasks = JoinSet::new();
        let mut in_flight = HashMap::new();

        for (lead, step) in candidates {
            let processor = self.processor.clone();
            let semaphore = Arc::clone(&semaphore);
            let lead_id = lead.id.clone();
            let handle = tasks.spawn(async move {
                // The semaphore is never closed, so acquiring only waits.
                let _permit = semaphore.acquire_owned().await;
                processor.process(lead, step, now).await
            });
            in_flight.insert(handle.id(), lead_id);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((task_id, outcome)) => {
                    in_flight.remove(&task_id);
                    report.record(outcome);
                }
                Err(join_error) => {
                    let Some(lead_id) = in_flight.remove(&join_error.id()) else {
                        error!(error = %join_error, "untracked lead task failed");
                        continue;
                    };
                    let reason = join_error.to_string();
                    error!(lead_id = %lead_id, error = %reason, "lead task failed");
                    report.record(LeadOutcome::Failed(LeadError {
                        lead_id,
                        kind: LeadErrorKind::TaskFailed,
                        error: reason,
                    }));
                }
            }
        }

        info!(
            processed = report.processed,
            reminded = report.reminded,
            marked_stale = report.marked_stale,
            errors = report.errors.len(),
            total_pending = report.total_pending_leads,
            eligible = report.leads_eligible,
            "reminder run finished"
        );
        Ok(report)
    }

    /// Evaluates what `run` would do right now, without sending or writing anything.
    pub async fn plan(&self, credential: &Credential) -> Result<RunPlan> {
        credential.authorize()?;
        let now = self.clock.now();
        let (total_pending_leads, candidates) = self.candidates(now).await?;

        Ok(RunPlan {
            evaluated_at: now,
            total_pending_leads,
            actions: candidates
                .into_iter()
                .map(|(lead, step)| PlannedAction {
                    lead_id: lead.id,
                    action: step.into(),
                })
                .collect(),
        })
    }

    /// Fetches pending leads and keeps those with something to do at `now`.
    ///
    /// Returns the number of distinct pending leads alongside the eligible ones.
    async fn candidates(&self, now: DateTime<Utc>) -> Result<(usize, Vec<(Lead, Step)>)> {
        let config = &self.processor.config;
        let leads = bounded(
            "pending lead query",
            config.store_timeout(),
            self.processor.store.filter(&LeadFilter::pending()),
        )
        .await
        .map_err(|e| {
            error!(error = %e, "failed to fetch pending leads");
            ReminderError::StoreQuery(Box::new(e))
        })?;

        let mut seen = HashSet::new();
        let pending: Vec<Lead> = leads
            .into_iter()
            .filter(|lead| lead.is_pending() && seen.insert(lead.id.clone()))
            .collect();
        let total_pending = pending.len();

        let eligible: Vec<_> = pending
            .into_iter()
            .filter_map(|lead| {
                Step::from_action(config.policy.evaluate(&lead, now)).map(|step| (lead, step))
            })
            .collect();

        debug!(total_pending, eligible = eligible.len(), "evaluated pending leads");
        Ok((total_pending, eligible))
    }
}

/// An action that changes a lead. `Skip` has no counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Remind(u32),
    MarkStale(u32),
}

impl Step {
    fn from_action(action: ReminderAction) -> Option<Self> {
        match action {
            ReminderAction::Skip => None,
            ReminderAction::Remind(new_count) => Some(Step::Remind(new_count)),
            ReminderAction::MarkStale(new_count) => Some(Step::MarkStale(new_count)),
        }
    }
}

impl From<Step> for ReminderAction {
    fn from(step: Step) -> Self {
        match step {
            Step::Remind(new_count) => ReminderAction::Remind(new_count),
            Step::MarkStale(new_count) => ReminderAction::MarkStale(new_count),
        }
    }
}

/// Everything a spawned per-lead task needs, cheap to clone.
#[derive(Clone)]
struct LeadProcessor {
    store: LeadStoreRef,
    gateway: NotificationGatewayRef,
    catalog: Arc<ServiceCatalog>,
    config: Arc<ReminderConfig>,
}

impl LeadProcessor {
    async fn process(self, lead: Lead, step: Step, now: DateTime<Utc>) -> LeadOutcome {
        match step {
            Step::Remind(new_count) => self.remind(lead, new_count, now).await,
            Step::MarkStale(new_count) => self.mark_stale(lead, new_count).await,
        }
    }

    async fn remind(&self, lead: Lead, new_count: u32, now: DateTime<Utc>) -> LeadOutcome {
        if let Err(e) = self.confirm_unchanged(&lead, now).await {
            return self.failed(&lead.id, LeadErrorKind::StoreUpdate, e);
        }

        // Built before sending so nothing can fail between delivery and the write.
        let patch = LeadPatch::reminded(
            lead.reminder_count,
            new_count,
            self.config.policy.next_due(now),
        );
        let message = ReminderMessage::compose(
            &lead,
            &self.catalog,
            new_count,
            self.config.policy.emails_per_lead(),
            self.config.payment_url.as_deref(),
        );
        if let Err(e) = bounded(
            "email send",
            self.config.gateway_timeout(),
            self.gateway.send(&message),
        )
        .await
        {
            // State is left untouched so the next run retries this lead.
            return self.failed(&lead.id, LeadErrorKind::GatewaySend, e);
        }

        match self.write(&lead.id, patch).await {
            Ok(_) => {
                info!(lead_id = %lead.id, reminder_count = new_count, "payment reminder sent");
                LeadOutcome::Reminded
            }
            Err(e) => self.failed(&lead.id, LeadErrorKind::StoreUpdate, e),
        }
    }

    async fn mark_stale(&self, lead: Lead, new_count: u32) -> LeadOutcome {
        let patch = LeadPatch::stale(lead.reminder_count, new_count);
        match self.write(&lead.id, patch).await {
            Ok(_) => {
                info!(lead_id = %lead.id, reminder_count = new_count, "lead marked payment_stale");
                LeadOutcome::MarkedStale
            }
            Err(e) => self.failed(&lead.id, LeadErrorKind::StoreUpdate, e),
        }
    }

    /// Re-reads the lead right before sending and refuses to go on if another
    /// writer moved its reminder state since the run's fetch.
    async fn confirm_unchanged(&self, snapshot: &Lead, now: DateTime<Utc>) -> Result<()> {
        let current = bounded(
            "lead lookup",
            self.config.store_timeout(),
            self.store.get(&snapshot.id),
        )
        .await?
        .ok_or_else(|| ReminderError::NotFound(snapshot.id.clone()))?;

        let policy = &self.config.policy;
        if current.reminder_count != snapshot.reminder_count
            || policy.evaluate(&current, now) != policy.evaluate(snapshot, now)
        {
            return Err(ReminderError::Conflict {
                id: snapshot.id.clone(),
                expected: snapshot.reminder_count,
                found: current.reminder_count,
            });
        }
        Ok(())
    }

    async fn write(&self, id: &LeadId, patch: LeadPatch) -> Result<Lead> {
        bounded(
            "lead update",
            self.config.store_timeout(),
            self.store.update(id, patch),
        )
        .await
    }

    fn failed(&self, id: &LeadId, fallback: LeadErrorKind, err: ReminderError) -> LeadOutcome {
        warn!(lead_id = %id, error = %err, "lead processing failed");
        LeadOutcome::Failed(LeadError::from_error(id.clone(), fallback, &err))
    }
}

/// Awaits `fut`, turning an elapsed deadline into `ReminderError::Timeout`.
async fn bounded<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, fut).await {
        Ok(result) => result,
        Err(_) => Err(ReminderError::Timeout { operation, after }),
    }
}
