use super::lead::Lead;
use chrono::{DateTime, Duration, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

/// What the engine should do with a single lead in the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "new_count", rename_all = "snake_case")]
pub enum ReminderAction {
    /// Not due yet, or reminders already exhausted.
    Skip,
    /// Send a reminder and record the new count.
    Remind(u32),
    /// Reminders exhausted: tag the lead as stale without sending anything.
    MarkStale(u32),
}

/// Escalation policy for payment reminders.
///
/// Passed into the coordinator at construction so callers can vary the limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderPolicy {
    /// Once `reminder_count` reaches this value the lead is terminal.
    pub max_reminders: u32,
    /// Gap between consecutive reminders, in days.
    pub reminder_interval_days: i64,
    /// Minimum lead age before the first reminder, in days.
    pub first_reminder_delay_days: i64,
}

impl Default for ReminderPolicy {
    fn default() -> Self {
        Self {
            max_reminders: 3,
            reminder_interval_days: 3,
            first_reminder_delay_days: 1,
        }
    }
}

impl ReminderPolicy {
    /// Out-of-range day counts saturate instead of panicking.
    pub fn reminder_interval(&self) -> Duration {
        days(self.reminder_interval_days)
    }

    pub fn first_reminder_delay(&self) -> Duration {
        days(self.first_reminder_delay_days)
    }

    /// Whether the lead's next reminder is due at `now`.
    pub fn is_due(&self, lead: &Lead, now: DateTime<Utc>) -> bool {
        match lead.next_reminder_at {
            None => now - lead.created_date >= self.first_reminder_delay(),
            Some(due) => now >= due,
        }
    }

    /// Decides the action for `lead` at `now`. Pure; never touches the lead.
    ///
    /// The step that would reach `max_reminders` marks the lead stale instead of
    /// sending, so at most `max_reminders - 1` emails go out per lead.
    pub fn evaluate(&self, lead: &Lead, now: DateTime<Utc>) -> ReminderAction {
        if !lead.is_pending() || lead.reminder_count >= self.max_reminders {
            return ReminderAction::Skip;
        }
        if !self.is_due(lead, now) {
            return ReminderAction::Skip;
        }

        let new_count = lead.reminder_count + 1;
        if new_count >= self.max_reminders {
            ReminderAction::MarkStale(new_count)
        } else {
            ReminderAction::Remind(new_count)
        }
    }

    /// Due time written after a reminder sent at `now`.
    pub fn next_due(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.reminder_interval())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Number of emails a lead receives before it is marked stale.
    pub fn emails_per_lead(&self) -> u32 {
        self.max_reminders.saturating_sub(1)
    }
}

fn days(count: i64) -> Duration {
    TimeDelta::try_days(count).unwrap_or(TimeDelta::MAX)
}
