//! Application layer containing the reminder run orchestration.
//!
//! `ReminderCoordinator` is the entry point invoked by the scheduler. It pulls
//! pending leads from the store, applies the escalation policy, performs the
//! side effects for each eligible lead in its own task and folds the outcomes
//! into a `RunReport`.

pub mod coordinator;
pub mod report;
