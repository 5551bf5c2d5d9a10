//! Payment-reminder escalation for agency leads.
//!
//! A scheduled run fetches pending leads, sends spaced reminder emails and
//! finally tags leads that never paid as `payment_stale`.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod interfaces;
