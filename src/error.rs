use crate::domain::lead::LeadId;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Authorization error: {0}")]
    Authorization(String),
    #[error("Failed to fetch pending leads: {0}")]
    StoreQuery(#[source] Box<ReminderError>),
    #[error("Lead not found: {0}")]
    NotFound(LeadId),
    #[error("Lead {id} changed concurrently: expected reminder_count {expected}, found {found}")]
    Conflict {
        id: LeadId,
        expected: u32,
        found: u32,
    },
    #[error("Store error: {0}")]
    Store(String),
    #[error("Gateway send error: {0}")]
    Gateway(String),
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
    #[error("Invalid lead record: {0}")]
    InvalidRecord(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, ReminderError>;
