use crate::domain::lead::{Lead, LeadRecord};
use crate::error::{ReminderError, Result};
use std::io::Read;

/// Reads leads from a CSV source.
///
/// Wraps `csv::Reader` and yields `Result<Lead>` lazily. Cells are trimmed,
/// short rows are accepted, and empty cells count as absent values, so the
/// defaulting rules of `LeadRecord` apply.
pub struct LeadReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> LeadReader<R> {
    /// Creates a new `LeadReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and validates leads.
    pub fn leads(self) -> impl Iterator<Item = Result<Lead>> {
        self.reader.into_deserialize::<LeadRecord>().map(|result| {
            result
                .map_err(ReminderError::from)
                .and_then(Lead::try_from)
        })
    }
}
