use crate::domain::lead::{Lead, LeadRecord};
use crate::error::Result;
use std::io::Write;

/// Writes leads as CSV using the same columns `LeadReader` accepts.
pub struct LeadWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LeadWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Writes every lead, ordered by id, and flushes.
    pub fn write_leads(&mut self, mut leads: Vec<Lead>) -> Result<()> {
        leads.sort_by(|a, b| a.id.cmp(&b.id));
        for lead in &leads {
            self.writer.serialize(LeadRecord::from(lead))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
