//! CSV import and export of lead records.

pub mod lead_reader;
pub mod lead_writer;
