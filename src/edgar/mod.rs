//! EDGAR filings: form types, filing metadata, and fact extraction from
//! XBRL instances and inline-tagged documents.

pub mod filing;
pub mod parsing;
pub mod report;

pub use filing::{process_filing, FilingMetadata, ProcessedFiling};
pub use report::{FilingKind, ReportType};
