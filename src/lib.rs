pub mod core;
pub mod edgar;
pub mod error;
pub mod fiscal;

// Re-exports
pub use edgar::parsing::{Diagnostic, DiagnosticKind, DocumentFormat, Extraction, FactStore};
pub use edgar::{process_filing, FilingKind, FilingMetadata, ProcessedFiling};
pub use error::{FactsError, Result};
pub use fiscal::{FiscalCalendar, FiscalCalendarRegistry, FiscalPeriod, FiscalPeriodResolver};
