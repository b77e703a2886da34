use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::parsing::{extract_document, DiagnosticKind, DocumentFormat, Extraction};
use super::report::FilingKind;
use crate::error::Result;
use crate::fiscal::{FiscalCalendarRegistry, FiscalPeriod, FiscalPeriodResolver};

/// What the caller knows about a filing before reading it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingMetadata {
    pub identifier: String,
    pub filing_kind: FilingKind,
    pub period_end_date: NaiveDate,
    /// Names the document in errors so a failed filing can be retried alone
    pub document_name: String,
}

impl FilingMetadata {
    pub fn new(
        identifier: &str,
        filing_kind: FilingKind,
        period_end_date: NaiveDate,
        document_name: &str,
    ) -> Self {
        Self {
            identifier: identifier.to_string(),
            filing_kind,
            period_end_date,
            document_name: document_name.to_string(),
        }
    }
}

/// A filing's facts stamped with its fiscal period.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedFiling {
    pub metadata: FilingMetadata,
    #[serde(flatten)]
    pub fiscal_period: FiscalPeriod,
    #[serde(flatten)]
    pub extraction: Extraction,
}

impl ProcessedFiling {
    pub fn orphan_ratio(&self) -> f64 {
        self.extraction.orphan_ratio()
    }

    /// True when the share of facts with unresolved contexts stays within
    /// `tolerance`.
    pub fn is_acceptable(&self, tolerance: f64) -> bool {
        self.orphan_ratio() <= tolerance
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.extraction.count(kind)
    }
}

/// Extracts the document's facts and resolves its fiscal period. Fails only
/// when the document cannot be parsed.
pub fn process_filing(
    registry: &FiscalCalendarRegistry,
    content: &str,
    metadata: &FilingMetadata,
    format: DocumentFormat,
) -> Result<ProcessedFiling> {
    let mut extraction = extract_document(content, metadata, format)?;

    let (fiscal_period, warning) = FiscalPeriodResolver::new(registry).resolve(
        &metadata.identifier,
        metadata.period_end_date,
        metadata.filing_kind,
    );
    if let Some(warning) = warning {
        log::warn!("{}: {}", metadata.document_name, warning);
        extraction.diagnostics.push(warning);
    }

    log::info!(
        "{} stamped as {} with {} facts",
        metadata.document_name,
        fiscal_period,
        extraction.store.fact_count()
    );

    Ok(ProcessedFiling {
        metadata: metadata.clone(),
        fiscal_period,
        extraction,
    })
}
