pub mod diagnostics;
pub mod document;
pub mod table;
pub mod types;
pub mod xbrl;

#[cfg(test)]
pub mod tests;

pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use document::{
    DocumentFormat, HtmlDocument, TaggedDocument, TaggedElement, XmlDocument,
};
pub use types::{Context, ContextPeriod, Decimals, Fact, FactStore, Unit, UnitMeasure};
pub use xbrl::{extract, extract_document, parse_decimals, Extraction};
