use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of non-fatal anomaly recorded during extraction or resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    #[serde(rename = "UnparsableDecimalsWarning")]
    UnparsableDecimals,
    #[serde(rename = "UnparsableScaleWarning")]
    UnparsableScale,
    #[serde(rename = "OrphanedContextReferenceWarning")]
    OrphanedContextReference,
    #[serde(rename = "OrphanedUnitReferenceWarning")]
    OrphanedUnitReference,
    #[serde(rename = "MalformedContextWarning")]
    MalformedContext,
    #[serde(rename = "MalformedUnitWarning")]
    MalformedUnit,
    #[serde(rename = "UnknownCalendarWarning")]
    UnknownCalendar,
    /// Concept read from an HTML tag name, which the parser lowercases
    #[serde(rename = "CaseFoldedConceptWarning")]
    CaseFoldedConcept,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnparsableDecimals => "UnparsableDecimalsWarning",
            DiagnosticKind::UnparsableScale => "UnparsableScaleWarning",
            DiagnosticKind::OrphanedContextReference => "OrphanedContextReferenceWarning",
            DiagnosticKind::OrphanedUnitReference => "OrphanedUnitReferenceWarning",
            DiagnosticKind::MalformedContext => "MalformedContextWarning",
            DiagnosticKind::MalformedUnit => "MalformedUnitWarning",
            DiagnosticKind::UnknownCalendar => "UnknownCalendarWarning",
            DiagnosticKind::CaseFoldedConcept => "CaseFoldedConceptWarning",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_ref: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            concept: None,
            context_ref: None,
            message: message.into(),
        }
    }

    pub fn with_concept(mut self, concept: &str) -> Self {
        self.concept = Some(concept.to_string());
        self
    }

    pub fn with_context_ref(mut self, context_ref: &str) -> Self {
        self.context_ref = Some(context_ref.to_string());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Number of diagnostics of the given kind.
pub fn count_kind(diagnostics: &[Diagnostic], kind: DiagnosticKind) -> usize {
    diagnostics.iter().filter(|d| d.kind == kind).count()
}
