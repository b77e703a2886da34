use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// EDGAR periodic report forms that carry financial statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    Form10K,
    Form10KA,
    Form10KT,
    Form10Q,
    Form10QA,
    Form10QT,
    Form20F,
    Form40F,
    Other(String),
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(report_type: ReportType) -> Self {
        report_type.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10KA => write!(f, "10-K/A"),
            ReportType::Form10KT => write!(f, "10-KT"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form10QA => write!(f, "10-Q/A"),
            ReportType::Form10QT => write!(f, "10-QT"),
            ReportType::Form20F => write!(f, "20-F"),
            ReportType::Form40F => write!(f, "40-F"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }

    /// Whether this form is an annual or a quarterly report, if either.
    pub fn filing_kind(&self) -> Option<FilingKind> {
        match self {
            ReportType::Form10K
            | ReportType::Form10KA
            | ReportType::Form10KT
            | ReportType::Form20F
            | ReportType::Form40F => Some(FilingKind::AnnualReport),
            ReportType::Form10Q | ReportType::Form10QA | ReportType::Form10QT => {
                Some(FilingKind::QuarterlyReport)
            }
            ReportType::Other(_) => None,
        }
    }
}

impl FromStr for ReportType {
    type Err = String;
    fn from_str(s: &str) -> Result<ReportType, String> {
        match s.trim().to_uppercase().as_str() {
            "10-K" => Ok(ReportType::Form10K),
            "10-K/A" => Ok(ReportType::Form10KA),
            "10-KT" => Ok(ReportType::Form10KT),
            "10-Q" => Ok(ReportType::Form10Q),
            "10-Q/A" => Ok(ReportType::Form10QA),
            "10-QT" => Ok(ReportType::Form10QT),
            "20-F" => Ok(ReportType::Form20F),
            "40-F" => Ok(ReportType::Form40F),
            _ => Ok(ReportType::Other(s.to_string())),
        }
    }
}

/// Annual or quarterly, the only distinction fiscal period resolution needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilingKind {
    AnnualReport,
    QuarterlyReport,
}

impl fmt::Display for FilingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilingKind::AnnualReport => write!(f, "annual-report"),
            FilingKind::QuarterlyReport => write!(f, "quarterly-report"),
        }
    }
}

impl FromStr for FilingKind {
    type Err = String;

    /// Accepts either a kind name or an EDGAR form type such as "10-Q".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "annual-report" | "annual" => Ok(FilingKind::AnnualReport),
            "quarterly-report" | "quarterly" => Ok(FilingKind::QuarterlyReport),
            _ => ReportType::from_str(s)?.filing_kind().ok_or_else(|| {
                format!(
                    "Unsupported form type {}, expected one of: {}",
                    s,
                    ReportType::list_types()
                )
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_types_map_to_filing_kind() {
        assert_eq!(
            "10-K".parse::<FilingKind>().unwrap(),
            FilingKind::AnnualReport
        );
        assert_eq!(
            "10-q/a".parse::<FilingKind>().unwrap(),
            FilingKind::QuarterlyReport
        );
        assert_eq!(
            "20-F".parse::<FilingKind>().unwrap(),
            FilingKind::AnnualReport
        );
        assert_eq!(
            "quarterly-report".parse::<FilingKind>().unwrap(),
            FilingKind::QuarterlyReport
        );
        assert!("8-K".parse::<FilingKind>().is_err());
    }

    #[test]
    fn test_report_type_round_trips_through_display() {
        for report_type in ReportType::iter().filter(|t| !matches!(t, ReportType::Other(_))) {
            assert_eq!(
                ReportType::from_str(&report_type.to_string()).unwrap(),
                report_type
            );
        }
        assert!(ReportType::list_types().contains("10-QT"));
    }

    #[test]
    fn test_report_type_json_uses_form_names() {
        let json = serde_json::to_string(&ReportType::Form10QA).unwrap();
        assert_eq!(json, "\"10-Q/A\"");
        assert_eq!(
            serde_json::from_str::<ReportType>(&json).unwrap(),
            ReportType::Form10QA
        );

        let other = ReportType::Other("S-1".to_string());
        let json = serde_json::to_string(&other).unwrap();
        assert_eq!(serde_json::from_str::<ReportType>(&json).unwrap(), other);
    }

    #[test]
    fn test_filing_kind_serde_names() {
        let json = serde_json::to_string(&FilingKind::AnnualReport).unwrap();
        assert_eq!(json, "\"annual-report\"");
    }
}
