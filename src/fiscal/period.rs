use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::calendar::{FiscalCalendar, FiscalCalendarRegistry, FourthQuarterLabel};
use crate::edgar::parsing::{Diagnostic, DiagnosticKind};
use crate::edgar::report::FilingKind;

/// Fiscal period label. There is no fourth quarter: the window
/// ending at the fiscal year boundary is reported as `annual` or, for
/// quarterly filings, under the prior quarter's label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PeriodLabel {
    Q1,
    Q2,
    Q3,
    #[serde(rename = "annual")]
    Annual,
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodLabel::Q1 => write!(f, "Q1"),
            PeriodLabel::Q2 => write!(f, "Q2"),
            PeriodLabel::Q3 => write!(f, "Q3"),
            PeriodLabel::Annual => write!(f, "annual"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub fiscal_year: String,
    pub fiscal_period: PeriodLabel,
}

impl FiscalPeriod {
    fn new(fiscal_year: i32, fiscal_period: PeriodLabel) -> Self {
        Self {
            fiscal_year: fiscal_year.to_string(),
            fiscal_period,
        }
    }
}

impl fmt::Display for FiscalPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FY{} {}", self.fiscal_year, self.fiscal_period)
    }
}

/// Stamps filings with their fiscal year and period using the calendars held
/// in a registry.
#[derive(Debug, Clone, Copy)]
pub struct FiscalPeriodResolver<'a> {
    registry: &'a FiscalCalendarRegistry,
}

impl<'a> FiscalPeriodResolver<'a> {
    pub fn new(registry: &'a FiscalCalendarRegistry) -> Self {
        Self { registry }
    }

    /// Never fails: unregistered identifiers resolve against the December
    /// default calendar.
    pub fn determine_fiscal_period(
        &self,
        identifier: &str,
        period_end_date: NaiveDate,
        filing_kind: FilingKind,
    ) -> FiscalPeriod {
        let calendar = self.registry.get_calendar(identifier);
        fiscal_period_for(&calendar, period_end_date, filing_kind)
    }

    /// Like [`determine_fiscal_period`](Self::determine_fiscal_period), but also
    /// reports when the default calendar had to be used.
    pub fn resolve(
        &self,
        identifier: &str,
        period_end_date: NaiveDate,
        filing_kind: FilingKind,
    ) -> (FiscalPeriod, Option<Diagnostic>) {
        let warning = if self.registry.is_registered(identifier) {
            None
        } else {
            Some(Diagnostic::new(
                DiagnosticKind::UnknownCalendar,
                format!(
                    "No fiscal calendar registered for {}, assuming December 31 year end",
                    identifier
                ),
            ))
        };

        let period = self.determine_fiscal_period(identifier, period_end_date, filing_kind);
        log::debug!(
            "Resolved {} period ending {} ({}) to {}",
            identifier,
            period_end_date,
            filing_kind,
            period
        );
        (period, warning)
    }
}

pub fn determine_fiscal_period(
    registry: &FiscalCalendarRegistry,
    identifier: &str,
    period_end_date: NaiveDate,
    filing_kind: FilingKind,
) -> FiscalPeriod {
    FiscalPeriodResolver::new(registry).determine_fiscal_period(
        identifier,
        period_end_date,
        filing_kind,
    )
}

/// Period end dates this many days either side of an anchored boundary
/// belong to that boundary. 52/53-week years drift by up to a week.
const BOUNDARY_TOLERANCE_DAYS: i64 = 7;

/// Maps a date onto a single calendar.
pub fn fiscal_period_for(
    calendar: &FiscalCalendar,
    period_end_date: NaiveDate,
    filing_kind: FilingKind,
) -> FiscalPeriod {
    let (year, month) = if calendar.uses_exact_boundary() {
        boundary_month(calendar, period_end_date)
            .unwrap_or((period_end_date.year(), period_end_date.month()))
    } else {
        (period_end_date.year(), period_end_date.month())
    };
    let (fiscal_year, offset) = month_offset(calendar.fiscal_year_end_month, year, month);

    let label = match (offset + 2) / 3 {
        1 => PeriodLabel::Q1,
        2 => PeriodLabel::Q2,
        3 => PeriodLabel::Q3,
        _ => match (filing_kind, calendar.fourth_quarter_label) {
            (FilingKind::AnnualReport, _) => PeriodLabel::Annual,
            (FilingKind::QuarterlyReport, FourthQuarterLabel::PriorQuarter) => PeriodLabel::Q3,
            (FilingKind::QuarterlyReport, FourthQuarterLabel::Annual) => PeriodLabel::Annual,
        },
    };

    FiscalPeriod::new(fiscal_year, label)
}

/// Fiscal year and month offset (1..=12) past the prior year end, by month.
fn month_offset(year_end_month: u32, year: i32, month: u32) -> (i32, u32) {
    if month > year_end_month {
        (year + 1, month - year_end_month)
    } else {
        (year, month + 12 - year_end_month)
    }
}

/// Calendar month whose anchored boundary closes the period ending on
/// `date`. A date near an anchor snaps to it; otherwise the period closes at
/// the next anchor on or after the date.
fn boundary_month(calendar: &FiscalCalendar, date: NaiveDate) -> Option<(i32, u32)> {
    let index = month_index(date.year(), date.month());
    let anchor = |index: i32| calendar.anchor_in(index.div_euclid(12), index.rem_euclid(12) as u32 + 1);

    let (nearest, distance) = (index - 1..=index + 1)
        .filter_map(|i| anchor(i).map(|a| (i, (date - a).num_days().abs())))
        .min_by_key(|&(_, distance)| distance)?;

    let closing = if distance <= BOUNDARY_TOLERANCE_DAYS {
        nearest
    } else if date > anchor(index)? {
        index + 1
    } else {
        index
    };

    Some((closing.div_euclid(12), closing.rem_euclid(12) as u32 + 1))
}

fn month_index(year: i32, month: u32) -> i32 {
    year * 12 + month as i32 - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn registry_with(identifier: &str, month: u32, day: u32) -> FiscalCalendarRegistry {
        let registry = FiscalCalendarRegistry::new();
        registry.register_or_update(
            identifier,
            FiscalCalendar::new(identifier, month, day, 1.0).unwrap(),
        );
        registry
    }

    fn period(year: &str, label: PeriodLabel) -> FiscalPeriod {
        FiscalPeriod {
            fiscal_year: year.to_string(),
            fiscal_period: label,
        }
    }

    #[test]
    fn test_december_year_end_matches_calendar_quarters() {
        let registry = FiscalCalendarRegistry::new();
        let resolver = FiscalPeriodResolver::new(&registry);

        for month in 1..=9 {
            let result =
                resolver.determine_fiscal_period("IBM", date(2023, month, 15), FilingKind::QuarterlyReport);
            assert_eq!(result.fiscal_year, "2023");
            let expected = match (month + 2) / 3 {
                1 => PeriodLabel::Q1,
                2 => PeriodLabel::Q2,
                _ => PeriodLabel::Q3,
            };
            assert_eq!(result.fiscal_period, expected, "month {}", month);
        }

        assert_eq!(
            resolver.determine_fiscal_period("IBM", date(2023, 12, 31), FilingKind::AnnualReport),
            period("2023", PeriodLabel::Annual)
        );
    }

    #[test]
    fn test_june_year_end() {
        let registry = registry_with("MSFT", 6, 30);
        let resolver = FiscalPeriodResolver::new(&registry);
        let quarterly = FilingKind::QuarterlyReport;

        assert_eq!(
            resolver.determine_fiscal_period("MSFT", date(2022, 7, 31), quarterly),
            period("2023", PeriodLabel::Q1)
        );
        assert_eq!(
            resolver.determine_fiscal_period("MSFT", date(2023, 4, 30), FilingKind::AnnualReport),
            period("2023", PeriodLabel::Annual)
        );
        // Quarterly filings in the fourth-quarter window reuse Q3 by default;
        // a calendar built with FourthQuarterLabel::Annual labels them annual
        assert_eq!(
            resolver.determine_fiscal_period("MSFT", date(2023, 4, 30), quarterly),
            period("2023", PeriodLabel::Q3)
        );
        let annual_registry = FiscalCalendarRegistry::new();
        annual_registry.register_or_update(
            "MSFT",
            FiscalCalendar::new("MSFT", 6, 30, 1.0)
                .unwrap()
                .with_fourth_quarter_label(FourthQuarterLabel::Annual),
        );
        assert_eq!(
            determine_fiscal_period(&annual_registry, "MSFT", date(2023, 4, 30), quarterly),
            period("2023", PeriodLabel::Annual)
        );
        assert_eq!(
            resolver.determine_fiscal_period("MSFT", date(2023, 6, 30), FilingKind::AnnualReport),
            period("2023", PeriodLabel::Annual)
        );
        assert_eq!(
            resolver.determine_fiscal_period("MSFT", date(2023, 7, 1), quarterly),
            period("2024", PeriodLabel::Q1)
        );
    }

    #[test]
    fn test_september_year_end_never_emits_fourth_quarter() {
        let registry = registry_with("AAPL", 9, 30);
        let resolver = FiscalPeriodResolver::new(&registry);
        let quarterly = FilingKind::QuarterlyReport;

        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2022, 10, 15), quarterly),
            period("2023", PeriodLabel::Q1)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2023, 1, 15), quarterly),
            period("2023", PeriodLabel::Q2)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2023, 7, 15), quarterly),
            period("2023", PeriodLabel::Q3)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2023, 9, 30), quarterly),
            period("2023", PeriodLabel::Q3)
        );
    }

    #[test]
    fn test_fourth_quarter_policy_is_per_calendar() {
        let registry = FiscalCalendarRegistry::new();
        let calendar = FiscalCalendar::new("WMT", 1, 31, 1.0)
            .unwrap()
            .with_fourth_quarter_label(FourthQuarterLabel::Annual);
        registry.register_or_update("WMT", calendar);

        let result = determine_fiscal_period(
            &registry,
            "WMT",
            date(2024, 1, 31),
            FilingKind::QuarterlyReport,
        );
        assert_eq!(result, period("2024", PeriodLabel::Annual));

        let result = determine_fiscal_period(
            &registry,
            "WMT",
            date(2024, 2, 28),
            FilingKind::QuarterlyReport,
        );
        assert_eq!(result, period("2025", PeriodLabel::Q1));
    }

    #[test]
    fn test_weekday_anchored_year_end_drifts() {
        // Year ends on the last Saturday of September, configured as the 28th
        let registry = registry_with("AAPL", 9, 28);
        let resolver = FiscalPeriodResolver::new(&registry);
        let quarterly = FilingKind::QuarterlyReport;

        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2023, 12, 30), quarterly),
            period("2024", PeriodLabel::Q1)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2024, 3, 30), quarterly),
            period("2024", PeriodLabel::Q2)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2024, 6, 29), quarterly),
            period("2024", PeriodLabel::Q3)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2023, 9, 30), FilingKind::AnnualReport),
            period("2023", PeriodLabel::Annual)
        );
        assert_eq!(
            resolver.determine_fiscal_period("AAPL", date(2022, 9, 24), FilingKind::AnnualReport),
            period("2022", PeriodLabel::Annual)
        );
    }

    #[test]
    fn test_year_end_spilling_into_next_month() {
        // Saturday closest to August 31 can land in early September
        let registry = registry_with("COST", 8, 28);
        let resolver = FiscalPeriodResolver::new(&registry);

        assert_eq!(
            resolver.determine_fiscal_period("COST", date(2024, 9, 1), FilingKind::AnnualReport),
            period("2024", PeriodLabel::Annual)
        );
        assert_eq!(
            resolver.determine_fiscal_period("COST", date(2024, 11, 24), FilingKind::QuarterlyReport),
            period("2025", PeriodLabel::Q1)
        );
    }

    #[test]
    fn test_exact_day_boundary_far_from_anchor() {
        let registry = registry_with("MID", 3, 15);
        let resolver = FiscalPeriodResolver::new(&registry);

        // More than a week past the anchor: the next fiscal year has begun
        assert_eq!(
            resolver.determine_fiscal_period("MID", date(2023, 3, 25), FilingKind::QuarterlyReport),
            period("2024", PeriodLabel::Q1)
        );
        assert_eq!(
            resolver.determine_fiscal_period("MID", date(2023, 3, 10), FilingKind::AnnualReport),
            period("2023", PeriodLabel::Annual)
        );
        // Early-month anchors pull late-month period ends forward
        let registry = registry_with("EARLY", 1, 3);
        assert_eq!(
            determine_fiscal_period(&registry, "EARLY", date(2023, 3, 30), FilingKind::QuarterlyReport),
            period("2024", PeriodLabel::Q1)
        );
    }

    #[test]
    fn test_resolve_reports_unknown_calendar() {
        let registry = registry_with("MSFT", 6, 30);
        let resolver = FiscalPeriodResolver::new(&registry);

        let (_, warning) = resolver.resolve("MSFT", date(2023, 3, 31), FilingKind::QuarterlyReport);
        assert!(warning.is_none());

        let (result, warning) =
            resolver.resolve("GOOG", date(2023, 3, 31), FilingKind::QuarterlyReport);
        assert_eq!(result, period("2023", PeriodLabel::Q1));
        assert_eq!(warning.unwrap().kind, DiagnosticKind::UnknownCalendar);
    }

    #[test]
    fn test_period_serialization() {
        let json = serde_json::to_string(&period("2023", PeriodLabel::Annual)).unwrap();
        assert_eq!(json, r#"{"fiscal_year":"2023","fiscal_period":"annual"}"#);
        assert_eq!(PeriodLabel::Q2.to_string(), "Q2");
    }
}
