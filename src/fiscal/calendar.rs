use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{FactsError, Result};

/// Label a quarterly filing receives when its period ends in the last
/// quarter of the fiscal year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FourthQuarterLabel {
    /// Reuse "Q3"; most registrants file no standalone report before the 10-K
    #[default]
    PriorQuarter,
    /// Label the window "annual" regardless of filing kind
    Annual,
}

/// Calendar configuration entry as it appears in a calendar source file.
#[derive(Debug, Clone, Deserialize)]
pub struct CalendarEntry {
    pub identifier: String,
    pub fiscal_year_end_month: u32,
    pub fiscal_year_end_day: u32,
    pub confidence_score: f64,
    #[serde(default)]
    pub fourth_quarter_label: FourthQuarterLabel,
}

/// Per-company fiscal year end, with a confidence score for how much the
/// source of this information can be trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CalendarEntry")]
pub struct FiscalCalendar {
    pub identifier: String,
    pub fiscal_year_end_month: u32,
    pub fiscal_year_end_day: u32,
    pub confidence_score: f64,
    pub fourth_quarter_label: FourthQuarterLabel,
}

impl FiscalCalendar {
    pub fn new(identifier: &str, month: u32, day: u32, confidence_score: f64) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(FactsError::InvalidCalendar {
                identifier: identifier.to_string(),
                reason: format!("fiscal year end month {} outside 1..=12", month),
            });
        }
        if !(1..=31).contains(&day) {
            return Err(FactsError::InvalidCalendar {
                identifier: identifier.to_string(),
                reason: format!("fiscal year end day {} outside 1..=31", day),
            });
        }

        Ok(Self {
            identifier: normalize_identifier(identifier),
            fiscal_year_end_month: month,
            fiscal_year_end_day: day,
            confidence_score: clamp_confidence(confidence_score),
            fourth_quarter_label: FourthQuarterLabel::default(),
        })
    }

    /// December 31st with zero confidence, used for unregistered companies.
    pub fn default_for(identifier: &str) -> Self {
        Self {
            identifier: normalize_identifier(identifier),
            fiscal_year_end_month: 12,
            fiscal_year_end_day: 31,
            confidence_score: 0.0,
            fourth_quarter_label: FourthQuarterLabel::default(),
        }
    }

    pub fn with_fourth_quarter_label(mut self, label: FourthQuarterLabel) -> Self {
        self.fourth_quarter_label = label;
        self
    }

    /// True when the year end falls before the last day of its month, so
    /// boundaries must be placed by exact date rather than by month.
    ///
    /// February is judged against a non-leap year so a "Feb 28" year end
    /// stays month-aligned.
    pub fn uses_exact_boundary(&self) -> bool {
        self.fiscal_year_end_day < last_day_of_month(2023, self.fiscal_year_end_month)
    }

    /// Fiscal year end date falling in the given calendar year.
    pub fn year_end_in(&self, year: i32) -> Option<NaiveDate> {
        self.anchor_in(year, self.fiscal_year_end_month)
    }

    /// The configured year-end day placed in any month, clamped to the
    /// month's length. Quarter boundaries sit on these anchors.
    pub fn anchor_in(&self, year: i32, month: u32) -> Option<NaiveDate> {
        let day = self.fiscal_year_end_day.min(last_day_of_month(year, month));
        NaiveDate::from_ymd_opt(year, month, day)
    }
}

impl TryFrom<CalendarEntry> for FiscalCalendar {
    type Error = FactsError;

    fn try_from(entry: CalendarEntry) -> Result<Self> {
        Ok(Self::new(
            &entry.identifier,
            entry.fiscal_year_end_month,
            entry.fiscal_year_end_day,
            entry.confidence_score,
        )?
        .with_fourth_quarter_label(entry.fourth_quarter_label))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    calendar: Arc<FiscalCalendar>,
    registered: bool,
}

/// Read-mostly cache of fiscal calendars keyed by company identifier.
///
/// Reads take a shared lock; updates are serialized and only land when the
/// incoming confidence is at least the stored one.
#[derive(Debug, Default)]
pub struct FiscalCalendarRegistry {
    calendars: RwLock<HashMap<String, Slot>>,
}

impl FiscalCalendarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<CalendarEntry>) -> Result<Self> {
        let registry = Self::new();
        for entry in entries {
            let calendar = FiscalCalendar::try_from(entry)?;
            let identifier = calendar.identifier.clone();
            registry.register_or_update(&identifier, calendar);
        }
        Ok(registry)
    }

    /// Loads a JSON array of calendar entries.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let entries: Vec<CalendarEntry> =
            serde_json::from_str(&content).map_err(|source| FactsError::CalendarSource {
                path: path.display().to_string(),
                source,
            })?;

        log::info!("Loaded {} calendar entries from {:?}", entries.len(), path);
        Self::from_entries(entries)
    }

    /// Returns the registered calendar, creating and caching the December
    /// default on first lookup of an unknown identifier.
    pub fn get_calendar(&self, identifier: &str) -> Arc<FiscalCalendar> {
        let key = normalize_identifier(identifier);

        if let Some(slot) = self.read_slots().get(&key) {
            return Arc::clone(&slot.calendar);
        }

        let mut slots = self
            .calendars
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = slots.entry(key).or_insert_with_key(|key| {
            log::debug!("No fiscal calendar for {}, using December year end", key);
            Slot {
                calendar: Arc::new(FiscalCalendar::default_for(key)),
                registered: false,
            }
        });
        Arc::clone(&slot.calendar)
    }

    /// Returns the calendar only if one was explicitly registered.
    pub fn lookup(&self, identifier: &str) -> Option<Arc<FiscalCalendar>> {
        self.read_slots()
            .get(&normalize_identifier(identifier))
            .filter(|slot| slot.registered)
            .map(|slot| Arc::clone(&slot.calendar))
    }

    pub fn is_registered(&self, identifier: &str) -> bool {
        self.lookup(identifier).is_some()
    }

    /// Stores the calendar unless a registered entry with higher confidence
    /// already exists. Returns whether the update was applied.
    pub fn register_or_update(&self, identifier: &str, calendar: FiscalCalendar) -> bool {
        let key = normalize_identifier(identifier);
        let mut calendar = calendar;
        calendar.identifier = key.clone();
        calendar.confidence_score = clamp_confidence(calendar.confidence_score);

        let mut slots = self
            .calendars
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = slots.get(&key) {
            if existing.registered
                && calendar.confidence_score < existing.calendar.confidence_score
            {
                log::debug!(
                    "Ignoring calendar update for {}: confidence {} < stored {}",
                    key,
                    calendar.confidence_score,
                    existing.calendar.confidence_score
                );
                return false;
            }
        }

        log::debug!(
            "Registered fiscal calendar for {}: year end {:02}-{:02} (confidence {})",
            key,
            calendar.fiscal_year_end_month,
            calendar.fiscal_year_end_day,
            calendar.confidence_score
        );
        slots.insert(
            key,
            Slot {
                calendar: Arc::new(calendar),
                registered: true,
            },
        );
        true
    }

    pub fn len(&self) -> usize {
        self.read_slots().values().filter(|s| s.registered).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Slot>> {
        self.calendars.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Upper-cases tickers and strips zero padding from numeric CIKs.
pub fn normalize_identifier(identifier: &str) -> String {
    let trimmed = identifier.trim();
    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        let stripped = trimmed.trim_start_matches('0');
        return if stripped.is_empty() { "0" } else { stripped }.to_string();
    }
    trimmed.to_uppercase()
}

pub(crate) fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn clamp_confidence(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 1.0)
    }
}
