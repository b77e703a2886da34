//! Company fiscal calendars and the mapping from report dates to fiscal
//! year and period.

pub mod calendar;
pub mod period;

pub use calendar::{
    normalize_identifier, CalendarEntry, FiscalCalendar, FiscalCalendarRegistry,
    FourthQuarterLabel,
};
pub use period::{
    determine_fiscal_period, fiscal_period_for, FiscalPeriod, FiscalPeriodResolver, PeriodLabel,
};
