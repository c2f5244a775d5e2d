//! Fiscal period management.
//!
//! Periods partition a tenant's calendar without gaps or overlaps and gate
//! which entry dates accept postings:
//! - `Open`: postings accepted
//! - `Closed`: no postings; may still be locked
//! - `Locked`: final, never reopened

pub mod calendar;
pub mod period;
pub mod service;

pub use calendar::{PeriodRange, date_ranges_overlap, monthly_ranges, validate_new_range};
pub use period::{FiscalPeriod, FiscalPeriodStatus};
pub use service::FiscalCalendar;
