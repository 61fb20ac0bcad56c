//! # Date Range
//!
//! $$
//! [t_0, t_1)
//! $$
//!

use std::fmt::Display;

use chrono::NaiveDate;

use crate::error::PipelineError;
use crate::error::Result;

/// Half-open calendar range `[start, end)` of requested prices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateRange {
  start: NaiveDate,
  end: NaiveDate,
}

impl DateRange {
  /// Build a range, requiring `start < end`.
  pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
    if start >= end {
      return Err(PipelineError::InvalidInput(format!(
        "start date {start} must be before end date {end}"
      )));
    }
    Ok(Self { start, end })
  }

  /// Parse two `YYYY-MM-DD` dates.
  pub fn parse(start: &str, end: &str) -> Result<Self> {
    Self::new(parse_date(start)?, parse_date(end)?)
  }

  pub fn start(&self) -> NaiveDate {
    self.start
  }

  pub fn end(&self) -> NaiveDate {
    self.end
  }

  pub fn contains(&self, date: NaiveDate) -> bool {
    self.start <= date && date < self.end
  }
}

impl Display for DateRange {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}..{}", self.start, self.end)
  }
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
    .map_err(|e| PipelineError::InvalidInput(format!("invalid date {raw:?}: {e}")))
}
