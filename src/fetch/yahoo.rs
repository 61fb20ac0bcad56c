//! # Yahoo Finance
//!
//! $$
//! \text{GET /v8/finance/chart} \mapsto \{(t, \text{adjclose}_t)\}
//! $$
//!
//! Daily adjusted closes from Yahoo Finance through the blocking
//! `yahoo_finance_api` client.

use chrono::DateTime;
use chrono::NaiveDate;
use time::OffsetDateTime;
use tracing::warn;
use yahoo_finance_api as yahoo;

use super::PriceSource;
use crate::data::DateRange;
use crate::data::Ticker;
use crate::error::PipelineError;
use crate::error::Result;

/// [`PriceSource`] backed by the Yahoo Finance chart API.
pub struct YahooPriceSource {
  connector: yahoo::YahooConnector,
}

impl YahooPriceSource {
  pub fn new() -> Result<Self> {
    let connector = yahoo::YahooConnector::new().map_err(|e| PipelineError::DataUnavailable {
      ticker: "*".to_string(),
      reason: format!("failed to create Yahoo client: {e}"),
    })?;
    Ok(Self { connector })
  }
}

fn unavailable(ticker: &Ticker, err: impl std::fmt::Display) -> PipelineError {
  PipelineError::DataUnavailable {
    ticker: ticker.to_string(),
    reason: err.to_string(),
  }
}

fn to_offset(date: NaiveDate) -> Result<OffsetDateTime> {
  let midnight = date
    .and_hms_opt(0, 0, 0)
    .ok_or_else(|| PipelineError::InvalidInput(format!("invalid date {date}")))?;
  OffsetDateTime::from_unix_timestamp(midnight.and_utc().timestamp())
    .map_err(|e| PipelineError::InvalidInput(format!("date {date} out of range: {e}")))
}

impl PriceSource for YahooPriceSource {
  fn fetch_series(&self, ticker: &Ticker, range: &DateRange) -> Result<Vec<(NaiveDate, f64)>> {
    let start = to_offset(range.start())?;
    let end = to_offset(range.end())?;

    let response = self
      .connector
      .get_quote_history(ticker.as_str(), start, end)
      .map_err(|e| unavailable(ticker, e))?;
    let quotes = response.quotes().map_err(|e| unavailable(ticker, e))?;

    let mut series = Vec::with_capacity(quotes.len());
    for quote in quotes {
      let Some(stamp) = DateTime::from_timestamp(quote.timestamp as i64, 0) else {
        warn!(%ticker, timestamp = quote.timestamp, "skipping quote with invalid timestamp");
        continue;
      };
      let date = stamp.date_naive();
      if range.contains(date) {
        series.push((date, quote.adjclose));
      }
    }
    Ok(series)
  }
}
