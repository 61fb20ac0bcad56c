//! # Price Fetching
//!
//! $$
//! (\{s_i\}, [t_0, t_1)) \mapsto P
//! $$
//!
//! Price sources turn a ticker list and a date range into a [`PriceTable`].

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::data::DateRange;
use crate::data::PriceTable;
use crate::data::Ticker;
use crate::error::PipelineError;
use crate::error::Result;

#[cfg(feature = "yahoo")]
pub mod yahoo;

#[cfg(feature = "yahoo")]
pub use yahoo::YahooPriceSource;

/// Provider of adjusted close prices.
pub trait PriceSource {
  /// Adjusted closes of one ticker inside `range`, in any order.
  ///
  /// Fails with [`PipelineError::DataUnavailable`] when the source has nothing
  /// for the ticker/range combination.
  fn fetch_series(&self, ticker: &Ticker, range: &DateRange) -> Result<Vec<(NaiveDate, f64)>>;

  /// Fetch every ticker and outer-join the results on date.
  fn fetch(&self, tickers: &[Ticker], range: &DateRange) -> Result<PriceTable> {
    let mut series = Vec::with_capacity(tickers.len());
    for ticker in tickers {
      let quotes = self.fetch_series(ticker, range)?;
      if quotes.is_empty() {
        return Err(PipelineError::DataUnavailable {
          ticker: ticker.to_string(),
          reason: format!("no quotes in {range}"),
        });
      }
      debug!(%ticker, quotes = quotes.len(), "fetched price series");
      series.push((ticker.clone(), quotes));
    }
    PriceTable::from_series(series)
  }
}

/// In-memory price source, for offline runs and tests.
///
/// Deserializes from a JSON object of `ticker -> [[date, price], ...]`.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct MemoryPriceSource {
  series: HashMap<Ticker, Vec<(NaiveDate, f64)>>,
}

impl MemoryPriceSource {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse `{"AAPL": [["2024-01-02", 185.2], ...], ...}`.
  pub fn from_json_str(json: &str) -> Result<Self> {
    serde_json::from_str(json)
      .map_err(|e| PipelineError::InvalidInput(format!("invalid price document: {e}")))
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| {
      PipelineError::InvalidInput(format!("failed reading {}: {e}", path.display()))
    })?;
    Self::from_json_str(&raw)
  }

  /// Register (or replace) the full history of a ticker.
  pub fn insert(&mut self, ticker: Ticker, quotes: Vec<(NaiveDate, f64)>) {
    self.series.insert(ticker, quotes);
  }

  /// Builder-style [`MemoryPriceSource::insert`].
  pub fn with_series(mut self, ticker: Ticker, quotes: Vec<(NaiveDate, f64)>) -> Self {
    self.insert(ticker, quotes);
    self
  }
}

impl PriceSource for MemoryPriceSource {
  fn fetch_series(&self, ticker: &Ticker, range: &DateRange) -> Result<Vec<(NaiveDate, f64)>> {
    let quotes = self
      .series
      .get(ticker)
      .ok_or_else(|| PipelineError::DataUnavailable {
        ticker: ticker.to_string(),
        reason: "unknown ticker".to_string(),
      })?;

    Ok(
      quotes
        .iter()
        .filter(|(date, _)| range.contains(*date))
        .copied()
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  fn source() -> MemoryPriceSource {
    MemoryPriceSource::new()
      .with_series(
        Ticker::new("AAA").unwrap(),
        vec![(day(1), 10.0), (day(4), 10.5), (day(5), 10.2)],
      )
      .with_series(
        Ticker::new("BBB").unwrap(),
        vec![(day(1), 20.0), (day(5), 21.0)],
      )
  }

  #[test]
  fn fetch_filters_by_range_and_joins() {
    let tickers = vec![Ticker::new("AAA").unwrap(), Ticker::new("BBB").unwrap()];
    let range = DateRange::new(day(1), day(5)).unwrap();

    let table = source().fetch(&tickers, &range).unwrap();

    assert_eq!(table.dates(), &[day(1), day(4)]);
    assert_eq!(table.valid_counts(), vec![2, 1]);
  }

  #[test]
  fn loads_from_json_document() {
    let source = MemoryPriceSource::from_json_str(
      r#"{ "aaa": [["2024-03-01", 10.0], ["2024-03-04", 10.5]] }"#,
    )
    .unwrap();
    let range = DateRange::new(day(1), day(30)).unwrap();

    let table = source.fetch(&[Ticker::new("AAA").unwrap()], &range).unwrap();
    assert_eq!(table.n_rows(), 2);
  }

  #[test]
  fn rejects_blank_ticker_in_json() {
    let err = MemoryPriceSource::from_json_str(r#"{ " ": [] }"#).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
  }

  #[test]
  fn unknown_ticker_is_unavailable() {
    let tickers = vec![Ticker::new("ZZZ").unwrap()];
    let range = DateRange::new(day(1), day(5)).unwrap();

    let err = source().fetch(&tickers, &range).unwrap_err();
    assert!(matches!(err, PipelineError::DataUnavailable { ref ticker, .. } if ticker == "ZZZ"));
  }

  #[test]
  fn range_without_quotes_is_unavailable() {
    let tickers = vec![Ticker::new("BBB").unwrap()];
    let range = DateRange::new(day(2), day(5)).unwrap();

    let err = source().fetch(&tickers, &range).unwrap_err();
    assert!(matches!(err, PipelineError::DataUnavailable { .. }));
  }
}
