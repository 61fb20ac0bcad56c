//! # Price Table
//!
//! $$
//! P_{t,i} = \text{adjusted close of asset } i \text{ on date } t
//! $$
//!
//! Date-indexed matrix of adjusted closes. Missing observations are stored as
//! `NaN`; [`PriceTable::drop_missing_rows`] aligns the table to the dates on
//! which every ticker traded.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use ndarray::s;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;

use super::returns::ReturnSeries;
use super::ticker::Ticker;
use crate::error::PipelineError;
use crate::error::Result;

/// Adjusted close prices, rows are dates and columns are tickers.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceTable {
  dates: Vec<NaiveDate>,
  tickers: Vec<Ticker>,
  prices: Array2<f64>,
}

impl PriceTable {
  /// Build a table from a dense matrix.
  ///
  /// Dates must be strictly increasing. Non-finite and non-positive prices are
  /// treated as missing.
  pub fn new(dates: Vec<NaiveDate>, tickers: Vec<Ticker>, prices: Array2<f64>) -> Result<Self> {
    if prices.dim() != (dates.len(), tickers.len()) {
      return Err(PipelineError::InvalidInput(format!(
        "price matrix is {:?}, expected ({}, {})",
        prices.dim(),
        dates.len(),
        tickers.len()
      )));
    }
    if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
      return Err(PipelineError::InvalidInput(format!(
        "dates must be strictly increasing, found {} followed by {}",
        w[0], w[1]
      )));
    }

    let prices = prices.mapv(|p| if p.is_finite() && p > 0.0 { p } else { f64::NAN });
    Ok(Self {
      dates,
      tickers,
      prices,
    })
  }

  /// Outer-join per-ticker series on date.
  ///
  /// A date present for any ticker becomes a row; tickers without a quote on
  /// that date get a missing value. Repeated dates within one series keep the
  /// last quote.
  pub fn from_series(series: Vec<(Ticker, Vec<(NaiveDate, f64)>)>) -> Result<Self> {
    let dates: Vec<NaiveDate> = series
      .iter()
      .flat_map(|(_, quotes)| quotes.iter().map(|(d, _)| *d))
      .collect::<BTreeSet<_>>()
      .into_iter()
      .collect();
    let row_of: BTreeMap<NaiveDate, usize> =
      dates.iter().enumerate().map(|(i, d)| (*d, i)).collect();

    let mut prices = Array2::from_elem((dates.len(), series.len()), f64::NAN);
    let mut tickers = Vec::with_capacity(series.len());
    for (col, (ticker, quotes)) in series.into_iter().enumerate() {
      for (date, price) in quotes {
        prices[[row_of[&date], col]] = price;
      }
      tickers.push(ticker);
    }

    Self::new(dates, tickers, prices)
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn tickers(&self) -> &[Ticker] {
    &self.tickers
  }

  pub fn prices(&self) -> ArrayView2<'_, f64> {
    self.prices.view()
  }

  pub fn n_rows(&self) -> usize {
    self.dates.len()
  }

  pub fn n_tickers(&self) -> usize {
    self.tickers.len()
  }

  pub fn is_empty(&self) -> bool {
    self.dates.is_empty() || self.tickers.is_empty()
  }

  /// Price column of `ticker` (first match when tickers repeat).
  pub fn column(&self, ticker: &Ticker) -> Option<ArrayView1<'_, f64>> {
    let idx = self.tickers.iter().position(|t| t == ticker)?;
    Some(self.prices.column(idx))
  }

  /// Last `n` rows (all rows if the table is shorter).
  pub fn tail(&self, n: usize) -> PriceTable {
    let start = self.n_rows().saturating_sub(n);
    Self {
      dates: self.dates[start..].to_vec(),
      tickers: self.tickers.clone(),
      prices: self.prices.slice(s![start.., ..]).to_owned(),
    }
  }

  /// Number of non-missing prices per ticker, in column order.
  pub fn valid_counts(&self) -> Vec<usize> {
    self
      .prices
      .columns()
      .into_iter()
      .map(|col| col.iter().filter(|p| !p.is_nan()).count())
      .collect()
  }

  /// Whether any price is missing.
  pub fn has_missing(&self) -> bool {
    self.prices.iter().any(|p| p.is_nan())
  }

  /// Keep only the dates on which every ticker has a price.
  pub fn drop_missing_rows(&self) -> PriceTable {
    let keep: Vec<usize> = self
      .prices
      .rows()
      .into_iter()
      .enumerate()
      .filter(|(_, row)| row.iter().all(|p| !p.is_nan()))
      .map(|(i, _)| i)
      .collect();

    Self {
      dates: keep.iter().map(|&i| self.dates[i]).collect(),
      tickers: self.tickers.clone(),
      prices: self.prices.select(Axis(0), &keep),
    }
  }

  /// Period-over-period returns; the first date has no predecessor and is dropped.
  ///
  /// Simple returns `P_t / P_{t-1} - 1`, or `ln(P_t / P_{t-1})` when `log` is set.
  /// Missing prices propagate as missing returns.
  pub fn returns(&self, log: bool) -> ReturnSeries {
    let n = self.n_tickers();
    if self.n_rows() < 2 {
      return ReturnSeries::new(Vec::new(), self.tickers.clone(), Array2::zeros((0, n)));
    }

    let prev = self.prices.slice(s![..-1, ..]);
    let next = self.prices.slice(s![1.., ..]);
    let ratio = &next / &prev;
    let values = if log {
      ratio.mapv(f64::ln)
    } else {
      ratio.mapv(|x| x - 1.0)
    };

    ReturnSeries::new(self.dates[1..].to_vec(), self.tickers.clone(), values)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_relative_eq;
  use ndarray::array;

  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
  }

  fn ticker(s: &str) -> Ticker {
    Ticker::new(s).unwrap()
  }

  fn sample() -> PriceTable {
    PriceTable::new(
      vec![day(2), day(3), day(4), day(5)],
      vec![ticker("AAA"), ticker("BBB")],
      array![[100.0, 50.0], [110.0, f64::NAN], [99.0, 55.0], [108.9, 60.5]],
    )
    .unwrap()
  }

  #[test]
  fn rejects_unsorted_dates() {
    let err = PriceTable::new(
      vec![day(3), day(2)],
      vec![ticker("AAA")],
      array![[1.0], [2.0]],
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
  }

  #[test]
  fn rejects_shape_mismatch() {
    let err = PriceTable::new(vec![day(2)], vec![ticker("AAA")], array![[1.0, 2.0]]).unwrap_err();
    assert!(matches!(err, PipelineError::InvalidInput(_)));
  }

  #[test]
  fn non_positive_prices_count_as_missing() {
    let table = PriceTable::new(
      vec![day(2), day(3), day(4)],
      vec![ticker("AAA")],
      array![[1.0], [0.0], [-3.0]],
    )
    .unwrap();
    assert_eq!(table.valid_counts(), vec![1]);
  }

  #[test]
  fn from_series_outer_joins_dates() {
    let table = PriceTable::from_series(vec![
      (ticker("AAA"), vec![(day(3), 11.0), (day(2), 10.0)]),
      (ticker("BBB"), vec![(day(4), 21.0), (day(3), 20.0)]),
    ])
    .unwrap();

    assert_eq!(table.dates(), &[day(2), day(3), day(4)]);
    assert_eq!(table.valid_counts(), vec![2, 2]);
    assert!(table.prices()[[0, 1]].is_nan());
    assert!(table.prices()[[2, 0]].is_nan());
    assert_eq!(table.prices()[[1, 1]], 20.0);
  }

  #[test]
  fn drop_missing_rows_aligns_tickers() {
    let aligned = sample().drop_missing_rows();

    assert_eq!(aligned.dates(), &[day(2), day(4), day(5)]);
    assert!(!aligned.has_missing());
    assert_eq!(aligned.column(&ticker("BBB")).unwrap().to_vec(), vec![50.0, 55.0, 60.5]);
  }

  #[test]
  fn tail_takes_last_rows() {
    let table = sample();
    assert_eq!(table.tail(2).dates(), &[day(4), day(5)]);
    assert_eq!(table.tail(10).n_rows(), 4);
    assert_eq!(table.tail(0).n_rows(), 0);
  }

  #[test]
  fn simple_returns_drop_first_row() {
    let returns = sample().drop_missing_rows().returns(false);

    assert_eq!(returns.dates(), &[day(4), day(5)]);
    assert_relative_eq!(returns.values()[[0, 0]], -0.01, epsilon = 1e-12);
    assert_relative_eq!(returns.values()[[1, 0]], 0.1, epsilon = 1e-12);
    assert_relative_eq!(returns.values()[[0, 1]], 0.1, epsilon = 1e-12);
  }

  #[test]
  fn log_returns_use_price_ratio() {
    let returns = sample().drop_missing_rows().returns(true);
    assert_relative_eq!(returns.values()[[1, 1]], 1.1f64.ln(), epsilon = 1e-12);
  }

  #[test]
  fn returns_of_single_row_are_empty() {
    let returns = sample().tail(1).returns(false);
    assert_eq!(returns.n_periods(), 0);
    assert_eq!(returns.tickers().len(), 2);
  }
}
