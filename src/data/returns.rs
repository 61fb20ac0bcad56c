//! # Return Series
//!
//! $$
//! R \in \mathbb{R}^{(T-1) \times N}
//! $$
//!

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView2;

use super::ticker::Ticker;

/// Per-period returns, rows are dates and columns are tickers.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnSeries {
  dates: Vec<NaiveDate>,
  tickers: Vec<Ticker>,
  values: Array2<f64>,
}

impl ReturnSeries {
  pub(crate) fn new(dates: Vec<NaiveDate>, tickers: Vec<Ticker>, values: Array2<f64>) -> Self {
    debug_assert_eq!(values.dim(), (dates.len(), tickers.len()));
    Self {
      dates,
      tickers,
      values,
    }
  }

  pub fn dates(&self) -> &[NaiveDate] {
    &self.dates
  }

  pub fn tickers(&self) -> &[Ticker] {
    &self.tickers
  }

  pub fn values(&self) -> ArrayView2<'_, f64> {
    self.values.view()
  }

  /// Number of return observations.
  pub fn n_periods(&self) -> usize {
    self.dates.len()
  }
}
