//! # Return and Risk Estimation
//!
//! $$
//! \hat\mu_i = \Big(\prod_{t=1}^{T}(1+r_{t,i})\Big)^{f/T} - 1,
//! \qquad
//! \hat\Sigma = \frac{f}{T-1}\sum_{t=1}^{T}(r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Annualized mean historical returns and sample covariance. Rows with a
//! missing price for any ticker are dropped before estimation, so every
//! statistic is computed over the same set of dates.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;
use tracing::warn;

use crate::config::EstimatorConfig;
use crate::data::PriceTable;
use crate::data::ReturnSeries;
use crate::data::Ticker;
use crate::error::PipelineError;
use crate::error::Result;

/// Minimum valid prices per ticker before alignment.
pub const MIN_PRICE_OBSERVATIONS: usize = 2;

/// Minimum return observations for a sample covariance (ddof = 1).
pub const MIN_RETURN_OBSERVATIONS: usize = 2;

/// Expected returns and covariance over one ticker set.
#[derive(Clone, Debug)]
pub struct Estimates {
  /// Tickers, in the order of the vector and matrix entries.
  pub tickers: Vec<Ticker>,
  /// Annualized expected return per ticker.
  pub expected_returns: Array1<f64>,
  /// Annualized sample covariance of returns.
  pub covariance: Array2<f64>,
  /// Number of aligned return observations used.
  pub n_periods: usize,
}

/// Annualized mean historical return per column.
///
/// With compounding this is the geometric average growth rate; otherwise the
/// arithmetic mean scaled by `periods_per_year`. For log returns the
/// compounded figure is `exp(mean * f) - 1`.
pub fn mean_historical_return(returns: &ReturnSeries, config: &EstimatorConfig) -> Array1<f64> {
  let values = returns.values();
  let n_tickers = values.ncols();
  let count = returns.n_periods();
  if count == 0 {
    return Array1::from_elem(n_tickers, f64::NAN);
  }

  let freq = config.periods_per_year as f64;
  let mean = values.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(n_tickers));

  match (config.compounding, config.log_returns) {
    (false, _) => mean * freq,
    (true, true) => mean.mapv(|m| (m * freq).exp() - 1.0),
    (true, false) => values
      .columns()
      .into_iter()
      .map(|col| {
        let growth: f64 = col.iter().map(|r| 1.0 + r).product();
        growth.powf(freq / count as f64) - 1.0
      })
      .collect(),
  }
}

/// Annualized sample covariance (ddof = 1) of the return columns.
pub fn sample_covariance(returns: &ReturnSeries, config: &EstimatorConfig) -> Result<Array2<f64>> {
  let count = returns.n_periods();
  if count < MIN_RETURN_OBSERVATIONS {
    return Err(PipelineError::InsufficientData {
      subject: "return series".to_string(),
      observations: count,
      required: MIN_RETURN_OBSERVATIONS,
    });
  }

  // `cov` treats rows as variables, so hand it tickers x dates.
  let cov = returns
    .values()
    .t()
    .cov(1.0)
    .map_err(|_| PipelineError::InsufficientData {
      subject: "return series".to_string(),
      observations: count,
      required: MIN_RETURN_OBSERVATIONS,
    })?;

  Ok(cov * config.periods_per_year as f64)
}

/// Validate, align and estimate from a raw price table.
#[tracing::instrument(skip_all, fields(tickers = prices.n_tickers(), rows = prices.n_rows()))]
pub fn estimate(prices: &PriceTable, config: &EstimatorConfig) -> Result<Estimates> {
  if prices.n_tickers() == 0 {
    return Err(PipelineError::DegenerateInput(
      "price table has no tickers".to_string(),
    ));
  }

  for (ticker, count) in prices.tickers().iter().zip(prices.valid_counts()) {
    if count < MIN_PRICE_OBSERVATIONS {
      return Err(PipelineError::InsufficientData {
        subject: ticker.to_string(),
        observations: count,
        required: MIN_PRICE_OBSERVATIONS,
      });
    }
  }

  let aligned = prices.drop_missing_rows();
  let dropped = prices.n_rows() - aligned.n_rows();
  if dropped > 0 {
    warn!(dropped, kept = aligned.n_rows(), "dropped dates with missing prices");
  }

  // A lone asset is fully invested whatever its risk, so one return suffices.
  let single = aligned.n_tickers() == 1;
  let required = if single { 1 } else { MIN_RETURN_OBSERVATIONS };
  let returns = aligned.returns(config.log_returns);
  if returns.n_periods() < required {
    return Err(PipelineError::InsufficientData {
      subject: "common date range".to_string(),
      observations: aligned.n_rows(),
      required: required + 1,
    });
  }

  let expected_returns = mean_historical_return(&returns, config);
  let covariance = if single && returns.n_periods() < MIN_RETURN_OBSERVATIONS {
    // Dispersion of a single observation about itself.
    Array2::zeros((1, 1))
  } else {
    sample_covariance(&returns, config)?
  };
  debug!(periods = returns.n_periods(), "estimated returns and covariance");

  Ok(Estimates {
    tickers: aligned.tickers().to_vec(),
    expected_returns,
    covariance,
    n_periods: returns.n_periods(),
  })
}
