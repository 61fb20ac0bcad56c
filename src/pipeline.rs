//! # Pipeline
//!
//! $$
//! (\text{tickers}, [t_0, t_1)) \xrightarrow{\text{fetch}} P
//! \xrightarrow{\text{estimate}} (\hat\mu, \hat\Sigma)
//! \xrightarrow{\text{optimize}} \mathbf w
//! $$
//!
//! Synchronous orchestration of one optimization run. Each stage is exposed on
//! its own so callers can show intermediate results (the price preview) before
//! a later stage fails.

use tracing::info;

use crate::config::PipelineConfig;
use crate::data::parse_tickers;
use crate::data::DateRange;
use crate::data::PriceTable;
use crate::data::Ticker;
use crate::error::Result;
use crate::estimate::estimate;
use crate::estimate::Estimates;
use crate::fetch::PriceSource;
use crate::optimize::EfficientFrontier;
use crate::optimize::PortfolioPerformance;
use crate::optimize::WeightMapping;

/// Weights produced by the optimizer stage.
#[derive(Clone, Debug)]
pub struct Allocation {
  /// Solver output, one entry per ticker.
  pub raw: WeightMapping,
  /// Cleaned weights: no negligible entries, sums to one.
  pub weights: WeightMapping,
  /// Statistics of the cleaned weights.
  pub performance: PortfolioPerformance,
}

/// Everything one run produces.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
  /// Prices as fetched, before alignment.
  pub prices: PriceTable,
  pub estimates: Estimates,
  pub allocation: Allocation,
}

/// Fetch, estimate and optimize with a fixed configuration.
#[derive(Clone, Debug)]
pub struct Pipeline<S> {
  source: S,
  config: PipelineConfig,
}

impl<S: PriceSource> Pipeline<S> {
  pub fn new(source: S, config: PipelineConfig) -> Self {
    Self { source, config }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  #[tracing::instrument(skip_all, fields(tickers = tickers.len(), range = %range))]
  pub fn fetch(&self, tickers: &[Ticker], range: &DateRange) -> Result<PriceTable> {
    let prices = self.source.fetch(tickers, range)?;
    info!(rows = prices.n_rows(), "fetched prices");
    Ok(prices)
  }

  pub fn estimate(&self, prices: &PriceTable) -> Result<Estimates> {
    estimate(prices, &self.config.estimator)
  }

  #[tracing::instrument(skip_all, fields(objective = %self.config.optimizer.objective))]
  pub fn optimize(&self, estimates: &Estimates) -> Result<Allocation> {
    let optimizer = &self.config.optimizer;
    let mut frontier = EfficientFrontier::from_estimates(estimates)?;
    let raw = frontier.optimize(optimizer)?;
    let weights = frontier.clean_weights(optimizer.cutoff)?;

    let cleaned: Vec<f64> = frontier
      .tickers()
      .iter()
      .map(|t| weights.get(t.as_str()).unwrap_or(0.0))
      .collect();
    let performance = frontier.performance_of(&cleaned, optimizer.risk_free_rate);
    info!(
      assets = weights.len(),
      dropped = raw.len() - weights.len(),
      sharpe = performance.sharpe,
      "cleaned weights"
    );

    Ok(Allocation {
      raw,
      weights,
      performance,
    })
  }

  /// Run every stage for already-parsed tickers.
  pub fn run_tickers(&self, tickers: &[Ticker], range: &DateRange) -> Result<PipelineOutput> {
    let prices = self.fetch(tickers, range)?;
    let estimates = self.estimate(&prices)?;
    let allocation = self.optimize(&estimates)?;
    Ok(PipelineOutput {
      prices,
      estimates,
      allocation,
    })
  }

  /// Validate a comma-separated ticker list, then run every stage.
  ///
  /// Malformed input is rejected before the price source is touched.
  pub fn run(&self, tickers: &str, range: &DateRange) -> Result<PipelineOutput> {
    let tickers = parse_tickers(tickers)?;
    self.run_tickers(&tickers, range)
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use approx::assert_relative_eq;
  use chrono::Days;
  use chrono::NaiveDate;
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use rand_distr::Distribution;
  use rand_distr::Normal;
  use tracing_test::traced_test;

  use super::*;
  use crate::error::PipelineError;
  use crate::fetch::MemoryPriceSource;
  use crate::optimize::Objective;

  const START: (i32, u32, u32) = (2022, 1, 3);

  fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(START.0, START.1, START.2).unwrap()
  }

  /// Daily geometric Brownian motion closes with annual drift `mu` and volatility `sigma`.
  fn gbm(seed: u64, days: usize, mu: f64, sigma: f64) -> Vec<(NaiveDate, f64)> {
    let dt = 1.0 / 252.0;
    let shock = Normal::new(0.0, 1.0).unwrap();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = 100.0;

    (0..days)
      .map(|i| {
        if i > 0 {
          let z: f64 = shock.sample(&mut rng);
          price *= ((mu - 0.5 * sigma * sigma) * dt + sigma * dt.sqrt() * z).exp();
        }
        (start() + Days::new(i as u64), price)
      })
      .collect()
  }

  fn ticker(s: &str) -> Ticker {
    Ticker::new(s).unwrap()
  }

  fn range() -> DateRange {
    DateRange::new(start(), start() + Days::new(1000)).unwrap()
  }

  fn market() -> MemoryPriceSource {
    MemoryPriceSource::new()
      .with_series(ticker("AAPL"), gbm(1, 504, 0.02, 0.35))
      .with_series(ticker("MSFT"), gbm(2, 504, 0.45, 0.18))
      .with_series(ticker("GOOG"), gbm(3, 504, 0.12, 0.28))
      .with_series(ticker("TSLA"), gbm(4, 504, 0.05, 0.60))
  }

  fn pipeline() -> Pipeline<MemoryPriceSource> {
    Pipeline::new(market(), PipelineConfig::default())
  }

  #[test]
  fn cleaned_weights_form_a_valid_allocation() {
    let out = pipeline().run("AAPL,MSFT,GOOG,TSLA", &range()).unwrap();
    let weights = &out.allocation.weights;

    assert!(!weights.is_empty());
    assert_relative_eq!(weights.total(), 1.0, epsilon = 1e-6);
    assert!(weights.iter().all(|(_, w)| w > 0.0 && w <= 1.0));
  }

  #[test]
  fn cleaned_weights_contain_no_negligible_entries() {
    let out = pipeline().run("AAPL,MSFT,GOOG,TSLA", &range()).unwrap();
    let cutoff = PipelineConfig::default().optimizer.cutoff;
    let total_raw: f64 = out.allocation.raw.total();

    assert_relative_eq!(total_raw, 1.0, epsilon = 1e-9);
    for (_, w) in out.allocation.weights.iter() {
      assert!(w >= cutoff);
    }
  }

  #[test]
  fn identical_inputs_give_identical_weights() {
    let p = pipeline();
    let a = p.run("AAPL,MSFT,GOOG", &range()).unwrap();
    let b = p.run("AAPL,MSFT,GOOG", &range()).unwrap();

    assert_eq!(a.allocation.weights, b.allocation.weights);
  }

  #[test]
  fn single_ticker_is_fully_allocated() {
    let out = pipeline().run("tsla", &range()).unwrap();

    assert_eq!(out.allocation.weights.len(), 1);
    assert_eq!(out.allocation.weights.get("TSLA"), Some(1.0));
  }

  #[test]
  fn single_ticker_with_two_prices_is_fully_allocated() {
    let source = MemoryPriceSource::new().with_series(
      ticker("AAA"),
      vec![(start(), 10.0), (start() + Days::new(1), 11.0)],
    );
    let p = Pipeline::new(source, PipelineConfig::default());

    let out = p.run("AAA", &range()).unwrap();
    assert_eq!(out.estimates.n_periods, 1);
    assert_eq!(out.allocation.weights.get("AAA"), Some(1.0));
    assert_eq!(out.allocation.weights.len(), 1);
  }

  #[test]
  fn higher_sharpe_asset_gets_higher_weight() {
    let out = pipeline().run("AAPL,MSFT", &range()).unwrap();
    let est = &out.estimates;
    let sharpe = |i: usize| (est.expected_returns[i] - 0.02) / est.covariance[[i, i]].sqrt();
    assert!(sharpe(1) > sharpe(0), "fixture must favour MSFT");

    let w = &out.allocation.weights;
    let aapl = w.get("AAPL").unwrap_or(0.0);
    let msft = w.get("MSFT").unwrap_or(0.0);
    assert!(msft > aapl, "MSFT {msft} vs AAPL {aapl}");
  }

  #[test]
  fn sparse_ticker_fails_with_insufficient_data() {
    let source = market().with_series(ticker("IPO"), vec![(start() + Days::new(503), 42.0)]);
    let p = Pipeline::new(source, PipelineConfig::default());

    let err = p.run("AAPL,IPO", &range()).unwrap_err();
    assert!(matches!(
      err,
      PipelineError::InsufficientData { ref subject, observations: 1, .. } if subject == "IPO"
    ));
  }

  struct CountingSource {
    inner: MemoryPriceSource,
    calls: Cell<usize>,
  }

  impl PriceSource for CountingSource {
    fn fetch_series(&self, ticker: &Ticker, range: &DateRange) -> Result<Vec<(NaiveDate, f64)>> {
      self.calls.set(self.calls.get() + 1);
      self.inner.fetch_series(ticker, range)
    }
  }

  #[test]
  fn malformed_tickers_are_rejected_before_fetching() {
    let source = CountingSource {
      inner: market(),
      calls: Cell::new(0),
    };
    let p = Pipeline::new(source, PipelineConfig::default());

    for input in ["", "   ", "AAPL,,MSFT"] {
      let err = p.run(input, &range()).unwrap_err();
      assert!(matches!(err, PipelineError::InvalidInput(_)), "{input:?}");
    }
    assert_eq!(p.source().calls.get(), 0);
  }

  #[test]
  fn unknown_ticker_fails_with_data_unavailable() {
    let err = pipeline().run("AAPL,NOPE", &range()).unwrap_err();
    assert!(matches!(err, PipelineError::DataUnavailable { .. }));
  }

  #[test]
  fn min_volatility_objective_is_configurable() {
    let mut config = PipelineConfig::default();
    config.optimizer.objective = Objective::MinVolatility;
    let p = Pipeline::new(market(), config);

    let out = p.run("AAPL,MSFT,GOOG,TSLA", &range()).unwrap();
    let w = &out.allocation.weights;

    assert_relative_eq!(w.total(), 1.0, epsilon = 1e-6);
    // The 60% volatility asset should carry the smallest allocation.
    let tsla = w.get("TSLA").unwrap_or(0.0);
    assert!(w.iter().all(|(_, x)| x >= tsla));
  }

  #[test]
  fn stages_can_run_separately() {
    let p = pipeline();
    let tickers = parse_tickers("AAPL,MSFT").unwrap();

    let prices = p.fetch(&tickers, &range()).unwrap();
    assert_eq!(prices.tail(5).n_rows(), 5);

    let estimates = p.estimate(&prices).unwrap();
    assert_eq!(estimates.n_periods, 503);

    let allocation = p.optimize(&estimates).unwrap();
    assert!(allocation.performance.volatility > 0.0);
  }

  #[test]
  #[traced_test]
  fn logs_dropped_dates() {
    let mut quotes = gbm(9, 30, 0.1, 0.2);
    quotes.remove(10);
    let source = MemoryPriceSource::new()
      .with_series(ticker("AAA"), gbm(8, 30, 0.15, 0.2))
      .with_series(ticker("BBB"), quotes);
    let p = Pipeline::new(source, PipelineConfig::default());

    let prices = p.fetch(&parse_tickers("AAA,BBB").unwrap(), &range()).unwrap();
    assert_eq!(prices.n_rows(), 30);

    let estimates = p.estimate(&prices).unwrap();
    assert_eq!(estimates.n_periods, 28);
    assert!(logs_contain("dropped dates with missing prices"));
  }
}
