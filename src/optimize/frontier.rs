//! # Efficient Frontier
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}, \qquad
//! \mathbf 1^\top \mathbf w = 1,\ \mathbf w \ge 0
//! $$
//!
//! Long-only, fully-invested portfolios on the mean-variance frontier: the
//! tangency (maximum Sharpe) portfolio and the minimum-variance portfolio,
//! followed by weight cleaning.

use nalgebra::DMatrix;
use nalgebra::DVector;
use ndarray::Array1;
use ndarray::Array2;
use tracing::info;

use super::active_set;
use super::nelder_mead;
use super::types::Objective;
use super::types::PortfolioPerformance;
use super::types::SolverKind;
use super::types::WeightMapping;
use crate::config::OptimizerConfig;
use crate::data::Ticker;
use crate::error::PipelineError;
use crate::error::Result;
use crate::estimate::Estimates;

/// Optimizer over one set of expected returns and covariances.
///
/// Solving stores the raw weights; [`EfficientFrontier::clean_weights`] and
/// [`EfficientFrontier::portfolio_performance`] read them back.
#[derive(Clone, Debug)]
pub struct EfficientFrontier {
  tickers: Vec<Ticker>,
  mu: DVector<f64>,
  sigma: DMatrix<f64>,
  weights: Option<Vec<f64>>,
}

impl EfficientFrontier {
  /// Validate dimensions and build the optimizer.
  pub fn new(
    tickers: Vec<Ticker>,
    expected_returns: &Array1<f64>,
    covariance: &Array2<f64>,
  ) -> Result<Self> {
    let n = tickers.len();
    if n == 0 {
      return Err(PipelineError::DegenerateInput("no assets to optimize".to_string()));
    }
    if expected_returns.len() != n || covariance.dim() != (n, n) {
      return Err(PipelineError::DegenerateInput(format!(
        "{n} tickers but {} expected returns and a {:?} covariance matrix",
        expected_returns.len(),
        covariance.dim()
      )));
    }
    if expected_returns.iter().chain(covariance.iter()).any(|v| !v.is_finite()) {
      return Err(PipelineError::DegenerateInput(
        "expected returns and covariance must be finite".to_string(),
      ));
    }

    Ok(Self {
      tickers,
      mu: DVector::from_iterator(n, expected_returns.iter().copied()),
      sigma: DMatrix::from_fn(n, n, |i, j| covariance[[i, j]]),
      weights: None,
    })
  }

  pub fn from_estimates(estimates: &Estimates) -> Result<Self> {
    Self::new(
      estimates.tickers.clone(),
      &estimates.expected_returns,
      &estimates.covariance,
    )
  }

  pub fn n_assets(&self) -> usize {
    self.tickers.len()
  }

  pub fn tickers(&self) -> &[Ticker] {
    &self.tickers
  }

  /// Raw weights from the last solve, in ticker order.
  pub fn raw_weights(&self) -> Option<&[f64]> {
    self.weights.as_deref()
  }

  /// Solve the objective and solver named in `config`.
  pub fn optimize(&mut self, config: &OptimizerConfig) -> Result<WeightMapping> {
    match config.objective {
      Objective::MaxSharpe => self.max_sharpe(config.risk_free_rate, config.solver, config.max_iters),
      Objective::MinVolatility => self.min_volatility(config.solver, config.max_iters),
    }
  }

  /// Tangency portfolio maximizing `(w'mu - r_f) / sqrt(w' Sigma w)`.
  ///
  /// Requires at least one asset with expected return above `risk_free`.
  pub fn max_sharpe(
    &mut self,
    risk_free: f64,
    solver: SolverKind,
    max_iters: u64,
  ) -> Result<WeightMapping> {
    if self.n_assets() == 1 {
      return Ok(self.store(vec![1.0]));
    }
    if !self.mu.iter().any(|&m| m > risk_free) {
      return Err(PipelineError::Infeasible(format!(
        "no asset has an expected return above the risk-free rate {risk_free}"
      )));
    }

    let weights = match solver {
      SolverKind::ActiveSet => {
        let excess = self.mu.map(|m| m - risk_free);
        let y = active_set::solve(&self.sigma, &excess, max_iters)?;
        normalize(y.iter().copied().collect())?
      }
      SolverKind::NelderMead => {
        active_set::ensure_positive_definite(&self.sigma)?;
        nelder_mead::solve(Objective::MaxSharpe, &self.mu, &self.sigma, risk_free, max_iters)?
      }
    };

    let mapping = self.store(weights);
    let perf = self.portfolio_performance(risk_free)?;
    info!(
      expected_return = perf.expected_return,
      volatility = perf.volatility,
      sharpe = perf.sharpe,
      "solved maximum Sharpe portfolio"
    );
    Ok(mapping)
  }

  /// Global minimum-variance portfolio.
  pub fn min_volatility(&mut self, solver: SolverKind, max_iters: u64) -> Result<WeightMapping> {
    if self.n_assets() == 1 {
      return Ok(self.store(vec![1.0]));
    }

    let weights = match solver {
      SolverKind::ActiveSet => {
        let ones = DVector::from_element(self.n_assets(), 1.0);
        let y = active_set::solve(&self.sigma, &ones, max_iters)?;
        normalize(y.iter().copied().collect())?
      }
      SolverKind::NelderMead => {
        active_set::ensure_positive_definite(&self.sigma)?;
        nelder_mead::solve(Objective::MinVolatility, &self.mu, &self.sigma, 0.0, max_iters)?
      }
    };

    let mapping = self.store(weights);
    info!(
      volatility = self.performance_of(self.raw_weights().unwrap_or_default(), 0.0).volatility,
      "solved minimum volatility portfolio"
    );
    Ok(mapping)
  }

  /// Drop weights below `cutoff` and renormalize the rest to sum to one.
  ///
  /// The result holds only tickers with a positive allocation.
  pub fn clean_weights(&self, cutoff: f64) -> Result<WeightMapping> {
    let raw = self.solved()?;
    let kept: Vec<(Ticker, f64)> = self
      .tickers
      .iter()
      .zip(raw)
      .filter(|(_, w)| w.abs() >= cutoff && **w > 0.0)
      .map(|(t, w)| (t.clone(), *w))
      .collect();

    let total: f64 = kept.iter().map(|(_, w)| w).sum();
    if kept.is_empty() || total <= 0.0 {
      return Err(PipelineError::Infeasible(format!(
        "every weight fell below the cleaning cutoff {cutoff}"
      )));
    }

    Ok(WeightMapping::new(
      kept.into_iter().map(|(t, w)| (t, w / total)).collect(),
    ))
  }

  /// Expected return, volatility and Sharpe ratio of the last solution.
  pub fn portfolio_performance(&self, risk_free: f64) -> Result<PortfolioPerformance> {
    Ok(self.performance_of(self.solved()?, risk_free))
  }

  /// Statistics of an arbitrary weight vector in ticker order.
  pub fn performance_of(&self, weights: &[f64], risk_free: f64) -> PortfolioPerformance {
    if weights.len() != self.n_assets() {
      return PortfolioPerformance::default();
    }

    let w = DVector::from_column_slice(weights);
    let expected_return = w.dot(&self.mu);
    let volatility = w.dot(&(&self.sigma * &w)).max(0.0).sqrt();
    let sharpe = if volatility > 1e-15 {
      (expected_return - risk_free) / volatility
    } else {
      0.0
    };

    PortfolioPerformance {
      expected_return,
      volatility,
      sharpe,
    }
  }

  fn solved(&self) -> Result<&[f64]> {
    self
      .weights
      .as_deref()
      .ok_or_else(|| PipelineError::InvalidInput("portfolio has not been optimized yet".to_string()))
  }

  fn store(&mut self, weights: Vec<f64>) -> WeightMapping {
    let mapping = WeightMapping::new(
      self
        .tickers
        .iter()
        .cloned()
        .zip(weights.iter().copied())
        .collect(),
    );
    self.weights = Some(weights);
    mapping
  }
}

fn normalize(mut weights: Vec<f64>) -> Result<Vec<f64>> {
  for w in &mut weights {
    *w = w.max(0.0);
  }
  let total: f64 = weights.iter().sum();
  if !(total > 0.0) || !total.is_finite() {
    return Err(PipelineError::Infeasible(
      "solver returned an empty allocation".to_string(),
    ));
  }
  Ok(weights.into_iter().map(|w| w / total).collect())
}
