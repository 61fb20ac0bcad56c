//! # Optimizer Types
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}} \frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Shared enums and result containers for portfolio optimization.

use std::fmt::Display;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::Deserialize;
use serde::Serialize;
use serde::Serializer;

use crate::config::MAX_ROUNDING_DECIMALS;
use crate::data::Ticker;
use crate::error::PipelineError;

/// What the optimizer solves for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Objective {
  /// Tangency portfolio: maximum `(E[R_p] - r_f) / sigma_p`.
  #[default]
  MaxSharpe,
  /// Global minimum-variance portfolio.
  MinVolatility,
}

impl FromStr for Objective {
  type Err = PipelineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "max-sharpe" | "maxsharpe" | "sharpe" => Ok(Self::MaxSharpe),
      "min-volatility" | "min-vol" | "minvol" => Ok(Self::MinVolatility),
      other => Err(PipelineError::InvalidInput(format!(
        "unknown objective {other:?}"
      ))),
    }
  }
}

impl Display for Objective {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Objective::MaxSharpe => write!(f, "max-sharpe"),
      Objective::MinVolatility => write!(f, "min-volatility"),
    }
  }
}

/// Numerical method used to solve the objective.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
  /// Exact primal active-set method on the convex quadratic program.
  #[default]
  ActiveSet,
  /// Derivative-free Nelder-Mead over softmax-parameterized weights.
  NelderMead,
}

impl FromStr for SolverKind {
  type Err = PipelineError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "active-set" | "activeset" | "qp" => Ok(Self::ActiveSet),
      "nelder-mead" | "neldermead" | "nm" => Ok(Self::NelderMead),
      other => Err(PipelineError::InvalidInput(format!(
        "unknown solver {other:?}"
      ))),
    }
  }
}

/// Model statistics of a weight vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PortfolioPerformance {
  /// Expected portfolio return (annualized if inputs are annualized).
  pub expected_return: f64,
  /// Portfolio volatility.
  pub volatility: f64,
  /// Sharpe ratio computed as `(expected_return - risk_free) / volatility`.
  pub sharpe: f64,
}

/// Ordered ticker -> weight allocation.
///
/// Serializes as a JSON object that keeps insertion order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WeightMapping {
  entries: Vec<(Ticker, f64)>,
}

impl WeightMapping {
  pub fn new(entries: Vec<(Ticker, f64)>) -> Self {
    Self { entries }
  }

  pub fn iter(&self) -> impl Iterator<Item = (&Ticker, f64)> + '_ {
    self.entries.iter().map(|(t, w)| (t, *w))
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Weight of `ticker`, if allocated.
  pub fn get(&self, ticker: &str) -> Option<f64> {
    self
      .entries
      .iter()
      .find(|(t, _)| t.as_str() == ticker)
      .map(|(_, w)| *w)
  }

  /// Sum of all weights.
  pub fn total(&self) -> f64 {
    self.entries.iter().map(|(_, w)| w).sum()
  }

  /// Entries ordered by weight, largest first. Ties keep their original order.
  pub fn sorted_descending(&self) -> Vec<(Ticker, f64)> {
    let mut sorted = self.entries.clone();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1));
    sorted
  }

  /// Copy with every weight rounded to `decimals` places, for display.
  ///
  /// `decimals` is capped at [`MAX_ROUNDING_DECIMALS`].
  pub fn rounded(&self, decimals: u32) -> WeightMapping {
    let scale = 10f64.powi(decimals.min(MAX_ROUNDING_DECIMALS) as i32);
    Self {
      entries: self
        .entries
        .iter()
        .map(|(t, w)| (t.clone(), (w * scale).round() / scale))
        .collect(),
    }
  }
}

impl Serialize for WeightMapping {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.entries.len()))?;
    for (ticker, weight) in &self.entries {
      map.serialize_entry(ticker.as_str(), weight)?;
    }
    map.end()
  }
}
