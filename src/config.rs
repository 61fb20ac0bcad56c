//! # Configuration
//!
//! $$
//! \theta = (f, r_f, \varepsilon_{\text{cut}}, \ldots)
//! $$
//!
//! Every numeric convention the pipeline depends on (annualization, risk-free
//! rate, cleaning cutoff, rounding) lives here instead of being an implicit
//! default buried in the estimator or optimizer.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::PipelineError;
use crate::error::Result;
use crate::optimize::Objective;
use crate::optimize::SolverKind;

/// Trading days per year used to annualize daily statistics.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Largest number of decimals a weight can be displayed with. Beyond this an
/// `f64` carries no further digits and `10^d` overflows.
pub const MAX_ROUNDING_DECIMALS: u32 = 15;

/// Return/risk estimation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
  /// Number of return periods in one year.
  pub periods_per_year: u32,
  /// Geometric (compounded) mean when `true`, arithmetic mean otherwise.
  pub compounding: bool,
  /// Use log returns instead of simple percentage changes.
  pub log_returns: bool,
}

impl Default for EstimatorConfig {
  fn default() -> Self {
    Self {
      periods_per_year: TRADING_DAYS_PER_YEAR,
      compounding: true,
      log_returns: false,
    }
  }
}

/// Optimizer settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
  /// Objective to solve for.
  pub objective: Objective,
  /// Numerical method.
  pub solver: SolverKind,
  /// Annualized risk-free rate used in the Sharpe ratio.
  pub risk_free_rate: f64,
  /// Weights with absolute value below this are dropped during cleaning.
  pub cutoff: f64,
  /// Iteration cap for the selected solver.
  pub max_iters: u64,
}

impl Default for OptimizerConfig {
  fn default() -> Self {
    Self {
      objective: Objective::MaxSharpe,
      solver: SolverKind::ActiveSet,
      risk_free_rate: 0.02,
      cutoff: 1e-4,
      max_iters: 5000,
    }
  }
}

/// Output formatting settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenterConfig {
  /// Number of trailing price rows shown in the preview.
  pub tail_rows: usize,
  /// Decimal places used when displaying weights.
  pub rounding: u32,
}

impl Default for PresenterConfig {
  fn default() -> Self {
    Self {
      tail_rows: 5,
      rounding: 5,
    }
  }
}

/// Full pipeline configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
  pub estimator: EstimatorConfig,
  pub optimizer: OptimizerConfig,
  pub presenter: PresenterConfig,
}

impl PipelineConfig {
  /// Parse a JSON document. Missing fields fall back to defaults.
  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: Self =
      serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
  }

  /// Load configuration from a JSON file.
  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
      .map_err(|e| PipelineError::Config(format!("failed reading {}: {e}", path.display())))?;
    Self::from_json_str(&raw)
  }

  /// Reject values that would make the pipeline meaningless.
  pub fn validate(&self) -> Result<()> {
    if self.estimator.periods_per_year == 0 {
      return Err(PipelineError::Config(
        "periods_per_year must be positive".to_string(),
      ));
    }
    if !self.optimizer.risk_free_rate.is_finite() {
      return Err(PipelineError::Config(
        "risk_free_rate must be finite".to_string(),
      ));
    }
    if !(0.0..1.0).contains(&self.optimizer.cutoff) {
      return Err(PipelineError::Config(format!(
        "cutoff must be in [0, 1), got {}",
        self.optimizer.cutoff
      )));
    }
    if self.optimizer.max_iters == 0 {
      return Err(PipelineError::Config("max_iters must be positive".to_string()));
    }
    if self.presenter.rounding > MAX_ROUNDING_DECIMALS {
      return Err(PipelineError::Config(format!(
        "rounding must be at most {MAX_ROUNDING_DECIMALS} decimals, got {}",
        self.presenter.rounding
      )));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_conventions() {
    let config = PipelineConfig::default();

    assert_eq!(config.estimator.periods_per_year, 252);
    assert!(config.estimator.compounding);
    assert_eq!(config.optimizer.risk_free_rate, 0.02);
    assert_eq!(config.optimizer.cutoff, 1e-4);
    assert_eq!(config.presenter.tail_rows, 5);
    assert_eq!(config.presenter.rounding, 5);
  }

  #[test]
  fn partial_json_keeps_remaining_defaults() {
    let config = PipelineConfig::from_json_str(
      r#"{ "optimizer": { "risk_free_rate": 0.0, "objective": "min-volatility" } }"#,
    )
    .unwrap();

    assert_eq!(config.optimizer.risk_free_rate, 0.0);
    assert_eq!(config.optimizer.objective, Objective::MinVolatility);
    assert_eq!(config.optimizer.cutoff, 1e-4);
    assert_eq!(config.estimator, EstimatorConfig::default());
  }

  #[test]
  fn rejects_invalid_cutoff() {
    let err = PipelineConfig::from_json_str(r#"{ "optimizer": { "cutoff": 1.5 } }"#).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
  }

  #[test]
  fn rejects_rounding_beyond_f64_precision() {
    let err = PipelineConfig::from_json_str(r#"{"presenter": {"rounding": 400}}"#).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));

    let config = PipelineConfig::from_json_str(r#"{"presenter": {"rounding": 15}}"#).unwrap();
    assert_eq!(config.presenter.rounding, MAX_ROUNDING_DECIMALS);
  }

  #[test]
  fn reads_config_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frontier.json");
    fs::write(&path, r#"{ "presenter": { "tail_rows": 10 } }"#).unwrap();

    let config = PipelineConfig::from_json_file(&path).unwrap();
    assert_eq!(config.presenter.tail_rows, 10);
  }

  #[test]
  fn missing_file_is_a_config_error() {
    let err = PipelineConfig::from_json_file("/nonexistent/frontier.json").unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
  }
}
