//! # Errors
//!
//! $$
//! \text{fetch} \to \text{estimate} \to \text{optimize}, \quad \text{first failure aborts the run}
//! $$
//!
//! Error taxonomy shared by every pipeline stage.

use thiserror::Error;

/// Error type for pipeline operations.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// Malformed user input (tickers, date range, table shape).
  #[error("invalid input: {0}")]
  InvalidInput(String),

  /// The price source has no data for a ticker/range combination.
  #[error("no price data available for {ticker}: {reason}")]
  DataUnavailable { ticker: String, reason: String },

  /// Too few observations to estimate returns or covariance.
  #[error("insufficient data for {subject}: {observations} observation(s), need at least {required}")]
  InsufficientData {
    subject: String,
    observations: usize,
    required: usize,
  },

  /// The optimization problem has no solution or the solver failed.
  #[error("optimization infeasible: {0}")]
  Infeasible(String),

  /// Inputs do not describe a portfolio (no assets, mismatched dimensions).
  #[error("degenerate optimizer input: {0}")]
  DegenerateInput(String),

  /// Configuration could not be loaded.
  #[error("configuration error: {0}")]
  Config(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
