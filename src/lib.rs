//! # frontier-rs
//!
//! $$
//! \max_{\mathbf w \ge 0,\ \mathbf 1^\top \mathbf w = 1}
//! \frac{\mathbf w^\top \hat\mu - r_f}{\sqrt{\mathbf w^\top \hat\Sigma \mathbf w}}
//! $$
//!
//! Long-only mean-variance allocation from historical adjusted closes:
//! fetch prices, estimate annualized expected returns and covariance, solve
//! for the tangency (or minimum-volatility) portfolio, clean and report.

pub mod config;
pub mod data;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod optimize;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use error::PipelineError;
pub use error::Result;
pub use pipeline::Pipeline;
pub use pipeline::PipelineOutput;
