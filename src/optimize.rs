//! # Portfolio Optimization
//!
//! $$
//! \max_{\mathbf w \ge 0,\ \mathbf 1^\top \mathbf w = 1}
//! \frac{\mathbf w^\top \mu - r_f}{\sqrt{\mathbf w^\top \Sigma \mathbf w}}
//! $$
//!
//! Maximum Sharpe and minimum volatility portfolios with weight cleaning.

pub mod active_set;
pub mod frontier;
pub mod nelder_mead;
pub mod types;

pub use frontier::EfficientFrontier;
pub use types::Objective;
pub use types::PortfolioPerformance;
pub use types::SolverKind;
pub use types::WeightMapping;
