//! # Nelder-Mead Portfolio Search
//!
//! $$
//! \mathbf w = \operatorname{softmax}(\mathbf x), \qquad
//! \min_{\mathbf x}\ -\frac{\mathbf w^\top\mu - r_f}{\sqrt{\mathbf w^\top \Sigma \mathbf w}}
//! $$
//!
//! Derivative-free alternative to the active-set solver. The softmax map keeps
//! every iterate on the long-only simplex, so no explicit constraints are needed;
//! weights are never exactly zero and rely on cleaning to drop tiny allocations.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::State;
use argmin::core::TerminationReason;
use argmin::solver::neldermead::NelderMead;
use nalgebra::DMatrix;
use nalgebra::DVector;

use super::types::Objective;
use crate::error::PipelineError;
use crate::error::Result;

/// Map unconstrained coordinates onto the simplex, shifted by the max for stability.
fn simplex_weights(x: &[f64]) -> DVector<f64> {
  let x = DVector::from_column_slice(x);
  if x.is_empty() {
    return x;
  }
  let exps = x.add_scalar(-x.max()).map(f64::exp);
  let sum = exps.sum();
  exps / sum
}

fn variance(sigma: &DMatrix<f64>, w: &DVector<f64>) -> f64 {
  w.dot(&(sigma * w))
}

struct SharpeCost<'a> {
  mu: &'a DVector<f64>,
  sigma: &'a DMatrix<f64>,
  risk_free: f64,
}

impl CostFunction for SharpeCost<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = simplex_weights(x);
    let var = variance(self.sigma, &w);
    if var <= 1e-30 {
      return Ok(f64::MAX);
    }
    Ok(-(w.dot(self.mu) - self.risk_free) / var.sqrt())
  }
}

struct VarianceCost<'a> {
  sigma: &'a DMatrix<f64>,
}

impl CostFunction for VarianceCost<'_> {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    Ok(variance(self.sigma, &simplex_weights(x)))
  }
}

fn run<C>(cost: C, n: usize, max_iters: u64) -> Result<Vec<f64>>
where
  C: CostFunction<Param = Vec<f64>, Output = f64>,
{
  // Origin plus one unit step per axis.
  let simplex: Vec<Vec<f64>> = std::iter::once(vec![0.0; n])
    .chain((0..n).map(|i| {
      let mut vertex = vec![0.0; n];
      vertex[i] = 1.0;
      vertex
    }))
    .collect();

  let solver = NelderMead::new(simplex)
    .with_sd_tolerance(1e-10)
    .map_err(|e| PipelineError::Infeasible(format!("nelder-mead setup failed: {e}")))?;
  let res = Executor::new(cost, solver)
    .configure(|state| state.max_iters(max_iters))
    .run()
    .map_err(|e| PipelineError::Infeasible(format!("nelder-mead failed: {e}")))?;

  if let Some(TerminationReason::MaxItersReached) = res.state.get_termination_reason() {
    return Err(PipelineError::Infeasible(format!(
      "nelder-mead did not converge within {max_iters} iterations"
    )));
  }

  let best = res
    .state
    .best_param
    .ok_or_else(|| PipelineError::Infeasible("nelder-mead produced no solution".to_string()))?;
  Ok(simplex_weights(&best).iter().copied().collect())
}

/// Search long-only, fully-invested weights for `objective`.
pub fn solve(
  objective: Objective,
  mu: &DVector<f64>,
  sigma: &DMatrix<f64>,
  risk_free: f64,
  max_iters: u64,
) -> Result<Vec<f64>> {
  let n = mu.len();
  match objective {
    Objective::MaxSharpe => run(
      SharpeCost {
        mu,
        sigma,
        risk_free,
      },
      n,
      max_iters,
    ),
    Objective::MinVolatility => run(VarianceCost { sigma }, n, max_iters),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn simplex_weights_lie_on_simplex() {
    let w = simplex_weights(&[0.3, -2.0, 5.0, 800.0]);
    assert!((w.sum() - 1.0).abs() < 1e-12);
    assert!(w.iter().all(|&v| (0.0..=1.0).contains(&v)));
    assert!(simplex_weights(&[]).is_empty());
  }

  #[test]
  fn min_volatility_prefers_low_variance_asset() {
    let sigma = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]);
    let mu = DVector::from_element(2, 0.1);
    let w = solve(Objective::MinVolatility, &mu, &sigma, 0.0, 10_000).unwrap();

    // Exact answer is (0.2, 0.8).
    assert!((w[0] - 0.2).abs() < 1e-3);
    assert!((w[1] - 0.8).abs() < 1e-3);
  }

  #[test]
  fn iteration_cap_is_infeasible() {
    let sigma = DMatrix::from_row_slice(2, 2, &[0.04, 0.0, 0.0, 0.01]);
    let mu = DVector::from_column_slice(&[0.08, 0.12]);

    let err = solve(Objective::MaxSharpe, &mu, &sigma, 0.02, 1).unwrap_err();
    assert!(matches!(err, PipelineError::Infeasible(ref msg) if msg.contains("within 1 iterations")));
  }
}
