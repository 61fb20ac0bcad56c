//! # Active-Set Quadratic Programming
//!
//! $$
//! \min_{\mathbf y}\ \tfrac12\,\mathbf y^\top \Sigma \mathbf y
//! \quad \text{s.t.} \quad \mathbf a^\top \mathbf y = 1,\ \mathbf y \ge 0
//! $$
//!
//! Primal active-set method for a positive definite `Sigma`. With
//! `a = mu - r_f` this is the homogenized maximum-Sharpe problem, with
//! `a = 1` it is the minimum-variance problem.

use nalgebra::DMatrix;
use nalgebra::DVector;

use crate::error::PipelineError;
use crate::error::Result;

fn singular() -> PipelineError {
  PipelineError::Infeasible("covariance matrix is singular or not positive definite".to_string())
}

/// Reject covariance matrices that are singular up to a relative pivot tolerance.
pub(crate) fn ensure_positive_definite(sigma: &DMatrix<f64>) -> Result<()> {
  let chol = sigma.clone().cholesky().ok_or_else(singular)?;
  let max_diag = sigma.diagonal().amax();
  if chol.l().diagonal().iter().any(|&d| d * d <= 1e-12 * max_diag) {
    return Err(singular());
  }
  Ok(())
}

/// Solve the equality-constrained problem restricted to the free indices.
///
/// Returns the minimizer on the face and the multiplier `nu` of `a'y = 1`.
fn solve_face(sigma: &DMatrix<f64>, a: &DVector<f64>, free: &[usize]) -> Result<(Vec<f64>, f64)> {
  let m = free.len();
  let sub = DMatrix::from_fn(m, m, |r, c| sigma[(free[r], free[c])]);
  let a_f = DVector::from_iterator(m, free.iter().map(|&i| a[i]));

  let chol = sub.cholesky().ok_or_else(singular)?;
  let z = chol.solve(&a_f);
  let denom = a_f.dot(&z);
  if !denom.is_finite() || denom <= 0.0 {
    return Err(singular());
  }

  let nu = 1.0 / denom;
  Ok((z.iter().map(|v| v * nu).collect(), nu))
}

/// Minimize `y' Sigma y` subject to `a'y = 1`, `y >= 0`.
///
/// Fails with [`PipelineError::Infeasible`] when no coefficient of `a` is
/// positive, when `Sigma` is not positive definite, or when the iteration cap
/// is reached.
pub fn solve(sigma: &DMatrix<f64>, a: &DVector<f64>, max_iters: u64) -> Result<DVector<f64>> {
  let n = a.len();
  if sigma.nrows() != n || sigma.ncols() != n {
    return Err(PipelineError::DegenerateInput(format!(
      "covariance is {}x{}, expected {n}x{n}",
      sigma.nrows(),
      sigma.ncols()
    )));
  }

  ensure_positive_definite(sigma)?;

  let (start, a_max) = a
    .iter()
    .copied()
    .enumerate()
    .fold((0, f64::NEG_INFINITY), |best, (i, v)| if v > best.1 { (i, v) } else { best });
  if !(a_max > 0.0) {
    return Err(PipelineError::Infeasible(
      "linear constraint has no positive coefficient".to_string(),
    ));
  }

  let scale = sigma.amax().max(f64::MIN_POSITIVE);
  let step_tol = 1e-12;
  let mult_tol = 1e-12 * scale;

  // Feasible vertex: the asset with the largest coefficient, all others at zero.
  let mut y = DVector::zeros(n);
  y[start] = 1.0 / a_max;
  let mut is_free = vec![false; n];
  is_free[start] = true;

  for _ in 0..max_iters {
    let free: Vec<usize> = (0..n).filter(|&i| is_free[i]).collect();
    let (target, nu) = solve_face(sigma, a, &free)?;
    let direction: Vec<f64> = free
      .iter()
      .zip(&target)
      .map(|(&i, &t)| t - y[i])
      .collect();
    let y_scale = y.amax().max(1.0);

    if direction.iter().all(|d| d.abs() <= step_tol * y_scale) {
      for (&i, &t) in free.iter().zip(&target) {
        y[i] = t;
      }

      // Bound multipliers: lambda = Sigma y - nu a, must be >= 0 on fixed indices.
      let grad = sigma * &y;
      let entering = (0..n)
        .filter(|&i| !is_free[i])
        .map(|i| (i, grad[i] - nu * a[i]))
        .filter(|&(_, lambda)| lambda < -mult_tol)
        .min_by(|l, r| l.1.total_cmp(&r.1));

      match entering {
        Some((i, _)) => is_free[i] = true,
        None => return Ok(y),
      }
      continue;
    }

    let mut alpha = 1.0;
    let mut blocking = None;
    for (&i, &d) in free.iter().zip(&direction) {
      if d < 0.0 {
        let ratio = -y[i] / d;
        if ratio < alpha {
          alpha = ratio;
          blocking = Some(i);
        }
      }
    }

    for (&i, &d) in free.iter().zip(&direction) {
      y[i] += alpha * d;
    }
    if let Some(i) = blocking {
      y[i] = 0.0;
      is_free[i] = false;
    }
  }

  Err(PipelineError::Infeasible(format!(
    "active-set solver did not converge within {max_iters} iterations"
  )))
}
