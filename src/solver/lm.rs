//! Two-parameter Levenberg-Marquardt solver for square-residual systems.
//!
//! The latitude solve drives a small residual vector (one entry per star) to
//! zero over two unknowns. Normal equations are 2×2, solved with nalgebra.

use nalgebra::{Matrix2, Vector2};

/// Configuration for Levenberg-Marquardt iterations.
#[derive(Debug, Clone)]
pub struct LmConfig {
    /// Maximum iterations per start.
    pub max_iterations: usize,
    /// Converged when every parameter step is smaller than this.
    pub step_tolerance: f64,
    /// Converged when an accepted step lowers the cost by less than this fraction.
    pub relative_cost_tolerance: f64,
    /// Converged when the gradient norm falls below this.
    pub gradient_tolerance: f64,
    /// Converged when the cost falls below this.
    pub cost_tolerance: f64,
    /// Initial damping.
    pub initial_lambda: f64,
    /// Damping multiplier after a rejected step.
    pub lambda_up: f64,
    /// Damping multiplier after an accepted step.
    pub lambda_down: f64,
    /// Lower bound for damping.
    pub min_lambda: f64,
    /// Give up once damping exceeds this.
    pub max_lambda: f64,
    /// When giving up, still report convergence if the gradient is this small.
    pub stall_gradient_tolerance: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            step_tolerance: 1e-12,
            relative_cost_tolerance: 1e-15,
            gradient_tolerance: 1e-15,
            cost_tolerance: 1e-28,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            stall_gradient_tolerance: 1e-8,
        }
    }
}

/// A residual vector and its Jacobian over two parameters.
pub trait ResidualModel {
    /// Fill `residuals` and `jacobian` (one row per residual) at `params`.
    fn evaluate(&self, params: &Vector2<f64>, residuals: &mut Vec<f64>, jacobian: &mut Vec<[f64; 2]>);
}

/// Outcome of one Levenberg-Marquardt run.
#[derive(Debug, Clone)]
pub struct LmResult {
    pub params: Vector2<f64>,
    /// Residuals at `params`.
    pub residuals: Vec<f64>,
    /// Sum of squared residuals.
    pub cost: f64,
    pub converged: bool,
    pub iterations: usize,
}

impl LmResult {
    /// Largest absolute residual.
    pub fn max_abs_residual(&self) -> f64 {
        self.residuals.iter().fold(0.0_f64, |m, r| m.max(r.abs()))
    }
}

fn sum_sq(r: &[f64]) -> f64 {
    r.iter().map(|v| v * v).sum()
}

/// Minimise the squared residuals of `model` starting at `initial`.
pub fn optimize<M: ResidualModel + ?Sized>(
    model: &M,
    initial: Vector2<f64>,
    config: &LmConfig,
) -> LmResult {
    let mut params = initial;
    let mut residuals = Vec::new();
    let mut jacobian = Vec::new();
    model.evaluate(&params, &mut residuals, &mut jacobian);
    let mut cost = sum_sq(&residuals);
    let mut lambda = config.initial_lambda;

    let mut trial_residuals = Vec::with_capacity(residuals.len());
    let mut trial_jacobian = Vec::with_capacity(jacobian.len());

    let finish = |params, residuals, cost, converged, iterations| LmResult {
        params,
        residuals,
        cost,
        converged,
        iterations,
    };

    for iter in 0..config.max_iterations {
        let mut hessian = Matrix2::<f64>::zeros();
        let mut gradient = Vector2::<f64>::zeros();
        for (row, r) in jacobian.iter().zip(residuals.iter()) {
            let j = Vector2::new(row[0], row[1]);
            hessian += j * j.transpose();
            gradient += j * *r;
        }

        let gradient_norm = gradient.norm();
        if gradient_norm < config.gradient_tolerance || cost < config.cost_tolerance {
            return finish(params, residuals, cost, true, iter);
        }

        let mut damped = hessian;
        damped[(0, 0)] *= 1.0 + lambda;
        damped[(1, 1)] *= 1.0 + lambda;

        let Some(inverse) = damped.try_inverse() else {
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                return finish(params, residuals, cost, false, iter);
            }
            continue;
        };
        let delta = -(inverse * gradient);
        let candidate = params + delta;

        model.evaluate(&candidate, &mut trial_residuals, &mut trial_jacobian);
        let candidate_cost = sum_sq(&trial_residuals);

        if candidate_cost < cost {
            let small_step = delta.iter().all(|d| d.abs() < config.step_tolerance);
            let stalled = cost - candidate_cost <= config.relative_cost_tolerance * cost;

            params = candidate;
            std::mem::swap(&mut residuals, &mut trial_residuals);
            std::mem::swap(&mut jacobian, &mut trial_jacobian);
            cost = candidate_cost;
            lambda = (lambda * config.lambda_down).max(config.min_lambda);

            if small_step || stalled {
                return finish(params, residuals, cost, true, iter + 1);
            }
        } else {
            lambda *= config.lambda_up;
            if lambda > config.max_lambda {
                let converged = gradient_norm < config.stall_gradient_tolerance;
                return finish(params, residuals, cost, converged, iter + 1);
            }
        }
    }

    finish(params, residuals, cost, false, config.max_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Residuals of the circle x² + y² = 1 and the line y = x.
    struct CircleLine;

    impl ResidualModel for CircleLine {
        fn evaluate(&self, p: &Vector2<f64>, r: &mut Vec<f64>, j: &mut Vec<[f64; 2]>) {
            r.clear();
            j.clear();
            r.push(p[0] * p[0] + p[1] * p[1] - 1.0);
            j.push([2.0 * p[0], 2.0 * p[1]]);
            r.push(p[1] - p[0]);
            j.push([-1.0, 1.0]);
        }
    }

    /// System with no root: x² + y² + 1 = 0 and x = y.
    struct NoRoot;

    impl ResidualModel for NoRoot {
        fn evaluate(&self, p: &Vector2<f64>, r: &mut Vec<f64>, j: &mut Vec<[f64; 2]>) {
            r.clear();
            j.clear();
            r.push(p[0] * p[0] + p[1] * p[1] + 1.0);
            j.push([2.0 * p[0], 2.0 * p[1]]);
            r.push(p[0] - p[1]);
            j.push([1.0, -1.0]);
        }
    }

    #[test]
    fn test_finds_intersection() {
        let res = optimize(&CircleLine, Vector2::new(2.0, 0.5), &LmConfig::default());
        assert!(res.converged, "did not converge: {res:?}");
        let expected = std::f64::consts::FRAC_1_SQRT_2;
        assert!(
            (res.params[0] - expected).abs() < 1e-9 && (res.params[1] - expected).abs() < 1e-9,
            "solution {:?}",
            res.params
        );
        assert!(res.max_abs_residual() < 1e-9);
    }

    #[test]
    fn test_other_branch_from_other_start() {
        let res = optimize(&CircleLine, Vector2::new(-1.5, -0.2), &LmConfig::default());
        assert!(res.converged);
        assert!(res.params[0] < 0.0 && res.params[1] < 0.0);
    }

    #[test]
    fn test_rootless_system_keeps_residual() {
        let res = optimize(&NoRoot, Vector2::new(0.7, 0.0), &LmConfig::default());
        // Residual never drops below 1; the iterate heads for the origin
        let worst = res.max_abs_residual();
        assert!(worst >= 1.0 && worst < 1.01, "max residual {worst}");
        assert!(res.params.norm() < 0.1, "params {:?}", res.params);
    }

    #[test]
    fn test_iteration_cap() {
        let config = LmConfig {
            max_iterations: 1,
            ..Default::default()
        };
        let res = optimize(&CircleLine, Vector2::new(5.0, -3.0), &config);
        assert!(!res.converged);
        assert_eq!(res.iterations, 1);
    }
}
