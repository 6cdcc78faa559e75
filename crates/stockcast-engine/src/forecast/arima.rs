//! ARIMA(p, d, q) estimation by conditional least squares
//!
//! The series is differenced `d` times and an ARMA(p, q) model is fitted to
//! the result:
//!
//! - **AR only** (`q == 0`): ordinary least squares on lagged values.
//! - **With MA terms**: Hannan–Rissanen. A long autoregression supplies
//!   innovation estimates, lagged innovations enter the regression, and the
//!   estimate is refined from the model's own recursive residuals until the
//!   coefficients settle.
//!
//! An intercept is estimated only for `d == 0`. The information criterion is
//! AIC from the Gaussian conditional log-likelihood.
//!
//! ```rust
//! use stockcast_engine::forecast::{ArimaModel, ModelOrder};
//!
//! let data: Vec<f64> = (1..=60).map(|x| x as f64 + (x as f64 * 0.7).sin()).collect();
//! let model = ArimaModel::fit(&data, ModelOrder::new(1, 1, 0)).unwrap();
//! assert_eq!(model.forecast(3).len(), 3);
//! assert!(model.aic().is_finite());
//! ```

use std::f64::consts::PI;
use std::ops::Range;

use thiserror::Error;

use super::ModelOrder;

/// Residual observations required beyond the lags consumed by the model
const MIN_RESIDUAL_OBS: usize = 10;
/// Lower bound on the long autoregression used to estimate innovations
const LONG_AR_MIN: usize = 8;
/// Upper bound on Hannan–Rissanen refinement passes
const REFINE_PASSES: usize = 10;
/// Coefficient change below which refinement stops
const REFINE_TOLERANCE: f64 = 1e-8;
/// Relative pivot size under which the normal equations count as singular
const PIVOT_EPSILON: f64 = 1e-12;

/// Intercept, AR coefficients, MA coefficients
type ArmaParams = (f64, Vec<f64>, Vec<f64>);

/// Reasons a single order cannot be fitted
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("need at least {required} observations, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("series contains NaN or infinite values")]
    InvalidData,

    #[error("normal equations are singular")]
    Singular,

    #[error("autoregressive polynomial is not stationary")]
    NonStationary,

    #[error("moving-average polynomial is not invertible")]
    NonInvertible,

    #[error("residual variance is degenerate ({0})")]
    Degenerate(f64),
}

/// A fitted ARIMA model
#[derive(Debug, Clone)]
pub struct ArimaModel {
    order: ModelOrder,
    intercept: f64,
    ar: Vec<f64>,
    ma: Vec<f64>,
    sigma2: f64,
    log_likelihood: f64,
    nobs: usize,
    /// Last value of the series at each differencing level `0..d`
    tails: Vec<f64>,
    /// The `d`-times differenced series
    differenced: Vec<f64>,
    /// Conditional residuals aligned with `differenced`
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Fit `order` to `series`
    pub fn fit(series: &[f64], order: ModelOrder) -> Result<Self, FitError> {
        if series.iter().any(|v| !v.is_finite()) {
            return Err(FitError::InvalidData);
        }

        let ModelOrder { p, d, q } = order;
        let with_intercept = d == 0;

        let required = d + p.max(q) + p + q + MIN_RESIDUAL_OBS;
        if series.len() < required {
            return Err(FitError::InsufficientData {
                required,
                actual: series.len(),
            });
        }

        let mut tails = Vec::with_capacity(d);
        let mut differenced = series.to_vec();
        for _ in 0..d {
            tails.push(differenced[differenced.len() - 1]);
            differenced = difference(&differenced);
        }

        let (intercept, ar, ma) = if q == 0 {
            let (c, phi) = fit_autoregression(&differenced, p, with_intercept)?;
            (c, phi, Vec::new())
        } else {
            hannan_rissanen(&differenced, p, q, with_intercept)?
        };

        if !is_stationary(&ar) {
            return Err(FitError::NonStationary);
        }
        if !is_invertible(&ma) {
            return Err(FitError::NonInvertible);
        }

        let residuals = conditional_residuals(&differenced, intercept, &ar, &ma);
        let nobs = differenced.len() - p;
        let sse: f64 = residuals[p..].iter().map(|e| e * e).sum();
        let sigma2 = sse / nobs as f64;
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return Err(FitError::Degenerate(sigma2));
        }

        let log_likelihood = -0.5 * nobs as f64 * ((2.0 * PI * sigma2).ln() + 1.0);

        tracing::trace!(
            order = %order,
            intercept,
            ?ar,
            ?ma,
            sigma2,
            "Fitted ARIMA model"
        );

        Ok(Self {
            order,
            intercept,
            ar,
            ma,
            sigma2,
            log_likelihood,
            nobs,
            tails,
            differenced,
            residuals,
        })
    }

    pub fn order(&self) -> ModelOrder {
        self.order
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar
    }

    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma
    }

    /// Innovation variance estimate
    pub fn sigma2(&self) -> f64 {
        self.sigma2
    }

    /// Observations contributing to the conditional likelihood
    pub fn nobs(&self) -> usize {
        self.nobs
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Number of estimated parameters, innovation variance included
    pub fn parameter_count(&self) -> usize {
        self.ar.len() + self.ma.len() + usize::from(self.order.d == 0) + 1
    }

    /// Akaike information criterion
    pub fn aic(&self) -> f64 {
        2.0 * self.parameter_count() as f64 - 2.0 * self.log_likelihood
    }

    /// Recursive point forecasts on the original scale. Future innovations are zero.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        let n = self.differenced.len();
        let mut history = self.differenced.clone();
        let mut errors = self.residuals.clone();

        for _ in 0..steps {
            let len = history.len();
            let mut next = self.intercept;
            for (i, phi) in self.ar.iter().enumerate() {
                next += phi * history[len - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                next += theta * errors[len - 1 - j];
            }
            history.push(next);
            errors.push(0.0);
        }

        let mut projected = history.split_off(n);
        for &last in self.tails.iter().rev() {
            let mut level = last;
            for value in &mut projected {
                level += *value;
                *value = level;
            }
        }
        projected
    }
}

/// First difference
fn difference(data: &[f64]) -> Vec<f64> {
    data.windows(2).map(|w| w[1] - w[0]).collect()
}

/// OLS fit of `series[t]` on an optional constant and `lags` lagged values
fn fit_autoregression(
    series: &[f64],
    lags: usize,
    with_intercept: bool,
) -> Result<(f64, Vec<f64>), FitError> {
    let offset = usize::from(with_intercept);
    let beta = regress(lags..series.len(), offset + lags, |t, row| {
        if with_intercept {
            row[0] = 1.0;
        }
        for i in 0..lags {
            row[offset + i] = series[t - 1 - i];
        }
        series[t]
    })?;

    let intercept = if with_intercept { beta[0] } else { 0.0 };
    Ok((intercept, beta[offset..].to_vec()))
}

/// Estimate ARMA(p, q) with lagged innovation regressors
fn hannan_rissanen(
    series: &[f64],
    p: usize,
    q: usize,
    with_intercept: bool,
) -> Result<ArmaParams, FitError> {
    let n = series.len();
    let long = (p + q)
        .max(LONG_AR_MIN)
        .min(n.saturating_sub(q + p + MIN_RESIDUAL_OBS) / 2)
        .max(p + q);

    let (c0, phi_long) = fit_autoregression(series, long, with_intercept)?;
    let mut innovations = vec![0.0; n];
    for t in long..n {
        let mut fitted = c0;
        for (i, phi) in phi_long.iter().enumerate() {
            fitted += phi * series[t - 1 - i];
        }
        innovations[t] = series[t] - fitted;
    }

    let mut params = arma_regression(series, &innovations, p, q, with_intercept, p.max(long + q))?;

    for pass in 0..REFINE_PASSES {
        if !is_invertible(&params.2) {
            break;
        }
        let residuals = conditional_residuals(series, params.0, &params.1, &params.2);
        if residuals.iter().any(|e| !e.is_finite()) {
            break;
        }

        let refined = arma_regression(series, &residuals, p, q, with_intercept, p.max(q))?;
        let change = max_change(&params, &refined);
        if !is_invertible(&refined.2) {
            break;
        }
        params = refined;

        if change < REFINE_TOLERANCE {
            tracing::trace!(pass, "Hannan-Rissanen refinement converged");
            break;
        }
    }

    Ok(params)
}

/// OLS of `series[t]` on a constant, `p` lagged values and `q` lagged innovations
fn arma_regression(
    series: &[f64],
    innovations: &[f64],
    p: usize,
    q: usize,
    with_intercept: bool,
    start: usize,
) -> Result<ArmaParams, FitError> {
    let offset = usize::from(with_intercept);
    let beta = regress(start..series.len(), offset + p + q, |t, row| {
        if with_intercept {
            row[0] = 1.0;
        }
        for i in 0..p {
            row[offset + i] = series[t - 1 - i];
        }
        for j in 0..q {
            row[offset + p + j] = innovations[t - 1 - j];
        }
        series[t]
    })?;

    let intercept = if with_intercept { beta[0] } else { 0.0 };
    Ok((
        intercept,
        beta[offset..offset + p].to_vec(),
        beta[offset + p..].to_vec(),
    ))
}

fn max_change(a: &ArmaParams, b: &ArmaParams) -> f64 {
    std::iter::once((a.0, b.0))
        .chain(a.1.iter().copied().zip(b.1.iter().copied()))
        .chain(a.2.iter().copied().zip(b.2.iter().copied()))
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

/// Conditional (pre-sample innovations = 0) residuals starting at `t = p`
fn conditional_residuals(series: &[f64], intercept: f64, ar: &[f64], ma: &[f64]) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; series.len()];
    for t in p..series.len() {
        let mut fitted = intercept;
        for (i, phi) in ar.iter().enumerate() {
            fitted += phi * series[t - 1 - i];
        }
        for (j, theta) in ma.iter().enumerate() {
            if t > j {
                fitted += theta * residuals[t - 1 - j];
            }
        }
        residuals[t] = series[t] - fitted;
    }
    residuals
}

/// Least squares over the observations in `rows`.
///
/// `fill(t, row)` writes the regressors for observation `t` into `row` and
/// returns the target. Solved through the normal equations.
fn regress<F>(rows: Range<usize>, k: usize, mut fill: F) -> Result<Vec<f64>, FitError>
where
    F: FnMut(usize, &mut [f64]) -> f64,
{
    if k == 0 {
        return Ok(Vec::new());
    }

    let count = rows.len();
    if count <= k {
        return Err(FitError::InsufficientData {
            required: k + 1,
            actual: count,
        });
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    let mut row = vec![0.0; k];

    for t in rows {
        let y = fill(t, &mut row);
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    solve(xtx, xty)
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, FitError> {
    let n = b.len();
    let scale = (0..n).map(|i| a[i][i].abs()).fold(0.0, f64::max);
    if scale == 0.0 || !scale.is_finite() {
        return Err(FitError::Singular);
    }
    let threshold = scale * PIVOT_EPSILON;

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))
            .unwrap_or(col);
        if a[pivot_row][col].abs() <= threshold {
            return Err(FitError::Singular);
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().all(|v| v.is_finite()) {
        Ok(x)
    } else {
        Err(FitError::Singular)
    }
}

/// AR polynomial `1 - φ1 z - … - φp z^p` has all roots outside the unit circle
fn is_stationary(ar: &[f64]) -> bool {
    let poly: Vec<f64> = ar.iter().map(|phi| -phi).collect();
    roots_outside_unit_circle(&poly)
}

/// MA polynomial `1 + θ1 z + … + θq z^q` has all roots outside the unit circle
fn is_invertible(ma: &[f64]) -> bool {
    roots_outside_unit_circle(ma)
}

/// Schur–Cohn step-down test for `1 + a1 z + … + am z^m`
fn roots_outside_unit_circle(coeffs: &[f64]) -> bool {
    let mut a = coeffs.to_vec();
    while let Some(&k) = a.last() {
        if !k.is_finite() || k.abs() >= 1.0 {
            return false;
        }
        let m = a.len();
        let denom = 1.0 - k * k;
        let reduced: Vec<f64> = (0..m - 1)
            .map(|i| (a[i] - k * a[m - 2 - i]) / denom)
            .collect();
        a = reduced;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Deterministic, roughly Gaussian noise (sum of uniforms)
    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| (0..4).map(|_| rng.gen_range(-0.5_f64..0.5)).sum::<f64>())
            .collect()
    }

    fn simulate_ar1(phi: f64, c: f64, n: usize) -> Vec<f64> {
        let e = noise(n, 42);
        let mut x = vec![c / (1.0 - phi); n];
        for t in 1..n {
            x[t] = c + phi * x[t - 1] + e[t];
        }
        x
    }

    #[test]
    fn test_ar1_recovers_coefficient() {
        let data = simulate_ar1(0.6, 2.0, 600);
        let model = ArimaModel::fit(&data, ModelOrder::new(1, 0, 0)).unwrap();

        assert!((model.ar_coefficients()[0] - 0.6).abs() < 0.1);
        assert!((model.intercept() / (1.0 - model.ar_coefficients()[0]) - 5.0).abs() < 0.5);
        assert_eq!(model.parameter_count(), 3);
        assert!(model.aic().is_finite());
    }

    #[test]
    fn test_ma1_recovers_coefficient() {
        let e = noise(800, 7);
        let data: Vec<f64> = (0..800)
            .map(|t| e[t] + if t > 0 { 0.5 * e[t - 1] } else { 0.0 })
            .collect();
        let model = ArimaModel::fit(&data, ModelOrder::new(0, 0, 1)).unwrap();

        assert!((model.ma_coefficients()[0] - 0.5).abs() < 0.15);
    }

    #[test]
    fn test_second_difference_integration() {
        // t^2 has a constant second difference, so the projection continues
        // the last first difference
        let data: Vec<f64> = (0..=20).map(|t| f64::from(t * t)).collect();
        let model = ArimaModel::fit(&data, ModelOrder::new(0, 2, 0)).unwrap();
        let forecast = model.forecast(2);

        assert!((forecast[0] - 439.0).abs() < 1e-9);
        assert!((forecast[1] - 478.0).abs() < 1e-9);
    }

    #[test]
    fn test_random_walk_forecast_stays_near_last_value() {
        let e = noise(400, 11);
        let mut data = vec![100.0; 400];
        for t in 1..400 {
            data[t] = data[t - 1] + e[t];
        }
        let model = ArimaModel::fit(&data, ModelOrder::new(1, 1, 0)).unwrap();
        let forecast = model.forecast(30);

        assert_eq!(forecast.len(), 30);
        let last = data[399];
        assert!(forecast.iter().all(|v| (v - last).abs() < 10.0));
    }

    #[test]
    fn test_insufficient_data() {
        let err = ArimaModel::fit(&[1.0, 2.0, 3.0], ModelOrder::new(1, 1, 1)).unwrap_err();
        assert!(matches!(err, FitError::InsufficientData { .. }));
    }

    #[test]
    fn test_invalid_data() {
        let mut data = simulate_ar1(0.5, 1.0, 100);
        data[50] = f64::NAN;
        assert_eq!(
            ArimaModel::fit(&data, ModelOrder::new(1, 0, 0)).unwrap_err(),
            FitError::InvalidData
        );
    }

    #[test]
    fn test_constant_series_fails_every_order() {
        let data = vec![42.0; 200];
        for p in 0..=2 {
            for d in 0..=2 {
                for q in 0..=2 {
                    assert!(ArimaModel::fit(&data, ModelOrder::new(p, d, q)).is_err());
                }
            }
        }
    }

    #[test]
    fn test_unit_circle_checks() {
        assert!(is_stationary(&[0.5]));
        assert!(!is_stationary(&[1.0]));
        assert!(!is_stationary(&[1.2, -0.1]));
        assert!(is_stationary(&[0.5, 0.3]));
        assert!(is_invertible(&[]));
        assert!(is_invertible(&[0.4, 0.2]));
        assert!(!is_invertible(&[-1.5]));
    }

    #[test]
    fn test_solve_detects_singular_system() {
        let a = vec![vec![1.0, 2.0], vec![2.0, 4.0]];
        assert_eq!(solve(a, vec![1.0, 2.0]).unwrap_err(), FitError::Singular);
    }
}
