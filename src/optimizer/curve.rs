//! Weighted quadratic latency curve fitting
//!
//! Fits `latency = c0 + c1*x + c2*x^2` over observed (throughput, latency)
//! pairs by weighted least squares. Points are weighted by `1/throughput`
//! so low-throughput, low-latency measurements are not swamped by
//! high-throughput noise in the objective.

use crate::utils::error::FitError;

/// Minimum distinct throughput values for a determined degree-2 fit.
const MIN_DISTINCT_POINTS: usize = 3;

/// Relative pivot threshold below which the normal matrix is treated as
/// singular.
const PIVOT_EPSILON: f64 = 1e-12;

/// An immutable fitted quadratic `w(throughput) -> latency`.
///
/// Valid over the throughput range of the fitted samples; direct evaluation
/// outside that range is rejected. The ORT quadrature integrates the raw
/// polynomial from zero, which is the one sanctioned exception.
#[derive(Debug, Clone, Copy)]
pub struct LatencyCurve {
    coeffs: [f64; 3],
    domain: (f64, f64),
}

impl LatencyCurve {
    /// Fit a curve to the given series. Points with non-positive
    /// throughput carry no weight and are dropped before fitting.
    pub fn fit(throughput: &[f64], latency: &[f64]) -> Result<Self, FitError> {
        let points: Vec<(f64, f64)> = throughput
            .iter()
            .zip(latency.iter())
            .filter(|(x, _)| **x > 0.0)
            .map(|(x, y)| (*x, *y))
            .collect();

        let mut distinct: Vec<f64> = points.iter().map(|(x, _)| *x).collect();
        distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        distinct.dedup();
        if distinct.len() < MIN_DISTINCT_POINTS {
            return Err(FitError::InsufficientData {
                distinct: distinct.len(),
            });
        }

        // Normal equations for the weighted objective:
        //   sum_i w_i * (y_i - c0 - c1 x_i - c2 x_i^2)^2,  w_i = 1/x_i
        let mut s = [0.0f64; 5]; // sum w x^k, k = 0..4
        let mut t = [0.0f64; 3]; // sum w x^k y, k = 0..2
        for &(x, y) in &points {
            let w = 1.0 / x;
            let mut xk = 1.0;
            for k in 0..5 {
                s[k] += w * xk;
                if k < 3 {
                    t[k] += w * xk * y;
                }
                xk *= x;
            }
        }

        let coeffs = solve3([
            [s[0], s[1], s[2], t[0]],
            [s[1], s[2], s[3], t[1]],
            [s[2], s[3], s[4], t[2]],
        ])?;

        let min = distinct[0];
        let max = distinct[distinct.len() - 1];
        Ok(Self {
            coeffs,
            domain: (min, max),
        })
    }

    /// Predicted latency at throughput `x`. Fails outside the fitted range.
    pub fn latency_at(&self, x: f64) -> Result<f64, FitError> {
        let (min, max) = self.domain;
        // Small slack for float round-off at the endpoints.
        let slack = (max - min).abs() * 1e-9;
        if x < min - slack || x > max + slack {
            return Err(FitError::OutOfDomain { x, min, max });
        }
        Ok(self.eval_raw(x))
    }

    /// Raw polynomial evaluation without the domain check. Used by the ORT
    /// quadrature, which integrates from zero by definition.
    pub(crate) fn eval_raw(&self, x: f64) -> f64 {
        let [c0, c1, c2] = self.coeffs;
        (c2 * x + c1) * x + c0
    }

    /// Coefficients `[c0, c1, c2]` of `c0 + c1*x + c2*x^2`.
    pub fn coefficients(&self) -> [f64; 3] {
        self.coeffs
    }

    /// Throughput range the fit is valid over.
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }
}

/// Solve a 3x3 system given as rows `[a0, a1, a2, rhs]` by Gaussian
/// elimination with partial pivoting.
fn solve3(mut m: [[f64; 4]; 3]) -> Result<[f64; 3], FitError> {
    let scale = m
        .iter()
        .flat_map(|row| row[..3].iter())
        .fold(0.0f64, |acc, v| acc.max(v.abs()));

    for col in 0..3 {
        let pivot_row = (col..3)
            .max_by(|&a, &b| {
                m[a][col]
                    .abs()
                    .partial_cmp(&m[b][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if m[pivot_row][col].abs() <= scale * PIVOT_EPSILON {
            return Err(FitError::Singular);
        }
        m.swap(col, pivot_row);

        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut out = [0.0f64; 3];
    for col in (0..3).rev() {
        let mut acc = m[col][3];
        for k in (col + 1)..3 {
            acc -= m[col][k] * out[k];
        }
        out[col] = acc / m[col][col];
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovers_quadratic_coefficients() {
        // y = 0.002 x^2 + 0.3 x + 5, noiseless
        let xs: Vec<f64> = (1..=8).map(|i| i as f64 * 25.0).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 0.002 * x * x + 0.3 * x + 5.0).collect();

        let curve = LatencyCurve::fit(&xs, &ys).unwrap();
        let [c0, c1, c2] = curve.coefficients();
        assert!((c0 - 5.0).abs() < 1e-6, "c0 = {}", c0);
        assert!((c1 - 0.3).abs() < 1e-8, "c1 = {}", c1);
        assert!((c2 - 0.002).abs() < 1e-10, "c2 = {}", c2);
    }

    #[test]
    fn test_prediction_matches_inside_domain() {
        let xs = [10.0, 20.0, 30.0, 40.0];
        let ys: Vec<f64> = xs.iter().map(|x| x * x + 2.0 * x + 1.0).collect();
        let curve = LatencyCurve::fit(&xs, &ys).unwrap();

        let y = curve.latency_at(25.0).unwrap();
        assert!((y - (25.0f64 * 25.0 + 50.0 + 1.0)).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_extrapolation() {
        let xs = [10.0, 20.0, 30.0];
        let ys = [1.0, 2.0, 4.0];
        let curve = LatencyCurve::fit(&xs, &ys).unwrap();

        assert!(matches!(
            curve.latency_at(50.0),
            Err(FitError::OutOfDomain { .. })
        ));
        assert!(matches!(
            curve.latency_at(1.0),
            Err(FitError::OutOfDomain { .. })
        ));
        assert!(curve.latency_at(30.0).is_ok());
    }

    #[test]
    fn test_insufficient_distinct_points() {
        // Three points but only two distinct throughputs.
        let xs = [10.0, 10.0, 20.0];
        let ys = [1.0, 1.1, 2.0];
        assert!(matches!(
            LatencyCurve::fit(&xs, &ys),
            Err(FitError::InsufficientData { distinct: 2 })
        ));
    }

    #[test]
    fn test_nonpositive_throughput_dropped() {
        let xs = [0.0, 10.0, 20.0, 30.0];
        let ys = [9.0, 1.0, 2.0, 4.0];
        let curve = LatencyCurve::fit(&xs, &ys).unwrap();
        assert_eq!(curve.domain(), (10.0, 30.0));
    }
}
