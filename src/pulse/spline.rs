// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Not-a-knot cubic spline.
//!
//! Slopes at the knots are found from the usual C2 continuity conditions
//! with the not-a-knot end conditions (third derivative continuous across
//! the second and second-to-last knots). The spline is evaluated in
//! Hermite form. Two knots give the line through them and three knots the
//! interpolating parabola.

use crate::error::{Result, ValidationError};

/// Cubic interpolant through `(x[i], y[i])`.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl CubicSpline {
    /// Fit a spline. `x` must be strictly increasing and as long as `y`.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Self> {
        if x.len() != y.len() || x.is_empty() {
            return Err(ValidationError::Field {
                field: "coeff".into(),
                message: format!(
                    "cubic spline needs matching non-empty knots and values, got {} and {}",
                    x.len(),
                    y.len()
                ),
            }
            .into());
        }
        let slopes = knot_slopes(x, y)?;
        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            slopes,
        })
    }

    /// Evaluate at `t`, extrapolating with the end segments.
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }
        // Segment i covers [x[i], x[i+1]].
        let i = self.x.partition_point(|&xi| xi <= t).clamp(1, n - 1) - 1;
        let h = self.x[i + 1] - self.x[i];
        let s = (t - self.x[i]) / h;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        h00 * self.y[i] + h10 * h * self.slopes[i] + h01 * self.y[i + 1] + h11 * h * self.slopes[i + 1]
    }
}

fn knot_slopes(x: &[f64], y: &[f64]) -> Result<Vec<f64>> {
    let n = x.len();
    if n == 1 {
        return Ok(vec![0.0]);
    }

    let dx: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
    if dx.iter().any(|&h| h <= 0.0) {
        return Err(ValidationError::Field {
            field: "tlist".into(),
            message: "cubic spline knots must be strictly increasing".into(),
        }
        .into());
    }
    let slope: Vec<f64> = (0..n - 1).map(|i| (y[i + 1] - y[i]) / dx[i]).collect();

    match n {
        2 => Ok(vec![slope[0]; 2]),
        3 => {
            // Parabola p(t) = y0 + s0 (t - x0) + c (t - x0)(t - x1).
            let c = (slope[1] - slope[0]) / (x[2] - x[0]);
            Ok(x
                .iter()
                .map(|&t| slope[0] + c * (2.0 * t - x[0] - x[1]))
                .collect())
        }
        _ => {
            let mut lower = vec![0.0; n];
            let mut diag = vec![0.0; n];
            let mut upper = vec![0.0; n];
            let mut rhs = vec![0.0; n];

            for i in 1..n - 1 {
                lower[i] = dx[i];
                diag[i] = 2.0 * (dx[i - 1] + dx[i]);
                upper[i] = dx[i - 1];
                rhs[i] = 3.0 * (dx[i] * slope[i - 1] + dx[i - 1] * slope[i]);
            }

            let d0 = x[2] - x[0];
            diag[0] = dx[1];
            upper[0] = d0;
            rhs[0] = ((dx[0] + 2.0 * d0) * dx[1] * slope[0] + dx[0] * dx[0] * slope[1]) / d0;

            let d1 = x[n - 1] - x[n - 3];
            diag[n - 1] = dx[n - 3];
            lower[n - 1] = d1;
            rhs[n - 1] = (dx[n - 2] * dx[n - 2] * slope[n - 3]
                + (2.0 * d1 + dx[n - 2]) * dx[n - 3] * slope[n - 2])
                / d1;

            thomas(&lower, &diag, &upper, &rhs)
        }
    }
}

/// Tridiagonal solve; `lower[0]` and `upper[n-1]` are ignored.
fn thomas(lower: &[f64], diag: &[f64], upper: &[f64], rhs: &[f64]) -> Result<Vec<f64>> {
    let n = diag.len();
    let mut c = vec![0.0; n];
    let mut d = vec![0.0; n];

    let mut denom = diag[0];
    for i in 0..n {
        if i > 0 {
            denom = diag[i] - lower[i] * c[i - 1];
        }
        if denom.abs() < f64::EPSILON {
            return Err(ValidationError::Field {
                field: "tlist".into(),
                message: "degenerate knot spacing for cubic spline".into(),
            }
            .into());
        }
        c[i] = if i + 1 < n { upper[i] / denom } else { 0.0 };
        d[i] = if i == 0 {
            rhs[0] / denom
        } else {
            (rhs[i] - lower[i] * d[i - 1]) / denom
        };
    }

    let mut out = vec![0.0; n];
    out[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        out[i] = d[i] - c[i] * out[i + 1];
    }
    Ok(out)
}
