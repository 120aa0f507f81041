// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Projection of pulse coefficients onto a canonical grid.

use crate::error::{Result, ValidationError};
use crate::validation::check_pulse;

use super::spline::CubicSpline;
use super::types::{Coefficient, Pulse, SplineKind};

/// Resample the coefficient of `pulse` (at position `index`) onto `grid`.
///
/// Outside the pulse's own span the result is zero. Step-function samples
/// hold the last value at or before each point; a sequence one shorter
/// than its grid switches off at the last grid point.
pub fn resample_pulse(pulse: &Pulse, index: usize, grid: &[f64], tol: f64) -> Result<Vec<f64>> {
    let values = match &pulse.coeff {
        Coefficient::Off | Coefficient::Constant(false) => return Ok(vec![0.0; grid.len()]),
        Coefficient::Constant(true) => return Ok(vec![1.0; grid.len()]),
        Coefficient::Sampled(values) => values,
    };

    check_pulse(index, pulse)?;
    let tlist = pulse
        .tlist
        .as_deref()
        .ok_or(ValidationError::MissingTlist { pulse: index })?;

    resample_samples(tlist, values, pulse.kind(), grid, tol)
}

/// Resample `values` given on `tlist` with interpolation `kind` onto `grid`.
///
/// The caller guarantees the lengths are valid for `kind`.
pub fn resample_samples(
    tlist: &[f64],
    values: &[f64],
    kind: SplineKind,
    grid: &[f64],
    tol: f64,
) -> Result<Vec<f64>> {
    match kind {
        SplineKind::StepFunc => {
            let mut padded = values.to_vec();
            if padded.len() + 1 == tlist.len() {
                padded.push(0.0);
            }
            Ok(grid
                .iter()
                .map(|&t| step_value(tlist, &padded, t, tol))
                .collect())
        }
        SplineKind::Cubic => {
            let spline = CubicSpline::new(tlist, values)?;
            Ok(grid
                .iter()
                .map(|&t| spline_value(&spline, tlist, t, tol))
                .collect())
        }
    }
}

/// Value held from the last point of `tlist` at or before `t`; zero
/// outside the span. `values` has the length of `tlist`.
pub(crate) fn step_value(tlist: &[f64], values: &[f64], t: f64, tol: f64) -> f64 {
    let (start, end) = match (tlist.first(), tlist.last()) {
        (Some(&s), Some(&e)) => (s, e),
        _ => return 0.0,
    };
    if t < start - tol || t > end + tol {
        return 0.0;
    }
    let k = tlist.partition_point(|&x| x <= t + tol);
    values.get(k.saturating_sub(1)).copied().unwrap_or(0.0)
}

/// Spline value inside the span of `tlist`, zero outside.
pub(crate) fn spline_value(spline: &CubicSpline, tlist: &[f64], t: f64, tol: f64) -> f64 {
    let (start, end) = match (tlist.first(), tlist.last()) {
        (Some(&s), Some(&e)) => (s, e),
        _ => return 0.0,
    };
    if t < start - tol || t > end + tol {
        0.0
    } else {
        spline.eval(t.clamp(start, end))
    }
}
