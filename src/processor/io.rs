// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Coefficient files.
//!
//! Tab-separated text with one row per canonical time point. Columns are
//! `time, c_0, …, c_{P-1}` or just `c_0, …, c_{P-1}`. Every value is
//! written with 16 fractional digits.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use ndarray::{Array2, ArrayView2};
use tracing::{debug, info};

use super::Processor;
use crate::error::{Error, Result, ValidationError};
use crate::pulse::Coefficient;

/// Coefficients read back from a file.
#[derive(Debug, Clone, PartialEq)]
pub struct CoeffTable {
    /// Time column, if the file had one.
    pub tlist: Option<Vec<f64>>,
    /// Shape `(pulses, rows)`.
    pub coeffs: Array2<f64>,
}

/// Write `coeffs` of shape `(pulses, tlist.len())`, one file row per
/// time point.
pub fn write_coeffs(
    path: &Path,
    tlist: &[f64],
    coeffs: ArrayView2<'_, f64>,
    include_time: bool,
) -> Result<()> {
    if coeffs.ncols() != tlist.len() {
        return Err(ValidationError::Field {
            field: "coeff".into(),
            message: format!(
                "coefficient rows have {} values for {} time points",
                coeffs.ncols(),
                tlist.len()
            ),
        }
        .into());
    }

    let mut out = String::new();
    for (t, column) in tlist.iter().zip(coeffs.columns()) {
        let mut cells = Vec::with_capacity(coeffs.nrows() + 1);
        if include_time {
            cells.push(format!("{:.16}", t));
        }
        cells.extend(column.iter().map(|c| format!("{:.16}", c)));
        // Writing into a String cannot fail.
        let _ = writeln!(out, "{}", cells.join("\t"));
    }
    fs::write(path, out)?;
    debug!(path = %path.display(), rows = tlist.len(), columns = coeffs.nrows(), "Wrote coefficients");
    Ok(())
}

/// Read a coefficient file with `num_pulses` coefficient columns.
pub fn read_coeffs(path: &Path, include_time: bool, num_pulses: usize) -> Result<CoeffTable> {
    let content = fs::read_to_string(path)?;
    let expected = num_pulses + usize::from(include_time);

    let mut tlist = Vec::new();
    let mut flat: Vec<f64> = Vec::new();
    let mut rows = 0;
    for (lineno, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|cell| {
                cell.parse::<f64>().map_err(|e| {
                    Error::Serialization(format!(
                        "{}:{}: cannot parse '{}': {}",
                        path.display(),
                        lineno + 1,
                        cell,
                        e
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        if values.len() != expected {
            return Err(ValidationError::Field {
                field: "coeff".into(),
                message: format!(
                    "line {} has {} column(s), expected {} ({} pulse(s){})",
                    lineno + 1,
                    values.len(),
                    expected,
                    num_pulses,
                    if include_time { " plus time" } else { "" }
                ),
            }
            .into());
        }
        let mut cells = values.into_iter();
        if include_time {
            if let Some(t) = cells.next() {
                tlist.push(t);
            }
        }
        flat.extend(cells);
        rows += 1;
    }

    let coeffs = Array2::from_shape_vec((rows, num_pulses), flat)
        .map_err(|e| Error::Serialization(format!("{}: {}", path.display(), e)))?
        .reversed_axes();
    Ok(CoeffTable {
        tlist: include_time.then_some(tlist),
        coeffs,
    })
}

impl Processor {
    /// Save the canonical grid and every pulse's resampled coefficients.
    pub fn save_coeff(&self, path: impl AsRef<Path>, include_time: bool) -> Result<()> {
        let path = path.as_ref();
        let coeffs = self.get_full_coeffs()?;
        let tlist = self.get_full_tlist().ok_or_else(|| ValidationError::Field {
            field: "tlist".into(),
            message: "no pulse has a time grid, nothing to save".into(),
        })?;
        write_coeffs(path, &tlist, coeffs.view(), include_time)?;
        info!(path = %path.display(), pulses = coeffs.nrows(), "Saved coefficients");
        Ok(())
    }

    /// Load coefficients into the pulses, one column per pulse.
    ///
    /// With `include_time` the time column becomes every pulse's grid.
    pub fn read_coeff(&mut self, path: impl AsRef<Path>, include_time: bool) -> Result<CoeffTable> {
        let path = path.as_ref();
        let table = read_coeffs(path, include_time, self.pulses.len())?;
        for (pulse, row) in self.pulses.iter_mut().zip(table.coeffs.rows()) {
            pulse.coeff = Coefficient::Sampled(row.to_vec());
            if let Some(tlist) = &table.tlist {
                pulse.tlist = Some(tlist.clone());
            }
        }
        info!(path = %path.display(), pulses = table.coeffs.nrows(), "Read coefficients");
        Ok(table)
    }
}
