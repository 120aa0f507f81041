// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Canonical time grid from heterogeneous pulse grids.

use tracing::debug;

/// Default merge tolerance for nearly-coincident grid points.
pub const DEFAULT_TLIST_TOLERANCE: f64 = 1e-10;

/// Merge time grids into one ascending grid.
///
/// A point within `tol` of its sorted predecessor is dropped, so the first
/// point of each near-duplicate run survives.
/// Returns `None` if no grid is given.
pub fn merge_tlists<'a, I>(grids: I, tol: f64) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut count = 0usize;
    let mut all: Vec<f64> = Vec::new();
    for grid in grids {
        count += 1;
        all.extend_from_slice(grid);
    }
    if count == 0 {
        return None;
    }

    all.sort_by(f64::total_cmp);
    all.dedup();
    let mut merged: Vec<f64> = Vec::with_capacity(all.len());
    for (i, &t) in all.iter().enumerate() {
        if i == 0 || t - all[i - 1] > tol {
            merged.push(t);
        }
    }

    debug!(grids = count, points = merged.len(), "Merged time grids");
    Some(merged)
}

/// `n` evenly spaced points on `[start, stop]`.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            out[n - 1] = stop;
            out
        }
    }
}

/// True if every point is strictly greater than the previous one.
pub fn is_strictly_increasing(tlist: &[f64]) -> bool {
    tlist.windows(2).all(|w| w[1] > w[0])
}
