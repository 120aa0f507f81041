// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Matrix exponential via scaling-and-squaring with Padé(13) approximation.
//!
//! Implements the algorithm from:
//!   Higham (2005), "The Scaling and Squaring Method for the Matrix
//!   Exponential Revisited", SIAM J. Matrix Anal. Appl. 26(4), 1179.
//!
//! Propagators of a processor step are small (d ≤ 2^6), so everything is
//! dense and allocation happens once per power of A.

use ndarray::{s, Array2};
use num_complex::Complex64;

use crate::error::{Error, Result, SolverError};

/// theta_13 from Higham Table 10.2.
const THETA_13: f64 = 5.37;

/// Padé(13,13) coefficients b_0 … b_13, Higham (2005) eq. (10.33).
const PADE_COEFFS: [f64; 14] = [
    1.0,
    0.5,
    0.12,
    1.833_333_333_333_333_4e-2,
    1.992_753_623_188_405_8e-3,
    1.630_434_782_608_696e-4,
    1.035_196_687_401_6e-5,
    5.175_983_437_008_01e-7,
    2.043_151_356_652_5e-8,
    6.306_022_705_717_593e-10,
    1.483_770_048_404_14e-11,
    2.529_153_491_597_966e-13,
    2.810_170_546_219_962_4e-15,
    1.544_049_750_670_309e-17,
];

/// Compute exp(A) for a square complex matrix.
///
/// Returns `Error::Type` for a non-square input and a solver error if the
/// Padé denominator is numerically singular.
pub fn expm(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(Error::Type(format!(
            "matrix exponential requires a square operator, got {} x {}",
            n,
            a.ncols()
        )));
    }

    match n {
        0 => return Ok(Array2::zeros((0, 0))),
        1 => return Ok(Array2::from_elem((1, 1), a[[0, 0]].exp())),
        _ => {}
    }

    let norm = one_norm(a);
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as u32
    } else {
        0
    };

    let scaled = a.mapv(|z| z / f64::powi(2.0, squarings as i32));
    let mut result = pade13(&scaled)?;
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    Ok(result)
}

/// Padé(13,13) approximant r(A) = (V - U)^{-1} (V + U).
fn pade13(a: &Array2<Complex64>) -> Result<Array2<Complex64>> {
    let n = a.nrows();
    let b = |k: usize| Complex64::new(PADE_COEFFS[k], 0.0);
    let eye = Array2::from_diag_elem(n, Complex64::new(1.0, 0.0));

    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    // Odd part: U = A [A6 (b13 A6 + b11 A4 + b9 A2) + b7 A6 + b5 A4 + b3 A2 + b1 I]
    let odd_high = &a6 * b(13) + &a4 * b(11) + &a2 * b(9);
    let odd = odd_high.dot(&a6) + &a6 * b(7) + &a4 * b(5) + &a2 * b(3) + &eye * b(1);
    let u = a.dot(&odd);

    // Even part: V = A6 (b12 A6 + b10 A4 + b8 A2) + b6 A6 + b4 A4 + b2 A2 + b0 I
    let even_high = &a6 * b(12) + &a4 * b(10) + &a2 * b(8);
    let v = even_high.dot(&a6) + &a6 * b(6) + &a4 * b(4) + &a2 * b(2) + &eye * b(0);

    solve(&v - &u, &v + &u)
}

/// Solve A X = B by Gaussian elimination with partial pivoting.
pub(crate) fn solve(a: Array2<Complex64>, b: Array2<Complex64>) -> Result<Array2<Complex64>> {
    let n = a.nrows();
    let m = b.ncols();

    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| aug[[i, col]].norm().total_cmp(&aug[[j, col]].norm()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..(n + m) {
                aug.swap([col, j], [pivot_row, j]);
            }
        }

        let pivot = aug[[col, col]];
        if pivot.norm() < 1e-15 {
            return Err(SolverError::Diverged(
                "singular Padé denominator in matrix exponential".into(),
            )
            .into());
        }

        for row in (col + 1)..n {
            let factor = aug[[row, col]] / pivot;
            if factor.norm() == 0.0 {
                continue;
            }
            for j in col..(n + m) {
                let upper = aug[[col, j]];
                aug[[row, j]] -= factor * upper;
            }
        }
    }

    let mut x = Array2::<Complex64>::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut acc = aug[[row, n + j]];
            for k in (row + 1)..n {
                acc -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = acc / pivot;
        }
    }
    Ok(x)
}

/// Max absolute column sum.
fn one_norm(a: &Array2<Complex64>) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|z| z.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}
