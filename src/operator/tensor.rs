// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tensor products and embedding of local operators into a composite space.
//!
//! Subsystem 0 is the most significant digit of a composite index, so
//! `expand(a, [2, 2], [0])` equals `a ⊗ I`.

use ndarray::Array2;
use num_complex::Complex64;

/// Kronecker product a ⊗ b.
pub fn kron(a: &Array2<Complex64>, b: &Array2<Complex64>) -> Array2<Complex64> {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    let mut out = Array2::zeros((ar * br, ac * bc));
    for ((i, j), &x) in a.indexed_iter() {
        if x == Complex64::new(0.0, 0.0) {
            continue;
        }
        for ((k, l), &y) in b.indexed_iter() {
            out[[i * br + k, j * bc + l]] = x * y;
        }
    }
    out
}

/// Row-major strides of a composite index over `dims`.
pub(crate) fn strides(dims: &[usize]) -> Vec<usize> {
    let mut out = vec![1; dims.len()];
    for k in (0..dims.len().saturating_sub(1)).rev() {
        out[k] = out[k + 1] * dims[k + 1];
    }
    out
}

/// Embed `op`, acting on `targets` (in that order), into the space `dims`.
///
/// `op_dims[j]` must equal `dims[targets[j]]`; callers check this. Targets
/// may be non-adjacent and in any order.
pub fn expand(
    op: &Array2<Complex64>,
    op_dims: &[usize],
    dims: &[usize],
    targets: &[usize],
) -> Array2<Complex64> {
    let total: usize = dims.iter().product();
    let full_strides = strides(dims);
    let local_strides = strides(op_dims);
    let local_n = op.nrows();

    let mut out = Array2::zeros((total, total));
    for row in 0..total {
        // Local row index and the row with target digits cleared.
        let mut local_row = 0;
        let mut base = row;
        for (j, &t) in targets.iter().enumerate() {
            let digit = (row / full_strides[t]) % dims[t];
            local_row += digit * local_strides[j];
            base -= digit * full_strides[t];
        }

        for local_col in 0..local_n {
            let value = op[[local_row, local_col]];
            if value == Complex64::new(0.0, 0.0) {
                continue;
            }
            let mut col = base;
            for (j, &t) in targets.iter().enumerate() {
                let digit = (local_col / local_strides[j]) % op_dims[j];
                col += digit * full_strides[t];
            }
            out[[row, col]] = value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_matrix_close;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    fn sigma_x() -> Array2<Complex64> {
        let mut m = Array2::zeros((2, 2));
        m[[0, 1]] = c(1.0);
        m[[1, 0]] = c(1.0);
        m
    }

    fn sigma_z() -> Array2<Complex64> {
        let mut m = Array2::zeros((2, 2));
        m[[0, 0]] = c(1.0);
        m[[1, 1]] = c(-1.0);
        m
    }

    fn eye(n: usize) -> Array2<Complex64> {
        Array2::from_diag_elem(n, c(1.0))
    }

    #[test]
    fn test_kron_dimensions() {
        let k = kron(&eye(2), &eye(3));
        assert_eq!(k.dim(), (6, 6));
        assert_matrix_close(&k, &eye(6), 1e-15);
    }

    #[test]
    fn test_strides() {
        assert_eq!(strides(&[2, 3, 4]), vec![12, 4, 1]);
        assert_eq!(strides(&[5]), vec![1]);
        assert!(strides(&[]).is_empty());
    }

    #[test]
    fn test_expand_first_subsystem() {
        let full = expand(&sigma_x(), &[2], &[2, 2], &[0]);
        assert_matrix_close(&full, &kron(&sigma_x(), &eye(2)), 1e-15);
    }

    #[test]
    fn test_expand_last_subsystem() {
        let full = expand(&sigma_z(), &[2], &[2, 2, 2], &[2]);
        let expected = kron(&kron(&eye(2), &eye(2)), &sigma_z());
        assert_matrix_close(&full, &expected, 1e-15);
    }

    #[test]
    fn test_expand_non_adjacent_targets() {
        // σx on 0, σz on 2, identity on 1
        let local = kron(&sigma_x(), &sigma_z());
        let full = expand(&local, &[2, 2], &[2, 2, 2], &[0, 2]);
        let expected = kron(&kron(&sigma_x(), &eye(2)), &sigma_z());
        assert_matrix_close(&full, &expected, 1e-15);
    }

    #[test]
    fn test_expand_reordered_targets() {
        // local σx ⊗ σz placed on (1, 0) is σz ⊗ σx
        let local = kron(&sigma_x(), &sigma_z());
        let full = expand(&local, &[2, 2], &[2, 2], &[1, 0]);
        assert_matrix_close(&full, &kron(&sigma_z(), &sigma_x()), 1e-15);
    }

    #[test]
    fn test_expand_mixed_dimensions() {
        let mut a = Array2::zeros((3, 3));
        a[[0, 1]] = c(1.0);
        a[[1, 2]] = c(2.0_f64.sqrt());
        let full = expand(&a, &[3], &[2, 3], &[1]);
        assert_matrix_close(&full, &kron(&eye(2), &a), 1e-15);
    }
}
