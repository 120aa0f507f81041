// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! T1/T2 relaxation channels.
//!
//! Ref: Lindblad (1976), Commun. Math. Phys. 48, 119.
//!
//! For a `d`-level subsystem:
//!   - Amplitude damping (T1): L = sqrt(1/T1) · a
//!   - Pure dephasing (T2):    L = sqrt(2/T2eff) · a†a
//!     where 1/T2eff = 1/T2 − 1/(2·T1)
//!
//! For a qubit, sqrt(2/T2eff)·a†a and sqrt(1/(2·T2eff))·σz produce the
//! same dissipator up to the identity part.

use num_complex::Complex64;

use crate::error::{Result, ValidationError};
use crate::operator::Operator;

/// Amplitude-damping collapse operator `sqrt(1/T1)·a` on a `d`-level system.
pub fn amplitude_damping(t1: f64, dim: usize) -> Result<Operator> {
    check_positive("t1", t1)?;
    Ok(Operator::destroy(dim).scale(Complex64::new((1.0 / t1).sqrt(), 0.0)))
}

/// Pure-dephasing collapse operator `sqrt(2/T2eff)·a†a`.
///
/// With `t1 = None` the dephasing time is `T2` itself. Rejects
/// `T2 > 2·T1`.
pub fn pure_dephasing(t1: Option<f64>, t2: f64, dim: usize) -> Result<Operator> {
    check_positive("t2", t2)?;
    let rate = match t1 {
        Some(t1) => {
            check_positive("t1", t1)?;
            if t2 > 2.0 * t1 {
                return Err(ValidationError::Field {
                    field: "t2".into(),
                    message: format!("T2 ({}) must be ≤ 2*T1 ({})", t2, 2.0 * t1),
                }
                .into());
            }
            1.0 / t2 - 1.0 / (2.0 * t1)
        }
        None => 1.0 / t2,
    };
    Ok(Operator::num(dim).scale(Complex64::new((2.0 * rate.max(0.0)).sqrt(), 0.0)))
}

/// Collapse operators of one subsystem, amplitude damping first.
pub fn channels(t1: Option<f64>, t2: Option<f64>, dim: usize) -> Result<Vec<Operator>> {
    let mut ops = Vec::with_capacity(2);
    if let Some(t1) = t1 {
        ops.push(amplitude_damping(t1, dim)?);
    }
    if let Some(t2) = t2 {
        ops.push(pure_dephasing(t1, t2, dim)?);
    }
    Ok(ops)
}

fn check_positive(field: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value.is_finite()) {
        return Err(ValidationError::Field {
            field: field.into(),
            message: format!("must be positive and finite, got {}", value),
        }
        .into());
    }
    Ok(())
}
