// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structural validation of pulse collections.
//!
//! Validation is lazy: it runs before coefficients are exported, a
//! generator is assembled or coefficients are persisted, never when a
//! pulse is mutated.

use crate::config::ResourceLimits;
use crate::error::{Result, ValidationError};
use crate::pulse::grid::is_strictly_increasing;
use crate::pulse::{Coefficient, Pulse, SplineKind};

/// Validate every pulse in order, reporting the first violation.
pub fn validate_pulses(pulses: &[Pulse]) -> Result<()> {
    for (index, pulse) in pulses.iter().enumerate() {
        check_pulse(index, pulse)?;
    }
    Ok(())
}

/// Validate one pulse; `index` is its position in the collection.
pub fn check_pulse(index: usize, pulse: &Pulse) -> Result<()> {
    let coeff = match &pulse.coeff {
        Coefficient::Off | Coefficient::Constant(_) => return Ok(()),
        Coefficient::Sampled(values) => values,
    };

    let tlist = pulse
        .tlist
        .as_ref()
        .ok_or(ValidationError::MissingTlist { pulse: index })?;

    let kind = pulse.kind();
    let length_ok = match kind {
        SplineKind::StepFunc => coeff.len() == tlist.len() || coeff.len() + 1 == tlist.len(),
        SplineKind::Cubic => coeff.len() == tlist.len(),
    };
    if !length_ok {
        return Err(ValidationError::LengthMismatch {
            pulse: index,
            kind,
            coeff_len: coeff.len(),
            tlist_len: tlist.len(),
        }
        .into());
    }

    if !is_strictly_increasing(tlist) {
        return Err(ValidationError::Field {
            field: format!("pulses[{}].tlist", index),
            message: "must be strictly increasing".into(),
        }
        .into());
    }

    if let Some(i) = coeff.iter().position(|v| !v.is_finite()) {
        return Err(ValidationError::Field {
            field: format!("pulses[{}].coeff", index),
            message: format!("contains non-finite value {} at index {}", coeff[i], i),
        }
        .into());
    }

    Ok(())
}

/// Check the size of a simulation against the configured limits.
pub fn validate_resource_limits(
    dims: &[usize],
    num_time_steps: usize,
    limits: &ResourceLimits,
) -> Result<()> {
    if dims.len() > limits.max_subsystems as usize {
        return Err(ValidationError::ResourceLimit {
            resource: "num_subsystems".into(),
            limit: limits.max_subsystems as u64,
            requested: dims.len() as u64,
        }
        .into());
    }

    let hilbert_dim = dims.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d as u64));
    let hilbert_dim = hilbert_dim.unwrap_or(u64::MAX);
    if hilbert_dim > limits.max_hilbert_dim as u64 {
        return Err(ValidationError::ResourceLimit {
            resource: "hilbert_dim".into(),
            limit: limits.max_hilbert_dim as u64,
            requested: hilbert_dim,
        }
        .into());
    }

    if num_time_steps > limits.max_time_steps as usize {
        return Err(ValidationError::ResourceLimit {
            resource: "num_time_steps".into(),
            limit: limits.max_time_steps as u64,
            requested: num_time_steps as u64,
        }
        .into());
    }

    Ok(())
}
