// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Piecewise-constant propagators.
//!
//! For every grid interval `[t_n, t_{n+1})` the generator is frozen at its
//! left endpoint, `G_n = G(t_n)`, and the step propagator is
//! `U_n = exp(-i·G_n·(t_{n+1} − t_n))`. Cubic coefficients are sampled
//! the same way.

use num_complex::Complex64;
use tracing::debug;

use super::model::DeviceModel;
use crate::error::{Result, ValidationError};
use crate::generator::CompositeGenerator;
use crate::operator::Operator;
use crate::pulse::SplineKind;

/// Accumulate step propagators of `generator`.
///
/// With a `seed`, the output starts with the seed and entry `k + 1` is
/// `U_k ⋯ U_0 · seed`; without one, entry `k` is `U_k ⋯ U_0`. A nonzero
/// global phase `θ` reported by `model` appends `e^{iθ}` times the last
/// entry.
pub fn evolve(
    generator: &CompositeGenerator,
    seed: Option<&Operator>,
    model: &dyn DeviceModel,
) -> Result<Vec<Operator>> {
    let tlist = generator.tlist().ok_or_else(|| ValidationError::Field {
        field: "tlist".into(),
        message: "analytical evolution needs at least one pulse with a time grid".into(),
    })?;

    if generator.terms().iter().any(|t| t.kind() == SplineKind::Cubic) {
        debug!("Cubic coefficients are sampled piecewise constant on the analytical path");
    }

    let mut out: Vec<Operator> = Vec::with_capacity(tlist.len() + 1);
    if let Some(seed) = seed {
        out.push(seed.clone());
    }

    for (n, w) in tlist.windows(2).enumerate() {
        let dt = w[1] - w[0];
        let g = generator.at_index(n)?;
        let u = g.scale(Complex64::new(0.0, -dt)).expm()?;
        let u = model.eliminate_auxiliary_modes(u)?;
        let next = match out.last() {
            Some(prev) => u.dot(prev)?,
            None => u,
        };
        out.push(next);
    }

    let phase = model.global_phase();
    if phase != 0.0 {
        if let Some(last) = out.last() {
            let corrected = last.scale(Complex64::from_polar(1.0, phase));
            out.push(corrected);
        }
    }

    debug!(
        steps = tlist.len().saturating_sub(1),
        seeded = seed.is_some(),
        phase,
        model = model.name(),
        "Analytical evolution finished"
    );

    Ok(out)
}
