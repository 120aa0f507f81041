// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Assembly of pulses into one composite generator.

use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::pulse::{merge_tlists, resample_pulse, Coefficient, Drift, Pulse};

use super::types::CompositeGenerator;

/// A composite generator with collapse generators on the same grid.
#[derive(Debug, Clone)]
pub struct AssembledSystem {
    pub generator: CompositeGenerator,
    pub collapse: Vec<CompositeGenerator>,
}

impl AssembledSystem {
    pub fn tlist(&self) -> Option<&[f64]> {
        self.generator.tlist()
    }
}

/// Build the composite generator of `pulses` (plus `drift`, if given) and
/// re-express every collapse term on the same canonical grid.
///
/// The canonical grid merges the grids of all pulses and collapse terms.
/// Errors name the position of the offending pulse in `pulses`.
pub fn assemble(
    pulses: &[Pulse],
    drift: Option<&Drift>,
    collapse: &[Pulse],
    dims: &[usize],
    tol: f64,
) -> Result<AssembledSystem> {
    let grids = pulses
        .iter()
        .chain(collapse.iter())
        .filter_map(|p| p.tlist.as_deref());
    let grid = merge_tlists(grids, tol);

    let mut generator = CompositeGenerator::new(dims.to_vec(), grid.clone()).with_tolerance(tol);
    if let Some(drift) = drift.filter(|d| !d.is_empty()) {
        generator.add_constant(drift.full_operator(dims)?)?;
    }
    for (index, pulse) in pulses.iter().enumerate() {
        add_pulse(&mut generator, pulse, index, grid.as_deref(), dims, tol)?;
    }

    let mut collapse_generators = Vec::with_capacity(collapse.len());
    for (index, term) in collapse.iter().enumerate() {
        if term.coeff.is_silent() {
            continue;
        }
        let mut c = CompositeGenerator::new(dims.to_vec(), grid.clone()).with_tolerance(tol);
        add_pulse(&mut c, term, index, grid.as_deref(), dims, tol)?;
        collapse_generators.push(c);
    }

    debug!(
        pulses = pulses.len(),
        terms = generator.terms().len(),
        collapse = collapse_generators.len(),
        grid_points = grid.as_ref().map_or(0, Vec::len),
        "Assembled generator"
    );

    Ok(AssembledSystem {
        generator,
        collapse: collapse_generators,
    })
}

fn add_pulse(
    generator: &mut CompositeGenerator,
    pulse: &Pulse,
    index: usize,
    grid: Option<&[f64]>,
    dims: &[usize],
    tol: f64,
) -> Result<()> {
    match &pulse.coeff {
        Coefficient::Off | Coefficient::Constant(false) => Ok(()),
        Coefficient::Constant(true) => generator.add_constant(pulse.full_operator(dims)?),
        Coefficient::Sampled(_) => {
            let grid = grid.ok_or(ValidationError::MissingTlist { pulse: index })?;
            let coeff = resample_pulse(pulse, index, grid, tol)?;
            generator.add_term(pulse.full_operator(dims)?, coeff, pulse.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::operator::Operator;
    use crate::pulse::{SplineKind, DEFAULT_TLIST_TOLERANCE};
    use crate::test_utils::assert_operator_close;
    use num_complex::Complex64;

    const TOL: f64 = DEFAULT_TLIST_TOLERANCE;

    #[test]
    fn test_canonical_grid_merges_pulses() {
        let a = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0, 2.0])
            .with_coeff(vec![1.0, 2.0]);
        let b = Pulse::new(Operator::sigmaz(), vec![1])
            .with_tlist(vec![0.0, 0.5, 1.0 + 1e-11])
            .with_coeff(vec![3.0, 4.0]);
        let sys = assemble(&[a, b], None, &[], &[2, 2], TOL).unwrap();
        assert_eq!(sys.tlist(), Some(&[0.0, 0.5, 1.0, 2.0][..]));
        assert_eq!(sys.generator.terms()[0].coeff(), &[1.0, 1.0, 2.0, 0.0]);
        assert_eq!(sys.generator.terms()[1].coeff(), &[3.0, 4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_constant_and_off_pulses() {
        let on = Pulse::new(Operator::sigmaz(), vec![0]).with_coeff(true);
        let off = Pulse::new(Operator::sigmax(), vec![0]);
        let sys = assemble(&[on, off], None, &[], &[2], TOL).unwrap();
        assert!(sys.tlist().is_none());
        assert!(sys.generator.is_constant());
        assert_operator_close(sys.generator.constant().unwrap(), &Operator::sigmaz(), 1e-15);
    }

    #[test]
    fn test_drift_becomes_constant() {
        let mut drift = Drift::new();
        drift.add(Operator::sigmaz(), vec![1]);
        let x = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0])
            .with_coeff(vec![1.0]);
        let sys = assemble(&[x], Some(&drift), &[], &[2, 2], TOL).unwrap();
        let expected = Operator::sigmaz().expand(&[2, 2], &[1]).unwrap();
        assert_operator_close(sys.generator.constant().unwrap(), &expected, 1e-15);
        assert_eq!(sys.generator.terms().len(), 1);
    }

    #[test]
    fn test_collapse_on_same_grid() {
        let x = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 2.0])
            .with_coeff(vec![1.0]);
        let static_c = Pulse::new(Operator::sigmam(), vec![0]).with_coeff(true);
        let timed_c = Pulse::new(Operator::sigmaz(), vec![0])
            .with_tlist(vec![0.0, 1.0, 2.0])
            .with_coeff(vec![0.5, 0.5, 0.5])
            .with_spline_kind(SplineKind::StepFunc);
        let sys = assemble(&[x], None, &[static_c, timed_c], &[2], TOL).unwrap();
        assert_eq!(sys.tlist(), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(sys.collapse.len(), 2);
        for c in &sys.collapse {
            assert_eq!(c.tlist(), sys.tlist());
        }
        assert!(sys.collapse[0].is_constant());
        assert_eq!(sys.collapse[1].terms()[0].coeff(), &[0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_sampled_error_names_pulse() {
        let ok = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0])
            .with_coeff(vec![1.0]);
        let bad = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0])
            .with_coeff(vec![1.0; 4]);
        let err = assemble(&[ok, bad], None, &[], &[2], TOL).unwrap_err();
        assert!(err.to_string().contains("Pulse id=1"));
    }

    #[test]
    fn test_generator_value_matches_pulses() {
        let x = Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0])
            .with_coeff(vec![0.25]);
        let sys = assemble(&[x], None, &[], &[2], TOL).unwrap();
        let h = sys.generator.at(0.5);
        assert_eq!(h.data()[[0, 1]], Complex64::new(0.25, 0.0));
        assert!(matches!(
            sys.generator.at_index(5),
            Err(Error::Lookup(_))
        ));
    }
}
