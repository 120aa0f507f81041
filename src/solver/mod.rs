// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Time-evolution solvers.
//!
//! A [`Solver`] integrates a composite generator from an initial state
//! over the canonical grid. Two reference solvers are provided:
//!
//! - [`mesolve::MeSolver`]: deterministic master-equation integration
//! - [`mcsolve::McSolver`]: quantum-jump Monte Carlo trajectories
//!
//! Solvers are looked up by name in a [`SolverRegistry`].

pub mod mcsolve;
pub mod mesolve;
pub mod registry;

use std::collections::BTreeMap;
use std::fmt;

use ndarray::Array2;
use num_complex::Complex64;
use serde_json::Value;

use crate::error::SolverError;
use crate::generator::CompositeGenerator;
use crate::operator::Operator;

pub use mcsolve::McSolver;
pub use mesolve::MeSolver;
pub use registry::SolverRegistry;

/// Integration style of a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Deterministic density-matrix or state-vector integration
    Deterministic,
    /// Stochastic trajectory sampling
    Stochastic,
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolverKind::Deterministic => write!(f, "deterministic"),
            SolverKind::Stochastic => write!(f, "stochastic"),
        }
    }
}

/// Caller-side options for a solver run.
#[derive(Debug, Clone, Default)]
pub struct SolveOptions {
    /// Extra collapse generators, placed before the processor's own.
    pub c_ops: Vec<CompositeGenerator>,
    /// Operators whose expectation values are recorded.
    pub e_ops: Vec<Operator>,
    /// Arguments merged into the generator's argument map.
    pub args: BTreeMap<String, Value>,
    /// Free-form solver options (`substeps`, `ntraj`, `seed`, ...).
    pub extra: BTreeMap<String, Value>,
}

impl SolveOptions {
    pub fn is_empty(&self) -> bool {
        self.c_ops.is_empty() && self.e_ops.is_empty() && self.args.is_empty() && self.extra.is_empty()
    }

    pub fn with_e_ops(mut self, e_ops: Vec<Operator>) -> Self {
        self.e_ops = e_ops;
        self
    }

    pub fn with_c_ops(mut self, c_ops: Vec<CompositeGenerator>) -> Self {
        self.c_ops = c_ops;
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Everything a solver needs for one run.
#[derive(Debug, Clone)]
pub struct SolveRequest {
    pub generator: CompositeGenerator,
    /// Ket (`d x 1`) or density matrix (`d x d`).
    pub initial: Operator,
    pub tlist: Vec<f64>,
    pub c_ops: Vec<CompositeGenerator>,
    pub e_ops: Vec<Operator>,
    pub options: BTreeMap<String, Value>,
}

impl SolveRequest {
    /// Check shapes common to every solver.
    pub fn check(&self) -> Result<(), SolverError> {
        let d = self.generator.dim();
        if self.tlist.is_empty() {
            return Err(SolverError::InvalidInput("empty tlist".into()));
        }
        if self.tlist.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SolverError::InvalidInput(
                "tlist must be strictly increasing".into(),
            ));
        }
        let (rows, cols) = self.initial.data().dim();
        if rows != d || !(cols == 1 || cols == d) {
            return Err(SolverError::InvalidInput(format!(
                "initial state of shape {}x{} does not fit a {}-dimensional generator",
                rows, cols, d
            )));
        }
        if let Some(c) = self.c_ops.iter().find(|c| c.dim() != d) {
            return Err(SolverError::InvalidInput(format!(
                "collapse generator dimension {} does not match {}",
                c.dim(),
                d
            )));
        }
        if let Some(e) = self.e_ops.iter().find(|e| e.dim() != d || !e.is_square()) {
            return Err(SolverError::InvalidInput(format!(
                "expectation operator {} does not match dimension {}",
                e, d
            )));
        }
        Ok(())
    }

    /// Unsigned integer option, or `default` if absent.
    pub fn option_u64(&self, key: &str, default: u64) -> Result<u64, SolverError> {
        match self.options.get(key) {
            None => Ok(default),
            Some(v) => v.as_u64().ok_or_else(|| {
                SolverError::InvalidInput(format!(
                    "option '{}' must be a non-negative integer, got {}",
                    key, v
                ))
            }),
        }
    }
}

/// Output of a solver run.
#[derive(Debug, Clone)]
pub struct SolverResult {
    pub solver: String,
    pub times: Vec<f64>,
    /// State at every time point (kets for closed-system runs).
    pub states: Vec<Operator>,
    /// `expect[k][n]` is the value of the k-th operator at `times[n]`.
    pub expect: Vec<Vec<f64>>,
    /// Trajectories averaged, for stochastic solvers.
    pub num_trajectories: Option<usize>,
}

impl SolverResult {
    pub fn final_state(&self) -> Option<&Operator> {
        self.states.last()
    }
}

/// A time-evolution backend.
pub trait Solver: Send + Sync {
    /// Registry name.
    fn name(&self) -> &str;

    fn kind(&self) -> SolverKind;

    /// Integrate the request over its grid.
    fn solve(&self, request: SolveRequest) -> Result<SolverResult, SolverError>;
}

/// `⟨E⟩` for a ket or density matrix.
pub fn expectation(e: &Array2<Complex64>, state: &Array2<Complex64>) -> f64 {
    if state.ncols() == 1 {
        let e_psi = e.dot(state);
        state
            .iter()
            .zip(e_psi.iter())
            .map(|(a, b)| a.conj() * b)
            .sum::<Complex64>()
            .re
    } else {
        e.dot(state).diag().sum().re
    }
}

/// Tr(ρ²).
pub fn purity(rho: &Array2<Complex64>) -> f64 {
    rho.dot(rho).diag().sum().re
}

pub(crate) fn ensure_finite(state: &Array2<Complex64>, t: f64) -> Result<(), SolverError> {
    if state.iter().all(|z| z.re.is_finite() && z.im.is_finite()) {
        Ok(())
    } else {
        Err(SolverError::Diverged(format!("non-finite state at t={}", t)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request(initial: Operator) -> SolveRequest {
        SolveRequest {
            generator: CompositeGenerator::from_operator(Operator::sigmaz()),
            initial,
            tlist: vec![0.0, 1.0],
            c_ops: vec![],
            e_ops: vec![],
            options: BTreeMap::new(),
        }
    }

    #[test]
    fn test_solver_kind_display() {
        assert_eq!(SolverKind::Deterministic.to_string(), "deterministic");
        assert_eq!(SolverKind::Stochastic.to_string(), "stochastic");
    }

    #[test]
    fn test_options_is_empty() {
        assert!(SolveOptions::default().is_empty());
        let opts = SolveOptions::default().with_option("ntraj", Value::from(10));
        assert!(!opts.is_empty());
    }

    #[test]
    fn test_request_check_shapes() {
        assert!(request(Operator::basis(2, 0).unwrap()).check().is_ok());
        assert!(request(Operator::identity(&[2])).check().is_ok());
        assert!(request(Operator::basis(3, 0).unwrap()).check().is_err());

        let mut r = request(Operator::basis(2, 0).unwrap());
        r.tlist = vec![0.0, 0.0];
        assert!(r.check().is_err());

        let mut r = request(Operator::basis(2, 0).unwrap());
        r.e_ops = vec![Operator::num(3)];
        assert!(r.check().is_err());
    }

    #[test]
    fn test_option_u64() {
        let mut r = request(Operator::basis(2, 0).unwrap());
        assert_eq!(r.option_u64("substeps", 7).unwrap(), 7);
        r.options.insert("substeps".into(), Value::from(3));
        assert_eq!(r.option_u64("substeps", 7).unwrap(), 3);
        r.options.insert("substeps".into(), Value::from("many"));
        assert!(r.option_u64("substeps", 7).is_err());
    }

    #[test]
    fn test_expectation_ket_and_density() {
        let ket = Operator::basis(2, 1).unwrap();
        assert_relative_eq!(expectation(Operator::sigmaz().data(), ket.data()), -1.0);
        let rho = ket.dot(&ket.dagger()).unwrap();
        assert_relative_eq!(expectation(Operator::sigmaz().data(), rho.data()), -1.0);
        assert_relative_eq!(purity(rho.data()), 1.0);
    }
}
