// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities.

use std::sync::Arc;

use ndarray::Array2;
use num_complex::Complex64;
use parking_lot::Mutex;

use crate::circuit::Circuit;
use crate::error::{Error, Result, SolverError};
use crate::operator::Operator;
use crate::processor::DeviceModel;
use crate::pulse::Pulse;
use crate::solver::{SolveRequest, Solver, SolverKind, SolverResult};

/// Assert element-wise closeness of two matrices.
pub fn assert_matrix_close(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) {
    assert_eq!(a.dim(), b.dim(), "shape mismatch");
    for ((idx, x), y) in a.indexed_iter().zip(b.iter()) {
        assert!(
            (x - y).norm() <= tol,
            "mismatch at {:?}: {} vs {} (tol {})",
            idx,
            x,
            y,
            tol
        );
    }
}

pub fn assert_operator_close(a: &Operator, b: &Operator, tol: f64) {
    assert_matrix_close(a.data(), b.data(), tol);
}

/// Assert `a = e^{iφ}·b` for some phase φ.
pub fn assert_close_up_to_phase(a: &Operator, b: &Operator, tol: f64) {
    let (idx, pivot) = b
        .data()
        .indexed_iter()
        .max_by(|x, y| x.1.norm().total_cmp(&y.1.norm()))
        .expect("non-empty operator");
    assert!(pivot.norm() > tol, "reference operator is zero");
    let phase = a.data()[idx] / pivot;
    assert!(
        (phase.norm() - 1.0).abs() <= tol,
        "ratio {} at {:?} is not a phase",
        phase,
        idx
    );
    assert_operator_close(a, &b.scale(phase), tol);
}

/// Solver that records every request and returns the initial state at
/// every time point.
pub struct MockSolver {
    pub name: String,
    pub kind: SolverKind,
    pub requests: Mutex<Vec<SolveRequest>>,
}

impl MockSolver {
    pub fn new(name: &str, kind: SolverKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn recording(name: &str) -> Arc<Self> {
        Arc::new(Self::new(name, SolverKind::Deterministic))
    }

    pub fn deterministic(name: &str) -> Arc<dyn Solver> {
        Arc::new(Self::new(name, SolverKind::Deterministic))
    }

    pub fn stochastic(name: &str) -> Arc<dyn Solver> {
        Arc::new(Self::new(name, SolverKind::Stochastic))
    }

    pub fn last_request(&self) -> Option<SolveRequest> {
        self.requests.lock().last().cloned()
    }
}

impl Solver for MockSolver {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> SolverKind {
        self.kind
    }

    fn solve(&self, request: SolveRequest) -> std::result::Result<SolverResult, SolverError> {
        request.check()?;
        let n = request.tlist.len();
        let result = SolverResult {
            solver: self.name.clone(),
            times: request.tlist.clone(),
            states: vec![request.initial.clone(); n],
            expect: vec![vec![0.0; n]; request.e_ops.len()],
            num_trajectories: match self.kind {
                SolverKind::Stochastic => Some(1),
                SolverKind::Deterministic => None,
            },
        };
        self.requests.lock().push(request);
        Ok(result)
    }
}

/// Device model compiling `rx`/`rz` gates into back-to-back unit-length
/// σx/σz pulses with coefficient θ/2, optionally reporting a global phase.
#[derive(Debug, Clone, Default)]
pub struct ToyModel {
    pub phase: f64,
}

impl ToyModel {
    pub fn with_phase(phase: f64) -> Self {
        Self { phase }
    }
}

impl DeviceModel for ToyModel {
    fn name(&self) -> &str {
        "toy"
    }

    fn load_circuit(&self, circuit: &Circuit, _dims: &[usize]) -> Result<Vec<Pulse>> {
        let mut pulses = Vec::with_capacity(circuit.len());
        for (k, gate) in circuit.gates.iter().enumerate() {
            let op = match gate.name.as_str() {
                "rx" => Operator::sigmax(),
                "rz" => Operator::sigmaz(),
                other => {
                    return Err(Error::NotImplemented(format!(
                        "toy model has no pulse for gate '{}'",
                        other
                    )))
                }
            };
            let theta = gate.parameters.first().copied().unwrap_or(0.0);
            let t0 = k as f64;
            pulses.push(
                Pulse::new(op, gate.targets.clone())
                    .with_tlist(vec![t0, t0 + 1.0])
                    .with_coeff(vec![theta / 2.0])
                    .with_label(gate.name.clone()),
            );
        }
        Ok(pulses)
    }

    fn global_phase(&self) -> f64 {
        self.phase
    }
}

/// Device model whose auxiliary-mode elimination multiplies every step
/// propagator by `e^{iα}`.
#[derive(Debug, Clone)]
pub struct KickModel {
    pub alpha: f64,
}

impl DeviceModel for KickModel {
    fn name(&self) -> &str {
        "kick"
    }

    fn eliminate_auxiliary_modes(&self, u: Operator) -> Result<Operator> {
        Ok(u.scale(Complex64::from_polar(1.0, self.alpha)))
    }
}
