// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Master-equation solver.
//!
//! Integrates dρ/dt = -i[H(t), ρ] + Σ_k D[L_k(t)](ρ) with classical
//! 4th-order Runge–Kutta, or the Schrödinger equation dψ/dt = -iH(t)ψ when
//! the initial state is a ket and there are no collapse generators.
//!
//! Every grid interval is split into `substeps` equal steps. Within one
//! step the generator is frozen at the step midpoint.
//!
//! Ref: Breuer & Petruccione, "The Theory of Open Quantum Systems" (2002), Ch. 3.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use super::{ensure_finite, expectation, purity, SolveRequest, Solver, SolverKind, SolverResult};
use crate::error::SolverError;
use crate::operator::Operator;

/// Default number of RK4 steps per grid interval.
pub const DEFAULT_SUBSTEPS: u64 = 100;

/// A collapse operator with its products precomputed for one step.
pub(crate) struct Channel {
    l: Array2<Complex64>,
    l_dag: Array2<Complex64>,
    l_dag_l: Array2<Complex64>,
}

impl Channel {
    pub(crate) fn new(l: Array2<Complex64>) -> Self {
        let l_dag = conjugate_transpose(&l);
        let l_dag_l = l_dag.dot(&l);
        Self { l, l_dag, l_dag_l }
    }

    pub(crate) fn op(&self) -> &Array2<Complex64> {
        &self.l
    }

    pub(crate) fn l_dag_l(&self) -> &Array2<Complex64> {
        &self.l_dag_l
    }
}

/// D[L](ρ) = L ρ L† − ½ L†L ρ − ½ ρ L†L.
fn dissipator(ch: &Channel, rho: &Array2<Complex64>) -> Array2<Complex64> {
    let half = Complex64::new(0.5, 0.0);
    let l_rho_ldag = ch.l.dot(rho).dot(&ch.l_dag);
    l_rho_ldag - (ch.l_dag_l.dot(rho) + rho.dot(&ch.l_dag_l)) * half
}

/// -i[H, ρ] + Σ_k D[L_k](ρ).
pub(crate) fn lindblad_rhs(
    hamiltonian: &Array2<Complex64>,
    channels: &[Channel],
    rho: &Array2<Complex64>,
) -> Array2<Complex64> {
    let i = Complex64::new(0.0, 1.0);
    let mut out = (hamiltonian.dot(rho) - rho.dot(hamiltonian)) * (-i);
    for ch in channels {
        out = out + dissipator(ch, rho);
    }
    out
}

/// One classical RK4 step of dy/dt = f(y) with a frozen right-hand side.
pub(crate) fn rk4_step<F>(y: &Array2<Complex64>, dt: f64, f: F) -> Array2<Complex64>
where
    F: Fn(&Array2<Complex64>) -> Array2<Complex64>,
{
    let dt_c = Complex64::new(dt, 0.0);
    let half = Complex64::new(0.5, 0.0);
    let sixth = Complex64::new(1.0 / 6.0, 0.0);
    let two = Complex64::new(2.0, 0.0);

    let k1 = f(y);
    let k2 = f(&(y + &(&k1 * (half * dt_c))));
    let k3 = f(&(y + &(&k2 * (half * dt_c))));
    let k4 = f(&(y + &(&k3 * dt_c)));

    y + &((k1 + k2 * two + k3 * two + k4) * (sixth * dt_c))
}

fn conjugate_transpose(m: &Array2<Complex64>) -> Array2<Complex64> {
    m.t().mapv(|z| z.conj())
}

/// Deterministic master-equation solver.
#[derive(Debug, Clone)]
pub struct MeSolver {
    substeps: u64,
}

impl MeSolver {
    pub fn new(substeps: u64) -> Self {
        Self {
            substeps: substeps.max(1),
        }
    }

    pub fn substeps(&self) -> u64 {
        self.substeps
    }
}

impl Default for MeSolver {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSTEPS)
    }
}

impl Solver for MeSolver {
    fn name(&self) -> &str {
        "mesolve"
    }

    fn kind(&self) -> SolverKind {
        SolverKind::Deterministic
    }

    fn solve(&self, request: SolveRequest) -> Result<SolverResult, SolverError> {
        request.check()?;
        let substeps = request.option_u64("substeps", self.substeps)?.max(1);

        let initial = request.initial.data();
        let mut state = if initial.ncols() == 1 && !request.c_ops.is_empty() {
            initial.dot(&conjugate_transpose(initial))
        } else {
            initial.clone()
        };
        let is_ket = state.ncols() == 1;

        let n = request.tlist.len();
        let mut states = Vec::with_capacity(n);
        let mut expect = vec![Vec::with_capacity(n); request.e_ops.len()];
        let dims = request.generator.dims().to_vec();
        let mut record = |state: &Array2<Complex64>| {
            for (row, e) in expect.iter_mut().zip(&request.e_ops) {
                row.push(expectation(e.data(), state));
            }
            states.push(Operator::from_matrix(state.clone()));
        };
        record(&state);

        let minus_i = Complex64::new(0.0, -1.0);
        for w in request.tlist.windows(2) {
            let h = (w[1] - w[0]) / substeps as f64;
            for j in 0..substeps {
                let t = w[0] + (j as f64 + 0.5) * h;
                let ham = request.generator.at(t).into_data();
                state = if is_ket {
                    rk4_step(&state, h, |psi| ham.dot(psi) * minus_i)
                } else {
                    let channels: Vec<Channel> = request
                        .c_ops
                        .iter()
                        .map(|c| Channel::new(c.at(t).into_data()))
                        .collect();
                    rk4_step(&state, h, |rho| lindblad_rhs(&ham, &channels, rho))
                };
            }
            ensure_finite(&state, w[1])?;
            record(&state);
        }

        debug!(
            dims = ?dims,
            points = n,
            substeps,
            collapse = request.c_ops.len(),
            final_purity = if is_ket { 1.0 } else { purity(&state) },
            "mesolve finished"
        );

        Ok(SolverResult {
            solver: self.name().to_string(),
            times: request.tlist,
            states,
            expect,
            num_trajectories: None,
        })
    }
}
