// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum-jump Monte Carlo solver.
//!
//! Each trajectory evolves a ket under the effective non-Hermitian
//! generator `H_eff = H − (i/2) Σ_k L_k†L_k`. After every step the norm
//! loss `dp` is compared with a uniform draw: a jump applies one `L_k`,
//! chosen with probability proportional to `‖L_k ψ‖²`, otherwise the
//! state is renormalized. Recorded states are trajectory-averaged density
//! matrices. The `max_state_bytes` option caps their allocation.
//!
//! Ref: Dalibard, Castin & Mølmer, PRL 68, 580 (1992).

use ndarray::Array2;
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

use super::mesolve::{rk4_step, Channel, DEFAULT_SUBSTEPS};
use super::{ensure_finite, expectation, SolveRequest, Solver, SolverKind, SolverResult};
use crate::error::SolverError;
use crate::operator::Operator;

/// Default number of trajectories.
pub const DEFAULT_NTRAJ: u64 = 500;

/// Monte Carlo trajectory solver.
#[derive(Debug, Clone)]
pub struct McSolver {
    ntraj: u64,
    substeps: u64,
    seed: Option<u64>,
}

impl McSolver {
    pub fn new(ntraj: u64, substeps: u64, seed: Option<u64>) -> Self {
        Self {
            ntraj: ntraj.max(1),
            substeps: substeps.max(1),
            seed,
        }
    }

    pub fn ntraj(&self) -> u64 {
        self.ntraj
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
}

impl Default for McSolver {
    fn default() -> Self {
        Self::new(DEFAULT_NTRAJ, DEFAULT_SUBSTEPS, None)
    }
}

impl Solver for McSolver {
    fn name(&self) -> &str {
        "mcsolve"
    }

    fn kind(&self) -> SolverKind {
        SolverKind::Stochastic
    }

    fn solve(&self, request: SolveRequest) -> Result<SolverResult, SolverError> {
        request.check()?;
        if request.initial.data().ncols() != 1 {
            return Err(SolverError::InvalidInput(
                "mcsolve needs a ket as initial state".into(),
            ));
        }
        let substeps = request.option_u64("substeps", self.substeps)?.max(1);
        let seed = match request.options.get("seed") {
            Some(_) => Some(request.option_u64("seed", 0)?),
            None => self.seed,
        };
        let mut ntraj = request.option_u64("ntraj", self.ntraj)?.max(1);
        if request.c_ops.is_empty() && ntraj > 1 {
            debug!(ntraj, "No collapse generators, running a single trajectory");
            ntraj = 1;
        }

        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        let n = request.tlist.len();
        let d = request.generator.dim();
        let bytes = averaged_state_bytes(n, d)?;
        let cap = request.option_u64("max_state_bytes", u64::MAX)?;
        if bytes as u64 > cap {
            return Err(SolverError::InvalidInput(format!(
                "averaged states need {} bytes ({} points of {}x{}), above max_state_bytes={}",
                bytes, n, d, d, cap
            )));
        }
        debug!(points = n, dim = d, bytes, "Allocating averaged states");
        let mut averaged = vec![Array2::<Complex64>::zeros((d, d)); n];
        let weight = Complex64::new(1.0 / ntraj as f64, 0.0);
        let mut jumps = 0usize;

        for _ in 0..ntraj {
            let mut psi = request.initial.data().clone();
            accumulate(&mut averaged[0], &psi, weight);
            for (k, w) in request.tlist.windows(2).enumerate() {
                let h = (w[1] - w[0]) / substeps as f64;
                for j in 0..substeps {
                    let t = w[0] + (j as f64 + 0.5) * h;
                    if step(&request, &mut psi, t, h, &mut rng)? {
                        jumps += 1;
                    }
                }
                ensure_finite(&psi, w[1])?;
                accumulate(&mut averaged[k + 1], &psi, weight);
            }
        }

        let expect = request
            .e_ops
            .iter()
            .map(|e| averaged.iter().map(|rho| expectation(e.data(), rho)).collect())
            .collect();

        debug!(
            ntraj,
            substeps,
            jumps,
            collapse = request.c_ops.len(),
            "mcsolve finished"
        );

        Ok(SolverResult {
            solver: self.name().to_string(),
            times: request.tlist,
            states: averaged.into_iter().map(Operator::from_matrix).collect(),
            expect,
            num_trajectories: Some(ntraj as usize),
        })
    }
}

/// Size of `n` averaged `d×d` density matrices.
fn averaged_state_bytes(n: usize, d: usize) -> Result<usize, SolverError> {
    d.checked_mul(d)
        .and_then(|x| x.checked_mul(n))
        .and_then(|x| x.checked_mul(std::mem::size_of::<Complex64>()))
        .ok_or_else(|| {
            SolverError::InvalidInput(format!(
                "{} averaged {}x{} states do not fit in memory",
                n, d, d
            ))
        })
}

/// Advance one trajectory by `h`. Returns true if a jump occurred.
fn step<R: Rng + ?Sized>(
    request: &SolveRequest,
    psi: &mut Array2<Complex64>,
    t: f64,
    h: f64,
    rng: &mut R,
) -> Result<bool, SolverError> {
    let minus_i = Complex64::new(0.0, -1.0);
    let half = Complex64::new(0.5, 0.0);
    let channels: Vec<Channel> = request
        .c_ops
        .iter()
        .map(|c| Channel::new(c.at(t).into_data()))
        .collect();

    let mut h_eff = request.generator.at(t).into_data();
    for ch in &channels {
        h_eff = h_eff - ch.l_dag_l() * (Complex64::new(0.0, 1.0) * half);
    }

    let next = rk4_step(psi, h, |y| h_eff.dot(y) * minus_i);
    let kept = norm_sq(&next);
    let dp = 1.0 - kept;

    if !channels.is_empty() && rng.gen::<f64>() < dp {
        let weights: Vec<f64> = channels
            .iter()
            .map(|ch| norm_sq(&ch.op().dot(&*psi)))
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            warn!(t, "Jump drawn with vanishing jump weights, skipping");
            *psi = normalized(next, kept)?;
            return Ok(false);
        }
        let mut r = rng.gen::<f64>() * total;
        let mut chosen = channels.len() - 1;
        for (k, wk) in weights.iter().enumerate() {
            if r < *wk {
                chosen = k;
                break;
            }
            r -= wk;
        }
        let jumped = channels[chosen].op().dot(&*psi);
        *psi = normalized(jumped, weights[chosen])?;
        Ok(true)
    } else {
        *psi = normalized(next, kept)?;
        Ok(false)
    }
}

fn norm_sq(psi: &Array2<Complex64>) -> f64 {
    psi.iter().map(|z| z.norm_sqr()).sum()
}

fn normalized(psi: Array2<Complex64>, norm_sq: f64) -> Result<Array2<Complex64>, SolverError> {
    if norm_sq <= 0.0 || !norm_sq.is_finite() {
        return Err(SolverError::Diverged(format!(
            "trajectory norm collapsed to {}",
            norm_sq
        )));
    }
    Ok(psi * Complex64::new(1.0 / norm_sq.sqrt(), 0.0))
}

fn accumulate(rho: &mut Array2<Complex64>, psi: &Array2<Complex64>, weight: Complex64) {
    let outer = psi.dot(&psi.t().mapv(|z| z.conj()));
    rho.scaled_add(weight, &outer);
}
