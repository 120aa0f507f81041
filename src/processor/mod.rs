// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! The processor: pulses, drift and noise of one device, and the
//! operations that turn them into propagators or solver runs.
//!
//! Pulses are validated lazily, right before coefficient export,
//! generator assembly, the analytical path and file persistence. Mutating
//! operations never validate sampled coefficients.

pub mod analytical;
pub mod io;
pub mod model;

use std::collections::BTreeMap;
use std::sync::Arc;

use ndarray::{Array2, ArrayView1};
use rand::Rng;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::circuit::Circuit;
use crate::config::{Config, ResourceLimits, SolverConfig};
use crate::error::{Error, Result, ValidationError};
use crate::generator::{assemble, CompositeGenerator};
use crate::noise::{process_noise, Coherence, Noise, NoiseContext, NoisyPulses};
use crate::operator::{check_targets, Operator};
use crate::pulse::{
    merge_tlists, resample_pulse, Coefficient, Drift, Pulse, SplineKind,
    DEFAULT_TLIST_TOLERANCE,
};
use crate::solver::{SolveOptions, SolveRequest, SolverRegistry, SolverResult};
use crate::validation::{validate_pulses, validate_resource_limits};

pub use io::{read_coeffs, write_coeffs, CoeffTable};
pub use model::{DeviceModel, IdealModel};

/// Argument keys the processor computes itself.
const RESERVED_KEYS: [&str; 2] = ["H", "tlist"];

/// Which pulses [`Processor::remove_pulse`] removes.
#[derive(Debug, Clone, PartialEq)]
pub enum PulseSelector {
    Index(usize),
    Indices(Vec<usize>),
    /// Every pulse carrying this label.
    Label(String),
}

impl From<usize> for PulseSelector {
    fn from(i: usize) -> Self {
        PulseSelector::Index(i)
    }
}

impl From<Vec<usize>> for PulseSelector {
    fn from(v: Vec<usize>) -> Self {
        PulseSelector::Indices(v)
    }
}

impl From<&str> for PulseSelector {
    fn from(label: &str) -> Self {
        PulseSelector::Label(label.to_string())
    }
}

/// Grids for [`Processor::set_all_tlist`].
#[derive(Debug, Clone, PartialEq)]
pub enum TlistAssignment {
    /// The same grid for every pulse.
    Broadcast(Vec<f64>),
    /// One grid per pulse, in pulse order.
    PerPulse(Vec<Vec<f64>>),
}

impl From<Vec<f64>> for TlistAssignment {
    fn from(t: Vec<f64>) -> Self {
        TlistAssignment::Broadcast(t)
    }
}

impl From<Vec<Vec<f64>>> for TlistAssignment {
    fn from(t: Vec<Vec<f64>>) -> Self {
        TlistAssignment::PerPulse(t)
    }
}

/// Options of [`Processor::run_state`].
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Use piecewise-constant propagators instead of a solver.
    pub analytical: bool,
    /// Include noise (device noise, coherent noise and collapse terms).
    pub noisy: bool,
    /// Registered solver name; the registry default if `None`.
    pub solver: Option<String>,
    /// Collapse and expectation operators, arguments and solver options.
    pub solve: SolveOptions,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            analytical: false,
            noisy: true,
            solver: None,
            solve: SolveOptions::default(),
        }
    }
}

impl RunOptions {
    pub fn analytical() -> Self {
        Self {
            analytical: true,
            ..Self::default()
        }
    }

    pub fn with_solver(mut self, name: impl Into<String>) -> Self {
        self.solver = Some(name.into());
        self
    }

    pub fn with_noisy(mut self, noisy: bool) -> Self {
        self.noisy = noisy;
        self
    }

    pub fn with_solve_options(mut self, solve: SolveOptions) -> Self {
        self.solve = solve;
        self
    }
}

/// Result of [`Processor::run_state`].
#[derive(Debug, Clone)]
pub enum RunOutput {
    /// Accumulated states or propagators of the analytical path.
    Analytical(Vec<Operator>),
    /// Output of a registered solver.
    Solver(SolverResult),
}

impl RunOutput {
    pub fn final_state(&self) -> Option<&Operator> {
        match self {
            RunOutput::Analytical(states) => states.last(),
            RunOutput::Solver(result) => result.final_state(),
        }
    }
}

/// Pulse/noise assembly and evolution dispatch for one device.
#[derive(Debug)]
pub struct Processor {
    dims: Vec<usize>,
    t1: Option<Coherence>,
    t2: Option<Coherence>,
    pulses: Vec<Pulse>,
    drift: Drift,
    noise: Vec<Noise>,
    spline_kind: SplineKind,
    tol: f64,
    /// Only set through configuration or `with_limits`.
    limits: Option<ResourceLimits>,
    model: Box<dyn DeviceModel>,
    solvers: Arc<SolverRegistry>,
}

impl Processor {
    /// A processor on subsystems of dimensions `dims`.
    pub fn new(dims: Vec<usize>) -> Result<Self> {
        if dims.is_empty() {
            return Err(ValidationError::Field {
                field: "dims".into(),
                message: "a processor needs at least one subsystem".into(),
            }
            .into());
        }
        if let Some(d) = dims.iter().find(|&&d| d == 0) {
            return Err(ValidationError::Field {
                field: "dims".into(),
                message: format!("subsystem dimension must be positive, got {}", d),
            }
            .into());
        }
        Ok(Self {
            dims,
            t1: None,
            t2: None,
            pulses: Vec::new(),
            drift: Drift::new(),
            noise: Vec::new(),
            spline_kind: SplineKind::default(),
            tol: DEFAULT_TLIST_TOLERANCE,
            limits: None,
            model: Box::new(IdealModel),
            solvers: Arc::new(SolverRegistry::with_defaults(&SolverConfig::default())),
        })
    }

    /// A processor on `n` qubits.
    pub fn qubits(n: usize) -> Result<Self> {
        Self::new(vec![2; n])
    }

    /// Build a processor from the `device`, `solver` and `validation`
    /// sections of a configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let device = &config.device;
        let dims = device.resolved_dims();
        validate_resource_limits(&dims, 0, &config.validation.limits)?;

        let mut processor = Self::new(dims.clone())?
            .with_tolerance(config.validation.tlist_tolerance)
            .with_limits(config.validation.limits.clone())
            .with_solvers(Arc::new(SolverRegistry::with_defaults(&config.solver)));
        processor.spline_kind = device.resolved_spline_kind()?;
        processor.set_t1(device.t1.clone())?;
        processor.set_t2(device.t2.clone())?;

        for term in &device.drift {
            processor.add_drift(term.operator(&dims)?, &term.targets, term.cyclic)?;
        }
        for term in &device.controls {
            let start = processor.pulses.len();
            processor.add_control(
                term.operator(&dims)?,
                &term.targets,
                term.cyclic,
                term.label.as_deref(),
            )?;
            for pulse in &mut processor.pulses[start..] {
                pulse.tlist = term.tlist.clone();
                if let Some(coeff) = &term.coeff {
                    pulse.coeff = Coefficient::Sampled(coeff.clone());
                }
            }
        }

        info!(
            dims = ?processor.dims,
            pulses = processor.pulses.len(),
            drift_terms = processor.drift.terms().len(),
            spline_kind = %processor.spline_kind,
            "Processor built from configuration"
        );
        Ok(processor)
    }

    pub fn with_model(mut self, model: Box<dyn DeviceModel>) -> Self {
        self.model = model;
        self
    }

    /// Share a solver registry with other processors.
    pub fn with_solvers(mut self, solvers: Arc<SolverRegistry>) -> Self {
        self.solvers = solvers;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Enforce `limits` on every exported generator.
    pub fn with_limits(mut self, limits: ResourceLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn num_subsystems(&self) -> usize {
        self.dims.len()
    }

    /// Alias of [`Processor::num_subsystems`].
    pub fn num_qubits(&self) -> usize {
        self.num_subsystems()
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    /// Direct access to one pulse. Changing its kind here overrides the
    /// processor-wide kind for this pulse only.
    pub fn pulse_mut(&mut self, index: usize) -> Result<&mut Pulse> {
        let len = self.pulses.len();
        self.pulses
            .get_mut(index)
            .ok_or_else(|| Error::Lookup(format!("pulse index {} out of range ({})", index, len)))
    }

    pub fn drift(&self) -> &Drift {
        &self.drift
    }

    pub fn noise(&self) -> &[Noise] {
        &self.noise
    }

    pub fn t1(&self) -> Option<&Coherence> {
        self.t1.as_ref()
    }

    pub fn t2(&self) -> Option<&Coherence> {
        self.t2.as_ref()
    }

    pub fn model(&self) -> &dyn DeviceModel {
        self.model.as_ref()
    }

    pub fn solvers(&self) -> &Arc<SolverRegistry> {
        &self.solvers
    }

    pub fn tolerance(&self) -> f64 {
        self.tol
    }

    pub fn limits(&self) -> Option<&ResourceLimits> {
        self.limits.as_ref()
    }

    // ------------------------------------------------------------------
    // Terms and pulses
    // ------------------------------------------------------------------

    /// Add a time-independent term. With `cyclic`, add it on every
    /// rotation `(t + i) mod N` of `targets`.
    pub fn add_drift(&mut self, op: Operator, targets: &[usize], cyclic: bool) -> Result<()> {
        let placements = self.placements(&op, targets, cyclic)?;
        for targets in placements {
            debug!(targets = ?targets, "Adding drift term");
            self.drift.add(op.clone(), targets);
        }
        Ok(())
    }

    /// Add a control pulse (no grid, coefficient `Off`). With `cyclic`, add
    /// one pulse per rotation of `targets`, all with the same label.
    pub fn add_control(
        &mut self,
        op: Operator,
        targets: &[usize],
        cyclic: bool,
        label: Option<&str>,
    ) -> Result<()> {
        let placements = self.placements(&op, targets, cyclic)?;
        for targets in placements {
            debug!(targets = ?targets, label = ?label, "Adding control");
            let mut pulse = Pulse::new(op.clone(), targets).with_spline_kind(self.spline_kind);
            pulse.label = label.map(str::to_string);
            self.pulses.push(pulse);
        }
        Ok(())
    }

    /// Append a pulse. A pulse without its own kind takes the processor's.
    pub fn add_pulse(&mut self, mut pulse: Pulse) -> Result<()> {
        check_targets(&pulse.targets, self.num_subsystems())?;
        if pulse.spline_kind.is_none() {
            pulse.spline_kind = Some(self.spline_kind);
        }
        self.pulses.push(pulse);
        Ok(())
    }

    /// Remove pulses and return how many were removed.
    ///
    /// Indices are removed highest first; a label removes every match.
    pub fn remove_pulse(&mut self, selector: impl Into<PulseSelector>) -> Result<usize> {
        match selector.into() {
            PulseSelector::Label(label) => {
                let before = self.pulses.len();
                self.pulses.retain(|p| p.label.as_deref() != Some(label.as_str()));
                let removed = before - self.pulses.len();
                debug!(label = %label, removed, "Removed pulses by label");
                Ok(removed)
            }
            PulseSelector::Index(i) => self.remove_indices(vec![i]),
            PulseSelector::Indices(indices) => self.remove_indices(indices),
        }
    }

    fn remove_indices(&mut self, mut indices: Vec<usize>) -> Result<usize> {
        indices.sort_unstable();
        indices.dedup();
        if let Some(&bad) = indices.iter().find(|&&i| i >= self.pulses.len()) {
            return Err(Error::Lookup(format!(
                "pulse index {} out of range ({} pulse(s))",
                bad,
                self.pulses.len()
            )));
        }
        for &i in indices.iter().rev() {
            self.pulses.remove(i);
        }
        debug!(removed = indices.len(), "Removed pulses by index");
        Ok(indices.len())
    }

    /// First pulse with this label.
    pub fn find_pulse(&self, label: &str) -> Result<&Pulse> {
        self.pulses
            .iter()
            .find(|p| p.label.as_deref() == Some(label))
            .ok_or_else(|| Error::Lookup(format!("no pulse labelled '{}'", label)))
    }

    pub fn find_pulse_mut(&mut self, label: &str) -> Result<&mut Pulse> {
        self.pulses
            .iter_mut()
            .find(|p| p.label.as_deref() == Some(label))
            .ok_or_else(|| Error::Lookup(format!("no pulse labelled '{}'", label)))
    }

    pub fn set_all_tlist(&mut self, assignment: impl Into<TlistAssignment>) -> Result<()> {
        match assignment.into() {
            TlistAssignment::Broadcast(tlist) => {
                for pulse in &mut self.pulses {
                    pulse.tlist = Some(tlist.clone());
                }
            }
            TlistAssignment::PerPulse(tlists) => {
                if tlists.len() != self.pulses.len() {
                    return Err(ValidationError::Field {
                        field: "tlist".into(),
                        message: format!(
                            "got {} grid(s) for {} pulse(s)",
                            tlists.len(),
                            self.pulses.len()
                        ),
                    }
                    .into());
                }
                for (pulse, tlist) in self.pulses.iter_mut().zip(tlists) {
                    pulse.tlist = Some(tlist);
                }
            }
        }
        Ok(())
    }

    /// Set the kind of the processor and of every pulse it owns.
    pub fn set_spline_kind(&mut self, kind: SplineKind) {
        self.spline_kind = kind;
        for pulse in &mut self.pulses {
            pulse.spline_kind = Some(kind);
        }
    }

    pub fn spline_kind(&self) -> SplineKind {
        self.spline_kind
    }

    /// Deprecated spelling of [`Processor::set_spline_kind`]:
    /// `"discrete"` is `step_func`, `"continuous"` is `cubic`.
    pub fn set_pulse_mode(&mut self, mode: &str) -> Result<()> {
        warn!(mode, "set_pulse_mode is deprecated, use set_spline_kind");
        let kind = SplineKind::from_pulse_mode(mode)?;
        self.set_spline_kind(kind);
        Ok(())
    }

    pub fn set_t1(&mut self, t1: Option<Coherence>) -> Result<()> {
        if let Some(c) = &t1 {
            c.check_len("t1", self.num_subsystems())?;
        }
        self.t1 = t1;
        Ok(())
    }

    pub fn set_t2(&mut self, t2: Option<Coherence>) -> Result<()> {
        if let Some(c) = &t2 {
            c.check_len("t2", self.num_subsystems())?;
        }
        self.t2 = t2;
        Ok(())
    }

    /// Append a noise specification.
    pub fn add_noise(&mut self, noise: impl Into<Noise>) -> Result<()> {
        let noise = noise.into();
        let n = self.num_subsystems();
        match &noise {
            Noise::Relaxation(r) => {
                if let Some(t) = &r.targets {
                    check_targets(t, n)?;
                }
            }
            Noise::Decoherence(d) => {
                if let Some(t) = &d.targets {
                    check_targets(t, n)?;
                }
            }
            Noise::ControlAmplitude(_) | Noise::Random(_) => {}
        }
        debug!(noise = noise.name(), "Adding noise");
        self.noise.push(noise);
        Ok(())
    }

    /// True if any noise is configured, including T1/T2.
    pub fn has_noise(&self) -> bool {
        !self.noise.is_empty() || self.t1.is_some() || self.t2.is_some()
    }

    // ------------------------------------------------------------------
    // Derived data
    // ------------------------------------------------------------------

    /// Canonical grid of the current pulses.
    pub fn get_full_tlist(&self) -> Option<Vec<f64>> {
        merge_tlists(self.pulses.iter().filter_map(|p| p.tlist.as_deref()), self.tol)
    }

    /// Every pulse's coefficient on the canonical grid, shape
    /// `(pulses, grid points)`.
    ///
    /// The grid axis is empty when no pulse has a grid.
    pub fn get_full_coeffs(&self) -> Result<Array2<f64>> {
        validate_pulses(&self.pulses)?;
        let grid = self.get_full_tlist().unwrap_or_default();
        let mut coeffs = Array2::zeros((self.pulses.len(), grid.len()));
        if grid.is_empty() {
            return Ok(coeffs);
        }
        for (i, (pulse, mut row)) in self.pulses.iter().zip(coeffs.rows_mut()).enumerate() {
            let values = resample_pulse(pulse, i, &grid, self.tol)?;
            row.assign(&ArrayView1::from(&values));
        }
        Ok(coeffs)
    }

    /// Full-space operators of every pulse.
    pub fn ctrls(&self) -> Result<Vec<Operator>> {
        self.pulses
            .iter()
            .map(|p| p.full_operator(&self.dims))
            .collect()
    }

    pub fn coeffs(&self) -> Vec<&Coefficient> {
        self.pulses.iter().map(|p| &p.coeff).collect()
    }

    /// Replace every pulse's coefficient, in pulse order.
    pub fn set_coeffs(&mut self, coeffs: Vec<Coefficient>) -> Result<()> {
        if coeffs.len() != self.pulses.len() {
            return Err(ValidationError::Field {
                field: "coeffs".into(),
                message: format!(
                    "got {} coefficient(s) for {} pulse(s)",
                    coeffs.len(),
                    self.pulses.len()
                ),
            }
            .into());
        }
        for (pulse, coeff) in self.pulses.iter_mut().zip(coeffs) {
            pulse.coeff = coeff;
        }
        Ok(())
    }

    /// Label of every pulse, in pulse order.
    pub fn operator_labels(&self) -> Vec<Option<&str>> {
        self.pulses.iter().map(|p| p.label.as_deref()).collect()
    }

    // ------------------------------------------------------------------
    // Noise and assembly
    // ------------------------------------------------------------------

    /// Ideal pulses plus coherent noise (and drift, if `drift`), with the
    /// collapse terms of device noise if `device_noise`.
    ///
    /// Works on a copy; the stored pulses are never touched.
    pub fn get_noisy_pulses(&self, device_noise: bool, drift: bool) -> Result<NoisyPulses> {
        self.get_noisy_pulses_with_rng(device_noise, drift, &mut rand::thread_rng())
    }

    pub fn get_noisy_pulses_with_rng<R: Rng + ?Sized>(
        &self,
        device_noise: bool,
        drift: bool,
        rng: &mut R,
    ) -> Result<NoisyPulses> {
        let ctx = NoiseContext {
            dims: &self.dims,
            t1: self.t1.as_ref(),
            t2: self.t2.as_ref(),
            spline_kind: self.spline_kind,
            drift: drift.then_some(&self.drift),
            device_noise,
            max_points: self.limits.as_ref().map(|l| l.max_time_steps as usize),
        };
        process_noise(self.pulses.clone(), &self.noise, &ctx, rng)
    }

    /// Composite generator and collapse generators on the canonical grid.
    ///
    /// `args` are merged into the generator's argument map. The collapse
    /// list is empty unless `noisy`.
    pub fn export_generator(
        &self,
        noisy: bool,
        args: Option<&BTreeMap<String, Value>>,
    ) -> Result<(CompositeGenerator, Vec<CompositeGenerator>)> {
        self.export_generator_with_rng(noisy, args, &mut rand::thread_rng())
    }

    pub fn export_generator_with_rng<R: Rng + ?Sized>(
        &self,
        noisy: bool,
        args: Option<&BTreeMap<String, Value>>,
        rng: &mut R,
    ) -> Result<(CompositeGenerator, Vec<CompositeGenerator>)> {
        if let Some(args) = args {
            check_reserved(args.keys().map(String::as_str), "args")?;
        }
        validate_pulses(&self.pulses)?;

        let system = if noisy {
            let NoisyPulses { pulses, collapse } = self.get_noisy_pulses_with_rng(true, true, rng)?;
            assemble(&pulses, None, &collapse, &self.dims, self.tol)?
        } else {
            assemble(&self.pulses, Some(&self.drift), &[], &self.dims, self.tol)?
        };
        if let Some(limits) = &self.limits {
            validate_resource_limits(&self.dims, system.tlist().map_or(0, <[f64]>::len), limits)?;
        }

        let mut generator = system.generator;
        if let Some(args) = args {
            for (k, v) in args {
                generator.set_arg(k.clone(), v.clone());
            }
        }
        Ok((generator, system.collapse))
    }

    // ------------------------------------------------------------------
    // Evolution
    // ------------------------------------------------------------------

    /// Piecewise-constant propagators of the ideal generator, seeded with
    /// `init` if given. Noise is never applied here.
    pub fn run_analytically(&self, init: Option<&Operator>) -> Result<Vec<Operator>> {
        let (generator, _) = self.export_generator(false, None)?;
        analytical::evolve(&generator, init, self.model.as_ref())
    }

    /// Load `circuit` (if given), then run analytically without a seed.
    pub fn run(&mut self, circuit: Option<&Circuit>) -> Result<Vec<Operator>> {
        if let Some(circuit) = circuit {
            self.load_circuit(circuit)?;
        }
        self.run_analytically(None)
    }

    /// Evolve `init`, analytically or with a registered solver.
    pub fn run_state(&self, init: &Operator, options: RunOptions) -> Result<RunOutput> {
        if options.analytical {
            if !options.solve.is_empty() || self.has_noise() {
                return Err(Error::Usage(
                    "analytical evolution applies neither noise nor solver options; \
                     remove them or run with a solver"
                        .into(),
                ));
            }
            return self.run_analytically(Some(init)).map(RunOutput::Analytical);
        }

        let SolveOptions {
            c_ops,
            e_ops,
            args,
            extra,
        } = options.solve;
        check_reserved(extra.keys().map(String::as_str), "solver options")?;

        let (generator, internal) = self.export_generator(options.noisy, Some(&args))?;
        let tlist = generator
            .tlist()
            .ok_or_else(|| ValidationError::Field {
                field: "tlist".into(),
                message: "a solver run needs at least one pulse with a time grid".into(),
            })?
            .to_vec();

        let mut collapse = Vec::with_capacity(c_ops.len() + internal.len());
        for c in &c_ops {
            collapse.push(match c.tlist() {
                Some(_) => c.resampled(&tlist)?,
                None => c.clone(),
            });
        }
        collapse.extend(internal);

        let solver = self.solvers.get_or_default(options.solver.as_deref())?;
        info!(
            solver = solver.name(),
            kind = %solver.kind(),
            points = tlist.len(),
            collapse = collapse.len(),
            noisy = options.noisy,
            "Dispatching to solver"
        );

        let result = solver.solve(SolveRequest {
            generator,
            initial: init.clone(),
            tlist,
            c_ops: collapse,
            e_ops,
            options: extra,
        })?;
        Ok(RunOutput::Solver(result))
    }

    /// Replace the pulses with those the device model compiles for
    /// `circuit`.
    pub fn load_circuit(&mut self, circuit: &Circuit) -> Result<()> {
        let mut pulses = self.model.load_circuit(circuit, &self.dims)?;
        for pulse in &mut pulses {
            check_targets(&pulse.targets, self.num_subsystems())?;
            if pulse.spline_kind.is_none() {
                pulse.spline_kind = Some(self.spline_kind);
            }
        }
        info!(
            model = self.model.name(),
            gates = circuit.len(),
            pulses = pulses.len(),
            "Loaded circuit"
        );
        self.pulses = pulses;
        Ok(())
    }

    pub fn eliminate_auxiliary_modes(&self, u: Operator) -> Result<Operator> {
        self.model.eliminate_auxiliary_modes(u)
    }

    /// Global phase of the model as an operator on the full space.
    pub fn global_phase_operator(&self) -> Operator {
        Operator::global_phase(self.model.global_phase(), &self.dims)
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Target lists of a Hermitian term, one per cyclic rotation if
    /// `cyclic`.
    fn placements(&self, op: &Operator, targets: &[usize], cyclic: bool) -> Result<Vec<Vec<usize>>> {
        if !op.is_hermitian() {
            return Err(Error::Type(format!(
                "{} is not Hermitian; drift and control terms must be",
                op
            )));
        }
        let n = self.num_subsystems();
        check_targets(targets, n)?;

        let rotations = if cyclic { n } else { 1 };
        let mut out = Vec::with_capacity(rotations);
        for i in 0..rotations {
            let rotated: Vec<usize> = targets.iter().map(|t| (t + i) % n).collect();
            let expected: usize = rotated.iter().map(|&t| self.dims[t]).product();
            if op.dim() != expected {
                return Err(Error::Type(format!(
                    "{} does not fit targets {:?} of dimension {}",
                    op, rotated, expected
                )));
            }
            out.push(rotated);
        }
        Ok(out)
    }
}

fn check_reserved<'a>(mut keys: impl Iterator<Item = &'a str>, what: &str) -> Result<()> {
    match keys.find(|k| RESERVED_KEYS.contains(k)) {
        Some(key) => Err(Error::Usage(format!(
            "'{}' in {} is computed by the processor and cannot be given",
            key, what
        ))),
        None => Ok(()),
    }
}
