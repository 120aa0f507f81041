// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the processor.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. processor.yaml file
//! 3. Environment variables (QUBITOS_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::noise::Coherence;
use crate::operator::Operator;
use crate::pulse::{SplineKind, DEFAULT_TLIST_TOLERANCE};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Device description
    #[serde(default)]
    pub device: DeviceConfig,

    /// Solver settings
    #[serde(default)]
    pub solver: SolverConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Validation settings
    #[serde(default)]
    pub validation: ValidationConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            for path in &[
                "processor.yaml",
                "processor.yml",
                "/etc/qubitos/processor.yaml",
            ] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("QUBITOS_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("QUBITOS_LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("QUBITOS_DEFAULT_SOLVER") {
            self.solver.default_solver = val;
        }
        if let Ok(val) = env::var("QUBITOS_SOLVER_SUBSTEPS") {
            if let Ok(n) = val.parse() {
                self.solver.substeps = n;
            }
        }
        if let Ok(val) = env::var("QUBITOS_SOLVER_NTRAJ") {
            if let Ok(n) = val.parse() {
                self.solver.ntraj = n;
            }
        }
        if let Ok(val) = env::var("QUBITOS_SOLVER_SEED") {
            if let Ok(seed) = val.parse() {
                self.solver.seed = Some(seed);
            }
        }
        if let Ok(val) = env::var("QUBITOS_TLIST_TOLERANCE") {
            if let Ok(tol) = val.parse() {
                self.validation.tlist_tolerance = tol;
            }
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.device.validate()?;

        if self.solver.substeps == 0 {
            return Err(Error::Config("solver.substeps cannot be 0".into()));
        }
        if self.solver.ntraj == 0 {
            return Err(Error::Config("solver.ntraj cannot be 0".into()));
        }
        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(Error::Config(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }
        let tol = self.validation.tlist_tolerance;
        if !tol.is_finite() || tol < 0.0 {
            return Err(Error::Config(format!(
                "validation.tlist_tolerance must be a non-negative number, got {}",
                tol
            )));
        }
        Ok(())
    }
}

/// An operator given by name, or a tensor product of names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OperatorSpec {
    Named(String),
    Product(Vec<String>),
}

impl OperatorSpec {
    /// Build the operator for subsystems of the given dimensions.
    pub fn build(&self, target_dims: &[usize]) -> Result<Operator> {
        match self {
            OperatorSpec::Named(name) => match target_dims {
                [d] => Operator::from_name(name, *d),
                _ => Err(Error::Config(format!(
                    "operator '{}' acts on one subsystem, got {} target(s)",
                    name,
                    target_dims.len()
                ))),
            },
            OperatorSpec::Product(names) => {
                if names.len() != target_dims.len() {
                    return Err(Error::Config(format!(
                        "operator product {:?} needs one target per factor, got {}",
                        names,
                        target_dims.len()
                    )));
                }
                let factors = names
                    .iter()
                    .zip(target_dims)
                    .map(|(name, &d)| Operator::from_name(name, d))
                    .collect::<Result<Vec<_>>>()?;
                Operator::tensor_all(&factors)
            }
        }
    }
}

/// One drift or control term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermConfig {
    pub op: OperatorSpec,

    pub targets: Vec<usize>,

    /// Repeat the term on every cyclic shift of the targets
    #[serde(default)]
    pub cyclic: bool,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub tlist: Option<Vec<f64>>,

    #[serde(default)]
    pub coeff: Option<Vec<f64>>,
}

impl TermConfig {
    /// Operator of this term on a device with subsystem dimensions `dims`.
    pub fn operator(&self, dims: &[usize]) -> Result<Operator> {
        let target_dims = self
            .targets
            .iter()
            .map(|&t| {
                dims.get(t).copied().ok_or_else(|| {
                    Error::Config(format!(
                        "target {} out of range for {} subsystem(s)",
                        t,
                        dims.len()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        self.op.build(&target_dims)
    }
}

/// Device description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Number of subsystems
    #[serde(default = "default_num_subsystems")]
    pub num_subsystems: usize,

    /// Per-subsystem dimensions (qubits if omitted)
    #[serde(default)]
    pub dims: Option<Vec<usize>>,

    #[serde(default)]
    pub t1: Option<Coherence>,

    #[serde(default)]
    pub t2: Option<Coherence>,

    #[serde(default)]
    pub spline_kind: Option<SplineKind>,

    /// Deprecated: use `spline_kind`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pulse_mode: Option<String>,

    #[serde(default)]
    pub drift: Vec<TermConfig>,

    #[serde(default)]
    pub controls: Vec<TermConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            num_subsystems: default_num_subsystems(),
            dims: None,
            t1: None,
            t2: None,
            spline_kind: None,
            pulse_mode: None,
            drift: Vec::new(),
            controls: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// Subsystem dimensions, defaulting to qubits.
    pub fn resolved_dims(&self) -> Vec<usize> {
        self.dims
            .clone()
            .unwrap_or_else(|| vec![2; self.num_subsystems])
    }

    /// Interpolation kind, honoring the deprecated `pulse_mode` key.
    pub fn resolved_spline_kind(&self) -> Result<SplineKind> {
        match (&self.spline_kind, &self.pulse_mode) {
            (Some(kind), Some(mode)) => {
                tracing::warn!(
                    pulse_mode = %mode,
                    spline_kind = %kind,
                    "device.pulse_mode is deprecated and ignored when spline_kind is set"
                );
                Ok(*kind)
            }
            (Some(kind), None) => Ok(*kind),
            (None, Some(mode)) => {
                tracing::warn!(
                    pulse_mode = %mode,
                    "device.pulse_mode is deprecated, use spline_kind instead"
                );
                SplineKind::from_pulse_mode(mode)
            }
            (None, None) => Ok(SplineKind::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.num_subsystems == 0 {
            return Err(Error::Config("device.num_subsystems cannot be 0".into()));
        }
        if let Some(dims) = &self.dims {
            if dims.len() != self.num_subsystems {
                return Err(Error::Config(format!(
                    "device.dims has {} entries for {} subsystem(s)",
                    dims.len(),
                    self.num_subsystems
                )));
            }
            if dims.iter().any(|&d| d == 0) {
                return Err(Error::Config("device.dims entries must be positive".into()));
            }
        }
        if let Some(t1) = &self.t1 {
            t1.check_len("device.t1", self.num_subsystems)?;
        }
        if let Some(t2) = &self.t2 {
            t2.check_len("device.t2", self.num_subsystems)?;
        }
        self.resolved_spline_kind()?;

        let dims = self.resolved_dims();
        for term in self.drift.iter().chain(&self.controls) {
            term.operator(&dims)?;
            if term.coeff.is_some() && term.tlist.is_none() {
                return Err(Error::Config(format!(
                    "term on {:?} has coeff but no tlist",
                    term.targets
                )));
            }
        }
        Ok(())
    }
}

fn default_num_subsystems() -> usize {
    1
}

/// Solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Solver used when a run does not name one
    #[serde(default = "default_solver")]
    pub default_solver: String,

    /// RK4 steps per grid interval
    #[serde(default = "default_substeps")]
    pub substeps: u64,

    /// Monte Carlo trajectories
    #[serde(default = "default_ntraj")]
    pub ntraj: u64,

    /// Seed for stochastic solvers (entropy if unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            default_solver: default_solver(),
            substeps: default_substeps(),
            ntraj: default_ntraj(),
            seed: None,
        }
    }
}

fn default_solver() -> String {
    "mesolve".into()
}

fn default_substeps() -> u64 {
    100
}

fn default_ntraj() -> u64 {
    500
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

/// Validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Points of merged grids closer than this are treated as one
    #[serde(default = "default_tlist_tolerance")]
    pub tlist_tolerance: f64,

    /// Resource limits
    #[serde(default)]
    pub limits: ResourceLimits,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            tlist_tolerance: default_tlist_tolerance(),
            limits: ResourceLimits::default(),
        }
    }
}

fn default_tlist_tolerance() -> f64 {
    DEFAULT_TLIST_TOLERANCE
}

/// Resource limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Maximum Hilbert space dimension
    #[serde(default = "default_max_hilbert_dim")]
    pub max_hilbert_dim: u32,

    /// Maximum subsystems
    #[serde(default = "default_max_subsystems")]
    pub max_subsystems: u32,

    /// Maximum canonical grid points
    #[serde(default = "default_max_time_steps")]
    pub max_time_steps: u32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_hilbert_dim: default_max_hilbert_dim(),
            max_subsystems: default_max_subsystems(),
            max_time_steps: default_max_time_steps(),
        }
    }
}

fn default_max_hilbert_dim() -> u32 {
    64
}

fn default_max_subsystems() -> u32 {
    6
}

fn default_max_time_steps() -> u32 {
    10_000
}
