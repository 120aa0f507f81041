// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! QubitOS device processor
//!
//! Pulse-level model of a quantum device: control pulses, drift and noise
//! are assembled into one time-dependent generator on a canonical time
//! grid, then evolved analytically or handed to a registered solver.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Processor                  │
//! │  pulses · drift · noise · device model   │
//! ├──────────────────┬──────────────────────┤
//! │  Noise pipeline  │  Generator assembly  │
//! ├──────────────────┴──────────────────────┤
//! │  Analytical path │   Solver registry    │
//! │  (expm per step) │  mesolve · mcsolve   │
//! └──────────────────┴──────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`processor`]: the processor and its run paths
//! - [`pulse`]: pulses, time grids and coefficient resampling
//! - [`noise`]: noise specifications and the noise pipeline
//! - [`generator`]: composite generators
//! - [`solver`]: solver trait, registry and built-in solvers
//! - [`config`]: configuration management
//! - [`validation`]: input validation utilities
//! - [`error`]: error types

pub mod circuit;
pub mod config;
pub mod error;
pub mod generator;
pub mod noise;
pub mod operator;
pub mod processor;
pub mod pulse;
pub mod solver;
pub mod validation;

pub use circuit::{Circuit, Gate};
pub use config::Config;
pub use error::{Error, Result};
pub use generator::CompositeGenerator;
pub use operator::Operator;
pub use processor::{Processor, RunOptions, RunOutput};
pub use pulse::{Coefficient, Pulse, SplineKind};

#[cfg(test)]
pub mod test_utils;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
