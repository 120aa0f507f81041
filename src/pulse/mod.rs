// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Control pulses, the drift, and their time discretization.
//!
//! - [`types`]: [`Pulse`], [`Drift`], [`Coefficient`], [`SplineKind`]
//! - [`grid`]: canonical grid construction
//! - [`resample`]: coefficient projection onto a canonical grid
//! - [`spline`]: not-a-knot cubic interpolation

pub mod grid;
pub mod resample;
pub mod spline;
pub mod types;

pub use grid::{merge_tlists, DEFAULT_TLIST_TOLERANCE};
pub use resample::{resample_pulse, resample_samples};
pub use types::{Coefficient, Drift, DriftTerm, Pulse, SplineKind};
