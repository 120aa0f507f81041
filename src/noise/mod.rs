// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Noise models and the noise pipeline.
//!
//! Device noise (relaxation, decoherence) becomes collapse terms;
//! coherent noise (control amplitude errors, random fluctuations) becomes
//! extra pulses. The pipeline always works on a copy of the processor's
//! pulses.

pub mod pipeline;
pub mod relaxation;
pub mod types;

pub use pipeline::{process_noise, NoiseContext, MAX_NOISE_POINTS};
pub use types::{
    AmplitudeError, Coherence, ControlAmpNoise, DecoherenceNoise, Noise, NoiseDistribution,
    NoisyPulses, RandomNoise, RelaxationNoise,
};
