// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite generators and their assembly from pulses.

pub mod assemble;
pub mod types;

pub use assemble::{assemble, AssembledSystem};
pub use types::{CompositeGenerator, GeneratorTerm};
