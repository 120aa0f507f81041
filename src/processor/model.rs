// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Device capabilities.
//!
//! A [`DeviceModel`] supplies what a concrete device adds on top of the
//! generic processor: compiling circuits into pulses, projecting
//! propagators off auxiliary modes, and a global phase correction.
//! The model is chosen when the processor is built.

use std::fmt;

use crate::circuit::Circuit;
use crate::error::{Error, Result};
use crate::operator::Operator;
use crate::pulse::Pulse;

/// Capability hooks of a concrete device.
pub trait DeviceModel: Send + Sync + fmt::Debug {
    /// Model name, for logs.
    fn name(&self) -> &str;

    /// Compile `circuit` into the pulses that implement it on a device
    /// with subsystem dimensions `dims`.
    fn load_circuit(&self, circuit: &Circuit, dims: &[usize]) -> Result<Vec<Pulse>> {
        let _ = (circuit, dims);
        Err(Error::NotImplemented(format!(
            "device model '{}' cannot compile circuits",
            self.name()
        )))
    }

    /// Remove auxiliary degrees of freedom (cavity, leakage levels) from a
    /// step propagator.
    fn eliminate_auxiliary_modes(&self, u: Operator) -> Result<Operator> {
        Ok(u)
    }

    /// Global phase accumulated by the last compiled circuit.
    fn global_phase(&self) -> f64 {
        0.0
    }
}

/// The bare processor: no compiler, no auxiliary modes, no phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdealModel;

impl DeviceModel for IdealModel {
    fn name(&self) -> &str {
        "ideal"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_model_defaults() {
        let model = IdealModel;
        assert_eq!(model.name(), "ideal");
        assert_eq!(model.global_phase(), 0.0);

        let u = Operator::sigmax();
        assert_eq!(model.eliminate_auxiliary_modes(u.clone()).unwrap(), u);

        let err = model.load_circuit(&Circuit::new(1), &[2]).unwrap_err();
        assert!(matches!(err, Error::NotImplemented(_)));
        assert!(err.to_string().contains("ideal"));
    }
}
