// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Gate-level circuit description.
//!
//! A circuit is only carried to [`crate::processor::DeviceModel::load_circuit`];
//! turning gates into pulses is the job of a device-specific compiler.

use std::fmt;

/// One gate application.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    /// Gate name (e.g., "rx", "cnot").
    pub name: String,

    /// Target subsystem indices.
    pub targets: Vec<usize>,

    /// Gate parameters (e.g., rotation angle).
    pub parameters: Vec<f64>,
}

impl Gate {
    pub fn new(name: impl Into<String>, targets: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            targets,
            parameters: Vec::new(),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<f64>) -> Self {
        self.parameters = parameters;
        self
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets = self
            .targets
            .iter()
            .map(|q| format!("q{}", q))
            .collect::<Vec<_>>()
            .join(", ");
        if self.parameters.is_empty() {
            write!(f, "{} {}", self.name, targets)
        } else {
            let params: Vec<String> =
                self.parameters.iter().map(|p| format!("{:.4}", p)).collect();
            write!(f, "{}({}) {}", self.name, params.join(", "), targets)
        }
    }
}

/// Ordered gate sequence on `num_subsystems` subsystems.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Circuit {
    pub num_subsystems: usize,
    pub gates: Vec<Gate>,
}

impl Circuit {
    pub fn new(num_subsystems: usize) -> Self {
        Self {
            num_subsystems,
            gates: Vec::new(),
        }
    }

    pub fn add_gate(&mut self, gate: Gate) -> &mut Self {
        self.gates.push(gate);
        self
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_display() {
        let x = Gate::new("x", vec![0]);
        assert_eq!(x.to_string(), "x q0");

        let rx = Gate::new("rx", vec![1]).with_parameters(vec![std::f64::consts::PI]);
        assert_eq!(rx.to_string(), "rx(3.1416) q1");

        let cnot = Gate::new("cnot", vec![0, 2]);
        assert_eq!(cnot.to_string(), "cnot q0, q2");
    }

    #[test]
    fn test_circuit_builder() {
        let mut qc = Circuit::new(2);
        assert!(qc.is_empty());
        qc.add_gate(Gate::new("h", vec![0]))
            .add_gate(Gate::new("cnot", vec![0, 1]));
        assert_eq!(qc.len(), 2);
        assert_eq!(qc.gates[1].name, "cnot");
    }
}
