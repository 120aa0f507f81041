// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Pulse and drift types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::operator::Operator;

/// Interpolation convention of a sampled coefficient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplineKind {
    /// Piecewise constant, value held until the next grid point.
    #[default]
    StepFunc,
    /// Not-a-knot cubic spline through the samples.
    Cubic,
}

impl SplineKind {
    /// Map a legacy pulse mode (`discrete` / `continuous`) to a kind.
    pub fn from_pulse_mode(mode: &str) -> Result<Self> {
        match mode {
            "discrete" => Ok(SplineKind::StepFunc),
            "continuous" => Ok(SplineKind::Cubic),
            other => Err(Error::Config(format!(
                "unknown pulse mode '{}', expected 'discrete' or 'continuous'",
                other
            ))),
        }
    }

    /// Legacy pulse-mode name for this kind.
    pub fn pulse_mode(&self) -> &'static str {
        match self {
            SplineKind::StepFunc => "discrete",
            SplineKind::Cubic => "continuous",
        }
    }
}

impl fmt::Display for SplineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplineKind::StepFunc => write!(f, "step_func"),
            SplineKind::Cubic => write!(f, "cubic"),
        }
    }
}

impl FromStr for SplineKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "step_func" => Ok(SplineKind::StepFunc),
            "cubic" => Ok(SplineKind::Cubic),
            other => Err(Error::Config(format!(
                "unknown spline kind '{}', expected 'step_func' or 'cubic'",
                other
            ))),
        }
    }
}

/// Time dependence of a pulse.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coefficient {
    /// No contribution.
    #[default]
    Off,
    /// Always on (`true`) or always off (`false`).
    Constant(bool),
    /// Samples on the pulse's time grid.
    Sampled(Vec<f64>),
}

impl Coefficient {
    pub fn is_sampled(&self) -> bool {
        matches!(self, Coefficient::Sampled(_))
    }

    pub fn as_sampled(&self) -> Option<&[f64]> {
        match self {
            Coefficient::Sampled(v) => Some(v),
            _ => None,
        }
    }

    /// True if the pulse contributes a constant term.
    pub fn is_always_on(&self) -> bool {
        matches!(self, Coefficient::Constant(true))
    }

    /// True if the pulse contributes nothing at any time.
    pub fn is_silent(&self) -> bool {
        matches!(self, Coefficient::Off | Coefficient::Constant(false))
    }
}

impl From<Vec<f64>> for Coefficient {
    fn from(v: Vec<f64>) -> Self {
        Coefficient::Sampled(v)
    }
}

impl From<bool> for Coefficient {
    fn from(b: bool) -> Self {
        Coefficient::Constant(b)
    }
}

/// One time-dependent term `c(t)·H` acting on a subset of subsystems.
#[derive(Debug, Clone, PartialEq)]
pub struct Pulse {
    /// Local operator, embedded at `targets` when assembled.
    pub op: Operator,
    /// Ordered subsystem indices.
    pub targets: Vec<usize>,
    /// Time grid, strictly increasing.
    pub tlist: Option<Vec<f64>>,
    pub coeff: Coefficient,
    /// Interpolation kind; `None` resolves to [`SplineKind::StepFunc`].
    pub spline_kind: Option<SplineKind>,
    pub label: Option<String>,
}

impl Pulse {
    /// A pulse with no grid and an `Off` coefficient.
    pub fn new(op: Operator, targets: Vec<usize>) -> Self {
        Self {
            op,
            targets,
            tlist: None,
            coeff: Coefficient::Off,
            spline_kind: None,
            label: None,
        }
    }

    pub fn with_tlist(mut self, tlist: Vec<f64>) -> Self {
        self.tlist = Some(tlist);
        self
    }

    pub fn with_coeff(mut self, coeff: impl Into<Coefficient>) -> Self {
        self.coeff = coeff.into();
        self
    }

    pub fn with_spline_kind(mut self, kind: SplineKind) -> Self {
        self.spline_kind = Some(kind);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Resolved interpolation kind.
    pub fn kind(&self) -> SplineKind {
        self.spline_kind.unwrap_or_default()
    }

    /// Last grid point, if the pulse has a grid.
    pub fn t_end(&self) -> Option<f64> {
        self.tlist.as_ref().and_then(|t| t.last().copied())
    }

    /// The operator embedded into the full space `dims`.
    pub fn full_operator(&self, dims: &[usize]) -> Result<Operator> {
        self.op.expand(dims, &self.targets)
    }
}

/// One time-independent term.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftTerm {
    pub op: Operator,
    pub targets: Vec<usize>,
}

/// Time-independent part of the generator, always present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Drift {
    terms: Vec<DriftTerm>,
}

impl Drift {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, op: Operator, targets: Vec<usize>) {
        self.terms.push(DriftTerm { op, targets });
    }

    pub fn terms(&self) -> &[DriftTerm] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Sum of all terms on the full space; zero if there are none.
    pub fn full_operator(&self, dims: &[usize]) -> Result<Operator> {
        self.terms.iter().try_fold(Operator::zeros(dims), |acc, term| {
            acc.add(&term.op.expand(dims, &term.targets)?)
        })
    }

    /// The drift terms as always-on pulses without a grid.
    pub fn to_pulses(&self) -> Vec<Pulse> {
        self.terms
            .iter()
            .map(|term| {
                Pulse::new(term.op.clone(), term.targets.clone())
                    .with_coeff(true)
                    .with_label("drift")
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spline_kind_display_and_parse() {
        assert_eq!(SplineKind::StepFunc.to_string(), "step_func");
        assert_eq!(SplineKind::Cubic.to_string(), "cubic");
        assert_eq!("cubic".parse::<SplineKind>().unwrap(), SplineKind::Cubic);
        assert!("linear".parse::<SplineKind>().is_err());
    }

    #[test]
    fn test_spline_kind_serde_names() {
        let yaml = serde_yaml::to_string(&SplineKind::StepFunc).unwrap();
        assert_eq!(yaml.trim(), "step_func");
        let kind: SplineKind = serde_yaml::from_str("cubic").unwrap();
        assert_eq!(kind, SplineKind::Cubic);
    }

    #[test]
    fn test_pulse_mode_mapping() {
        assert_eq!(
            SplineKind::from_pulse_mode("discrete").unwrap(),
            SplineKind::StepFunc
        );
        assert_eq!(
            SplineKind::from_pulse_mode("continuous").unwrap(),
            SplineKind::Cubic
        );
        assert!(SplineKind::from_pulse_mode("analog").is_err());
        assert_eq!(SplineKind::Cubic.pulse_mode(), "continuous");
    }

    #[test]
    fn test_coefficient_predicates() {
        assert!(Coefficient::Off.is_silent());
        assert!(Coefficient::Constant(false).is_silent());
        assert!(Coefficient::Constant(true).is_always_on());
        let c: Coefficient = vec![1.0, 2.0].into();
        assert_eq!(c.as_sampled(), Some(&[1.0, 2.0][..]));
    }

    #[test]
    fn test_pulse_defaults() {
        let p = Pulse::new(Operator::sigmax(), vec![0]);
        assert_eq!(p.kind(), SplineKind::StepFunc);
        assert_eq!(p.coeff, Coefficient::Off);
        assert!(p.t_end().is_none());

        let p = p.with_tlist(vec![0.0, 1.0, 2.5]).with_spline_kind(SplineKind::Cubic);
        assert_eq!(p.kind(), SplineKind::Cubic);
        assert_eq!(p.t_end(), Some(2.5));
    }

    #[test]
    fn test_drift_full_operator_sums_terms() {
        let mut drift = Drift::new();
        drift.add(Operator::sigmaz(), vec![0]);
        drift.add(Operator::sigmaz(), vec![1]);
        let full = drift.full_operator(&[2, 2]).unwrap();
        // diag(2, 0, 0, -2)
        assert_eq!(full.data()[[0, 0]].re, 2.0);
        assert_eq!(full.data()[[1, 1]].re, 0.0);
        assert_eq!(full.data()[[3, 3]].re, -2.0);
    }

    #[test]
    fn test_empty_drift_is_zero() {
        let drift = Drift::new();
        let full = drift.full_operator(&[3]).unwrap();
        assert!(full.data().iter().all(|z| z.norm() == 0.0));
        assert!(drift.to_pulses().is_empty());
    }

    #[test]
    fn test_drift_to_pulses() {
        let mut drift = Drift::new();
        drift.add(Operator::num(3), vec![1]);
        let pulses = drift.to_pulses();
        assert_eq!(pulses.len(), 1);
        assert_eq!(pulses[0].coeff, Coefficient::Constant(true));
        assert!(pulses[0].tlist.is_none());
        assert_eq!(pulses[0].targets, vec![1]);
    }
}
