// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Noise specifications.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::operator::Operator;
use crate::pulse::Pulse;

/// A coherence time, shared or given per subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Coherence {
    Uniform(f64),
    PerSubsystem(Vec<f64>),
}

impl Coherence {
    /// Value for subsystem `index`.
    pub fn for_subsystem(&self, index: usize) -> Option<f64> {
        match self {
            Coherence::Uniform(v) => Some(*v),
            Coherence::PerSubsystem(values) => values.get(index).copied(),
        }
    }

    /// Check a per-subsystem list against the subsystem count.
    pub fn check_len(&self, name: &str, num_subsystems: usize) -> Result<()> {
        if let Coherence::PerSubsystem(values) = self {
            if values.len() != num_subsystems {
                return Err(ValidationError::Field {
                    field: name.into(),
                    message: format!(
                        "expected one value per subsystem ({}), got {}",
                        num_subsystems,
                        values.len()
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

impl From<f64> for Coherence {
    fn from(v: f64) -> Self {
        Coherence::Uniform(v)
    }
}

impl From<Vec<f64>> for Coherence {
    fn from(v: Vec<f64>) -> Self {
        Coherence::PerSubsystem(v)
    }
}

/// T1/T2 relaxation on selected subsystems.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationNoise {
    pub t1: Option<Coherence>,
    pub t2: Option<Coherence>,
    /// `None` means every subsystem.
    pub targets: Option<Vec<usize>>,
}

impl RelaxationNoise {
    pub fn new(t1: Option<Coherence>, t2: Option<Coherence>) -> Self {
        Self {
            t1,
            t2,
            targets: None,
        }
    }

    pub fn with_targets(mut self, targets: Vec<usize>) -> Self {
        self.targets = Some(targets);
        self
    }
}

/// User-supplied collapse operators.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoherenceNoise {
    pub c_ops: Vec<Operator>,
    /// Subsystems each operator acts on. Ignored with `all_subsystems`.
    pub targets: Option<Vec<usize>>,
    pub tlist: Option<Vec<f64>>,
    /// Time dependence shared by every operator; `None` is always on.
    pub coeff: Option<Vec<f64>>,
    /// Replicate each single-subsystem operator onto every subsystem.
    pub all_subsystems: bool,
}

impl DecoherenceNoise {
    pub fn new(c_ops: Vec<Operator>) -> Self {
        Self {
            c_ops,
            targets: None,
            tlist: None,
            coeff: None,
            all_subsystems: false,
        }
    }

    pub fn with_targets(mut self, targets: Vec<usize>) -> Self {
        self.targets = Some(targets);
        self
    }

    pub fn on_all_subsystems(mut self) -> Self {
        self.all_subsystems = true;
        self
    }

    pub fn with_time_dependence(mut self, tlist: Vec<f64>, coeff: Vec<f64>) -> Self {
        self.tlist = Some(tlist);
        self.coeff = Some(coeff);
        self
    }
}

/// Amplitude error of a control pulse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmplitudeError {
    /// Relative error: the noise pulse is `scale·c(t)` on the pulse's grid.
    Scale(f64),
    /// Explicit additive samples.
    Sampled(Vec<f64>),
}

/// Coherent perturbation of selected control pulses.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlAmpNoise {
    pub amplitude: AmplitudeError,
    /// Grid of `Sampled` amplitudes; the pulse's own grid if `None`.
    pub tlist: Option<Vec<f64>>,
    /// Pulse indices; `None` means every pulse.
    pub indices: Option<Vec<usize>>,
}

impl ControlAmpNoise {
    pub fn scale(factor: f64) -> Self {
        Self {
            amplitude: AmplitudeError::Scale(factor),
            tlist: None,
            indices: None,
        }
    }

    pub fn sampled(tlist: Vec<f64>, coeff: Vec<f64>) -> Self {
        Self {
            amplitude: AmplitudeError::Sampled(coeff),
            tlist: Some(tlist),
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = Some(indices);
        self
    }
}

/// Distribution of random amplitude fluctuations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NoiseDistribution {
    Normal { mean: f64, std_dev: f64 },
    Uniform { low: f64, high: f64 },
}

/// Random fluctuation drawn fresh on every pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomNoise {
    /// Sampling interval of the fluctuation grid.
    pub dt: f64,
    pub distribution: NoiseDistribution,
    /// Pulse indices; `None` means every pulse.
    pub indices: Option<Vec<usize>>,
}

impl RandomNoise {
    pub fn new(dt: f64, distribution: NoiseDistribution) -> Self {
        Self {
            dt,
            distribution,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<usize>) -> Self {
        self.indices = Some(indices);
        self
    }
}

/// A noise specification attached to a processor.
#[derive(Debug, Clone, PartialEq)]
pub enum Noise {
    Relaxation(RelaxationNoise),
    Decoherence(DecoherenceNoise),
    ControlAmplitude(ControlAmpNoise),
    Random(RandomNoise),
}

impl Noise {
    /// True for noise that only applies when device noise is requested.
    pub fn is_device_noise(&self) -> bool {
        matches!(self, Noise::Relaxation(_) | Noise::Decoherence(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Noise::Relaxation(_) => "relaxation",
            Noise::Decoherence(_) => "decoherence",
            Noise::ControlAmplitude(_) => "control_amplitude",
            Noise::Random(_) => "random",
        }
    }
}

impl From<RelaxationNoise> for Noise {
    fn from(n: RelaxationNoise) -> Self {
        Noise::Relaxation(n)
    }
}

impl From<DecoherenceNoise> for Noise {
    fn from(n: DecoherenceNoise) -> Self {
        Noise::Decoherence(n)
    }
}

impl From<ControlAmpNoise> for Noise {
    fn from(n: ControlAmpNoise) -> Self {
        Noise::ControlAmplitude(n)
    }
}

impl From<RandomNoise> for Noise {
    fn from(n: RandomNoise) -> Self {
        Noise::Random(n)
    }
}

/// Output of the noise pipeline.
///
/// `pulses` holds the copied ideal pulses, then coherent noise pulses, then
/// (if requested) the drift as always-on pulses. `collapse` holds one
/// entry per collapse operator, its coefficient giving the time
/// dependence.
#[derive(Debug, Clone, Default)]
pub struct NoisyPulses {
    pub pulses: Vec<Pulse>,
    pub collapse: Vec<Pulse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coherence_lookup() {
        assert_eq!(Coherence::Uniform(10.0).for_subsystem(5), Some(10.0));
        let per = Coherence::PerSubsystem(vec![1.0, 2.0]);
        assert_eq!(per.for_subsystem(1), Some(2.0));
        assert_eq!(per.for_subsystem(2), None);
    }

    #[test]
    fn test_coherence_check_len() {
        let per = Coherence::from(vec![1.0, 2.0]);
        assert!(per.check_len("t1", 2).is_ok());
        assert!(per.check_len("t1", 3).is_err());
        assert!(Coherence::from(3.0).check_len("t1", 9).is_ok());
    }

    #[test]
    fn test_coherence_yaml_forms() {
        let uniform: Coherence = serde_yaml::from_str("25.0").unwrap();
        assert_eq!(uniform, Coherence::Uniform(25.0));
        let per: Coherence = serde_yaml::from_str("[10.0, 20.0]").unwrap();
        assert_eq!(per, Coherence::PerSubsystem(vec![10.0, 20.0]));
    }

    #[test]
    fn test_noise_classification() {
        let relax: Noise = RelaxationNoise::new(Some(1.0.into()), None).into();
        assert!(relax.is_device_noise());
        assert_eq!(relax.name(), "relaxation");

        let amp: Noise = ControlAmpNoise::scale(0.01).into();
        assert!(!amp.is_device_noise());

        let rand: Noise = RandomNoise::new(
            0.1,
            NoiseDistribution::Normal {
                mean: 0.0,
                std_dev: 0.01,
            },
        )
        .into();
        assert!(!rand.is_device_noise());
        assert_eq!(rand.name(), "random");
    }

    #[test]
    fn test_distribution_yaml() {
        let d: NoiseDistribution =
            serde_yaml::from_str("kind: uniform\nlow: -0.1\nhigh: 0.1\n").unwrap();
        assert_eq!(d, NoiseDistribution::Uniform { low: -0.1, high: 0.1 });
    }
}
