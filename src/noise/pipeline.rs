// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Expansion of ideal pulses into noisy pulses and collapse terms.

use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};
use tracing::{debug, warn};

use crate::error::{Error, Result, ValidationError};
use crate::operator::{check_targets, Operator};
use crate::pulse::grid::linspace;
use crate::pulse::{Coefficient, Drift, Pulse, SplineKind};

use super::relaxation;
use super::types::{
    AmplitudeError, Coherence, ControlAmpNoise, DecoherenceNoise, Noise, NoiseDistribution,
    NoisyPulses, RandomNoise, RelaxationNoise,
};

/// Processor state the pipeline reads.
#[derive(Debug, Clone, Copy)]
pub struct NoiseContext<'a> {
    pub dims: &'a [usize],
    pub t1: Option<&'a Coherence>,
    pub t2: Option<&'a Coherence>,
    /// Interpolation kind given to sampled noise pulses.
    pub spline_kind: SplineKind,
    /// Drift appended as always-on pulses, if any.
    pub drift: Option<&'a Drift>,
    /// Apply relaxation and decoherence (including implicit T1/T2).
    pub device_noise: bool,
    /// Largest random-noise grid allowed; [`MAX_NOISE_POINTS`] if unset.
    pub max_points: Option<usize>,
}

/// Bound on a random-noise grid when no time-step limit is configured.
pub const MAX_NOISE_POINTS: usize = 10_000_000;

/// Run every noise spec over `pulses`, a copy owned by the pipeline.
///
/// Random noise is drawn from `rng` on every call.
pub fn process_noise<R: Rng + ?Sized>(
    pulses: Vec<Pulse>,
    noise: &[Noise],
    ctx: &NoiseContext<'_>,
    rng: &mut R,
) -> Result<NoisyPulses> {
    let ideal = pulses;
    let mut coherent = Vec::new();
    let mut collapse = Vec::new();

    for spec in noise {
        if spec.is_device_noise() && !ctx.device_noise {
            debug!(noise = spec.name(), "Skipping device noise");
            continue;
        }
        match spec {
            Noise::Relaxation(n) => collapse.extend(relaxation_terms(n, ctx)?),
            Noise::Decoherence(n) => collapse.extend(decoherence_terms(n, ctx)?),
            Noise::ControlAmplitude(n) => coherent.extend(control_amp_pulses(n, &ideal, ctx)?),
            Noise::Random(n) => coherent.extend(random_pulses(n, &ideal, ctx, rng)?),
        }
    }

    if ctx.device_noise && (ctx.t1.is_some() || ctx.t2.is_some()) {
        let implicit = RelaxationNoise::new(ctx.t1.cloned(), ctx.t2.cloned());
        collapse.extend(relaxation_terms(&implicit, ctx)?);
    }

    let num_ideal = ideal.len();
    let num_coherent = coherent.len();
    let mut out = ideal;
    out.extend(coherent);
    if let Some(drift) = ctx.drift {
        out.extend(drift.to_pulses());
    }

    debug!(
        ideal = num_ideal,
        coherent = num_coherent,
        collapse = collapse.len(),
        device_noise = ctx.device_noise,
        "Processed noise"
    );

    Ok(NoisyPulses {
        pulses: out,
        collapse,
    })
}

fn relaxation_terms(noise: &RelaxationNoise, ctx: &NoiseContext<'_>) -> Result<Vec<Pulse>> {
    let n = ctx.dims.len();
    let targets = match &noise.targets {
        Some(t) => {
            check_targets(t, n)?;
            t.clone()
        }
        None => (0..n).collect(),
    };
    if let Some(t1) = &noise.t1 {
        t1.check_len("t1", n)?;
    }
    if let Some(t2) = &noise.t2 {
        t2.check_len("t2", n)?;
    }

    let mut out = Vec::new();
    for &t in &targets {
        let t1 = noise.t1.as_ref().and_then(|c| c.for_subsystem(t));
        let t2 = noise.t2.as_ref().and_then(|c| c.for_subsystem(t));
        for op in relaxation::channels(t1, t2, ctx.dims[t])? {
            out.push(
                Pulse::new(op, vec![t])
                    .with_coeff(true)
                    .with_label(format!("relaxation_{}", t)),
            );
        }
    }
    Ok(out)
}

fn decoherence_terms(noise: &DecoherenceNoise, ctx: &NoiseContext<'_>) -> Result<Vec<Pulse>> {
    let n = ctx.dims.len();
    let coeff = match (&noise.coeff, &noise.tlist) {
        (None, _) => Coefficient::Constant(true),
        (Some(c), Some(_)) => Coefficient::Sampled(c.clone()),
        (Some(_), None) => {
            return Err(ValidationError::Field {
                field: "decoherence.tlist".into(),
                message: "a time-dependent collapse coefficient needs a tlist".into(),
            }
            .into())
        }
    };

    let term = |op: &Operator, targets: Vec<usize>| {
        let mut p = Pulse::new(op.clone(), targets)
            .with_coeff(coeff.clone())
            .with_spline_kind(ctx.spline_kind)
            .with_label("decoherence");
        p.tlist = noise.tlist.clone();
        p
    };

    let mut out = Vec::new();
    for op in &noise.c_ops {
        if noise.all_subsystems {
            if op.dims().len() != 1 {
                return Err(Error::Type(
                    "only single-subsystem collapse operators can be applied to all subsystems"
                        .into(),
                ));
            }
            for t in 0..n {
                out.push(term(op, vec![t]));
            }
        } else {
            let targets = noise
                .targets
                .clone()
                .unwrap_or_else(|| (0..op.dims().len()).collect());
            check_targets(&targets, n)?;
            out.push(term(op, targets));
        }
    }
    Ok(out)
}

fn control_amp_pulses(
    noise: &ControlAmpNoise,
    ideal: &[Pulse],
    ctx: &NoiseContext<'_>,
) -> Result<Vec<Pulse>> {
    let mut out = Vec::new();
    for i in selected(noise.indices.as_deref(), ideal.len())? {
        let pulse = &ideal[i];
        let mut noisy = Pulse::new(pulse.op.clone(), pulse.targets.clone());
        noisy.label = pulse.label.as_ref().map(|l| format!("{}_amp_noise", l));

        match &noise.amplitude {
            AmplitudeError::Scale(factor) => {
                let values = match &pulse.coeff {
                    Coefficient::Sampled(v) => v.iter().map(|c| c * factor).collect(),
                    Coefficient::Constant(true) => match &pulse.tlist {
                        Some(t) => vec![*factor; t.len()],
                        None => {
                            warn!(pulse = i, "Cannot scale an always-on pulse without a tlist");
                            continue;
                        }
                    },
                    Coefficient::Off | Coefficient::Constant(false) => continue,
                };
                noisy.tlist = pulse.tlist.clone();
                noisy.coeff = Coefficient::Sampled(values);
                noisy.spline_kind = Some(pulse.kind());
            }
            AmplitudeError::Sampled(values) => {
                let tlist = noise
                    .tlist
                    .clone()
                    .or_else(|| pulse.tlist.clone())
                    .ok_or_else(|| ValidationError::Field {
                        field: "control_amplitude.tlist".into(),
                        message: format!("no tlist for the noise on pulse {}", i),
                    })?;
                noisy.tlist = Some(tlist);
                noisy.coeff = Coefficient::Sampled(values.clone());
                noisy.spline_kind = Some(ctx.spline_kind);
            }
        }
        out.push(noisy);
    }
    Ok(out)
}

enum Sampler {
    Normal(Normal<f64>),
    Uniform(Uniform<f64>),
}

impl Sampler {
    fn new(dist: &NoiseDistribution) -> Result<Self> {
        match *dist {
            NoiseDistribution::Normal { mean, std_dev } => Normal::new(mean, std_dev)
                .map(Sampler::Normal)
                .map_err(|e| {
                    Error::from(ValidationError::Field {
                        field: "random.distribution".into(),
                        message: e.to_string(),
                    })
                }),
            NoiseDistribution::Uniform { low, high } => {
                if !(low < high && low.is_finite() && high.is_finite()) {
                    return Err(ValidationError::Field {
                        field: "random.distribution".into(),
                        message: format!(
                            "uniform bounds must satisfy low < high, got [{}, {})",
                            low, high
                        ),
                    }
                    .into());
                }
                Ok(Sampler::Uniform(Uniform::new(low, high)))
            }
        }
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self {
            Sampler::Normal(d) => d.sample(rng),
            Sampler::Uniform(d) => d.sample(rng),
        }
    }
}

fn random_pulses<R: Rng + ?Sized>(
    noise: &RandomNoise,
    ideal: &[Pulse],
    ctx: &NoiseContext<'_>,
    rng: &mut R,
) -> Result<Vec<Pulse>> {
    if !(noise.dt > 0.0 && noise.dt.is_finite()) {
        return Err(ValidationError::Field {
            field: "random.dt".into(),
            message: format!("must be positive, got {}", noise.dt),
        }
        .into());
    }
    let indices = selected(noise.indices.as_deref(), ideal.len())?;
    let t_end = ideal
        .iter()
        .filter_map(Pulse::t_end)
        .fold(f64::NEG_INFINITY, f64::max);
    if !t_end.is_finite() {
        warn!("Random noise skipped: no pulse has a tlist");
        return Ok(Vec::new());
    }

    let limit = ctx.max_points.unwrap_or(MAX_NOISE_POINTS);
    let steps = (t_end / noise.dt).floor() + 1.0;
    if !(steps <= limit as f64) {
        return Err(ValidationError::ResourceLimit {
            resource: "random_noise_points".into(),
            limit: limit as u64,
            requested: if steps.is_finite() { steps as u64 } else { u64::MAX },
        }
        .into());
    }
    let steps = (steps as usize).max(2);
    let grid = linspace(0.0, t_end, steps);
    let sampler = Sampler::new(&noise.distribution)?;

    let mut out = Vec::with_capacity(indices.len());
    for i in indices {
        let pulse = &ideal[i];
        if pulse.tlist.is_none() {
            warn!(pulse = i, "Random noise skipped for pulse without tlist");
            continue;
        }
        let samples: Vec<f64> = (0..grid.len()).map(|_| sampler.draw(rng)).collect();
        let mut noisy = Pulse::new(pulse.op.clone(), pulse.targets.clone())
            .with_tlist(grid.clone())
            .with_coeff(samples)
            .with_spline_kind(ctx.spline_kind);
        noisy.label = pulse.label.as_ref().map(|l| format!("{}_random_noise", l));
        out.push(noisy);
    }
    debug!(pulses = out.len(), points = grid.len(), "Drew random noise");
    Ok(out)
}

/// Resolve an optional index selection against `len` pulses.
fn selected(indices: Option<&[usize]>, len: usize) -> Result<Vec<usize>> {
    match indices {
        None => Ok((0..len).collect()),
        Some(idx) => {
            if let Some(&bad) = idx.iter().find(|&&i| i >= len) {
                return Err(Error::Lookup(format!(
                    "noise targets pulse {} but there are only {} pulse(s)",
                    bad, len
                )));
            }
            Ok(idx.to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ctx<'a>(dims: &'a [usize], device_noise: bool) -> NoiseContext<'a> {
        NoiseContext {
            dims,
            t1: None,
            t2: None,
            spline_kind: SplineKind::StepFunc,
            drift: None,
            device_noise,
            max_points: None,
        }
    }

    fn x_pulse() -> Pulse {
        Pulse::new(Operator::sigmax(), vec![0])
            .with_tlist(vec![0.0, 1.0, 2.0])
            .with_coeff(vec![1.0, 2.0])
            .with_label("x0")
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_no_noise_passes_pulses_through() {
        let out = process_noise(vec![x_pulse()], &[], &ctx(&[2], true), &mut rng()).unwrap();
        assert_eq!(out.pulses, vec![x_pulse()]);
        assert!(out.collapse.is_empty());
    }

    #[test]
    fn test_relaxation_only_with_device_noise() {
        let noise = vec![Noise::from(RelaxationNoise::new(
            Some(10.0.into()),
            Some(5.0.into()),
        ))];
        let dims = [2, 2];
        let off = process_noise(vec![x_pulse()], &noise, &ctx(&dims, false), &mut rng()).unwrap();
        assert!(off.collapse.is_empty());

        let on = process_noise(vec![x_pulse()], &noise, &ctx(&dims, true), &mut rng()).unwrap();
        // two channels on each of two subsystems
        assert_eq!(on.collapse.len(), 4);
        assert_eq!(on.collapse[0].targets, vec![0]);
        assert_eq!(on.collapse[2].targets, vec![1]);
        assert!(on.collapse.iter().all(|p| p.coeff == Coefficient::Constant(true)));
    }

    #[test]
    fn test_implicit_relaxation_from_context() {
        let t1 = Coherence::PerSubsystem(vec![10.0, 20.0]);
        let dims = [2, 2];
        let mut c = ctx(&dims, true);
        c.t1 = Some(&t1);
        let out = process_noise(vec![], &[], &c, &mut rng()).unwrap();
        assert_eq!(out.collapse.len(), 2);
        let rate0 = out.collapse[0].op.data()[[0, 1]].re;
        let rate1 = out.collapse[1].op.data()[[0, 1]].re;
        assert!((rate0 - (0.1f64).sqrt()).abs() < 1e-12);
        assert!((rate1 - (0.05f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_per_subsystem_length_checked() {
        let noise = vec![Noise::from(RelaxationNoise::new(
            Some(vec![10.0].into()),
            None,
        ))];
        assert!(process_noise(vec![], &noise, &ctx(&[2, 2], true), &mut rng()).is_err());
    }

    #[test]
    fn test_decoherence_all_subsystems() {
        let noise = vec![Noise::from(
            DecoherenceNoise::new(vec![Operator::sigmaz()]).on_all_subsystems(),
        )];
        let out = process_noise(vec![], &noise, &ctx(&[2, 2, 2], true), &mut rng()).unwrap();
        let targets: Vec<_> = out.collapse.iter().map(|p| p.targets.clone()).collect();
        assert_eq!(targets, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_decoherence_time_dependent() {
        let noise = vec![Noise::from(
            DecoherenceNoise::new(vec![Operator::sigmam()])
                .with_targets(vec![1])
                .with_time_dependence(vec![0.0, 1.0], vec![0.5, 0.5]),
        )];
        let out = process_noise(vec![], &noise, &ctx(&[2, 2], true), &mut rng()).unwrap();
        assert_eq!(out.collapse.len(), 1);
        assert_eq!(out.collapse[0].targets, vec![1]);
        assert_eq!(out.collapse[0].tlist, Some(vec![0.0, 1.0]));
        assert!(out.collapse[0].coeff.is_sampled());
    }

    #[test]
    fn test_decoherence_coeff_without_tlist_rejected() {
        let mut spec = DecoherenceNoise::new(vec![Operator::sigmam()]);
        spec.coeff = Some(vec![1.0]);
        let noise = vec![Noise::from(spec)];
        assert!(process_noise(vec![], &noise, &ctx(&[2], true), &mut rng()).is_err());
    }

    #[test]
    fn test_control_amp_scale() {
        let noise = vec![Noise::from(ControlAmpNoise::scale(0.1))];
        let out = process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut rng()).unwrap();
        assert_eq!(out.pulses.len(), 2);
        let noisy = &out.pulses[1];
        assert_eq!(noisy.coeff, Coefficient::Sampled(vec![0.1, 0.2]));
        assert_eq!(noisy.tlist, Some(vec![0.0, 1.0, 2.0]));
        assert_eq!(noisy.label.as_deref(), Some("x0_amp_noise"));
    }

    #[test]
    fn test_control_amp_bad_index() {
        let noise = vec![Noise::from(ControlAmpNoise::scale(0.1).with_indices(vec![3]))];
        let err = process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut rng()).unwrap_err();
        assert!(matches!(err, Error::Lookup(_)));
    }

    #[test]
    fn test_random_noise_grid_and_freshness() {
        let noise = vec![Noise::from(RandomNoise::new(
            0.5,
            NoiseDistribution::Normal {
                mean: 0.0,
                std_dev: 1.0,
            },
        ))];
        let mut r = rng();
        let a = process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut r).unwrap();
        let b = process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut r).unwrap();

        let grid = a.pulses[1].tlist.clone().unwrap();
        assert_eq!(grid, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_ne!(a.pulses[1].coeff, b.pulses[1].coeff);
    }

    #[test]
    fn test_random_noise_at_least_two_points() {
        let noise = vec![Noise::from(RandomNoise::new(
            10.0,
            NoiseDistribution::Uniform { low: 0.0, high: 1.0 },
        ))];
        let out = process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut rng()).unwrap();
        let p = &out.pulses[1];
        assert_eq!(p.tlist.as_ref().unwrap().len(), 2);
        assert!(p.coeff.as_sampled().unwrap().iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn test_random_noise_rejects_bad_dt() {
        let noise = vec![Noise::from(RandomNoise::new(
            0.0,
            NoiseDistribution::Uniform { low: 0.0, high: 1.0 },
        ))];
        assert!(process_noise(vec![x_pulse()], &noise, &ctx(&[2], false), &mut rng()).is_err());
    }

    #[test]
    fn test_random_noise_grid_is_bounded() {
        let tiny = |dt: f64| {
            vec![Noise::from(RandomNoise::new(
                dt,
                NoiseDistribution::Normal {
                    mean: 0.0,
                    std_dev: 0.1,
                },
            ))]
        };
        let err = process_noise(vec![x_pulse()], &tiny(1e-300), &ctx(&[2], false), &mut rng())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::ResourceLimit { .. })
        ));

        let mut c = ctx(&[2], false);
        c.max_points = Some(100);
        assert!(process_noise(vec![x_pulse()], &tiny(1e-3), &c, &mut rng()).is_err());
        let out = process_noise(vec![x_pulse()], &tiny(0.25), &c, &mut rng()).unwrap();
        assert_eq!(out.pulses[1].tlist.as_ref().unwrap().len(), 9);
    }

    #[test]
    fn test_drift_appended_last() {
        let mut drift = Drift::new();
        drift.add(Operator::sigmaz(), vec![0]);
        let noise = vec![Noise::from(ControlAmpNoise::scale(0.1))];
        let mut c = ctx(&[2], false);
        c.drift = Some(&drift);
        let out = process_noise(vec![x_pulse()], &noise, &c, &mut rng()).unwrap();
        assert_eq!(out.pulses.len(), 3);
        assert_eq!(out.pulses[2].label.as_deref(), Some("drift"));
        assert!(out.pulses[2].coeff.is_always_on());
    }
}
