// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Composite time-dependent generator.

use std::collections::BTreeMap;
use std::fmt;

use num_complex::Complex64;
use serde_json::Value;

use crate::error::{Error, Result, ValidationError};
use crate::operator::Operator;
use crate::pulse::grid::merge_tlists;
use crate::pulse::resample::{spline_value, step_value};
use crate::pulse::spline::CubicSpline;
use crate::pulse::{resample_samples, SplineKind, DEFAULT_TLIST_TOLERANCE};

/// One time-dependent term `c(t)·H` with samples on the generator grid.
#[derive(Debug, Clone)]
pub struct GeneratorTerm {
    op: Operator,
    coeff: Vec<f64>,
    kind: SplineKind,
    spline: Option<CubicSpline>,
}

impl GeneratorTerm {
    fn new(op: Operator, coeff: Vec<f64>, kind: SplineKind, tlist: &[f64]) -> Result<Self> {
        let spline = match kind {
            SplineKind::Cubic => Some(CubicSpline::new(tlist, &coeff)?),
            SplineKind::StepFunc => None,
        };
        Ok(Self {
            op,
            coeff,
            kind,
            spline,
        })
    }

    pub fn op(&self) -> &Operator {
        &self.op
    }

    pub fn coeff(&self) -> &[f64] {
        &self.coeff
    }

    pub fn kind(&self) -> SplineKind {
        self.kind
    }

    fn value_at(&self, tlist: &[f64], t: f64, tol: f64) -> f64 {
        match &self.spline {
            Some(spline) => spline_value(spline, tlist, t, tol),
            None => step_value(tlist, &self.coeff, t, tol),
        }
    }
}

/// `G(t) = G_0 + Σ_m c_m(t)·H_m` on a full composite space.
///
/// All coefficients are sampled on one grid, so every term is temporally
/// aligned.
#[derive(Debug, Clone)]
pub struct CompositeGenerator {
    dims: Vec<usize>,
    tlist: Option<Vec<f64>>,
    constant: Option<Operator>,
    terms: Vec<GeneratorTerm>,
    args: BTreeMap<String, Value>,
    tol: f64,
}

impl CompositeGenerator {
    /// An empty generator on `dims` with an optional grid.
    pub fn new(dims: Vec<usize>, tlist: Option<Vec<f64>>) -> Self {
        Self {
            dims,
            tlist,
            constant: None,
            terms: Vec::new(),
            args: BTreeMap::new(),
            tol: DEFAULT_TLIST_TOLERANCE,
        }
    }

    /// A time-independent generator.
    pub fn from_operator(op: Operator) -> Self {
        let mut generator = Self::new(op.dims().to_vec(), None);
        generator.constant = Some(op);
        generator
    }

    /// Tolerance used when locating evaluation times on the grid.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn dim(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn tlist(&self) -> Option<&[f64]> {
        self.tlist.as_deref()
    }

    pub fn constant(&self) -> Option<&Operator> {
        self.constant.as_ref()
    }

    pub fn terms(&self) -> &[GeneratorTerm] {
        &self.terms
    }

    pub fn args(&self) -> &BTreeMap<String, Value> {
        &self.args
    }

    pub fn set_arg(&mut self, key: impl Into<String>, value: Value) {
        self.args.insert(key.into(), value);
    }

    /// True if there is no time-dependent term.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add a full-space operator to the constant part.
    pub fn add_constant(&mut self, op: Operator) -> Result<()> {
        self.check_dims(&op)?;
        self.constant = Some(match self.constant.take() {
            Some(existing) => existing.add(&op)?,
            None => op,
        });
        Ok(())
    }

    /// Add a term whose samples live on this generator's grid.
    pub fn add_term(&mut self, op: Operator, coeff: Vec<f64>, kind: SplineKind) -> Result<()> {
        self.check_dims(&op)?;
        let tlist = self.tlist.as_deref().ok_or_else(|| ValidationError::Field {
            field: "tlist".into(),
            message: "a time-dependent term needs a generator grid".into(),
        })?;
        if coeff.len() != tlist.len() {
            return Err(ValidationError::Field {
                field: "coeff".into(),
                message: format!(
                    "term has {} samples but the generator grid has {} points",
                    coeff.len(),
                    tlist.len()
                ),
            }
            .into());
        }
        let term = GeneratorTerm::new(op, coeff, kind, tlist)?;
        self.terms.push(term);
        Ok(())
    }

    /// Evaluate at time `t`.
    pub fn at(&self, t: f64) -> Operator {
        let mut out = self.constant_or_zero();
        if let Some(tlist) = self.tlist.as_deref() {
            for term in &self.terms {
                let c = term.value_at(tlist, t, self.tol);
                if c != 0.0 {
                    out = self.accumulate(out, term, c);
                }
            }
        }
        out
    }

    /// Evaluate with every coefficient taken at grid index `n`.
    pub fn at_index(&self, n: usize) -> Result<Operator> {
        let len = self.tlist.as_ref().map_or(0, Vec::len);
        if !self.terms.is_empty() && n >= len {
            return Err(Error::Lookup(format!(
                "grid index {} out of range for {} point(s)",
                n, len
            )));
        }
        let mut out = self.constant_or_zero();
        for term in &self.terms {
            let c = term.coeff[n];
            if c != 0.0 {
                out = self.accumulate(out, term, c);
            }
        }
        Ok(out)
    }

    /// Re-express every term on `grid`.
    pub fn resampled(&self, grid: &[f64]) -> Result<Self> {
        let mut out = Self {
            dims: self.dims.clone(),
            tlist: Some(grid.to_vec()),
            constant: self.constant.clone(),
            terms: Vec::with_capacity(self.terms.len()),
            args: self.args.clone(),
            tol: self.tol,
        };
        if let Some(own) = self.tlist.as_deref() {
            for term in &self.terms {
                let coeff = resample_samples(own, &term.coeff, term.kind, grid, self.tol)?;
                out.add_term(term.op.clone(), coeff, term.kind)?;
            }
        }
        Ok(out)
    }

    /// Sum of two generators, expressed on the union of their grids.
    ///
    /// Arguments of `other` override those of `self` on key collisions.
    pub fn merge(&self, other: &CompositeGenerator) -> Result<Self> {
        if self.dims != other.dims {
            return Err(Error::Type(format!(
                "cannot merge generators on dims {:?} and {:?}",
                self.dims, other.dims
            )));
        }
        let grids = [self.tlist.as_deref(), other.tlist.as_deref()];
        let mut merged = match merge_tlists(grids.into_iter().flatten(), self.tol) {
            Some(grid) => {
                let mut left = self.resampled(&grid)?;
                let right = other.resampled(&grid)?;
                left.terms.extend(right.terms);
                left
            }
            None => self.clone(),
        };
        if let Some(c) = other.constant.clone() {
            merged.add_constant(c)?;
        }
        for (k, v) in &other.args {
            merged.args.insert(k.clone(), v.clone());
        }
        Ok(merged)
    }

    fn constant_or_zero(&self) -> Operator {
        self.constant
            .clone()
            .unwrap_or_else(|| Operator::zeros(&self.dims))
    }

    fn accumulate(&self, acc: Operator, term: &GeneratorTerm, c: f64) -> Operator {
        acc.add_scaled(Complex64::new(c, 0.0), &term.op)
    }

    fn check_dims(&self, op: &Operator) -> Result<()> {
        let n = self.dim();
        if op.dim() != n || !op.is_square() {
            return Err(Error::Type(format!(
                "generator term must be {}x{} on dims {:?}, got {}",
                n, n, self.dims, op
            )));
        }
        Ok(())
    }
}

impl fmt::Display for CompositeGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompositeGenerator(dims={:?}, grid_points={}, constant={}, terms={})",
            self.dims,
            self.tlist.as_ref().map_or(0, Vec::len),
            self.constant.is_some(),
            self.terms.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::assert_operator_close;
    use approx::assert_relative_eq;

    fn on_grid(tlist: Vec<f64>) -> CompositeGenerator {
        CompositeGenerator::new(vec![2], Some(tlist))
    }

    #[test]
    fn test_from_operator_is_constant() {
        let g = CompositeGenerator::from_operator(Operator::sigmaz());
        assert!(g.is_constant());
        assert!(g.tlist().is_none());
        assert_operator_close(&g.at(3.7), &Operator::sigmaz(), 1e-15);
        assert_operator_close(&g.at_index(0).unwrap(), &Operator::sigmaz(), 1e-15);
    }

    #[test]
    fn test_add_term_requires_grid_and_length() {
        let mut g = CompositeGenerator::new(vec![2], None);
        assert!(g
            .add_term(Operator::sigmax(), vec![1.0], SplineKind::StepFunc)
            .is_err());

        let mut g = on_grid(vec![0.0, 1.0]);
        assert!(g
            .add_term(Operator::sigmax(), vec![1.0], SplineKind::StepFunc)
            .is_err());
        assert!(g
            .add_term(Operator::sigmax(), vec![1.0, 0.0], SplineKind::StepFunc)
            .is_ok());
    }

    #[test]
    fn test_add_term_rejects_wrong_dims() {
        let mut g = on_grid(vec![0.0, 1.0]);
        let err = g
            .add_term(Operator::num(3), vec![1.0, 1.0], SplineKind::StepFunc)
            .unwrap_err();
        assert!(matches!(err, Error::Type(_)));
    }

    #[test]
    fn test_step_evaluation_holds_previous() {
        let mut g = on_grid(vec![0.0, 1.0, 2.0]);
        g.add_term(Operator::sigmax(), vec![0.5, 2.0, 0.0], SplineKind::StepFunc)
            .unwrap();
        assert_relative_eq!(g.at(0.4).data()[[0, 1]].re, 0.5);
        assert_relative_eq!(g.at(1.0).data()[[0, 1]].re, 2.0);
        assert_relative_eq!(g.at(1.9).data()[[0, 1]].re, 2.0);
        assert_relative_eq!(g.at(2.0).data()[[0, 1]].re, 0.0);
        assert_relative_eq!(g.at(5.0).data()[[0, 1]].re, 0.0);
    }

    #[test]
    fn test_cubic_evaluation() {
        let tlist = vec![0.0, 1.0, 2.0, 3.0];
        let coeff = tlist.iter().map(|t| t * t).collect();
        let mut g = on_grid(tlist);
        g.add_term(Operator::sigmaz(), coeff, SplineKind::Cubic).unwrap();
        assert_relative_eq!(g.at(1.5).data()[[0, 0]].re, 2.25, epsilon = 1e-12);
    }

    #[test]
    fn test_at_index() {
        let mut g = on_grid(vec![0.0, 1.0]);
        g.add_constant(Operator::sigmaz()).unwrap();
        g.add_term(Operator::sigmax(), vec![0.0, 3.0], SplineKind::StepFunc)
            .unwrap();
        let h1 = g.at_index(1).unwrap();
        assert_relative_eq!(h1.data()[[0, 0]].re, 1.0);
        assert_relative_eq!(h1.data()[[0, 1]].re, 3.0);
        assert!(matches!(g.at_index(2), Err(Error::Lookup(_))));
    }

    #[test]
    fn test_resampled_preserves_step_values() {
        let mut g = on_grid(vec![0.0, 2.0]);
        g.add_term(Operator::sigmax(), vec![1.5, 0.0], SplineKind::StepFunc)
            .unwrap();
        let r = g.resampled(&[0.0, 1.0, 2.0]).unwrap();
        assert_eq!(r.terms()[0].coeff(), &[1.5, 1.5, 0.0]);
        assert_eq!(r.tlist(), Some(&[0.0, 1.0, 2.0][..]));
    }

    #[test]
    fn test_merge_unions_grids_and_sums() {
        let mut a = on_grid(vec![0.0, 2.0]);
        a.add_term(Operator::sigmax(), vec![1.0, 0.0], SplineKind::StepFunc)
            .unwrap();
        a.set_arg("shots", Value::from(1));

        let mut b = on_grid(vec![1.0, 2.0]);
        b.add_constant(Operator::sigmaz()).unwrap();
        b.add_term(Operator::sigmay(), vec![2.0, 0.0], SplineKind::StepFunc)
            .unwrap();
        b.set_arg("shots", Value::from(2));

        let m = a.merge(&b).unwrap();
        assert_eq!(m.tlist(), Some(&[0.0, 1.0, 2.0][..]));
        assert_eq!(m.terms().len(), 2);
        assert_eq!(m.terms()[0].coeff(), &[1.0, 1.0, 0.0]);
        assert_eq!(m.terms()[1].coeff(), &[0.0, 2.0, 0.0]);
        assert!(m.constant().is_some());
        assert_eq!(m.args()["shots"], Value::from(2));
    }

    #[test]
    fn test_merge_rejects_dims_mismatch() {
        let a = CompositeGenerator::new(vec![2], None);
        let b = CompositeGenerator::new(vec![3], None);
        assert!(matches!(a.merge(&b), Err(Error::Type(_))));
    }

    #[test]
    fn test_display() {
        let g = on_grid(vec![0.0, 1.0]);
        assert_eq!(
            g.to_string(),
            "CompositeGenerator(dims=[2], grid_points=2, constant=false, terms=0)"
        );
    }
}
