// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense operator algebra.
//!
//! [`Operator`] pairs a complex matrix with the subsystem dimensions its
//! rows live in. Square operators are generators, propagators or density
//! matrices; `d x 1` operators are kets.

pub mod expm;
pub mod tensor;

use std::fmt;

use ndarray::Array2;
use num_complex::Complex64;

use crate::error::{Error, Result, ValidationError};

/// Absolute tolerance for the Hermiticity test.
pub const HERMITIAN_TOLERANCE: f64 = 1e-10;

/// A dense complex operator on a composite space.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    data: Array2<Complex64>,
    dims: Vec<usize>,
}

impl Operator {
    /// Wrap a matrix whose rows span the product space `dims`.
    pub fn new(data: Array2<Complex64>, dims: Vec<usize>) -> Result<Self> {
        let total: usize = dims.iter().product();
        if dims.is_empty() || dims.contains(&0) {
            return Err(ValidationError::Field {
                field: "dims".into(),
                message: format!("subsystem dimensions must be positive, got {:?}", dims),
            }
            .into());
        }
        if data.nrows() != total {
            return Err(Error::Type(format!(
                "operator has {} rows but dims {:?} span {}",
                data.nrows(),
                dims,
                total
            )));
        }
        Ok(Self { data, dims })
    }

    /// Wrap a matrix as a single-subsystem operator.
    pub fn from_matrix(data: Array2<Complex64>) -> Self {
        let n = data.nrows().max(1);
        Self {
            data,
            dims: vec![n],
        }
    }

    pub fn data(&self) -> &Array2<Complex64> {
        &self.data
    }

    pub fn into_data(self) -> Array2<Complex64> {
        self.data
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Dimension of the full space (number of rows).
    pub fn dim(&self) -> usize {
        self.data.nrows()
    }

    pub fn is_square(&self) -> bool {
        self.data.nrows() == self.data.ncols()
    }

    pub fn is_ket(&self) -> bool {
        self.data.ncols() == 1
    }

    /// True if the operator is square and equals its adjoint within
    /// [`HERMITIAN_TOLERANCE`].
    pub fn is_hermitian(&self) -> bool {
        if !self.is_square() {
            return false;
        }
        let n = self.dim();
        for i in 0..n {
            for j in i..n {
                if (self.data[[i, j]] - self.data[[j, i]].conj()).norm() > HERMITIAN_TOLERANCE {
                    return false;
                }
            }
        }
        true
    }

    /// Conjugate transpose.
    pub fn dagger(&self) -> Self {
        Self {
            data: self.data.t().mapv(|z| z.conj()),
            dims: self.dims.clone(),
        }
    }

    /// Matrix product `self · other`.
    pub fn dot(&self, other: &Operator) -> Result<Self> {
        if self.data.ncols() != other.data.nrows() {
            return Err(Error::Type(format!(
                "cannot multiply {:?} by {:?}",
                self.data.dim(),
                other.data.dim()
            )));
        }
        Ok(Self {
            data: self.data.dot(&other.data),
            dims: self.dims.clone(),
        })
    }

    pub fn scale(&self, factor: Complex64) -> Self {
        Self {
            data: &self.data * factor,
            dims: self.dims.clone(),
        }
    }

    pub fn add(&self, other: &Operator) -> Result<Self> {
        if self.data.dim() != other.data.dim() {
            return Err(Error::Type(format!(
                "cannot add {:?} and {:?}",
                self.data.dim(),
                other.data.dim()
            )));
        }
        Ok(Self {
            data: &self.data + &other.data,
            dims: self.dims.clone(),
        })
    }

    /// `self + c·other`; both operators must have the same shape.
    pub(crate) fn add_scaled(&self, c: Complex64, other: &Operator) -> Self {
        debug_assert_eq!(self.data.dim(), other.data.dim());
        let mut data = self.data.clone();
        data.scaled_add(c, &other.data);
        Self {
            data,
            dims: self.dims.clone(),
        }
    }

    /// Tensor product `self ⊗ other`.
    pub fn tensor(&self, other: &Operator) -> Self {
        let mut dims = self.dims.clone();
        dims.extend_from_slice(&other.dims);
        Self {
            data: tensor::kron(&self.data, &other.data),
            dims,
        }
    }

    /// Tensor product of a non-empty list of operators.
    pub fn tensor_all(ops: &[Operator]) -> Result<Self> {
        let (first, rest) = ops.split_first().ok_or_else(|| {
            Error::Type("tensor product of an empty operator list".into())
        })?;
        Ok(rest.iter().fold(first.clone(), |acc, op| acc.tensor(op)))
    }

    /// Embed this operator at `targets` of the composite space `dims`.
    ///
    /// The operator's own subsystem dims must match `dims` at the targets,
    /// in order.
    pub fn expand(&self, dims: &[usize], targets: &[usize]) -> Result<Self> {
        if !self.is_square() {
            return Err(Error::Type("only square operators can be embedded".into()));
        }
        check_targets(targets, dims.len())?;
        if targets.len() != self.dims.len() {
            return Err(ValidationError::Field {
                field: "targets".into(),
                message: format!(
                    "operator acts on {} subsystem(s) but {} target(s) were given",
                    self.dims.len(),
                    targets.len()
                ),
            }
            .into());
        }
        for (j, &t) in targets.iter().enumerate() {
            if dims[t] != self.dims[j] {
                return Err(ValidationError::Field {
                    field: "targets".into(),
                    message: format!(
                        "subsystem {} has dimension {} but the operator expects {}",
                        t, dims[t], self.dims[j]
                    ),
                }
                .into());
            }
        }
        if targets.len() == dims.len() && targets.iter().enumerate().all(|(i, &t)| i == t) {
            return Ok(Self {
                data: self.data.clone(),
                dims: dims.to_vec(),
            });
        }
        Ok(Self {
            data: tensor::expand(&self.data, &self.dims, dims, targets),
            dims: dims.to_vec(),
        })
    }

    /// Matrix exponential of this operator.
    pub fn expm(&self) -> Result<Self> {
        Ok(Self {
            data: expm::expm(&self.data)?,
            dims: self.dims.clone(),
        })
    }

    /// Trace of a square operator.
    pub fn trace(&self) -> Complex64 {
        self.data.diag().sum()
    }

    /// Largest absolute entry of `self - other`, or infinity on shape mismatch.
    pub fn max_abs_diff(&self, other: &Operator) -> f64 {
        if self.data.dim() != other.data.dim() {
            return f64::INFINITY;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| (a - b).norm())
            .fold(0.0, f64::max)
    }

    // ------------------------------------------------------------------
    // Constructors
    // ------------------------------------------------------------------

    pub fn sigmax() -> Self {
        Self::from_matrix(matrix2([[0.0, 1.0], [1.0, 0.0]], [[0.0; 2]; 2]))
    }

    pub fn sigmay() -> Self {
        Self::from_matrix(matrix2([[0.0; 2]; 2], [[0.0, -1.0], [1.0, 0.0]]))
    }

    pub fn sigmaz() -> Self {
        Self::from_matrix(matrix2([[1.0, 0.0], [0.0, -1.0]], [[0.0; 2]; 2]))
    }

    /// σ⁻ = |0⟩⟨1|.
    pub fn sigmam() -> Self {
        Self::from_matrix(matrix2([[0.0, 1.0], [0.0, 0.0]], [[0.0; 2]; 2]))
    }

    /// σ⁺ = |1⟩⟨0|.
    pub fn sigmap() -> Self {
        Self::from_matrix(matrix2([[0.0, 0.0], [1.0, 0.0]], [[0.0; 2]; 2]))
    }

    /// Annihilation operator truncated to `d` levels.
    pub fn destroy(d: usize) -> Self {
        let mut m = Array2::zeros((d, d));
        for n in 1..d {
            m[[n - 1, n]] = Complex64::new((n as f64).sqrt(), 0.0);
        }
        Self::from_matrix(m)
    }

    pub fn create(d: usize) -> Self {
        Self::destroy(d).dagger()
    }

    /// Number operator `a†a`.
    pub fn num(d: usize) -> Self {
        let diag = ndarray::Array1::from_iter((0..d).map(|n| Complex64::new(n as f64, 0.0)));
        Self::from_matrix(Array2::from_diag(&diag))
    }

    /// Identity on the composite space `dims`.
    pub fn identity(dims: &[usize]) -> Self {
        let n: usize = dims.iter().product();
        Self {
            data: Array2::from_diag_elem(n, Complex64::new(1.0, 0.0)),
            dims: dims.to_vec(),
        }
    }

    /// Zero operator on `dims`.
    pub fn zeros(dims: &[usize]) -> Self {
        let n: usize = dims.iter().product();
        Self {
            data: Array2::zeros((n, n)),
            dims: dims.to_vec(),
        }
    }

    /// Basis ket |n⟩ of a `d`-level system.
    pub fn basis(d: usize, n: usize) -> Result<Self> {
        if n >= d {
            return Err(ValidationError::Field {
                field: "basis".into(),
                message: format!("level {} out of range for dimension {}", n, d),
            }
            .into());
        }
        let mut ket = Array2::zeros((d, 1));
        ket[[n, 0]] = Complex64::new(1.0, 0.0);
        Ok(Self::from_matrix(ket))
    }

    /// Computational basis ket of a composite space from a flat index.
    pub fn basis_state(dims: &[usize], index: usize) -> Result<Self> {
        let total: usize = dims.iter().product();
        let ket = Self::basis(total, index)?;
        Self::new(ket.data, dims.to_vec())
    }

    /// `e^{iθ}·I` on `dims`.
    pub fn global_phase(theta: f64, dims: &[usize]) -> Self {
        Self::identity(dims).scale(Complex64::from_polar(1.0, theta))
    }

    /// Look up a named single-subsystem operator of dimension `dim`.
    ///
    /// Known names: `sigmax`, `sigmay`, `sigmaz`, `sigmam`, `sigmap`,
    /// `destroy`, `create`, `num`, `identity` (alias `qeye`).
    pub fn from_name(name: &str, dim: usize) -> Result<Self> {
        let pauli = |op: Operator| {
            if dim == 2 {
                Ok(op)
            } else {
                Err(Error::Type(format!(
                    "'{}' is a qubit operator but the subsystem has dimension {}",
                    name, dim
                )))
            }
        };
        match name {
            "sigmax" => pauli(Self::sigmax()),
            "sigmay" => pauli(Self::sigmay()),
            "sigmaz" => pauli(Self::sigmaz()),
            "sigmam" => pauli(Self::sigmam()),
            "sigmap" => pauli(Self::sigmap()),
            "destroy" => Ok(Self::destroy(dim)),
            "create" => Ok(Self::create(dim)),
            "num" => Ok(Self::num(dim)),
            "identity" | "qeye" => Ok(Self::identity(&[dim])),
            other => Err(Error::Config(format!("unknown operator name '{}'", other))),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Operator(dims={:?}, shape={}x{})",
            self.dims,
            self.data.nrows(),
            self.data.ncols()
        )
    }
}

/// Check that `targets` are unique and inside `[0, n)`.
pub fn check_targets(targets: &[usize], n: usize) -> Result<()> {
    if targets.is_empty() {
        return Err(ValidationError::Field {
            field: "targets".into(),
            message: "at least one target is required".into(),
        }
        .into());
    }
    for (i, &t) in targets.iter().enumerate() {
        if t >= n {
            return Err(ValidationError::Field {
                field: "targets".into(),
                message: format!("target {} out of range for {} subsystem(s)", t, n),
            }
            .into());
        }
        if targets[..i].contains(&t) {
            return Err(ValidationError::Field {
                field: "targets".into(),
                message: format!("duplicate target {}", t),
            }
            .into());
        }
    }
    Ok(())
}

fn matrix2(re: [[f64; 2]; 2], im: [[f64; 2]; 2]) -> Array2<Complex64> {
    Array2::from_shape_fn((2, 2), |(i, j)| Complex64::new(re[i][j], im[i][j]))
}
