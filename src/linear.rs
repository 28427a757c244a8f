//! Linear solver backends for the systems arising in each nonlinear iteration.
//!
//! Backends are selected at runtime with [`create_linear_solver`] and used through the
//! [`LinearSolver`] trait.
use nalgebra::DVector;
use nalgebra_sparse::ops::serial::spmm_csr_dense;
use nalgebra_sparse::ops::Op;
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::str::FromStr;

mod bicgstab;
mod cg;
mod dense;
mod preconditioner;

pub use bicgstab::BiCgStab;
pub use cg::ConjugateGradient;
pub use dense::DenseLu;
pub use preconditioner::Preconditioner;

/// A solver for square sparse linear systems `A x = b`.
pub trait LinearSolver: Send {
    fn name(&self) -> &str;

    /// Updates tolerances and iteration limits. Direct solvers ignore the settings.
    fn set_settings(&mut self, _settings: &LinearSolverSettings) {}

    fn solve(&mut self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinearSolverKind {
    #[default]
    DenseLu,
    #[serde(alias = "cg")]
    ConjugateGradient,
    #[serde(rename = "bicgstab")]
    BiCgStab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreconditionerKind {
    #[default]
    Identity,
    Jacobi,
}

impl FromStr for LinearSolverKind {
    type Err = LinearSolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dense-lu" | "denselu" | "lu" => Ok(Self::DenseLu),
            "conjugate-gradient" | "cg" => Ok(Self::ConjugateGradient),
            "bicgstab" => Ok(Self::BiCgStab),
            _ => Err(LinearSolveError::UnknownSolver(s.to_string())),
        }
    }
}

impl FromStr for PreconditionerKind {
    type Err = LinearSolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "identity" | "none" => Ok(Self::Identity),
            "jacobi" | "diagonal" => Ok(Self::Jacobi),
            _ => Err(LinearSolveError::UnknownSolver(s.to_string())),
        }
    }
}

/// Parameters forwarded to iterative backends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearSolverSettings {
    /// Relative residual tolerance `||b - A x|| <= tolerance * ||b||`.
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for LinearSolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum LinearSolveError {
    DimensionMismatch { rows: usize, cols: usize, rhs: usize },
    Singular,
    NonFiniteSolution,
    IndefiniteOperator,
    IndefinitePreconditioner,
    Breakdown { iterations: usize },
    MaxIterationsReached { max_iterations: usize, residual_norm: f64 },
    UnknownSolver(String),
}

impl fmt::Display for LinearSolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionMismatch { rows, cols, rhs } => {
                write!(f, "Cannot solve {}x{} system with right-hand side of length {}", rows, cols, rhs)
            }
            Self::Singular => write!(f, "Matrix is singular"),
            Self::NonFiniteSolution => write!(f, "Solution contains non-finite entries"),
            Self::IndefiniteOperator => write!(f, "Operator appears to be indefinite"),
            Self::IndefinitePreconditioner => write!(f, "Indefinite preconditioner"),
            Self::Breakdown { iterations } => write!(f, "Iteration broke down after {} iterations", iterations),
            Self::MaxIterationsReached {
                max_iterations,
                residual_norm,
            } => write!(
                f,
                "Max iterations ({}) reached with residual norm {:e}",
                max_iterations, residual_norm
            ),
            Self::UnknownSolver(name) => write!(f, "Unknown linear solver or preconditioner '{}'", name),
        }
    }
}

impl Error for LinearSolveError {}

/// Creates a linear solver with default settings.
pub fn create_linear_solver(kind: LinearSolverKind, preconditioner: PreconditionerKind) -> Box<dyn LinearSolver> {
    match kind {
        LinearSolverKind::DenseLu => Box::new(DenseLu::default()),
        LinearSolverKind::ConjugateGradient => Box::new(ConjugateGradient::new(preconditioner)),
        LinearSolverKind::BiCgStab => Box::new(BiCgStab::new(preconditioner)),
    }
}

/// Computes `A x`.
pub fn spmv(matrix: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(matrix.nrows());
    spmm_csr_dense(0.0, &mut y, 1.0, Op::NoOp(matrix), Op::NoOp(x));
    y
}

pub(crate) fn check_dimensions(matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<(), LinearSolveError> {
    if matrix.nrows() != matrix.ncols() || matrix.nrows() != rhs.len() {
        return Err(LinearSolveError::DimensionMismatch {
            rows: matrix.nrows(),
            cols: matrix.ncols(),
            rhs: rhs.len(),
        });
    }
    Ok(())
}
