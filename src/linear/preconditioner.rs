use crate::linear::PreconditionerKind;
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

/// A preconditioner `P ~ A^{-1}` built for a specific matrix.
#[derive(Debug, Clone, PartialEq)]
pub enum Preconditioner {
    Identity,
    /// Inverse diagonal. Rows with a zero diagonal entry are left unscaled.
    Jacobi(DVector<f64>),
}

impl Preconditioner {
    pub fn build(kind: PreconditionerKind, matrix: &CsrMatrix<f64>) -> Self {
        match kind {
            PreconditionerKind::Identity => Self::Identity,
            PreconditionerKind::Jacobi => {
                let mut inverse_diagonal = DVector::from_element(matrix.nrows(), 1.0);
                for (i, j, &v) in matrix.triplet_iter() {
                    if i == j && v != 0.0 {
                        inverse_diagonal[i] = 1.0 / v;
                    }
                }
                Self::Jacobi(inverse_diagonal)
            }
        }
    }

    /// Computes `z = P r`.
    pub fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        match self {
            Self::Identity => r.clone(),
            Self::Jacobi(inverse_diagonal) => r.component_mul(inverse_diagonal),
        }
    }
}
