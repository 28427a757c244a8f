use crate::linear::{check_dimensions, LinearSolveError, LinearSolver};
use nalgebra::DVector;
use nalgebra_sparse::convert::serial::convert_csr_dense;
use nalgebra_sparse::CsrMatrix;

/// Direct solver through a dense LU factorization with partial pivoting.
///
/// Intended for small systems.
#[derive(Debug, Clone, Default)]
pub struct DenseLu;

impl LinearSolver for DenseLu {
    fn name(&self) -> &str {
        "dense-lu"
    }

    fn solve(&mut self, matrix: &CsrMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError> {
        check_dimensions(matrix, rhs)?;
        let lu = convert_csr_dense(matrix).lu();
        let x = lu.solve(rhs).ok_or(LinearSolveError::Singular)?;
        if x.iter().all(|x_i| x_i.is_finite()) {
            Ok(x)
        } else {
            Err(LinearSolveError::NonFiniteSolution)
        }
    }
}
