use crate::linear::{
    check_dimensions, spmv, LinearSolveError, LinearSolver, LinearSolverSettings, Preconditioner, PreconditionerKind,
};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

/// Preconditioned Conjugate Gradient for symmetric positive definite systems.
///
/// Convergence is measured with the approximate residual maintained by the iteration,
/// `||r|| <= tol * ||b||`.
#[derive(Debug, Clone)]
pub struct ConjugateGradient {
    preconditioner: PreconditionerKind,
    settings: LinearSolverSettings,
}

impl ConjugateGradient {
    pub fn new(preconditioner: PreconditionerKind) -> Self {
        Self {
            preconditioner,
            settings: LinearSolverSettings::default(),
        }
    }
}

impl LinearSolver for ConjugateGradient {
    fn name(&self) -> &str {
        "conjugate-gradient"
    }

    fn set_settings(&mut self, settings: &LinearSolverSettings) {
        self.settings = *settings;
    }

    #[allow(non_snake_case)]
    fn solve(&mut self, matrix: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError> {
        check_dimensions(matrix, b)?;
        let preconditioner = Preconditioner::build(self.preconditioner, matrix);

        let mut x = DVector::zeros(b.len());
        let b_norm = b.norm();
        if b_norm == 0.0 {
            return Ok(x);
        }

        // With x = 0 the initial residual is b
        let mut r = b.clone();
        let mut z = preconditioner.apply(&r);
        let mut p = z.clone();
        let mut zTr = z.dot(&r);

        let mut iterations = 0;
        loop {
            let r_norm = r.norm();
            if r_norm <= self.settings.tolerance * b_norm {
                break;
            }
            if iterations >= self.settings.max_iterations {
                return Err(LinearSolveError::MaxIterationsReached {
                    max_iterations: self.settings.max_iterations,
                    residual_norm: r_norm,
                });
            }

            let Ap = spmv(matrix, &p);
            let pAp = p.dot(&Ap);
            if pAp <= 0.0 {
                return Err(LinearSolveError::IndefiniteOperator);
            }
            if zTr <= 0.0 {
                return Err(LinearSolveError::IndefinitePreconditioner);
            }

            let alpha = zTr / pAp;
            x.axpy(alpha, &p, 1.0);
            r.axpy(-alpha, &Ap, 1.0);
            iterations += 1;

            z = preconditioner.apply(&r);
            let zTr_next = z.dot(&r);
            let beta = zTr_next / zTr;
            // p <- z + beta * p
            p.axpy(1.0, &z, beta);
            zTr = zTr_next;
        }

        Ok(x)
    }
}
