use crate::linear::{
    check_dimensions, spmv, LinearSolveError, LinearSolver, LinearSolverSettings, Preconditioner, PreconditionerKind,
};
use nalgebra::DVector;
use nalgebra_sparse::CsrMatrix;

const BREAKDOWN_THRESHOLD: f64 = 1e-300;

/// Right-preconditioned BiCGSTAB for general (non-symmetric) systems.
#[derive(Debug, Clone)]
pub struct BiCgStab {
    preconditioner: PreconditionerKind,
    settings: LinearSolverSettings,
}

impl BiCgStab {
    pub fn new(preconditioner: PreconditionerKind) -> Self {
        Self {
            preconditioner,
            settings: LinearSolverSettings::default(),
        }
    }
}

impl LinearSolver for BiCgStab {
    fn name(&self) -> &str {
        "bicgstab"
    }

    fn set_settings(&mut self, settings: &LinearSolverSettings) {
        self.settings = *settings;
    }

    fn solve(&mut self, matrix: &CsrMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, LinearSolveError> {
        check_dimensions(matrix, b)?;
        let preconditioner = Preconditioner::build(self.preconditioner, matrix);
        let n = b.len();
        let tolerance = self.settings.tolerance * b.norm();

        let mut x = DVector::zeros(n);
        if b.norm() == 0.0 {
            return Ok(x);
        }

        let mut r = b.clone();
        let r_hat = r.clone();
        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut v = DVector::zeros(n);
        let mut p = DVector::zeros(n);

        for iteration in 0..self.settings.max_iterations {
            let rho_prev = rho;
            rho = r_hat.dot(&r);
            if rho.abs() < BREAKDOWN_THRESHOLD {
                return Err(LinearSolveError::Breakdown { iterations: iteration });
            }

            if iteration == 0 {
                p.copy_from(&r);
            } else {
                let beta = (rho / rho_prev) * (alpha / omega);
                // p <- r + beta * (p - omega * v)
                p.axpy(-omega, &v, 1.0);
                p.axpy(1.0, &r, beta);
            }

            let p_hat = preconditioner.apply(&p);
            v = spmv(matrix, &p_hat);
            let r_hat_v = r_hat.dot(&v);
            if r_hat_v.abs() < BREAKDOWN_THRESHOLD {
                return Err(LinearSolveError::Breakdown { iterations: iteration });
            }
            alpha = rho / r_hat_v;

            let s = &r - &v * alpha;
            if s.norm() <= tolerance {
                x.axpy(alpha, &p_hat, 1.0);
                return Ok(x);
            }

            let s_hat = preconditioner.apply(&s);
            let t = spmv(matrix, &s_hat);
            let t_t = t.dot(&t);
            if t_t < BREAKDOWN_THRESHOLD {
                return Err(LinearSolveError::Breakdown { iterations: iteration });
            }
            omega = t.dot(&s) / t_t;

            x.axpy(alpha, &p_hat, 1.0);
            x.axpy(omega, &s_hat, 1.0);
            r = s - &t * omega;

            if r.norm() <= tolerance {
                return Ok(x);
            }
            if omega.abs() < BREAKDOWN_THRESHOLD {
                return Err(LinearSolveError::Breakdown { iterations: iteration + 1 });
            }
        }

        Err(LinearSolveError::MaxIterationsReached {
            max_iterations: self.settings.max_iterations,
            residual_norm: r.norm(),
        })
    }
}
