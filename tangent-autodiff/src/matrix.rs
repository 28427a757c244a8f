//! Small dense matrix functions that only use arithmetic, so that they can be evaluated with
//! any [`Real`] number type and differentiated.
//!
//! The functions are intended for the `d x d` matrices (`d <= 3`) that appear in continuum
//! mechanics, such as deformation gradients and right Cauchy-Green tensors.
use crate::{One, Real};
use nalgebra::DMatrix;

/// Squaring iterations after which the Denman-Beavers iterates are considered converged.
const SQRT_CONVERGED_SWEEPS: usize = 3;
const SQRT_MAX_ITERATIONS: usize = 100;
const SQRT_TOLERANCE: f64 = 1e-14;

const LOG_SERIES_RADIUS: f64 = 0.2;
const LOG_SERIES_TERMS: usize = 30;
const LOG_MAX_SQUARE_ROOTS: usize = 40;

const EXP_SERIES_RADIUS: f64 = 0.5;
const EXP_SERIES_TERMS: usize = 20;
const EXP_MAX_SQUARINGS: i32 = 60;

/// Frobenius norm of the real parts.
pub fn value_norm<T: Real>(matrix: &DMatrix<T>) -> f64 {
    matrix
        .iter()
        .map(|x| x.re() * x.re())
        .sum::<f64>()
        .sqrt()
}

/// Determinant of a square matrix of dimension 1, 2 or 3.
///
/// # Panics
///
/// Panics if the matrix is not square or its dimension exceeds 3.
#[allow(non_snake_case)]
pub fn determinant<T: Real>(A: &DMatrix<T>) -> T {
    assert!(A.is_square(), "Matrix must be square");
    let a = |i: usize, j: usize| A[(i, j)].clone();
    match A.nrows() {
        0 => T::one(),
        1 => a(0, 0),
        2 => a(0, 0) * a(1, 1) - a(0, 1) * a(1, 0),
        3 => {
            a(0, 0) * (a(1, 1) * a(2, 2) - a(1, 2) * a(2, 1)) - a(0, 1) * (a(1, 0) * a(2, 2) - a(1, 2) * a(2, 0))
                + a(0, 2) * (a(1, 0) * a(2, 1) - a(1, 1) * a(2, 0))
        }
        n => panic!("Determinant is only implemented for dimensions up to 3, got {}", n),
    }
}

/// Inverse through the adjugate of a square matrix of dimension 1, 2 or 3.
///
/// The entries of the result are not finite if the matrix is singular.
#[allow(non_snake_case)]
pub fn inverse<T: Real>(A: &DMatrix<T>) -> DMatrix<T> {
    let det_inv = determinant(A).recip();
    let a = |i: usize, j: usize| A[(i, j)].clone();
    let n = A.nrows();
    let adjugate = match n {
        0 => DMatrix::zeros(0, 0),
        1 => DMatrix::from_element(1, 1, T::one()),
        2 => DMatrix::from_row_slice(2, 2, &[a(1, 1), -a(0, 1), -a(1, 0), a(0, 0)]),
        3 => {
            // Entry (i, j) of the adjugate is the (j, i) cofactor
            let cofactor = |i: usize, j: usize| {
                let (r0, r1) = ((i + 1) % 3, (i + 2) % 3);
                let (c0, c1) = ((j + 1) % 3, (j + 2) % 3);
                a(r0, c0) * a(r1, c1) - a(r0, c1) * a(r1, c0)
            };
            DMatrix::from_fn(3, 3, |i, j| cofactor(j, i))
        }
        n => panic!("Inverse is only implemented for dimensions up to 3, got {}", n),
    };
    adjugate.map(|x| x * det_inv.clone())
}

/// Principal square root of a symmetric positive definite matrix.
///
/// Uses the Denman-Beavers iteration. The iteration is continued for a few sweeps after the
/// real parts have converged, so that the derivative parts converge as well.
#[allow(non_snake_case)]
pub fn spd_sqrt<T: Real>(A: &DMatrix<T>) -> DMatrix<T> {
    let n = A.nrows();
    let mut y = A.clone();
    let mut z = DMatrix::<T>::identity(n, n);
    let mut converged_sweeps = 0;
    for _ in 0..SQRT_MAX_ITERATIONS {
        let y_inv = inverse(&y);
        let z_inv = inverse(&z);
        let y_next = (&y + &z_inv).map(|x| x * 0.5);
        let z_next = (&z + &y_inv).map(|x| x * 0.5);
        let change = value_norm(&(&y_next - &y));
        y = y_next;
        z = z_next;

        if change <= SQRT_TOLERANCE * (1.0 + value_norm(&y)) {
            converged_sweeps += 1;
            if converged_sweeps >= SQRT_CONVERGED_SWEEPS {
                break;
            }
        }
    }
    y
}

/// Principal logarithm of a symmetric positive definite matrix.
///
/// Takes repeated square roots until the matrix is close to the identity, evaluates the
/// series of `log(I + E)` and scales the result back.
#[allow(non_snake_case)]
pub fn spd_log<T: Real>(A: &DMatrix<T>) -> DMatrix<T> {
    let n = A.nrows();
    let identity = DMatrix::<T>::identity(n, n);
    let mut x = A.clone();
    let mut square_roots = 0;
    while value_norm(&(&x - &identity)) > LOG_SERIES_RADIUS && square_roots < LOG_MAX_SQUARE_ROOTS {
        x = spd_sqrt(&x);
        square_roots += 1;
    }

    // log(I + E) = E - E^2 / 2 + E^3 / 3 - ...
    let e = &x - &identity;
    let mut power = e.clone();
    let mut log = e.clone();
    for k in 2..=LOG_SERIES_TERMS {
        power = &power * &e;
        let sign = if k % 2 == 0 { -1.0 } else { 1.0 };
        log += power.map(|p| p * sign / k as f64);
    }

    let scale = 2.0_f64.powi(square_roots as i32);
    log.map(|x| x * scale)
}

/// Exponential of a square matrix by scaling and squaring of a truncated Taylor series.
#[allow(non_snake_case)]
pub fn exp<T: Real>(A: &DMatrix<T>) -> DMatrix<T> {
    let n = A.nrows();
    let norm = value_norm(A);
    let mut squarings = 0;
    while norm * 0.5_f64.powi(squarings) > EXP_SERIES_RADIUS && squarings < EXP_MAX_SQUARINGS {
        squarings += 1;
    }
    let scaled = A.map(|x| x * 0.5_f64.powi(squarings));

    let mut term = DMatrix::<T>::identity(n, n);
    let mut result = term.clone();
    for k in 1..=EXP_SERIES_TERMS {
        term = (&term * &scaled).map(|x| x / k as f64);
        result += &term;
    }

    for _ in 0..squarings {
        result = &result * &result;
    }
    result
}

/// Computes `tr(A^p)` for a symmetric positive definite matrix `A` and real exponent `p`.
///
/// Evaluated as `tr(exp(p log A))`, which is smooth also where eigenvalues of `A` coincide.
#[allow(non_snake_case)]
pub fn spd_power_trace<T: Real>(A: &DMatrix<T>, p: f64) -> T {
    let log = spd_log(A).map(|x| x * p);
    exp(&log).trace()
}
