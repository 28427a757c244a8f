//! Finite difference approximations used to verify derivatives computed with dual numbers.
use nalgebra::{DMatrix, DMatrixViewMut, DVector, DVectorView, DVectorViewMut};

/// Approximates the gradient of the function `f: R^n -> R` with central finite differences.
///
/// The parameter `h` determines the step size of the finite difference approximation.
///
/// The vector `x` is mutable in order to contain intermediate computations, but upon returning,
/// its content remains unchanged.
pub fn approximate_gradient_fd<'a>(
    mut f: impl FnMut(DVectorView<f64>) -> f64,
    x: impl Into<DVectorViewMut<'a, f64>>,
    h: f64,
) -> DVector<f64> {
    let mut x = x.into();
    let n = x.len();
    let mut df = DVector::zeros(n);
    for i in 0..n {
        let x_i = x[i];
        x[i] = x_i + h;
        let f_plus = f(DVectorView::from(&x));
        x[i] = x_i - h;
        let f_minus = f(DVectorView::from(&x));
        x[i] = x_i;
        df[i] = (f_plus - f_minus) / (2.0 * h);
    }
    df
}

/// Approximates the Jacobian of the function $f: \mathbb{R}^n \rightarrow \mathbb{R}^m$
/// with central finite differences.
///
/// The Jacobian matrix is the $m \times n$ matrix whose entries are given by
/// $$ J_{ij} := \pd{f_i}{x_j}.$$
pub fn approximate_jacobian_fd<'a>(
    m: usize,
    f: impl FnMut(DVectorView<f64>, DVectorViewMut<f64>),
    x: impl Into<DVectorViewMut<'a, f64>>,
    h: f64,
) -> DMatrix<f64> {
    let x = x.into();
    let mut jacobian = DMatrix::zeros(m, x.len());
    approximate_jacobian_fd_into(DMatrixViewMut::from(&mut jacobian), f, x, h);
    jacobian
}

/// Same as [`approximate_jacobian_fd`], but stores the result in the provided output matrix.
pub fn approximate_jacobian_fd_into(
    mut jacobian: DMatrixViewMut<f64>,
    mut f: impl FnMut(DVectorView<f64>, DVectorViewMut<f64>),
    mut x: DVectorViewMut<f64>,
    h: f64,
) {
    let m = jacobian.nrows();
    let n = x.len();
    assert_eq!(n, jacobian.ncols());

    let mut f_plus = DVector::zeros(m);
    let mut f_minus = DVector::zeros(m);

    for i in 0..n {
        let x_i = x[i];
        x[i] = x_i + h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_plus));
        x[i] = x_i - h;
        f(DVectorView::from(&x), DVectorViewMut::from(&mut f_minus));
        x[i] = x_i;

        let mut column = jacobian.column_mut(i);
        column.copy_from(&f_plus);
        column -= &f_minus;
        column /= 2.0 * h;
    }
}

/// Approximates the Hessian of `f: R^n -> R` by central differences of a gradient function.
///
/// The result is symmetrized.
pub fn approximate_hessian_fd<'a>(
    mut gradient: impl FnMut(DVectorView<f64>) -> DVector<f64>,
    x: impl Into<DVectorViewMut<'a, f64>>,
    h: f64,
) -> DMatrix<f64> {
    let x = x.into();
    let n = x.len();
    let hessian = approximate_jacobian_fd(n, |x, mut g| g.copy_from(&gradient(x)), x, h);
    (&hessian + hessian.transpose()) * 0.5
}
