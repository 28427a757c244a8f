//! Forward-mode automatic differentiation for `tangent`, built on `num-dual`.
//!
//! Energies in `tangent` are written once, generically over a [`Real`] number type. Evaluating
//! the same code with
//!
//! - [`f64`] gives the value,
//! - [`DualDVec64`] additionally gives the gradient with respect to a set of independent variables,
//! - [`Dual2DVec64`] additionally gives the Hessian.
//!
//! Derivatives are stored with a dynamic dimension, since the number of independent variables
//! (element degrees of freedom) is only known at runtime. Numbers created with `T::from(value)`
//! carry no derivative information and act as constants.
use nalgebra::{ClosedAdd, ClosedDiv, ClosedMul, ClosedSub, DMatrix, DVector, Dyn, Scalar, U1};

pub use num::{One, Zero};
pub use num_dual::{Derivative, Dual2DVec64, DualDVec64, DualNum};

pub mod calculus;
pub mod matrix;

/// A real number type which may carry derivative information.
///
/// The bounds make `DMatrix<T>` usable with the usual `nalgebra` arithmetic (products,
/// transposes, traces), which is what the material models rely on.
pub trait Real:
    DualNum<f64> + From<f64> + Scalar + ClosedAdd + ClosedSub + ClosedMul + ClosedDiv + Send + Sync
{
}

impl<T> Real for T where
    T: DualNum<f64> + From<f64> + Scalar + ClosedAdd + ClosedSub + ClosedMul + ClosedDiv + Send + Sync
{
}

fn unit_vector(n: usize, i: usize) -> DVector<f64> {
    DVector::from_fn(n, |j, _| if i == j { 1.0 } else { 0.0 })
}

/// Independent variables for every entry of `values`, for first derivatives.
pub fn first_order_variables(values: &[f64]) -> Vec<DualDVec64> {
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| DualDVec64::new(v, Derivative::some(unit_vector(n, i))))
        .collect()
}

/// Independent variables for every entry of `values`, for first and second derivatives.
pub fn second_order_variables(values: &[f64]) -> Vec<Dual2DVec64> {
    let n = values.len();
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| Dual2DVec64::new(v, Derivative::some(unit_vector(n, i).transpose()), Derivative::none()))
        .collect()
}

/// The gradient with respect to `num_variables` variables, zero for constants.
pub fn gradient_or_zeros(x: &DualDVec64, num_variables: usize) -> DVector<f64> {
    x.eps.clone().unwrap_generic(Dyn(num_variables), U1)
}

/// The gradient part of a second-order dual number, zero for constants.
pub fn second_order_gradient_or_zeros(x: &Dual2DVec64, num_variables: usize) -> DVector<f64> {
    x.v1.clone().unwrap_generic(U1, Dyn(num_variables)).transpose()
}

/// The Hessian with respect to `num_variables` variables, zero for constants.
pub fn hessian_or_zeros(x: &Dual2DVec64, num_variables: usize) -> DMatrix<f64> {
    x.v2.clone().unwrap_generic(Dyn(num_variables), Dyn(num_variables))
}
