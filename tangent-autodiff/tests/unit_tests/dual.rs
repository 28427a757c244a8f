use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dmatrix, dvector, DMatrix, DVector, DVectorView};
use tangent_autodiff::calculus::{approximate_gradient_fd, approximate_hessian_fd};
use tangent_autodiff::{
    first_order_variables, gradient_or_zeros, hessian_or_zeros, second_order_gradient_or_zeros,
    second_order_variables, Dual2DVec64, DualDVec64, DualNum, Real,
};

/// A function exercising every elementary operation.
fn test_function<T: Real>(x: &[T]) -> T {
    let (a, b, c) = (x[0].clone(), x[1].clone(), x[2].clone());
    let t1 = a.clone() * a.clone() * b.clone();
    let t2 = a.ln() * b.exp() / (a.clone() + c.clone());
    let t3 = (b.clone() * c.clone()).sqrt() - c.powf(1.5) + a.powi(3).recip();
    let t4 = -(b - T::from(2.0)) * 0.25;
    t1 + t2 + t3 + t4
}

fn evaluate_f64(x: DVectorView<f64>) -> f64 {
    let x: Vec<f64> = x.iter().copied().collect();
    test_function(&x)
}

fn evaluate_gradient(x: DVectorView<f64>) -> DVector<f64> {
    let x: Vec<f64> = x.iter().copied().collect();
    gradient_or_zeros(&test_function(&first_order_variables(&x)), x.len())
}

#[test]
fn product_rule_is_exact() {
    let variables = second_order_variables(&[3.0, 2.0]);
    let z = variables[0].clone() * variables[1].clone();

    assert_scalar_eq!(z.re(), 6.0);
    assert_matrix_eq!(second_order_gradient_or_zeros(&z, 2), dvector![2.0, 3.0]);
    assert_matrix_eq!(hessian_or_zeros(&z, 2), dmatrix![0.0, 1.0; 1.0, 0.0]);
}

#[test]
fn constants_combine_with_variables() {
    let x = first_order_variables(&[3.0, 1.0])[0].clone();
    let two = DualDVec64::from(2.0);
    assert_matrix_eq!(gradient_or_zeros(&two, 2), DVector::<f64>::zeros(2));

    let z = two.clone() * x.clone() + two - x;
    assert_scalar_eq!(z.re(), 5.0);
    assert_matrix_eq!(gradient_or_zeros(&z, 2), dvector![1.0, 0.0]);
}

#[test]
fn constant_expressions_have_zero_derivatives() {
    let c = Dual2DVec64::from(4.0).sqrt().ln();
    assert_scalar_eq!(c.re(), 2.0_f64.ln(), comp = float);
    assert_matrix_eq!(second_order_gradient_or_zeros(&c, 3), DVector::<f64>::zeros(3));
    assert_matrix_eq!(hessian_or_zeros(&c, 3), DMatrix::<f64>::zeros(3, 3));
}

#[test]
fn values_agree_across_number_types() {
    let x = [1.3, 0.7, 2.1];
    let f = test_function(&x);
    let f1 = test_function(&first_order_variables(&x));
    let f2 = test_function(&second_order_variables(&x));
    assert_scalar_eq!(f1.re(), f, comp = float);
    assert_scalar_eq!(f2.re(), f, comp = float);
}

#[test]
fn first_order_gradient_matches_finite_differences() {
    let mut x = dvector![1.3, 0.7, 2.1];
    let gradient = evaluate_gradient(DVectorView::from(&x));
    let gradient_fd = approximate_gradient_fd(evaluate_f64, &mut x, 1e-6);
    assert_matrix_eq!(gradient, gradient_fd, comp = abs, tol = 1e-7);
}

#[test]
fn second_order_derivatives_match_finite_differences() {
    let mut x = dvector![1.3, 0.7, 2.1];
    let f2 = test_function(&second_order_variables(x.as_slice()));
    let hessian = hessian_or_zeros(&f2, 3);

    let gradient = evaluate_gradient(DVectorView::from(&x));
    assert_matrix_eq!(second_order_gradient_or_zeros(&f2, 3), gradient, comp = abs, tol = 1e-12);

    let hessian_fd = approximate_hessian_fd(evaluate_gradient, &mut x, 1e-6);
    assert_matrix_eq!(hessian, hessian_fd, comp = abs, tol = 1e-6);
    assert_matrix_eq!(hessian, hessian.transpose(), comp = abs, tol = 1e-12);
}

#[test]
fn powi_handles_small_exponents() {
    let x = second_order_variables(&[2.0]).remove(0);
    let zero = x.powi(0);
    let one = x.powi(1);
    let three = x.powi(3);

    assert_scalar_eq!(zero.re(), 1.0);
    assert_scalar_eq!(second_order_gradient_or_zeros(&zero, 1)[0], 0.0);
    assert_scalar_eq!(second_order_gradient_or_zeros(&one, 1)[0], 1.0);
    assert_scalar_eq!(hessian_or_zeros(&one, 1)[(0, 0)], 0.0);
    assert_scalar_eq!(second_order_gradient_or_zeros(&three, 1)[0], 12.0);
    assert_scalar_eq!(hessian_or_zeros(&three, 1)[(0, 0)], 12.0);
}
