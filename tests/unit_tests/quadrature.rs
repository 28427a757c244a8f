use matrixcompare::assert_scalar_eq;
use tangent::quadrature::{gauss, hexahedron_gauss, quadrilateral_gauss, tensor_gauss};

#[test]
fn gauss_rules_integrate_polynomials_exactly() {
    for n in 1..=6 {
        let rule = gauss(n);
        assert_eq!(rule.len(), n);
        assert_eq!(rule.dimension(), 1);
        for degree in 0..2 * n as i32 {
            let integral = rule.integrate(|x| x[0].powi(degree));
            let expected = if degree % 2 == 0 { 2.0 / (degree + 1) as f64 } else { 0.0 };
            assert_scalar_eq!(integral, expected, comp = abs, tol = 1e-13);
        }
    }
}

#[test]
fn gauss_points_are_sorted_and_symmetric() {
    let rule = gauss(5);
    let x: Vec<f64> = rule.points.iter().map(|p| p[0]).collect();
    assert!(x.windows(2).all(|w| w[0] < w[1]));
    for i in 0..5 {
        assert_scalar_eq!(x[i], -x[4 - i], comp = abs, tol = 1e-15);
        assert_scalar_eq!(rule.weights[i], rule.weights[4 - i], comp = abs, tol = 1e-15);
    }
    assert_scalar_eq!(x[2], 0.0, comp = abs, tol = 1e-15);
}

#[test]
fn tensor_rules_integrate_products_exactly() {
    let quad = quadrilateral_gauss(2);
    assert_eq!(quad.len(), 4);
    assert_eq!(quad.dimension(), 2);
    // int x^2 y^2 over [-1, 1]^2 = 4 / 9
    assert_scalar_eq!(quad.integrate(|p| p[0].powi(2) * p[1].powi(2)), 4.0 / 9.0, comp = abs, tol = 1e-14);

    let hex = hexahedron_gauss(3);
    assert_eq!(hex.len(), 27);
    assert_scalar_eq!(hex.integrate(|_| 1.0), 8.0, comp = abs, tol = 1e-13);
    let f = |p: &nalgebra::DVector<f64>| p[0].powi(4) * p[1].powi(2) + p[2];
    // (2 / 5) (2 / 3) 2
    assert_scalar_eq!(hex.integrate(f), 8.0 / 15.0, comp = abs, tol = 1e-13);
}

#[test]
fn tensor_rule_first_coordinate_varies_fastest() {
    let rule = tensor_gauss(2, 2);
    assert!(rule.points[0][0] < rule.points[1][0]);
    assert_eq!(rule.points[0][1], rule.points[1][1]);
    assert!(rule.points[1][1] < rule.points[2][1]);
}
