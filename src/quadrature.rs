//! Gauss-Legendre quadrature on the reference interval, square and cube.
//!
//! Reference domains are `[-1, 1]^d`.
use itertools::Itertools;
use nalgebra::DVector;

/// A quadrature rule: weights and points in reference coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadratureRule {
    pub weights: Vec<f64>,
    pub points: Vec<DVector<f64>>,
}

impl QuadratureRule {
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.points.first().map(|p| p.len()).unwrap_or(0)
    }

    /// Integrates a function over the reference domain.
    pub fn integrate(&self, f: impl Fn(&DVector<f64>) -> f64) -> f64 {
        self.weights
            .iter()
            .zip(&self.points)
            .map(|(w, x)| w * f(x))
            .sum()
    }
}

/// Gauss-Legendre rule with `num_points` points on `[-1, 1]`, exact for polynomials of degree
/// `2 num_points - 1`. Points are sorted in ascending order.
///
/// # Panics
///
/// Panics if `num_points` is zero.
pub fn gauss(num_points: usize) -> QuadratureRule {
    let (weights, points) = fenris_quadrature::univariate::gauss(num_points);
    let nodes: Vec<(f64, f64)> = points
        .iter()
        .zip(weights)
        .map(|([x], w)| (*x, w))
        .sorted_by(|a, b| a.0.total_cmp(&b.0))
        .collect();

    QuadratureRule {
        weights: nodes.iter().map(|(_, w)| *w).collect(),
        points: nodes.iter().map(|(x, _)| DVector::from_element(1, *x)).collect(),
    }
}

/// Tensor-product Gauss rule on `[-1, 1]^dim` with `points_per_dim` points along each axis.
///
/// Points are ordered with the first coordinate varying fastest.
pub fn tensor_gauss(dim: usize, points_per_dim: usize) -> QuadratureRule {
    assert!(dim > 0, "dimension must be positive");
    let rule = gauss(points_per_dim);
    let nodes: Vec<(f64, f64)> = rule
        .weights
        .iter()
        .zip(&rule.points)
        .map(|(w, p)| (p[0], *w))
        .collect();

    let mut weights = Vec::new();
    let mut points = Vec::new();
    // multi_cartesian_product varies the last factor fastest, so reverse each tuple
    for combination in (0..dim).map(|_| nodes.iter()).multi_cartesian_product() {
        let point = DVector::from_iterator(dim, combination.iter().rev().map(|(x, _)| *x));
        weights.push(combination.iter().map(|(_, w)| *w).product());
        points.push(point);
    }
    QuadratureRule { weights, points }
}

pub fn quadrilateral_gauss(points_per_dim: usize) -> QuadratureRule {
    tensor_gauss(2, points_per_dim)
}

pub fn hexahedron_gauss(points_per_dim: usize) -> QuadratureRule {
    tensor_gauss(3, points_per_dim)
}
