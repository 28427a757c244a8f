//! The convective term `((w . grad) v, phi)` of the Navier-Stokes momentum equation and its
//! linearizations.
use crate::assembly::cache::{AssemblyValuesCache, ElementAssemblyValues};
use crate::assembly::global::{assemble_cache_matrix_par, assemble_cache_vector_par};
use eyre::bail;
use nalgebra::{DMatrix, DVector, DVectorView};
use nalgebra_sparse::CsrMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;
use tangent_autodiff::{first_order_variables, gradient_or_zeros, DualDVec64, Real, Zero};

/// How the convective term is linearized around the current velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Linearization {
    /// The advecting velocity is frozen (fixed-point iteration).
    Picard,
    /// The exact Jacobian, differentiating also through the advecting velocity.
    Newton,
}

impl fmt::Display for Linearization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Linearization::Picard => write!(f, "Picard"),
            Linearization::Newton => write!(f, "Newton"),
        }
    }
}

/// Element residual `r_{(i, a)} = sum_qp da phi_i sum_b w_b d v_a / d x_b`.
///
/// `advecting` (`w`) and `advected` (`v`) hold the local velocity values, node-major.
pub fn compute_convective_residual<T: Real>(
    values: &ElementAssemblyValues,
    advecting: &[T],
    advected: &[T],
) -> Vec<T> {
    let d = values.dimension;
    let n = values.num_bases();
    assert_eq!(advecting.len(), d * n);
    assert_eq!(advected.len(), d * n);

    let mut residual = vec![T::zero(); d * n];
    for (q, (gradients, da)) in values.basis_gradients.iter().zip(&values.da).enumerate() {
        let phi = values.basis_values.row(q);

        let mut w = vec![T::zero(); d];
        for j in 0..n {
            for b in 0..d {
                w[b] += advecting[d * j + b].clone() * phi[j];
            }
        }

        for a in 0..d {
            let mut convection = T::zero();
            for b in 0..d {
                let mut dv_dx = T::zero();
                for j in 0..n {
                    dv_dx += advected[d * j + a].clone() * gradients[(j, b)];
                }
                convection += w[b].clone() * dv_dx;
            }
            for i in 0..n {
                residual[d * i + a] += convection.clone() * (phi[i] * da);
            }
        }
    }
    residual
}

/// Element Jacobian of the convective residual with respect to the local velocity.
pub fn element_convection_jacobian(
    values: &ElementAssemblyValues,
    velocity: &DVector<f64>,
    linearization: Linearization,
) -> DMatrix<f64> {
    let m = velocity.len();
    let variables = first_order_variables(velocity.as_slice());
    let residual = match linearization {
        Linearization::Picard => {
            let frozen: Vec<DualDVec64> = velocity.iter().map(|&v| DualDVec64::from(v)).collect();
            compute_convective_residual(values, &frozen, &variables)
        }
        Linearization::Newton => compute_convective_residual(values, &variables, &variables),
    };

    let mut jacobian = DMatrix::zeros(m, m);
    for (i, r) in residual.iter().enumerate() {
        jacobian
            .row_mut(i)
            .copy_from(&gradient_or_zeros(r, m).transpose());
    }
    jacobian
}

fn check_velocity(cache: &AssemblyValuesCache, velocity: &DVectorView<f64>) -> eyre::Result<()> {
    let expected = cache.dimension() * cache.num_bases();
    if velocity.len() != expected {
        bail!("velocity has length {}, expected {}", velocity.len(), expected);
    }
    Ok(())
}

/// Assembles the global convective residual `N(v) v`.
pub fn assemble_convection_residual(
    cache: &AssemblyValuesCache,
    velocity: DVectorView<f64>,
) -> eyre::Result<DVector<f64>> {
    check_velocity(cache, &velocity)?;
    let d = cache.dimension();
    assemble_cache_vector_par(cache, d, |values| {
        let local: Vec<f64> = values.gather(velocity, d).iter().copied().collect();
        let residual = compute_convective_residual(values, &local, &local);
        Ok(DVector::from_vec(residual))
    })
}

/// Assembles the Picard matrix or the Newton Jacobian of the convective term at `velocity`.
pub fn assemble_convection_matrix(
    cache: &AssemblyValuesCache,
    velocity: DVectorView<f64>,
    linearization: Linearization,
) -> eyre::Result<CsrMatrix<f64>> {
    check_velocity(cache, &velocity)?;
    let d = cache.dimension();
    assemble_cache_matrix_par(cache, d, |values| {
        let local = values.gather(velocity, d);
        Ok(element_convection_jacobian(values, &local, linearization))
    })
}
