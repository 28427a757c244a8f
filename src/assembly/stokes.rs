//! Linear blocks of the (Navier-)Stokes saddle-point system.
//!
//! Velocities are vector fields with `dim` components per velocity basis function (node-major),
//! pressures are scalar fields. With the coupling block `B` and pressure block `C`, the
//! assembled system reads
//!
//! ```text
//! [ K   B^T ] [ u ]
//! [ B   C   ] [ p ]
//! ```
use crate::assembly::cache::{AssemblyValuesCache, ElementAssemblyValues};
use crate::assembly::global::{
    assemble_cache_matrix_par, assemble_cache_vector_par, assemble_matrix_par, local_dof_indices, ElementMatrix,
};
use eyre::bail;
use itertools::izip;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;

/// Element matrix `coefficient * (grad phi_i, grad phi_j)` of a scalar field.
pub fn element_laplacian(values: &ElementAssemblyValues, coefficient: f64) -> DMatrix<f64> {
    let n = values.num_bases();
    let mut local = DMatrix::zeros(n, n);
    for (gradients, da) in values.basis_gradients.iter().zip(&values.da) {
        local += (gradients * gradients.transpose()) * (coefficient * da);
    }
    local
}

/// Element matrix `density * (phi_i, phi_j)` of a scalar field.
pub fn element_mass(values: &ElementAssemblyValues, density: f64) -> DMatrix<f64> {
    let n = values.num_bases();
    let mut local = DMatrix::zeros(n, n);
    for (phi, da) in values.basis_values.row_iter().zip(&values.da) {
        local += (phi.transpose() * phi) * (density * da);
    }
    local
}

pub fn element_vector_laplacian(values: &ElementAssemblyValues, coefficient: f64) -> DMatrix<f64> {
    expand_to_components(&element_laplacian(values, coefficient), values.dimension)
}

pub fn element_vector_mass(values: &ElementAssemblyValues, density: f64) -> DMatrix<f64> {
    expand_to_components(&element_mass(values, density), values.dimension)
}

/// Expands a scalar `n x n` element matrix to a block-diagonal `dn x dn` matrix acting on each
/// of `d` components independently.
fn expand_to_components(scalar: &DMatrix<f64>, d: usize) -> DMatrix<f64> {
    let n = scalar.nrows();
    DMatrix::from_fn(d * n, d * n, |r, c| {
        if r % d == c % d {
            scalar[(r / d, c / d)]
        } else {
            0.0
        }
    })
}

pub fn assemble_vector_laplacian(cache: &AssemblyValuesCache, viscosity: f64) -> eyre::Result<CsrMatrix<f64>> {
    assemble_cache_matrix_par(cache, cache.dimension(), |values| {
        Ok(element_vector_laplacian(values, viscosity))
    })
}

pub fn assemble_vector_mass(cache: &AssemblyValuesCache, density: f64) -> eyre::Result<CsrMatrix<f64>> {
    assemble_cache_matrix_par(cache, cache.dimension(), |values| Ok(element_vector_mass(values, density)))
}

fn check_compatible(velocity: &AssemblyValuesCache, pressure: &AssemblyValuesCache) -> eyre::Result<()> {
    if velocity.num_elements() != pressure.num_elements() {
        bail!(
            "velocity and pressure discretizations have {} and {} elements",
            velocity.num_elements(),
            pressure.num_elements()
        );
    }
    if velocity.dimension() != pressure.dimension() {
        bail!("velocity and pressure discretizations have different dimensions");
    }
    Ok(())
}

/// Assembles the coupling block `B_{q, (j, b)} = -(psi_q, d phi_j / d x_b)` of size
/// `n_p x (dim * n_v)`.
pub fn assemble_divergence(
    velocity: &AssemblyValuesCache,
    pressure: &AssemblyValuesCache,
) -> eyre::Result<CsrMatrix<f64>> {
    check_compatible(velocity, pressure)?;
    let d = velocity.dimension();
    assemble_matrix_par(
        pressure.num_bases(),
        d * velocity.num_bases(),
        velocity.num_elements(),
        |e| {
            let v = velocity.element(e);
            let p = pressure.element(e);
            if v.num_quadrature_points() != p.num_quadrature_points() {
                bail!("element {}: velocity and pressure quadratures differ", e);
            }
            let mut local = DMatrix::zeros(p.num_bases(), d * v.num_bases());
            for (psi, gradients, da) in izip!(p.basis_values.row_iter(), &v.basis_gradients, &v.da) {
                for q in 0..p.num_bases() {
                    for j in 0..v.num_bases() {
                        for b in 0..d {
                            local[(q, d * j + b)] -= psi[q] * gradients[(j, b)] * da;
                        }
                    }
                }
            }
            Ok(ElementMatrix {
                row_indices: p.basis_indices.clone(),
                col_indices: local_dof_indices(&v.basis_indices, d),
                values: local,
            })
        },
    )
}

/// Assembles the pressure stabilization block `-beta h_e^2 (grad psi_p, grad psi_q)`, where
/// `h_e` is the element diameter.
///
/// A zero `beta` gives an empty block with the right dimensions.
pub fn assemble_pressure_stabilization(pressure: &AssemblyValuesCache, beta: f64) -> eyre::Result<CsrMatrix<f64>> {
    if beta == 0.0 {
        return Ok(CsrMatrix::zeros(pressure.num_bases(), pressure.num_bases()));
    }
    assemble_cache_matrix_par(pressure, 1, |values| {
        let h = values.diameter();
        Ok(element_laplacian(values, -beta * h * h))
    })
}

/// Weights `w_q = (psi_q, 1) / |Omega|` such that `w . p` is the mean pressure.
pub fn assemble_pressure_average_weights(pressure: &AssemblyValuesCache) -> eyre::Result<DVector<f64>> {
    let integrals = assemble_cache_vector_par(pressure, 1, |values| {
        let mut local = DVector::zeros(values.num_bases());
        for (psi, da) in values.basis_values.row_iter().zip(&values.da) {
            local += psi.transpose() * *da;
        }
        Ok(local)
    })?;
    let measure: f64 = integrals.sum();
    if measure <= 0.0 {
        bail!("pressure discretization has non-positive measure {}", measure);
    }
    Ok(integrals / measure)
}
