//! Solid mechanics functionality for `tangent`.
//!
//! Material models are written once as an energy density $\psi(\vec F)$, generic over
//! [`Real`]. Stresses, element gradients and element Hessians are obtained by evaluating
//! the same density with the dual numbers of `num-dual`.
use nalgebra::DMatrix;
use tangent_autodiff::{first_order_variables, gradient_or_zeros, Real};

pub mod materials;
pub mod model;

pub use model::{assemble_energy, assemble_gradient, assemble_hessian, ElasticityModel};

pub trait HyperelasticMaterial {
    type Parameters: Clone;

    /// Compute the energy density $\psi = \psi(\vec F)$ associated with the material.
    fn compute_energy_density<T: Real>(
        &self,
        deformation_gradient: &DMatrix<T>,
        parameters: &Self::Parameters,
    ) -> T;

    /// Compute the First Piola-Kirchhoff stress tensor $\vec P = \partial \psi / \partial \vec F$.
    ///
    /// The default implementation differentiates the energy density with respect to every
    /// entry of $\vec F$.
    fn compute_stress_tensor(&self, deformation_gradient: &DMatrix<f64>, parameters: &Self::Parameters) -> DMatrix<f64> {
        let (rows, cols) = deformation_gradient.shape();
        // Column-major, matching the storage order of F
        let variables = first_order_variables(deformation_gradient.as_slice());
        let f = DMatrix::from_vec(rows, cols, variables);
        let psi = self.compute_energy_density(&f, parameters);
        let gradient = gradient_or_zeros(&psi, rows * cols);
        DMatrix::from_column_slice(rows, cols, gradient.as_slice())
    }
}
