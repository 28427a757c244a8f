//! Element-level and global energy, gradient and Hessian of a hyperelastic model.
use crate::materials::{LameParameters, Material, MaterialError, NeoHookeanMaterial, YoungPoisson};
use crate::HyperelasticMaterial;
use eyre::{bail, eyre};
use log::debug;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::CsrMatrix;
use serde_json::Value;
use tangent::assembly::global::{assemble_cache_matrix_par, assemble_cache_vector_par, assemble_scalar_par};
use tangent::assembly::{AssemblyValuesCache, ElementAssemblyValues};
use tangent::basis::ElementBases;
use tangent_autodiff::matrix::determinant;
use tangent_autodiff::{first_order_variables, gradient_or_zeros, hessian_or_zeros, second_order_variables, Real, Zero};

/// A hyperelastic material law applied to a vector-valued displacement field of dimension
/// [`size`](Self::size).
#[derive(Clone, Debug, PartialEq)]
pub struct ElasticityModel {
    size: usize,
    material: Material,
    multimaterial: Option<Vec<LameParameters>>,
}

impl ElasticityModel {
    pub fn new(size: usize, material: Material) -> Self {
        Self {
            size,
            material,
            multimaterial: None,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn set_size(&mut self, size: usize) {
        self.size = size;
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    /// Per-element Lamé parameters, if set.
    pub fn multimaterial(&self) -> Option<&[LameParameters]> {
        self.multimaterial.as_deref()
    }

    /// Reads the parameters of the current material law from JSON.
    pub fn set_parameters(&mut self, params: &Value, is_volume: bool) -> Result<(), MaterialError> {
        self.material.set_parameters(params, is_volume)?;
        debug!("Set {} parameters: {:?}", self.material.name(), self.material);
        Ok(())
    }

    /// Sets per-element Lamé parameters from per-element Young's moduli and Poisson ratios.
    ///
    /// Only supported by the Neo-Hookean law.
    pub fn init_multimaterial(&mut self, is_volume: bool, youngs: &[f64], poissons: &[f64]) -> Result<(), MaterialError> {
        if !matches!(self.material, Material::NeoHookean(_)) {
            return Err(MaterialError::UnsupportedMultimaterial);
        }
        if youngs.len() != poissons.len() {
            return Err(MaterialError::LengthMismatch {
                first: ("E", youngs.len()),
                second: ("nu", poissons.len()),
            });
        }
        let parameters = youngs
            .iter()
            .zip(poissons)
            .map(|(&young, &poisson)| LameParameters::from_young_poisson(YoungPoisson { young, poisson }, is_volume))
            .collect();
        self.multimaterial = Some(parameters);
        Ok(())
    }

    fn compute_energy_density<T: Real>(&self, element_index: usize, deformation_gradient: &DMatrix<T>) -> T {
        match &self.multimaterial {
            Some(parameters) => NeoHookeanMaterial.compute_energy_density(deformation_gradient, &parameters[element_index]),
            None => self.material.compute_energy_density(deformation_gradient),
        }
    }

    fn compute_stress(&self, element_index: usize, deformation_gradient: &DMatrix<f64>) -> DMatrix<f64> {
        match &self.multimaterial {
            Some(parameters) => NeoHookeanMaterial.compute_stress_tensor(deformation_gradient, &parameters[element_index]),
            None => self.material.compute_stress_tensor(deformation_gradient),
        }
    }

    fn check_element(&self, vals: &ElementAssemblyValues, displacement: &DVector<f64>, da: &[f64]) -> eyre::Result<()> {
        if vals.dimension != self.size {
            bail!(
                "element {} has dimension {}, but the model has size {}",
                vals.element_index,
                vals.dimension,
                self.size
            );
        }
        if da.len() != vals.num_quadrature_points() {
            bail!(
                "{} quadrature weights given for element {} with {} quadrature points",
                da.len(),
                vals.element_index,
                vals.num_quadrature_points()
            );
        }
        if let Some(&index) = vals.basis_indices.iter().find(|&&i| self.size * (i + 1) > displacement.len()) {
            bail!(
                "displacement of length {} does not cover basis function {} of element {}",
                displacement.len(),
                index,
                vals.element_index
            );
        }
        if let Some(parameters) = &self.multimaterial {
            if vals.element_index >= parameters.len() {
                bail!(
                    "no material parameters for element {} ({} elements configured)",
                    vals.element_index,
                    parameters.len()
                );
            }
        }
        Ok(())
    }

    /// Sums the energy density over the quadrature points of an element, for element-local
    /// displacement coefficients of any numeric type.
    #[allow(non_snake_case)]
    fn compute_energy_aux<T: Real>(&self, vals: &ElementAssemblyValues, local_displacement: &[T], da: &[f64]) -> eyre::Result<T> {
        let d = self.size;
        let n = vals.num_bases();
        debug_assert_eq!(local_displacement.len(), d * n);

        let mut energy = T::zero();
        for (q, (gradients, &w)) in vals.basis_gradients.iter().zip(da).enumerate() {
            // F = I + sum_j u_j (grad phi_j)^T
            let mut F = DMatrix::<T>::identity(d, d);
            for j in 0..n {
                for a in 0..d {
                    let u_ja = &local_displacement[d * j + a];
                    for b in 0..d {
                        F[(a, b)] += u_ja.clone() * gradients[(j, b)];
                    }
                }
            }

            let J = determinant(&F).re();
            if !(J > 0.0) {
                bail!(
                    "non-positive deformation gradient determinant {} in element {} at quadrature point {}",
                    J,
                    vals.element_index,
                    q
                );
            }
            energy += self.compute_energy_density(vals.element_index, &F) * w;
        }
        Ok(energy)
    }

    fn local_displacement(&self, vals: &ElementAssemblyValues, displacement: &DVector<f64>) -> Vec<f64> {
        vals.gather(displacement.as_view(), self.size)
            .iter()
            .copied()
            .collect()
    }

    /// Energy of an element for the global displacement field.
    pub fn compute_energy(&self, vals: &ElementAssemblyValues, displacement: &DVector<f64>, da: &[f64]) -> eyre::Result<f64> {
        self.check_element(vals, displacement, da)?;
        let u = self.local_displacement(vals, displacement);
        self.compute_energy_aux(vals, &u, da)
    }

    /// Gradient of the element energy with respect to the element's displacement coefficients,
    /// ordered node-major.
    pub fn assemble_gradient(
        &self,
        vals: &ElementAssemblyValues,
        displacement: &DVector<f64>,
        da: &[f64],
    ) -> eyre::Result<DVector<f64>> {
        self.check_element(vals, displacement, da)?;
        let u = first_order_variables(&self.local_displacement(vals, displacement));
        let energy = self.compute_energy_aux(vals, &u, da)?;
        Ok(gradient_or_zeros(&energy, u.len()))
    }

    /// Hessian of the element energy with respect to the element's displacement coefficients.
    pub fn assemble_hessian(
        &self,
        vals: &ElementAssemblyValues,
        displacement: &DVector<f64>,
        da: &[f64],
    ) -> eyre::Result<DMatrix<f64>> {
        self.check_element(vals, displacement, da)?;
        let u = second_order_variables(&self.local_displacement(vals, displacement));
        let energy = self.compute_energy_aux(vals, &u, da)?;
        Ok(hessian_or_zeros(&energy, u.len()))
    }

    #[allow(non_snake_case)]
    fn deformation_gradients(&self, vals: &ElementAssemblyValues, displacement: &DVector<f64>) -> Vec<DMatrix<f64>> {
        let d = self.size;
        let local = vals.gather(displacement.as_view(), d);
        // Rows of U are the nodal displacements
        let U = DMatrix::from_row_slice(vals.num_bases(), d, local.as_slice());
        vals.basis_gradients
            .iter()
            .map(|gradients| DMatrix::identity(d, d) + U.transpose() * gradients)
            .collect()
    }

    /// Cauchy stress $\vec \sigma = J^{-1} \vec P \vec F^T$ of an element at the given reference
    /// points.
    #[allow(non_snake_case)]
    pub fn compute_stress_tensor<B>(
        &self,
        bases: &B,
        element_index: usize,
        reference_points: &[DVector<f64>],
        displacement: &DVector<f64>,
    ) -> eyre::Result<Vec<DMatrix<f64>>>
    where
        B: ?Sized + ElementBases,
    {
        let weights = vec![1.0; reference_points.len()];
        let vals = bases.evaluate(element_index, &weights, reference_points)?;
        self.check_element(&vals, displacement, &weights)?;

        self.deformation_gradients(&vals, displacement)
            .into_iter()
            .map(|F| {
                let J = F.determinant();
                if !(J > 0.0) {
                    return Err(eyre!(
                        "non-positive deformation gradient determinant {} in element {}",
                        J,
                        element_index
                    ));
                }
                let P = self.compute_stress(element_index, &F);
                Ok(P * F.transpose() / J)
            })
            .collect()
    }

    /// Von Mises stress of an element at the given reference points.
    pub fn compute_von_mises_stresses<B>(
        &self,
        bases: &B,
        element_index: usize,
        reference_points: &[DVector<f64>],
        displacement: &DVector<f64>,
    ) -> eyre::Result<Vec<f64>>
    where
        B: ?Sized + ElementBases,
    {
        let stresses = self.compute_stress_tensor(bases, element_index, reference_points, displacement)?;
        Ok(stresses.iter().map(von_mises).collect())
    }
}

/// Von Mises equivalent of a 2D or 3D stress tensor.
pub fn von_mises(sigma: &DMatrix<f64>) -> f64 {
    let s = |i: usize, j: usize| sigma[(i, j)];
    if sigma.nrows() == 2 {
        (s(0, 0).powi(2) - s(0, 0) * s(1, 1) + s(1, 1).powi(2) + 3.0 * s(0, 1).powi(2)).sqrt()
    } else {
        let normal = (s(0, 0) - s(1, 1)).powi(2) + (s(1, 1) - s(2, 2)).powi(2) + (s(2, 2) - s(0, 0)).powi(2);
        let shear = s(0, 1).powi(2) + s(1, 2).powi(2) + s(2, 0).powi(2);
        (0.5 * normal + 3.0 * shear).sqrt()
    }
}

fn check_global(cache: &AssemblyValuesCache, model: &ElasticityModel, displacement: &DVector<f64>) -> eyre::Result<()> {
    if cache.dimension() != model.size() {
        bail!(
            "discretization has dimension {}, but the model has size {}",
            cache.dimension(),
            model.size()
        );
    }
    let expected = model.size() * cache.num_bases();
    if displacement.len() != expected {
        bail!("displacement has length {}, expected {}", displacement.len(), expected);
    }
    if let Some(parameters) = model.multimaterial() {
        if parameters.len() != cache.num_elements() {
            bail!(
                "{} per-element material parameters for {} elements",
                parameters.len(),
                cache.num_elements()
            );
        }
    }
    Ok(())
}

/// Total elastic energy of the displacement field.
pub fn assemble_energy(cache: &AssemblyValuesCache, model: &ElasticityModel, displacement: &DVector<f64>) -> eyre::Result<f64> {
    check_global(cache, model, displacement)?;
    assemble_scalar_par(cache, |vals| model.compute_energy(vals, displacement, &vals.da))
}

/// Gradient of the total elastic energy.
pub fn assemble_gradient(
    cache: &AssemblyValuesCache,
    model: &ElasticityModel,
    displacement: &DVector<f64>,
) -> eyre::Result<DVector<f64>> {
    check_global(cache, model, displacement)?;
    assemble_cache_vector_par(cache, model.size(), |vals| model.assemble_gradient(vals, displacement, &vals.da))
}

/// Hessian of the total elastic energy.
pub fn assemble_hessian(
    cache: &AssemblyValuesCache,
    model: &ElasticityModel,
    displacement: &DVector<f64>,
) -> eyre::Result<CsrMatrix<f64>> {
    check_global(cache, model, displacement)?;
    assemble_cache_matrix_par(cache, model.size(), |vals| model.assemble_hessian(vals, displacement, &vals.da))
}
