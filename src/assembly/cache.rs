use crate::assembly::global::MIN_ELEMENTS_PER_TASK;
use crate::basis::ElementBases;
use nalgebra::{DMatrix, DVector, DVectorView};
use rayon::prelude::*;

/// Everything assembly needs to know about one element at its quadrature points.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementAssemblyValues {
    pub element_index: usize,
    pub dimension: usize,
    /// Global indices of the element's basis functions.
    pub basis_indices: Vec<usize>,
    /// `n_qp x n_bases`.
    pub basis_values: DMatrix<f64>,
    /// Physical gradients, `n_bases x dim` for each quadrature point.
    pub basis_gradients: Vec<DMatrix<f64>>,
    pub quadrature_points: Vec<DVector<f64>>,
    pub jacobian_determinants: Vec<f64>,
    /// Reference quadrature weights.
    pub quadrature_weights: Vec<f64>,
    /// Quadrature weights times `|det J|`.
    pub da: Vec<f64>,
}

impl ElementAssemblyValues {
    pub fn num_bases(&self) -> usize {
        self.basis_indices.len()
    }

    pub fn num_quadrature_points(&self) -> usize {
        self.da.len()
    }

    /// Measure of the element.
    pub fn measure(&self) -> f64 {
        self.da.iter().sum()
    }

    /// Characteristic element size `measure^(1/dim)`.
    pub fn diameter(&self) -> f64 {
        self.measure().powf(1.0 / self.dimension as f64)
    }

    /// Gathers the values of a field with `solution_dim` components per basis function.
    ///
    /// The result is node-major: entry `solution_dim * j + c` is component `c` at local basis `j`.
    pub fn gather(&self, global: DVectorView<f64>, solution_dim: usize) -> DVector<f64> {
        crate::assembly::global::gather_global_to_local(global, &self.basis_indices, solution_dim)
    }
}

/// Element assembly values for every element of an [`ElementBases`], computed once in parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssemblyValuesCache {
    dimension: usize,
    num_bases: usize,
    is_volume: bool,
    values: Vec<ElementAssemblyValues>,
}

impl AssemblyValuesCache {
    pub fn init<B>(bases: &B) -> eyre::Result<Self>
    where
        B: ?Sized + ElementBases,
    {
        let values = (0..bases.num_elements())
            .into_par_iter()
            .with_min_len(MIN_ELEMENTS_PER_TASK)
            .map(|element_index| bases.compute_assembly_values(element_index))
            .collect::<eyre::Result<Vec<_>>>()?;
        Ok(Self {
            dimension: bases.dimension(),
            num_bases: bases.num_bases(),
            is_volume: bases.is_volume(),
            values,
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of global basis functions.
    pub fn num_bases(&self) -> usize {
        self.num_bases
    }

    pub fn is_volume(&self) -> bool {
        self.is_volume
    }

    pub fn num_elements(&self) -> usize {
        self.values.len()
    }

    pub fn values(&self) -> &[ElementAssemblyValues] {
        &self.values
    }

    pub fn element(&self, element_index: usize) -> &ElementAssemblyValues {
        &self.values[element_index]
    }
}
