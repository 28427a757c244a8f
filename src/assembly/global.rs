//! Parallel global assembly.
//!
//! Elements are processed in parallel over contiguous ranges. Each worker accumulates into its
//! own buffers (a vector, or a list of matrix triplets), and the partial results are merged
//! serially at the end. Sparse matrices are built through a [`CooMatrix`], which sums
//! duplicate entries on conversion to CSR.
use crate::assembly::cache::AssemblyValuesCache;
use crate::assembly::cache::ElementAssemblyValues;
use eyre::eyre;
use nalgebra::{DMatrix, DVector, DVectorView};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;

/// Smallest number of consecutive elements handed to one rayon task.
pub(crate) const MIN_ELEMENTS_PER_TASK: usize = 16;

/// Gathers the entries of a global field for the given basis functions.
///
/// The global field has `solution_dim` components per basis function, stored node-major.
pub fn gather_global_to_local(global: DVectorView<f64>, basis_indices: &[usize], solution_dim: usize) -> DVector<f64> {
    let s = solution_dim;
    DVector::from_fn(s * basis_indices.len(), |i, _| global[s * basis_indices[i / s] + i % s])
}

/// Global degrees of freedom of the given basis functions, node-major.
pub fn local_dof_indices(basis_indices: &[usize], solution_dim: usize) -> Vec<usize> {
    basis_indices
        .iter()
        .flat_map(|&node| (0..solution_dim).map(move |c| solution_dim * node + c))
        .collect()
}

/// A dense element vector together with the global indices of its entries.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementVector {
    pub indices: Vec<usize>,
    pub values: DVector<f64>,
}

/// A dense element matrix together with the global indices of its rows and columns.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementMatrix {
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: DMatrix<f64>,
}

impl ElementMatrix {
    /// An element matrix whose rows and columns share the same global indices.
    pub fn square(indices: Vec<usize>, values: DMatrix<f64>) -> Self {
        Self {
            row_indices: indices.clone(),
            col_indices: indices,
            values,
        }
    }
}

/// Sums a scalar element quantity over all elements of the cache.
pub fn assemble_scalar_par<F>(cache: &AssemblyValuesCache, element_scalar: F) -> eyre::Result<f64>
where
    F: Fn(&ElementAssemblyValues) -> eyre::Result<f64> + Sync,
{
    let partial_sums = cache
        .values()
        .par_iter()
        .with_min_len(MIN_ELEMENTS_PER_TASK)
        .try_fold(|| 0.0, |sum: f64, values| -> eyre::Result<f64> { Ok(sum + element_scalar(values)?) })
        .collect::<eyre::Result<Vec<f64>>>()?;
    Ok(partial_sums.into_iter().sum())
}

/// Scatters element vectors into a global vector of length `num_rows`.
pub fn assemble_vector_par<F>(num_rows: usize, num_elements: usize, element_vector: F) -> eyre::Result<DVector<f64>>
where
    F: Fn(usize) -> eyre::Result<ElementVector> + Sync,
{
    let partial_vectors = (0..num_elements)
        .into_par_iter()
        .with_min_len(MIN_ELEMENTS_PER_TASK)
        .try_fold(
            || DVector::zeros(num_rows),
            |mut accumulator: DVector<f64>, element_index| -> eyre::Result<DVector<f64>> {
                let local = element_vector(element_index)?;
                check_vector_shape(&local, element_index)?;
                for (&i, v) in local.indices.iter().zip(local.values.iter()) {
                    let entry = accumulator
                        .get_mut(i)
                        .ok_or_else(|| eyre!("element {}: index {} out of bounds", element_index, i))?;
                    *entry += *v;
                }
                Ok(accumulator)
            },
        )
        .collect::<eyre::Result<Vec<_>>>()?;

    let mut result = DVector::zeros(num_rows);
    for partial in partial_vectors {
        result += partial;
    }
    Ok(result)
}

/// Scatters element matrices into a `num_rows x num_cols` CSR matrix.
pub fn assemble_matrix_par<F>(
    num_rows: usize,
    num_cols: usize,
    num_elements: usize,
    element_matrix: F,
) -> eyre::Result<CsrMatrix<f64>>
where
    F: Fn(usize) -> eyre::Result<ElementMatrix> + Sync,
{
    let partial_triplets = (0..num_elements)
        .into_par_iter()
        .with_min_len(MIN_ELEMENTS_PER_TASK)
        .try_fold(Triplets::default, |mut triplets: Triplets, element_index| -> eyre::Result<Triplets> {
            let local = element_matrix(element_index)?;
            check_matrix_shape(&local, element_index)?;
            triplets.push_element_matrix(&local);
            Ok(triplets)
        })
        .collect::<eyre::Result<Vec<_>>>()?;

    let mut coo = CooMatrix::new(num_rows, num_cols);
    for triplets in partial_triplets {
        for ((i, j), v) in triplets.rows.into_iter().zip(triplets.cols).zip(triplets.values) {
            if i >= num_rows || j >= num_cols {
                return Err(eyre!("entry ({}, {}) out of bounds for {}x{} matrix", i, j, num_rows, num_cols));
            }
            coo.push(i, j, v);
        }
    }
    Ok(CsrMatrix::from(&coo))
}

/// Convenience wrapper of [`assemble_vector_par`] for element vectors with `solution_dim`
/// components per basis function of the cache.
pub fn assemble_cache_vector_par<F>(
    cache: &AssemblyValuesCache,
    solution_dim: usize,
    element_vector: F,
) -> eyre::Result<DVector<f64>>
where
    F: Fn(&ElementAssemblyValues) -> eyre::Result<DVector<f64>> + Sync,
{
    assemble_vector_par(solution_dim * cache.num_bases(), cache.num_elements(), |e| {
        let values = cache.element(e);
        Ok(ElementVector {
            indices: local_dof_indices(&values.basis_indices, solution_dim),
            values: element_vector(values)?,
        })
    })
}

/// Convenience wrapper of [`assemble_matrix_par`] for square element matrices with
/// `solution_dim` components per basis function of the cache.
pub fn assemble_cache_matrix_par<F>(
    cache: &AssemblyValuesCache,
    solution_dim: usize,
    element_matrix: F,
) -> eyre::Result<CsrMatrix<f64>>
where
    F: Fn(&ElementAssemblyValues) -> eyre::Result<DMatrix<f64>> + Sync,
{
    let n = solution_dim * cache.num_bases();
    assemble_matrix_par(n, n, cache.num_elements(), |e| {
        let values = cache.element(e);
        Ok(ElementMatrix::square(
            local_dof_indices(&values.basis_indices, solution_dim),
            element_matrix(values)?,
        ))
    })
}

#[derive(Debug, Default)]
struct Triplets {
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl Triplets {
    fn push_element_matrix(&mut self, local: &ElementMatrix) {
        for (r, &i) in local.row_indices.iter().enumerate() {
            for (c, &j) in local.col_indices.iter().enumerate() {
                let v = local.values[(r, c)];
                if v != 0.0 {
                    self.rows.push(i);
                    self.cols.push(j);
                    self.values.push(v);
                }
            }
        }
    }
}

fn check_vector_shape(local: &ElementVector, element_index: usize) -> eyre::Result<()> {
    if local.indices.len() != local.values.len() {
        return Err(eyre!(
            "element {}: {} indices for element vector of length {}",
            element_index,
            local.indices.len(),
            local.values.len()
        ));
    }
    Ok(())
}

fn check_matrix_shape(local: &ElementMatrix, element_index: usize) -> eyre::Result<()> {
    if local.values.shape() != (local.row_indices.len(), local.col_indices.len()) {
        return Err(eyre!(
            "element {}: element matrix of shape {:?} does not match {} row and {} column indices",
            element_index,
            local.values.shape(),
            local.row_indices.len(),
            local.col_indices.len()
        ));
    }
    Ok(())
}
