//! Dirichlet boundary conditions, structurally singular columns and constrained linear solves.
//!
//! Constrained degrees of freedom are eliminated by replacing their rows of the system matrix
//! with identity rows. The right-hand side then prescribes the value (or the increment) of
//! those dofs directly.
use crate::linear::{spmv, LinearSolveError, LinearSolver};
use eyre::bail;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use serde::{Deserialize, Serialize};

/// Magnitude below which matrix entries count as zero when looking for singular columns.
pub const SINGULAR_COLUMN_TOLERANCE: f64 = 1e-12;

/// Prescribed values for a set of degrees of freedom.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirichletBoundary {
    dofs: Vec<usize>,
    values: Vec<f64>,
}

impl DirichletBoundary {
    /// Pairs of dofs and values. The dofs are sorted; duplicates are rejected.
    pub fn new(dofs: Vec<usize>, values: Vec<f64>) -> eyre::Result<Self> {
        if dofs.len() != values.len() {
            bail!("{} Dirichlet dofs but {} values", dofs.len(), values.len());
        }
        let mut pairs: Vec<(usize, f64)> = dofs.into_iter().zip(values).collect();
        pairs.sort_unstable_by_key(|(dof, _)| *dof);
        if let Some(window) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            bail!("Dirichlet dof {} is prescribed more than once", window[0].0);
        }
        Ok(Self {
            dofs: pairs.iter().map(|(dof, _)| *dof).collect(),
            values: pairs.iter().map(|(_, value)| *value).collect(),
        })
    }

    /// Zero values for the given dofs.
    pub fn homogeneous(dofs: &[usize]) -> Self {
        let mut dofs = dofs.to_vec();
        dofs.sort_unstable();
        dofs.dedup();
        let values = vec![0.0; dofs.len()];
        Self { dofs, values }
    }

    /// Constrains every component of the given nodes of a vector field with `solution_dim`
    /// components per node, taking the value of `(node, component)` from `value`.
    pub fn from_nodes(nodes: &[usize], solution_dim: usize, value: impl Fn(usize, usize) -> f64) -> Self {
        let mut nodes = nodes.to_vec();
        nodes.sort_unstable();
        nodes.dedup();
        let mut dofs = Vec::with_capacity(nodes.len() * solution_dim);
        let mut values = Vec::with_capacity(nodes.len() * solution_dim);
        for node in nodes {
            for component in 0..solution_dim {
                dofs.push(solution_dim * node + component);
                values.push(value(node, component));
            }
        }
        Self { dofs, values }
    }

    /// Sorted constrained dofs.
    pub fn dofs(&self) -> &[usize] {
        &self.dofs
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.dofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dofs.is_empty()
    }

    pub fn contains(&self, dof: usize) -> bool {
        self.dofs.binary_search(&dof).is_ok()
    }

    /// Writes the prescribed values into the corresponding entries of `vector`.
    pub fn write_values_into(&self, vector: &mut DVector<f64>) {
        for (&dof, &value) in self.dofs.iter().zip(&self.values) {
            vector[dof] = value;
        }
    }
}

pub fn zero_entries(vector: &mut DVector<f64>, indices: &[usize]) {
    for &i in indices {
        vector[i] = 0.0;
    }
}

/// Returns the sorted indices of the columns whose stored entries all have magnitude at most
/// `tolerance`. Columns without stored entries are included.
pub fn find_singular_columns(matrix: &CsrMatrix<f64>, tolerance: f64) -> Vec<usize> {
    let mut significant = vec![false; matrix.ncols()];
    for (_, j, v) in matrix.triplet_iter() {
        if v.abs() > tolerance {
            significant[j] = true;
        }
    }
    significant
        .iter()
        .enumerate()
        .filter(|(_, &is_significant)| !is_significant)
        .map(|(j, _)| j)
        .collect()
}

/// Returns a copy of `matrix` whose given rows are replaced by rows of the identity matrix.
pub fn replace_rows_with_identity(matrix: &CsrMatrix<f64>, rows: &[usize]) -> CsrMatrix<f64> {
    let mut is_replaced = vec![false; matrix.nrows()];
    for &row in rows {
        is_replaced[row] = true;
    }

    let mut coo = CooMatrix::new(matrix.nrows(), matrix.ncols());
    for (i, j, &v) in matrix.triplet_iter() {
        if !is_replaced[i] {
            coo.push(i, j, v);
        }
    }
    for (row, _) in is_replaced.iter().enumerate().filter(|(_, &replaced)| replaced) {
        coo.push(row, row, 1.0);
    }
    CsrMatrix::from(&coo)
}

/// Solves `A x = b` where the rows of `constrained` dofs are replaced by identity rows, so that
/// `x_i = b_i` for every constrained dof `i`.
pub fn dirichlet_solve(
    solver: &mut dyn LinearSolver,
    matrix: &CsrMatrix<f64>,
    rhs: &DVector<f64>,
    constrained: &[usize],
) -> Result<DVector<f64>, LinearSolveError> {
    let system = replace_rows_with_identity(matrix, constrained);
    solver.solve(&system, rhs)
}

/// Computes `b - A x` with the entries of `zeroed` set to zero.
pub fn compute_residual(
    matrix: &CsrMatrix<f64>,
    x: &DVector<f64>,
    rhs: &DVector<f64>,
    zeroed: &[usize],
) -> DVector<f64> {
    let mut residual = rhs - spmv(matrix, x);
    zero_entries(&mut residual, zeroed);
    residual
}

/// Sorted union of two sorted index lists.
pub fn merge_sorted_unique(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut merged: Vec<usize> = a.iter().chain(b).copied().collect();
    merged.sort_unstable();
    merged.dedup();
    merged
}
