//! Element bases: the interface through which assembly sees a discretization, and its
//! first-order Lagrange implementation on [`Mesh`].
use crate::assembly::cache::ElementAssemblyValues;
use crate::mesh::{CellType, Mesh};
use crate::quadrature::{tensor_gauss, QuadratureRule};
use eyre::{bail, eyre};
use nalgebra::{DMatrix, DVector};

/// A collection of finite element bases, one per element, together with their quadrature.
///
/// Global basis functions are shared between elements through
/// [`element_basis_indices`](Self::element_basis_indices).
pub trait ElementBases: Sync {
    /// Dimension of the physical domain.
    fn dimension(&self) -> usize;

    fn is_volume(&self) -> bool {
        self.dimension() == 3
    }

    fn num_elements(&self) -> usize;

    /// Total number of global basis functions.
    fn num_bases(&self) -> usize;

    fn element_basis_indices(&self, element_index: usize) -> &[usize];

    fn element_quadrature(&self, element_index: usize) -> &QuadratureRule;

    /// Evaluates bases, physical gradients and geometric quantities of an element at the given
    /// reference points.
    fn evaluate(
        &self,
        element_index: usize,
        weights: &[f64],
        reference_points: &[DVector<f64>],
    ) -> eyre::Result<ElementAssemblyValues>;

    /// Evaluates an element at its own quadrature points.
    fn compute_assembly_values(&self, element_index: usize) -> eyre::Result<ElementAssemblyValues> {
        let quadrature = self.element_quadrature(element_index);
        self.evaluate(element_index, &quadrature.weights, &quadrature.points)
    }
}

/// Isoparametric first-order Lagrange bases (Q1) on a [`Mesh`]: one basis function per vertex.
#[derive(Debug, Clone)]
pub struct LagrangeBases<'a> {
    mesh: &'a Mesh,
    quadrature: QuadratureRule,
}

impl<'a> LagrangeBases<'a> {
    /// Q1 bases with a tensor Gauss rule using `quadrature_points_per_dim` points per axis.
    pub fn new(mesh: &'a Mesh, quadrature_points_per_dim: usize) -> Self {
        Self::with_quadrature(mesh, tensor_gauss(mesh.dimension(), quadrature_points_per_dim))
    }

    pub fn with_quadrature(mesh: &'a Mesh, quadrature: QuadratureRule) -> Self {
        Self { mesh, quadrature }
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }
}

/// Values and reference gradients (`n_bases x dim`) of the Q1 basis at a reference point.
pub fn reference_basis(cell_type: CellType, xi: &DVector<f64>) -> (DVector<f64>, DMatrix<f64>) {
    let signs = cell_type.reference_vertex_signs();
    let d = cell_type.dimension();
    let n = signs.len();
    let factor = |j: usize, axis: usize| 0.5 * (1.0 + signs[j][axis] * xi[axis]);

    let values = DVector::from_fn(n, |j, _| (0..d).map(|axis| factor(j, axis)).product());
    let gradients = DMatrix::from_fn(n, d, |j, b| {
        let others: f64 = (0..d)
            .filter(|&axis| axis != b)
            .map(|axis| factor(j, axis))
            .product();
        0.5 * signs[j][b] * others
    });
    (values, gradients)
}

impl<'a> ElementBases for LagrangeBases<'a> {
    fn dimension(&self) -> usize {
        self.mesh.dimension()
    }

    fn num_elements(&self) -> usize {
        self.mesh.num_cells()
    }

    fn num_bases(&self) -> usize {
        self.mesh.vertices().len()
    }

    fn element_basis_indices(&self, element_index: usize) -> &[usize] {
        &self.mesh.connectivity()[element_index]
    }

    fn element_quadrature(&self, _element_index: usize) -> &QuadratureRule {
        &self.quadrature
    }

    #[allow(non_snake_case)]
    fn evaluate(
        &self,
        element_index: usize,
        weights: &[f64],
        reference_points: &[DVector<f64>],
    ) -> eyre::Result<ElementAssemblyValues> {
        if weights.len() != reference_points.len() {
            bail!(
                "number of quadrature weights ({}) and points ({}) differ",
                weights.len(),
                reference_points.len()
            );
        }
        let d = self.dimension();
        let cell_type = self.mesh.cell_type();
        let indices = self.element_basis_indices(element_index);
        let n = indices.len();
        let num_points = weights.len();

        // Element vertex coordinates as the columns of a d x n matrix
        let vertices = self.mesh.vertices();
        let X = DMatrix::from_fn(d, n, |a, j| vertices[indices[j]][a]);

        let mut values = ElementAssemblyValues {
            element_index,
            dimension: d,
            basis_indices: indices.to_vec(),
            basis_values: DMatrix::zeros(num_points, n),
            basis_gradients: Vec::with_capacity(num_points),
            quadrature_points: Vec::with_capacity(num_points),
            jacobian_determinants: Vec::with_capacity(num_points),
            quadrature_weights: weights.to_vec(),
            da: Vec::with_capacity(num_points),
        };

        for (q, (xi, w)) in reference_points.iter().zip(weights).enumerate() {
            if xi.len() != d {
                bail!("reference point {} has dimension {}, expected {}", q, xi.len(), d);
            }
            let (phi, grad_ref) = reference_basis(cell_type, xi);
            let J = &X * &grad_ref;
            let det_J = J.determinant();
            if det_J <= 0.0 {
                bail!(
                    "element {} has non-positive Jacobian determinant {} at quadrature point {}",
                    element_index,
                    det_J,
                    q
                );
            }
            let J_inv = J
                .try_inverse()
                .ok_or_else(|| eyre!("element {} has a singular Jacobian", element_index))?;

            values.basis_values.row_mut(q).copy_from(&phi.transpose());
            values.basis_gradients.push(grad_ref * J_inv);
            values.quadrature_points.push(&X * &phi);
            values.jacobian_determinants.push(det_J);
            values.da.push(w * det_J);
        }

        Ok(values)
    }
}
