//! Layout and assembly of mixed velocity-pressure systems.
use eyre::bail;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Ordering of the unknowns of a mixed system: velocity dofs first, then pressure dofs, then
/// (if a pressure gauge is active) one Lagrange multiplier.
#[derive(Debug, Clone, PartialEq)]
pub struct MixedLayout {
    num_velocity_dofs: usize,
    num_pressure_dofs: usize,
    gauge_weights: Option<DVector<f64>>,
}

impl MixedLayout {
    /// A layout without pressure gauge.
    pub fn new(num_velocity_dofs: usize, num_pressure_dofs: usize) -> Self {
        Self {
            num_velocity_dofs,
            num_pressure_dofs,
            gauge_weights: None,
        }
    }

    /// A layout whose gauge constrains the arithmetic mean of the pressure dofs.
    pub fn with_uniform_gauge(num_velocity_dofs: usize, num_pressure_dofs: usize) -> Self {
        let weights = DVector::from_element(num_pressure_dofs, 1.0 / num_pressure_dofs as f64);
        Self {
            num_velocity_dofs,
            num_pressure_dofs,
            gauge_weights: Some(weights),
        }
    }

    /// A layout whose gauge constrains `weights . p`.
    pub fn with_gauge_weights(num_velocity_dofs: usize, weights: DVector<f64>) -> Self {
        Self {
            num_velocity_dofs,
            num_pressure_dofs: weights.len(),
            gauge_weights: Some(weights),
        }
    }

    pub fn num_velocity_dofs(&self) -> usize {
        self.num_velocity_dofs
    }

    pub fn num_pressure_dofs(&self) -> usize {
        self.num_pressure_dofs
    }

    pub fn gauge_weights(&self) -> Option<&DVector<f64>> {
        self.gauge_weights.as_ref()
    }

    pub fn has_gauge(&self) -> bool {
        self.gauge_weights.is_some()
    }

    /// Index of the first pressure dof.
    pub fn pressure_offset(&self) -> usize {
        self.num_velocity_dofs
    }

    /// Index of the gauge multiplier, if any.
    pub fn gauge_index(&self) -> Option<usize> {
        self.gauge_weights
            .as_ref()
            .map(|_| self.num_velocity_dofs + self.num_pressure_dofs)
    }

    pub fn system_size(&self) -> usize {
        self.num_velocity_dofs + self.num_pressure_dofs + usize::from(self.has_gauge())
    }
}

/// Merges the velocity block `A` (`n_v x n_v`), the coupling block `B` (`n_p x n_v`) and the
/// pressure block `C` (`n_p x n_p`) into
///
/// ```text
/// [ A     B^T   0 ]
/// [ B     C     w ]
/// [ 0     w^T   0 ]
/// ```
///
/// where the last row and column, holding the gauge weights `w`, are only present if the
/// layout has a gauge.
pub fn merge_mixed_matrices(
    layout: &MixedLayout,
    velocity: &CsrMatrix<f64>,
    mixed: &CsrMatrix<f64>,
    pressure: &CsrMatrix<f64>,
) -> eyre::Result<CsrMatrix<f64>> {
    let n_v = layout.num_velocity_dofs();
    let n_p = layout.num_pressure_dofs();
    if (velocity.nrows(), velocity.ncols()) != (n_v, n_v) {
        bail!(
            "velocity block is {}x{}, expected {}x{}",
            velocity.nrows(),
            velocity.ncols(),
            n_v,
            n_v
        );
    }
    if (mixed.nrows(), mixed.ncols()) != (n_p, n_v) {
        bail!("mixed block is {}x{}, expected {}x{}", mixed.nrows(), mixed.ncols(), n_p, n_v);
    }
    if (pressure.nrows(), pressure.ncols()) != (n_p, n_p) {
        bail!(
            "pressure block is {}x{}, expected {}x{}",
            pressure.nrows(),
            pressure.ncols(),
            n_p,
            n_p
        );
    }

    let n = layout.system_size();
    let mut coo = CooMatrix::new(n, n);
    for (i, j, &v) in velocity.triplet_iter() {
        coo.push(i, j, v);
    }
    for (i, j, &v) in mixed.triplet_iter() {
        coo.push(n_v + i, j, v);
        coo.push(j, n_v + i, v);
    }
    for (i, j, &v) in pressure.triplet_iter() {
        coo.push(n_v + i, n_v + j, v);
    }
    if let (Some(weights), Some(g)) = (layout.gauge_weights(), layout.gauge_index()) {
        for (q, &w) in weights.iter().enumerate() {
            coo.push(g, n_v + q, w);
            coo.push(n_v + q, g, w);
        }
    }
    Ok(CsrMatrix::from(&coo))
}
