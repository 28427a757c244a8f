use eyre::{bail, eyre};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// Cell types supported by [`Mesh`].
///
/// Local vertex ordering follows the reference cell `[-1, 1]^d`: counter-clockwise in the
/// plane `z = -1` first, then the same for `z = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellType {
    Quad4,
    Hex8,
}

impl CellType {
    pub fn dimension(&self) -> usize {
        match self {
            CellType::Quad4 => 2,
            CellType::Hex8 => 3,
        }
    }

    pub fn num_vertices(&self) -> usize {
        match self {
            CellType::Quad4 => 4,
            CellType::Hex8 => 8,
        }
    }

    /// Signs of the reference coordinates of each local vertex.
    pub fn reference_vertex_signs(&self) -> &'static [[f64; 3]] {
        const QUAD4: [[f64; 3]; 4] = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]];
        const HEX8: [[f64; 3]; 8] = [
            [-1.0, -1.0, -1.0],
            [1.0, -1.0, -1.0],
            [1.0, 1.0, -1.0],
            [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0],
            [1.0, -1.0, 1.0],
            [1.0, 1.0, 1.0],
            [-1.0, 1.0, 1.0],
        ];
        match self {
            CellType::Quad4 => &QUAD4,
            CellType::Hex8 => &HEX8,
        }
    }

    /// Local vertex indices of the faces (edges in 2D) of the cell.
    pub fn faces(&self) -> &'static [&'static [usize]] {
        match self {
            CellType::Quad4 => &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]],
            CellType::Hex8 => &[
                &[0, 3, 2, 1],
                &[0, 1, 5, 4],
                &[1, 2, 6, 5],
                &[2, 3, 7, 6],
                &[0, 4, 7, 3],
                &[4, 5, 6, 7],
            ],
        }
    }
}

/// Index-based data structure for conforming meshes (i.e. no hanging nodes) made of a
/// single cell type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    cell_type: CellType,
    vertices: Vec<DVector<f64>>,
    connectivity: Vec<Vec<usize>>,
}

impl Mesh {
    /// Construct a mesh from vertices and connectivity.
    ///
    /// Returns an error if a vertex has the wrong dimension, or a cell has the wrong number of
    /// vertices or references a vertex out of bounds.
    pub fn from_vertices_and_connectivity(
        cell_type: CellType,
        vertices: Vec<DVector<f64>>,
        connectivity: Vec<Vec<usize>>,
    ) -> eyre::Result<Self> {
        let dim = cell_type.dimension();
        if let Some(v) = vertices.iter().position(|v| v.len() != dim) {
            bail!("vertex {} has dimension {}, expected {}", v, vertices[v].len(), dim);
        }
        for (cell_index, cell) in connectivity.iter().enumerate() {
            if cell.len() != cell_type.num_vertices() {
                bail!(
                    "cell {} has {} vertices, expected {}",
                    cell_index,
                    cell.len(),
                    cell_type.num_vertices()
                );
            }
            if let Some(v) = cell.iter().find(|&&v| v >= vertices.len()) {
                return Err(eyre!("cell {} references vertex {} out of bounds", cell_index, v));
            }
        }
        Ok(Self {
            cell_type,
            vertices,
            connectivity,
        })
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn dimension(&self) -> usize {
        self.cell_type.dimension()
    }

    pub fn vertices(&self) -> &[DVector<f64>] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Vec<usize>] {
        &self.connectivity
    }

    pub fn num_cells(&self) -> usize {
        self.connectivity.len()
    }

    /// Returns the (sorted) indices of the vertices satisfying the predicate.
    pub fn find_vertices(&self, predicate: impl Fn(&DVector<f64>) -> bool) -> Vec<usize> {
        self.vertices
            .iter()
            .enumerate()
            .filter(|(_, v)| predicate(v))
            .map(|(i, _)| i)
            .collect()
    }

    /// Returns the faces that belong to exactly one cell, as vertex index lists, along with
    /// the index of that cell.
    pub fn find_boundary_faces(&self) -> Vec<(Vec<usize>, usize)> {
        // Faces are identified by their sorted vertex indices. A BTreeMap keeps the output
        // deterministic.
        let mut face_counts: BTreeMap<Vec<usize>, (Vec<usize>, usize, usize)> = BTreeMap::new();
        for (cell_index, cell) in self.connectivity.iter().enumerate() {
            for face in self.cell_type.faces() {
                let face: Vec<usize> = face.iter().map(|&local| cell[local]).collect();
                let mut key = face.clone();
                key.sort_unstable();
                face_counts
                    .entry(key)
                    .and_modify(|(_, _, count)| *count += 1)
                    .or_insert((face, cell_index, 1));
            }
        }
        face_counts
            .into_values()
            .filter(|(_, _, count)| *count == 1)
            .map(|(face, cell_index, _)| (face, cell_index))
            .collect()
    }

    /// Returns a sorted list of vertices that belong to a boundary face.
    pub fn find_boundary_vertices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .find_boundary_faces()
            .into_iter()
            .flat_map(|(face, _)| face)
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}
