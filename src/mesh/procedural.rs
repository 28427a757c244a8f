//! Basic procedural mesh generation routines.
use crate::mesh::{CellType, Mesh};
use nalgebra::{dvector, DVector};

pub fn create_unit_square_uniform_quad_mesh_2d(cells_per_dim: usize) -> Mesh {
    create_rectangular_uniform_quad_mesh_2d(1.0, 1.0, cells_per_dim, cells_per_dim)
}

pub fn create_unit_box_uniform_hex_mesh_3d(cells_per_dim: usize) -> Mesh {
    create_rectangular_uniform_hex_mesh_3d([1.0, 1.0, 1.0], [cells_per_dim; 3])
}

/// Generates an axis-aligned uniform quad mesh of `[0, width] x [0, height]`.
///
/// Vertices are numbered with `x` varying fastest.
pub fn create_rectangular_uniform_quad_mesh_2d(width: f64, height: f64, cells_x: usize, cells_y: usize) -> Mesh {
    if cells_x == 0 || cells_y == 0 {
        return empty_mesh(CellType::Quad4);
    }

    let (hx, hy) = (width / cells_x as f64, height / cells_y as f64);
    let mut vertices = Vec::with_capacity((cells_x + 1) * (cells_y + 1));
    for j in 0..=cells_y {
        for i in 0..=cells_x {
            vertices.push(dvector![i as f64 * hx, j as f64 * hy]);
        }
    }

    let vertex = |i: usize, j: usize| j * (cells_x + 1) + i;
    let mut cells = Vec::with_capacity(cells_x * cells_y);
    for j in 0..cells_y {
        for i in 0..cells_x {
            cells.push(vec![vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1), vertex(i, j + 1)]);
        }
    }

    build(CellType::Quad4, vertices, cells)
}

/// Generates an axis-aligned uniform hexahedral mesh of the box `[0, extents]`.
pub fn create_rectangular_uniform_hex_mesh_3d(extents: [f64; 3], cells: [usize; 3]) -> Mesh {
    let [nx, ny, nz] = cells;
    if nx == 0 || ny == 0 || nz == 0 {
        return empty_mesh(CellType::Hex8);
    }

    let h = [extents[0] / nx as f64, extents[1] / ny as f64, extents[2] / nz as f64];
    let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                vertices.push(dvector![i as f64 * h[0], j as f64 * h[1], k as f64 * h[2]]);
            }
        }
    }

    let vertex = |i: usize, j: usize, k: usize| (k * (ny + 1) + j) * (nx + 1) + i;
    let mut connectivity = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                connectivity.push(vec![
                    vertex(i, j, k),
                    vertex(i + 1, j, k),
                    vertex(i + 1, j + 1, k),
                    vertex(i, j + 1, k),
                    vertex(i, j, k + 1),
                    vertex(i + 1, j, k + 1),
                    vertex(i + 1, j + 1, k + 1),
                    vertex(i, j + 1, k + 1),
                ]);
            }
        }
    }

    build(CellType::Hex8, vertices, connectivity)
}

fn empty_mesh(cell_type: CellType) -> Mesh {
    build(cell_type, Vec::new(), Vec::new())
}

fn build(cell_type: CellType, vertices: Vec<DVector<f64>>, connectivity: Vec<Vec<usize>>) -> Mesh {
    Mesh::from_vertices_and_connectivity(cell_type, vertices, connectivity)
        .expect("Procedurally generated meshes are always valid")
}
