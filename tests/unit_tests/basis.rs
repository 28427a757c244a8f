use super::{unit_box_cache, unit_square_cache};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dvector, DMatrix, DVector};
use tangent::assembly::AssemblyValuesCache;
use tangent::basis::{reference_basis, ElementBases, LagrangeBases};
use tangent::mesh::procedural::{create_rectangular_uniform_quad_mesh_2d, create_unit_square_uniform_quad_mesh_2d};
use tangent::mesh::{CellType, Mesh};

#[test]
fn reference_basis_is_nodal() {
    for cell_type in [CellType::Quad4, CellType::Hex8] {
        let d = cell_type.dimension();
        for (i, signs) in cell_type.reference_vertex_signs().iter().enumerate() {
            let xi = DVector::from_fn(d, |a, _| signs[a]);
            let (values, _) = reference_basis(cell_type, &xi);
            let expected = DVector::from_fn(cell_type.num_vertices(), |j, _| if i == j { 1.0 } else { 0.0 });
            assert_matrix_eq!(values, expected, comp = abs, tol = 1e-15);
        }
    }
}

#[test]
fn reference_gradients_sum_to_zero() {
    let xi = dvector![0.3, -0.7, 0.1];
    let (values, gradients) = reference_basis(CellType::Hex8, &xi);
    assert_scalar_eq!(values.sum(), 1.0, comp = abs, tol = 1e-15);
    let column_sums = gradients.row_sum();
    assert_matrix_eq!(column_sums, DMatrix::zeros(1, 3), comp = abs, tol = 1e-15);
}

#[test]
fn assembly_values_partition_of_unity_and_measure() {
    for cache in [unit_square_cache(3), unit_box_cache(2)] {
        let mut total = 0.0;
        for values in cache.values() {
            for q in 0..values.num_quadrature_points() {
                assert_scalar_eq!(values.basis_values.row(q).sum(), 1.0, comp = abs, tol = 1e-14);
                let gradient_sum = values.basis_gradients[q].row_sum();
                assert!(gradient_sum.norm() <= 1e-13);
            }
            total += values.measure();
        }
        assert_scalar_eq!(total, 1.0, comp = abs, tol = 1e-13);
    }
}

#[test]
fn physical_gradients_reproduce_linear_fields() {
    let mesh = create_rectangular_uniform_quad_mesh_2d(2.0, 0.5, 3, 2);
    let bases = LagrangeBases::new(&mesh, 2);
    let cache = AssemblyValuesCache::init(&bases).unwrap();
    // f(x, y) = 3x - 2y + 1
    let f = DVector::from_iterator(mesh.vertices().len(), mesh.vertices().iter().map(|x| 3.0 * x[0] - 2.0 * x[1] + 1.0));
    for values in cache.values() {
        let local = values.gather(f.as_view(), 1);
        for (q, gradients) in values.basis_gradients.iter().enumerate() {
            let gradient = gradients.transpose() * &local;
            assert_matrix_eq!(gradient, dvector![3.0, -2.0], comp = abs, tol = 1e-12);
            let point = &values.quadrature_points[q];
            let value = (values.basis_values.row(q) * &local)[0];
            assert_scalar_eq!(value, 3.0 * point[0] - 2.0 * point[1] + 1.0, comp = abs, tol = 1e-12);
        }
        assert_scalar_eq!(values.measure(), 2.0 / 3.0 * 0.25, comp = abs, tol = 1e-14);
    }
}

#[test]
fn cache_initialization_is_idempotent() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(4);
    let bases = LagrangeBases::new(&mesh, 2);
    let first = AssemblyValuesCache::init(&bases).unwrap();
    let second = AssemblyValuesCache::init(&bases).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.num_elements(), 16);
    assert_eq!(first.num_bases(), 25);
    assert_eq!(first.dimension(), 2);
    assert!(!first.is_volume());

    let single = bases.compute_assembly_values(5).unwrap();
    assert_eq!(&single, first.element(5));
}

#[test]
fn inverted_elements_fail_evaluation() {
    let vertices = vec![dvector![0.0, 0.0], dvector![1.0, 0.0], dvector![1.0, 1.0], dvector![0.0, 1.0]];
    // Clockwise ordering
    let mesh = Mesh::from_vertices_and_connectivity(CellType::Quad4, vertices, vec![vec![0, 3, 2, 1]]).unwrap();
    let bases = LagrangeBases::new(&mesh, 2);
    assert!(AssemblyValuesCache::init(&bases).is_err());
}
