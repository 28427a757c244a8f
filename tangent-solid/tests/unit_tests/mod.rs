use nalgebra::{dmatrix, DMatrix};
use tangent::assembly::AssemblyValuesCache;
use tangent::basis::LagrangeBases;
use tangent::mesh::procedural::{create_unit_box_uniform_hex_mesh_3d, create_unit_square_uniform_quad_mesh_2d};
use tangent_solid::materials::{LameParameters, Material, OgdenParameters, OgdenTerm};

mod materials;
mod model;

fn lame_parameters() -> LameParameters {
    LameParameters {
        mu: 384.0,
        lambda: 577.0,
    }
}

fn ogden_parameters() -> OgdenParameters {
    let terms = vec![OgdenTerm { alpha: 2.5, mu: 100.0 }, OgdenTerm { alpha: -1.5, mu: 20.0 }];
    OgdenParameters::new(terms, vec![0.01, 0.1]).unwrap()
}

fn materials() -> Vec<Material> {
    vec![Material::NeoHookean(lame_parameters()), Material::Ogden(ogden_parameters())]
}

fn deformation_gradient_2d() -> DMatrix<f64> {
    // Note: this is deliberately chosen so that it has det(F) > 0
    dmatrix![1.2, 0.1;
             -0.3, 0.9]
}

fn deformation_gradient_3d() -> DMatrix<f64> {
    // Note: this is deliberately chosen so that it has det(F) > 0
    dmatrix![1.1, 0.2, -0.1;
             0.0, 0.9, 0.3;
             0.2, -0.1, 1.05]
}

/// Assembly values of a 2x2 quadrilateral mesh of the unit square.
fn quad_cache() -> AssemblyValuesCache {
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    AssemblyValuesCache::init(&LagrangeBases::new(&mesh, 2)).unwrap()
}

/// Assembly values of a single hexahedron.
fn hex_cache() -> AssemblyValuesCache {
    let mesh = create_unit_box_uniform_hex_mesh_3d(1);
    AssemblyValuesCache::init(&LagrangeBases::new(&mesh, 2)).unwrap()
}
