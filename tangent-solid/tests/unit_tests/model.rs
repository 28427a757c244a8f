use super::{hex_cache, lame_parameters, materials, ogden_parameters, quad_cache};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{dmatrix, DMatrix, DVector, DVectorView};
use nalgebra_sparse::convert::serial::convert_csr_dense;
use proptest::collection::vec;
use proptest::prelude::*;
use tangent::assembly::AssemblyValuesCache;
use tangent::basis::LagrangeBases;
use tangent::mesh::procedural::create_unit_square_uniform_quad_mesh_2d;
use tangent_autodiff::calculus::{approximate_gradient_fd, approximate_hessian_fd};
use tangent_solid::materials::{Material, MaterialError};
use tangent_solid::model::von_mises;
use tangent_solid::{assemble_energy, assemble_gradient, assemble_hessian, ElasticityModel};

fn is_close(a: &DMatrix<f64>, b: &DMatrix<f64>, rel_tol: f64) -> bool {
    (a - b).norm() <= rel_tol * (1.0 + b.norm())
}

/// Displacement `u(x) = G x` sampled at the vertices of a mesh.
fn linear_displacement(vertices: &[DVector<f64>], g: &DMatrix<f64>) -> DVector<f64> {
    let d = g.nrows();
    let mut u = DVector::zeros(d * vertices.len());
    for (i, x) in vertices.iter().enumerate() {
        u.rows_mut(d * i, d).copy_from(&(g * x));
    }
    u
}

fn check_derivatives(cache: &AssemblyValuesCache, model: &ElasticityModel, u: &DVector<f64>) -> Result<(), TestCaseError> {
    let gradient = assemble_gradient(cache, model, u).unwrap();
    let mut x = u.clone();
    let energy = |x: DVectorView<f64>| assemble_energy(cache, model, &x.clone_owned()).unwrap();
    let gradient_fd = approximate_gradient_fd(energy, &mut x, 1e-6);
    prop_assert!(
        (&gradient - &gradient_fd).norm() <= 1e-5 * (1.0 + gradient_fd.norm()),
        "gradient {} differs from finite differences {}",
        gradient,
        gradient_fd
    );

    let hessian = convert_csr_dense(&assemble_hessian(cache, model, u).unwrap());
    let gradient_fn = |x: DVectorView<f64>| assemble_gradient(cache, model, &x.clone_owned()).unwrap();
    let hessian_fd = approximate_hessian_fd(gradient_fn, &mut x, 1e-6);
    prop_assert!(is_close(&hessian, &hessian_fd, 1e-5));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn derivatives_match_finite_differences_2d(entries in vec(-0.05 ..= 0.05, 18)) {
        let cache = quad_cache();
        let u = DVector::from_vec(entries);
        for material in materials() {
            check_derivatives(&cache, &ElasticityModel::new(2, material), &u)?;
        }
    }

    #[test]
    fn derivatives_match_finite_differences_3d(entries in vec(-0.05 ..= 0.05, 24)) {
        let cache = hex_cache();
        let u = DVector::from_vec(entries);
        for material in materials() {
            check_derivatives(&cache, &ElasticityModel::new(3, material), &u)?;
        }
    }
}

#[test]
fn zero_displacement_has_zero_energy_and_gradient() {
    for (cache, dim) in [(quad_cache(), 2), (hex_cache(), 3)] {
        for material in materials() {
            let model = ElasticityModel::new(dim, material);
            let u = DVector::zeros(dim * cache.num_bases());
            assert_scalar_eq!(assemble_energy(&cache, &model, &u).unwrap(), 0.0, comp = abs, tol = 1e-12);
            let gradient = assemble_gradient(&cache, &model, &u).unwrap();
            assert!(gradient.norm() <= 1e-9);
        }
    }
}

#[test]
fn element_hessians_are_symmetric() {
    let u = DVector::from_fn(24, |i, _| 0.01 * ((i * 7 % 5) as f64 - 2.0));
    let cache = hex_cache();
    for material in materials() {
        let model = ElasticityModel::new(3, material);
        for vals in cache.values() {
            let hessian = model.assemble_hessian(vals, &u, &vals.da).unwrap();
            assert_matrix_eq!(hessian, hessian.transpose(), comp = abs, tol = 1e-10 * hessian.norm());
        }
    }
}

#[test]
fn homogeneous_deformation_energy_is_density_times_area() {
    let cache = quad_cache();
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    let g = dmatrix![0.2, 0.1;
                     -0.3, -0.1];
    let f = DMatrix::identity(2, 2) + &g;
    let u = linear_displacement(mesh.vertices(), &g);
    for material in materials() {
        let model = ElasticityModel::new(2, material.clone());
        let energy = assemble_energy(&cache, &model, &u).unwrap();
        assert_scalar_eq!(energy, material.compute_energy_density(&f), comp = abs, tol = 1e-9);
    }
}

#[test]
fn uniform_multimaterial_matches_single_material() {
    let cache = quad_cache();
    let young_poisson = tangent_solid::materials::YoungPoisson {
        young: 1e3,
        poisson: 0.3,
    };
    let lame = tangent_solid::materials::LameParameters::from_young_poisson(young_poisson, false);
    let single = ElasticityModel::new(2, Material::NeoHookean(lame));
    let mut multi = ElasticityModel::new(2, Material::NeoHookean(lame_parameters()));
    let n = cache.num_elements();
    multi
        .init_multimaterial(false, &vec![1e3; n], &vec![0.3; n])
        .unwrap();

    let u = DVector::from_fn(18, |i, _| 0.02 * ((i * 3 % 7) as f64 - 3.0) / 3.0);
    let expected = assemble_energy(&cache, &single, &u).unwrap();
    assert_scalar_eq!(assemble_energy(&cache, &multi, &u).unwrap(), expected, comp = abs, tol = 1e-10);
}

#[test]
fn multimaterial_contract() {
    let mut ogden = ElasticityModel::new(2, Material::Ogden(ogden_parameters()));
    assert_eq!(
        ogden.init_multimaterial(false, &[1.0], &[0.3]),
        Err(MaterialError::UnsupportedMultimaterial)
    );

    let cache = quad_cache();
    let mut model = ElasticityModel::new(2, Material::NeoHookean(lame_parameters()));
    model.init_multimaterial(false, &[1e3; 2], &[0.3; 2]).unwrap();
    let u = DVector::zeros(18);
    assert!(assemble_energy(&cache, &model, &u).is_err());
}

#[test]
fn input_contract_violations_are_errors() {
    let cache = quad_cache();
    let model = ElasticityModel::new(2, Material::NeoHookean(lame_parameters()));

    let wrong_size = ElasticityModel::new(3, Material::NeoHookean(lame_parameters()));
    assert!(assemble_energy(&cache, &wrong_size, &DVector::zeros(27)).is_err());
    assert!(assemble_gradient(&cache, &model, &DVector::zeros(17)).is_err());
    assert!(assemble_hessian(&cache, &model, &DVector::zeros(19)).is_err());

    let vals = cache.element(0);
    assert!(model.compute_energy(vals, &DVector::zeros(18), &[1.0]).is_err());
}

#[test]
fn inverted_elements_are_rejected() {
    let cache = quad_cache();
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    // F = diag(-1, 1)
    let g = dmatrix![-2.0, 0.0;
                     0.0, 0.0];
    let u = linear_displacement(mesh.vertices(), &g);
    for material in materials() {
        let model = ElasticityModel::new(2, material);
        assert!(assemble_energy(&cache, &model, &u).is_err());
        assert!(assemble_hessian(&cache, &model, &u).is_err());
    }
}

#[test]
fn set_parameters_updates_material() {
    let mut model = ElasticityModel::new(3, Material::NeoHookean(lame_parameters()));
    model
        .set_parameters(&serde_json::json!({ "mu": 1.0, "lambda": 2.0 }), true)
        .unwrap();
    let expected = tangent_solid::materials::LameParameters { mu: 1.0, lambda: 2.0 };
    assert_eq!(model.material(), &Material::NeoHookean(expected));
}

#[test]
fn cauchy_stress_of_homogeneous_deformation() {
    let mesh = create_unit_square_uniform_quad_mesh_2d(2);
    let bases = LagrangeBases::new(&mesh, 2);
    let g = dmatrix![0.1, 0.05;
                     0.0, -0.1];
    let f = DMatrix::identity(2, 2) + &g;
    let u = linear_displacement(mesh.vertices(), &g);

    let reference_points = vec![DVector::from_vec(vec![0.0, 0.0]), DVector::from_vec(vec![0.5, -0.25])];
    for material in materials() {
        let model = ElasticityModel::new(2, material.clone());
        let stresses = model
            .compute_stress_tensor(&bases, 3, &reference_points, &u)
            .unwrap();
        let expected = material.compute_stress_tensor(&f) * f.transpose() / f.determinant();
        assert_eq!(stresses.len(), 2);
        for sigma in &stresses {
            assert_matrix_eq!(*sigma, expected, comp = abs, tol = 1e-9);
            // Cauchy stress is symmetric
            assert_matrix_eq!(*sigma, sigma.transpose(), comp = abs, tol = 1e-8);
        }

        let von_mises_stresses = model
            .compute_von_mises_stresses(&bases, 3, &reference_points, &u)
            .unwrap();
        assert_scalar_eq!(von_mises_stresses[0], von_mises(&expected), comp = abs, tol = 1e-9);
    }
}

#[test]
fn von_mises_of_uniaxial_stress() {
    let sigma_2d = dmatrix![3.0, 0.0;
                            0.0, 0.0];
    assert_scalar_eq!(von_mises(&sigma_2d), 3.0, comp = float);

    let sigma_3d = dmatrix![-2.0, 0.0, 0.0;
                            0.0, 0.0, 0.0;
                            0.0, 0.0, 0.0];
    assert_scalar_eq!(von_mises(&sigma_3d), 2.0, comp = float);

    // Pure shear
    let shear = dmatrix![0.0, 1.0, 0.0;
                         1.0, 0.0, 0.0;
                         0.0, 0.0, 0.0];
    assert_scalar_eq!(von_mises(&shear), f64::sqrt(3.0), comp = float);
}
