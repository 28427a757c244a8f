use super::{deformation_gradient_2d, deformation_gradient_3d, lame_parameters, materials, ogden_parameters};
use matrixcompare::{assert_matrix_eq, assert_scalar_eq};
use nalgebra::{DMatrix, DVectorView};
use serde_json::json;
use tangent_autodiff::calculus::approximate_gradient_fd;
use tangent_solid::materials::{
    LameParameters, Material, MaterialError, NeoHookeanMaterial, OgdenMaterial, OgdenParameters, OgdenTerm,
    YoungPoisson,
};
use tangent_solid::HyperelasticMaterial;

#[test]
fn lame_from_young_poisson() {
    let young_poisson = YoungPoisson {
        young: 1e3,
        poisson: 0.3,
    };

    let lame = LameParameters::from_young_poisson(young_poisson, true);
    assert_scalar_eq!(lame.mu, 384.6153846153846, comp = float);
    assert_scalar_eq!(lame.lambda, 576.9230769230769, comp = abs, tol = 1e-9);

    // Plane stress
    let lame = LameParameters::from_young_poisson(young_poisson, false);
    assert_scalar_eq!(lame.mu, 384.6153846153846, comp = float);
    assert_scalar_eq!(lame.lambda, 329.6703296703297, comp = abs, tol = 1e-9);
}

#[test]
fn lame_parameters_from_json() {
    let lame = LameParameters::from_json(&json!({ "mu": 2.0, "lambda": 3.0 }), false).unwrap();
    assert_eq!(lame, LameParameters { mu: 2.0, lambda: 3.0 });

    let lame = LameParameters::from_json(&json!({ "E": 1e3, "nu": 0.3 }), true).unwrap();
    assert_scalar_eq!(lame.lambda, 576.9230769230769, comp = abs, tol = 1e-9);

    let missing = LameParameters::from_json(&json!({ "E": 1e3 }), true);
    assert!(matches!(missing, Err(MaterialError::MissingParameters { .. })));

    let not_a_number = LameParameters::from_json(&json!({ "mu": "soft", "lambda": 3.0 }), true);
    assert_eq!(not_a_number, Err(MaterialError::NotANumber { name: "mu" }));
}

#[test]
fn ogden_parameters_from_json() {
    let params = OgdenParameters::from_json(&json!({ "alphas": [2.0, -1.0], "mus": [1.0, 0.5], "Ds": 0.1 })).unwrap();
    assert_eq!(
        params.terms,
        vec![OgdenTerm { alpha: 2.0, mu: 1.0 }, OgdenTerm { alpha: -1.0, mu: 0.5 }]
    );
    assert_eq!(params.bulk, vec![0.1]);

    let mismatch = OgdenParameters::from_json(&json!({ "alphas": [2.0, -1.0], "mus": [1.0], "Ds": [0.1] }));
    assert!(matches!(mismatch, Err(MaterialError::LengthMismatch { .. })));

    let zero_alpha = OgdenParameters::from_json(&json!({ "alphas": 0.0, "mus": 1.0, "Ds": 0.1 }));
    assert!(matches!(zero_alpha, Err(MaterialError::InvalidParameter { name: "alphas", .. })));

    let zero_bulk = OgdenParameters::from_json(&json!({ "alphas": 2.0, "mus": 1.0, "Ds": 0.0 }));
    assert!(matches!(zero_bulk, Err(MaterialError::InvalidParameter { name: "Ds", .. })));
}

#[test]
fn material_set_parameters_keeps_law() {
    let mut material = Material::Ogden(ogden_parameters());
    material
        .set_parameters(&json!({ "alphas": 3.0, "mus": 2.0, "Ds": 1.0 }), true)
        .unwrap();
    let expected = OgdenParameters::new(vec![OgdenTerm { alpha: 3.0, mu: 2.0 }], vec![1.0]).unwrap();
    assert_eq!(material, Material::Ogden(expected));

    // Ogden parameters are not Lamé parameters
    let mut material = Material::NeoHookean(lame_parameters());
    assert!(material
        .set_parameters(&json!({ "alphas": 3.0, "mus": 2.0, "Ds": 1.0 }), true)
        .is_err());
}

#[test]
fn material_deserializes_from_tagged_json() {
    let material: Material = serde_json::from_value(json!({ "type": "NeoHookean", "mu": 1.0, "lambda": 2.0 })).unwrap();
    assert_eq!(material, Material::NeoHookean(LameParameters { mu: 1.0, lambda: 2.0 }));
}

#[test]
fn energy_vanishes_at_identity() {
    for material in materials() {
        for dim in [2, 3] {
            let identity = DMatrix::<f64>::identity(dim, dim);
            let psi = material.compute_energy_density(&identity);
            assert_scalar_eq!(psi, 0.0, comp = abs, tol = 1e-12);
        }
    }
}

#[test]
fn neo_hookean_energy_2d() {
    let lame = lame_parameters();
    let f = deformation_gradient_2d();
    let psi = NeoHookeanMaterial.compute_energy_density(&f, &lame);

    let i_c = 1.2 * 1.2 + 0.1 * 0.1 + 0.3 * 0.3 + 0.9 * 0.9;
    let log_j = f64::ln(1.2 * 0.9 + 0.1 * 0.3);
    let expected = 0.5 * lame.mu * (i_c - 2.0 - 2.0 * log_j) + 0.5 * lame.lambda * log_j * log_j;
    assert_scalar_eq!(psi, expected, comp = abs, tol = 1e-9);
}

#[test]
fn ogden_energy_of_pure_dilation_is_volumetric() {
    let params = OgdenParameters::new(vec![OgdenTerm { alpha: 2.5, mu: 100.0 }], vec![0.5, 2.0]).unwrap();
    let f = DMatrix::<f64>::identity(2, 2) * 2.0;
    let psi = OgdenMaterial.compute_energy_density(&f, &params);
    // J = 4: (J - 1)^2 / 0.5 + (J - 1)^4 / 2
    assert_scalar_eq!(psi, 58.5, comp = abs, tol = 1e-9);
}

#[test]
fn ogden_energy_matches_principal_stretches() {
    let alpha = 3.0;
    let mu = 100.0;
    let params = OgdenParameters::new(vec![OgdenTerm { alpha, mu }], vec![1.0]).unwrap();
    let f = DMatrix::from_diagonal(&nalgebra::dvector![2.0, 1.0]);
    let psi = OgdenMaterial.compute_energy_density(&f, &params);

    // J = 2, isochoric stretches 2 / sqrt(2) and 1 / sqrt(2)
    let stretch_sum = f64::sqrt(2.0).powf(alpha) + f64::sqrt(0.5).powf(alpha);
    let expected = 2.0 * mu / (alpha * alpha) * (stretch_sum - 2.0) + 1.0;
    assert_scalar_eq!(psi, expected, comp = abs, tol = 1e-9);
}

#[test]
fn neo_hookean_stress_matches_closed_form() {
    let lame = lame_parameters();
    for f in [deformation_gradient_2d(), deformation_gradient_3d()] {
        let p = NeoHookeanMaterial.compute_stress_tensor(&f, &lame);
        let f_inv_t = f.clone().try_inverse().unwrap().transpose();
        let log_j = f.determinant().ln();
        let expected = (&f - &f_inv_t) * lame.mu + f_inv_t * (lame.lambda * log_j);
        assert_matrix_eq!(p, expected, comp = abs, tol = 1e-9);
    }
}

#[test]
fn stress_is_derivative_of_energy() {
    for material in materials() {
        for f in [deformation_gradient_2d(), deformation_gradient_3d()] {
            let (rows, cols) = f.shape();
            let p = material.compute_stress_tensor(&f);

            let mut entries = nalgebra::DVector::from_column_slice(f.as_slice());
            let psi = |x: DVectorView<f64>| {
                let f = DMatrix::from_iterator(rows, cols, x.iter().copied());
                material.compute_energy_density(&f)
            };
            let p_fd = approximate_gradient_fd(psi, &mut entries, 1e-6);
            let p_fd = DMatrix::from_column_slice(rows, cols, p_fd.as_slice());
            assert_matrix_eq!(p, p_fd, comp = abs, tol = 1e-5 * (1.0 + p.norm()));
        }
    }
}
