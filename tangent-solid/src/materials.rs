use crate::HyperelasticMaterial;
use nalgebra::DMatrix;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use tangent_autodiff::matrix::{determinant, spd_power_trace};
use tangent_autodiff::{One, Real, Zero};

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LameParameters {
    pub mu: f64,
    pub lambda: f64,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YoungPoisson {
    pub young: f64,
    pub poisson: f64,
}

impl LameParameters {
    /// Converts Young's modulus and Poisson's ratio.
    ///
    /// For volumes the usual relation $\lambda = E \nu / ((1 + \nu)(1 - 2 \nu))$ is used, for
    /// planar problems the plane stress relation $\lambda = E \nu / (1 - \nu^2)$.
    pub fn from_young_poisson(params: YoungPoisson, is_volume: bool) -> Self {
        let YoungPoisson { young, poisson } = params;
        let mu = 0.5 * young / (1.0 + poisson);
        let lambda = if is_volume {
            young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson))
        } else {
            young * poisson / (1.0 - poisson * poisson)
        };
        Self { mu, lambda }
    }

    /// Reads either `{"mu": .., "lambda": ..}` or `{"E": .., "nu": ..}`.
    pub fn from_json(params: &Value, is_volume: bool) -> Result<Self, MaterialError> {
        if let (Some(mu), Some(lambda)) = (params.get("mu"), params.get("lambda")) {
            Ok(Self {
                mu: number(mu, "mu")?,
                lambda: number(lambda, "lambda")?,
            })
        } else if let (Some(young), Some(poisson)) = (params.get("E"), params.get("nu")) {
            let young_poisson = YoungPoisson {
                young: number(young, "E")?,
                poisson: number(poisson, "nu")?,
            };
            Ok(Self::from_young_poisson(young_poisson, is_volume))
        } else {
            Err(MaterialError::MissingParameters {
                expected: "either \"mu\" and \"lambda\" or \"E\" and \"nu\"",
            })
        }
    }
}

/// A single term $\mu_k, \alpha_k$ of the isochoric Ogden energy.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OgdenTerm {
    pub alpha: f64,
    pub mu: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OgdenParameters {
    pub terms: Vec<OgdenTerm>,
    /// Volumetric coefficients $D_k$.
    pub bulk: Vec<f64>,
}

impl OgdenParameters {
    pub fn new(terms: Vec<OgdenTerm>, bulk: Vec<f64>) -> Result<Self, MaterialError> {
        if let Some(term) = terms.iter().find(|term| term.alpha == 0.0) {
            return Err(MaterialError::InvalidParameter {
                name: "alphas",
                value: term.alpha,
            });
        }
        if let Some(&d) = bulk.iter().find(|&&d| !(d > 0.0)) {
            return Err(MaterialError::InvalidParameter { name: "Ds", value: d });
        }
        Ok(Self { terms, bulk })
    }

    /// Reads `{"alphas": [..], "mus": [..], "Ds": [..]}`, where `alphas` and `mus` have equal
    /// length. Scalars are accepted in place of single-element arrays.
    pub fn from_json(params: &Value) -> Result<Self, MaterialError> {
        let (Some(alphas), Some(mus), Some(ds)) = (params.get("alphas"), params.get("mus"), params.get("Ds")) else {
            return Err(MaterialError::MissingParameters {
                expected: "\"alphas\", \"mus\" and \"Ds\"",
            });
        };
        let alphas = numbers(alphas, "alphas")?;
        let mus = numbers(mus, "mus")?;
        if alphas.len() != mus.len() {
            return Err(MaterialError::LengthMismatch {
                first: ("alphas", alphas.len()),
                second: ("mus", mus.len()),
            });
        }
        let terms = alphas
            .into_iter()
            .zip(mus)
            .map(|(alpha, mu)| OgdenTerm { alpha, mu })
            .collect();
        Self::new(terms, numbers(ds, "Ds")?)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MaterialError {
    MissingParameters {
        expected: &'static str,
    },
    NotANumber {
        name: &'static str,
    },
    InvalidParameter {
        name: &'static str,
        value: f64,
    },
    LengthMismatch {
        first: (&'static str, usize),
        second: (&'static str, usize),
    },
    /// Per-element parameters were requested for a material that does not support them.
    UnsupportedMultimaterial,
}

impl fmt::Display for MaterialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameters { expected } => write!(f, "Missing material parameters, expected {}", expected),
            Self::NotANumber { name } => write!(f, "Material parameter \"{}\" is not a number", name),
            Self::InvalidParameter { name, value } => {
                write!(f, "Invalid value {} for material parameter \"{}\"", value, name)
            }
            Self::LengthMismatch { first, second } => write!(
                f,
                "Material parameters \"{}\" ({} entries) and \"{}\" ({} entries) must have the same length",
                first.0, first.1, second.0, second.1
            ),
            Self::UnsupportedMultimaterial => {
                write!(f, "Per-element parameters are only supported by the Neo-Hookean material")
            }
        }
    }
}

impl Error for MaterialError {}

fn number(value: &Value, name: &'static str) -> Result<f64, MaterialError> {
    value.as_f64().ok_or(MaterialError::NotANumber { name })
}

fn numbers(value: &Value, name: &'static str) -> Result<Vec<f64>, MaterialError> {
    match value {
        Value::Array(entries) => entries.iter().map(|entry| number(entry, name)).collect(),
        _ => Ok(vec![number(value, name)?]),
    }
}

/// The Neo-Hookean material model.
///
/// The strain energy density is given by
/// $$
/// \psi(\vec F) = \frac{\mu}{2}(I_C - d - 2 \log J) + \frac{\lambda}{2}(\log J)^2,
/// $$
/// where $J = \det \vec F$, $d$ is the dimension and $I_C = \tr{\vec F^T \vec F}$ is the first
/// right Cauchy-Green invariant. Requires $J > 0$.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeoHookeanMaterial;

impl HyperelasticMaterial for NeoHookeanMaterial {
    type Parameters = LameParameters;

    #[allow(non_snake_case)]
    #[replace_float_literals(T::from(literal))]
    fn compute_energy_density<T: Real>(&self, deformation_gradient: &DMatrix<T>, parameters: &LameParameters) -> T {
        let F = deformation_gradient;
        let mu = T::from(parameters.mu);
        let lambda = T::from(parameters.lambda);
        let d = T::from(F.nrows() as f64);

        let I_C = F.dot(F);
        let log_J = determinant(F).ln();
        mu * 0.5 * (I_C - d - log_J.clone() * 2.0) + lambda * 0.5 * log_J.clone() * log_J
    }
}

/// The compressible Ogden material model.
///
/// With the isochoric deformation gradient $\bar{\vec F} = J^{-1/d} \vec F$ and its principal
/// stretches $\bar \lambda_i$, the strain energy density is
/// $$
/// \psi(\vec F) = \sum_k \frac{2 \mu_k}{\alpha_k^2} \left( \sum_i \bar \lambda_i^{\alpha_k} - d \right)
///     + \sum_k \frac{1}{D_k} (J - 1)^{2k}.
/// $$
/// The stretch sums are evaluated as $\tr{\bar{\vec C}^{\alpha_k / 2}}$ without an
/// eigendecomposition, so the density stays smooth where stretches coincide.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OgdenMaterial;

impl HyperelasticMaterial for OgdenMaterial {
    type Parameters = OgdenParameters;

    #[allow(non_snake_case)]
    fn compute_energy_density<T: Real>(&self, deformation_gradient: &DMatrix<T>, parameters: &OgdenParameters) -> T {
        let F = deformation_gradient;
        let d = F.nrows() as f64;
        let C = F.transpose() * F;
        let J = determinant(F);

        let mut psi = T::zero();
        for &OgdenTerm { alpha, mu } in &parameters.terms {
            // tr(C_bar^(alpha / 2)) = J^(-alpha / d) tr(C^(alpha / 2))
            let stretch_sum = spd_power_trace(&C, 0.5 * alpha) * J.powf(-alpha / d);
            psi += (stretch_sum - T::from(d)) * (2.0 * mu / (alpha * alpha));
        }
        for (k, &d_k) in parameters.bulk.iter().enumerate() {
            let exponent = 2 * (k as i32 + 1);
            psi += (J.clone() - T::one()).powi(exponent) / d_k;
        }
        psi
    }
}

/// The closed set of material laws supported by [`ElasticityModel`](crate::ElasticityModel).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Material {
    NeoHookean(LameParameters),
    Ogden(OgdenParameters),
}

impl Material {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NeoHookean(_) => "NeoHookean",
            Self::Ogden(_) => "Ogden",
        }
    }

    pub fn compute_energy_density<T: Real>(&self, deformation_gradient: &DMatrix<T>) -> T {
        match self {
            Self::NeoHookean(lame) => NeoHookeanMaterial.compute_energy_density(deformation_gradient, lame),
            Self::Ogden(params) => OgdenMaterial.compute_energy_density(deformation_gradient, params),
        }
    }

    pub fn compute_stress_tensor(&self, deformation_gradient: &DMatrix<f64>) -> DMatrix<f64> {
        match self {
            Self::NeoHookean(lame) => NeoHookeanMaterial.compute_stress_tensor(deformation_gradient, lame),
            Self::Ogden(params) => OgdenMaterial.compute_stress_tensor(deformation_gradient, params),
        }
    }

    /// Replaces the parameters of the current law with ones read from JSON.
    pub fn set_parameters(&mut self, params: &Value, is_volume: bool) -> Result<(), MaterialError> {
        match self {
            Self::NeoHookean(lame) => *lame = LameParameters::from_json(params, is_volume)?,
            Self::Ogden(ogden) => *ogden = OgdenParameters::from_json(params)?,
        }
        Ok(())
    }
}
