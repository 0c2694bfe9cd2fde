use serde::Deserialize;

use crate::config::ConfigError;
use crate::error::{RichardsError, Result};
use crate::grid::Grid;

fn default_reference_temperature() -> f64 {
    278.15
}

// Soil hydraulic parameters of one parameter set
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct SoilLayerParameters {
    pub ks: f64,      // Saturated hydraulic conductivity [m/s]
    pub theta_s: f64, // Saturated water content [-]
    pub theta_r: f64, // Residual water content [-]
    #[serde(default)]
    pub swrc: [f64; 5], // Shape parameters of the retention curve
    #[serde(default, alias = "alpha_ss")]
    pub alpha_specific_storage: f64, // Soil compressibility term [1/m]
    #[serde(default, alias = "beta_ss")]
    pub beta_specific_storage: f64, // Water compressibility term [1/m]
    #[serde(default = "default_reference_temperature")]
    pub reference_temperature: f64, // [K]
}

impl SoilLayerParameters {
    pub fn new(ks: f64, theta_s: f64, theta_r: f64, swrc: [f64; 5]) -> Self {
        SoilLayerParameters {
            ks,
            theta_s,
            theta_r,
            swrc,
            alpha_specific_storage: 0.0,
            beta_specific_storage: 0.0,
            reference_temperature: default_reference_temperature(),
        }
    }

    pub fn with_specific_storage(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha_specific_storage = alpha;
        self.beta_specific_storage = beta;
        self
    }
}

/// Read named parameter sets from a TOML document, in the order requested.
///
/// ```toml
/// [loam]
/// ks = 2.9e-6
/// theta_s = 0.43
/// theta_r = 0.078
/// swrc = [1.56, 3.6, 0.0, 0.0, 0.0]
/// ```
pub fn load_soil_parameters(
    toml_str: &str,
    names: &[&str],
) -> std::result::Result<Vec<SoilLayerParameters>, ConfigError> {
    let mut table: toml::Table = toml::from_str(toml_str)?;
    names
        .iter()
        .map(|name| {
            let key = name.to_lowercase();
            let value = table.remove(&key).ok_or_else(|| ConfigError::Invalid {
                key: "soil".to_string(),
                value: name.to_string(),
                reason: "no such parameter set".to_string(),
            })?;
            Ok(value.try_into()?)
        })
        .collect()
}

/// Water retention and conductivity curves the solver needs from a soil.
///
/// Implementations must be total for physically valid pressure heads,
/// `water_content` must be non-decreasing in `psi`, and `moisture_capacity`
/// must increase up to `inflection_point` and not increase above it.
pub trait ConstitutiveModel {
    /// θ(ψ), including the specific-storage term above saturation.
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64;

    /// dθ/dψ.
    fn moisture_capacity(&self, psi: f64, params: &SoilLayerParameters) -> f64;

    /// K(ψ); `temperature` is only used by temperature-corrected models.
    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, temperature: f64)
    -> f64;

    /// Pressure head where the moisture capacity peaks.
    fn inflection_point(&self, params: &SoilLayerParameters) -> f64;

    fn specific_storage(&self, params: &SoilLayerParameters) -> f64 {
        params.alpha_specific_storage + params.theta_s * params.beta_specific_storage
    }
}

// Split of θ(ψ) into θ₁ − θ₂ with both parts non-decreasing and convex
// Below the inflection point θ₁ = θ and θ₂ = 0; above it θ₁ continues
// along the tangent at the inflection point
pub struct VolumeSplit<'a> {
    model: &'a dyn ConstitutiveModel,
    params: &'a SoilLayerParameters,
    psi_star: f64,
    theta_star: f64,
    capacity_star: f64,
}

impl<'a> VolumeSplit<'a> {
    pub fn new(model: &'a dyn ConstitutiveModel, params: &'a SoilLayerParameters) -> Self {
        let psi_star = model.inflection_point(params);
        VolumeSplit {
            model,
            params,
            psi_star,
            theta_star: model.water_content(psi_star, params),
            capacity_star: model.moisture_capacity(psi_star, params),
        }
    }

    pub fn psi_star(&self) -> f64 {
        self.psi_star
    }

    pub fn theta1(&self, psi: f64) -> f64 {
        if psi <= self.psi_star {
            self.model.water_content(psi, self.params)
        } else {
            self.theta_star + self.capacity_star * (psi - self.psi_star)
        }
    }

    pub fn theta2(&self, psi: f64) -> f64 {
        self.theta1(psi) - self.model.water_content(psi, self.params)
    }

    pub fn capacity1(&self, psi: f64) -> f64 {
        if psi <= self.psi_star {
            self.model.moisture_capacity(psi, self.params)
        } else {
            self.capacity_star
        }
    }

    pub fn capacity2(&self, psi: f64) -> f64 {
        self.capacity1(psi) - self.model.moisture_capacity(psi, self.params)
    }
}

// Parameter sets and constitutive models of a column, indexed by the
// grid's parameter and layer ids
pub struct SoilColumn {
    parameters: Vec<SoilLayerParameters>,
    models: Vec<Box<dyn ConstitutiveModel>>,
}

impl SoilColumn {
    pub fn new(
        parameters: Vec<SoilLayerParameters>,
        models: Vec<Box<dyn ConstitutiveModel>>,
    ) -> Self {
        SoilColumn { parameters, models }
    }

    // One model and one parameter set shared by every node
    pub fn homogeneous(params: SoilLayerParameters, model: Box<dyn ConstitutiveModel>) -> Self {
        SoilColumn {
            parameters: vec![params],
            models: vec![model],
        }
    }

    // Check that every node of `grid` maps to a model and a parameter set
    pub fn validate(&self, grid: &Grid) -> Result<()> {
        for i in 0..grid.len() {
            if grid.layer_id(i) >= self.models.len() {
                return Err(RichardsError::Geometry(format!(
                    "node {i} uses layer {} but only {} models are defined",
                    grid.layer_id(i),
                    self.models.len()
                )));
            }
            if grid.parameter_id(i) >= self.parameters.len() {
                return Err(RichardsError::Geometry(format!(
                    "node {i} uses parameter set {} but only {} are defined",
                    grid.parameter_id(i),
                    self.parameters.len()
                )));
            }
        }
        Ok(())
    }

    pub fn model(&self, grid: &Grid, node: usize) -> &dyn ConstitutiveModel {
        self.models[grid.layer_id(node)].as_ref()
    }

    pub fn parameters(&self, grid: &Grid, node: usize) -> &SoilLayerParameters {
        &self.parameters[grid.parameter_id(node)]
    }

    pub fn water_content(&self, grid: &Grid, node: usize, psi: f64) -> f64 {
        self.model(grid, node)
            .water_content(psi, self.parameters(grid, node))
    }

    pub fn hydraulic_conductivity(&self, grid: &Grid, node: usize, psi: f64, temperature: f64) -> f64 {
        self.model(grid, node)
            .hydraulic_conductivity(psi, self.parameters(grid, node), temperature)
    }

    pub fn split(&self, grid: &Grid, node: usize) -> VolumeSplit<'_> {
        VolumeSplit::new(self.model(grid, node), self.parameters(grid, node))
    }
}
