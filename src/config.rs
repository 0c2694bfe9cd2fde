use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::boundary_cond::{BoundaryCondition, Side};
use crate::interface::InterfaceConductivity;

// Configuration errors, all fatal at setup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value '{value}' for '{key}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(key: &str, value: impl ToString, reason: &str) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}

// What the time-stepping loop does when the Picard cap is hit
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NonconvergencePolicy {
    // Keep the last iterate and move on
    #[default]
    Accept,
    // Retry the sub-step with half the time step
    Halve,
    // Fail with a nonconvergence error
    Abort,
}

// Solver options as read from TOML. Times are in seconds
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverConfig {
    #[serde(alias = "topBCType")]
    pub top_bc_type: String,
    #[serde(alias = "bottomBCType")]
    pub bottom_bc_type: String,
    #[serde(alias = "interfaceHydraulicConductivityModel")]
    pub interface_hydraulic_conductivity_model: String,
    #[serde(alias = "picardIteration")]
    pub picard_iteration: usize,
    #[serde(alias = "nestedNewton")]
    pub nested_newton: bool,
    #[serde(alias = "newtonTolerance")]
    pub newton_tolerance: f64,
    pub max_newton_iterations: usize,
    #[serde(alias = "timeDelta")]
    pub time_delta: f64,
    // Length of one forcing record; defaults to `time_delta`
    #[serde(alias = "tTimeStep")]
    pub forcing_time_step: Option<f64>,
    #[serde(alias = "maxPonding")]
    pub max_ponding: f64,
    pub pivot_epsilon: f64,
    pub nonconvergence_policy: NonconvergencePolicy,
    pub max_time_step_halvings: u32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            top_bc_type: "Top Neumann".to_string(),
            bottom_bc_type: "Bottom Free Drainage".to_string(),
            interface_hydraulic_conductivity_model: "Harmonic mean".to_string(),
            picard_iteration: 2,
            nested_newton: true,
            newton_tolerance: 1e-12,
            max_newton_iterations: 50,
            time_delta: 60.0,
            forcing_time_step: None,
            max_ponding: 0.0,
            pivot_epsilon: 1e-20,
            nonconvergence_policy: NonconvergencePolicy::Accept,
            max_time_step_halvings: 8,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolverSettings {
    pub top_bc: BoundaryCondition,
    pub bottom_bc: BoundaryCondition,
    pub interface: InterfaceConductivity,
    pub picard_iteration: usize,
    pub nested_newton: bool,
    pub newton_tolerance: f64,
    pub max_newton_iterations: usize,
    pub time_delta: f64,
    pub forcing_time_step: f64,
    pub max_ponding: f64,
    pub pivot_epsilon: f64,
    pub nonconvergence_policy: NonconvergencePolicy,
    pub max_time_step_halvings: u32,
}

impl SolverConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    // Parse the string options and check numeric ranges
    pub fn settings(&self) -> Result<SolverSettings, ConfigError> {
        let top_bc = BoundaryCondition::parse(Side::Top, &self.top_bc_type)?;
        let bottom_bc = BoundaryCondition::parse(Side::Bottom, &self.bottom_bc_type)?;
        let interface = self.interface_hydraulic_conductivity_model.parse()?;

        if self.picard_iteration == 0 {
            return Err(ConfigError::invalid(
                "picard_iteration",
                self.picard_iteration,
                "at least one Picard iteration is required",
            ));
        }
        if self.max_newton_iterations == 0 {
            return Err(ConfigError::invalid(
                "max_newton_iterations",
                self.max_newton_iterations,
                "must be positive",
            ));
        }
        if !(self.newton_tolerance > 0.0) {
            return Err(ConfigError::invalid(
                "newton_tolerance",
                self.newton_tolerance,
                "must be positive",
            ));
        }
        if !(self.time_delta > 0.0 && self.time_delta.is_finite()) {
            return Err(ConfigError::invalid(
                "time_delta",
                self.time_delta,
                "must be positive",
            ));
        }
        let forcing_time_step = self.forcing_time_step.unwrap_or(self.time_delta);
        if !(forcing_time_step > 0.0 && forcing_time_step.is_finite()) {
            return Err(ConfigError::invalid(
                "forcing_time_step",
                forcing_time_step,
                "must be positive",
            ));
        }
        if !self.max_ponding.is_finite() {
            return Err(ConfigError::invalid(
                "max_ponding",
                self.max_ponding,
                "must be finite",
            ));
        }
        if !(self.pivot_epsilon >= 0.0) {
            return Err(ConfigError::invalid(
                "pivot_epsilon",
                self.pivot_epsilon,
                "must be non-negative",
            ));
        }

        Ok(SolverSettings {
            top_bc,
            bottom_bc,
            interface,
            picard_iteration: self.picard_iteration,
            nested_newton: self.nested_newton,
            newton_tolerance: self.newton_tolerance,
            max_newton_iterations: self.max_newton_iterations,
            time_delta: self.time_delta,
            forcing_time_step,
            max_ponding: self.max_ponding,
            pivot_epsilon: self.pivot_epsilon,
            nonconvergence_policy: self.nonconvergence_policy,
            max_time_step_halvings: self.max_time_step_halvings,
        })
    }
}
