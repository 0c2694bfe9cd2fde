use thiserror::Error;

use crate::config::ConfigError;
use crate::forcing::ForcingError;

// Errors raised while setting up or advancing the Richards solver
#[derive(Debug, Error)]
pub enum RichardsError {
    // Unsupported option or unreadable configuration, fatal at setup
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("invalid forcing: {0}")]
    Forcing(#[from] ForcingError),

    // Inconsistent grid or state vectors
    #[error("invalid geometry: {0}")]
    Geometry(String),

    // Non-finite coefficient produced by a constitutive evaluation
    #[error("assembly failed at node {node}: {quantity} = {value}")]
    Assembly {
        node: usize,
        quantity: &'static str,
        value: f64,
    },

    // Pivot below the configured epsilon during the Thomas sweep
    #[error("singular tridiagonal system: pivot {pivot:e} at row {row}")]
    SingularSystem { row: usize, pivot: f64 },

    // Picard cap reached and the caller asked for failure
    #[error(
        "no convergence after {iterations} Picard iterations (max |dpsi| = {increment:e}, dt = {time_delta} s)"
    )]
    Nonconvergence {
        iterations: usize,
        increment: f64,
        time_delta: f64,
    },
}

impl RichardsError {
    // Whether the orchestrating loop may retry the step with a smaller time step
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RichardsError::Assembly { .. } | RichardsError::Nonconvergence { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, RichardsError>;
