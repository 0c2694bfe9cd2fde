mod assembler;
mod boundary_cond;
mod config;
mod error;
mod forcing;
mod grid;
mod interface;
mod nonlinear;
mod output;
mod soil_hydra;
mod solver1d;
mod state;
mod tridiag;

#[cfg(test)]
mod testing;

pub use assembler::{Boundaries, FluxAssembler};
pub use boundary_cond::{BcInputs, BcKind, BoundaryCondition, BoundaryTerms, Side};
pub use config::{ConfigError, NonconvergencePolicy, SolverConfig, SolverSettings};
pub use error::{Result, RichardsError};
pub use forcing::{ForcingError, ForcingRecord, ForcingSeries};
pub use grid::Grid;
pub use interface::InterfaceConductivity;
pub use nonlinear::{
    IterationOutcome, IterationSettings, IterationStatus, NonlinearIterator, StepInput,
};
pub use output::{OutputSink, SavedOutputs, StepOutput};
pub use soil_hydra::{
    ConstitutiveModel, SoilColumn, SoilLayerParameters, VolumeSplit, load_soil_parameters,
};
pub use solver1d::{RichardsSolver1D, RunSummary};
pub use state::State;
pub use tridiag::{LinearSystem, thomas_solve};
