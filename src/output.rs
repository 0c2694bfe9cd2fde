use nalgebra::DVector;

use crate::boundary_cond::BoundaryCondition;
use crate::error::Result;
use crate::nonlinear::IterationStatus;

// Converged state and derived quantities at the end of one forcing record
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutput {
    pub time: f64,
    pub psi: DVector<f64>,
    pub water_content: DVector<f64>,
    pub darcy_velocity: DVector<f64>, // At the n + 1 faces, positive upward [m/s]
    pub error_volume: f64,            // Storage change minus net boundary inflow [m]
    pub runoff: f64,                  // Inflow rejected by the ponding cap [m]
    pub top_bc: BoundaryCondition,
    pub status: IterationStatus, // Worst over the sub-steps of the record
    pub sub_steps: usize,
    pub picard_iterations: usize,
    pub min_time_delta: f64, // Smallest sub-step used [s]
    pub save: bool,
}

// Consumer of per-record results; batching and persistence are its concern
pub trait OutputSink {
    fn consume(&mut self, output: StepOutput) -> Result<()>;
}

impl OutputSink for Vec<StepOutput> {
    fn consume(&mut self, output: StepOutput) -> Result<()> {
        self.push(output);
        Ok(())
    }
}

// Keeps only the records flagged for saving
#[derive(Clone, Debug, Default)]
pub struct SavedOutputs {
    pub outputs: Vec<StepOutput>,
}

impl OutputSink for SavedOutputs {
    fn consume(&mut self, output: StepOutput) -> Result<()> {
        if output.save {
            self.outputs.push(output);
        }
        Ok(())
    }
}
