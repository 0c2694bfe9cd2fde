use log::{debug, info, warn};
use nalgebra::DVector;

use crate::assembler::{Boundaries, FluxAssembler};
use crate::config::{NonconvergencePolicy, SolverConfig, SolverSettings};
use crate::error::{RichardsError, Result};
use crate::forcing::{ForcingRecord, ForcingSeries};
use crate::grid::Grid;
use crate::nonlinear::{IterationOutcome, IterationSettings, IterationStatus, NonlinearIterator, StepInput};
use crate::output::{OutputSink, StepOutput};
use crate::soil_hydra::SoilColumn;
use crate::state::State;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunSummary {
    pub records: usize,
    pub sub_steps: usize,
    pub non_converged: usize,
    pub runoff: f64,
    pub max_abs_error_volume: f64,
}

// Finite-volume solver for the Richards equation in a layered column
pub struct RichardsSolver1D {
    grid: Grid,
    column: SoilColumn,
    settings: SolverSettings,
    assembler: FluxAssembler,
    state: State,
    time: f64, // Time of the current state [s]
}

impl RichardsSolver1D {
    pub fn new(config: &SolverConfig, grid: Grid, column: SoilColumn, state: State) -> Result<Self> {
        let settings = config.settings()?;
        column.validate(&grid)?;
        state.validate(&grid)?;
        debug!(
            "richards solver: {} nodes, {} / {}, {:?} interface conductivity",
            grid.len(),
            settings.top_bc,
            settings.bottom_bc,
            settings.interface
        );
        Ok(RichardsSolver1D {
            assembler: FluxAssembler::new(settings.interface),
            grid,
            column,
            settings,
            state,
            time: 0.0,
        })
    }

    pub fn with_start_time(mut self, time: f64) -> Self {
        self.time = time;
        self
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    // Water stored in the column [m]
    pub fn total_water(&self) -> f64 {
        self.water_volume(self.state.psi())
    }

    fn water_volume(&self, psi: &DVector<f64>) -> f64 {
        self.water_content(psi)
            .iter()
            .zip(self.grid.control_volume())
            .map(|(theta, dz)| theta * dz)
            .sum()
    }

    fn water_content(&self, psi: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(self.grid.len(), |i, _| {
            self.column.water_content(&self.grid, i, psi[i])
        })
    }

    fn iterate(&self, state: &State, boundaries: Boundaries, time_delta: f64) -> Result<IterationOutcome> {
        let iterator = NonlinearIterator::new(
            &self.grid,
            &self.column,
            self.assembler,
            IterationSettings::from(&self.settings),
        );
        iterator.solve(&StepInput {
            psi_old: state.psi(),
            temperature: state.temperature(),
            boundaries,
            time_delta,
        })
    }

    /// Advance over one forcing record, in sub-steps of at most `time_delta`.
    ///
    /// Non-converged sub-steps and recoverable errors are handled according
    /// to the configured [`NonconvergencePolicy`]; singular systems always fail.
    /// On error the solver keeps the state it had before the record.
    pub fn step(&mut self, record: &ForcingRecord) -> Result<StepOutput> {
        let n = self.grid.len();
        let interval = self.settings.forcing_time_step;
        let boundaries = Boundaries {
            top: self.settings.top_bc,
            bottom: self.settings.bottom_bc,
            top_value: record.top,
            bottom_value: record.bottom,
        };
        let policy = self.settings.nonconvergence_policy;
        let mut state = self.state.clone();
        let water_before = self.water_volume(state.psi());

        let mut dt = self.settings.time_delta.min(interval);
        let mut min_time_delta = dt;
        let mut halvings = 0;
        let mut elapsed = 0.0;
        let mut inflow = 0.0;
        let mut runoff = 0.0;
        let mut sub_steps = 0;
        let mut picard_iterations = 0;
        let mut status = IterationStatus::Converged;
        let mut darcy_velocity = DVector::zeros(n + 1);
        let mut top_bc = boundaries.top;

        while interval - elapsed > 1e-12 * interval {
            let time_delta = dt.min(interval - elapsed);
            let can_halve = policy == NonconvergencePolicy::Halve
                && halvings < self.settings.max_time_step_halvings;

            let outcome = match self.iterate(&state, boundaries, time_delta) {
                Ok(outcome) if outcome.converged() => outcome,
                Ok(outcome) => {
                    let increment = outcome.increments.last().copied().unwrap_or(f64::NAN);
                    match policy {
                        NonconvergencePolicy::Accept => {
                            warn!(
                                "t = {}: accepting non-converged step (max |dpsi| = {:e})",
                                self.time + elapsed,
                                increment
                            );
                            outcome
                        }
                        NonconvergencePolicy::Halve if can_halve => {
                            halvings += 1;
                            dt = 0.5 * time_delta;
                            warn!("t = {}: no convergence, retrying with dt = {} s", self.time + elapsed, dt);
                            continue;
                        }
                        _ => {
                            return Err(RichardsError::Nonconvergence {
                                iterations: outcome.picard_iterations,
                                increment,
                                time_delta,
                            });
                        }
                    }
                }
                Err(err) if err.is_recoverable() && can_halve => {
                    halvings += 1;
                    dt = 0.5 * time_delta;
                    warn!("t = {}: {err}, retrying with dt = {} s", self.time + elapsed, dt);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let q = self.assembler.darcy_velocities(
                &self.grid,
                &outcome.kappas,
                &outcome.psi,
                &outcome.boundaries,
            )?;
            inflow += time_delta * (q[0] - q[n]);
            if outcome.ponding {
                runoff += time_delta * (record.top + q[n]).max(0.0);
            }
            if outcome.status == IterationStatus::MaxIterExceeded {
                status = IterationStatus::MaxIterExceeded;
            }
            sub_steps += 1;
            picard_iterations += outcome.picard_iterations;
            min_time_delta = min_time_delta.min(time_delta);
            top_bc = outcome.boundaries.top;
            darcy_velocity = q;
            elapsed += time_delta;
            state.commit(outcome.psi);
            if halvings > 0 {
                halvings -= 1;
                dt = (2.0 * dt).min(self.settings.time_delta);
            }
        }

        let error_volume = self.water_volume(state.psi()) - water_before - inflow;
        self.state = state;
        self.time += interval;
        info!(
            "record t = {}: {} sub-steps, {} picard iterations, error volume {:e}",
            record.time, sub_steps, picard_iterations, error_volume
        );

        Ok(StepOutput {
            time: record.time,
            psi: self.state.psi().clone(),
            water_content: self.water_content(self.state.psi()),
            darcy_velocity,
            error_volume,
            runoff,
            top_bc,
            status,
            sub_steps,
            picard_iterations,
            min_time_delta,
            save: record.save,
        })
    }

    // Drive the solver over every record, handing each result to `sink`
    pub fn run<S: OutputSink + ?Sized>(&mut self, forcing: &ForcingSeries, sink: &mut S) -> Result<RunSummary> {
        info!(
            "running {} forcing records of {} s ({} / {})",
            forcing.len(),
            self.settings.forcing_time_step,
            self.settings.top_bc,
            self.settings.bottom_bc
        );
        let mut summary = RunSummary::default();
        for record in forcing {
            let output = self.step(record)?;
            summary.records += 1;
            summary.sub_steps += output.sub_steps;
            summary.runoff += output.runoff;
            summary.max_abs_error_volume = summary.max_abs_error_volume.max(output.error_volume.abs());
            if output.status != IterationStatus::Converged {
                summary.non_converged += 1;
            }
            sink.consume(output)?;
        }
        info!(
            "run finished at t = {}: {} sub-steps, {} non-converged, runoff {:e} m, max error volume {:e} m",
            self.time, summary.sub_steps, summary.non_converged, summary.runoff, summary.max_abs_error_volume
        );
        Ok(summary)
    }
}
