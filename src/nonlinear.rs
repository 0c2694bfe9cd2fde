use log::{debug, warn};
use nalgebra::DVector;

use crate::assembler::{Boundaries, FluxAssembler};
use crate::boundary_cond::{BcKind, BoundaryCondition};
use crate::config::SolverSettings;
use crate::error::{RichardsError, Result};
use crate::grid::Grid;
use crate::soil_hydra::{SoilColumn, VolumeSplit};
use crate::tridiag::LinearSystem;

// Numerical controls of one implicit time step
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationSettings {
    pub picard_iteration: usize,
    pub nested_newton: bool,
    pub newton_tolerance: f64,
    pub max_newton_iterations: usize,
    pub pivot_epsilon: f64,
    pub max_ponding: f64,
}

impl From<&SolverSettings> for IterationSettings {
    fn from(settings: &SolverSettings) -> Self {
        IterationSettings {
            picard_iteration: settings.picard_iteration,
            nested_newton: settings.nested_newton,
            newton_tolerance: settings.newton_tolerance,
            max_newton_iterations: settings.max_newton_iterations,
            pivot_epsilon: settings.pivot_epsilon,
            max_ponding: settings.max_ponding,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IterationStatus {
    Iterating,
    Converged,
    MaxIterExceeded,
}

// Inputs of one time step
#[derive(Clone, Copy, Debug)]
pub struct StepInput<'a> {
    pub psi_old: &'a DVector<f64>,
    pub temperature: &'a [f64],
    pub boundaries: Boundaries,
    pub time_delta: f64,
}

// Result of driving one time step, converged or not
#[derive(Clone, Debug)]
pub struct IterationOutcome {
    pub status: IterationStatus,
    pub psi: DVector<f64>,
    pub kappas: DVector<f64>,   // Node conductivities evaluated at psi
    pub boundaries: Boundaries, // In effect at the end of the step
    pub ponding: bool,          // Top capped at max ponding and switched to Dirichlet
    pub picard_iterations: usize,
    pub newton_iterations: usize,
    pub increments: Vec<f64>, // max |dpsi| of every Picard iteration
}

impl IterationOutcome {
    pub fn converged(&self) -> bool {
        self.status == IterationStatus::Converged
    }
}

/// Picard iteration over conductivities with a (nested) Newton solve of
/// the water-volume nonlinearity inside each Picard iteration.
///
/// With conductivities frozen at the current iterate the step solves
/// `V(ψ) − V(ψⁿ) + T ψ = b` where `V` is the water volume of each control
/// volume and `T`, `b` come from the [`FluxAssembler`].
pub struct NonlinearIterator<'a> {
    grid: &'a Grid,
    column: &'a SoilColumn,
    assembler: FluxAssembler,
    settings: IterationSettings,
}

impl<'a> NonlinearIterator<'a> {
    pub fn new(
        grid: &'a Grid,
        column: &'a SoilColumn,
        assembler: FluxAssembler,
        settings: IterationSettings,
    ) -> Self {
        NonlinearIterator {
            grid,
            column,
            assembler,
            settings,
        }
    }

    pub fn solve(&self, input: &StepInput<'_>) -> Result<IterationOutcome> {
        self.solve_observed(input, |_| {})
    }

    // Same as `solve`, handing every Newton iterate to `observe`
    pub fn solve_observed(
        &self,
        input: &StepInput<'_>,
        mut observe: impl FnMut(&DVector<f64>),
    ) -> Result<IterationOutcome> {
        let n = self.grid.len();
        let volumes_old = self.volumes(input.psi_old)?;
        let mut psi = input.psi_old.clone();
        let mut boundaries = input.boundaries;
        let mut ponding = false;
        let mut status = IterationStatus::Iterating;
        let mut increments = Vec::with_capacity(self.settings.picard_iteration);
        let mut newton_iterations = 0;

        for k in 0..self.settings.picard_iteration {
            let kappas = self.conductivities(&psi, input.temperature)?;
            let flux = self
                .assembler
                .assemble(self.grid, &kappas, &boundaries, input.time_delta)?;

            let newton = if self.settings.nested_newton {
                self.nested_newton(&flux, &volumes_old, psi.clone(), &mut observe)?
            } else {
                self.newton(&flux, &volumes_old, psi.clone(), &mut observe)?
            };
            newton_iterations += newton.iterations;

            let increment = (&newton.psi - &psi).amax();
            increments.push(increment);
            psi = newton.psi;
            debug!(
                "picard {}: max |dpsi| = {:e} after {} newton iterations",
                k + 1,
                increment,
                newton.iterations
            );
            if !newton.converged {
                warn!(
                    "picard {}: newton stopped at its cap of {} iterations, residual {:e}",
                    k + 1,
                    self.settings.max_newton_iterations,
                    newton.residual
                );
            }

            if !ponding
                && boundaries.top.kind() == BcKind::Neumann
                && psi[n - 1] > self.settings.max_ponding
            {
                warn!(
                    "top head {:.4} exceeds max ponding {:.4}, switching top boundary to Dirichlet",
                    psi[n - 1],
                    self.settings.max_ponding
                );
                boundaries.top = BoundaryCondition::top_dirichlet();
                boundaries.top_value = self.settings.max_ponding;
                ponding = true;
                // restart from the head at the start of the step
                psi = input.psi_old.clone();
                continue;
            }

            if newton.converged && increment < self.settings.newton_tolerance {
                status = IterationStatus::Converged;
                break;
            }
        }
        if status == IterationStatus::Iterating {
            status = IterationStatus::MaxIterExceeded;
        }

        let kappas = self.conductivities(&psi, input.temperature)?;
        Ok(IterationOutcome {
            status,
            psi,
            kappas,
            boundaries,
            ponding,
            picard_iterations: increments.len(),
            newton_iterations,
            increments,
        })
    }

    // V(ψ) − V(ψⁿ) + Tψ − b with conductivities evaluated at `psi`
    pub fn residual(
        &self,
        input: &StepInput<'_>,
        psi: &DVector<f64>,
        boundaries: &Boundaries,
    ) -> Result<DVector<f64>> {
        let kappas = self.conductivities(psi, input.temperature)?;
        let flux = self
            .assembler
            .assemble(self.grid, &kappas, boundaries, input.time_delta)?;
        Ok(self.volumes(psi)? - self.volumes(input.psi_old)? + flux.apply(psi) - &flux.rhs)
    }

    // Water volume `θ(ψ)·Δz` of every control volume
    pub fn volumes(&self, psi: &DVector<f64>) -> Result<DVector<f64>> {
        self.per_node("water content", |i| {
            self.column.water_content(self.grid, i, psi[i]) * self.grid.control_volume()[i]
        })
    }

    pub fn conductivities(&self, psi: &DVector<f64>, temperature: &[f64]) -> Result<DVector<f64>> {
        self.per_node("hydraulic conductivity", |i| {
            self.column
                .hydraulic_conductivity(self.grid, i, psi[i], temperature[i])
        })
    }

    fn capacities(&self, psi: &DVector<f64>) -> Result<DVector<f64>> {
        self.per_node("moisture capacity", |i| {
            let model = self.column.model(self.grid, i);
            model.moisture_capacity(psi[i], self.column.parameters(self.grid, i))
                * self.grid.control_volume()[i]
        })
    }

    fn per_node(&self, quantity: &'static str, f: impl Fn(usize) -> f64) -> Result<DVector<f64>> {
        let n = self.grid.len();
        let values = DVector::from_fn(n, |i, _| f(i));
        match values.iter().position(|v| !v.is_finite()) {
            Some(node) => Err(RichardsError::Assembly {
                node,
                quantity,
                value: values[node],
            }),
            None => Ok(values),
        }
    }

    // Newton on V(ψ) + Tψ = b with Jacobian diag(C·Δz) + T
    fn newton(
        &self,
        flux: &LinearSystem,
        volumes_old: &DVector<f64>,
        mut psi: DVector<f64>,
        observe: &mut dyn FnMut(&DVector<f64>),
    ) -> Result<NewtonSolve> {
        let mut residual = f64::INFINITY;
        for iteration in 0..self.settings.max_newton_iterations {
            let r = self.volumes(&psi)? - volumes_old + flux.apply(&psi) - &flux.rhs;
            residual = r.norm();
            if residual < self.settings.newton_tolerance {
                return Ok(NewtonSolve::converged(psi, iteration, residual));
            }
            let mut jacobian = flux.clone();
            jacobian.main += self.capacities(&psi)?;
            jacobian.rhs = r;
            psi -= jacobian.solve(self.settings.pivot_epsilon)?;
            observe(&psi);
        }
        Ok(NewtonSolve {
            psi,
            iterations: self.settings.max_newton_iterations,
            residual,
            converged: false,
        })
    }

    // Nested Newton on the split `V = V₁ − V₂`: outer iterations linearize
    // `V₂`, inner iterations run Newton on the convex `V₁` starting from
    // `max(ψ, ψ*)`, which makes both sequences monotone
    fn nested_newton(
        &self,
        flux: &LinearSystem,
        volumes_old: &DVector<f64>,
        mut psi: DVector<f64>,
        observe: &mut dyn FnMut(&DVector<f64>),
    ) -> Result<NewtonSolve> {
        let n = self.grid.len();
        let widths = self.grid.control_volume();
        let splits: Vec<VolumeSplit<'_>> = (0..n).map(|i| self.column.split(self.grid, i)).collect();
        let mut total = 0;
        let mut residual = f64::INFINITY;

        for _ in 0..self.settings.max_newton_iterations {
            let outer = self.volumes(&psi)? - volumes_old + flux.apply(&psi) - &flux.rhs;
            residual = outer.norm();
            if residual < self.settings.newton_tolerance {
                return Ok(NewtonSolve::converged(psi, total, residual));
            }

            let psi_outer = psi.clone();
            let v2_outer = DVector::from_fn(n, |i, _| splits[i].theta2(psi_outer[i]) * widths[i]);
            let c2_outer = DVector::from_fn(n, |i, _| splits[i].capacity2(psi_outer[i]) * widths[i]);
            for i in 0..n {
                psi[i] = psi[i].max(splits[i].psi_star());
            }

            let mut inner_converged = false;
            for _ in 0..self.settings.max_newton_iterations {
                let volumes = DVector::from_fn(n, |i, _| {
                    splits[i].theta1(psi[i]) * widths[i]
                        - (v2_outer[i] + c2_outer[i] * (psi[i] - psi_outer[i]))
                });
                let inner = volumes - volumes_old + flux.apply(&psi) - &flux.rhs;
                if let Some(node) = inner.iter().position(|r| !r.is_finite()) {
                    return Err(RichardsError::Assembly {
                        node,
                        quantity: "water volume",
                        value: inner[node],
                    });
                }
                if inner.norm() < self.settings.newton_tolerance {
                    inner_converged = true;
                    break;
                }
                let mut jacobian = flux.clone();
                for i in 0..n {
                    jacobian.main[i] += splits[i].capacity1(psi[i]) * widths[i] - c2_outer[i];
                }
                jacobian.rhs = inner;
                psi -= jacobian.solve(self.settings.pivot_epsilon)?;
                observe(&psi);
                total += 1;
            }
            if !inner_converged {
                debug!("inner newton stopped at its cap of {} iterations", self.settings.max_newton_iterations);
            }
        }
        Ok(NewtonSolve {
            psi,
            iterations: total,
            residual,
            converged: false,
        })
    }
}

struct NewtonSolve {
    psi: DVector<f64>,
    iterations: usize,
    residual: f64, // 2-norm at the last check
    converged: bool,
}

impl NewtonSolve {
    fn converged(psi: DVector<f64>, iterations: usize, residual: f64) -> Self {
        NewtonSolve {
            psi,
            iterations,
            residual,
            converged: true,
        }
    }
}
