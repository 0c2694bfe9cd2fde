use nalgebra::DVector;

use crate::boundary_cond::{BcInputs, BoundaryCondition};
use crate::error::{RichardsError, Result};
use crate::grid::Grid;
use crate::interface::InterfaceConductivity;
use crate::tridiag::LinearSystem;

// Boundary conditions in effect for one assembly, with their values
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boundaries {
    pub top: BoundaryCondition,
    pub bottom: BoundaryCondition,
    pub top_value: f64,
    pub bottom_value: f64,
}

/// Builds the Δt-scaled flux part of the tridiagonal system.
///
/// Rows read `Δt·[kM/dM (ψᵢ − ψᵢ₋₁) + kP/dP (ψᵢ − ψᵢ₊₁)] = Δt·(kP − kM)`,
/// i.e. the divergence of `q = −K (∂ψ/∂z + 1)`. Row 0 comes from the
/// bottom boundary condition and row `n − 1` from the top one. Storage terms
/// are added by the nonlinear iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FluxAssembler {
    interface: InterfaceConductivity,
}

impl FluxAssembler {
    pub fn new(interface: InterfaceConductivity) -> Self {
        FluxAssembler { interface }
    }

    pub fn interface(&self) -> InterfaceConductivity {
        self.interface
    }

    // Conductivities of the `n + 1` faces: the two boundary faces take the
    // conductivity of their node, interior faces use the interface rule
    pub fn face_conductivities(&self, grid: &Grid, kappas: &DVector<f64>) -> Result<DVector<f64>> {
        let n = grid.len();
        if let Some(node) = kappas.iter().position(|k| !(k.is_finite() && *k >= 0.0)) {
            return Err(RichardsError::Assembly {
                node,
                quantity: "hydraulic conductivity",
                value: kappas[node],
            });
        }

        let mut faces = DVector::zeros(n + 1);
        faces[0] = kappas[0];
        faces[n] = kappas[n - 1];
        for i in 1..n {
            let k = self.interface.compute(
                kappas[i - 1],
                kappas[i],
                grid.half_width(i - 1),
                grid.half_width(i),
            );
            if !k.is_finite() {
                return Err(RichardsError::Assembly {
                    node: i,
                    quantity: "interface conductivity",
                    value: k,
                });
            }
            faces[i] = k;
        }
        Ok(faces)
    }

    pub fn assemble(
        &self,
        grid: &Grid,
        kappas: &DVector<f64>,
        boundaries: &Boundaries,
        time_delta: f64,
    ) -> Result<LinearSystem> {
        let n = grid.len();
        let faces = self.face_conductivities(grid, kappas)?;
        let mut system = LinearSystem::zeros(n);

        for i in 1..n - 1 {
            let k_m = faces[i];
            let k_p = faces[i + 1];
            let lower = k_m * time_delta / grid.space_delta_m(i);
            let upper = k_p * time_delta / grid.space_delta_p(i);
            system.lower[i] = -lower;
            system.main[i] = lower + upper;
            system.upper[i] = -upper;
            system.rhs[i] = time_delta * (k_p - k_m);
        }

        let bottom = boundaries
            .bottom
            .terms(&bottom_inputs(grid, &faces, boundaries.bottom_value, time_delta));
        system.main[0] = bottom.main;
        system.upper[0] = bottom.upper;
        system.rhs[0] = bottom.rhs;

        let top = boundaries
            .top
            .terms(&top_inputs(grid, &faces, boundaries.top_value, time_delta));
        system.lower[n - 1] = top.lower;
        system.main[n - 1] = top.main;
        system.rhs[n - 1] = top.rhs;

        Ok(system)
    }

    // Darcy velocity at the `n + 1` faces, positive upward
    pub fn darcy_velocities(
        &self,
        grid: &Grid,
        kappas: &DVector<f64>,
        psi: &DVector<f64>,
        boundaries: &Boundaries,
    ) -> Result<DVector<f64>> {
        let n = grid.len();
        let faces = self.face_conductivities(grid, kappas)?;
        let mut q = DVector::zeros(n + 1);
        q[0] = boundaries.bottom.face_flux(
            &bottom_inputs(grid, &faces, boundaries.bottom_value, 1.0),
            psi[0],
        );
        for i in 1..n {
            q[i] = -faces[i] * ((psi[i] - psi[i - 1]) / grid.space_delta_m(i) + 1.0);
        }
        q[n] = boundaries
            .top
            .face_flux(&top_inputs(grid, &faces, boundaries.top_value, 1.0), psi[n - 1]);
        Ok(q)
    }
}

fn bottom_inputs(grid: &Grid, faces: &DVector<f64>, bc: f64, time_delta: f64) -> BcInputs {
    BcInputs {
        bc,
        k_p: faces[1],
        k_m: faces[0],
        space_delta_p: grid.space_delta_p(0),
        space_delta_m: grid.space_delta_m(0),
        time_delta,
    }
}

fn top_inputs(grid: &Grid, faces: &DVector<f64>, bc: f64, time_delta: f64) -> BcInputs {
    let n = grid.len();
    BcInputs {
        bc,
        k_p: faces[n],
        k_m: faces[n - 1],
        space_delta_p: grid.space_delta_p(n - 1),
        space_delta_m: grid.space_delta_m(n - 1),
        time_delta,
    }
}
