use std::mem;

use nalgebra::DVector;

use crate::error::{RichardsError, Result};
use crate::grid::Grid;

// Pressure head and temperature of every control volume
#[derive(Clone, Debug, PartialEq)]
pub struct State {
    psi: DVector<f64>,          // Pressure head at the end of the last step [m]
    psi_previous: DVector<f64>, // Pressure head one step earlier [m]
    temperature: Vec<f64>,      // [K]
}

impl State {
    pub fn new(psi: Vec<f64>, temperature: Vec<f64>) -> Result<Self> {
        if psi.len() != temperature.len() {
            return Err(RichardsError::Geometry(format!(
                "{} pressure heads but {} temperatures",
                psi.len(),
                temperature.len()
            )));
        }
        if let Some(i) = psi.iter().position(|p| !p.is_finite()) {
            return Err(RichardsError::Geometry(format!(
                "initial pressure head at node {i} is not finite"
            )));
        }
        let psi = DVector::from_vec(psi);
        Ok(State {
            psi_previous: psi.clone(),
            psi,
            temperature,
        })
    }

    pub fn uniform(grid: &Grid, psi: f64, temperature: f64) -> Result<Self> {
        State::new(vec![psi; grid.len()], vec![temperature; grid.len()])
    }

    // Hydrostatic profile with pressure head `psi_bottom` at node 0
    pub fn hydrostatic(grid: &Grid, psi_bottom: f64, temperature: f64) -> Result<Self> {
        let z0 = grid.z()[0];
        let psi = grid.z().iter().map(|z| psi_bottom - (z - z0)).collect();
        State::new(psi, vec![temperature; grid.len()])
    }

    pub fn validate(&self, grid: &Grid) -> Result<()> {
        if self.psi.len() != grid.len() {
            return Err(RichardsError::Geometry(format!(
                "state has {} nodes, grid has {}",
                self.psi.len(),
                grid.len()
            )));
        }
        Ok(())
    }

    pub fn psi(&self) -> &DVector<f64> {
        &self.psi
    }

    pub fn psi_previous(&self) -> &DVector<f64> {
        &self.psi_previous
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    // Accept `psi` as the new state and keep the current one as previous
    pub(crate) fn commit(&mut self, psi: DVector<f64>) {
        self.psi_previous = mem::replace(&mut self.psi, psi);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn hydrostatic_head_decreases_with_elevation() {
        let grid = Grid::uniform(1.0, 10).unwrap();
        let state = State::hydrostatic(&grid, 0.0, 283.15).unwrap();
        assert_eq!(state.psi()[0], 0.0);
        assert_abs_diff_eq!(state.psi()[9], -0.9, epsilon = 1e-12);
        assert_eq!(state.temperature().len(), 10);
    }

    #[test]
    fn commit_keeps_previous_head() {
        let grid = Grid::uniform(1.0, 3).unwrap();
        let mut state = State::uniform(&grid, -1.0, 283.15).unwrap();
        state.commit(DVector::from_element(3, -0.5));
        assert_eq!(state.psi()[1], -0.5);
        assert_eq!(state.psi_previous()[1], -1.0);
    }

    #[test]
    fn rejects_mismatched_vectors() {
        assert!(State::new(vec![-1.0, -1.0], vec![283.15]).is_err());
        assert!(State::new(vec![-1.0, f64::NAN], vec![283.15; 2]).is_err());
        let grid = Grid::uniform(1.0, 3).unwrap();
        let state = State::new(vec![-1.0; 2], vec![283.15; 2]).unwrap();
        assert!(state.validate(&grid).is_err());
    }
}
