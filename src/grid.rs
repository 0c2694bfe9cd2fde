use crate::error::{RichardsError, Result};

/// Finite-volume discretization of the soil column.
///
/// Node 0 is the bottom control volume and node `n - 1` the top one; `z` is
/// elevation above the bottom of the column. `space_delta` has `n + 1`
/// entries: `space_delta[0]` runs from the bottom face to node 0,
/// `space_delta[i]` from node `i - 1` to node `i`, and `space_delta[n]` from
/// the top node to the soil surface.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    z: Vec<f64>,              // Control-volume centres [m]
    control_volume: Vec<f64>, // Control-volume widths [m]
    space_delta: Vec<f64>,    // Dual-grid spacings [m]
    layer_id: Vec<usize>,     // Constitutive model of each node
    parameter_id: Vec<usize>, // Parameter set of each node
}

impl Grid {
    pub fn new(
        z: Vec<f64>,
        control_volume: Vec<f64>,
        space_delta: Vec<f64>,
        layer_id: Vec<usize>,
        parameter_id: Vec<usize>,
    ) -> Result<Self> {
        let n = z.len();
        if n < 2 {
            return Err(RichardsError::Geometry(format!(
                "at least 2 control volumes are required, got {n}"
            )));
        }
        if control_volume.len() != n
            || layer_id.len() != n
            || parameter_id.len() != n
            || space_delta.len() != n + 1
        {
            return Err(RichardsError::Geometry(format!(
                "inconsistent lengths: z {n}, control_volume {}, space_delta {} (expected {}), layer_id {}, parameter_id {}",
                control_volume.len(),
                space_delta.len(),
                n + 1,
                layer_id.len(),
                parameter_id.len()
            )));
        }
        if let Some(i) = control_volume.iter().position(|v| !(*v > 0.0 && v.is_finite())) {
            return Err(RichardsError::Geometry(format!(
                "control volume {i} has non-positive width {}",
                control_volume[i]
            )));
        }
        if let Some(i) = space_delta.iter().position(|d| !(*d > 0.0 && d.is_finite())) {
            return Err(RichardsError::Geometry(format!(
                "space delta {i} is non-positive: {}",
                space_delta[i]
            )));
        }
        if let Some(i) = (1..n).find(|&i| !(z[i] > z[i - 1])) {
            return Err(RichardsError::Geometry(format!(
                "node elevations must increase upward (z[{}] = {}, z[{i}] = {})",
                i - 1,
                z[i - 1],
                z[i]
            )));
        }
        Ok(Grid {
            z,
            control_volume,
            space_delta,
            layer_id,
            parameter_id,
        })
    }

    // Column of `depth` metres split into `n` equal control volumes, all in
    // layer 0 with parameter set 0
    pub fn uniform(depth: f64, n: usize) -> Result<Self> {
        if !(depth > 0.0) || n == 0 {
            return Err(RichardsError::Geometry(format!(
                "cannot build a uniform grid of depth {depth} with {n} nodes"
            )));
        }
        let dz = depth / n as f64;
        let z = (0..n).map(|i| (i as f64 + 0.5) * dz).collect();
        let mut space_delta = vec![dz; n + 1];
        space_delta[0] = 0.5 * dz;
        space_delta[n] = 0.5 * dz;
        Grid::new(z, vec![dz; n], space_delta, vec![0; n], vec![0; n])
    }

    // Map every node whose centre lies in `[z_min, z_max]` to a layer and parameter set
    pub fn assign_layer(&mut self, z_min: f64, z_max: f64, layer_id: usize, parameter_id: usize) {
        for i in 0..self.z.len() {
            if self.z[i] >= z_min && self.z[i] <= z_max {
                self.layer_id[i] = layer_id;
                self.parameter_id[i] = parameter_id;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    pub fn control_volume(&self) -> &[f64] {
        &self.control_volume
    }

    pub fn space_delta(&self) -> &[f64] {
        &self.space_delta
    }

    pub fn layer_id(&self, node: usize) -> usize {
        self.layer_id[node]
    }

    pub fn parameter_id(&self, node: usize) -> usize {
        self.parameter_id[node]
    }

    // Distance from `node` to the node (or face) below it
    pub fn space_delta_m(&self, node: usize) -> f64 {
        self.space_delta[node]
    }

    // Distance from `node` to the node (or surface) above it
    pub fn space_delta_p(&self, node: usize) -> f64 {
        self.space_delta[node + 1]
    }

    pub fn half_width(&self, node: usize) -> f64 {
        0.5 * self.control_volume[node]
    }

    // Elevation of the soil surface
    pub fn surface(&self) -> f64 {
        self.z[self.z.len() - 1] + self.space_delta[self.z.len()]
    }
}
