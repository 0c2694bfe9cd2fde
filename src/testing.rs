// Constitutive models used by the unit tests

use std::cell::Cell;

use crate::soil_hydra::{ConstitutiveModel, SoilLayerParameters};

// van Genuchten–Mualem curves; swrc = [n, alpha, ..], alpha in 1/m
pub struct VanGenuchtenModel;

impl VanGenuchtenModel {
    fn m(params: &SoilLayerParameters) -> f64 {
        1.0 - 1.0 / params.swrc[0]
    }

    fn effective_saturation(psi: f64, params: &SoilLayerParameters) -> f64 {
        let n = params.swrc[0];
        let ah = params.swrc[1] * psi.abs();
        (1.0 + ah.powf(n)).powf(-Self::m(params))
    }
}

impl ConstitutiveModel for VanGenuchtenModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        if psi >= 0.0 {
            params.theta_s + self.specific_storage(params) * psi
        } else {
            params.theta_r
                + (params.theta_s - params.theta_r) * Self::effective_saturation(psi, params)
        }
    }

    fn moisture_capacity(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        if psi >= 0.0 {
            self.specific_storage(params)
        } else {
            let n = params.swrc[0];
            let alpha = params.swrc[1];
            let m = Self::m(params);
            let ah = alpha * psi.abs();
            let denom = (1.0 + ah.powf(n)).powf(m + 1.0);
            alpha * (params.theta_s - params.theta_r) * m * n * ah.powf(n - 1.0) / denom
        }
    }

    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, _temperature: f64) -> f64 {
        if psi >= 0.0 {
            params.ks
        } else {
            let m = Self::m(params);
            let se = Self::effective_saturation(psi, params);
            params.ks * se.sqrt() * (1.0 - (1.0 - se.powf(1.0 / m)).powf(m)).powi(2)
        }
    }

    fn inflection_point(&self, params: &SoilLayerParameters) -> f64 {
        let n = params.swrc[0];
        -Self::m(params).powf(1.0 / n) / params.swrc[1]
    }
}

// Gardner exponential curves; swrc = [alpha, ..], alpha in 1/m
pub struct GardnerModel;

impl ConstitutiveModel for GardnerModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        if psi > 0.0 {
            params.theta_s + self.specific_storage(params) * psi
        } else {
            params.theta_r + (params.theta_s - params.theta_r) * (params.swrc[0] * psi).exp()
        }
    }

    // left limit at psi = 0 so the peak sits on the inflection point
    fn moisture_capacity(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        if psi > 0.0 {
            self.specific_storage(params)
        } else {
            params.swrc[0] * (params.theta_s - params.theta_r) * (params.swrc[0] * psi).exp()
        }
    }

    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, _temperature: f64) -> f64 {
        if psi > 0.0 {
            params.ks
        } else {
            params.ks * (params.swrc[0] * psi).exp()
        }
    }

    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        0.0
    }
}

// Constant conductivity and capacity: theta = theta_s + swrc[0] * psi
pub struct LinearModel;

impl ConstitutiveModel for LinearModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        params.theta_s + params.swrc[0] * psi
    }

    fn moisture_capacity(&self, _psi: f64, params: &SoilLayerParameters) -> f64 {
        params.swrc[0]
    }

    fn hydraulic_conductivity(&self, _psi: f64, params: &SoilLayerParameters, _temperature: f64) -> f64 {
        params.ks
    }

    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        0.0
    }
}

// Fully dry soil: flat retention curve, no conductivity
pub struct DryModel;

impl ConstitutiveModel for DryModel {
    fn water_content(&self, _psi: f64, params: &SoilLayerParameters) -> f64 {
        params.theta_r
    }

    fn moisture_capacity(&self, _psi: f64, _params: &SoilLayerParameters) -> f64 {
        0.0
    }

    fn hydraulic_conductivity(&self, _psi: f64, _params: &SoilLayerParameters, _temperature: f64) -> f64 {
        0.0
    }

    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        0.0
    }
}

// Gardner curves whose conductivity is undefined below swrc[1]
pub struct BrokenModel;

impl ConstitutiveModel for BrokenModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        GardnerModel.water_content(psi, params)
    }

    fn moisture_capacity(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        GardnerModel.moisture_capacity(psi, params)
    }

    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, temperature: f64) -> f64 {
        if psi < params.swrc[1] {
            f64::NAN
        } else {
            GardnerModel.hydraulic_conductivity(psi, params, temperature)
        }
    }

    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        0.0
    }
}

// Linear retention reporting a capacity `swrc[1]` times too large, so Newton crawls
pub struct InflatedCapacityModel;

impl ConstitutiveModel for InflatedCapacityModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        LinearModel.water_content(psi, params)
    }

    fn moisture_capacity(&self, _psi: f64, params: &SoilLayerParameters) -> f64 {
        params.swrc[0] * params.swrc[1]
    }

    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, temperature: f64) -> f64 {
        LinearModel.hydraulic_conductivity(psi, params, temperature)
    }

    // below every head the tests use
    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        -1.0e3
    }
}

// Linear curves whose conductivity is NaN for calls numbered `fail_from..fail_until`
pub struct IntermittentModel {
    calls: Cell<usize>,
    fail_from: usize,
    fail_until: usize,
}

impl IntermittentModel {
    pub fn failing_first(count: usize) -> Self {
        IntermittentModel {
            calls: Cell::new(0),
            fail_from: 0,
            fail_until: count,
        }
    }

    pub fn failing_after(count: usize) -> Self {
        IntermittentModel {
            calls: Cell::new(0),
            fail_from: count,
            fail_until: usize::MAX,
        }
    }
}

impl ConstitutiveModel for IntermittentModel {
    fn water_content(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        LinearModel.water_content(psi, params)
    }

    fn moisture_capacity(&self, psi: f64, params: &SoilLayerParameters) -> f64 {
        LinearModel.moisture_capacity(psi, params)
    }

    fn hydraulic_conductivity(&self, psi: f64, params: &SoilLayerParameters, temperature: f64) -> f64 {
        let call = self.calls.get();
        self.calls.set(call + 1);
        if (self.fail_from..self.fail_until).contains(&call) {
            f64::NAN
        } else {
            LinearModel.hydraulic_conductivity(psi, params, temperature)
        }
    }

    fn inflection_point(&self, _params: &SoilLayerParameters) -> f64 {
        0.0
    }
}
