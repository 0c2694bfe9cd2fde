use std::str::FromStr;

use crate::config::ConfigError;

// Rule giving the conductivity of the face between two control volumes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InterfaceConductivity {
    Arithmetic,
    Harmonic,
    Geometric,
    Max,
    Min,
}

impl InterfaceConductivity {
    // Face conductivity from the node below (`k_m`, half-width `dz_m`) and
    // the node above (`k_p`, half-width `dz_p`)
    pub fn compute(&self, k_m: f64, k_p: f64, dz_m: f64, dz_p: f64) -> f64 {
        match self {
            InterfaceConductivity::Arithmetic => 0.5 * (k_m + k_p),
            InterfaceConductivity::Harmonic => {
                // series resistances: (dz_m + dz_p) / (dz_m / k_m + dz_p / k_p)
                if k_m <= 0.0 || k_p <= 0.0 {
                    0.0
                } else {
                    (dz_m + dz_p) * k_m * k_p / (dz_m * k_p + dz_p * k_m)
                }
            }
            InterfaceConductivity::Geometric => (k_m * k_p).sqrt(),
            InterfaceConductivity::Max => k_m.max(k_p),
            InterfaceConductivity::Min => k_m.min(k_p),
        }
    }
}

impl FromStr for InterfaceConductivity {
    type Err = ConfigError;

    // Accepts `"Harmonic mean"`, `"harmonic"`, `"Max"` and similar
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        let name = lowered
            .strip_suffix("mean")
            .unwrap_or(&lowered)
            .trim_end_matches(|c: char| c.is_whitespace() || c == '_' || c == '-');
        match name {
            "arithmetic" => Ok(InterfaceConductivity::Arithmetic),
            "harmonic" => Ok(InterfaceConductivity::Harmonic),
            "geometric" => Ok(InterfaceConductivity::Geometric),
            "max" | "maximum" => Ok(InterfaceConductivity::Max),
            "min" | "minimum" => Ok(InterfaceConductivity::Min),
            _ => Err(ConfigError::Invalid {
                key: "interface_hydraulic_conductivity_model".to_string(),
                value: s.to_string(),
                reason: "unknown interface conductivity model".to_string(),
            }),
        }
    }
}
