use std::fmt;

use crate::config::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Top,
    Bottom,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BcKind {
    Dirichlet,    // fixed pressure head at the face
    Neumann,      // fixed flux entering the column
    FreeDrainage, // unit hydraulic gradient, bottom only
}

// Inputs of a single boundary evaluation point
// `k_p`/`space_delta_p` refer to the face above the boundary node and
// `k_m`/`space_delta_m` to the face below it. `bc` is a pressure head for
// Dirichlet and an inflow rate (positive into the column) for Neumann
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BcInputs {
    pub bc: f64,
    pub k_p: f64,
    pub k_m: f64,
    pub space_delta_p: f64,
    pub space_delta_m: f64,
    pub time_delta: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundaryTerms {
    pub upper: f64,
    pub main: f64,
    pub lower: f64,
    pub rhs: f64,
}

type Term = fn(&BcInputs) -> f64;
type Flux = fn(&BcInputs, f64) -> f64;

#[derive(Debug)]
struct BcOps {
    upper: Term,
    main: Term,
    lower: Term,
    rhs: Term,
    flux: Flux, // Darcy velocity through the boundary face given the node head
}

fn zero(_: &BcInputs) -> f64 {
    0.0
}

fn upper_coupling(b: &BcInputs) -> f64 {
    b.k_p * b.time_delta / b.space_delta_p
}

fn lower_coupling(b: &BcInputs) -> f64 {
    b.k_m * b.time_delta / b.space_delta_m
}

fn neg_upper_coupling(b: &BcInputs) -> f64 {
    -upper_coupling(b)
}

fn neg_lower_coupling(b: &BcInputs) -> f64 {
    -lower_coupling(b)
}

fn both_couplings(b: &BcInputs) -> f64 {
    lower_coupling(b) + upper_coupling(b)
}

fn gravity(b: &BcInputs) -> f64 {
    b.time_delta * (b.k_p - b.k_m)
}

fn top_dirichlet_rhs(b: &BcInputs) -> f64 {
    gravity(b) + upper_coupling(b) * b.bc
}

fn top_neumann_rhs(b: &BcInputs) -> f64 {
    b.time_delta * b.bc - b.time_delta * b.k_m
}

fn bottom_dirichlet_rhs(b: &BcInputs) -> f64 {
    gravity(b) + lower_coupling(b) * b.bc
}

fn bottom_neumann_rhs(b: &BcInputs) -> f64 {
    b.time_delta * b.k_p + b.time_delta * b.bc
}

fn top_dirichlet_flux(b: &BcInputs, psi: f64) -> f64 {
    -b.k_p * ((b.bc - psi) / b.space_delta_p + 1.0)
}

fn top_neumann_flux(b: &BcInputs, _psi: f64) -> f64 {
    -b.bc
}

fn bottom_dirichlet_flux(b: &BcInputs, psi: f64) -> f64 {
    -b.k_m * ((psi - b.bc) / b.space_delta_m + 1.0)
}

fn bottom_neumann_flux(b: &BcInputs, _psi: f64) -> f64 {
    b.bc
}

fn free_drainage_flux(b: &BcInputs, _psi: f64) -> f64 {
    -b.k_m
}

static TOP_DIRICHLET: BcOps = BcOps {
    upper: zero,
    main: both_couplings,
    lower: neg_lower_coupling,
    rhs: top_dirichlet_rhs,
    flux: top_dirichlet_flux,
};

static TOP_NEUMANN: BcOps = BcOps {
    upper: zero,
    main: lower_coupling,
    lower: neg_lower_coupling,
    rhs: top_neumann_rhs,
    flux: top_neumann_flux,
};

static BOTTOM_DIRICHLET: BcOps = BcOps {
    upper: neg_upper_coupling,
    main: both_couplings,
    lower: zero,
    rhs: bottom_dirichlet_rhs,
    flux: bottom_dirichlet_flux,
};

static BOTTOM_NEUMANN: BcOps = BcOps {
    upper: neg_upper_coupling,
    main: upper_coupling,
    lower: zero,
    rhs: bottom_neumann_rhs,
    flux: bottom_neumann_flux,
};

// q = -K at the bottom face; bc is ignored
static BOTTOM_FREE_DRAINAGE: BcOps = BcOps {
    upper: neg_upper_coupling,
    main: upper_coupling,
    lower: zero,
    rhs: gravity,
    flux: free_drainage_flux,
};

// no entry for free drainage at the top
fn lookup(side: Side, kind: BcKind) -> Option<&'static BcOps> {
    match (side, kind) {
        (Side::Top, BcKind::Dirichlet) => Some(&TOP_DIRICHLET),
        (Side::Top, BcKind::Neumann) => Some(&TOP_NEUMANN),
        (Side::Top, BcKind::FreeDrainage) => None,
        (Side::Bottom, BcKind::Dirichlet) => Some(&BOTTOM_DIRICHLET),
        (Side::Bottom, BcKind::Neumann) => Some(&BOTTOM_NEUMANN),
        (Side::Bottom, BcKind::FreeDrainage) => Some(&BOTTOM_FREE_DRAINAGE),
    }
}

// A side/kind tag bound to its row of the dispatch table
#[derive(Clone, Copy)]
pub struct BoundaryCondition {
    side: Side,
    kind: BcKind,
    ops: &'static BcOps,
}

impl PartialEq for BoundaryCondition {
    fn eq(&self, other: &Self) -> bool {
        self.side == other.side && self.kind == other.kind
    }
}

impl Eq for BoundaryCondition {}

impl fmt::Debug for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundaryCondition")
            .field("side", &self.side)
            .field("kind", &self.kind)
            .finish()
    }
}

impl BoundaryCondition {
    pub fn new(side: Side, kind: BcKind) -> Result<Self, ConfigError> {
        match lookup(side, kind) {
            Some(ops) => Ok(BoundaryCondition { side, kind, ops }),
            None => Err(ConfigError::Invalid {
                key: "top_bc_type".to_string(),
                value: "free drainage".to_string(),
                reason: "free drainage applies to the bottom boundary only".to_string(),
            }),
        }
    }

    // Dirichlet head at the soil surface, used when ponding caps the top node
    pub fn top_dirichlet() -> Self {
        BoundaryCondition {
            side: Side::Top,
            kind: BcKind::Dirichlet,
            ops: &TOP_DIRICHLET,
        }
    }

    // Accepts "Top Neumann", "dirichlet", "Bottom Free Drainage" and similar
    pub fn parse(side: Side, name: &str) -> Result<Self, ConfigError> {
        let key = match side {
            Side::Top => "top_bc_type",
            Side::Bottom => "bottom_bc_type",
        };
        let invalid = |reason: &str| ConfigError::Invalid {
            key: key.to_string(),
            value: name.to_string(),
            reason: reason.to_string(),
        };

        let lowered = name.trim().to_lowercase();
        let mut words: Vec<&str> = lowered
            .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
            .filter(|w| !w.is_empty())
            .collect();
        match words.first().copied() {
            Some("top") if side == Side::Bottom => {
                return Err(invalid("names the top boundary"));
            }
            Some("bottom") if side == Side::Top => {
                return Err(invalid("names the bottom boundary"));
            }
            Some("top") | Some("bottom") => {
                words.remove(0);
            }
            _ => {}
        }

        let kind = match words.concat().as_str() {
            "dirichlet" => BcKind::Dirichlet,
            "neumann" | "flux" => BcKind::Neumann,
            "freedrainage" => BcKind::FreeDrainage,
            _ => return Err(invalid("unknown boundary condition type")),
        };
        BoundaryCondition::new(side, kind)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> BcKind {
        self.kind
    }

    pub fn upper_diagonal(&self, inputs: &BcInputs) -> f64 {
        (self.ops.upper)(inputs)
    }

    pub fn main_diagonal(&self, inputs: &BcInputs) -> f64 {
        (self.ops.main)(inputs)
    }

    pub fn lower_diagonal(&self, inputs: &BcInputs) -> f64 {
        (self.ops.lower)(inputs)
    }

    pub fn right_hand_side(&self, inputs: &BcInputs) -> f64 {
        (self.ops.rhs)(inputs)
    }

    pub fn terms(&self, inputs: &BcInputs) -> BoundaryTerms {
        let ops = self.ops;
        BoundaryTerms {
            upper: (ops.upper)(inputs),
            main: (ops.main)(inputs),
            lower: (ops.lower)(inputs),
            rhs: (ops.rhs)(inputs),
        }
    }

    // Darcy velocity through the boundary face, positive upward
    pub fn face_flux(&self, inputs: &BcInputs, psi_node: f64) -> f64 {
        (self.ops.flux)(inputs, psi_node)
    }
}

impl fmt::Display for BoundaryCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let side = match self.side {
            Side::Top => "Top",
            Side::Bottom => "Bottom",
        };
        let kind = match self.kind {
            BcKind::Dirichlet => "Dirichlet",
            BcKind::Neumann => "Neumann",
            BcKind::FreeDrainage => "Free Drainage",
        };
        write!(f, "{side} {kind}")
    }
}
