use crate::config::{ColourForceConfig, RepulsionKind};
use serde::{Deserialize, Serialize};

/// Simulation parameters derived from the configuration, used frequently during simulation steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // Time
    pub dt: f64,
    pub dt_sq: f64,
    pub cycles: u32, // Substeps per frame

    // Arena
    pub width: f64,
    pub height: f64,
    pub wall_thickness: f64,
    pub wall_stiffness: f64,
    pub closed_top: bool,

    // Thermal (already scaled by dt / sqrt(dt))
    pub resistance: f64,
    pub wall_resistance: f64,
    pub heat: f64,
    pub wall_heat: f64,
    pub gravity: f64, // Constant +y acceleration

    // Pairwise forces
    pub repulsion_kind: RepulsionKind,
    pub repulsion_coupling: f64,
    pub repulsion_exponent: f64,
    pub electrostatic_coupling: f64, // 0 disables
    pub pair_gravity: f64, // 0 disables
    pub colour_force: Option<ColourForceConfig>,
}
