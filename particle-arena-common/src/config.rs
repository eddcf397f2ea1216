use crate::colour::Rgb;
use crate::sim_params::SimParams;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Configuration for integration timing
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct TimingConfig {
    /// Verlet timestep.
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Substeps per rendered frame.
    #[serde(default = "default_cycles")]
    pub cycles: u32,
}

// Configuration for the bounded region
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ArenaConfig {
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
    #[serde(default = "default_wall_thickness")]
    pub wall_thickness: f64,
    /// Spring constant of the walls.
    #[serde(default = "default_wall_stiffness")]
    pub wall_stiffness: f64,
    /// When false the top wall is absent and particles may evaporate upward.
    #[serde(default)]
    pub closed_top: bool,
}

// Damping, heating and constant gravity. Raw values; SimParams scales them by dt.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ThermalConfig {
    #[serde(default)]
    pub resistance: f64,
    #[serde(default)]
    pub heat: f64,
    #[serde(default = "default_wall_resistance")]
    pub wall_resistance: f64,
    #[serde(default)]
    pub wall_heat: f64,
    /// Constant downward (+y) acceleration.
    #[serde(default)]
    pub gravity: f64,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RepulsionKind {
    /// Repulsive core plus an attractive well: rho^n - 2 rho^(n/2).
    LennardJones,
    /// Repulsion only: rho^n.
    PowerLaw,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RepulsionConfig {
    #[serde(default = "default_repulsion_kind")]
    pub kind: RepulsionKind,
    #[serde(default = "default_repulsion_coupling")]
    pub coupling: f64,
    #[serde(default = "default_repulsion_exponent")]
    pub exponent: f64,
}

// Colour-affinity force; similar colours attract more strongly.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ColourForceConfig {
    #[serde(default = "default_colour_coupling")]
    pub coupling: f64,
    /// Exponent applied to the contact ratio (r_a + r_b) / d.
    #[serde(default = "default_one")]
    pub distance_exponent: f64,
    /// Added to the RGB distance so identical colours stay finite.
    #[serde(default = "default_one")]
    pub colour_offset: f64,
    #[serde(default = "default_colour_exponent")]
    pub colour_exponent: f64,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ForceConfig {
    #[serde(default)]
    pub repulsion: RepulsionConfig,
    /// Coulomb constant; 0 disables the electrostatic term.
    #[serde(default = "default_electrostatic_coupling")]
    pub electrostatic_coupling: f64,
    /// Particle-particle gravitational constant; 0 disables the term.
    #[serde(default = "default_pair_gravity")]
    pub pair_gravity: f64,
    #[serde(default)]
    pub colour: Option<ColourForceConfig>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PlacementConfig {
    /// Generate free particles in a band at the bottom of the arena.
    #[serde(default)]
    pub at_bottom: bool,
    /// Re-draw a free particle this many times while it overlaps an already placed one.
    #[serde(default)]
    pub resample_attempts: u32,
    #[serde(default = "default_max_relaxation_passes")]
    pub max_relaxation_passes: u32,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct RunConfig {
    /// Seed for placement and thermal noise; OS entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Frames the headless driver runs before exiting.
    #[serde(default = "default_frames")]
    pub frames: u32,
    /// Log a status line every this many frames.
    #[serde(default = "default_status_interval")]
    pub status_interval: u32,
    /// Tick period of the fixed-rate driver in realtime mode.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

/// Physical properties shared by every particle generated from it.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticleTemplate {
    pub mass: f64,
    pub radius: f64,
    #[serde(default = "default_one")]
    pub polarizability: f64,
    #[serde(default)]
    pub charge: f64,
    /// Initial velocity per axis is drawn from [-max_speed/2, max_speed/2].
    #[serde(default)]
    pub max_speed: f64,
    /// Fill colour; absent means a random colour per particle.
    #[serde(default)]
    pub colour: Option<Rgb>,
    /// Border colour; absent means the fill colour halved.
    #[serde(default)]
    pub border_colour: Option<Rgb>,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SpeciesConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub count: u32,
    #[serde(flatten)]
    pub template: ParticleTemplate,
}

/// A rectangular grid of particles bonded by springs.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LatticeConfig {
    pub rows: u32,
    pub columns: u32,
    pub spacing: f64,
    #[serde(default = "default_one")]
    pub stiffness: f64,
    /// Position of the top-left particle.
    pub origin: [f64; 2],
    #[serde(flatten)]
    pub template: ParticleTemplate,
}

// Main simulation configuration structure, loaded from config.toml.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SimulationConfig {
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
    #[serde(default)]
    pub thermal: ThermalConfig,
    #[serde(default)]
    pub forces: ForceConfig,
    #[serde(default)]
    pub placement: PlacementConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub species: Vec<SpeciesConfig>,
    #[serde(default)]
    pub lattice: Option<LatticeConfig>,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig { time_step: default_time_step(), cycles: default_cycles() }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        ArenaConfig {
            width: default_width(),
            height: default_height(),
            wall_thickness: default_wall_thickness(),
            wall_stiffness: default_wall_stiffness(),
            closed_top: false,
        }
    }
}

impl Default for ThermalConfig {
    fn default() -> Self {
        ThermalConfig {
            resistance: 0.0,
            heat: 0.0,
            wall_resistance: default_wall_resistance(),
            wall_heat: 0.0,
            gravity: 0.0,
        }
    }
}

impl Default for RepulsionConfig {
    fn default() -> Self {
        RepulsionConfig {
            kind: default_repulsion_kind(),
            coupling: default_repulsion_coupling(),
            exponent: default_repulsion_exponent(),
        }
    }
}

impl Default for ForceConfig {
    fn default() -> Self {
        ForceConfig {
            repulsion: RepulsionConfig::default(),
            electrostatic_coupling: default_electrostatic_coupling(),
            pair_gravity: default_pair_gravity(),
            colour: None,
        }
    }
}

impl Default for PlacementConfig {
    fn default() -> Self {
        PlacementConfig {
            at_bottom: false,
            resample_attempts: 0,
            max_relaxation_passes: default_max_relaxation_passes(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            seed: None,
            frames: default_frames(),
            status_interval: default_status_interval(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            timing: TimingConfig::default(),
            arena: ArenaConfig::default(),
            thermal: ThermalConfig::default(),
            forces: ForceConfig::default(),
            placement: PlacementConfig::default(),
            run: RunConfig::default(),
            species: Vec::new(),
            lattice: None,
        }
    }
}

impl ParticleTemplate {
    /// Plain template used by tests and programmatic setups.
    pub fn new(mass: f64, radius: f64) -> Self {
        ParticleTemplate {
            mass,
            radius,
            polarizability: 1.0,
            charge: 0.0,
            max_speed: 0.0,
            colour: Some(Rgb::new(255, 255, 255)),
            border_colour: None,
        }
    }

    fn validate(&self, what: &str) -> Result<()> {
        let fields = [
            ("mass", self.mass),
            ("radius", self.radius),
            ("polarizability", self.polarizability),
            ("charge", self.charge),
            ("max_speed", self.max_speed),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                anyhow::bail!("{}: {} must be a finite number.", what, field);
            }
        }
        if self.mass <= 0.0 {
            anyhow::bail!("{}: mass must be positive (got {}).", what, self.mass);
        }
        if self.radius < 0.0 {
            anyhow::bail!("{}: radius must not be negative (got {}).", what, self.radius);
        }
        if self.max_speed < 0.0 {
            anyhow::bail!("{}: max_speed must not be negative (got {}).", what, self.max_speed);
        }
        Ok(())
    }
}

impl SimulationConfig {
    /// Loads the simulation configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        let config_str = std::fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path_ref.display(), e))?;
        let config = Self::from_toml_str(&config_str)
            .map_err(|e| anyhow::anyhow!("Invalid config '{}': {}", path_ref.display(), e))?;
        Ok(config)
    }

    /// Parses and validates a configuration held in memory.
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: SimulationConfig = toml::from_str(config_str)
            .map_err(|e| anyhow::anyhow!("Failed to parse TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects parameters outside their physical domain. Called once at the
    /// configuration boundary; everything downstream assumes a valid config.
    pub fn validate(&self) -> Result<()> {
        let t = &self.timing;
        if !(t.time_step.is_finite() && t.time_step > 0.0) {
            anyhow::bail!("timing.time_step must be positive.");
        }
        if t.cycles == 0 {
            anyhow::bail!("timing.cycles must be greater than 0.");
        }

        let a = &self.arena;
        if !(a.width.is_finite() && a.width > 0.0 && a.height.is_finite() && a.height > 0.0) {
            anyhow::bail!("arena.width and arena.height must be positive.");
        }
        if !(a.wall_thickness.is_finite() && a.wall_thickness >= 0.0) {
            anyhow::bail!("arena.wall_thickness must not be negative.");
        }
        if !(a.wall_stiffness.is_finite() && a.wall_stiffness >= 0.0) {
            anyhow::bail!("arena.wall_stiffness must not be negative.");
        }

        let th = &self.thermal;
        for (field, value) in [
            ("resistance", th.resistance),
            ("heat", th.heat),
            ("wall_resistance", th.wall_resistance),
            ("wall_heat", th.wall_heat),
            ("gravity", th.gravity),
        ] {
            if !value.is_finite() {
                anyhow::bail!("thermal.{} must be a finite number.", field);
            }
        }

        let f = &self.forces;
        if !(f.repulsion.coupling.is_finite() && f.repulsion.exponent.is_finite()) {
            anyhow::bail!("forces.repulsion values must be finite.");
        }
        if !(f.electrostatic_coupling.is_finite() && f.pair_gravity.is_finite()) {
            anyhow::bail!("forces.electrostatic_coupling and forces.pair_gravity must be finite.");
        }
        if let Some(c) = &f.colour {
            if ![c.coupling, c.distance_exponent, c.colour_offset, c.colour_exponent]
                .iter()
                .all(|v| v.is_finite())
            {
                anyhow::bail!("forces.colour values must be finite.");
            }
            if c.colour_offset <= 0.0 {
                anyhow::bail!("forces.colour.colour_offset must be positive.");
            }
        }

        for (idx, species) in self.species.iter().enumerate() {
            let label = match &species.name {
                Some(name) => format!("species '{}'", name),
                None => format!("species[{}]", idx),
            };
            species.template.validate(&label)?;
            self.check_clearance(species.template.radius, &label)?;
        }

        if let Some(lattice) = &self.lattice {
            lattice.template.validate("lattice")?;
            if lattice.rows == 0 || lattice.columns == 0 {
                anyhow::bail!("lattice.rows and lattice.columns must be greater than 0.");
            }
            if !(lattice.spacing.is_finite() && lattice.spacing > 0.0) {
                anyhow::bail!("lattice.spacing must be positive.");
            }
            if !(lattice.stiffness.is_finite() && lattice.origin.iter().all(|v| v.is_finite())) {
                anyhow::bail!("lattice.stiffness and lattice.origin must be finite.");
            }
        }

        if self.total_particles() == 0 {
            anyhow::bail!("Configuration defines no particles.");
        }

        Ok(())
    }

    // A particle must fit between opposite walls for placement to be possible.
    fn check_clearance(&self, radius: f64, label: &str) -> Result<()> {
        let margin = 2.0 * (self.arena.wall_thickness + radius + 1.0);
        if self.arena.width <= margin || self.arena.height <= margin {
            anyhow::bail!(
                "{}: arena {}x{} is too small for radius {} with wall thickness {}.",
                label, self.arena.width, self.arena.height, radius, self.arena.wall_thickness
            );
        }
        Ok(())
    }

    /// Number of particles placed at reset, lattice included.
    pub fn total_particles(&self) -> usize {
        let free: usize = self.species.iter().map(|s| s.count as usize).sum();
        let lattice = self
            .lattice
            .as_ref()
            .map(|l| l.rows as usize * l.columns as usize)
            .unwrap_or(0);
        free + lattice
    }

    /// Converts the configuration into simulation parameters used at runtime.
    pub fn get_sim_params(&self) -> SimParams {
        let dt = self.timing.time_step;
        let sqrt_dt = dt.sqrt();

        SimParams {
            // Time
            dt,
            dt_sq: dt * dt,
            cycles: self.timing.cycles,
            // Arena
            width: self.arena.width,
            height: self.arena.height,
            wall_thickness: self.arena.wall_thickness,
            wall_stiffness: self.arena.wall_stiffness,
            closed_top: self.arena.closed_top,
            // Thermal, scaled to the substep
            resistance: self.thermal.resistance * dt,
            wall_resistance: self.thermal.wall_resistance * dt,
            heat: self.thermal.heat * sqrt_dt,
            wall_heat: self.thermal.wall_heat * sqrt_dt,
            gravity: self.thermal.gravity,
            // Pairwise forces
            repulsion_kind: self.forces.repulsion.kind,
            repulsion_coupling: self.forces.repulsion.coupling,
            repulsion_exponent: self.forces.repulsion.exponent,
            electrostatic_coupling: self.forces.electrostatic_coupling,
            pair_gravity: self.forces.pair_gravity,
            colour_force: self.forces.colour.clone(),
        }
    }
}

// Defaults mirror the classic verlet arena demo.
fn default_time_step() -> f64 { 0.1 }
fn default_cycles() -> u32 { 10 }
fn default_width() -> f64 { 640.0 }
fn default_height() -> f64 { 480.0 }
fn default_wall_thickness() -> f64 { 10.0 }
fn default_wall_stiffness() -> f64 { 10.0 }
fn default_wall_resistance() -> f64 { 0.5 }
fn default_repulsion_kind() -> RepulsionKind { RepulsionKind::LennardJones }
fn default_repulsion_coupling() -> f64 { 0.1 }
fn default_repulsion_exponent() -> f64 { 12.0 }
fn default_electrostatic_coupling() -> f64 { 500.0 }
fn default_pair_gravity() -> f64 { 1.0 }
fn default_colour_coupling() -> f64 { 10.0 }
fn default_colour_exponent() -> f64 { 2.0 }
fn default_one() -> f64 { 1.0 }
fn default_max_relaxation_passes() -> u32 { 100_000 }
fn default_frames() -> u32 { 500 }
fn default_status_interval() -> u32 { 10 }
fn default_frame_interval_ms() -> u64 { 20 }
