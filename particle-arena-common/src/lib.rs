pub mod colour;
pub mod config;
pub mod sim_params;
pub mod snapshot;
pub mod vecmath;

// Re-export key types for easier use by dependent crates
pub use colour::Rgb;
pub use config::{
    ArenaConfig, ColourForceConfig, ForceConfig, LatticeConfig, ParticleTemplate, PlacementConfig,
    RepulsionConfig, RepulsionKind, RunConfig, SimulationConfig, SpeciesConfig, ThermalConfig,
    TimingConfig,
};
pub use sim_params::SimParams;
pub use snapshot::{FrameSnapshot, FrameStatus, ParticleView, SegmentView};
pub use vecmath::{clamp, Vec2};
