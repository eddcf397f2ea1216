//! A real-time 2-D particle integrator: circular particles in a walled arena
//! under pairwise forces and springs, advanced with Verlet integration in
//! several substeps per rendered frame.

pub mod arena;
pub mod constraints;
pub mod forces;
pub mod integrator;
pub mod particles;
pub mod placement;
pub mod simulation;

pub use arena::{Arena, WallContact};
pub use constraints::{Constraint, ConstraintSet, RestLength};
pub use forces::{ColourAffinity, Electrostatic, ForceModel, PairForce, PairGravity, Repulsion};
pub use particles::{Particle, ParticleSet};
pub use simulation::{Phase, Simulation};
