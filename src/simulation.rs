use crate::arena::Arena;
use crate::constraints::ConstraintSet;
use crate::forces::ForceModel;
use crate::integrator::integrate_substep;
use crate::particles::ParticleSet;
use crate::placement::{place_all, Relaxation};
use anyhow::Result;
use log::{debug, info, trace};
use particle_arena_common::{FrameSnapshot, FrameStatus, ParticleView, SimParams, SimulationConfig};
use rand::prelude::*;
use std::time::Instant;

/// Lifecycle of the engine between resets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Particles placed, no frame advanced yet.
    Placed,
    /// At least one frame has run.
    Running,
}

/// Owns all simulation state and drives it one frame (= `cycles` substeps) at a time.
pub struct Simulation {
    /// The configuration the current run was built from.
    config: SimulationConfig,
    /// Runtime parameters derived from `config`.
    params: SimParams,
    arena: Arena,
    forces: ForceModel,
    particles: ParticleSet,
    constraints: ConstraintSet,
    /// Placement and thermal noise source.
    rng: StdRng,
    frame: u64,
    phase: Phase,
    relaxation: Relaxation,
}

impl Simulation {
    /// Validates the configuration and builds a freshly placed simulation.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let params = config.get_sim_params();
        let arena = Arena::from_params(&params);
        let forces = ForceModel::from_params(&params);
        let mut rng = match config.run.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let placement = place_all(&config, &arena, &mut rng);
        info!(
            "Simulation reset: {} particles, {} constraints, {} force terms, arena {}x{}",
            placement.particles.len(),
            placement.constraints.len(),
            forces.term_count(),
            params.width,
            params.height
        );
        if placement.unresolved_samples > 0 {
            debug!("{} particles kept an overlapping sample after resampling", placement.unresolved_samples);
        }

        Ok(Simulation {
            config,
            params,
            arena,
            forces,
            particles: placement.particles,
            constraints: placement.constraints,
            rng,
            frame: 0,
            phase: Phase::Placed,
            relaxation: placement.relaxation,
        })
    }

    /// Discards all state and places the particles again from the current configuration.
    pub fn reset(&mut self) -> Result<()> {
        let config = self.config.clone();
        self.reset_with(config)
    }

    /// Discards all state and rebuilds from `config`. On error the current
    /// state is left untouched.
    pub fn reset_with(&mut self, config: SimulationConfig) -> Result<()> {
        *self = Simulation::new(config)?;
        Ok(())
    }

    /// One Verlet cycle: accumulate forces, integrate, retire escaped particles.
    /// Returns how many particles were lost in this substep.
    pub fn substep(&mut self) -> u32 {
        self.forces.accumulate(&mut self.particles, &mut self.constraints, &self.arena, &mut self.rng);
        let lost = integrate_substep(&mut self.particles, &self.arena, &self.params);
        if lost > 0 {
            trace!("Substep lost {} particles ({} live)", lost, self.particles.live_count());
        }
        lost
    }

    /// Runs `cycles` substeps and reports status for the frame.
    pub fn advance_frame(&mut self) -> FrameStatus {
        let start = Instant::now();
        for _ in 0..self.params.cycles {
            self.substep();
        }
        self.frame += 1;
        self.phase = Phase::Running;
        FrameStatus {
            frame: self.frame,
            lost: self.particles.lost(),
            live: self.particles.live_count(),
            compute_time: start.elapsed(),
        }
    }

    /// The drawable state: live particles and bonds whose endpoints both live.
    pub fn snapshot(&self) -> FrameSnapshot {
        let particles = self
            .particles
            .iter_live()
            .map(|p| ParticleView {
                id: p.id,
                position: p.position,
                radius: p.radius,
                fill: p.fill,
                border: p.border,
            })
            .collect();
        FrameSnapshot {
            frame: self.frame,
            particles,
            segments: self.constraints.segments(&self.particles),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn lost(&self) -> u32 {
        self.particles.lost()
    }

    pub fn live_count(&self) -> usize {
        self.particles.live_count()
    }

    pub fn particles(&self) -> &ParticleSet {
        &self.particles
    }

    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    pub fn constraints_mut(&mut self) -> &mut ConstraintSet {
        &mut self.constraints
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn relaxation(&self) -> Relaxation {
        self.relaxation
    }

    /// Provides access to the simulation parameters.
    pub fn params(&self) -> &SimParams {
        &self.params
    }

    /// The configuration the current run was built from.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use particle_arena_common::{ParticleTemplate, SpeciesConfig};

    fn small_config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.run.seed = Some(42);
        config.timing.cycles = 3;
        let mut template = ParticleTemplate::new(1.0, 4.0);
        template.max_speed = 2.0;
        config.species.push(SpeciesConfig { name: Some("a".into()), count: 25, template });
        config
    }

    #[test]
    fn new_starts_placed_at_frame_zero() {
        let sim = Simulation::new(small_config()).unwrap();
        assert_eq!(sim.phase(), Phase::Placed);
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.lost(), 0);
        assert_eq!(sim.live_count(), 25);
        assert!(sim.relaxation().converged);
    }

    #[test]
    fn advance_frame_counts_frames() {
        let mut sim = Simulation::new(small_config()).unwrap();
        let status = sim.advance_frame();
        assert_eq!(status.frame, 1);
        assert_eq!(sim.phase(), Phase::Running);
        sim.advance_frame();
        assert_eq!(sim.snapshot().frame, 2);
    }

    #[test]
    fn reset_discards_progress() {
        let mut sim = Simulation::new(small_config()).unwrap();
        for _ in 0..5 {
            sim.advance_frame();
        }
        sim.reset().unwrap();
        assert_eq!(sim.frame(), 0);
        assert_eq!(sim.lost(), 0);
        assert_eq!(sim.phase(), Phase::Placed);
        assert_eq!(sim.live_count(), 25);
    }

    #[test]
    fn same_seed_gives_same_placement() {
        let a = Simulation::new(small_config()).unwrap();
        let b = Simulation::new(small_config()).unwrap();
        let pa: Vec<_> = a.snapshot().particles.iter().map(|p| p.position).collect();
        let pb: Vec<_> = b.snapshot().particles.iter().map(|p| p.position).collect();
        assert_eq!(pa, pb);
    }

    #[test]
    fn invalid_reset_keeps_running_state() {
        let mut sim = Simulation::new(small_config()).unwrap();
        sim.advance_frame();
        let mut bad = small_config();
        bad.species[0].template.mass = 0.0;
        assert!(sim.reset_with(bad).is_err());
        assert_eq!(sim.frame(), 1);
    }
}
