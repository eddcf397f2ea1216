//! Fixed-step Störmer–Verlet integration with implicit velocity.

use crate::arena::Arena;
use crate::particles::{Particle, ParticleSet};
use log::debug;
use particle_arena_common::SimParams;

/// Advances one particle by one substep using its accumulated acceleration.
/// `resistance` damps the implicit velocity by that fraction.
///
/// x' = (2 - res) x - (1 - res) x_old + a dt^2
pub fn verlet_step(p: &mut Particle, resistance: f64, dt_sq: f64) {
    let current = p.position;
    p.position.x = (2.0 - resistance) * current.x - (1.0 - resistance) * p.previous.x + p.acceleration.x * dt_sq;
    p.position.y = (2.0 - resistance) * current.y - (1.0 - resistance) * p.previous.y + p.acceleration.y * dt_sq;
    p.previous = current;
}

/// Integrates every live particle, kills those that left the arena and
/// compacts the working set. Returns the number of particles lost.
pub fn integrate_substep(particles: &mut ParticleSet, arena: &Arena, params: &SimParams) -> u32 {
    let live: Vec<usize> = particles.live_indices().to_vec();
    let mut escaped = Vec::new();

    let all = particles.all_mut();
    for idx in live {
        let p = &mut all[idx];
        let resistance = if p.on_wall { params.wall_resistance } else { params.resistance };
        verlet_step(p, resistance, params.dt_sq);
        if arena.is_out_of_bounds(p) {
            escaped.push(p.id);
        }
    }

    let mut lost = 0;
    for id in escaped {
        if particles.kill(id) {
            if let Some(p) = particles.get(id) {
                debug!("Particle {} left the arena at ({:.2}, {:.2})", id, p.position.x, p.position.y);
            }
            lost += 1;
        }
    }
    particles.compact();
    lost
}
