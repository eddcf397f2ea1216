use crate::arena::Arena;
use crate::constraints::ConstraintSet;
use crate::particles::{Particle, ParticleSet};
use log::{debug, info, warn};
use particle_arena_common::{ParticleTemplate, Rgb, SimulationConfig, Vec2};
use rand::prelude::*;

/// Pairs closer than this fraction of their radius sum count as overlapping.
/// A little overlap is tolerated.
pub const OVERLAP_FRACTION: f64 = 0.8;
/// Distance each particle of an overlapping pair is eased apart per pass.
const RELAX_STEP: f64 = 1.0;
/// Extra taken-area slack for bottom-biased placement when resampling is on.
const RESAMPLE_AREA_SLACK: f64 = 1.2;

/// Outcome of the overlap relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relaxation {
    pub passes: u32,
    pub converged: bool,
}

/// What `place_all` built.
#[derive(Debug)]
pub struct Placement {
    pub particles: ParticleSet,
    pub constraints: ConstraintSet,
    pub relaxation: Relaxation,
    /// Free particles that still overlapped after all resample attempts.
    pub unresolved_samples: u32,
}

/// Generates every particle the configuration asks for: the lattice first,
/// then each free species in order, then relaxes overlaps.
pub fn place_all<R: Rng + ?Sized>(config: &SimulationConfig, arena: &Arena, rng: &mut R) -> Placement {
    let dt = config.timing.time_step;
    let mut particles = ParticleSet::with_capacity(config.total_particles());
    let mut constraints = ConstraintSet::new();

    if let Some(lattice) = &config.lattice {
        let first_id = particles.len() as u32;
        for row in 0..lattice.rows {
            for col in 0..lattice.columns {
                let position = Vec2::new(
                    lattice.origin[0] + col as f64 * lattice.spacing,
                    lattice.origin[1] + row as f64 * lattice.spacing,
                );
                particles.spawn(make_particle(&lattice.template, position, dt, rng));
            }
        }
        constraints = ConstraintSet::lattice(first_id, lattice.rows, lattice.columns, lattice.stiffness);
        debug!(
            "Placed {}x{} lattice with {} bonds",
            lattice.rows, lattice.columns, constraints.len()
        );
    }

    let band = if config.placement.at_bottom { bottom_fraction(config) } else { 1.0 };
    let attempts = config.placement.resample_attempts;
    let mut unresolved_samples = 0;

    for species in &config.species {
        let template = &species.template;
        for _ in 0..species.count {
            let mut position = sample_position(arena, template.radius, band, rng);
            if attempts > 0 {
                let mut tries = 0;
                while overlaps_any(&particles, position, template.radius) {
                    if tries == attempts {
                        unresolved_samples += 1;
                        break;
                    }
                    position = sample_position(arena, template.radius, band, rng);
                    tries += 1;
                }
            }
            particles.spawn(make_particle(template, position, dt, rng));
        }
    }

    let relaxation = resolve_overlaps(particles.all_mut(), arena, config.placement.max_relaxation_passes, rng);
    if !relaxation.converged {
        warn!(
            "Overlap relaxation stopped after {} passes with overlaps remaining",
            relaxation.passes
        );
    }
    info!(
        "Placed {} particles ({} bonds) after {} relaxation passes",
        particles.len(),
        constraints.len(),
        relaxation.passes
    );

    Placement { particles, constraints, relaxation, unresolved_samples }
}

/// Repeatedly eases apart every pair closer than `OVERLAP_FRACTION` of their
/// radius sum, re-clamping into the arena, until a full pass finds nothing
/// or `max_passes` is reached.
pub fn resolve_overlaps<R: Rng + ?Sized>(
    particles: &mut [Particle],
    arena: &Arena,
    max_passes: u32,
    rng: &mut R,
) -> Relaxation {
    let n = particles.len();
    let mut passes = 0;
    loop {
        if passes >= max_passes {
            return Relaxation { passes, converged: false };
        }
        passes += 1;
        let mut conflicts = 0u32;
        for j in 1..n {
            let (head, tail) = particles.split_at_mut(j);
            let b = &mut tail[0];
            for a in head.iter_mut() {
                let delta = b.position - a.position;
                if delta.length() >= (a.radius + b.radius) * OVERLAP_FRACTION {
                    continue;
                }
                let mut dir = delta.normalize_or_zero();
                if dir == Vec2::zero() {
                    // Coincident: any direction will do.
                    dir = Vec2::from_angle(rng.random_range(0.0..std::f64::consts::TAU));
                }
                a.translate(-dir * RELAX_STEP);
                b.translate(dir * RELAX_STEP);
                confine(a, arena);
                confine(b, arena);
                conflicts += 1;
            }
        }
        if conflicts == 0 {
            return Relaxation { passes, converged: true };
        }
        if passes % 1000 == 0 {
            debug!("Relaxation pass {}: {} overlapping pairs", passes, conflicts);
        }
    }
}

/// Smallest pairwise distance relative to `OVERLAP_FRACTION` of the radius
/// sum; >= 1.0 means no pair overlaps. `None` for fewer than two particles.
pub fn worst_overlap_ratio(particles: &[Particle]) -> Option<f64> {
    let mut worst: Option<f64> = None;
    for (i, a) in particles.iter().enumerate() {
        for b in &particles[i + 1..] {
            let limit = (a.radius + b.radius) * OVERLAP_FRACTION;
            if limit <= 0.0 {
                continue;
            }
            let ratio = a.position.distance(b.position) / limit;
            worst = Some(worst.map_or(ratio, |w| w.min(ratio)));
        }
    }
    worst
}

fn confine(p: &mut Particle, arena: &Arena) {
    let clamped = arena.clamp_inside(p.position, p.radius);
    p.translate(clamped - p.position);
}

fn overlaps_any(particles: &ParticleSet, position: Vec2, radius: f64) -> bool {
    particles
        .all()
        .iter()
        .any(|p| p.position.distance(position) < (p.radius + radius) * OVERLAP_FRACTION)
}

/// Uniform position inside the wall clearance; with `band < 1` only the
/// bottom `band` fraction of the height is used.
fn sample_position<R: Rng + ?Sized>(arena: &Arena, radius: f64, band: f64, rng: &mut R) -> Vec2 {
    let inset = arena.wall_thickness + radius;
    let usable_w = (arena.width - 2.0 * inset).max(0.0);
    let usable_h = (arena.height - 2.0 * inset).max(0.0);
    let x = rng.random::<f64>() * usable_w + inset;
    let y = rng.random::<f64>() * usable_h * band + inset + usable_h * (1.0 - band);
    Vec2::new(x, y)
}

/// Fraction of the arena height the free particles would fill if packed at
/// the bottom, clamped to 1.
fn bottom_fraction(config: &SimulationConfig) -> f64 {
    let templates = config
        .species
        .iter()
        .map(|s| (&s.template, s.count as f64))
        .chain(
            config
                .lattice
                .iter()
                .map(|l| (&l.template, (l.rows * l.columns) as f64)),
        );
    let mut max_radius: f64 = 0.0;
    let mut taken = 0.0;
    for (template, count) in templates {
        max_radius = max_radius.max(template.radius);
        taken += std::f64::consts::PI * template.radius * template.radius * count;
    }
    if config.placement.resample_attempts > 0 {
        taken *= RESAMPLE_AREA_SLACK;
    }
    let pad = max_radius + 2.0 * config.arena.wall_thickness;
    let area = (config.arena.width - pad) * (config.arena.height - pad);
    if area <= 0.0 {
        return 1.0;
    }
    (taken / area).clamp(0.0, 1.0)
}

fn make_particle<R: Rng + ?Sized>(template: &ParticleTemplate, position: Vec2, dt: f64, rng: &mut R) -> Particle {
    let fill = template.colour.unwrap_or_else(|| {
        Rgb::new(rng.random_range(0..255), rng.random_range(0..255), rng.random_range(0..255))
    });
    let velocity = Vec2::new(
        (rng.random::<f64>() - 0.5) * template.max_speed,
        (rng.random::<f64>() - 0.5) * template.max_speed,
    );
    let mut p = Particle::new(position, template.radius, template.mass);
    p.polarizability = template.polarizability;
    p.charge = template.charge;
    p.fill = fill;
    p.border = template.border_colour.unwrap_or_else(|| fill.halved());
    p.set_velocity(velocity, dt);
    p
}
