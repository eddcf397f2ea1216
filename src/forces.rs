//! Per-substep force accumulation.
//!
//! Pairwise interactions are expressed as [`PairForce`] terms producing a
//! radial scalar; [`ForceModel`] sums them over every unordered live pair,
//! then adds springs, walls, constant gravity and thermal noise.
//!
//! Sign convention: a positive radial force pulls the pair together.

use crate::arena::Arena;
use crate::constraints::ConstraintSet;
use crate::particles::{Particle, ParticleSet};
use log::trace;
use particle_arena_common::{ColourForceConfig, RepulsionKind, SimParams, Vec2};
use rand::Rng;

/// A central force between two particles.
pub trait PairForce {
    /// Radial force at separation `d` (> 0). Positive attracts.
    fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64;
}

/// Short-range repulsion scaled by both polarizabilities.
pub struct Repulsion {
    pub kind: RepulsionKind,
    pub coupling: f64,
    pub exponent: f64,
}

impl PairForce for Repulsion {
    fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64 {
        // Contact ratio: > 1 when the surfaces overlap.
        let rho = (a.radius + b.radius) / d;
        let core = rho.powf(self.exponent);
        let shape = match self.kind {
            RepulsionKind::LennardJones => core - 2.0 * rho.powf(0.5 * self.exponent),
            RepulsionKind::PowerLaw => core,
        };
        -self.coupling * a.polarizability * b.polarizability * shape
    }
}

/// Coulomb interaction; like charges repel. Only acts between two charged particles.
pub struct Electrostatic {
    pub coupling: f64,
}

impl PairForce for Electrostatic {
    fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64 {
        if a.charge == 0.0 || b.charge == 0.0 {
            return 0.0;
        }
        -a.charge * b.charge * self.coupling / (d * d)
    }
}

/// Newtonian attraction between particle pairs.
pub struct PairGravity {
    pub coupling: f64,
}

impl PairForce for PairGravity {
    fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64 {
        a.mass * b.mass * self.coupling / (d * d)
    }
}

/// Attraction that weakens with the RGB distance between the two fill colours,
/// so similarly coloured particles cluster.
pub struct ColourAffinity {
    pub coupling: f64,
    pub distance_exponent: f64,
    pub colour_offset: f64,
    pub colour_exponent: f64,
}

impl From<&ColourForceConfig> for ColourAffinity {
    fn from(c: &ColourForceConfig) -> Self {
        ColourAffinity {
            coupling: c.coupling,
            distance_exponent: c.distance_exponent,
            colour_offset: c.colour_offset,
            colour_exponent: c.colour_exponent,
        }
    }
}

impl PairForce for ColourAffinity {
    fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64 {
        let rho = (a.radius + b.radius) / d;
        let cdist = a.fill.distance(b.fill) + self.colour_offset;
        rho.powf(self.distance_exponent) * self.coupling / cdist.powf(self.colour_exponent)
    }
}

/// The full force law for one substep.
pub struct ForceModel {
    terms: Vec<Box<dyn PairForce + Send + Sync>>,
    gravity: f64,
    heat: f64,
    wall_heat: f64,
}

impl Default for ForceModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ForceModel {
    /// No pair terms, no gravity, no heating.
    pub fn new() -> Self {
        ForceModel { terms: Vec::new(), gravity: 0.0, heat: 0.0, wall_heat: 0.0 }
    }

    /// Add a pairwise term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: PairForce + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn with_gravity(mut self, gravity: f64) -> Self {
        self.gravity = gravity;
        self
    }

    /// Heating amplitudes (already scaled to the substep) away from and at the walls.
    pub fn with_heat(mut self, heat: f64, wall_heat: f64) -> Self {
        self.heat = heat;
        self.wall_heat = wall_heat;
        self
    }

    /// Builds the model from the derived parameters; disabled terms are left out.
    pub fn from_params(params: &SimParams) -> Self {
        let mut model = ForceModel::new()
            .with_gravity(params.gravity)
            .with_heat(params.heat, params.wall_heat);
        if params.repulsion_coupling != 0.0 {
            model = model.with(Repulsion {
                kind: params.repulsion_kind,
                coupling: params.repulsion_coupling,
                exponent: params.repulsion_exponent,
            });
        }
        if params.electrostatic_coupling != 0.0 {
            model = model.with(Electrostatic { coupling: params.electrostatic_coupling });
        }
        if let Some(colour) = &params.colour_force {
            model = model.with(ColourAffinity::from(colour));
        }
        if params.pair_gravity != 0.0 {
            model = model.with(PairGravity { coupling: params.pair_gravity });
        }
        model
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Sum of all pair terms for one pair.
    pub fn radial(&self, a: &Particle, b: &Particle, d: f64) -> f64 {
        self.terms.iter().map(|t| t.radial(a, b, d)).sum()
    }

    /// Recomputes `acceleration` and `on_wall` for every live particle.
    pub fn accumulate<R: Rng + ?Sized>(
        &self,
        particles: &mut ParticleSet,
        constraints: &mut ConstraintSet,
        arena: &Arena,
        rng: &mut R,
    ) {
        // Indexed by particle id; dead slots stay zero.
        let mut out = vec![Vec2::zero(); particles.len()];

        constraints.accumulate(particles, &mut out);
        self.accumulate_pairs(particles, &mut out);

        let live: Vec<usize> = particles.live_indices().to_vec();
        let all = particles.all_mut();
        for idx in live {
            let p = &mut all[idx];
            let contact = arena.boundary_force(p);
            let mut acc = out[idx] + contact.acceleration;
            acc.y += self.gravity;

            let heat = if contact.touching { self.wall_heat } else { self.heat };
            if heat > 0.0 {
                acc.x += (rng.random::<f64>() - 0.5) * 2.0 * heat;
                acc.y += (rng.random::<f64>() - 0.5) * 2.0 * heat;
            }

            p.acceleration = acc;
            p.on_wall = contact.touching;
        }
    }

    // O(n^2) over unordered live pairs.
    fn accumulate_pairs(&self, particles: &ParticleSet, out: &mut [Vec2]) {
        if self.terms.is_empty() {
            return;
        }
        let live = particles.live_indices();
        let all = particles.all();
        for (n, &i) in live.iter().enumerate() {
            let a = &all[i];
            for &j in &live[n + 1..] {
                let b = &all[j];
                let delta = b.position - a.position;
                let d = delta.length();
                // Placement relaxation keeps live particles apart.
                debug_assert!(d > 0.0, "particles {} and {} coincide", a.id, b.id);
                if d == 0.0 {
                    continue;
                }

                let f = self.radial(a, b, d);
                let fbd = f / d;
                out[i] += delta * (fbd / a.mass);
                out[j] -= delta * (fbd / b.mass);
            }
        }
        trace!("Accumulated pair forces over {} live particles", live.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;

    fn open_arena() -> Arena {
        Arena { width: 1000.0, height: 1000.0, wall_thickness: 10.0, wall_stiffness: 10.0, closed_top: true }
    }

    fn two(dx: f64) -> ParticleSet {
        let mut set = ParticleSet::new();
        set.spawn(Particle::new(Vec2::new(500.0, 500.0), 5.0, 1.0));
        set.spawn(Particle::new(Vec2::new(500.0 + dx, 500.0), 5.0, 2.0));
        set
    }

    fn lj() -> Repulsion {
        Repulsion { kind: RepulsionKind::LennardJones, coupling: 0.1, exponent: 12.0 }
    }

    #[test]
    fn lennard_jones_repels_inside_contact_and_attracts_outside() {
        let set = two(10.0);
        let (a, b) = (set.get(0).unwrap(), set.get(1).unwrap());
        assert!(lj().radial(a, b, 8.0) < 0.0);
        // Minimum of the well sits exactly at contact: rho = 1 gives -c*(1 - 2) = +c.
        assert!((lj().radial(a, b, 10.0) - 0.1).abs() < 1e-12);
        assert!(lj().radial(a, b, 12.0) > 0.0);
    }

    #[test]
    fn power_law_only_repels() {
        let set = two(10.0);
        let (a, b) = (set.get(0).unwrap(), set.get(1).unwrap());
        let rep = Repulsion { kind: RepulsionKind::PowerLaw, coupling: 0.1, exponent: 12.0 };
        for d in [5.0, 10.0, 50.0] {
            assert!(rep.radial(a, b, d) < 0.0);
        }
    }

    #[test]
    fn electrostatic_needs_two_charges() {
        let mut set = two(10.0);
        let es = Electrostatic { coupling: 500.0 };
        set.get_mut(0).unwrap().charge = 1.0;
        let (a, b) = (set.get(0).unwrap().clone(), set.get(1).unwrap().clone());
        assert_eq!(es.radial(&a, &b, 10.0), 0.0);
        set.get_mut(1).unwrap().charge = 1.0;
        let b = set.get(1).unwrap();
        assert!((es.radial(&a, b, 10.0) + 5.0).abs() < 1e-12);
    }

    #[test]
    fn colour_affinity_prefers_similar_colours() {
        let mut set = two(10.0);
        let affinity = ColourAffinity {
            coupling: 10.0,
            distance_exponent: 1.0,
            colour_offset: 1.0,
            colour_exponent: 2.0,
        };
        let a = set.get(0).unwrap().clone();
        let same = affinity.radial(&a, set.get(1).unwrap(), 10.0);
        set.get_mut(1).unwrap().fill = particle_arena_common::Rgb::new(0, 0, 0);
        let different = affinity.radial(&a, set.get(1).unwrap(), 10.0);
        assert!((same - 10.0).abs() < 1e-12);
        assert!(different > 0.0 && different < same);
    }

    #[test]
    fn pair_forces_are_equal_and_opposite() {
        let mut set = two(12.0);
        let model = ForceModel::new().with(lj()).with(PairGravity { coupling: 1.0 });
        let mut bonds = ConstraintSet::new();
        model.accumulate(&mut set, &mut bonds, &open_arena(), &mut rand::rng());
        let (a, b) = (set.get(0).unwrap(), set.get(1).unwrap());
        let net = a.acceleration * a.mass + b.acceleration * b.mass;
        assert!(net.length() < 1e-12, "net force {:?}", net);
        // Attractive at this range: a is pulled toward +x.
        assert!(a.acceleration.x > 0.0);
        assert_eq!(a.acceleration.y, 0.0);
    }

    #[test]
    fn gravity_and_walls_are_added_per_particle() {
        let mut set = ParticleSet::new();
        set.spawn(Particle::new(Vec2::new(12.0, 500.0), 5.0, 1.0));
        let model = ForceModel::new().with_gravity(0.5);
        model.accumulate(&mut set, &mut ConstraintSet::new(), &open_arena(), &mut rand::rng());
        let p = set.get(0).unwrap();
        assert!(p.on_wall);
        assert!((p.acceleration.x - 30.0).abs() < 1e-12);
        assert!((p.acceleration.y - 0.5).abs() < 1e-12);
    }

    #[test]
    fn heat_noise_is_bounded() {
        let mut set = ParticleSet::new();
        set.spawn(Particle::new(Vec2::new(500.0, 500.0), 5.0, 1.0));
        let model = ForceModel::new().with_heat(2.0, 0.0);
        let mut rng = rand::rng();
        let mut sum = Vec2::zero();
        for _ in 0..2000 {
            model.accumulate(&mut set, &mut ConstraintSet::new(), &open_arena(), &mut rng);
            let acc = set.get(0).unwrap().acceleration;
            assert!(acc.x.abs() <= 2.0 && acc.y.abs() <= 2.0);
            sum += acc;
        }
        // Mean of U(-2, 2) over 2000 draws: standard error ~0.026.
        assert!((sum * (1.0 / 2000.0)).length() < 0.2);
    }

    #[test]
    fn dead_particles_do_not_interact() {
        let mut set = two(12.0);
        set.kill(1);
        set.compact();
        let model = ForceModel::new().with(lj());
        let mut bonds = ConstraintSet::new();
        bonds.add(Constraint::spring(0, 1, 1.0));
        model.accumulate(&mut set, &mut bonds, &open_arena(), &mut rand::rng());
        assert_eq!(set.get(0).unwrap().acceleration, Vec2::zero());
    }

    #[test]
    fn from_params_skips_disabled_terms() {
        let mut config = particle_arena_common::SimulationConfig::default();
        config.forces.electrostatic_coupling = 0.0;
        config.forces.pair_gravity = 0.0;
        let model = ForceModel::from_params(&config.get_sim_params());
        assert_eq!(model.term_count(), 1);
    }
}
