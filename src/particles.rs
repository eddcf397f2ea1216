use particle_arena_common::{Rgb, Vec2};

/// A circular particle with implicit-velocity Verlet state.
#[derive(Debug, Clone)]
pub struct Particle {
    /// Unique for the lifetime of a simulation run; equals the store index.
    pub id: u32,
    pub position: Vec2,
    /// Position one substep ago. Velocity is (position - previous) / dt.
    pub previous: Vec2,
    /// Acceleration accumulated during the current substep.
    pub acceleration: Vec2,
    pub radius: f64,
    pub mass: f64,
    pub polarizability: f64,
    pub charge: f64,
    pub fill: Rgb,
    pub border: Rgb,
    pub alive: bool,
    /// Whether the wall springs acted on this particle in the current substep.
    pub on_wall: bool,
}

impl Particle {
    /// A white, neutral particle at rest. The id is assigned by `ParticleSet::spawn`.
    pub fn new(position: Vec2, radius: f64, mass: f64) -> Self {
        let fill = Rgb::new(255, 255, 255);
        Particle {
            id: 0,
            position,
            previous: position,
            acceleration: Vec2::zero(),
            radius,
            mass,
            polarizability: 1.0,
            charge: 0.0,
            fill,
            border: fill.halved(),
            alive: true,
            on_wall: false,
        }
    }

    /// Sets the implicit velocity by rewriting the previous position.
    pub fn set_velocity(&mut self, velocity: Vec2, dt: f64) {
        self.previous = self.position - velocity * dt;
    }

    pub fn velocity(&self, dt: f64) -> Vec2 {
        (self.position - self.previous) * (1.0 / dt)
    }

    /// Moves the particle without changing its implicit velocity.
    pub fn translate(&mut self, delta: Vec2) {
        self.position += delta;
        self.previous += delta;
    }
}

/// The authoritative particle store. Particles are indexed by id and never
/// removed; dead ones keep their last position so constraints can still
/// resolve them. `live` is the compacted working set for the next substep.
#[derive(Debug, Default)]
pub struct ParticleSet {
    particles: Vec<Particle>,
    live: Vec<usize>,
    lost: u32,
}

impl ParticleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ParticleSet {
            particles: Vec::with_capacity(capacity),
            live: Vec::with_capacity(capacity),
            lost: 0,
        }
    }

    /// Adds a particle, assigning it the next id. Returns that id.
    pub fn spawn(&mut self, mut particle: Particle) -> u32 {
        let id = self.particles.len() as u32;
        particle.id = id;
        particle.alive = true;
        self.live.push(self.particles.len());
        self.particles.push(particle);
        id
    }

    pub fn get(&self, id: u32) -> Option<&Particle> {
        self.particles.get(id as usize)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Particle> {
        self.particles.get_mut(id as usize)
    }

    pub fn is_alive(&self, id: u32) -> bool {
        self.get(id).map(|p| p.alive).unwrap_or(false)
    }

    /// Marks a particle dead. Returns true only on the alive -> dead transition,
    /// which is also the only time the loss counter moves.
    pub fn kill(&mut self, id: u32) -> bool {
        match self.particles.get_mut(id as usize) {
            Some(p) if p.alive => {
                p.alive = false;
                self.lost += 1;
                true
            }
            _ => false,
        }
    }

    /// Drops dead particles from the working set.
    pub fn compact(&mut self) {
        let particles = &self.particles;
        self.live.retain(|&idx| particles[idx].alive);
    }

    /// Store indices of the working set, in id order.
    pub fn live_indices(&self) -> &[usize] {
        &self.live
    }

    pub fn iter_live(&self) -> impl Iterator<Item = &Particle> + '_ {
        self.live.iter().map(move |&idx| &self.particles[idx])
    }

    /// Every particle ever spawned, dead ones included.
    pub fn all(&self) -> &[Particle] {
        &self.particles
    }

    pub fn all_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn lost(&self) -> u32 {
        self.lost
    }

    /// Sum of m * v over live particles.
    pub fn momentum(&self, dt: f64) -> Vec2 {
        self.iter_live()
            .fold(Vec2::zero(), |acc, p| acc + p.velocity(dt) * p.mass)
    }
}
