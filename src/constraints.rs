use crate::particles::ParticleSet;
use log::trace;
use particle_arena_common::{SegmentView, Vec2};

/// Rest length of a spring. Captured from the actual separation the first
/// time the constraint is evaluated, then fixed for the constraint's lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RestLength {
    Uncaptured,
    Captured(f64),
}

/// A Hookean bond between two particles, addressed by id.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub a: u32,
    pub b: u32,
    pub stiffness: f64,
    pub rest: RestLength,
}

impl Constraint {
    pub fn spring(a: u32, b: u32, stiffness: f64) -> Self {
        Constraint { a, b, stiffness, rest: RestLength::Uncaptured }
    }

    pub fn rest_length(&self) -> Option<f64> {
        match self.rest {
            RestLength::Captured(r) => Some(r),
            RestLength::Uncaptured => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Bonds for a `rows x columns` grid whose ids start at `first_id` and run
    /// row by row. Each particle is tied to its up, left, up-left and up-right
    /// neighbours.
    pub fn lattice(first_id: u32, rows: u32, columns: u32, stiffness: f64) -> Self {
        let mut set = ConstraintSet::new();
        let id = |row: u32, col: u32| first_id + row * columns + col;
        for row in 0..rows {
            for col in 0..columns {
                let me = id(row, col);
                if row > 0 {
                    set.add(Constraint::spring(me, id(row - 1, col), stiffness));
                }
                if col > 0 {
                    set.add(Constraint::spring(me, id(row, col - 1), stiffness));
                }
                if row > 0 && col > 0 {
                    set.add(Constraint::spring(me, id(row - 1, col - 1), stiffness));
                }
                if row > 0 && col + 1 < columns {
                    set.add(Constraint::spring(me, id(row - 1, col + 1), stiffness));
                }
            }
        }
        set
    }

    /// Changes every spring's stiffness. Captured rest lengths are untouched.
    pub fn set_stiffness(&mut self, stiffness: f64) {
        for c in &mut self.constraints {
            c.stiffness = stiffness;
        }
    }

    /// Adds spring accelerations into `out` (indexed by particle id).
    /// Constraints with a dead endpoint are skipped but kept.
    pub fn accumulate(&mut self, particles: &ParticleSet, out: &mut [Vec2]) {
        for c in &mut self.constraints {
            let (pa, pb) = match (particles.get(c.a), particles.get(c.b)) {
                (Some(pa), Some(pb)) if pa.alive && pb.alive => (pa, pb),
                _ => continue,
            };
            let delta = pb.position - pa.position;
            let dist = delta.length();
            let rest = match c.rest {
                RestLength::Captured(r) => r,
                RestLength::Uncaptured => {
                    trace!("Capturing rest length {:.4} for bond {}-{}", dist, c.a, c.b);
                    c.rest = RestLength::Captured(dist);
                    dist
                }
            };
            if dist <= 0.0 {
                continue; // direction undefined
            }
            // Positive when stretched: pulls the pair together.
            let f = c.stiffness * (dist - rest);
            let fbd = f / dist;
            out[c.a as usize] += delta * (fbd / pa.mass);
            out[c.b as usize] -= delta * (fbd / pb.mass);
        }
    }

    /// Segments for drawing, skipping bonds with a dead endpoint.
    pub fn segments(&self, particles: &ParticleSet) -> Vec<SegmentView> {
        self.constraints
            .iter()
            .filter_map(|c| match (particles.get(c.a), particles.get(c.b)) {
                (Some(pa), Some(pb)) if pa.alive && pb.alive => {
                    Some(SegmentView { a: pa.position, b: pb.position })
                }
                _ => None,
            })
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter()
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
}
