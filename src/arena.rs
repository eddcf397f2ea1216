use crate::particles::Particle;
use particle_arena_common::{clamp, SimParams, Vec2};

/// Margin kept between a placed particle and the wall clearance line.
const PLACEMENT_MARGIN: f64 = 1.0;

/// Result of testing a particle against the walls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallContact {
    /// Acceleration from the wall springs.
    pub acceleration: Vec2,
    pub touching: bool,
}

/// The rectangular region. The top wall is at y = 0 and may be open.
#[derive(Debug, Clone)]
pub struct Arena {
    pub width: f64,
    pub height: f64,
    pub wall_thickness: f64,
    pub wall_stiffness: f64,
    pub closed_top: bool,
}

impl Arena {
    pub fn from_params(params: &SimParams) -> Self {
        Arena {
            width: params.width,
            height: params.height,
            wall_thickness: params.wall_thickness,
            wall_stiffness: params.wall_stiffness,
            closed_top: params.closed_top,
        }
    }

    /// Linear spring push-back from every wall the particle's surface crosses.
    /// The walls only resist; they never clamp position.
    pub fn boundary_force(&self, p: &Particle) -> WallContact {
        let k = self.wall_stiffness / p.mass;
        let low = self.wall_thickness + p.radius;
        let high_x = self.width - self.wall_thickness - p.radius;
        let high_y = self.height - self.wall_thickness - p.radius;
        let mut acceleration = Vec2::zero();
        let mut touching = false;

        if p.position.x < low {
            acceleration.x += k * (low - p.position.x);
            touching = true;
        }
        if p.position.x > high_x {
            acceleration.x += k * (high_x - p.position.x);
            touching = true;
        }
        if self.closed_top && p.position.y < low {
            acceleration.y += k * (low - p.position.y);
            touching = true;
        }
        if p.position.y > high_y {
            acceleration.y += k * (high_y - p.position.y);
            touching = true;
        }

        WallContact { acceleration, touching }
    }

    /// The sole death condition: evaporated through an open top, or outside
    /// the arena rectangle on either axis.
    pub fn is_out_of_bounds(&self, p: &Particle) -> bool {
        if !self.closed_top && p.position.y <= self.wall_thickness + p.radius {
            return true;
        }
        p.position.x < 0.0
            || p.position.x > self.width
            || p.position.y < 0.0
            || p.position.y > self.height
    }

    /// Clamps a position into the wall clearance band for a particle of `radius`.
    pub fn clamp_inside(&self, position: Vec2, radius: f64) -> Vec2 {
        let (x_min, x_max) = self.clearance(self.width, radius);
        let (y_min, y_max) = self.clearance(self.height, radius);
        Vec2::new(clamp(position.x, x_min, x_max), clamp(position.y, y_min, y_max))
    }

    fn clearance(&self, extent: f64, radius: f64) -> (f64, f64) {
        let min = self.wall_thickness + radius + PLACEMENT_MARGIN;
        let max = extent - self.wall_thickness - radius - PLACEMENT_MARGIN;
        (min, max.max(min))
    }
}
