use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// Basic 2D vector type. Double precision: stiff short-range forces and
// implicit-velocity Verlet both lose accuracy quickly in f32.
#[derive(Copy, Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    #[inline(always)]
    pub fn new(x: f64, y: f64) -> Self { Self { x, y } }
    #[inline(always)]
    pub fn zero() -> Self { Self::new(0.0, 0.0) }
    #[inline(always)]
    pub fn length_squared(self) -> f64 { self.x * self.x + self.y * self.y }
    #[inline(always)]
    pub fn length(self) -> f64 { self.length_squared().sqrt() }
    #[inline(always)]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x; let dy = self.y - other.y; dx * dx + dy * dy
    }
    #[inline(always)]
    pub fn distance(self, other: Self) -> f64 { self.distance_squared(other).sqrt() }
    #[inline(always)]
    pub fn scale(self, scalar: f64) -> Self { Self::new(self.x * scalar, self.y * scalar) }

    /// Normalizes the vector, returning a zero vector if the length is zero or very small.
    pub fn normalize_or_zero(self) -> Vec2 {
        let len_sq = self.length_squared();
        if len_sq > 1e-24 {
            self.scale(1.0 / len_sq.sqrt())
        } else {
            Vec2::zero()
        }
    }

    /// Unit vector pointing along `theta` (radians).
    #[inline(always)]
    pub fn from_angle(theta: f64) -> Vec2 { Vec2::new(theta.cos(), theta.sin()) }
}

impl Add for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn add(self, other: Vec2) -> Vec2 { Vec2::new(self.x + other.x, self.y + other.y) }
}

impl Sub for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn sub(self, other: Vec2) -> Vec2 { Vec2::new(self.x - other.x, self.y - other.y) }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn mul(self, scalar: f64) -> Vec2 { self.scale(scalar) }
}

impl Neg for Vec2 {
    type Output = Vec2;
    #[inline(always)]
    fn neg(self) -> Vec2 { Vec2::new(-self.x, -self.y) }
}

impl AddAssign for Vec2 {
    #[inline(always)]
    fn add_assign(&mut self, other: Vec2) { self.x += other.x; self.y += other.y; }
}

impl SubAssign for Vec2 {
    #[inline(always)]
    fn sub_assign(&mut self, other: Vec2) { self.x -= other.x; self.y -= other.y; }
}

#[inline(always)]
pub fn clamp(val: f64, min: f64, max: f64) -> f64 { val.max(min).min(max) }
