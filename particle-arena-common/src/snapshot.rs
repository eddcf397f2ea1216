use crate::colour::Rgb;
use crate::vecmath::Vec2;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the renderer needs to draw one particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticleView {
    pub id: u32,
    pub position: Vec2,
    pub radius: f64,
    pub fill: Rgb,
    pub border: Rgb,
}

/// A constraint resolved to its two endpoint positions, drawn as a line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SegmentView {
    pub a: Vec2,
    pub b: Vec2,
}

/// The drawable state of the simulation after a frame.
/// Only live particles are listed; segments with a dead endpoint are omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub particles: Vec<ParticleView>,
    pub segments: Vec<SegmentView>,
}

/// Status reported to the scheduler after each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStatus {
    /// Frames completed since the last reset.
    pub frame: u64,
    /// Particles lost since the last reset.
    pub lost: u32,
    pub live: usize,
    /// Wall-clock time spent computing this frame.
    pub compute_time: Duration,
}
