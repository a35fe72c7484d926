//! Needle type and randomized needle generation

use glam::DVec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::geometry::check_crossing;

/// A single simulated throw. Created once, never mutated; the crossing flag
/// is evaluated at creation against the geometry that was current then.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Needle {
    /// X coordinate of the needle's center (canvas units)
    pub cx: f64,
    /// Y coordinate of the needle's center (canvas units)
    pub cy: f64,
    /// Orientation in radians, [0, pi)
    pub angle: f64,
    /// Whether the needle crosses a ruled line
    pub crossing: bool,
}

impl Needle {
    /// Endpoints of the needle segment for drawing.
    pub fn endpoints(&self, needle_length: f64) -> (DVec2, DVec2) {
        let half = DVec2::new(self.angle.cos(), self.angle.sin()) * (needle_length / 2.0);
        let center = DVec2::new(self.cx, self.cy);
        (center - half, center + half)
    }
}

/// Seeded needle generator. A fixed seed reproduces the exact same throw
/// sequence, which the tests lean on heavily.
#[derive(Debug, Clone)]
pub struct NeedleGen {
    rng: Pcg32,
}

impl NeedleGen {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Uniformly random center within the canvas, uniformly random angle.
    ///
    /// Requires `canvas_width, canvas_height > 0`.
    pub fn generate_random(
        &mut self,
        canvas_width: f64,
        canvas_height: f64,
        needle_length: f64,
        line_spacing: f64,
    ) -> Needle {
        let cx = self.rng.random_range(0.0..canvas_width);
        let cy = self.rng.random_range(0.0..canvas_height);
        self.generate_at(cx, cy, needle_length, line_spacing)
    }

    /// Caller-supplied center (drop at click position), random angle only.
    pub fn generate_at(
        &mut self,
        cx: f64,
        cy: f64,
        needle_length: f64,
        line_spacing: f64,
    ) -> Needle {
        let angle = self.rng.random_range(0.0..std::f64::consts::PI);
        Needle {
            cx,
            cy,
            angle,
            crossing: check_crossing(cy, angle, needle_length, line_spacing),
        }
    }
}
