//! Crossing geometry and the pi estimator
//!
//! Pure, deterministic functions with no side effects. Everything else in
//! the simulation is built on these two formulas.

/// Does a needle centered at vertical position `cy` with orientation `angle`
/// cross one of the horizontal ruled lines spaced `line_spacing` apart?
///
/// The needle's half-length projected onto the axis perpendicular to the
/// lines is `(l/2)*|sin(angle)|`; the needle crosses when that projection
/// reaches the nearest line below or above its center.
///
/// Assumes finite inputs and `line_spacing > 0`.
#[inline]
pub fn check_crossing(cy: f64, angle: f64, needle_length: f64, line_spacing: f64) -> bool {
    let half_projection = (needle_length / 2.0) * angle.sin().abs();
    let offset = cy.rem_euclid(line_spacing);
    offset <= half_projection || (line_spacing - offset) <= half_projection
}

/// Buffon's estimator: `pi ~ (2*l*total) / (d*crossings)`.
///
/// The caller must guarantee `crossings > 0`; the statistics layer treats
/// zero crossings as "no estimate yet" and never reaches this function.
#[inline]
pub fn estimate_pi(total: usize, crossings: usize, needle_length: f64, line_spacing: f64) -> f64 {
    (2.0 * needle_length * total as f64) / (line_spacing * crossings as f64)
}
