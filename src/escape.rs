//! Escape-time iteration of `z ← z² + c`.

use crate::pixel::Complex;

pub const DEFAULT_MAX_ITERATIONS: u32 = 1000;

/// Once `|z|²` exceeds this the orbit is known to diverge.
pub const ESCAPE_RADIUS_SQUARED: f32 = 4.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationResult {
    /// In `[0, max_iterations]`. Equal to `max_iterations` when the orbit never escaped.
    pub iteration_count: u32,
    pub final_orbit: Complex,
}

impl IterationResult {
    pub fn escaped(&self, max_iterations: u32) -> bool {
        self.iteration_count < max_iterations
    }
}

/// Iterate from `z = 0` until `|z|² > 4` or `max_iterations` steps have run.
pub fn iterate(c: Complex, max_iterations: u32) -> IterationResult {
    let mut z = Complex::ZERO;
    let mut iteration_count = 0;

    while iteration_count < max_iterations && z.norm_squared() <= ESCAPE_RADIUS_SQUARED {
        z = z.square_add(c);
        iteration_count += 1;
    }

    IterationResult {
        iteration_count,
        final_orbit: z,
    }
}

pub fn iterate_default(c: Complex) -> IterationResult {
    iterate(c, DEFAULT_MAX_ITERATIONS)
}
