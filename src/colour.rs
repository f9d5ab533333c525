//! Colouring algorithms.

use std::f32::consts::PI;

use bytemuck::{Pod, Zeroable};

use crate::escape::IterationResult;

/// RGBA colour with channels in `[0, 1]`.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub const TRANSPARENT: Self = Colour::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    /// Quantise the way an `Rgba8Unorm` texture store does.
    pub fn to_rgba8(&self) -> [u8; 4] {
        fn channel(value: f32) -> u8 {
            (value.clamp(0.0, 1.0) * 255.0).round() as u8
        }
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hsv {
    /// Degrees. Values outside `[0, 360)` wrap.
    pub hue: f32,
    pub saturation: f32,
    pub value: f32,
}

impl Hsv {
    pub fn fully_saturated(hue: f32) -> Self {
        Self {
            hue,
            saturation: 1.0,
            value: 1.0,
        }
    }
}

/// Sector-based HSV to RGB conversion ([Wikipedia](https://en.wikipedia.org/wiki/HSL_and_HSV#HSV_to_RGB)).
pub fn hsv_to_rgb(hsv: Hsv) -> Colour {
    let Hsv {
        hue,
        saturation: s,
        value: v,
    } = hsv;

    if s == 0.0 {
        return Colour::opaque(v, v, v);
    }

    let sector = hue / 60.0;
    let floor = sector.floor();
    let f = sector - floor;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match (floor as i32).rem_euclid(6) {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };
    Colour::opaque(r, g, b)
}

/// Hue in degrees for an iteration result.
///
/// Escaped points are coloured by how quickly they escaped. Points that hit the cap are
/// coloured by the angle of their final orbit value.
pub fn hue(result: &IterationResult, max_iterations: u32) -> f32 {
    if !result.escaped(max_iterations) {
        let normalised_angle = (result.final_orbit.argument() + PI) / (2.0 * PI);
        normalised_angle * 360.0
    } else {
        result.iteration_count as f32 / max_iterations as f32 * 360.0
    }
}

pub fn colorize(result: &IterationResult, max_iterations: u32) -> Colour {
    hsv_to_rgb(Hsv::fully_saturated(hue(result, max_iterations)))
}
