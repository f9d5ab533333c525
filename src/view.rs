//! Mapping from the output surface to the complex plane.

use bytemuck::{Pod, Zeroable};

use crate::{
    pixel::{Complex, Pixel},
    screen,
};

/// Which region of the complex plane is visible, and at what resolution.
///
/// `screen_dimensions` must be non-zero on both axes for [`ViewParameters::map_pixel_to_point`]
/// to produce finite values. A zero-sized screen contains no pixels, so renderers never map
/// anything through it.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct ViewParameters {
    pub center: [f32; 2],
    pub range: [f32; 2],
    pub screen_dimensions: screen::Size,
}

impl ViewParameters {
    pub const DEFAULT_CENTER: [f32; 2] = [-0.5, 0.0];
    pub const DEFAULT_RANGE: [f32; 2] = [3.5, 2.0];

    pub fn new(center: [f32; 2], range: [f32; 2], screen_dimensions: screen::Size) -> Self {
        Self {
            center,
            range,
            screen_dimensions,
        }
    }

    /// The same region of the plane, sampled at a different resolution.
    pub fn with_screen_dimensions(self, screen_dimensions: screen::Size) -> Self {
        Self {
            screen_dimensions,
            ..self
        }
    }

    /// Complex coordinate sampled by `pixel`.
    ///
    /// Pixel `(0, 0)` maps to `center - range / 2`; the far corner lands one pixel short of
    /// `center + range / 2`.
    pub fn map_pixel_to_point(&self, pixel: Pixel) -> Complex {
        let norm_x = pixel.x as f32 / self.screen_dimensions.width as f32 - 0.5;
        let norm_y = pixel.y as f32 / self.screen_dimensions.height as f32 - 0.5;

        Complex {
            real: self.center[0] + norm_x * self.range[0],
            imaginary: self.center[1] + norm_y * self.range[1],
        }
    }

    /// Move the center by a fraction of the visible range.
    pub fn pan(&mut self, fraction_x: f32, fraction_y: f32) {
        self.center[0] += fraction_x * self.range[0];
        self.center[1] += fraction_y * self.range[1];
    }

    /// Shrink the visible range by `factor` around the center. Factors below 1 zoom out.
    pub fn zoom(&mut self, factor: f32) {
        self.range[0] /= factor;
        self.range[1] /= factor;
    }

    pub fn reset(&mut self) {
        self.center = Self::DEFAULT_CENTER;
        self.range = Self::DEFAULT_RANGE;
    }
}

impl Default for ViewParameters {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_CENTER,
            Self::DEFAULT_RANGE,
            screen::Size::new(1, 1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Complex, expected: Complex) {
        assert!(
            (actual.real - expected.real).abs() < 1e-6
                && (actual.imaginary - expected.imaginary).abs() < 1e-6,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn origin_pixel_maps_to_lower_corner() {
        let params = ViewParameters::new([1.0, -1.0], [4.0, 2.0], screen::Size::new(8, 4));
        assert_close(
            params.map_pixel_to_point(Pixel::new(0, 0)),
            Complex::new(-1.0, -2.0),
        );
    }

    #[test]
    fn far_pixel_maps_one_step_short_of_upper_corner() {
        let params = ViewParameters::new([1.0, 1.0], [4.0, 4.0], screen::Size::new(4, 4));
        // center + range / 2 - range / size
        assert_close(
            params.map_pixel_to_point(Pixel::new(3, 3)),
            Complex::new(2.0, 2.0),
        );
    }

    #[test]
    fn mapping_is_monotonic_along_each_axis() {
        let params = ViewParameters::new([-0.5, 0.0], [3.5, 2.0], screen::Size::new(16, 9));
        for x in 1..16 {
            let left = params.map_pixel_to_point(Pixel::new(x - 1, 4));
            let right = params.map_pixel_to_point(Pixel::new(x, 4));
            assert!(right.real > left.real);
            assert_eq!(right.imaginary, left.imaginary);
        }
        for y in 1..9 {
            let top = params.map_pixel_to_point(Pixel::new(7, y - 1));
            let bottom = params.map_pixel_to_point(Pixel::new(7, y));
            assert!(bottom.imaginary > top.imaginary);
        }
    }

    #[test]
    fn center_pixel_of_even_screen_is_center() {
        let params = ViewParameters::new([0.0, 0.0], [4.0, 4.0], screen::Size::new(2, 2));
        assert_close(params.map_pixel_to_point(Pixel::new(1, 1)), Complex::ZERO);
        assert_close(
            params.map_pixel_to_point(Pixel::new(0, 0)),
            Complex::new(-2.0, -2.0),
        );
    }

    #[test]
    fn pan_and_zoom_are_relative_to_range() {
        let mut params = ViewParameters::default();
        params.pan(0.1, -0.1);
        assert!((params.center[0] - (-0.15)).abs() < 1e-6);
        assert!((params.center[1] - (-0.2)).abs() < 1e-6);

        params.zoom(2.0);
        assert_eq!(params.range, [1.75, 1.0]);

        params.reset();
        assert_eq!(params.center, ViewParameters::DEFAULT_CENTER);
        assert_eq!(params.range, ViewParameters::DEFAULT_RANGE);
    }
}
