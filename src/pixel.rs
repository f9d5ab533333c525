use bytemuck::{Pod, Zeroable};

/// A point in the complex plane.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub real: f32,
    pub imaginary: f32,
}

impl Complex {
    pub const ZERO: Self = Complex {
        real: 0.0,
        imaginary: 0.0,
    };

    pub const fn new(real: f32, imaginary: f32) -> Self {
        Self { real, imaginary }
    }

    pub fn norm_squared(&self) -> f32 {
        self.real * self.real + self.imaginary * self.imaginary
    }

    /// `self² + c`
    pub fn square_add(&self, c: Complex) -> Self {
        Complex {
            real: self.real * self.real - self.imaginary * self.imaginary + c.real,
            imaginary: 2.0 * self.real * self.imaginary + c.imaginary,
        }
    }

    /// Angle from the positive real axis, in `[-π, π]`.
    pub fn argument(&self) -> f32 {
        self.imaginary.atan2(self.real)
    }
}

/// Integer coordinate of a pixel on the output surface. `(0, 0)` is the top left.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
}

impl Pixel {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_add_matches_complex_multiplication() {
        // (1 + 2i)² = -3 + 4i
        let z = Complex::new(1.0, 2.0).square_add(Complex::new(0.5, -0.5));
        assert_eq!(z, Complex::new(-2.5, 3.5));
    }

    #[test]
    fn argument_of_origin_is_zero() {
        assert_eq!(Complex::ZERO.argument(), 0.0);
    }
}
