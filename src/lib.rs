//! Escape-time Mandelbrot rendering with HSV colouring, on the CPU with [`rayon`] and on the
//! GPU with a [`wgpu`] compute shader.

pub mod colour;
pub mod command_encoder;
pub mod compute;
pub mod config;
pub mod cpu;
pub mod error;
pub mod escape;
pub mod pixel;
pub mod renderer;
pub mod screen;
pub mod var;
pub mod view;

pub use colour::{colorize, hsv_to_rgb, Colour, Hsv};
pub use error::{Error, Result};
pub use escape::{iterate, IterationResult};
pub use pixel::{Complex, Pixel};
pub use view::ViewParameters;
