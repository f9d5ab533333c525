/*!
CPU rendering.

Runs the same per-pixel computation as `compute.wgsl#main`, split into rows across a
dedicated [`rayon`] thread pool. Used for the low resolution preview that is shown while
the GPU pass runs, and for headless PNG output.
*/

use std::path::Path;

use log::{debug, trace};
use rayon::prelude::{IndexedParallelIterator, ParallelIterator, ParallelSliceMut};

use crate::{
    colour::{self, Colour},
    error::Result,
    escape,
    pixel::Pixel,
    screen,
    view::ViewParameters,
};

pub const PREVIEW_SIZE: screen::Size = screen::Size::new(320, 180);
pub const PREVIEW_MAX_ITERATIONS: u32 = 300;

/// Row-major RGBA surface, the CPU counterpart of the compute shader's storage texture.
#[derive(Clone, Debug)]
pub struct Image {
    size: screen::Size,
    pixels: Vec<Colour>,
}

impl Image {
    /// An image where every pixel is [`Colour::TRANSPARENT`].
    pub fn new(size: screen::Size) -> Self {
        Self {
            size,
            pixels: vec![Colour::TRANSPARENT; size.area()],
        }
    }

    pub fn size(&self) -> screen::Size {
        self.size
    }

    pub fn pixels(&self) -> &[Colour] {
        &self.pixels
    }

    pub fn get(&self, pixel: Pixel) -> Option<Colour> {
        if self.size.contains(pixel) {
            Some(self.pixels[self.index(pixel)])
        } else {
            None
        }
    }

    fn index(&self, pixel: Pixel) -> usize {
        pixel.y as usize * self.size.width as usize + pixel.x as usize
    }

    /// Tightly packed `Rgba8Unorm` bytes, ready for `Queue::write_texture` or PNG encoding.
    pub fn to_rgba8(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(Colour::to_rgba8).collect()
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!(
            "saving {}x{} image to {}",
            self.size.width,
            self.size.height,
            path.display()
        );

        image::save_buffer_with_format(
            path,
            &self.to_rgba8(),
            self.size.width,
            self.size.height,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )?;
        Ok(())
    }
}

/// Colour for a single pixel, or `None` if it lies outside `params.screen_dimensions`.
pub fn shade_pixel(params: &ViewParameters, max_iterations: u32, pixel: Pixel) -> Option<Colour> {
    if !params.screen_dimensions.contains(pixel) {
        return None;
    }

    let c = params.map_pixel_to_point(pixel);
    let result = escape::iterate(c, max_iterations);
    Some(colour::colorize(&result, max_iterations))
}

/// Compute `pixel` and store it in `image`. Returns whether anything was written.
///
/// Pixels outside either the view's screen dimensions or the image are skipped.
pub fn render_pixel(
    params: &ViewParameters,
    max_iterations: u32,
    pixel: Pixel,
    image: &mut Image,
) -> bool {
    if !image.size.contains(pixel) {
        return false;
    }

    match shade_pixel(params, max_iterations, pixel) {
        Some(colour) => {
            let index = image.index(pixel);
            image.pixels[index] = colour;
            true
        }
        None => false,
    }
}

pub struct Renderer {
    thread_pool: rayon::ThreadPool,
}

impl Renderer {
    pub fn new(threads: usize) -> Result<Self> {
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("cpu-renderer-{}", index))
            .build()?;
        debug!("cpu renderer using {} threads", thread_pool.current_num_threads());
        Ok(Self { thread_pool })
    }

    pub fn current_num_threads(&self) -> usize {
        self.thread_pool.current_num_threads()
    }

    /// Render every pixel of `image` that is also inside `params.screen_dimensions`.
    ///
    /// Returns the number of pixels written.
    pub fn render(&self, params: &ViewParameters, max_iterations: u32, image: &mut Image) -> usize {
        trace!("begin cpu render {:?}", params);

        let width = image.size.width as usize;
        if width == 0 {
            return 0;
        }

        let written = self.thread_pool.install(|| {
            image
                .pixels
                .par_chunks_mut(width)
                .enumerate()
                .map(|(y, row)| {
                    let mut written = 0usize;
                    for (x, target) in row.iter_mut().enumerate() {
                        let pixel = Pixel::new(x as u32, y as u32);
                        if let Some(colour) = shade_pixel(params, max_iterations, pixel) {
                            *target = colour;
                            written += 1;
                        }
                    }
                    written
                })
                .sum::<usize>()
        });

        trace!("end cpu render, {} pixels written", written);
        written
    }

    /// Low resolution render of the same region of the plane as `params`.
    pub fn preview(&self, params: &ViewParameters) -> Image {
        let params = params.with_screen_dimensions(PREVIEW_SIZE);
        let mut image = Image::new(PREVIEW_SIZE);
        self.render(&params, PREVIEW_MAX_ITERATIONS, &mut image);
        image
    }
}
