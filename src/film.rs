//! Accumulation of weighted radiance samples into RGB pixels.
//!
//! Spectral radiance is first projected into the sensor's space by a `PixelSensor`. Pixels store
//! running sums in that space, and the output color space is only applied when a pixel is read.

use anyhow::ensure;
use rayon::prelude::*;
use tracing::warn;

use crate::spectrum::{spectrum_to_xyz, Rgb, RgbColorSpace, SampledSpectrum, SampledWavelengths};
use crate::{Float, Point2i};

/// Running weighted sum of sensor RGB values.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pixel {
    pub rgb_sum: [f64; 3],
    pub weight_sum: f64,
}

impl Pixel {
    pub fn add_rgb(&mut self, rgb: Rgb, weight: Float) {
        for c in 0..3 {
            self.rgb_sum[c] += (weight * rgb[c]) as f64;
        }
        self.weight_sum += weight as f64;
    }

    /// The weighted average, or the (zero) sum when no weight has been accumulated.
    pub fn resolve(&self) -> Rgb {
        let [r, g, b] = self.rgb_sum;
        if self.weight_sum == 0.0 {
            return Rgb::new(r as Float, g as Float, b as Float);
        }
        let inv = 1.0 / self.weight_sum;
        Rgb::new((r * inv) as Float, (g * inv) as Float, (b * inv) as Float)
    }
}

pub trait PixelSensor: Send + Sync {
    /// Projects radiance carried at `lambda` into the sensor's RGB space.
    fn to_sensor_rgb(&self, l: &SampledSpectrum, lambda: &SampledWavelengths) -> Rgb;
}

/// A sensor whose responses are the CIE XYZ matching functions, normalized so that a
/// unit-radiance constant spectrum has Y = 1.
#[derive(Clone, Copy, Debug)]
pub struct XyzSensor {
    imaging_ratio: Float,
}

impl XyzSensor {
    pub fn new(imaging_ratio: Float) -> Self {
        Self { imaging_ratio }
    }
}

impl Default for XyzSensor {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl PixelSensor for XyzSensor {
    fn to_sensor_rgb(&self, l: &SampledSpectrum, lambda: &SampledWavelengths) -> Rgb {
        let [x, y, z] = spectrum_to_xyz(l, lambda);
        Rgb::new(x, y, z) * self.imaging_ratio
    }
}

/// One pixel of a film handed out for exclusive writing during a render pass.
pub struct FilmPixel<'a, S: PixelSensor> {
    p: Point2i,
    pixel: &'a mut Pixel,
    sensor: &'a S,
}

impl<S: PixelSensor> FilmPixel<'_, S> {
    pub fn p(&self) -> Point2i {
        self.p
    }

    pub fn add_sample(&mut self, l: &SampledSpectrum, lambda: &SampledWavelengths, weight: Float) {
        let rgb = self.sensor.to_sensor_rgb(l, lambda);
        add_checked(self.pixel, self.p, rgb, weight);
    }
}

fn add_checked(pixel: &mut Pixel, p: Point2i, rgb: Rgb, weight: Float) {
    if rgb.has_nans() || rgb.has_infs() {
        warn!(x = p.x, y = p.y, ?rgb, "non-finite sensor rgb added to pixel");
    }
    pixel.add_rgb(rgb, weight);
}

/// A film storing pixels in sensor space and resolving them to an RGB color space.
pub struct RgbFilm<S: PixelSensor = XyzSensor> {
    resolution: Point2i,
    pixels: Vec<Pixel>,
    sensor: S,
    color_space: &'static RgbColorSpace,
}

impl RgbFilm<XyzSensor> {
    pub fn new(resolution: (u32, u32), color_space: &'static RgbColorSpace) -> anyhow::Result<Self> {
        Self::with_sensor(resolution, XyzSensor::default(), color_space)
    }
}

impl<S: PixelSensor> RgbFilm<S> {
    pub fn with_sensor(resolution: (u32, u32), sensor: S, color_space: &'static RgbColorSpace) -> anyhow::Result<Self> {
        let (width, height) = resolution;
        ensure!(width > 0 && height > 0, "film resolution {}x{} has a zero dimension", width, height);
        ensure!(
            width <= i32::MAX as u32 && height <= i32::MAX as u32,
            "film resolution {}x{} is too large",
            width,
            height
        );

        Ok(Self {
            resolution: Point2i::new(width as i32, height as i32),
            pixels: crate::renderer::init_pixels(width as usize * height as usize),
            sensor,
            color_space,
        })
    }

    pub fn resolution(&self) -> Point2i {
        self.resolution
    }

    pub fn color_space(&self) -> &'static RgbColorSpace {
        self.color_space
    }

    fn index(&self, p: Point2i) -> usize {
        debug_assert!(p.x >= 0 && p.y >= 0 && p.x < self.resolution.x && p.y < self.resolution.y);
        p.y as usize * self.resolution.x as usize + p.x as usize
    }

    pub fn pixel(&self, p: Point2i) -> &Pixel {
        &self.pixels[self.index(p)]
    }

    pub fn add_sample(&mut self, p: Point2i, l: &SampledSpectrum, lambda: &SampledWavelengths, weight: Float) {
        let rgb = self.sensor.to_sensor_rgb(l, lambda);
        self.add_rgb(p, rgb, weight);
    }

    /// Adds a value that is already in sensor space.
    pub fn add_rgb(&mut self, p: Point2i, rgb: Rgb, weight: Float) {
        let i = self.index(p);
        add_checked(&mut self.pixels[i], p, rgb, weight);
    }

    /// The pixel's average converted to the output color space.
    pub fn get_pixel_rgb(&self, p: Point2i) -> Rgb {
        let sensor_rgb = self.pixel(p).resolve();
        self.color_space.to_rgb([sensor_rgb[0], sensor_rgb[1], sensor_rgb[2]])
    }

    pub fn reset(&mut self) {
        self.pixels.par_iter_mut().for_each(|p| *p = Pixel::default());
    }

    /// Every pixel with its raster position, each exclusively borrowed, in row-major order.
    pub fn par_pixels_mut(&mut self) -> impl IndexedParallelIterator<Item = FilmPixel<'_, S>> {
        let width = self.resolution.x as usize;
        let sensor = &self.sensor;
        self.pixels.par_iter_mut().enumerate().map(move |(i, pixel)| FilmPixel {
            p: Point2i::new((i % width) as i32, (i / width) as i32),
            pixel,
            sensor,
        })
    }

    /// Resolves every pixel into a floating point image in the output color space.
    pub fn to_rgb_image(&self) -> image::Rgb32FImage {
        let data: Vec<f32> = (0..self.pixels.len())
            .into_par_iter()
            .flat_map_iter(|i| {
                let x = (i % self.resolution.x as usize) as i32;
                let y = (i / self.resolution.x as usize) as i32;
                let rgb = self.get_pixel_rgb(Point2i::new(x, y));
                [rgb.r() as f32, rgb.g() as f32, rgb.b() as f32]
            })
            .collect();
        image::Rgb32FImage::from_fn(self.resolution.x as u32, self.resolution.y as u32, |x, y| {
            let i = 3 * (y as usize * self.resolution.x as usize + x as usize);
            image::Rgb([data[i], data[i + 1], data[i + 2]])
        })
    }
}
