//! Per-pixel sample streams.
//!
//! A sampler is restarted for every pixel sample with `start_pixel_sample`, after which its draws
//! depend only on `(pixel, sample index, dimension)` and the sampler's seed, never on which
//! thread evaluates the sample or in which order.

use crate::filter::Filter;
use crate::{Float, Point2f, Point2i};

mod independent;
mod stratified;

pub use independent::IndependentSampler;
pub use stratified::StratifiedSampler;

/// Everything a camera needs to generate a ray for one sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraSample {
    /// Position on the film in raster coordinates
    pub p_film: Point2f,
    pub p_lens: Point2f,
    pub time: Float,
    pub filter_weight: Float,
}

pub trait Sampler: Send + Sync {
    fn samples_per_pixel(&self) -> u32;

    /// Restarts the stream at `dimension` of sample `sample_index` in pixel `p_pixel`.
    fn start_pixel_sample(&mut self, p_pixel: Point2i, sample_index: u32, dimension: u32);

    fn get_1d(&mut self) -> Float;

    fn get_2d(&mut self) -> Point2f;

    /// The draw used for the sample's position within the pixel, kept apart from the draws
    /// used for light transport.
    fn get_pixel_2d(&mut self) -> Point2f;

    fn get_camera_sample(&mut self, p_pixel: Point2i, filter: &dyn Filter) -> CameraSample {
        let fs = filter.sample(self.get_pixel_2d());
        let p_film = Point2f::new(p_pixel.x as Float + 0.5 + fs.p.x, p_pixel.y as Float + 0.5 + fs.p.y);
        let time = self.get_1d();
        let p_lens = self.get_2d();
        CameraSample { p_film, p_lens, time, filter_weight: fs.weight }
    }
}

/// The samplers a render can be configured with.
#[derive(Clone, Debug)]
pub enum PixelSampler {
    Independent(IndependentSampler),
    Stratified(StratifiedSampler),
}

impl Sampler for PixelSampler {
    fn samples_per_pixel(&self) -> u32 {
        match self {
            PixelSampler::Independent(s) => s.samples_per_pixel(),
            PixelSampler::Stratified(s) => s.samples_per_pixel(),
        }
    }

    fn start_pixel_sample(&mut self, p_pixel: Point2i, sample_index: u32, dimension: u32) {
        match self {
            PixelSampler::Independent(s) => s.start_pixel_sample(p_pixel, sample_index, dimension),
            PixelSampler::Stratified(s) => s.start_pixel_sample(p_pixel, sample_index, dimension),
        }
    }

    fn get_1d(&mut self) -> Float {
        match self {
            PixelSampler::Independent(s) => s.get_1d(),
            PixelSampler::Stratified(s) => s.get_1d(),
        }
    }

    fn get_2d(&mut self) -> Point2f {
        match self {
            PixelSampler::Independent(s) => s.get_2d(),
            PixelSampler::Stratified(s) => s.get_2d(),
        }
    }

    fn get_pixel_2d(&mut self) -> Point2f {
        match self {
            PixelSampler::Independent(s) => s.get_pixel_2d(),
            PixelSampler::Stratified(s) => s.get_pixel_2d(),
        }
    }
}

impl From<IndependentSampler> for PixelSampler {
    fn from(s: IndependentSampler) -> Self {
        PixelSampler::Independent(s)
    }
}

impl From<StratifiedSampler> for PixelSampler {
    fn from(s: StratifiedSampler) -> Self {
        PixelSampler::Stratified(s)
    }
}

/// Clamps a uniform draw into [0, 1).
pub(crate) fn to_unit_float(v: Float) -> Float {
    v.min(crate::ONE_MINUS_EPSILON)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::BoxFilter;

    #[test]
    fn test_camera_sample_stays_in_pixel_for_box_filter() {
        let mut sampler = PixelSampler::from(IndependentSampler::new(4, 0));
        let filter = BoxFilter::default();
        for i in 0..4 {
            sampler.start_pixel_sample(Point2i::new(3, 7), i, 0);
            let cs = sampler.get_camera_sample(Point2i::new(3, 7), &filter);
            assert!(cs.p_film.x >= 3.0 && cs.p_film.x <= 4.0);
            assert!(cs.p_film.y >= 7.0 && cs.p_film.y <= 8.0);
            assert_eq!(cs.filter_weight, 1.0);
        }
    }
}
