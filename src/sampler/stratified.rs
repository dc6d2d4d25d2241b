use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::hash::{hash_values, permutation_element};
use crate::sampler::independent::pixel_sample_rng;
use crate::sampler::{to_unit_float, Sampler};
use crate::{Float, Point2f, Point2i};

/// Splits each dimension into `x_samples * y_samples` strata and visits them in a permuted order
/// that differs for every pixel and dimension. The film-position pair has its own permutation and
/// jitter stream, so it never shares strata with the general-purpose dimensions.
#[derive(Clone, Debug)]
pub struct StratifiedSampler {
    x_samples: u32,
    y_samples: u32,
    jitter: bool,
    seed: u64,
    pixel: Point2i,
    sample_index: u32,
    dimension: u32,
    rng: Xoshiro256Plus,
    pixel_rng: Xoshiro256Plus,
}

const PIXEL_DIMENSION_KEY: u64 = u64::MAX;

impl StratifiedSampler {
    pub fn new(x_samples: u32, y_samples: u32, jitter: bool, seed: u64) -> Self {
        Self {
            x_samples: x_samples.max(1),
            y_samples: y_samples.max(1),
            jitter,
            seed,
            pixel: Point2i::new(0, 0),
            sample_index: 0,
            dimension: 0,
            rng: Xoshiro256Plus::seed_from_u64(seed),
            pixel_rng: Xoshiro256Plus::seed_from_u64(seed ^ PIXEL_DIMENSION_KEY),
        }
    }

    /// Picks strata as close to square as possible for `spp` samples.
    pub fn with_spp(spp: u32, jitter: bool, seed: u64) -> Self {
        let spp = spp.max(1);
        let mut x = (spp as Float).sqrt() as u32;
        while x > 1 && spp % x != 0 {
            x -= 1;
        }
        Self::new(x.max(1), spp / x.max(1), jitter, seed)
    }

    fn stratum(&self, dimension_key: u64) -> u32 {
        let hash = hash_values(&[self.pixel.x as u64, self.pixel.y as u64, dimension_key, self.seed]);
        permutation_element(self.sample_index, self.samples_per_pixel(), hash as u32)
    }

    fn stratified_2d(&self, stratum: u32, dx: Float, dy: Float) -> Point2f {
        let x = stratum % self.x_samples;
        let y = stratum / self.x_samples;
        Point2f::new(
            to_unit_float((x as Float + dx) / self.x_samples as Float),
            to_unit_float((y as Float + dy) / self.y_samples as Float),
        )
    }
}

fn jitter(rng: &mut Xoshiro256Plus, enabled: bool) -> Float {
    if enabled {
        to_unit_float(rng.gen())
    } else {
        0.5
    }
}

impl Sampler for StratifiedSampler {
    fn samples_per_pixel(&self) -> u32 {
        self.x_samples * self.y_samples
    }

    fn start_pixel_sample(&mut self, p_pixel: Point2i, sample_index: u32, dimension: u32) {
        self.pixel = p_pixel;
        self.sample_index = sample_index;
        self.dimension = dimension;
        self.rng = pixel_sample_rng(p_pixel, sample_index, self.seed, 2);
        self.pixel_rng = pixel_sample_rng(p_pixel, sample_index, self.seed, 3);
        for _ in 0..dimension {
            self.rng.gen::<u64>();
        }
    }

    fn get_1d(&mut self) -> Float {
        let stratum = self.stratum(self.dimension as u64);
        self.dimension += 1;
        let delta = jitter(&mut self.rng, self.jitter);
        to_unit_float((stratum as Float + delta) / self.samples_per_pixel() as Float)
    }

    fn get_2d(&mut self) -> Point2f {
        let stratum = self.stratum(self.dimension as u64);
        self.dimension += 2;
        let dx = jitter(&mut self.rng, self.jitter);
        let dy = jitter(&mut self.rng, self.jitter);
        self.stratified_2d(stratum, dx, dy)
    }

    fn get_pixel_2d(&mut self) -> Point2f {
        let stratum = self.stratum(PIXEL_DIMENSION_KEY);
        let dx = jitter(&mut self.pixel_rng, self.jitter);
        let dy = jitter(&mut self.pixel_rng, self.jitter);
        self.stratified_2d(stratum, dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_each_stratum_gets_one_sample() {
        let mut sampler = StratifiedSampler::new(4, 4, true, 9);
        let pixel = Point2i::new(5, 6);
        for dim in [0, 3] {
            let mut hits = vec![0; 16];
            for i in 0..16 {
                sampler.start_pixel_sample(pixel, i, dim);
                let u = sampler.get_2d();
                let cell = (u.y * 4.0) as usize * 4 + (u.x * 4.0) as usize;
                hits[cell] += 1;
            }
            assert_eq!(hits, vec![1; 16]);
        }
    }

    #[test]
    fn test_1d_strata_are_covered() {
        let mut sampler = StratifiedSampler::new(2, 4, true, 1);
        let mut hits = vec![0; 8];
        for i in 0..8 {
            sampler.start_pixel_sample(Point2i::new(0, 3), i, 7);
            hits[(sampler.get_1d() * 8.0) as usize] += 1;
        }
        assert_eq!(hits, vec![1; 8]);
    }

    #[test]
    fn test_unjittered_samples_are_stratum_centers() {
        let mut sampler = StratifiedSampler::new(2, 2, false, 0);
        sampler.start_pixel_sample(Point2i::new(1, 1), 0, 0);
        let u = sampler.get_2d();
        assert!([0.25, 0.75].contains(&u.x) && [0.25, 0.75].contains(&u.y));
    }

    #[test]
    fn test_pixel_draws_leave_dimensions_alone() {
        let mut a = StratifiedSampler::new(3, 3, true, 4);
        let mut b = a.clone();
        a.start_pixel_sample(Point2i::new(2, 2), 5, 0);
        b.start_pixel_sample(Point2i::new(2, 2), 5, 0);

        let mut pixel_hits = vec![0; 9];
        for i in 0..9 {
            b.start_pixel_sample(Point2i::new(2, 2), i, 0);
            let u = b.get_pixel_2d();
            pixel_hits[(u.y * 3.0) as usize * 3 + (u.x * 3.0) as usize] += 1;
        }
        assert_eq!(pixel_hits, vec![1; 9]);

        b.start_pixel_sample(Point2i::new(2, 2), 5, 0);
        b.get_pixel_2d();
        assert_eq!(a.get_1d(), b.get_1d());
        assert_eq!(a.get_2d(), b.get_2d());
    }

    #[test]
    fn test_with_spp_factors() {
        assert_eq!(StratifiedSampler::with_spp(16, true, 0).samples_per_pixel(), 16);
        assert_eq!(StratifiedSampler::with_spp(12, true, 0).samples_per_pixel(), 12);
        assert_eq!(StratifiedSampler::with_spp(7, true, 0).samples_per_pixel(), 7);
    }
}
