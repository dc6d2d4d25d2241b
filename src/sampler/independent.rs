use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::hash::hash_values;
use crate::sampler::{to_unit_float, Sampler};
use crate::{Float, Point2f, Point2i};

/// Uniform random draws from a stream seeded by the pixel and sample index.
#[derive(Clone, Debug)]
pub struct IndependentSampler {
    samples_per_pixel: u32,
    seed: u64,
    rng: Xoshiro256Plus,
    pixel_rng: Xoshiro256Plus,
}

impl IndependentSampler {
    pub fn new(samples_per_pixel: u32, seed: u64) -> Self {
        Self {
            samples_per_pixel,
            seed,
            rng: Xoshiro256Plus::seed_from_u64(seed),
            pixel_rng: Xoshiro256Plus::seed_from_u64(seed),
        }
    }
}

/// Seeds one stream of a pixel sample. `domain` keeps the film-position stream apart from the
/// general one.
pub(crate) fn pixel_sample_rng(p_pixel: Point2i, sample_index: u32, seed: u64, domain: u64) -> Xoshiro256Plus {
    let key = [p_pixel.x as u64, p_pixel.y as u64, sample_index as u64, seed, domain];
    Xoshiro256Plus::seed_from_u64(hash_values(&key))
}

impl Sampler for IndependentSampler {
    fn samples_per_pixel(&self) -> u32 {
        self.samples_per_pixel
    }

    fn start_pixel_sample(&mut self, p_pixel: Point2i, sample_index: u32, dimension: u32) {
        self.rng = pixel_sample_rng(p_pixel, sample_index, self.seed, 0);
        self.pixel_rng = pixel_sample_rng(p_pixel, sample_index, self.seed, 1);
        for _ in 0..dimension {
            self.rng.gen::<u64>();
        }
    }

    fn get_1d(&mut self) -> Float {
        to_unit_float(self.rng.gen())
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f::new(self.get_1d(), self.get_1d())
    }

    fn get_pixel_2d(&mut self) -> Point2f {
        Point2f::new(to_unit_float(self.pixel_rng.gen()), to_unit_float(self.pixel_rng.gen()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn draws(sampler: &mut IndependentSampler) -> Vec<Float> {
        let mut v: Vec<Float> = (0..8).map(|_| sampler.get_1d()).collect();
        let p = sampler.get_pixel_2d();
        v.extend([p.x, p.y]);
        v
    }

    #[test]
    fn test_same_pixel_sample_reproduces_draws() {
        let mut a = IndependentSampler::new(16, 7);
        let mut b = IndependentSampler::new(16, 7);
        // unrelated state before restarting must not matter
        b.start_pixel_sample(Point2i::new(1, 1), 3, 0);
        b.get_2d();

        a.start_pixel_sample(Point2i::new(10, 20), 5, 0);
        b.start_pixel_sample(Point2i::new(10, 20), 5, 0);
        assert_eq!(draws(&mut a), draws(&mut b));
    }

    #[test]
    fn test_dimension_skips_draws() {
        let mut a = IndependentSampler::new(16, 7);
        a.start_pixel_sample(Point2i::new(2, 2), 1, 0);
        a.get_1d();
        let second = a.get_1d();
        a.start_pixel_sample(Point2i::new(2, 2), 1, 1);
        assert_eq!(a.get_1d(), second);
    }

    #[test]
    fn test_different_samples_differ() {
        let mut a = IndependentSampler::new(16, 7);
        a.start_pixel_sample(Point2i::new(2, 2), 1, 0);
        let x = a.get_1d();
        a.start_pixel_sample(Point2i::new(2, 2), 2, 0);
        assert_ne!(x, a.get_1d());
    }
}
