//! Pixel reconstruction filters.
//!
//! Filters are applied by importance sampling: each camera sample is offset from the pixel
//! center by a draw from the filter, and carries the weight `f(p) / pdf(p)`.

use crate::geometry::bounds::Bounds2f;
use crate::sampling::PiecewiseConstant2D;
use crate::{gaussian, lerp, Float, Point2f, Vec2f};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterSample {
    pub p: Point2f,
    pub weight: Float,
}

pub trait Filter: Sync + Send {
    fn radius(&self) -> Vec2f;

    fn evaluate(&self, p: Point2f) -> Float;

    fn integral(&self) -> Float;

    /// Samples an offset from the pixel center.
    fn sample(&self, u: Point2f) -> FilterSample;
}

pub struct BoxFilter {
    radius: Vec2f,
}

impl BoxFilter {
    pub fn new(radius: Vec2f) -> Self {
        Self { radius }
    }
}

impl Default for BoxFilter {
    fn default() -> Self {
        Self::new(Vec2f::new(0.5, 0.5))
    }
}

impl Filter for BoxFilter {
    fn radius(&self) -> Vec2f {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        if p.x.abs() <= self.radius.x && p.y.abs() <= self.radius.y {
            1.0
        } else {
            0.0
        }
    }

    fn integral(&self) -> Float {
        2.0 * self.radius.x * 2.0 * self.radius.y
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        let p = Point2f::new(lerp(u.x, -self.radius.x, self.radius.x), lerp(u.y, -self.radius.y, self.radius.y));
        FilterSample { p, weight: 1.0 }
    }
}

/// Tabulates a filter over its support so that it can be sampled by inversion.
pub struct FilterSampler {
    domain: Bounds2f,
    f: Vec<Float>,
    nx: usize,
    ny: usize,
    distrib: PiecewiseConstant2D,
}

impl FilterSampler {
    pub fn new(radius: Vec2f, evaluate: impl Fn(Point2f) -> Float) -> Self {
        let domain = Bounds2f::with_bounds(Point2f::new(-radius.x, -radius.y), Point2f::new(radius.x, radius.y));
        let nx = ((32.0 * radius.x) as usize).max(1);
        let ny = ((32.0 * radius.y) as usize).max(1);

        let mut f = Vec::with_capacity(nx * ny);
        for y in 0..ny {
            for x in 0..nx {
                let p = domain.lerp(Point2f::new((x as Float + 0.5) / nx as Float, (y as Float + 0.5) / ny as Float));
                f.push(evaluate(p));
            }
        }
        let distrib = PiecewiseConstant2D::new(&f, nx, ny, domain);
        Self { domain, f, nx, ny, distrib }
    }

    pub fn domain(&self) -> Bounds2f {
        self.domain
    }

    pub fn sample(&self, u: Point2f) -> FilterSample {
        let (p, pdf, pi) = self.distrib.sample(u);
        let x = (pi.x.max(0) as usize).min(self.nx - 1);
        let y = (pi.y.max(0) as usize).min(self.ny - 1);
        if pdf == 0.0 {
            return FilterSample { p, weight: 0.0 };
        }
        FilterSample { p, weight: self.f[y * self.nx + x] / pdf }
    }
}

/// Gaussian falloff, shifted down so that it reaches zero at the radius.
pub struct GaussianFilter {
    radius: Vec2f,
    sigma: Float,
    exp_x: Float,
    exp_y: Float,
    sampler: FilterSampler,
}

impl GaussianFilter {
    pub fn new(radius: Vec2f, sigma: Float) -> Self {
        let exp_x = gaussian(radius.x, 0.0, sigma);
        let exp_y = gaussian(radius.y, 0.0, sigma);
        let sampler = FilterSampler::new(radius, |p| eval_gaussian(p, sigma, exp_x, exp_y));
        Self { radius, sigma, exp_x, exp_y, sampler }
    }

    pub fn sigma(&self) -> Float {
        self.sigma
    }
}

impl Default for GaussianFilter {
    fn default() -> Self {
        Self::new(Vec2f::new(1.5, 1.5), 0.5)
    }
}

fn eval_gaussian(p: Point2f, sigma: Float, exp_x: Float, exp_y: Float) -> Float {
    Float::max(0.0, gaussian(p.x, 0.0, sigma) - exp_x) * Float::max(0.0, gaussian(p.y, 0.0, sigma) - exp_y)
}

impl Filter for GaussianFilter {
    fn radius(&self) -> Vec2f {
        self.radius
    }

    fn evaluate(&self, p: Point2f) -> Float {
        eval_gaussian(p, self.sigma, self.exp_x, self.exp_y)
    }

    fn integral(&self) -> Float {
        let gaussian_integral = |r: Float, e: Float| {
            // integral of the gaussian over [-r, r] minus the shift
            let n = 256;
            let dx = 2.0 * r / n as Float;
            (0..n)
                .map(|i| Float::max(0.0, gaussian(-r + (i as Float + 0.5) * dx, 0.0, self.sigma) - e) * dx)
                .sum::<Float>()
        };
        gaussian_integral(self.radius.x, self.exp_x) * gaussian_integral(self.radius.y, self.exp_y)
    }

    fn sample(&self, u: Point2f) -> FilterSample {
        self.sampler.sample(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn test_box_filter_samples_cover_support() {
        let filter = BoxFilter::default();
        let s = filter.sample(Point2f::new(0.0, 1.0));
        assert_eq!(s.p, Point2f::new(-0.5, 0.5));
        assert_eq!(s.weight, 1.0);
        assert_eq!(filter.integral(), 1.0);
    }

    #[test]
    fn test_gaussian_vanishes_at_radius() {
        let filter = GaussianFilter::default();
        assert_eq!(filter.evaluate(Point2f::new(1.5, 0.0)), 0.0);
        assert!(filter.evaluate(Point2f::new(0.0, 0.0)) > 0.0);
    }

    #[test]
    fn test_gaussian_weights_estimate_integral() {
        // E[weight] over the sampled offsets is the filter's integral
        let filter = GaussianFilter::default();
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let n = 20_000;
        let mut sum = 0.0;
        for _ in 0..n {
            let s = filter.sample(Point2f::new(rng.gen(), rng.gen()));
            assert!(s.p.x.abs() <= 1.5 && s.p.y.abs() <= 1.5);
            sum += s.weight;
        }
        assert_relative_eq!(sum / n as Float, filter.integral(), max_relative = 2e-2);
    }
}
