use cgmath::InnerSpace;

use crate::geometry::{angle_between, gram_schmidt, spherical_direction, Bounds2f, Frame};
use crate::math::{clamp, lerp, safe_sqrt, sqr, INV_4PI, INV_PI, ONE_MINUS_EPSILON, PI, PI_OVER_2, PI_OVER_4};
use crate::{difference_of_products, sum_of_products, Float, Point2f, Point2i, Point3f, Vec2f, Vec3f};

pub fn sample_uniform_disk_concentric(u: Point2f) -> Point2f {
    // map sample from [0, 1] to [-1, 1]
    let u_offset = 2.0 * u - Vec2f::new(1.0, 1.0);
    if u_offset.x == 0.0 && u_offset.y == 0.0 {
        return Point2f::new(0.0, 0.0);
    }

    let (r, theta) = if u_offset.x.abs() > u_offset.y.abs() {
        (u_offset.x, PI_OVER_4 * (u_offset.y / u_offset.x))
    } else {
        (u_offset.y, PI_OVER_2 - PI_OVER_4 * (u_offset.x / u_offset.y))
    };

    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn sample_uniform_disk_polar(u: Point2f) -> Point2f {
    let r = u.x.sqrt();
    let theta = 2.0 * PI * u.y;
    Point2f::new(r * theta.cos(), r * theta.sin())
}

pub fn sample_cosine_hemisphere(u: Point2f) -> Vec3f {
    let d = sample_uniform_disk_concentric(u);
    let z = safe_sqrt(1.0 - d.x * d.x - d.y * d.y);
    Vec3f::new(d.x, d.y, z)
}

#[inline]
pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * INV_PI
}

pub fn sample_uniform_sphere(u: Point2f) -> Vec3f {
    let z = 1.0 - 2.0 * u.x;
    let r = safe_sqrt(1.0 - z * z);
    let phi = 2.0 * PI * u.y;
    Vec3f::new(r * phi.cos(), r * phi.sin(), z)
}

#[inline]
pub fn uniform_sphere_pdf() -> Float {
    INV_4PI
}

/// Uniformly distributed barycentric coordinates over a triangle.
pub fn sample_uniform_triangle(u: Point2f) -> [Float; 3] {
    let (b0, b1) = if u.x < u.y {
        let b0 = u.x / 2.0;
        (b0, u.y - b0)
    } else {
        let b1 = u.y / 2.0;
        (u.x - b1, b1)
    };
    [b0, b1, 1.0 - b0 - b1]
}

/// Solid angle subtended by the triangle `v` as seen from `p`.
pub fn spherical_triangle_area(a: Vec3f, b: Vec3f, c: Vec3f) -> Float {
    (2.0 * Float::atan2(a.dot(b.cross(c)), 1.0 + a.dot(b) + a.dot(c) + b.dot(c))).abs()
}

/// Samples a direction uniformly over the spherical projection of the triangle `v` around `p`.
/// Returns the barycentric coordinates of the sampled point together with the solid angle pdf,
/// or `None` for a degenerate projection.
pub fn sample_spherical_triangle(v: &[Point3f; 3], p: Point3f, u: Point2f) -> Option<([Float; 3], Float)> {
    let a = (v[0] - p).normalize();
    let b = (v[1] - p).normalize();
    let c = (v[2] - p).normalize();

    let n_ab = a.cross(b);
    let n_bc = b.cross(c);
    let n_ca = c.cross(a);
    if n_ab.magnitude2() == 0.0 || n_bc.magnitude2() == 0.0 || n_ca.magnitude2() == 0.0 {
        return None;
    }
    let n_ab = n_ab.normalize();
    let n_bc = n_bc.normalize();
    let n_ca = n_ca.normalize();

    let alpha = angle_between(n_ab, -n_ca);
    let beta = angle_between(n_bc, -n_ab);
    let gamma = angle_between(n_ca, -n_bc);

    // sample the sub-triangle area A'
    let a_pi = alpha + beta + gamma;
    let ap_pi = lerp(u.x, PI, a_pi);
    let area = a_pi - PI;
    let pdf = if area <= 0.0 { 0.0 } else { 1.0 / area };

    let cos_alpha = alpha.cos();
    let sin_alpha = alpha.sin();
    let sin_phi = ap_pi.sin() * cos_alpha - ap_pi.cos() * sin_alpha;
    let cos_phi = ap_pi.cos() * cos_alpha + ap_pi.sin() * sin_alpha;
    let k1 = cos_phi + cos_alpha;
    let k2 = sin_phi - sin_alpha * a.dot(b);
    let cos_bp = (k2 + difference_of_products(k2, cos_phi, k1, sin_phi) * cos_alpha)
        / (sum_of_products(k2, sin_phi, k1, cos_phi) * sin_alpha);
    let cos_bp = clamp(cos_bp, -1.0, 1.0);
    let sin_bp = safe_sqrt(1.0 - sqr(cos_bp));
    let cp = cos_bp * a + sin_bp * gram_schmidt(c, a).normalize();

    // sample along the arc from b to c'
    let cos_theta = 1.0 - u.y * (1.0 - cp.dot(b));
    let sin_theta = safe_sqrt(1.0 - sqr(cos_theta));
    let w = cos_theta * b + sin_theta * gram_schmidt(cp, b).normalize();

    // barycentrics of the point where w hits the triangle
    let e1 = v[1] - v[0];
    let e2 = v[2] - v[0];
    let s1 = w.cross(e2);
    let divisor = s1.dot(e1);
    if divisor == 0.0 {
        return Some(([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], pdf));
    }
    let inv_divisor = 1.0 / divisor;
    let s = p - v[0];
    let mut b1 = clamp(s.dot(s1) * inv_divisor, 0.0, 1.0);
    let mut b2 = clamp(w.dot(s.cross(e1)) * inv_divisor, 0.0, 1.0);
    let sum = b1 + b2;
    if sum > 1.0 {
        b1 /= sum;
        b2 /= sum;
    }

    Some(([1.0 - b1 - b2, b1, b2], pdf))
}

/// Recovers the sample values that `sample_spherical_triangle` maps to direction `w`.
pub fn invert_spherical_triangle_sample(v: &[Point3f; 3], p: Point3f, w: Vec3f) -> Option<Point2f> {
    let a = (v[0] - p).normalize();
    let b = (v[1] - p).normalize();
    let c = (v[2] - p).normalize();

    let n_ab = a.cross(b);
    let n_bc = b.cross(c);
    let n_ca = c.cross(a);
    if n_ab.magnitude2() == 0.0 || n_bc.magnitude2() == 0.0 || n_ca.magnitude2() == 0.0 {
        return None;
    }
    let n_ab = n_ab.normalize();
    let n_bc = n_bc.normalize();
    let n_ca = n_ca.normalize();

    let alpha = angle_between(n_ab, -n_ca);
    let beta = angle_between(n_bc, -n_ab);
    let gamma = angle_between(n_ca, -n_bc);

    let mut cp = b.cross(w).cross(c.cross(a)).normalize();
    if cp.dot(a + c) < 0.0 {
        cp = -cp;
    }

    let u0 = if a.dot(cp) > 0.999_998_5 {
        0.0
    } else {
        let n_cpb = cp.cross(b);
        let n_acp = a.cross(cp);
        if n_cpb.magnitude2() == 0.0 || n_acp.magnitude2() == 0.0 {
            return Some(Point2f::new(0.5, 0.5));
        }
        let n_cpb = n_cpb.normalize();
        let n_acp = n_acp.normalize();
        let ap = alpha + angle_between(n_ab, n_cpb) + angle_between(n_acp, -n_cpb) - PI;
        let area = alpha + beta + gamma - PI;
        ap / area
    };

    let u1 = (1.0 - w.dot(b)) / (1.0 - cp.dot(b));
    Some(Point2f::new(clamp(u0, 0.0, 1.0), clamp(u1, 0.0, 1.0)))
}

pub fn sample_linear(u: Float, a: Float, b: Float) -> Float {
    if u == 0.0 && a == 0.0 {
        return 0.0;
    }
    let x = u * (a + b) / (a + lerp(u, a * a, b * b).sqrt());
    x.min(ONE_MINUS_EPSILON)
}

pub fn linear_pdf(x: Float, a: Float, b: Float) -> Float {
    if !(0.0..=1.0).contains(&x) {
        return 0.0;
    }
    2.0 * lerp(x, a, b) / (a + b)
}

pub fn invert_linear_sample(x: Float, a: Float, b: Float) -> Float {
    x * (a * (2.0 - x) + b * x) / (a + b)
}

/// Samples the bilinear function over [0,1]^2 with corner values `w` (ordered (0,0), (1,0), (0,1), (1,1)).
pub fn sample_bilinear(u: Point2f, w: &[Float; 4]) -> Point2f {
    let y = sample_linear(u.y, w[0] + w[1], w[2] + w[3]);
    let x = sample_linear(u.x, lerp(y, w[0], w[2]), lerp(y, w[1], w[3]));
    Point2f::new(x, y)
}

pub fn bilinear_pdf(p: Point2f, w: &[Float; 4]) -> Float {
    if p.x < 0.0 || p.x > 1.0 || p.y < 0.0 || p.y > 1.0 {
        return 0.0;
    }
    let sum = w[0] + w[1] + w[2] + w[3];
    if sum == 0.0 {
        return 1.0;
    }
    4.0 * ((1.0 - p.x) * (1.0 - p.y) * w[0]
        + p.x * (1.0 - p.y) * w[1]
        + (1.0 - p.x) * p.y * w[2]
        + p.x * p.y * w[3])
        / sum
}

pub fn sample_exponential(u: Float, a: Float) -> Float {
    -(1.0 - u).ln() / a
}

pub fn henyey_greenstein(cos_theta: Float, g: Float) -> Float {
    let denom = 1.0 + sqr(g) + 2.0 * g * cos_theta;
    INV_4PI * (1.0 - sqr(g)) / (denom * safe_sqrt(denom))
}

/// Samples an incident direction from the Henyey-Greenstein phase function around `wo`.
/// Returns the direction and its pdf, which equals the phase function value.
pub fn sample_henyey_greenstein(wo: Vec3f, g: Float, u: Point2f) -> (Vec3f, Float) {
    let cos_theta = if g.abs() < 1e-3 {
        1.0 - 2.0 * u.x
    } else {
        -1.0 / (2.0 * g) * (1.0 + sqr(g) - sqr((1.0 - sqr(g)) / (1.0 + g - 2.0 * g * u.x)))
    };

    let sin_theta = safe_sqrt(1.0 - sqr(cos_theta));
    let phi = 2.0 * PI * u.y;
    let frame = Frame::from_z(wo);
    let wi = frame.from_local(spherical_direction(sin_theta, cos_theta, phi));
    (wi, henyey_greenstein(cos_theta, g))
}

/// Importance samples wavelengths in [360, 830] nm proportionally to the visual response.
pub fn sample_visible_wavelengths(u: Float) -> Float {
    538.0 - 138.888_889 * (0.856_910_62 - 1.827_501_97 * u).atanh()
}

pub fn visible_wavelengths_pdf(lambda: Float) -> Float {
    if !(360.0..=830.0).contains(&lambda) {
        return 0.0;
    }
    0.003_939_804_2 / sqr((0.0072 * (lambda - 538.0)).cosh())
}

/// A piecewise-constant 1D distribution over `[min, max]` that can be sampled by inverting its CDF.
#[derive(Clone, Debug)]
pub struct PiecewiseConstant1D {
    func: Vec<Float>,
    cdf: Vec<Float>,
    func_int: Float,
    min: Float,
    max: Float,
}

impl PiecewiseConstant1D {
    pub fn new(f: &[Float], min: Float, max: Float) -> Self {
        let func: Vec<Float> = f.iter().map(|v| v.abs()).collect();
        let n = func.len();
        let mut cdf = vec![0.0; n + 1];
        for i in 1..=n {
            cdf[i] = cdf[i - 1] + func[i - 1] * (max - min) / n as Float;
        }

        let func_int = cdf[n];
        if func_int == 0.0 {
            for (i, c) in cdf.iter_mut().enumerate().skip(1) {
                *c = i as Float / n as Float;
            }
        } else {
            for c in cdf.iter_mut().skip(1) {
                *c /= func_int;
            }
        }

        Self { func, cdf, func_int, min, max }
    }

    pub fn integral(&self) -> Float {
        self.func_int
    }

    pub fn size(&self) -> usize {
        self.func.len()
    }

    /// Returns the sampled value, its pdf, and the index of the segment it fell into.
    pub fn sample(&self, u: Float) -> (Float, Float, usize) {
        let first_above = self.cdf.partition_point(|&c| c <= u);
        let o = clamp(first_above as isize - 1, 0, self.size() as isize - 1) as usize;

        let mut du = u - self.cdf[o];
        let width = self.cdf[o + 1] - self.cdf[o];
        if width > 0.0 {
            du /= width;
        }

        let pdf = if self.func_int > 0.0 { self.func[o] / self.func_int } else { 0.0 };
        let x = lerp((o as Float + du) / self.size() as Float, self.min, self.max);
        (x, pdf, o)
    }
}

/// A 2D piecewise-constant distribution built from a marginal over rows and a conditional per row.
#[derive(Clone, Debug)]
pub struct PiecewiseConstant2D {
    domain: Bounds2f,
    conditional_v: Vec<PiecewiseConstant1D>,
    marginal: PiecewiseConstant1D,
}

impl PiecewiseConstant2D {
    /// `func` holds `nu * nv` values stored row by row.
    pub fn new(func: &[Float], nu: usize, nv: usize, domain: Bounds2f) -> Self {
        assert_eq!(func.len(), nu * nv);
        let conditional_v: Vec<_> = func
            .chunks_exact(nu)
            .map(|row| PiecewiseConstant1D::new(row, domain.min.x, domain.max.x))
            .collect();
        let marginal_func: Vec<Float> = conditional_v.iter().map(|d| d.integral()).collect();
        let marginal = PiecewiseConstant1D::new(&marginal_func, domain.min.y, domain.max.y);

        Self { domain, conditional_v, marginal }
    }

    pub fn domain(&self) -> Bounds2f {
        self.domain
    }

    pub fn integral(&self) -> Float {
        self.marginal.integral()
    }

    pub fn sample(&self, u: Point2f) -> (Point2f, Float, Point2i) {
        let (d1, pdf1, v) = self.marginal.sample(u.y);
        let (d0, pdf0, uo) = self.conditional_v[v].sample(u.x);
        (Point2f::new(d0, d1), pdf0 * pdf1, Point2i::new(uo as i32, v as i32))
    }

    pub fn pdf(&self, p: Point2f) -> Float {
        let off = self.domain.offset(p);
        let nu = self.conditional_v[0].size();
        let nv = self.marginal.size();
        let iu = clamp((off.x * nu as Float) as isize, 0, nu as isize - 1) as usize;
        let iv = clamp((off.y * nv as Float) as isize, 0, nv as isize - 1) as usize;
        self.conditional_v[iv].func[iu] / self.marginal.integral()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256Plus;

    fn rand_point2(rng: &mut Xoshiro256Plus) -> Point2f {
        Point2f::new(rng.gen(), rng.gen())
    }

    #[test]
    fn test_concentric_disk_stays_in_disk() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        for _ in 0..1000 {
            let d = sample_uniform_disk_concentric(rand_point2(&mut rng));
            assert!(d.x * d.x + d.y * d.y <= 1.0 + 1e-5);
        }
        // the corners of the square map onto the rim
        let d = sample_uniform_disk_concentric(point2f!(1.0, 0.5));
        assert_abs_diff_eq!(d.x, 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(d.y, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_cosine_hemisphere_mean_cosine() {
        // E[cos] under a cosine-weighted distribution is 2/3
        let mut rng = Xoshiro256Plus::seed_from_u64(11);
        let n = 200_000;
        let mean = (0..n)
            .map(|_| sample_cosine_hemisphere(rand_point2(&mut rng)).z as f64)
            .sum::<f64>() / n as f64;
        assert_abs_diff_eq!(mean, 2.0 / 3.0, epsilon = 5e-3);
    }

    #[test]
    fn test_uniform_triangle_barycentrics() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        for _ in 0..1000 {
            let b = sample_uniform_triangle(rand_point2(&mut rng));
            assert!(b.iter().all(|&x| x >= 0.0));
            assert_abs_diff_eq!(b[0] + b[1] + b[2], 1.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_spherical_triangle_sample_and_invert() {
        let v = [point3f!(-1, -1, 2), point3f!(1, -1, 2), point3f!(0, 1, 2)];
        let p = point3f!(0.1, 0.0, 0.0);
        let mut rng = Xoshiro256Plus::seed_from_u64(17);
        for _ in 0..200 {
            let u = Point2f::new(rng.gen_range(0.05..0.95), rng.gen_range(0.05..0.95));
            let (b, pdf) = sample_spherical_triangle(&v, p, u).unwrap();
            assert!(pdf > 0.0);
            assert_abs_diff_eq!(b[0] + b[1] + b[2], 1.0, epsilon = 1e-5);

            let hit = crate::geometry::point_from_barycentric(b, v);
            let w = (hit - p).normalize();
            let inv = invert_spherical_triangle_sample(&v, p, w).unwrap();
            assert_abs_diff_eq!(inv.x, u.x, epsilon = 2e-3);
            assert_abs_diff_eq!(inv.y, u.y, epsilon = 2e-3);
        }
    }

    #[test]
    fn test_spherical_triangle_pdf_matches_solid_angle() {
        let v = [point3f!(-1, -1, 1), point3f!(1, -1, 1), point3f!(0, 1, 1)];
        let p = point3f!(0, 0, 0);
        let (_, pdf) = sample_spherical_triangle(&v, p, point2f!(0.5, 0.5)).unwrap();
        let a = (v[0] - p).normalize();
        let b = (v[1] - p).normalize();
        let c = (v[2] - p).normalize();
        assert_relative_eq!(pdf, 1.0 / spherical_triangle_area(a, b, c), max_relative = 1e-3);
    }

    #[test]
    fn test_bilinear_pdf_integrates_to_one() {
        let w = [0.1, 0.7, 0.3, 1.2];
        let n = 64;
        let mut sum = 0.0;
        for i in 0..n {
            for j in 0..n {
                let p = Point2f::new((i as Float + 0.5) / n as Float, (j as Float + 0.5) / n as Float);
                sum += bilinear_pdf(p, &w);
            }
        }
        assert_relative_eq!(sum / (n * n) as Float, 1.0, max_relative = 1e-3);
        let s = sample_bilinear(point2f!(0.3, 0.8), &w);
        assert!(s.x >= 0.0 && s.x < 1.0 && s.y >= 0.0 && s.y < 1.0);
    }

    #[test]
    fn test_linear_sample_inverts() {
        for &u in &[0.1, 0.4, 0.75] {
            let x = sample_linear(u, 0.5, 2.0);
            assert_abs_diff_eq!(invert_linear_sample(x, 0.5, 2.0), u, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_hg_is_normalized() {
        let mut rng = Xoshiro256Plus::seed_from_u64(23);
        let g = 0.6;
        let n = 100_000;
        // uniform sphere estimate of the integral of the phase function
        let sum: f64 = (0..n)
            .map(|_| {
                let w = sample_uniform_sphere(rand_point2(&mut rng));
                (henyey_greenstein(w.z, g) / uniform_sphere_pdf()) as f64
            })
            .sum();
        assert_abs_diff_eq!(sum / n as f64, 1.0, epsilon = 0.03);

        let wo = vec3f!(0, 0, 1);
        let (wi, pdf) = sample_henyey_greenstein(wo, g, point2f!(0.3, 0.7));
        assert_abs_diff_eq!(wi.magnitude(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(pdf, henyey_greenstein(wo.dot(wi), g), max_relative = 1e-4);
    }

    #[test]
    fn test_visible_wavelengths_in_range() {
        for i in 0..=100 {
            let u = i as Float / 100.0 * ONE_MINUS_EPSILON;
            let lambda = sample_visible_wavelengths(u);
            assert!((359.9..=830.1).contains(&lambda), "lambda {}", lambda);
            assert!(visible_wavelengths_pdf(lambda.clamp(360.0, 830.0)) > 0.0);
        }
        assert_eq!(visible_wavelengths_pdf(300.0), 0.0);
    }

    #[test]
    fn test_piecewise_constant_1d() {
        let d = PiecewiseConstant1D::new(&[1.0, 3.0], 0.0, 1.0);
        assert_relative_eq!(d.integral(), 2.0);
        let (x, pdf, o) = d.sample(0.1);
        assert_eq!(o, 0);
        assert_relative_eq!(pdf, 0.5);
        assert_relative_eq!(x, 0.2, max_relative = 1e-5);
        let (x, pdf, o) = d.sample(0.625);
        assert_eq!(o, 1);
        assert_relative_eq!(pdf, 1.5);
        assert_relative_eq!(x, 0.75, max_relative = 1e-5);
    }

    #[test]
    fn test_piecewise_constant_2d_pdf_matches_sample() {
        let func = [1.0, 2.0, 3.0, 4.0, 0.5, 0.5];
        let domain = Bounds2f::with_bounds(point2f!(-1, -1), point2f!(1, 1));
        let d = PiecewiseConstant2D::new(&func, 2, 3, domain);
        let mut rng = Xoshiro256Plus::seed_from_u64(29);
        for _ in 0..100 {
            let (p, pdf, _) = d.sample(rand_point2(&mut rng));
            assert_relative_eq!(pdf, d.pdf(p), max_relative = 1e-4);
        }
    }
}
