use std::ops::{Add, Deref, Mul, Neg, Sub};

use cgmath::{EuclideanSpace, InnerSpace};

use crate::interval::{next_float_down, next_float_up, Point3fi};
use crate::math::{safe_asin, PI};
use crate::{Float, Point3f, Vec3f};

pub mod bounds;
pub mod transform;

pub use bounds::*;
pub use transform::*;

pub fn distance(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude()
}

pub fn distance_squared(p1: Point3f, p2: Point3f) -> Float {
    (p1 - p2).magnitude2()
}

pub fn abs_dot(v1: Vec3f, v2: Vec3f) -> Float {
    v1.dot(v2).abs()
}

/// Removes the component of `v` along the unit vector `w`.
pub fn gram_schmidt(v: Vec3f, w: Vec3f) -> Vec3f {
    v - v.dot(w) * w
}

/// Angle between two normalized vectors, accurate for nearly parallel inputs.
pub fn angle_between(v1: Vec3f, v2: Vec3f) -> Float {
    if v1.dot(v2) < 0.0 {
        PI - 2.0 * safe_asin((v1 + v2).magnitude() / 2.0)
    } else {
        2.0 * safe_asin((v2 - v1).magnitude() / 2.0)
    }
}

pub fn spherical_direction(sin_theta: Float, cos_theta: Float, phi: Float) -> Vec3f {
    let sin_theta = sin_theta.clamp(-1.0, 1.0);
    Vec3f::new(
        sin_theta * phi.cos(),
        sin_theta * phi.sin(),
        cos_theta.clamp(-1.0, 1.0),
    )
}

/// Builds two vectors that form an orthonormal basis together with the unit vector `v1`.
pub fn coordinate_system(v1: Vec3f) -> (Vec3f, Vec3f) {
    let sign = (1.0 as Float).copysign(v1.z);
    let a = -1.0 / (sign + v1.z);
    let b = v1.x * v1.y * a;
    let v2 = Vec3f::new(1.0 + sign * v1.x * v1.x * a, sign * b, -sign * v1.x);
    let v3 = Vec3f::new(b, sign + v1.y * v1.y * a, -v1.y);
    (v2, v3)
}

pub trait VectorExt {
    fn abs(self) -> Self;

    fn permute(self, perm: [usize; 3]) -> Self;

    fn max_dimension(self) -> usize;

    fn max_component(self) -> Float;
}

impl VectorExt for Vec3f {
    fn abs(self) -> Self {
        self.map(Float::abs)
    }

    fn permute(self, perm: [usize; 3]) -> Self {
        Vec3f::new(self[perm[0]], self[perm[1]], self[perm[2]])
    }

    fn max_dimension(self) -> usize {
        if self.x > self.y {
            if self.x > self.z { 0 } else { 2 }
        } else if self.y > self.z {
            1
        } else {
            2
        }
    }

    fn max_component(self) -> Float {
        self.x.max(self.y).max(self.z)
    }
}

/// Offsets the origin of a ray leaving the error-bounded point `pi` far enough along the normal
/// that the ray cannot re-intersect the surface it starts on.
pub fn offset_ray_origin(pi: &Point3fi, n: &Normal3, w: Vec3f) -> Point3f {
    let d = n.abs().dot(pi.error());
    let mut offset = d * n.0;
    if w.dot(n.0) < 0.0 {
        offset = -offset;
    }
    let mut po: Point3f = pi.point() + offset;
    for i in 0..3 {
        if offset[i] > 0.0 { po[i] = next_float_up(po[i]) }
        else if offset[i] < 0.0 { po[i] = next_float_down(po[i]) }
    }

    po
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Point3f,
    pub dir: Vec3f,
    pub time: Float,
}

impl Ray {
    pub fn new(origin: Point3f, dir: Vec3f) -> Self {
        Self { origin, dir, time: 0.0 }
    }

    pub fn at(&self, t: Float) -> Point3f {
        self.origin + (self.dir * t)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Differential {
    pub rx_origin: Point3f,
    pub ry_origin: Point3f,
    pub rx_dir: Vec3f,
    pub ry_dir: Vec3f,
}

/// A ray along with two auxiliary rays offset by one pixel in x and y on the film.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayDifferential {
    pub ray: Ray,
    pub diff: Option<Differential>,
}

impl RayDifferential {
    pub fn new(ray: Ray) -> Self {
        Self { ray, diff: None }
    }

    pub fn scale_differentials(&mut self, s: Float) {
        let ray = self.ray;
        if let Some(diff) = &mut self.diff {
            diff.rx_origin = ray.origin + (diff.rx_origin - ray.origin) * s;
            diff.ry_origin = ray.origin + (diff.ry_origin - ray.origin) * s;
            diff.rx_dir = ray.dir + (diff.rx_dir - ray.dir) * s;
            diff.ry_dir = ray.dir + (diff.ry_dir - ray.dir) * s;
        }
    }
}

impl From<Ray> for RayDifferential {
    fn from(ray: Ray) -> Self {
        Self::new(ray)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Normal3(pub Vec3f);

impl Normal3 {
    pub fn new(x: Float, y: Float, z: Float) -> Self {
        Self(Vec3f::new(x, y, z))
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.0.x == 0.0 && self.0.y == 0.0 && self.0.z == 0.0
    }

    pub fn normalize(self) -> Self {
        Self(self.0.normalize())
    }

    /// Flips the normal so that it lies in the same hemisphere as `v`.
    pub fn faceforward(self, v: Vec3f) -> Self {
        if self.dot(v) < 0.0 {
            Self(-self.0)
        } else {
            self
        }
    }
}

impl Deref for Normal3 {
    type Target = Vec3f;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec3f> for Normal3 {
    fn from(v: Vec3f) -> Self {
        Self(v)
    }
}

impl From<Normal3> for Vec3f {
    fn from(n: Normal3) -> Self {
        n.0
    }
}

impl Neg for Normal3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Add for Normal3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Normal3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Float> for Normal3 {
    type Output = Self;

    fn mul(self, rhs: Float) -> Self {
        Self(self.0 * rhs)
    }
}

impl Mul<Normal3> for Float {
    type Output = Normal3;

    fn mul(self, rhs: Normal3) -> Normal3 {
        Normal3(rhs.0 * self)
    }
}

/// Returns `n` flipped, if necessary, to lie in the hemisphere of `v`.
pub fn face_forward(n: Vec3f, v: Vec3f) -> Vec3f {
    if n.dot(v) < 0.0 { -n } else { n }
}

/// An orthonormal basis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub x: Vec3f,
    pub y: Vec3f,
    pub z: Vec3f,
}

impl Frame {
    pub fn from_xz(x: Vec3f, z: Vec3f) -> Self {
        Self { x, y: z.cross(x), z }
    }

    pub fn from_z(z: Vec3f) -> Self {
        let (x, y) = coordinate_system(z);
        Self { x, y, z }
    }

    pub fn to_local(&self, v: Vec3f) -> Vec3f {
        Vec3f::new(v.dot(self.x), v.dot(self.y), v.dot(self.z))
    }

    pub fn from_local(&self, v: Vec3f) -> Vec3f {
        self.x * v.x + self.y * v.y + self.z * v.z
    }
}

pub fn point_from_barycentric(b: [Float; 3], p: [Point3f; 3]) -> Point3f {
    Point3f::from_vec(b[0] * p[0].to_vec() + b[1] * p[1].to_vec() + b[2] * p[2].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_coordinate_system_is_orthonormal() {
        let dirs = [
            vec3f!(0, 0, 1),
            vec3f!(0, 0, -1),
            vec3f!(1, 2, 3).normalize(),
            vec3f!(-0.3, 0.9, -0.1).normalize(),
        ];
        for &v in &dirs {
            let (a, b) = coordinate_system(v);
            assert_abs_diff_eq!(a.magnitude(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(b.magnitude(), 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(a.dot(v), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(b.dot(v), 0.0, epsilon = 1e-5);
            assert_abs_diff_eq!(a.dot(b), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = Frame::from_z(vec3f!(1, 1, 0).normalize());
        let v = vec3f!(0.3, -2.0, 5.0);
        let back = frame.from_local(frame.to_local(v));
        assert_abs_diff_eq!(back, v, epsilon = 1e-5);
    }

    #[test]
    fn test_angle_between() {
        assert_abs_diff_eq!(angle_between(vec3f!(1, 0, 0), vec3f!(0, 1, 0)), PI / 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(angle_between(vec3f!(1, 0, 0), vec3f!(-1, 0, 0)), PI, epsilon = 1e-6);
        assert_abs_diff_eq!(angle_between(vec3f!(1, 0, 0), vec3f!(1, 0, 0)), 0.0);
    }

    #[test]
    fn test_offset_ray_origin_moves_off_surface() {
        let p = Point3fi::from_value_and_error(point3f!(0, 0, 0), vec3f!(1e-4, 1e-4, 1e-4));
        let n = Normal3::new(0.0, 0.0, 1.0);
        let up = offset_ray_origin(&p, &n, vec3f!(0, 0, 1));
        let down = offset_ray_origin(&p, &n, vec3f!(0, 0, -1));
        assert!(up.z > 1e-4);
        assert!(down.z < -1e-4);
    }

    #[test]
    fn test_max_dimension() {
        assert_eq!(vec3f!(1, 5, 2).max_dimension(), 1);
        assert_eq!(vec3f!(-1, -5, -2).abs().max_dimension(), 1);
        assert_eq!(vec3f!(0, 0, 1).max_dimension(), 2);
    }
}
