use anyhow::ensure;
use cgmath::{Deg, InnerSpace, Matrix, Matrix4, SquareMatrix, Transform as CgTransform};

use crate::interval::{gamma, Interval, Point3fi};
use crate::{Bounds3f, Float, Normal3, Point3f, Ray, RayDifferential, Vec3f, VectorExt};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub t: Matrix4<Float>,
    pub invt: Matrix4<Float>
}

const IDENTITY_MAT4: Matrix4<Float> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 1.0, 0.0,
    0.0, 0.0, 0.0, 1.0
);

impl Transform {

    pub const IDENTITY: Self = Transform::new(IDENTITY_MAT4, IDENTITY_MAT4);

    /// Creates a transform from a matrix, or `None` if the matrix is singular.
    pub fn from_mat(mat: Matrix4<Float>) -> Option<Self> {
        mat.invert().map(|m_inv| Self::new(mat, m_inv))
    }

    pub const fn new(mat: Matrix4<Float>, mat_inv: Matrix4<Float>) -> Self {
        let t = mat;
        let invt = mat_inv;
        Self { t, invt }
    }

    /// The world-to-camera transform of a camera at `pos` looking towards `look_at`.
    pub fn look_at(pos: Point3f, look_at: Point3f, up: Vec3f) -> anyhow::Result<Self> {
        let col3 = pos.to_homogeneous();
        let dir = (look_at - pos).normalize();
        let right = up.normalize().cross(dir);
        ensure!(right.magnitude2() > 0.0, "look_at: up vector {:?} and viewing direction {:?} are parallel", up, dir);
        let right = right.normalize();
        let new_up = dir.cross(right);

        let col0 = right.extend(0.0);
        let col1 = new_up.extend(0.0);
        let col2 = dir.extend(0.0);

        let mat = Matrix4::from_cols(col0, col1, col2, col3);
        let minv = mat.invert().ok_or_else(|| anyhow::anyhow!("look_at: camera matrix is singular"))?;
        Ok(Self::new(minv, mat))
    }

    /// The camera-to-world transform, i.e. the inverse of `look_at`.
    pub fn camera_look_at(pos: Point3f, look_at: Point3f, up: Vec3f) -> anyhow::Result<Self> {
        Ok(Self::look_at(pos, look_at, up)?.inverse())
    }

    pub fn translate(delta: Vec3f) -> Self {
        let m = Matrix4::from_translation(delta);
        let m_inv = Matrix4::from_translation(-delta);
        Self::new(m, m_inv)
    }

    pub fn scale(sx: Float, sy: Float, sz: Float) -> Self {
        let m = Matrix4::from_nonuniform_scale(sx, sy, sz);
        let m_inv = Matrix4::from_nonuniform_scale(1.0 / sx, 1.0 / sy, 1.0 / sz);
        Self::new(m, m_inv)
    }

    /// Rotation by `theta` degrees around `axis`.
    pub fn rotate(theta: Float, axis: Vec3f) -> Self {
        let m = Matrix4::from_axis_angle(axis.normalize(), Deg(theta));
        Self::new(m, m.transpose())
    }

    /// The rotation taking the unit vector `from` to the unit vector `to`, built from two
    /// reflections.
    pub fn rotate_from_to(from: Vec3f, to: Vec3f) -> Self {
        let refl = if from.x.abs() < 0.72 && to.x.abs() < 0.72 {
            vec3f!(1, 0, 0)
        } else if from.y.abs() < 0.72 && to.y.abs() < 0.72 {
            vec3f!(0, 1, 0)
        } else {
            vec3f!(0, 0, 1)
        };
        let u = refl - from;
        let v = refl - to;
        let uu = u.dot(u);
        let vv = v.dot(v);
        let uv = u.dot(v);

        let mut m = IDENTITY_MAT4;
        for i in 0..3 {
            for j in 0..3 {
                let delta = if i == j { 1.0 } else { 0.0 };
                // row i, column j
                m[j][i] = delta - 2.0 / uu * u[i] * u[j] - 2.0 / vv * v[i] * v[j] + 4.0 * uv / (uu * vv) * v[i] * u[j];
            }
        }
        Self::new(m, m.transpose())
    }

    pub fn perspective(fov: Float, near: Float, far: Float) -> Self {
        let a = far / (far - near);
        let b = -far * near / (far - near);
        let mat = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, a, 1.0,
            0.0, 0.0, b, 0.0
        );
        let mat_inv = Matrix4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0 / b,
            0.0, 0.0, 1.0, -a / b
        );

        let inv_tan_ang = 1.0 / (fov.to_radians() / 2.0).tan();
        Transform::scale(inv_tan_ang, inv_tan_ang, 1.0) * Self::new(mat, mat_inv)
    }

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn inverse(&self) -> Self {
        Self::new(self.invt, self.t)
    }

    pub fn swaps_handedness(&self) -> bool {
        let m = self.t;
        let det = m[0][0] * (m[1][1] * m[2][2] - m[2][1] * m[1][2])
            - m[1][0] * (m[0][1] * m[2][2] - m[2][1] * m[0][2])
            + m[2][0] * (m[0][1] * m[1][2] - m[1][1] * m[0][2]);
        det < 0.0
    }

    pub fn then(self, next: Self) -> Self {
        next * self
    }

    pub fn transform_normal(&self, n: &Normal3) -> Normal3 {
        // transform by the transpose of the inverse
        let x = self.invt[0][0]*n.x + self.invt[0][1]*n.y + self.invt[0][2]*n.z;
        let y = self.invt[1][0]*n.x + self.invt[1][1]*n.y + self.invt[1][2]*n.z;
        let z = self.invt[2][0]*n.x + self.invt[2][1]*n.y + self.invt[2][2]*n.z;
        Normal3(vec3f!(x, y, z))
    }

    pub fn transform<T: Transformable>(&self, obj: T) -> T {
        obj.transform(*self)
    }
}

impl std::ops::Mul for Transform {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(self.t * rhs.t, rhs.invt * self.invt)
    }
}

pub trait Transformable: Sized {
    fn transform(&self, t: Transform) -> Self;
}

impl Transformable for Vec3f {
    fn transform(&self, t: Transform) -> Self {
        t.t.transform_vector(*self)
    }
}

impl Transformable for Point3f {
    fn transform(&self, t: Transform) -> Self { t.t.transform_point(*self) }
}

impl Transformable for Normal3 {
    fn transform(&self, t: Transform) -> Self {
        t.transform_normal(self)
    }
}

impl Transformable for Bounds3f {
    fn transform(&self, t: Transform) -> Self {
        self.iter_corners().fold(Bounds3f::empty(), |b, p| {
            let pt = t.transform(p);
            b.join_point(pt)
        })
    }
}

/// Conservative error of an affine point transform, with the matrix indexed column-major.
fn point_transform_error(m: &Matrix4<Float>, p: Point3f) -> Vec3f {
    let row_abs_sum = |r: usize| {
        (m[0][r] * p.x).abs() + (m[1][r] * p.y).abs() + (m[2][r] * p.z).abs() + m[3][r].abs()
    };
    vec3f!(row_abs_sum(0), row_abs_sum(1), row_abs_sum(2)) * gamma(3)
}

impl Transformable for Point3fi {
    fn transform(&self, tf: Transform) -> Self {
        let p = self.point();
        let pt = tf.t.transform_point(p);
        let m = tf.t;

        let err = if self.is_exact() {
            point_transform_error(&m, p)
        } else {
            let perr = self.error();
            let row_err = |r: usize| {
                (gamma(3) + 1.0) *
                    (m[0][r].abs() * perr.x + m[1][r].abs() * perr.y + m[2][r].abs() * perr.z) +
                    gamma(3) * ((m[0][r] * p.x).abs() + (m[1][r] * p.y).abs() + (m[2][r] * p.z).abs() + m[3][r].abs())
            };
            vec3f!(row_err(0), row_err(1), row_err(2))
        };
        Point3fi::new(
            Interval::from_value_and_error(pt.x, err.x),
            Interval::from_value_and_error(pt.y, err.y),
            Interval::from_value_and_error(pt.z, err.z),
        )
    }
}

impl Transformable for Ray {
    fn transform(&self, t: Transform) -> Ray {
        let o_err = point_transform_error(&t.t, self.origin);
        let mut ot: Point3f = self.origin.transform(t);
        let dir: Vec3f = self.dir.transform(t);

        // Offset ray origin to edge of error bounds
        let len_sq = dir.magnitude2();
        if len_sq > 0.0 {
            let dt = dir.abs().dot(o_err) / len_sq;
            ot += dir * dt;
        }

        Ray { origin: ot, dir, time: self.time }
    }
}

impl Transformable for RayDifferential {
    fn transform(&self, t: Transform) -> Self {
        RayDifferential {
            ray: self.ray.transform(t),
            diff: self.diff.map(|diff| {
                crate::Differential {
                    rx_origin: diff.rx_origin.transform(t),
                    ry_origin: diff.ry_origin.transform(t),
                    rx_dir: diff.rx_dir.transform(t),
                    ry_dir: diff.ry_dir.transform(t),
                }
            })
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use cgmath::assert_abs_diff_eq as cg_assert_abs_diff_eq;

    #[test]
    fn test_translate_point_and_vector() {
        let t = Transform::translate(vec3f!(1, 2, 3));
        assert_eq!(t.transform(point3f!(0, 0, 0)), point3f!(1, 2, 3));
        assert_eq!(t.transform(vec3f!(1, 0, 0)), vec3f!(1, 0, 0));
        assert_eq!(t.inverse().transform(point3f!(1, 2, 3)), point3f!(0, 0, 0));
    }

    #[test]
    fn test_normal_stays_perpendicular() {
        let t = Transform::scale(1.0, 4.0, 0.5) * Transform::rotate(30.0, vec3f!(1, 1, 0));
        let tangent = vec3f!(1, -1, 0);
        let n = Normal3::new(0.0, 0.0, 1.0);
        let tt = t.transform(tangent);
        let nt = t.transform(n);
        assert_abs_diff_eq!(tt.dot(nt.0), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_swaps_handedness() {
        assert!(!Transform::IDENTITY.swaps_handedness());
        assert!(Transform::scale(-1.0, 1.0, 1.0).swaps_handedness());
        assert!(!Transform::rotate(90.0, vec3f!(0, 1, 0)).swaps_handedness());
    }

    #[test]
    fn test_perspective_inverse() {
        let p = Transform::perspective(45.0, 1e-2, 1000.0);
        let m = p.t * p.invt;
        cg_assert_abs_diff_eq!(m, Matrix4::identity(), epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_rejects_parallel_up() {
        assert!(Transform::look_at(point3f!(0, 0, 0), point3f!(0, 1, 0), vec3f!(0, 1, 0)).is_err());
        let cam = Transform::camera_look_at(point3f!(0, 0, -5), point3f!(0, 0, 0), vec3f!(0, 1, 0)).unwrap();
        cg_assert_abs_diff_eq!(cam.transform(point3f!(0, 0, 0)), point3f!(0, 0, -5), epsilon = 1e-6);
        cg_assert_abs_diff_eq!(cam.transform(vec3f!(0, 0, 1)), vec3f!(0, 0, 1), epsilon = 1e-6);
    }

    #[test]
    fn test_point_interval_transform_contains_result() {
        let t = Transform::rotate(17.0, vec3f!(0.2, 1, 0.3)) * Transform::translate(vec3f!(10, -3, 2));
        let p = point3f!(0.3, 0.7, -1.1);
        let pi = Point3fi::exact(p).transform(t);
        let exact = t.transform(p);
        assert!(pi.contains(exact));
        assert!(!pi.is_exact());
    }

    #[test]
    fn test_rotate_from_to() {
        let from = vec3f!(0.3, -0.5, 0.8).normalize();
        let to = vec3f!(0, 0, 1);
        let r = Transform::rotate_from_to(from, to);
        cg_assert_abs_diff_eq!(r.transform(from), to, epsilon = 1e-5);
        cg_assert_abs_diff_eq!(r.inverse().transform(to), from, epsilon = 1e-5);
        let other = vec3f!(1, 2, 3);
        assert_abs_diff_eq!(r.transform(other).magnitude(), other.magnitude(), epsilon = 1e-4);
    }
}
