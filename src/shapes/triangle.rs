use anyhow::{bail, ensure};
use cgmath::{EuclideanSpace, InnerSpace, Vector3, Zero};
use tracing::{debug, trace};

use crate::geometry::{
    abs_dot, coordinate_system, distance_squared, point_from_barycentric, Bounds3f, Normal3, Ray,
    Transform, VectorExt,
};
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::interval::{gamma, Point3fi};
use crate::renderer::apply_transform;
use crate::sampling::{
    bilinear_pdf, invert_spherical_triangle_sample, sample_bilinear, sample_spherical_triangle,
    sample_uniform_triangle, spherical_triangle_area,
};
use crate::shapes::{Shape, ShapeIntersection, ShapeSample, ShapeSampleContext, SolidAngleThresholds};
use crate::{difference_of_products, Float, Point2f, Point3f, Vec3f};

/// Vertex data shared by every triangle of a mesh, already transformed to render space.
pub struct TriangleMesh {
    pub n_triangles: usize,

    vertex_indices: Vec<u32>,

    p: Vec<Point3f>,

    n: Option<Vec<Normal3>>,

    uv: Option<Vec<Point2f>>,

    pub reverse_orientation: bool,

    pub transform_swaps_handedness: bool,

    pub solid_angle_thresholds: SolidAngleThresholds,
}

impl TriangleMesh {
    pub fn new(
        render_from_object: &Transform,
        reverse_orientation: bool,
        vertex_indices: Vec<u32>,
        mut p: Vec<Point3f>,
        n: Option<Vec<Normal3>>,
        uv: Option<Vec<Point2f>>,
    ) -> anyhow::Result<Self> {
        ensure!(vertex_indices.len() % 3 == 0, "mesh index count {} is not a multiple of 3", vertex_indices.len());
        let n_triangles = vertex_indices.len() / 3;
        let n_vertices = p.len();

        if let Some(&bad) = vertex_indices.iter().find(|&&i| i as usize >= n_vertices) {
            bail!("mesh vertex index {} out of range for {} vertices", bad, n_vertices);
        }
        if let Some(ref normals) = n {
            ensure!(normals.len() == n_vertices, "mesh has {} normals for {} vertices", normals.len(), n_vertices);
        }
        if let Some(ref uv) = uv {
            ensure!(uv.len() == n_vertices, "mesh has {} uvs for {} vertices", uv.len(), n_vertices);
        }

        apply_transform(&mut p, *render_from_object);

        let n = n.map(|mut normals| {
            apply_transform(&mut normals, *render_from_object);
            if reverse_orientation {
                normals.iter_mut().for_each(|n| *n = -*n);
            }
            normals
        });

        debug!(triangles = n_triangles, vertices = n_vertices, "built triangle mesh");

        Ok(Self {
            n_triangles,
            vertex_indices,
            p,
            n,
            uv,
            reverse_orientation,
            transform_swaps_handedness: render_from_object.swaps_handedness(),
            solid_angle_thresholds: SolidAngleThresholds::default(),
        })
    }

    pub fn with_solid_angle_thresholds(mut self, thresholds: SolidAngleThresholds) -> Self {
        self.solid_angle_thresholds = thresholds;
        self
    }

    pub fn vertices(&self) -> &[Point3f] {
        &self.p
    }

    pub fn has_normals(&self) -> bool {
        self.n.is_some()
    }
}

/// Barycentric coordinates and parametric distance of a ray-triangle hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleIntersection {
    pub b0: Float,
    pub b1: Float,
    pub b2: Float,
    pub t: Float,
}

/// Watertight ray-triangle test.
///
/// The triangle is moved into a coordinate system where the ray starts at the origin and runs
/// along +z, so that the hit test reduces to 2D edge functions that are evaluated consistently
/// for edges shared between neighbouring triangles. The returned `t` is guaranteed to be
/// greater than zero including its rounding error.
pub fn intersect_triangle(ray: &Ray, t_max: Float, p0: Point3f, p1: Point3f, p2: Point3f) -> Option<TriangleIntersection> {
    // reject degenerate triangles
    if (p2 - p0).cross(p1 - p0).magnitude2() == 0.0 {
        return None;
    }

    // translate vertices based on ray origin
    let p0t = p0 - ray.origin;
    let p1t = p1 - ray.origin;
    let p2t = p2 - ray.origin;

    // permute components so that the largest ray direction component becomes z
    let kz = ray.dir.abs().max_dimension();
    let kx = (kz + 1) % 3;
    let ky = (kx + 1) % 3;
    let perm = [kx, ky, kz];
    let d = ray.dir.permute(perm);
    let mut p0t = p0t.permute(perm);
    let mut p1t = p1t.permute(perm);
    let mut p2t = p2t.permute(perm);

    // Apply a shear transformation to align the ray with the +z axis.
    // Only shear the x and y dimensions of the vertices at first, wait to apply the z shear
    // if the ray actually intersects the triangle.
    let shear_x = -d.x / d.z;
    let shear_y = -d.y / d.z;
    let shear_z = 1.0 / d.z;
    p0t.x += shear_x * p0t.z;
    p0t.y += shear_y * p0t.z;
    p1t.x += shear_x * p1t.z;
    p1t.y += shear_y * p1t.z;
    p2t.x += shear_x * p2t.z;
    p2t.y += shear_y * p2t.z;

    // compute edge function coefficients
    let mut e0 = difference_of_products(p1t.x, p2t.y, p1t.y, p2t.x); // p1 to p2
    let mut e1 = difference_of_products(p2t.x, p0t.y, p2t.y, p0t.x); // p2 to p0
    let mut e2 = difference_of_products(p0t.x, p1t.y, p0t.y, p1t.x); // p0 to p1

    // fall back on double precision when the ray passes exactly through an edge
    if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
        let p2txp1ty = p2t.x as f64 * p1t.y as f64;
        let p2typ1tx = p2t.y as f64 * p1t.x as f64;
        e0 = (p2typ1tx - p2txp1ty) as Float;
        let p0txp2ty = p0t.x as f64 * p2t.y as f64;
        let p0typ2tx = p0t.y as f64 * p2t.x as f64;
        e1 = (p0typ2tx - p0txp2ty) as Float;
        let p1txp0ty = p1t.x as f64 * p0t.y as f64;
        let p1typ0tx = p1t.y as f64 * p0t.x as f64;
        e2 = (p1typ0tx - p1txp0ty) as Float;
    }

    // if the edge function signs are mixed, (0, 0) lies outside the triangle
    if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
        return None;
    }

    let det = e0 + e1 + e2;
    if det == 0.0 {
        return None;
    }

    // Compute scaled hit distance to triangle and test against ray t range
    p0t.z *= shear_z;
    p1t.z *= shear_z;
    p2t.z *= shear_z;
    let t_scaled = e0 * p0t.z + e1 * p1t.z + e2 * p2t.z;
    if det < 0.0 && (t_scaled >= 0.0 || t_scaled < t_max * det) {
        return None;
    } else if det > 0.0 && (t_scaled <= 0.0 || t_scaled > t_max * det) {
        return None;
    }

    // now we know there is a valid intersection.
    // compute barycentric coordinates and actual t value.
    let inv_det = 1.0 / det;
    let b0 = e0 * inv_det;
    let b1 = e1 * inv_det;
    let b2 = e2 * inv_det;
    let t = t_scaled * inv_det;

    // ensure that t is conservatively greater than zero
    let max_zt = Vector3::new(p0t.z, p1t.z, p2t.z).abs().max_component();
    let delta_z = gamma(3) * max_zt;

    let max_xt = Vector3::new(p0t.x, p1t.x, p2t.x).abs().max_component();
    let max_yt = Vector3::new(p0t.y, p1t.y, p2t.y).abs().max_component();
    let delta_x = gamma(5) * (max_xt + max_zt);
    let delta_y = gamma(5) * (max_yt + max_zt);

    let delta_e = 2.0 * (gamma(2) * max_xt * max_yt + delta_y * max_xt + delta_x * max_yt);

    let max_e = Vector3::new(e0, e1, e2).abs().max_component();
    let delta_t = 3.0 * (gamma(3) * max_e * max_zt + delta_e * max_zt + delta_z * max_e) * inv_det.abs();
    if t <= delta_t {
        return None;
    }

    Some(TriangleIntersection { b0, b1, b2, t })
}

/// `a * b - c * d` for a scalar times a vector, component by component.
fn difference_of_products_vec(a: Float, b: Vec3f, c: Float, d: Vec3f) -> Vec3f {
    Vec3f::new(
        difference_of_products(a, b.x, c, d.x),
        difference_of_products(a, b.y, c, d.y),
        difference_of_products(a, b.z, c, d.z),
    )
}

/// Rounding error bound of a barycentric combination of the three vertices.
fn barycentric_error(b: [Float; 3], p: &[Point3f; 3], n_ops: i32) -> Vec3f {
    let abs_sum = (b[0] * p[0].to_vec()).abs() + (b[1] * p[1].to_vec()).abs() + (b[2] * p[2].to_vec()).abs();
    abs_sum * gamma(n_ops)
}

/// A triangle referring to its vertices in a shared `TriangleMesh`.
#[derive(Clone, Copy)]
pub struct Triangle<'m> {
    mesh: &'m TriangleMesh,
    tri_index: usize,
}

impl<'m> Triangle<'m> {
    pub fn new(mesh: &'m TriangleMesh, tri_index: usize) -> Self {
        debug_assert!(tri_index < mesh.n_triangles);
        Self { mesh, tri_index }
    }

    pub fn mesh(&self) -> &'m TriangleMesh {
        self.mesh
    }

    pub fn index(&self) -> usize {
        self.tri_index
    }

    fn vertex_indices(&self) -> [usize; 3] {
        let v = &self.mesh.vertex_indices[3 * self.tri_index..3 * self.tri_index + 3];
        [v[0] as usize, v[1] as usize, v[2] as usize]
    }

    pub fn points(&self) -> [Point3f; 3] {
        let v = self.vertex_indices();
        [self.mesh.p[v[0]], self.mesh.p[v[1]], self.mesh.p[v[2]]]
    }

    fn uvs(&self) -> [Point2f; 3] {
        self.mesh.uv.as_ref().map_or_else(
            || [Point2f::new(0.0, 0.0), Point2f::new(1.0, 0.0), Point2f::new(1.0, 1.0)],
            |uvs| {
                let v = self.vertex_indices();
                [uvs[v[0]], uvs[v[1]], uvs[v[2]]]
            },
        )
    }

    fn uv_at(&self, b: [Float; 3]) -> Point2f {
        let uv = self.uvs();
        Point2f::from_vec(b[0] * uv[0].to_vec() + b[1] * uv[1].to_vec() + b[2] * uv[2].to_vec())
    }

    /// Solid angle subtended by the triangle as seen from `p`.
    pub fn solid_angle(&self, p: Point3f) -> Float {
        let [p0, p1, p2] = self.points();
        spherical_triangle_area((p0 - p).normalize(), (p1 - p).normalize(), (p2 - p).normalize())
    }

    /// Surface normal of a sampled point, oriented like the interpolated shading normal if the
    /// mesh has one, else by the mesh orientation flags.
    fn sampled_normal(&self, b: [Float; 3]) -> Normal3 {
        let [p0, p1, p2] = self.points();
        let n = Normal3((p1 - p0).cross(p2 - p0).normalize());
        if let Some(ref normals) = self.mesh.n {
            let v = self.vertex_indices();
            let ns = b[0] * normals[v[0]] + b[1] * normals[v[1]] + (1.0 - b[0] - b[1]) * normals[v[2]];
            n.faceforward(ns.0)
        } else if self.mesh.reverse_orientation ^ self.mesh.transform_swaps_handedness {
            -n
        } else {
            n
        }
    }

    /// Bilinear warp weights approximating the cosine factor at the reference point.
    fn warp_weights(&self, ctx: &ShapeSampleContext) -> [Float; 4] {
        let rp = ctx.p();
        let [p0, p1, p2] = self.points();
        let wi = [(p0 - rp).normalize(), (p1 - rp).normalize(), (p2 - rp).normalize()];
        let w = |i: usize| Float::max(0.01, abs_dot(ctx.ns.0, wi[i]));
        [w(1), w(1), w(0), w(2)]
    }

    fn interaction_from_intersection<'a>(&self, ti: &TriangleIntersection, time: Float, wo: Vec3f) -> SurfaceInteraction<'a> {
        let v = self.vertex_indices();
        let p = self.points();
        let [p0, p1, p2] = p;
        let uv = self.uvs();
        let b = [ti.b0, ti.b1, ti.b2];

        // compute triangle partial derivatives
        let duv02 = uv[0] - uv[2];
        let duv12 = uv[1] - uv[2];
        let dp02 = p0 - p2;
        let dp12 = p1 - p2;
        let determinant = difference_of_products(duv02.x, duv12.y, duv02.y, duv12.x);
        let degenerate_uv = determinant.abs() < 1e-9;

        let (mut dpdu, mut dpdv) = (Vec3f::zero(), Vec3f::zero());
        if !degenerate_uv {
            let invdet = 1.0 / determinant;
            dpdu = difference_of_products_vec(duv12.y, dp02, duv02.y, dp12) * invdet;
            dpdv = difference_of_products_vec(duv02.x, dp12, duv12.x, dp02) * invdet;
        }
        if degenerate_uv || dpdu.cross(dpdv).magnitude2() == 0.0 {
            let mut ng = (p2 - p0).cross(p1 - p0);
            if ng.magnitude2() == 0.0 {
                let a = (p2 - p0).map(|x| x as f64);
                let b = (p1 - p0).map(|x| x as f64);
                ng = a.cross(b).map(|x| x as Float);
            }
            trace!(triangle = self.tri_index, "degenerate uv parameterization");
            let (u, v) = coordinate_system(ng.normalize());
            dpdu = u;
            dpdv = v;
        }

        let p_hit = point_from_barycentric(b, p);
        let p_err = barycentric_error(b, &p, 7);
        let uv_hit = self.uv_at(b);

        let flip_normal = self.mesh.reverse_orientation ^ self.mesh.transform_swaps_handedness;
        let mut isect = SurfaceInteraction::new(
            Point3fi::from_value_and_error(p_hit, p_err),
            uv_hit,
            wo,
            dpdu,
            dpdv,
            Normal3::zero(),
            Normal3::zero(),
            time,
            flip_normal,
        );

        // the geometric normal follows the vertex winding rather than the uv parameterization
        let mut n = Normal3(dp02.cross(dp12).normalize());
        if flip_normal {
            n = -n;
        }
        isect.intr.n = n;
        isect.shading_n = n;

        if let Some(ref normals) = self.mesh.n {
            let ns = ti.b0 * normals[v[0]] + ti.b1 * normals[v[1]] + ti.b2 * normals[v[2]];
            let ns = if ns.magnitude2() > 0.0 {
                ns.normalize()
            } else {
                trace!(triangle = self.tri_index, "zero-length interpolated shading normal");
                isect.intr.n
            };

            let mut ss = isect.geom.dpdu;
            let mut ts = ns.cross(ss);
            if ts.magnitude2() > 0.0 {
                ss = ts.cross(ns.0);
            } else {
                let (s, t) = coordinate_system(ns.0);
                ss = s;
                ts = t;
            }

            let dn1 = normals[v[0]] - normals[v[2]];
            let dn2 = normals[v[1]] - normals[v[2]];
            let (dndu, dndv) = if determinant.abs() < 1e-32 {
                let dn = (normals[v[2]] - normals[v[0]]).cross((normals[v[1]] - normals[v[0]]).0);
                if dn.magnitude2() == 0.0 {
                    (Normal3::zero(), Normal3::zero())
                } else {
                    let (dnu, dnv) = coordinate_system(dn.normalize());
                    (Normal3(dnu), Normal3(dnv))
                }
            } else {
                let inv_det = 1.0 / determinant;
                (
                    Normal3(difference_of_products_vec(duv12.y, dn1.0, duv02.y, dn2.0) * inv_det),
                    Normal3(difference_of_products_vec(duv02.x, dn2.0, duv12.x, dn1.0) * inv_det),
                )
            };

            isect.set_shading_geometry(ns, ss, ts, dndu, dndv, true);
        }

        isect
    }
}

impl<'m> Shape for Triangle<'m> {
    fn bounds(&self) -> Bounds3f {
        Bounds3f::from_points(self.points())
    }

    fn area(&self) -> Float {
        let [p0, p1, p2] = self.points();
        0.5 * (p1 - p0).cross(p2 - p0).magnitude()
    }

    fn intersect<'a>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        let [p0, p1, p2] = self.points();
        let ti = intersect_triangle(ray, t_max, p0, p1, p2)?;
        let intr = self.interaction_from_intersection(&ti, ray.time, -ray.dir);
        Some(ShapeIntersection { intr, t_hit: ti.t })
    }

    fn fast_intersect(&self, ray: &Ray, t_max: Float) -> bool {
        let [p0, p1, p2] = self.points();
        intersect_triangle(ray, t_max, p0, p1, p2).is_some()
    }

    fn sample(&self, u: Point2f) -> Option<ShapeSample> {
        let p = self.points();
        let b = sample_uniform_triangle(u);
        let p_sample = point_from_barycentric(b, p);
        let p_err = barycentric_error(b, &p, 6);

        let intr = Interaction::new(
            Point3fi::from_value_and_error(p_sample, p_err),
            self.sampled_normal(b),
            self.uv_at(b),
            Vec3f::zero(),
            0.0,
        );
        Some(ShapeSample { intr, pdf: 1.0 / self.area() })
    }

    fn sample_from_ref(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample> {
        let solid_angle = self.solid_angle(ctx.p());
        if !self.mesh.solid_angle_thresholds.use_spherical_sampling(solid_angle) {
            // sample by area and convert the density to solid angle
            let mut ss = self.sample(u)?;
            ss.intr.time = ctx.time;
            let wi = ss.intr.p() - ctx.p();
            if wi.magnitude2() == 0.0 {
                return None;
            }
            let wi = wi.normalize();
            ss.pdf /= abs_dot(ss.intr.n.0, -wi) / distance_squared(ctx.p(), ss.intr.p());
            if ss.pdf.is_infinite() {
                return None;
            }
            return Some(ss);
        }

        let mut pdf = 1.0;
        let mut u = u;
        if !ctx.ns.is_zero() {
            let w = self.warp_weights(ctx);
            u = sample_bilinear(u, &w);
            pdf = bilinear_pdf(u, &w);
        }

        let p = self.points();
        let (b, tri_pdf) = sample_spherical_triangle(&p, ctx.p(), u)?;
        if tri_pdf == 0.0 {
            return None;
        }
        pdf *= tri_pdf;

        let p_sample = point_from_barycentric(b, p);
        let p_err = barycentric_error(b, &p, 6);
        let intr = Interaction::new(
            Point3fi::from_value_and_error(p_sample, p_err),
            self.sampled_normal(b),
            self.uv_at(b),
            Vec3f::zero(),
            ctx.time,
        );
        Some(ShapeSample { intr, pdf })
    }

    fn pdf_from_ref(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float {
        let solid_angle = self.solid_angle(ctx.p());
        if !self.mesh.solid_angle_thresholds.use_spherical_sampling(solid_angle) {
            let ray = ctx.spawn_ray(wi);
            let isect = match self.intersect(&ray, Float::INFINITY) {
                Some(isect) => isect,
                None => return 0.0,
            };
            let pdf = (1.0 / self.area())
                / (abs_dot(isect.intr.intr.n.0, -wi) / distance_squared(ctx.p(), isect.intr.p()));
            return if pdf.is_infinite() { 0.0 } else { pdf };
        }

        let mut pdf = 1.0 / solid_angle;
        if !ctx.ns.is_zero() {
            let p = self.points();
            let u = invert_spherical_triangle_sample(&p, ctx.p(), wi).unwrap_or_else(|| Point2f::new(0.0, 0.0));
            pdf *= bilinear_pdf(u, &self.warp_weights(ctx));
        }
        pdf
    }
}
