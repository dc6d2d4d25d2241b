use crate::geometry::bounds::Bounds3f;
use crate::geometry::{offset_ray_origin, Normal3, Ray};
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::interval::Point3fi;
use crate::{Float, Point2f, Point3f, Vec3f};

pub mod triangle;

pub use triangle::{intersect_triangle, Triangle, TriangleMesh};

pub trait Shape: Sync {
    fn bounds(&self) -> Bounds3f;

    fn area(&self) -> Float;

    /// Closest hit along `ray` with parametric distance below `t_max`.
    fn intersect<'a>(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>>;

    /// Occlusion-only variant of `intersect`.
    fn fast_intersect(&self, ray: &Ray, t_max: Float) -> bool;

    /// Samples a point uniformly by area.
    fn sample(&self, u: Point2f) -> Option<ShapeSample>;

    /// Samples a point as seen from a reference point, with a solid angle pdf.
    fn sample_from_ref(&self, ctx: &ShapeSampleContext, u: Point2f) -> Option<ShapeSample>;

    /// Solid angle density of sampling direction `wi` from the reference point.
    fn pdf_from_ref(&self, ctx: &ShapeSampleContext, wi: Vec3f) -> Float;
}

pub struct ShapeIntersection<'a> {
    pub intr: SurfaceInteraction<'a>,
    pub t_hit: Float,
}

#[derive(Clone, Copy, Debug)]
pub struct ShapeSample {
    pub intr: Interaction,
    pub pdf: Float,
}

/// The point a shape is being sampled from.
#[derive(Clone, Copy, Debug)]
pub struct ShapeSampleContext {
    pub pi: Point3fi,
    pub n: Normal3,
    pub ns: Normal3,
    pub time: Float,
}

impl ShapeSampleContext {
    pub fn new(pi: Point3fi, n: Normal3, ns: Normal3, time: Float) -> Self {
        Self { pi, n, ns, time }
    }

    pub fn from_interaction(intr: &Interaction) -> Self {
        Self::new(intr.pi, intr.n, intr.n, intr.time)
    }

    pub fn from_surface_interaction(si: &SurfaceInteraction) -> Self {
        Self::new(si.intr.pi, si.intr.n, si.shading_n, si.intr.time)
    }

    pub fn p(&self) -> Point3f {
        self.pi.point()
    }

    pub fn offset_ray_origin(&self, w: Vec3f) -> Point3f {
        offset_ray_origin(&self.pi, &self.n, w)
    }

    pub fn spawn_ray(&self, w: Vec3f) -> Ray {
        Ray { origin: self.offset_ray_origin(w), dir: w, time: self.time }
    }
}

/// Solid angle range, in steradians, inside which triangles are sampled by their spherical
/// projection. Outside it, area sampling is used instead.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolidAngleThresholds {
    pub min: Float,
    pub max: Float,
}

impl SolidAngleThresholds {
    pub fn use_spherical_sampling(&self, solid_angle: Float) -> bool {
        solid_angle >= self.min && solid_angle <= self.max
    }
}

impl Default for SolidAngleThresholds {
    fn default() -> Self {
        Self { min: 3e-4, max: 6.22 }
    }
}
