use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::light::DiffuseAreaLight;
use crate::material::Material;
use crate::shapes::{Shape, ShapeIntersection, Triangle};
use crate::Float;

/// The acceleration structure contract: closest-hit and occlusion queries over a set of
/// primitives.
pub trait Aggregate: Sync {
    fn bounds(&self) -> Bounds3f;

    fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'_>>;

    /// Whether anything blocks `ray` before `t_max`.
    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool;
}

/// A triangle with the material and area light it was declared with. A primitive without a
/// material is only the surface of an emitter or an invisible boundary.
#[derive(Clone, Copy)]
pub struct GeometricPrimitive<'a> {
    shape: Triangle<'a>,
    material: Option<&'a Material>,
    area_light: Option<&'a DiffuseAreaLight<'a>>,
}

impl<'a> GeometricPrimitive<'a> {
    pub fn new(shape: Triangle<'a>, material: Option<&'a Material>, area_light: Option<&'a DiffuseAreaLight<'a>>) -> Self {
        Self { shape, material, area_light }
    }

    pub fn bounds(&self) -> Bounds3f {
        self.shape.bounds()
    }

    pub fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'a>> {
        let mut si = self.shape.intersect(ray, t_max)?;
        si.intr.set_intersection_properties(self.material, self.area_light);
        Some(si)
    }

    pub fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.shape.fast_intersect(ray, t_max)
    }
}

/// Tests every primitive in turn. Adequate for the small procedural scenes rendered here.
pub struct PrimitiveList<'a> {
    prims: Vec<GeometricPrimitive<'a>>,
    bounds: Bounds3f,
}

impl<'a> PrimitiveList<'a> {
    pub fn new(prims: Vec<GeometricPrimitive<'a>>) -> Self {
        let bounds = prims.iter().fold(Bounds3f::empty(), |b, p| b.join(&p.bounds()));
        Self { prims, bounds }
    }

    pub fn len(&self) -> usize {
        self.prims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prims.is_empty()
    }
}

impl Aggregate for PrimitiveList<'_> {
    fn bounds(&self) -> Bounds3f {
        self.bounds
    }

    fn intersect(&self, ray: &Ray, mut t_max: Float) -> Option<ShapeIntersection<'_>> {
        let mut closest = None;
        for prim in &self.prims {
            if let Some(si) = prim.intersect(ray, t_max) {
                t_max = si.t_hit;
                closest = Some(si);
            }
        }
        closest
    }

    fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.prims.iter().any(|p| p.intersect_p(ray, t_max))
    }
}
