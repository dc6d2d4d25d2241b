use crate::geometry::bounds::Bounds3f;
use crate::geometry::Ray;
use crate::interaction::{Interaction, SHADOW_EPSILON};
use crate::light::DiffuseAreaLight;
use crate::primitive::{Aggregate, PrimitiveList};
use crate::shapes::ShapeIntersection;
use crate::Float;

/// Everything the integrators query while rendering: the geometry and the lights in it.
pub struct Scene<'a> {
    aggregate: PrimitiveList<'a>,
    lights: &'a [DiffuseAreaLight<'a>],
}

impl<'a> Scene<'a> {
    pub fn new(aggregate: PrimitiveList<'a>, lights: &'a [DiffuseAreaLight<'a>]) -> Self {
        Self { aggregate, lights }
    }

    pub fn intersect(&self, ray: &Ray, t_max: Float) -> Option<ShapeIntersection<'_>> {
        self.aggregate.intersect(ray, t_max)
    }

    pub fn intersect_p(&self, ray: &Ray, t_max: Float) -> bool {
        self.aggregate.intersect_p(ray, t_max)
    }

    /// Whether the segment between two points is free of occluders.
    pub fn unoccluded(&self, p0: &Interaction, p1: &Interaction) -> bool {
        !self.intersect_p(&p0.spawn_ray_to_interaction(p1), 1.0 - SHADOW_EPSILON)
    }

    pub fn lights(&self) -> &'a [DiffuseAreaLight<'a>] {
        self.lights
    }

    pub fn bounds(&self) -> Bounds3f {
        self.aggregate.bounds()
    }

    pub fn num_primitives(&self) -> usize {
        self.aggregate.len()
    }
}
