use cgmath::InnerSpace;

use crate::geometry::Normal3;
use crate::light::{LightLiSample, LightSampleContext};
use crate::shapes::{Shape, Triangle};
use crate::spectrum::{SampledSpectrum, SampledWavelengths, Spectrum};
use crate::{distance_squared, Float, Point2f, Point3f, Vec3f, PI};

/// Uniform emission from one side (or both sides) of a triangle.
#[derive(Clone, Copy)]
pub struct DiffuseAreaLight<'m> {
    shape: Triangle<'m>,
    l_emit: &'m Spectrum,
    scale: Float,
    two_sided: bool,
    area: Float,
}

impl<'m> DiffuseAreaLight<'m> {
    pub fn new(shape: Triangle<'m>, l_emit: &'m Spectrum, scale: Float, two_sided: bool) -> Self {
        let area = shape.area();
        Self { shape, l_emit, scale, two_sided, area }
    }

    pub fn shape(&self) -> &Triangle<'m> {
        &self.shape
    }

    /// Emitted radiance leaving the point `p` with normal `n` in direction `w`.
    pub fn l(&self, _p: Point3f, n: Normal3, _uv: Point2f, w: Vec3f, lambda: &SampledWavelengths) -> SampledSpectrum {
        if !self.two_sided && n.dot(w) < 0.0 {
            return SampledSpectrum::zero();
        }
        self.l_emit.sample(lambda) * self.scale
    }

    /// Total emitted power.
    pub fn phi(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        let sides = if self.two_sided { 2.0 } else { 1.0 };
        self.l_emit.sample(lambda) * (PI * sides * self.area * self.scale)
    }

    /// Samples a point on the light as seen from `ctx`.
    pub fn sample_li(&self, ctx: &LightSampleContext, u: Point2f, lambda: &SampledWavelengths) -> Option<LightLiSample> {
        let ss = self.shape.sample_from_ref(&ctx.shape_context(), u)?;
        if ss.pdf == 0.0 || distance_squared(ss.intr.p(), ctx.p()) == 0.0 {
            return None;
        }

        let wi = (ss.intr.p() - ctx.p()).normalize();
        let le = self.l(ss.intr.p(), ss.intr.n, ss.intr.uv, -wi, lambda);
        if le.is_black() {
            return None;
        }
        Some(LightLiSample { l: le, wi, pdf: ss.pdf, p_light: ss.intr })
    }

    pub fn pdf_li(&self, ctx: &LightSampleContext, wi: Vec3f) -> Float {
        self.shape.pdf_from_ref(&ctx.shape_context(), wi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::transform::Transform;
    use crate::interval::Point3fi;
    use crate::shapes::TriangleMesh;
    use approx::assert_relative_eq;

    fn overhead_mesh() -> TriangleMesh {
        // faces down towards the origin
        let p = vec![point3f!(-1, -1, 2), point3f!(0, 1, 2), point3f!(1, -1, 2)];
        TriangleMesh::new(&Transform::IDENTITY, false, vec![0, 1, 2], p, None, None).unwrap()
    }

    fn origin_context() -> LightSampleContext {
        LightSampleContext::new(
            Point3fi::exact(point3f!(0, 0, 0)),
            Normal3::new(0.0, 0.0, 1.0),
            Normal3::new(0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn test_one_sided_emission() {
        let mesh = overhead_mesh();
        let emit = Spectrum::constant(4.0);
        let light = DiffuseAreaLight::new(Triangle::new(&mesh, 0), &emit, 0.5, false);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let n = Normal3::new(0.0, 0.0, -1.0);
        let p = point3f!(0, 0, 2);
        let uv = point2f!(0, 0);
        assert_relative_eq!(light.l(p, n, uv, vec3f!(0, 0, -1), &lambda), SampledSpectrum::uniform(2.0));
        assert!(light.l(p, n, uv, vec3f!(0, 0, 1), &lambda).is_black());

        let two_sided = DiffuseAreaLight::new(Triangle::new(&mesh, 0), &emit, 0.5, true);
        assert!(!two_sided.l(p, n, uv, vec3f!(0, 0, 1), &lambda).is_black());
        assert_relative_eq!(two_sided.phi(&lambda), light.phi(&lambda) * 2.0);
    }

    #[test]
    fn test_sample_li_points_towards_light() {
        let mesh = overhead_mesh();
        let emit = Spectrum::constant(1.0);
        let light = DiffuseAreaLight::new(Triangle::new(&mesh, 0), &emit, 1.0, false);
        let lambda = SampledWavelengths::sample_visible(0.5);
        let ctx = origin_context();

        let ls = light.sample_li(&ctx, point2f!(0.4, 0.3), &lambda).unwrap();
        assert!(ls.wi.z > 0.0);
        assert_relative_eq!(ls.l, SampledSpectrum::uniform(1.0));
        assert_relative_eq!(light.pdf_li(&ctx, ls.wi), ls.pdf, max_relative = 2e-2);
    }
}
