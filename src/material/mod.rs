//! Materials turn a hit point into a scattering model.
//!
//! Like `BxDF`, the set of materials is closed. Each variant resolves to exactly one `BxDF` at
//! shading time through its `get_bxdf`, sampling its spectral parameters at the path's
//! wavelengths.

use crate::geometry::Normal3;
use crate::interaction::SurfaceInteraction;
use crate::reflection::{BxDF, TrowbridgeReitzDistribution};
use crate::spectrum::SampledWavelengths;
use crate::{Float, Point2f, Point3f, Vec3f};

mod coated;
mod conductor;
mod dielectric;
mod diffuse;
mod mix;

pub use coated::{CoatedConductorMaterial, CoatedDiffuseMaterial, Coating};
pub use conductor::ConductorMaterial;
pub use dielectric::DielectricMaterial;
pub use diffuse::DiffuseMaterial;
pub use mix::MixMaterial;

/// The geometric information a material needs to build its BxDF.
#[derive(Clone, Copy, Debug)]
pub struct MaterialEvalContext {
    pub p: Point3f,
    pub wo: Vec3f,
    pub n: Normal3,
    pub ns: Normal3,
    pub dpdus: Vec3f,
    pub uv: Point2f,
}

impl From<&SurfaceInteraction<'_>> for MaterialEvalContext {
    fn from(si: &SurfaceInteraction<'_>) -> Self {
        Self {
            p: si.p(),
            wo: si.wo(),
            n: si.n(),
            ns: si.shading_n,
            dpdus: si.shading_geom.dpdu,
            uv: si.intr.uv,
        }
    }
}

/// Microfacet roughness of a surface, either as perceptual roughness or as the distribution's
/// alpha directly.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roughness {
    pub u: Float,
    pub v: Float,
    pub remap: bool,
}

impl Roughness {
    pub fn smooth() -> Self {
        Self { u: 0.0, v: 0.0, remap: false }
    }

    pub fn isotropic(r: Float) -> Self {
        Self { u: r, v: r, remap: true }
    }

    pub fn distribution(&self) -> TrowbridgeReitzDistribution {
        if self.remap {
            TrowbridgeReitzDistribution::new(
                TrowbridgeReitzDistribution::roughness_to_alpha(self.u),
                TrowbridgeReitzDistribution::roughness_to_alpha(self.v),
            )
        } else {
            TrowbridgeReitzDistribution::new(self.u, self.v)
        }
    }
}

impl Default for Roughness {
    fn default() -> Self {
        Self::smooth()
    }
}

#[derive(Clone, Debug)]
pub enum Material {
    Diffuse(DiffuseMaterial),
    Dielectric(DielectricMaterial),
    Conductor(ConductorMaterial),
    CoatedDiffuse(CoatedDiffuseMaterial),
    CoatedConductor(CoatedConductorMaterial),
    Mix(MixMaterial),
}

impl Material {
    pub fn get_bxdf(&self, ctx: &MaterialEvalContext, lambda: &mut SampledWavelengths) -> BxDF {
        match self {
            Material::Diffuse(m) => m.get_bxdf(ctx, lambda).into(),
            Material::Dielectric(m) => m.get_bxdf(ctx, lambda).into(),
            Material::Conductor(m) => m.get_bxdf(ctx, lambda).into(),
            Material::CoatedDiffuse(m) => m.get_bxdf(ctx, lambda).into(),
            Material::CoatedConductor(m) => m.get_bxdf(ctx, lambda).into(),
            Material::Mix(m) => m.get_bxdf(ctx, lambda).into(),
        }
    }

    pub fn is_mix(&self) -> bool {
        matches!(self, Material::Mix(_))
    }
}

macro_rules! impl_from_material {
    ($($variant:ident($ty:ty)),*) => {
        $(
            impl From<$ty> for Material {
                fn from(m: $ty) -> Self {
                    Material::$variant(m)
                }
            }
        )*
    };
}

impl_from_material!(
    Diffuse(DiffuseMaterial),
    Dielectric(DielectricMaterial),
    Conductor(ConductorMaterial),
    CoatedDiffuse(CoatedDiffuseMaterial),
    CoatedConductor(CoatedConductorMaterial),
    Mix(MixMaterial)
);

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use cgmath::Point3;

    pub(crate) fn test_context() -> MaterialEvalContext {
        MaterialEvalContext {
            p: Point3::new(0.0, 0.0, 0.0),
            wo: vec3f!(0, 0, 1),
            n: Normal3::new(0.0, 0.0, 1.0),
            ns: Normal3::new(0.0, 0.0, 1.0),
            dpdus: vec3f!(1, 0, 0),
            uv: point2f!(0.5, 0.5),
        }
    }

    #[test]
    fn test_roughness_remap() {
        let r = Roughness::isotropic(0.25).distribution();
        assert_eq!(r.alpha_x(), 0.5);
        assert!(Roughness::smooth().distribution().effectively_smooth());
    }
}
