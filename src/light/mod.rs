//! Emitters. The only light type is a diffuse area light bound to one triangle, so lights are
//! plain values and no trait objects are involved.

use crate::geometry::Normal3;
use crate::interaction::{Interaction, SurfaceInteraction};
use crate::interval::Point3fi;
use crate::shapes::ShapeSampleContext;
use crate::spectrum::SampledSpectrum;
use crate::{Float, Point3f, Vec3f};

mod diffuse;

pub use diffuse::DiffuseAreaLight;

/// The point being illuminated.
#[derive(Clone, Copy, Debug)]
pub struct LightSampleContext {
    pub pi: Point3fi,
    pub n: Normal3,
    pub ns: Normal3,
}

impl LightSampleContext {
    pub fn new(pi: Point3fi, n: Normal3, ns: Normal3) -> Self {
        Self { pi, n, ns }
    }

    pub fn p(&self) -> Point3f {
        self.pi.point()
    }

    pub(crate) fn shape_context(&self) -> ShapeSampleContext {
        ShapeSampleContext::new(self.pi, self.n, self.ns, 0.0)
    }
}

impl From<&SurfaceInteraction<'_>> for LightSampleContext {
    fn from(si: &SurfaceInteraction<'_>) -> Self {
        Self::new(si.intr.pi, si.intr.n, si.shading_n)
    }
}

impl From<&Interaction> for LightSampleContext {
    fn from(intr: &Interaction) -> Self {
        Self::new(intr.pi, intr.n, intr.n)
    }
}

/// Incident radiance from a sampled point on a light.
#[derive(Clone, Copy, Debug)]
pub struct LightLiSample {
    pub l: SampledSpectrum,

    /// Direction *towards* the light
    pub wi: Vec3f,

    /// Solid angle density of `wi`
    pub pdf: Float,

    pub p_light: Interaction,
}
