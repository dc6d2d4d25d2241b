//! Surface scattering.
//!
//! Every scattering model works in a local shading coordinate system where the shading normal
//! is +z. `BSDF` converts to and from render space. The set of models is closed: `BxDF` is a
//! plain enum and dispatches with a single match, so a BSDF never allocates.

use std::ops::Not;

use bitflags::bitflags;
use cgmath::InnerSpace;

use crate::geometry::Normal3;
use crate::spectrum::SampledSpectrum;
use crate::{safe_sqrt, sqr, Float, Point2f, Vec3f};

mod bsdf;
mod conductor;
mod dielectric;
mod diffuse;
pub mod fresnel;
mod layered;
pub mod microfacet;
mod mix;

pub use bsdf::BSDF;
pub use conductor::ConductorBxDF;
pub use dielectric::DielectricBxDF;
pub use diffuse::DiffuseBxDF;
pub use layered::{CoatedConductorBxDF, CoatedDiffuseBxDF, LayeredBxDF};
pub use microfacet::TrowbridgeReitzDistribution;
pub use mix::{MixBxDF, MixComponent};

bitflags! {
    pub struct BxDFFlags: u8 {
        const UNSET = 0;
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const DIFFUSE = 1 << 2;
        const GLOSSY = 1 << 3;
        const SPECULAR = 1 << 4;

        const DIFFUSE_REFLECTION = Self::DIFFUSE.bits | Self::REFLECTION.bits;
        const DIFFUSE_TRANSMISSION = Self::DIFFUSE.bits | Self::TRANSMISSION.bits;
        const GLOSSY_REFLECTION = Self::GLOSSY.bits | Self::REFLECTION.bits;
        const GLOSSY_TRANSMISSION = Self::GLOSSY.bits | Self::TRANSMISSION.bits;
        const SPECULAR_REFLECTION = Self::SPECULAR.bits | Self::REFLECTION.bits;
        const SPECULAR_TRANSMISSION = Self::SPECULAR.bits | Self::TRANSMISSION.bits;
    }
}

impl BxDFFlags {
    pub fn is_reflective(self) -> bool {
        self.contains(Self::REFLECTION)
    }

    pub fn is_transmissive(self) -> bool {
        self.contains(Self::TRANSMISSION)
    }

    pub fn is_diffuse(self) -> bool {
        self.contains(Self::DIFFUSE)
    }

    pub fn is_glossy(self) -> bool {
        self.contains(Self::GLOSSY)
    }

    pub fn is_specular(self) -> bool {
        self.contains(Self::SPECULAR)
    }

    pub fn is_non_specular(self) -> bool {
        self.intersects(Self::DIFFUSE | Self::GLOSSY)
    }
}

bitflags! {
    /// Restricts sampling and evaluation to the reflection and/or transmission lobes.
    pub struct BxDFReflTransFlags: u8 {
        const UNSET = 0;
        const REFLECTION = 1;
        const TRANSMISSION = 1 << 1;
        const ALL = Self::REFLECTION.bits | Self::TRANSMISSION.bits;
    }
}

/// Which quantity a path carries, needed for the non-symmetric scaling of refraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportMode {
    Radiance,
    Importance,
}

impl Not for TransportMode {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            TransportMode::Radiance => TransportMode::Importance,
            TransportMode::Importance => TransportMode::Radiance,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BSDFSample {
    pub f: SampledSpectrum,
    pub wi: Vec3f,
    /// Solid angle density of `wi`, never zero for a returned sample
    pub pdf: Float,
    pub flags: BxDFFlags,
    /// Relative index of refraction along `wi`, 1 for reflection
    pub eta: Float,
    /// `pdf` is only known up to a constant factor, as for the stochastic layered models.
    pub pdf_is_proportional: bool,
}

impl BSDFSample {
    pub fn new(f: SampledSpectrum, wi: Vec3f, pdf: Float, flags: BxDFFlags) -> Self {
        Self { f, wi, pdf, flags, eta: 1.0, pdf_is_proportional: false }
    }

    pub fn with_eta(mut self, eta: Float) -> Self {
        self.eta = eta;
        self
    }

    pub fn is_reflection(&self) -> bool {
        self.flags.is_reflective()
    }

    pub fn is_transmission(&self) -> bool {
        self.flags.is_transmissive()
    }

    pub fn is_specular(&self) -> bool {
        self.flags.is_specular()
    }

    /// A sample that carries no energy or has no density cannot be used by an estimator.
    pub(crate) fn is_usable(&self) -> bool {
        !self.f.is_black() && self.pdf > 0.0 && self.wi.z != 0.0
    }
}

/// The scattering model interface, with all directions in the local shading frame.
pub trait BxDFModel {
    fn flags(&self) -> BxDFFlags;

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum;

    /// Samples an incident direction for `wo` using `uc` to pick a lobe and `u` within it.
    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample>;

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float;

    /// Roughens near-specular lobes. Models without a specular component ignore it.
    fn regularize(&mut self) {}
}

/// One of the supported scattering models.
#[derive(Clone, Debug)]
pub enum BxDF {
    Diffuse(DiffuseBxDF),
    Dielectric(DielectricBxDF),
    Conductor(ConductorBxDF),
    CoatedDiffuse(CoatedDiffuseBxDF),
    CoatedConductor(CoatedConductorBxDF),
    Mix(MixBxDF),
}

macro_rules! dispatch_bxdf {
    ($self:expr, $b:ident => $e:expr) => {
        match $self {
            BxDF::Diffuse($b) => $e,
            BxDF::Dielectric($b) => $e,
            BxDF::Conductor($b) => $e,
            BxDF::CoatedDiffuse($b) => $e,
            BxDF::CoatedConductor($b) => $e,
            BxDF::Mix($b) => $e,
        }
    };
}

impl BxDFModel for BxDF {
    fn flags(&self) -> BxDFFlags {
        dispatch_bxdf!(self, b => b.flags())
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        dispatch_bxdf!(self, b => b.f(wo, wi, mode))
    }

    fn sample_f(
        &self,
        wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        dispatch_bxdf!(self, b => b.sample_f(wo, uc, u, mode, sample_flags))
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        dispatch_bxdf!(self, b => b.pdf(wo, wi, mode, sample_flags))
    }

    fn regularize(&mut self) {
        dispatch_bxdf!(self, b => b.regularize())
    }
}

macro_rules! impl_from_bxdf {
    ($($variant:ident($ty:ty)),*) => {
        $(
            impl From<$ty> for BxDF {
                fn from(b: $ty) -> Self {
                    BxDF::$variant(b)
                }
            }
        )*
    };
}

impl_from_bxdf!(
    Diffuse(DiffuseBxDF),
    Dielectric(DielectricBxDF),
    Conductor(ConductorBxDF),
    CoatedDiffuse(CoatedDiffuseBxDF),
    CoatedConductor(CoatedConductorBxDF),
    Mix(MixBxDF)
);

// Trigonometry of unit vectors in the shading frame

#[inline] pub fn cos_theta(w: Vec3f) -> Float { w.z }
#[inline] pub fn cos2_theta(w: Vec3f) -> Float { w.z * w.z }
#[inline] pub fn abs_cos_theta(w: Vec3f) -> Float { w.z.abs() }

pub fn sin2_theta(w: Vec3f) -> Float {
    Float::max(0.0, 1.0 - cos2_theta(w))
}

pub fn sin_theta(w: Vec3f) -> Float {
    sin2_theta(w).sqrt()
}

pub fn tan2_theta(w: Vec3f) -> Float {
    sin2_theta(w) / cos2_theta(w)
}

pub fn cos_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        1.0
    } else {
        (w.x / sin_theta).clamp(-1.0, 1.0)
    }
}

pub fn sin_phi(w: Vec3f) -> Float {
    let sin_theta = sin_theta(w);
    if sin_theta == 0.0 {
        0.0
    } else {
        (w.y / sin_theta).clamp(-1.0, 1.0)
    }
}

pub fn same_hemisphere(w: Vec3f, wp: Vec3f) -> bool {
    w.z * wp.z > 0.0
}

pub fn reflect(wo: Vec3f, n: Vec3f) -> Vec3f {
    -wo + 2.0 * wo.dot(n) * n
}

/// Refracts `wi` through an interface with normal `n` and relative index of refraction `eta`
/// (inside over outside). Returns the transmitted direction and the relative index actually
/// used, which is inverted when `wi` arrives from below `n`. `None` on total internal reflection.
pub fn refract(wi: Vec3f, mut n: Normal3, mut eta: Float) -> Option<(Vec3f, Float)> {
    let mut cos_theta_i = n.dot(wi);
    if cos_theta_i < 0.0 {
        eta = 1.0 / eta;
        cos_theta_i = -cos_theta_i;
        n = -n;
    }

    let sin2_theta_i = Float::max(0.0, 1.0 - sqr(cos_theta_i));
    let sin2_theta_t = sin2_theta_i / sqr(eta);
    if sin2_theta_t >= 1.0 {
        return None;
    }
    let cos_theta_t = safe_sqrt(1.0 - sin2_theta_t);

    let wt = -wi / eta + (cos_theta_i / eta - cos_theta_t) * n.0;
    Some((wt, eta))
}
