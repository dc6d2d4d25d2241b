//! Scattering from two interfaces with an optional scattering medium between them.
//!
//! There is no closed form for these models. `f`, `sample_f` and `pdf` run a short random walk
//! between the layers, with a generator seeded by hashing the query directions so that the
//! same query always gets the same estimate.

use cgmath::InnerSpace;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use crate::hash::{hash_floats, hash_values};
use crate::reflection::{
    abs_cos_theta, same_hemisphere, BSDFSample, BxDFFlags, BxDFModel, BxDFReflTransFlags, ConductorBxDF,
    DielectricBxDF, DiffuseBxDF, TransportMode,
};
use crate::sampling::{henyey_greenstein, sample_exponential, sample_henyey_greenstein};
use crate::spectrum::SampledSpectrum;
use crate::{lerp, power_heuristic, Float, Point2f, Vec3f, ONE_MINUS_EPSILON, PI};

pub type CoatedDiffuseBxDF = LayeredBxDF<DielectricBxDF, DiffuseBxDF, true>;

pub type CoatedConductorBxDF = LayeredBxDF<DielectricBxDF, ConductorBxDF, true>;

#[derive(Clone, Copy, Debug)]
pub struct LayeredBxDF<T, B, const TWO_SIDED: bool> {
    top: T,
    bottom: B,
    thickness: Float,
    g: Float,
    albedo: SampledSpectrum,
    max_depth: u32,
    n_samples: u32,
}

/// One of the two interfaces of a layered model.
enum Layer<'a, T, B> {
    Top(&'a T),
    Bottom(&'a B),
}

impl<T, B> Clone for Layer<'_, T, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, B> Copy for Layer<'_, T, B> {}

impl<'a, T: BxDFModel, B: BxDFModel> Layer<'a, T, B> {
    fn flags(&self) -> BxDFFlags {
        match self {
            Layer::Top(t) => t.flags(),
            Layer::Bottom(b) => b.flags(),
        }
    }

    fn f(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        match self {
            Layer::Top(t) => t.f(wo, wi, mode),
            Layer::Bottom(b) => b.f(wo, wi, mode),
        }
    }

    fn sample_f(&self, wo: Vec3f, uc: Float, u: Point2f, mode: TransportMode, flags: BxDFReflTransFlags) -> Option<BSDFSample> {
        match self {
            Layer::Top(t) => t.sample_f(wo, uc, u, mode, flags),
            Layer::Bottom(b) => b.sample_f(wo, uc, u, mode, flags),
        }
    }

    fn pdf(&self, wo: Vec3f, wi: Vec3f, mode: TransportMode, flags: BxDFReflTransFlags) -> Float {
        match self {
            Layer::Top(t) => t.pdf(wo, wi, mode, flags),
            Layer::Bottom(b) => b.pdf(wo, wi, mode, flags),
        }
    }
}

/// Transmittance through a slab of unit density medium of height `dz` along `w`.
fn tr(dz: Float, w: Vec3f) -> Float {
    if dz.abs() <= Float::MIN_POSITIVE {
        return 1.0;
    }
    (-(dz / w.z).abs()).exp()
}

fn hash_dir(w: Vec3f) -> u64 {
    hash_floats(&[w.x, w.y, w.z])
}

fn walk_rng(a: u64, b: u64) -> Xoshiro256Plus {
    Xoshiro256Plus::seed_from_u64(hash_values(&[a, b]))
}

fn usable(bs: Option<BSDFSample>) -> Option<BSDFSample> {
    bs.filter(BSDFSample::is_usable)
}

impl<T: BxDFModel, B: BxDFModel, const TWO_SIDED: bool> LayeredBxDF<T, B, TWO_SIDED> {
    pub fn new(top: T, bottom: B, thickness: Float, albedo: SampledSpectrum, g: Float, max_depth: u32, n_samples: u32) -> Self {
        Self {
            top,
            bottom,
            thickness: thickness.max(Float::MIN_POSITIVE),
            g,
            albedo,
            max_depth,
            n_samples: n_samples.max(1),
        }
    }

    fn entered_top(wo: Vec3f) -> bool {
        TWO_SIDED || wo.z > 0.0
    }
}

impl<T: BxDFModel, B: BxDFModel, const TWO_SIDED: bool> BxDFModel for LayeredBxDF<T, B, TWO_SIDED> {
    fn flags(&self) -> BxDFFlags {
        let top_flags = self.top.flags();
        let bottom_flags = self.bottom.flags();

        let mut flags = BxDFFlags::REFLECTION;
        if top_flags.is_specular() {
            flags |= BxDFFlags::SPECULAR;
        }

        if top_flags.is_diffuse() || bottom_flags.is_diffuse() || !self.albedo.is_black() {
            flags |= BxDFFlags::DIFFUSE;
        } else if top_flags.is_glossy() || bottom_flags.is_glossy() {
            flags |= BxDFFlags::GLOSSY;
        }

        if top_flags.is_transmissive() && bottom_flags.is_transmissive() {
            flags |= BxDFFlags::TRANSMISSION;
        }
        flags
    }

    fn f(&self, mut wo: Vec3f, mut wi: Vec3f, mode: TransportMode) -> SampledSpectrum {
        let mut f = SampledSpectrum::zero();
        if TWO_SIDED && wo.z < 0.0 {
            wo = -wo;
            wi = -wi;
        }

        let entered_top = Self::entered_top(wo);
        let enter_interface: Layer<T, B> = if entered_top { Layer::Top(&self.top) } else { Layer::Bottom(&self.bottom) };

        let exits_bottom = same_hemisphere(wo, wi) ^ entered_top;
        let (exit_interface, non_exit_interface): (Layer<T, B>, Layer<T, B>) = if exits_bottom {
            (Layer::Bottom(&self.bottom), Layer::Top(&self.top))
        } else {
            (Layer::Top(&self.top), Layer::Bottom(&self.bottom))
        };
        let exit_z = if exits_bottom { 0.0 } else { self.thickness };

        // reflection at the entrance interface
        let n_samples = self.n_samples as Float;
        if same_hemisphere(wo, wi) {
            f = enter_interface.f(wo, wi, mode) * n_samples;
        }

        let mut rng = walk_rng(hash_dir(wo), hash_dir(wi));
        let mut r = || rng.gen::<Float>().min(ONE_MINUS_EPSILON);

        for _ in 0..self.n_samples {
            // sample transmission direction through entrance interface
            let uc = r();
            let wos = match usable(enter_interface.sample_f(wo, uc, Point2f::new(r(), r()), mode, BxDFReflTransFlags::TRANSMISSION)) {
                Some(s) => s,
                None => continue,
            };

            // sample the exit interface from wi, as if light arrived from there
            let uc = r();
            let wis = match usable(exit_interface.sample_f(wi, uc, Point2f::new(r(), r()), !mode, BxDFReflTransFlags::TRANSMISSION)) {
                Some(s) => s,
                None => continue,
            };

            let mut beta = wos.f * abs_cos_theta(wos.wi) / wos.pdf;
            let mut z = if entered_top { self.thickness } else { 0.0 };
            let mut w = wos.wi;

            for depth in 0..self.max_depth {
                // russian roulette
                if depth > 3 && beta.max_component_value() < 0.25 {
                    let q = Float::max(0.0, 1.0 - beta.max_component_value());
                    if r() < q {
                        break;
                    }
                    beta /= 1.0 - q;
                }

                if self.albedo.is_black() {
                    // advance to the other interface
                    z = if z == self.thickness { 0.0 } else { self.thickness };
                    beta *= tr(self.thickness, w);
                } else {
                    // sample medium scattering
                    let sigma_t = 1.0;
                    let dz = sample_exponential(r(), sigma_t / w.z.abs());
                    let zp = if w.z > 0.0 { z + dz } else { z - dz };
                    if 0.0 < zp && zp < self.thickness {
                        // scattering event inside the medium, connect to wis through the exit
                        let mut wt = 1.0;
                        if !exit_interface.flags().is_specular() {
                            wt = power_heuristic(1, wis.pdf, 1, henyey_greenstein((-w).dot(-wis.wi), self.g));
                        }
                        f += beta * self.albedo * henyey_greenstein((-w).dot(-wis.wi), self.g) * wt
                            * tr(zp - exit_z, wis.wi) * wis.f / wis.pdf;

                        // sample the phase function for the next direction
                        let (ps_wi, ps_pdf) = sample_henyey_greenstein(-w, self.g, Point2f::new(r(), r()));
                        if ps_pdf == 0.0 || ps_wi.z == 0.0 {
                            continue;
                        }
                        // the sampled density equals the phase function value
                        beta *= self.albedo;
                        w = ps_wi;
                        z = zp;

                        // connect through the exit interface along the new direction
                        if ((z < exit_z && w.z > 0.0) || (z > exit_z && w.z < 0.0)) && !exit_interface.flags().is_specular() {
                            let f_exit = exit_interface.f(-w, wi, mode);
                            if !f_exit.is_black() {
                                let exit_pdf = exit_interface.pdf(-w, wi, mode, BxDFReflTransFlags::TRANSMISSION);
                                let wt = power_heuristic(1, ps_pdf, 1, exit_pdf);
                                f += beta * tr(zp - exit_z, ps_wi) * f_exit * wt;
                            }
                        }
                        continue;
                    }
                    z = zp.clamp(0.0, self.thickness);
                }

                if z == exit_z {
                    // reflection off the exit interface back into the layers
                    let uc = r();
                    let bs = match usable(exit_interface.sample_f(-w, uc, Point2f::new(r(), r()), mode, BxDFReflTransFlags::REFLECTION)) {
                        Some(bs) => bs,
                        None => break,
                    };
                    beta *= bs.f * abs_cos_theta(bs.wi) / bs.pdf;
                    w = bs.wi;
                } else {
                    // scattering at the non-exit interface
                    if !non_exit_interface.flags().is_specular() {
                        // next event estimation along the presampled wis direction
                        let mut wt = 1.0;
                        if !exit_interface.flags().is_specular() {
                            wt = power_heuristic(1, wis.pdf, 1, non_exit_interface.pdf(-w, -wis.wi, mode, BxDFReflTransFlags::ALL));
                        }
                        f += beta * non_exit_interface.f(-w, -wis.wi, mode) * abs_cos_theta(wis.wi) * wt
                            * tr(self.thickness, wis.wi) * wis.f / wis.pdf;
                    }

                    let uc = r();
                    let u = Point2f::new(r(), r());
                    let bs = match usable(non_exit_interface.sample_f(-w, uc, u, mode, BxDFReflTransFlags::REFLECTION)) {
                        Some(bs) => bs,
                        None => break,
                    };
                    beta *= bs.f * abs_cos_theta(bs.wi) / bs.pdf;
                    w = bs.wi;

                    if !exit_interface.flags().is_specular() {
                        // next event estimation along the sampled direction
                        let f_exit = exit_interface.f(-w, wi, mode);
                        if !f_exit.is_black() {
                            let mut wt = 1.0;
                            if !non_exit_interface.flags().is_specular() {
                                let exit_pdf = exit_interface.pdf(-w, wi, mode, BxDFReflTransFlags::TRANSMISSION);
                                wt = power_heuristic(1, bs.pdf, 1, exit_pdf);
                            }
                            f += beta * tr(self.thickness, bs.wi) * f_exit * wt;
                        }
                    }
                }
            }
        }

        f / n_samples
    }

    fn sample_f(
        &self,
        mut wo: Vec3f,
        uc: Float,
        u: Point2f,
        mode: TransportMode,
        sample_flags: BxDFReflTransFlags,
    ) -> Option<BSDFSample> {
        let flip_wi = TWO_SIDED && wo.z < 0.0;
        if flip_wi {
            wo = -wo;
        }

        let sample = self.sample_walk(wo, uc, u, mode)?;
        let gated_out = (sample.is_reflection() && !sample_flags.contains(BxDFReflTransFlags::REFLECTION))
            || (sample.is_transmission() && !sample_flags.contains(BxDFReflTransFlags::TRANSMISSION));
        if gated_out {
            return None;
        }

        let mut sample = sample;
        if flip_wi {
            sample.wi = -sample.wi;
        }
        Some(sample)
    }

    fn pdf(&self, mut wo: Vec3f, mut wi: Vec3f, mode: TransportMode, sample_flags: BxDFReflTransFlags) -> Float {
        if TWO_SIDED && wo.z < 0.0 {
            wo = -wo;
            wi = -wi;
        }
        let reflection = same_hemisphere(wo, wi);
        if (reflection && !sample_flags.contains(BxDFReflTransFlags::REFLECTION))
            || (!reflection && !sample_flags.contains(BxDFReflTransFlags::TRANSMISSION))
        {
            return 0.0;
        }

        let mut rng = walk_rng(hash_dir(wi), hash_dir(wo));
        let mut r = || rng.gen::<Float>().min(ONE_MINUS_EPSILON);

        let entered_top = Self::entered_top(wo);
        let n_samples = self.n_samples as Float;
        let mut pdf_sum = 0.0;
        if reflection {
            let refl = BxDFReflTransFlags::REFLECTION;
            pdf_sum += n_samples
                * if entered_top { self.top.pdf(wo, wi, mode, refl) } else { self.bottom.pdf(wo, wi, mode, refl) };
        }

        for _ in 0..self.n_samples {
            if reflection {
                // transmission, reflection, transmission
                let (r_interface, t_interface): (Layer<T, B>, Layer<T, B>) = if entered_top {
                    (Layer::Bottom(&self.bottom), Layer::Top(&self.top))
                } else {
                    (Layer::Top(&self.top), Layer::Bottom(&self.bottom))
                };

                let trans = BxDFReflTransFlags::TRANSMISSION;
                let wos = t_interface.sample_f(wo, r(), Point2f::new(r(), r()), mode, trans);
                let wis = t_interface.sample_f(wi, r(), Point2f::new(r(), r()), !mode, trans);

                let (wos, wis) = match (wos, wis) {
                    (Some(wos), Some(wis)) if !wos.f.is_black() && wos.pdf > 0.0 && !wis.f.is_black() && wis.pdf > 0.0 => (wos, wis),
                    _ => continue,
                };

                if !t_interface.flags().is_non_specular() {
                    pdf_sum += r_interface.pdf(-wos.wi, -wis.wi, mode, BxDFReflTransFlags::ALL);
                } else {
                    // MIS estimate of the product of the two interface densities
                    let rs = r_interface.sample_f(-wos.wi, r(), Point2f::new(r(), r()), mode, BxDFReflTransFlags::ALL);
                    if let Some(rs) = rs.filter(|rs| !rs.f.is_black() && rs.pdf > 0.0) {
                        if !r_interface.flags().is_non_specular() {
                            pdf_sum += t_interface.pdf(-rs.wi, wi, mode, BxDFReflTransFlags::ALL);
                        } else {
                            let r_pdf = r_interface.pdf(-wos.wi, -wis.wi, mode, BxDFReflTransFlags::ALL);
                            pdf_sum += power_heuristic(1, wis.pdf, 1, r_pdf) * r_pdf;

                            let t_pdf = t_interface.pdf(-rs.wi, wi, mode, BxDFReflTransFlags::ALL);
                            pdf_sum += power_heuristic(1, rs.pdf, 1, t_pdf) * t_pdf;
                        }
                    }
                }
            } else {
                // transmission through both interfaces
                let (to_interface, ti_interface): (Layer<T, B>, Layer<T, B>) = if entered_top {
                    (Layer::Top(&self.top), Layer::Bottom(&self.bottom))
                } else {
                    (Layer::Bottom(&self.bottom), Layer::Top(&self.top))
                };

                let uc = r();
                let u = Point2f::new(r(), r());
                let wos = match usable(to_interface.sample_f(wo, uc, u, mode, BxDFReflTransFlags::ALL)) {
                    Some(s) if !s.is_reflection() => s,
                    _ => continue,
                };

                let uc = r();
                let u = Point2f::new(r(), r());
                let wis = match usable(ti_interface.sample_f(wi, uc, u, !mode, BxDFReflTransFlags::ALL)) {
                    Some(s) if !s.is_reflection() => s,
                    _ => continue,
                };

                if to_interface.flags().is_specular() {
                    pdf_sum += ti_interface.pdf(-wos.wi, wi, mode, BxDFReflTransFlags::ALL);
                } else if ti_interface.flags().is_specular() {
                    pdf_sum += to_interface.pdf(wo, -wis.wi, mode, BxDFReflTransFlags::ALL);
                } else {
                    pdf_sum += (to_interface.pdf(wo, -wis.wi, mode, BxDFReflTransFlags::ALL)
                        + ti_interface.pdf(-wos.wi, wi, mode, BxDFReflTransFlags::ALL))
                        / 2.0;
                }
            }
        }

        // mix with a uniform density so that no direction has zero probability
        lerp(0.9, 1.0 / (4.0 * PI), pdf_sum / n_samples)
    }

    fn regularize(&mut self) {
        self.top.regularize();
        self.bottom.regularize();
    }
}

impl<T: BxDFModel, B: BxDFModel, const TWO_SIDED: bool> LayeredBxDF<T, B, TWO_SIDED> {
    /// Random walk that samples an outgoing direction, `wo` already flipped to the upper side
    /// for two-sided models.
    fn sample_walk(&self, wo: Vec3f, uc: Float, u: Point2f, mode: TransportMode) -> Option<BSDFSample> {
        // sample the entrance interface for the initial direction
        let entered_top = Self::entered_top(wo);
        let bs = if entered_top {
            self.top.sample_f(wo, uc, u, mode, BxDFReflTransFlags::ALL)
        } else {
            self.bottom.sample_f(wo, uc, u, mode, BxDFReflTransFlags::ALL)
        };
        let mut bs = usable(bs)?;
        if bs.is_reflection() {
            bs.pdf_is_proportional = true;
            return Some(bs);
        }

        let mut w = bs.wi;
        let mut specular_path = bs.is_specular();

        let mut rng = walk_rng(hash_dir(wo), hash_floats(&[uc, u.x, u.y]));
        let mut r = || rng.gen::<Float>().min(ONE_MINUS_EPSILON);

        let mut f = bs.f * abs_cos_theta(bs.wi);
        let mut pdf = bs.pdf;
        let mut z = if entered_top { self.thickness } else { 0.0 };

        for depth in 0..self.max_depth {
            // russian roulette
            let rr_beta = f.max_component_value() / pdf;
            if depth > 3 && rr_beta < 0.25 {
                let q = Float::max(0.0, 1.0 - rr_beta);
                if r() < q {
                    return None;
                }
                pdf *= 1.0 - q;
            }
            if w.z == 0.0 {
                return None;
            }

            if !self.albedo.is_black() {
                // possible scattering event in the medium
                let sigma_t = 1.0;
                let dz = sample_exponential(r(), sigma_t / abs_cos_theta(w));
                let zp = if w.z > 0.0 { z + dz } else { z - dz };
                if zp == z {
                    return None;
                }
                if 0.0 < zp && zp < self.thickness {
                    let (ps_wi, ps_pdf) = sample_henyey_greenstein(-w, self.g, Point2f::new(r(), r()));
                    if ps_pdf == 0.0 || ps_wi.z == 0.0 {
                        return None;
                    }
                    f *= self.albedo * ps_pdf;
                    pdf *= ps_pdf;
                    specular_path = false;
                    w = ps_wi;
                    z = zp;
                    continue;
                }
                z = zp.clamp(0.0, self.thickness);
            } else {
                // advance to the other interface
                z = if z == self.thickness { 0.0 } else { self.thickness };
                f *= tr(self.thickness, w);
            }

            let interface: Layer<T, B> = if z == 0.0 { Layer::Bottom(&self.bottom) } else { Layer::Top(&self.top) };

            let uc = r();
            let u = Point2f::new(r(), r());
            let bs = usable(interface.sample_f(-w, uc, u, mode, BxDFReflTransFlags::ALL))?;
            f *= bs.f;
            pdf *= bs.pdf;
            specular_path &= bs.is_specular();
            w = bs.wi;

            // the path has left the layers
            if bs.is_transmission() {
                let mut flags = if same_hemisphere(wo, w) { BxDFFlags::REFLECTION } else { BxDFFlags::TRANSMISSION };
                flags |= if specular_path { BxDFFlags::SPECULAR } else { BxDFFlags::GLOSSY };
                let mut sample = BSDFSample::new(f, w, pdf, flags);
                sample.pdf_is_proportional = true;
                return Some(sample);
            }

            f *= abs_cos_theta(bs.wi);
        }
        None
    }
}
