/*!
Statistical checks on the scattering models: sampled densities and values have to agree with
direct evaluation, and Monte Carlo albedo estimates have to respect energy conservation.
*/

use approx::assert_relative_eq;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;

use spectral_pt::reflection::{
    BxDF, BxDFModel, BxDFReflTransFlags, CoatedDiffuseBxDF, ConductorBxDF, DielectricBxDF, DiffuseBxDF, TransportMode,
    TrowbridgeReitzDistribution,
};
use spectral_pt::spectrum::SampledSpectrum;
use spectral_pt::{spherical_direction, Float, Point2f, Vec3f, PI};

const N_SAMPLES: usize = 20_000;

fn outgoing(cos_theta: Float, phi: Float) -> Vec3f {
    spherical_direction((1.0 - cos_theta * cos_theta).sqrt(), cos_theta, phi)
}

fn rough_conductor() -> BxDF {
    ConductorBxDF::new(
        TrowbridgeReitzDistribution::new(0.3, 0.3),
        SampledSpectrum::uniform(0.2),
        SampledSpectrum::uniform(3.0),
    )
    .into()
}

fn rough_dielectric() -> BxDF {
    DielectricBxDF::new(1.5, TrowbridgeReitzDistribution::new(0.3, 0.3)).into()
}

fn diffuse(r: Float) -> BxDF {
    DiffuseBxDF::new(SampledSpectrum::uniform(r)).into()
}

fn coated_diffuse() -> BxDF {
    CoatedDiffuseBxDF::new(
        DielectricBxDF::new(1.5, TrowbridgeReitzDistribution::new(0.0, 0.0)),
        DiffuseBxDF::new(SampledSpectrum::uniform(0.5)),
        0.01,
        SampledSpectrum::zero(),
        0.0,
        10,
        1,
    )
    .into()
}

/// Estimates the directional albedo `∫ f |cos θi| dωi` by importance sampling.
fn albedo(bxdf: &BxDF, wo: Vec3f, rng: &mut Xoshiro256Plus) -> Float {
    let sum: Float = (0..N_SAMPLES)
        .filter_map(|_| {
            let u = Point2f::new(rng.gen(), rng.gen());
            bxdf.sample_f(wo, rng.gen(), u, TransportMode::Radiance, BxDFReflTransFlags::ALL)
        })
        .map(|bs| (bs.f * bs.wi.z.abs() / bs.pdf).average())
        .sum();
    sum / N_SAMPLES as Float
}

#[test]
fn sampled_pdf_matches_evaluated_pdf() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(7);
    for bxdf in [diffuse(0.5), rough_conductor(), rough_dielectric()] {
        for &cos_theta in &[0.9, 0.6, 0.3] {
            let wo = outgoing(cos_theta, 0.7);
            let mut checked = 0;
            for _ in 0..2_000 {
                let u = Point2f::new(rng.gen(), rng.gen());
                let bs = match bxdf.sample_f(wo, rng.gen(), u, TransportMode::Radiance, BxDFReflTransFlags::ALL) {
                    Some(bs) => bs,
                    None => continue,
                };
                if bs.pdf_is_proportional || bs.is_specular() || bs.pdf < 1e-3 {
                    continue;
                }
                let pdf = bxdf.pdf(wo, bs.wi, TransportMode::Radiance, BxDFReflTransFlags::ALL);
                assert_relative_eq!(bs.pdf, pdf, max_relative = 1e-2);
                let f = bxdf.f(wo, bs.wi, TransportMode::Radiance);
                assert_relative_eq!(bs.f.average(), f.average(), max_relative = 1e-2);
                checked += 1;
            }
            assert!(checked > 1_000, "{:?} produced only {} usable samples", bxdf, checked);
        }
    }
    Ok(())
}

#[test]
fn diffuse_albedo_matches_reflectance() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(11);
    let bxdf = diffuse(0.5);
    for &cos_theta in &[1.0, 0.5, 0.1] {
        assert_relative_eq!(albedo(&bxdf, outgoing(cos_theta, 0.0), &mut rng), 0.5, max_relative = 1e-3);
    }
    Ok(())
}

/// Under cosine-weighted sampling `cos² θ` is uniform on [0, 1], so its histogram should pass a
/// χ² test against equal bin counts.
#[test]
fn diffuse_directions_follow_cosine_distribution() -> anyhow::Result<()> {
    const N: usize = 200_000;
    const BINS: usize = 10;
    // χ² critical value for 9 degrees of freedom at p = 0.001
    const CRITICAL: f64 = 27.88;

    let mut rng = Xoshiro256Plus::seed_from_u64(19);
    let bxdf = diffuse(0.5);
    let wo = Vec3f::new(0.0, 0.0, 1.0);
    let mut counts = [0usize; BINS];
    for _ in 0..N {
        let u = Point2f::new(rng.gen(), rng.gen());
        // only exactly horizontal directions (pdf 0) are rejected
        let bs = match bxdf.sample_f(wo, rng.gen(), u, TransportMode::Radiance, BxDFReflTransFlags::ALL) {
            Some(bs) => bs,
            None => continue,
        };
        assert!(bs.wi.z >= 0.0);
        assert_relative_eq!(bs.pdf, bs.wi.z / PI, max_relative = 1e-4, epsilon = 1e-6);

        let bin = ((bs.wi.z * bs.wi.z) as f64 * BINS as f64) as usize;
        counts[bin.min(BINS - 1)] += 1;
    }

    let total: usize = counts.iter().sum();
    assert!(total > N - 10);
    let expected = total as f64 / BINS as f64;
    let chi2: f64 = counts.iter().map(|&c| (c as f64 - expected).powi(2) / expected).sum();
    assert!(chi2 < CRITICAL, "χ² = {} for bin counts {:?}", chi2, counts);
    Ok(())
}

#[test]
fn reflective_models_conserve_energy() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(13);
    for bxdf in [diffuse(0.99), rough_conductor(), coated_diffuse()] {
        for &cos_theta in &[0.95, 0.5, 0.2] {
            let a = albedo(&bxdf, outgoing(cos_theta, 1.3), &mut rng);
            assert!(a > 0.0 && a <= 1.02, "{:?} has albedo {} at cos θ = {}", bxdf, a, cos_theta);
        }
    }
    Ok(())
}

#[test]
fn reflection_is_reciprocal() -> anyhow::Result<()> {
    let mut rng = Xoshiro256Plus::seed_from_u64(17);
    for bxdf in [diffuse(0.5), rough_conductor()] {
        for _ in 0..500 {
            let wo = outgoing(rng.gen_range(0.05..1.0), rng.gen_range(0.0..6.28));
            let wi = outgoing(rng.gen_range(0.05..1.0), rng.gen_range(0.0..6.28));
            let f_oi = bxdf.f(wo, wi, TransportMode::Radiance);
            let f_io = bxdf.f(wi, wo, TransportMode::Radiance);
            assert_relative_eq!(f_oi.average(), f_io.average(), max_relative = 1e-3, epsilon = 1e-6);
        }
    }
    Ok(())
}
