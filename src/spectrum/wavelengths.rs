use crate::lerp;
use crate::sampling::{sample_visible_wavelengths, visible_wavelengths_pdf};
use crate::Float;

use super::{SampledSpectrum, LAMBDA_MAX, LAMBDA_MIN, NUM_SPECTRUM_SAMPLES};

/// The wavelengths carried along one camera path, with the density each was sampled with.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampledWavelengths {
    lambda: [Float; NUM_SPECTRUM_SAMPLES],
    pdf: [Float; NUM_SPECTRUM_SAMPLES],
}

impl SampledWavelengths {
    /// Stratified uniform wavelengths over `[lambda_min, lambda_max]`.
    pub fn sample_uniform(u: Float, lambda_min: Float, lambda_max: Float) -> Self {
        let mut lambda = [0.0; NUM_SPECTRUM_SAMPLES];
        lambda[0] = lerp(u, lambda_min, lambda_max);
        let delta = (lambda_max - lambda_min) / NUM_SPECTRUM_SAMPLES as Float;
        for i in 1..NUM_SPECTRUM_SAMPLES {
            lambda[i] = lambda[i - 1] + delta;
            if lambda[i] > lambda_max {
                lambda[i] = lambda_min + (lambda[i] - lambda_max);
            }
        }

        let pdf = [1.0 / (lambda_max - lambda_min); NUM_SPECTRUM_SAMPLES];
        Self { lambda, pdf }
    }

    pub fn sample_uniform_visible(u: Float) -> Self {
        Self::sample_uniform(u, LAMBDA_MIN, LAMBDA_MAX)
    }

    /// Importance samples wavelengths by the visual response, one stratum of `u` per wavelength.
    pub fn sample_visible(u: Float) -> Self {
        let mut lambda = [0.0; NUM_SPECTRUM_SAMPLES];
        let mut pdf = [0.0; NUM_SPECTRUM_SAMPLES];
        for i in 0..NUM_SPECTRUM_SAMPLES {
            let mut up = u + i as Float / NUM_SPECTRUM_SAMPLES as Float;
            if up > 1.0 {
                up -= 1.0;
            }
            lambda[i] = sample_visible_wavelengths(up);
            pdf[i] = visible_wavelengths_pdf(lambda[i]);
        }
        Self { lambda, pdf }
    }

    pub fn lambda(&self, i: usize) -> Float {
        self.lambda[i]
    }

    pub fn pdf(&self) -> SampledSpectrum {
        SampledSpectrum::from(self.pdf)
    }

    /// Drops every wavelength but the first, e.g. after refraction through a dispersive interface.
    pub fn terminate_secondary(&mut self) {
        if self.secondary_terminated() {
            return;
        }
        for p in self.pdf.iter_mut().skip(1) {
            *p = 0.0;
        }
        self.pdf[0] /= NUM_SPECTRUM_SAMPLES as Float;
    }

    pub fn secondary_terminated(&self) -> bool {
        self.pdf.iter().skip(1).all(|&p| p == 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Float> + '_ {
        self.lambda.iter().cloned()
    }
}

impl std::ops::Index<usize> for SampledWavelengths {
    type Output = Float;

    fn index(&self, index: usize) -> &Float {
        &self.lambda[index]
    }
}
