use anyhow::ensure;
use once_cell::sync::Lazy;

use crate::{lerp, Float};

use super::{SampledSpectrum, SampledWavelengths};

/// A continuous spectral distribution that can be point-sampled at any wavelength.
#[derive(Clone, Debug, PartialEq)]
pub enum Spectrum {
    Constant(Float),
    PiecewiseLinear(PiecewiseLinearSpectrum),
    Blackbody(BlackbodySpectrum),
    Scaled(Float, Box<Spectrum>),
}

impl Spectrum {
    pub fn constant(c: Float) -> Self {
        Spectrum::Constant(c)
    }

    pub fn blackbody(t: Float) -> Self {
        Spectrum::Blackbody(BlackbodySpectrum::new(t))
    }

    pub fn scaled(self, scale: Float) -> Self {
        Spectrum::Scaled(scale, Box::new(self))
    }

    pub fn evaluate(&self, lambda: Float) -> Float {
        match self {
            Spectrum::Constant(c) => *c,
            Spectrum::PiecewiseLinear(s) => s.evaluate(lambda),
            Spectrum::Blackbody(s) => s.evaluate(lambda),
            Spectrum::Scaled(scale, s) => scale * s.evaluate(lambda),
        }
    }

    pub fn sample(&self, lambda: &SampledWavelengths) -> SampledSpectrum {
        SampledSpectrum::new_with(|i| self.evaluate(lambda[i]))
    }

    pub fn is_constant(&self) -> bool {
        match self {
            Spectrum::Constant(_) => true,
            Spectrum::Scaled(_, s) => s.is_constant(),
            _ => false,
        }
    }

    pub fn max_value(&self) -> Float {
        match self {
            Spectrum::Constant(c) => *c,
            Spectrum::PiecewiseLinear(s) => s.values.iter().cloned().fold(0.0, Float::max),
            Spectrum::Blackbody(_) => 1.0,
            Spectrum::Scaled(scale, s) => scale * s.max_value(),
        }
    }
}

impl From<Float> for Spectrum {
    fn from(c: Float) -> Self {
        Spectrum::Constant(c)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PiecewiseLinearSpectrum {
    lambdas: Vec<Float>,
    values: Vec<Float>,
}

impl PiecewiseLinearSpectrum {
    pub fn new(lambdas: Vec<Float>, values: Vec<Float>) -> anyhow::Result<Self> {
        ensure!(lambdas.len() == values.len(), "spectrum has {} wavelengths but {} values", lambdas.len(), values.len());
        ensure!(!lambdas.is_empty(), "spectrum needs at least one sample");
        ensure!(lambdas.windows(2).all(|w| w[0] < w[1]), "spectrum wavelengths must be strictly increasing");
        Ok(Self { lambdas, values })
    }

    /// Builds a spectrum from `(lambda, value)` pairs stored one after another.
    pub fn from_interleaved(data: &[Float]) -> anyhow::Result<Self> {
        ensure!(data.len() % 2 == 0, "interleaved spectrum data has odd length {}", data.len());
        let lambdas = data.iter().step_by(2).cloned().collect();
        let values = data.iter().skip(1).step_by(2).cloned().collect();
        Self::new(lambdas, values)
    }

    pub fn evaluate(&self, lambda: Float) -> Float {
        let n = self.lambdas.len();
        if lambda < self.lambdas[0] || lambda > self.lambdas[n - 1] {
            return 0.0;
        }
        if n == 1 {
            return self.values[0];
        }
        let o = self.lambdas.partition_point(|&l| l <= lambda).saturating_sub(1).min(n - 2);
        let t = (lambda - self.lambdas[o]) / (self.lambdas[o + 1] - self.lambdas[o]);
        lerp(t, self.values[o], self.values[o + 1])
    }
}

/// Emission of a blackbody at temperature `t` Kelvin, normalized to 1 at its peak.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlackbodySpectrum {
    t: Float,
    normalization: Float,
}

impl BlackbodySpectrum {
    pub fn new(t: Float) -> Self {
        let lambda_max = 2.897_772_1e-3 / t as f64;
        let normalization = 1.0 / planck(lambda_max * 1e9, t as f64);
        Self { t, normalization: normalization as Float }
    }

    pub fn evaluate(&self, lambda: Float) -> Float {
        (planck(lambda as f64, self.t as f64) * self.normalization as f64) as Float
    }
}

/// Planck's law for wavelength `lambda` in nm.
fn planck(lambda: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    const C: f64 = 299_792_458.0;
    const H: f64 = 6.626_069_57e-34;
    const KB: f64 = 1.380_648_8e-23;
    let l = lambda * 1e-9;
    (2.0 * H * C * C) / (l.powi(5) * (((H * C) / (l * KB * t)).exp() - 1.0))
}

fn metal(data: &[Float]) -> Spectrum {
    match PiecewiseLinearSpectrum::from_interleaved(data) {
        Ok(s) => Spectrum::PiecewiseLinear(s),
        Err(e) => unreachable!("built-in metal table is malformed: {}", e),
    }
}

/// Named spectra for the complex index of refraction of common conductors.
pub fn named_spectrum(name: &str) -> Option<&'static Spectrum> {
    match name {
        "metal-Ag-eta" => Some(&*AG_ETA),
        "metal-Ag-k" => Some(&*AG_K),
        "metal-Au-eta" => Some(&*AU_ETA),
        "metal-Au-k" => Some(&*AU_K),
        "metal-Cu-eta" => Some(&*CU_ETA),
        "metal-Cu-k" => Some(&*CU_K),
        "metal-Al-eta" => Some(&*AL_ETA),
        "metal-Al-k" => Some(&*AL_K),
        _ => None,
    }
}

pub static AG_ETA: Lazy<Spectrum> = Lazy::new(|| metal(&AG_ETA_DATA));
pub static AG_K: Lazy<Spectrum> = Lazy::new(|| metal(&AG_K_DATA));
pub static AU_ETA: Lazy<Spectrum> = Lazy::new(|| metal(&AU_ETA_DATA));
pub static AU_K: Lazy<Spectrum> = Lazy::new(|| metal(&AU_K_DATA));
pub static CU_ETA: Lazy<Spectrum> = Lazy::new(|| metal(&CU_ETA_DATA));
pub static CU_K: Lazy<Spectrum> = Lazy::new(|| metal(&CU_K_DATA));
pub static AL_ETA: Lazy<Spectrum> = Lazy::new(|| metal(&AL_ETA_DATA));
pub static AL_K: Lazy<Spectrum> = Lazy::new(|| metal(&AL_K_DATA));

#[rustfmt::skip]
const AG_ETA_DATA: [Float; 112] = [
    298.757050, 1.519000, 302.400421, 1.496000, 306.133759, 1.432500, 309.960449, 1.323000,
    313.884003, 1.142062, 317.908142, 0.932000, 322.036835, 0.719062, 326.274139, 0.526000,
    330.624481, 0.388125, 335.092377, 0.294000, 339.682678, 0.253313, 344.400482, 0.238000,
    349.251221, 0.221438, 354.240509, 0.209000, 359.374420, 0.194813, 364.659332, 0.186000,
    370.102020, 0.192063, 375.709625, 0.200000, 381.489777, 0.198063, 387.450562, 0.192000,
    393.600555, 0.182000, 399.948975, 0.173000, 406.505493, 0.172625, 413.280579, 0.173000,
    420.285339, 0.166688, 427.531647, 0.160000, 435.032196, 0.158500, 442.800629, 0.157000,
    450.851562, 0.151063, 459.200653, 0.144000, 467.864838, 0.137313, 476.862213, 0.132000,
    486.212463, 0.130250, 495.936707, 0.130000, 506.057861, 0.129938, 516.600769, 0.130000,
    527.592224, 0.130063, 539.061646, 0.129000, 551.040771, 0.124375, 563.564453, 0.120000,
    576.670593, 0.119313, 590.400818, 0.121000, 604.800842, 0.125500, 619.920898, 0.131000,
    635.816284, 0.136125, 652.548279, 0.140000, 670.184753, 0.140063, 688.800964, 0.140000,
    708.481018, 0.144313, 729.318665, 0.148000, 751.419250, 0.145875, 774.901123, 0.143000,
    799.897949, 0.142563, 826.561157, 0.145000, 855.063293, 0.151938, 885.601257, 0.163000,
];

#[rustfmt::skip]
const AG_K_DATA: [Float; 112] = [
    298.757050, 1.080000, 302.400421, 0.882000, 306.133759, 0.761063, 309.960449, 0.647000,
    313.884003, 0.550875, 317.908142, 0.504000, 322.036835, 0.554375, 326.274139, 0.663000,
    330.624481, 0.818563, 335.092377, 0.986000, 339.682678, 1.120687, 344.400482, 1.240000,
    349.251221, 1.345250, 354.240509, 1.440000, 359.374420, 1.533750, 364.659332, 1.610000,
    370.102020, 1.641875, 375.709625, 1.670000, 381.489777, 1.735000, 387.450562, 1.810000,
    393.600555, 1.878750, 399.948975, 1.950000, 406.505493, 2.029375, 413.280579, 2.110000,
    420.285339, 2.186250, 427.531647, 2.260000, 435.032196, 2.329375, 442.800629, 2.400000,
    450.851562, 2.478750, 459.200653, 2.560000, 467.864838, 2.640000, 476.862213, 2.720000,
    486.212463, 2.798125, 495.936707, 2.880000, 506.057861, 2.973750, 516.600769, 3.070000,
    527.592224, 3.159375, 539.061646, 3.250000, 551.040771, 3.348125, 563.564453, 3.450000,
    576.670593, 3.553750, 590.400818, 3.660000, 604.800842, 3.766250, 619.920898, 3.880000,
    635.816284, 4.010625, 652.548279, 4.150000, 670.184753, 4.293125, 688.800964, 4.440000,
    708.481018, 4.586250, 729.318665, 4.740000, 751.419250, 4.908125, 774.901123, 5.090000,
    799.897949, 5.288750, 826.561157, 5.500000, 855.063293, 5.720624, 885.601257, 5.950000,
];

// Coarse tables at 50 nm spacing over the visible range.
#[rustfmt::skip]
const AU_ETA_DATA: [Float; 22] = [
    350.0, 1.65, 400.0, 1.47, 450.0, 1.39, 500.0, 0.97, 550.0, 0.43, 600.0, 0.25,
    650.0, 0.17, 700.0, 0.16, 750.0, 0.15, 800.0, 0.15, 850.0, 0.16,
];

#[rustfmt::skip]
const AU_K_DATA: [Float; 22] = [
    350.0, 1.95, 400.0, 1.95, 450.0, 1.90, 500.0, 1.87, 550.0, 2.45, 600.0, 2.98,
    650.0, 3.50, 700.0, 3.95, 750.0, 4.40, 800.0, 4.85, 850.0, 5.30,
];

#[rustfmt::skip]
const CU_ETA_DATA: [Float; 22] = [
    350.0, 1.26, 400.0, 1.18, 450.0, 1.16, 500.0, 1.12, 550.0, 0.96, 600.0, 0.27,
    650.0, 0.21, 700.0, 0.21, 750.0, 0.22, 800.0, 0.23, 850.0, 0.25,
];

#[rustfmt::skip]
const CU_K_DATA: [Float; 22] = [
    350.0, 2.04, 400.0, 2.21, 450.0, 2.41, 500.0, 2.60, 550.0, 2.58, 600.0, 3.24,
    650.0, 3.67, 700.0, 4.20, 750.0, 4.63, 800.0, 5.03, 850.0, 5.42,
];

#[rustfmt::skip]
const AL_ETA_DATA: [Float; 22] = [
    350.0, 0.37, 400.0, 0.49, 450.0, 0.62, 500.0, 0.77, 550.0, 0.96, 600.0, 1.20,
    650.0, 1.47, 700.0, 1.83, 750.0, 2.27, 800.0, 2.80, 850.0, 2.60,
];

#[rustfmt::skip]
const AL_K_DATA: [Float; 22] = [
    350.0, 4.25, 400.0, 4.86, 450.0, 5.47, 500.0, 6.08, 550.0, 6.69, 600.0, 7.26,
    650.0, 7.79, 700.0, 8.31, 750.0, 8.62, 800.0, 8.45, 850.0, 8.30,
];
