use crate::Float;

pub const INFINITY: Float = std::f32::INFINITY;
pub const NEG_INFINITY: Float = std::f32::NEG_INFINITY;

pub const PI: Float = std::f32::consts::PI;
pub const INV_PI: Float = std::f32::consts::FRAC_1_PI;
pub const INV_2PI: Float = 0.5 * std::f32::consts::FRAC_1_PI;
pub const INV_4PI: Float = 0.25 * std::f32::consts::FRAC_1_PI;
pub const PI_OVER_2: Float = std::f32::consts::FRAC_PI_2;
pub const PI_OVER_4: Float = std::f32::consts::FRAC_PI_4;

/// The largest float strictly less than one.
pub const ONE_MINUS_EPSILON: Float = 1.0 - std::f32::EPSILON / 2.0;

pub fn lerp(t: Float, v1: Float, v2: Float) -> Float {
    (1.0 - t) * v1 + t * v2
}

#[inline]
pub fn sqr(x: Float) -> Float {
    x * x
}

pub fn clamp<T: PartialOrd>(v: T, low: T, high: T) -> T {
    if v < low {
        low
    } else if v > high {
        high
    } else {
        v
    }
}

pub fn safe_sqrt(x: Float) -> Float {
    Float::sqrt(Float::max(0.0, x))
}

pub fn safe_asin(x: Float) -> Float {
    clamp(x, -1.0, 1.0).asin()
}

pub fn safe_acos(x: Float) -> Float {
    clamp(x, -1.0, 1.0).acos()
}

/// Computes `a * b - c * d` with a single rounding error, using an FMA to recover the
/// error of the `c * d` product.
#[inline]
pub fn difference_of_products(a: Float, b: Float, c: Float, d: Float) -> Float {
    let cd = c * d;
    let dop = a.mul_add(b, -cd);
    let err = (-c).mul_add(d, cd);
    dop + err
}

/// Computes `a * b + c * d`, see `difference_of_products`.
#[inline]
pub fn sum_of_products(a: Float, b: Float, c: Float, d: Float) -> Float {
    let cd = c * d;
    let sop = a.mul_add(b, cd);
    let err = c.mul_add(d, -cd);
    sop + err
}

pub fn difference_of_products_f64(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let cd = c * d;
    let dop = a.mul_add(b, -cd);
    let err = (-c).mul_add(d, cd);
    dop + err
}

pub fn gaussian(x: Float, mu: Float, sigma: Float) -> Float {
    1.0 / (2.0 * PI * sigma * sigma).sqrt() * (-sqr(x - mu) / (2.0 * sigma * sigma)).exp()
}

/// Balance between two sampling strategies with the power heuristic (beta = 2).
pub fn power_heuristic(nf: u32, f_pdf: Float, ng: u32, g_pdf: Float) -> Float {
    let f = nf as Float * f_pdf;
    let g = ng as Float * g_pdf;
    if (f * f).is_infinite() {
        return 1.0;
    }
    if f == 0.0 && g == 0.0 {
        return 0.0;
    }
    (f * f) / (f * f + g * g)
}

pub fn safe_div(a: Float, b: Float) -> Float {
    if b == 0.0 { 0.0 } else { a / b }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_difference_of_products() {
        // cancellation that a naive evaluation gets wrong in f32
        let a = 33962.035;
        let b = 41563.4;
        let c = 7706.415;
        let d = 183165.45;
        let exact = a as f64 * b as f64 - c as f64 * d as f64;
        assert_relative_eq!(difference_of_products(a, b, c, d) as f64, exact, max_relative = 1e-6);
    }

    #[test]
    fn test_power_heuristic() {
        assert_eq!(power_heuristic(1, 1.0, 1, 0.0), 1.0);
        assert_eq!(power_heuristic(1, 0.0, 1, 0.0), 0.0);
        assert_relative_eq!(power_heuristic(1, 1.0, 1, 1.0), 0.5);
        assert_eq!(power_heuristic(1, INFINITY, 1, 1.0), 1.0);
    }

    #[test]
    fn test_one_minus_epsilon() {
        assert!(ONE_MINUS_EPSILON < 1.0);
        assert_eq!(crate::interval::next_float_up(ONE_MINUS_EPSILON), 1.0);
    }
}
