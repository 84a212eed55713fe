//! Numerical kernels behind the special-function nodes of [`crate::symbolic::symbolic_engine::Expr`]
//! and the normal quantile used for confidence intervals.
//!
//! All functions are total on `f64`: poles and out-of-domain arguments give NaN (or an
//! infinity where the limit is one) instead of an error, so they can sit inside compiled
//! closures that are evaluated over whole data vectors.
use std::f64::consts::{FRAC_2_SQRT_PI, PI, SQRT_2};

/// Below this magnitude erf is summed from its Taylor series, above it erfc comes from
/// the Laplace continued fraction.
const ERF_SERIES_LIMIT: f64 = 2.0;
const ERF_SERIES_TERMS: usize = 80;
const ERFC_FRACTION_TERMS: usize = 120;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.5203681218851,
    -1259.1392167224028,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507343278686905,
    -0.13857109526572012,
    9.984_369_578_019_572e-6,
    1.5056327351493116e-7,
];

/// B_2, B_4, ..., B_12
const BERNOULLI_EVEN: [f64; 6] = [
    1.0 / 6.0,
    -1.0 / 30.0,
    1.0 / 42.0,
    -1.0 / 30.0,
    5.0 / 66.0,
    -691.0 / 2730.0,
];

fn is_pole(x: f64) -> bool {
    x <= 0.0 && x.fract() == 0.0
}

fn erf_series(x: f64) -> f64 {
    let mut sum = 0.0;
    let mut power = x;
    let mut factorial = 1.0;
    for n in 0..ERF_SERIES_TERMS {
        let term = power / (factorial * (2 * n + 1) as f64);
        if n % 2 == 0 {
            sum += term;
        } else {
            sum -= term;
        }
        if term.abs() < f64::EPSILON * sum.abs() {
            break;
        }
        factorial *= (n + 1) as f64;
        power *= x * x;
    }
    FRAC_2_SQRT_PI * sum
}

/// erfc for x >= ERF_SERIES_LIMIT, evaluated bottom-up.
fn erfc_fraction(x: f64) -> f64 {
    let mut tail = 0.0;
    for n in (1..=ERFC_FRACTION_TERMS).rev() {
        tail = (n as f64 / 2.0) / (x + tail);
    }
    (-x * x).exp() / PI.sqrt() / (x + tail)
}

/// Gauss error function.
pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x.abs() < ERF_SERIES_LIMIT {
        erf_series(x)
    } else {
        x.signum() * (1.0 - erfc_fraction(x.abs()))
    }
}

/// Complementary error function, accurate in the far right tail.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x >= ERF_SERIES_LIMIT {
        erfc_fraction(x)
    } else if x <= -ERF_SERIES_LIMIT {
        2.0 - erfc_fraction(-x)
    } else {
        1.0 - erf_series(x)
    }
}

/// Euler gamma function (Lanczos approximation with reflection below 1/2).
pub fn gamma(x: f64) -> f64 {
    if x.is_nan() || is_pole(x) {
        return f64::NAN;
    }
    if x < 0.5 {
        return PI / ((PI * x).sin() * gamma(1.0 - x));
    }
    let x = x - 1.0;
    let mut ag = LANCZOS_COEFFS[0];
    for (i, &coeff) in LANCZOS_COEFFS.iter().enumerate().skip(1) {
        ag += coeff / (x + i as f64);
    }
    let t = x + LANCZOS_G + 0.5;
    // t^(x + 1/2) is split in two halves so it does not overflow before exp(-t) scales it
    let half_power = t.powf((x + 0.5) / 2.0);
    (2.0 * PI).sqrt() * half_power * ((-t).exp() * half_power) * ag
}

/// Digamma function, the logarithmic derivative of gamma.
pub fn digamma(x: f64) -> f64 {
    if x.is_nan() || is_pole(x) {
        return f64::NAN;
    }
    let mut xv = x;
    let mut result = 0.0;
    while xv < 20.0 {
        result -= 1.0 / xv;
        xv += 1.0;
    }
    let x2 = xv * xv;
    result + xv.ln() - 0.5 / xv - 1.0 / (12.0 * x2) + 1.0 / (120.0 * x2 * x2)
        - 1.0 / (252.0 * x2.powi(3))
        + 1.0 / (240.0 * x2.powi(4))
}

/// Trigamma function, the derivative of digamma.
pub fn trigamma(x: f64) -> f64 {
    polygamma(1, x)
}

fn factorial(n: u32) -> f64 {
    (1..=n).fold(1.0, |acc, i| acc * i as f64)
}

/// n-th derivative of the digamma function.
///
/// The argument is pushed above 20 with ψ⁽ⁿ⁾(x) = ψ⁽ⁿ⁾(x+1) - (-1)ⁿ n!/xⁿ⁺¹ and the
/// asymptotic expansion with Bernoulli numbers up to B₁₂ finishes the job.
pub fn polygamma(n: u32, x: f64) -> f64 {
    if n == 0 {
        return digamma(x);
    }
    if x.is_nan() || is_pole(x) {
        return f64::NAN;
    }
    let n_fact = factorial(n);
    let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
    let mut xv = x;
    let mut shifted = 0.0;
    while xv < 20.0 {
        shifted -= sign * n_fact / xv.powi(n as i32 + 1);
        xv += 1.0;
    }
    let mut series = factorial(n - 1) / xv.powi(n as i32) + n_fact / (2.0 * xv.powi(n as i32 + 1));
    for (k, &b2k) in BERNOULLI_EVEN.iter().enumerate() {
        let two_k = 2 * (k as u32 + 1);
        series += b2k * factorial(two_k + n - 1) / (factorial(two_k) * xv.powi((two_k + n) as i32));
    }
    // (-1)^(n+1) in front of the asymptotic part
    shifted - sign * series
}

/// Quantile function of the standard normal distribution.
///
/// Rational approximation by P. J. Acklam followed by one Halley step on erfc.
/// `norm_ppf(0) = -inf`, `norm_ppf(1) = inf`, NaN outside [0, 1].
pub fn norm_ppf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };
    let x = if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    };
    let e = 0.5 * erfc(-x / SQRT_2) - p;
    let u = e * (2.0 * PI).sqrt() * (x * x / 2.0).exp();
    x - u / (1.0 + x * u / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_erf_reference_values() {
        assert_eq!(erf(0.0), 0.0);
        assert_relative_eq!(erf(0.5), 0.5204998778130465, epsilon = 1e-14);
        assert_relative_eq!(erf(1.0), 0.8427007929497149, epsilon = 1e-14);
        assert_relative_eq!(erf(-1.0), -0.8427007929497149, epsilon = 1e-14);
        assert_relative_eq!(erf(3.0), 0.9999779095030014, epsilon = 1e-14);
        assert_relative_eq!(erfc(3.0), 2.209049699858544e-05, max_relative = 1e-12);
        assert_relative_eq!(erfc(6.0), 2.1519736712498913e-17, max_relative = 1e-12);
        assert_relative_eq!(erfc(-1.0), 1.8427007929497148, epsilon = 1e-14);
    }

    #[test]
    fn test_gamma_reference_values() {
        assert_relative_eq!(gamma(1.0), 1.0, max_relative = 1e-13);
        assert_relative_eq!(gamma(5.0), 24.0, max_relative = 1e-13);
        assert_relative_eq!(gamma(0.5), PI.sqrt(), max_relative = 1e-13);
        assert_relative_eq!(gamma(-0.5), -2.0 * PI.sqrt(), max_relative = 1e-13);
        assert_relative_eq!(gamma(150.0), 3.8089226376305e260, max_relative = 1e-10);
        assert!(gamma(0.0).is_nan());
        assert!(gamma(-3.0).is_nan());
    }

    #[test]
    fn test_polygamma_reference_values() {
        let euler_gamma = 0.5772156649015329;
        assert_relative_eq!(digamma(1.0), -euler_gamma, epsilon = 1e-12);
        assert_relative_eq!(digamma(0.5), -euler_gamma - 2.0 * 2f64.ln(), epsilon = 1e-12);
        assert_relative_eq!(trigamma(1.0), PI * PI / 6.0, epsilon = 1e-12);
        // -2 zeta(3)
        assert_relative_eq!(polygamma(2, 1.0), -2.4041138063191885, epsilon = 1e-11);
        // 6 zeta(4)
        assert_relative_eq!(polygamma(3, 1.0), PI.powi(4) / 15.0, epsilon = 1e-10);
        assert!(polygamma(1, -2.0).is_nan());
    }

    #[test]
    fn test_polygamma_matches_recurrence() {
        for n in 0..4u32 {
            let x: f64 = 2.7;
            let step = if n % 2 == 0 { 1.0 } else { -1.0 } * factorial(n) / x.powi(n as i32 + 1);
            assert_relative_eq!(
                polygamma(n, x + 1.0),
                polygamma(n, x) + step,
                epsilon = 1e-11
            );
        }
    }

    #[test]
    fn test_norm_ppf() {
        assert_relative_eq!(norm_ppf(0.5), 0.0, epsilon = 1e-15);
        assert_relative_eq!(norm_ppf(0.975), 1.959963984540054, epsilon = 1e-12);
        assert_relative_eq!(norm_ppf(0.025), -1.959963984540054, epsilon = 1e-12);
        assert_relative_eq!(norm_ppf(0.995), 2.5758293035489004, epsilon = 1e-12);
        assert_relative_eq!(norm_ppf(1e-10), -6.361340902404056, epsilon = 1e-9);
        assert_eq!(norm_ppf(1.0), f64::INFINITY);
        assert!(norm_ppf(1.5).is_nan());
    }
}
