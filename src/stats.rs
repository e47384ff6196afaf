//! # Stage: Conversion Statistics
//!
//! ## Responsibility
//! Point estimate and Wilson score interval for one variant's conversion
//! rate, and a chi-squared test of independence across all variants of a
//! test (conversions vs non-conversions per variant).
//!
//! ## Guarantees
//! - Non-panicking: zero impressions, zero variants and a single variant all
//!   return neutral values (rate 0, interval [0, 0], chi-squared 0, p = 1)
//! - Never NaN: every division is guarded, and a snapshot with more
//!   conversions than impressions is saturated to `conversions = impressions`
//! - Bounded: intervals are clamped to [0, 1]
//!
//! ## NOT Responsible For
//! - Deciding a winner (see [`crate::analyze`])
//! - Sequential-testing corrections for repeated peeking

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::model::Counts;

// ---------------------------------------------------------------------------
// Conversion rate + Wilson interval
// ---------------------------------------------------------------------------

/// Conversion rate with its confidence interval `(lower, upper)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionRate {
    pub rate: f64,
    pub confidence_interval: (f64, f64),
}

/// Conversion rate with a 95% Wilson score interval.
pub fn calculate_conversion_rate(conversions: u64, impressions: u64) -> ConversionRate {
    calculate_conversion_rate_with(conversions, impressions, &AnalysisConfig::default())
}

/// Conversion rate with a Wilson score interval at `config.confidence_level`.
///
/// An out-of-range `config` falls back to [`AnalysisConfig::default`].
pub fn calculate_conversion_rate_with(
    conversions: u64,
    impressions: u64,
    config: &AnalysisConfig,
) -> ConversionRate {
    if impressions == 0 {
        return ConversionRate { rate: 0.0, confidence_interval: (0.0, 0.0) };
    }
    let config = config.checked_or_default();
    let conversions = conversions.min(impressions);
    let n = impressions as f64;
    let rate = conversions as f64 / n;
    let (lower, upper) = wilson_interval(conversions as f64, n, config.z_score());
    ConversionRate { rate, confidence_interval: (lower, upper) }
}

/// Wilson score interval for `successes` out of `n > 0` trials.
fn wilson_interval(successes: f64, n: f64, z: f64) -> (f64, f64) {
    let p = successes / n;
    let z2 = z * z;
    let center = (successes + z2 / 2.0) / (n + z2);
    let half_width = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / (1.0 + z2 / n);
    (
        (center - half_width).clamp(0.0, 1.0),
        (center + half_width).clamp(0.0, 1.0),
    )
}

// ---------------------------------------------------------------------------
// Chi-squared test of independence
// ---------------------------------------------------------------------------

/// Result of [`calculate_chi_squared`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChiSquaredResult {
    pub chi_squared: f64,
    pub p_value: f64,
    pub degrees_of_freedom: usize,
    pub is_significant: bool,
}

impl ChiSquaredResult {
    /// Result for inputs that can't support a test at all.
    pub fn neutral() -> Self {
        Self { chi_squared: 0.0, p_value: 1.0, degrees_of_freedom: 0, is_significant: false }
    }
}

/// Chi-squared test over a `k x 2` table, significant at p < 0.05.
pub fn calculate_chi_squared<C: Counts>(variants: &[C]) -> ChiSquaredResult {
    calculate_chi_squared_with(variants, &AnalysisConfig::default())
}

/// Chi-squared test, significant at p < `config.significance_threshold`.
///
/// Expected counts assume one pooled conversion rate across all variants.
/// Cells with zero expectation are skipped. Conversions above impressions
/// are saturated, and an out-of-range `config` falls back to the default.
pub fn calculate_chi_squared_with<C: Counts>(variants: &[C], config: &AnalysisConfig) -> ChiSquaredResult {
    if variants.len() < 2 {
        return ChiSquaredResult::neutral();
    }
    let config = config.checked_or_default();
    let degrees_of_freedom = variants.len() - 1;

    let total_impressions: u64 = variants.iter().map(|v| v.impressions()).sum();
    let total_conversions: u64 = variants.iter().map(saturated_conversions).sum();

    let mut chi_squared = 0.0;
    if total_impressions > 0 {
        let total_n = total_impressions as f64;
        let total_c = total_conversions as f64;
        for v in variants {
            let n = v.impressions() as f64;
            let observed_conv = saturated_conversions(v) as f64;
            let observed_non = n - observed_conv;
            // Multiply before dividing so equal rates give exact expectations.
            let expected_conv = n * total_c / total_n;
            let expected_non = n - expected_conv;
            chi_squared += cell_term(observed_conv, expected_conv);
            chi_squared += cell_term(observed_non, expected_non);
        }
    }

    let p_value = chi_squared_upper_tail(chi_squared, degrees_of_freedom as f64);
    ChiSquaredResult {
        chi_squared,
        p_value,
        degrees_of_freedom,
        is_significant: p_value < config.significance_threshold,
    }
}

fn saturated_conversions<C: Counts>(v: &C) -> u64 {
    v.conversions().min(v.impressions())
}

fn cell_term(observed: f64, expected: f64) -> f64 {
    if expected <= 0.0 {
        0.0
    } else {
        (observed - expected).powi(2) / expected
    }
}

/// P(X > x) for X ~ chi-squared with `df` degrees of freedom.
pub fn chi_squared_upper_tail(x: f64, df: f64) -> f64 {
    if df <= 0.0 || x.is_nan() || x <= 0.0 {
        return 1.0;
    }
    if !x.is_finite() {
        return 0.0;
    }
    regularized_gamma_q(df / 2.0, x / 2.0)
}

// ---------------------------------------------------------------------------
// Incomplete gamma function
// ---------------------------------------------------------------------------

const GAMMA_EPS: f64 = 1e-14;
const GAMMA_FPMIN: f64 = 1e-300;
const GAMMA_MAX_ITER: usize = 500;

/// Upper regularized incomplete gamma Q(a, x) = 1 - P(a, x), for a > 0.
///
/// Series expansion below `a + 1`, Lentz continued fraction above.
fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let q = if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    };
    q.clamp(0.0, 1.0)
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut term = 1.0 / a;
    let mut sum = term;
    for _ in 0..GAMMA_MAX_ITER {
        ap += 1.0;
        term *= x / ap;
        sum += term;
        if term.abs() < sum.abs() * GAMMA_EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - ln_gamma(a)).exp()
}

fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / GAMMA_FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=GAMMA_MAX_ITER {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < GAMMA_FPMIN {
            d = GAMMA_FPMIN;
        }
        c = b + an / c;
        if c.abs() < GAMMA_FPMIN {
            c = GAMMA_FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        h *= delta;
        if (delta - 1.0).abs() < GAMMA_EPS {
            break;
        }
    }
    (-x + a * x.ln() - ln_gamma(a)).exp() * h
}

/// Lanczos approximation (g = 7) of ln Γ(x) for x > 0.
#[allow(clippy::excessive_precision)]
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];

    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let t = x + 7.5;
    let mut acc = COEFFICIENTS[0];
    for (i, &coef) in COEFFICIENTS.iter().enumerate().skip(1) {
        acc += coef / (x + i as f64);
    }
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + acc.ln()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
