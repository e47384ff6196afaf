//! # Stage: Test Result Analyzer
//!
//! ## Responsibility
//! Turns a test's accumulated counters into a report: per-variant rates with
//! confidence intervals, a chi-squared significance test across variants,
//! an optional winner and a human-readable recommendation.
//!
//! ## Guarantees
//! - Non-panicking: an empty variant list yields an empty report
//! - A winner is declared only when the chi-squared test is significant
//!
//! ## NOT Responsible For
//! - Stopping the test or promoting the winner (caller's concern)

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::model::AbTest;
use crate::stats::{calculate_chi_squared_with, calculate_conversion_rate_with, ChiSquaredResult};

/// Per-variant row of a [`TestReport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantResult {
    pub variant_id: String,
    pub name: String,
    pub impressions: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
    pub confidence_interval: (f64, f64),
    /// Relative change against the first (control) variant. `None` for the
    /// control itself and when the control rate is 0.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lift: Option<f64>,
}

/// Output of [`analyze_test_results`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub variants: Vec<VariantResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    /// `1 - p`.
    pub confidence: f64,
    pub recommendation: String,
    pub significance: ChiSquaredResult,
}

impl TestReport {
    pub fn winning_variant(&self) -> Option<&VariantResult> {
        let id = self.winner.as_deref()?;
        self.variants.iter().find(|v| v.variant_id == id)
    }
}

/// Analyze `test` at 95% confidence and p < 0.05.
pub fn analyze_test_results(test: &AbTest) -> TestReport {
    analyze_test_results_with(test, &AnalysisConfig::default())
}

/// Analyze `test` with a custom confidence level and significance threshold.
/// An out-of-range `config` falls back to [`AnalysisConfig::default`].
pub fn analyze_test_results_with(test: &AbTest, config: &AnalysisConfig) -> TestReport {
    let mut variants: Vec<VariantResult> = test
        .variants
        .iter()
        .map(|v| {
            let cr = calculate_conversion_rate_with(v.conversions, v.impressions, config);
            VariantResult {
                variant_id: v.id.clone(),
                name: v.name.clone(),
                impressions: v.impressions,
                conversions: v.conversions,
                conversion_rate: cr.rate,
                confidence_interval: cr.confidence_interval,
                lift: None,
            }
        })
        .collect();

    if let Some(control_rate) = variants.first().map(|v| v.conversion_rate) {
        if control_rate > 0.0 {
            for v in variants.iter_mut().skip(1) {
                v.lift = Some((v.conversion_rate - control_rate) / control_rate);
            }
        }
    }

    let significance = calculate_chi_squared_with(&test.variants, config);
    let confidence = 1.0 - significance.p_value;

    let best = if significance.is_significant { best_variant(&variants) } else { None };
    let winner = best.map(|v| v.variant_id.clone());

    let recommendation = if variants.is_empty() {
        "Not enough data to analyze: the test has no variants.".to_string()
    } else if let Some(v) = best {
        format!(
            "{} is the winner with a {:.2}% conversion rate ({:.1}% confidence).",
            v.name,
            v.conversion_rate * 100.0,
            confidence * 100.0
        )
    } else if test.total_impressions() == 0 {
        "Not enough data yet: results are not statistically significant. Keep the test running.".to_string()
    } else {
        format!(
            "Results are not statistically significant yet ({:.1}% confidence). Keep the test running to collect more data.",
            confidence * 100.0
        )
    };

    tracing::debug!(
        test_id = %test.id,
        chi_squared = significance.chi_squared,
        p_value = significance.p_value,
        winner = winner.as_deref().unwrap_or("none"),
        "analyzed test results"
    );

    TestReport { variants, winner, confidence, recommendation, significance }
}

/// Highest conversion rate; ties go to the earlier variant.
fn best_variant(variants: &[VariantResult]) -> Option<&VariantResult> {
    let mut best: Option<&VariantResult> = None;
    for v in variants {
        if best.map_or(true, |b| v.conversion_rate > b.conversion_rate) {
            best = Some(v);
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
