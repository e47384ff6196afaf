//! Structural checks on a proposed test definition.
//!
//! Checks run in a fixed order and the first failure wins, so the error a
//! caller sees for a given candidate is stable.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{AbTestError, Result};
use crate::model::AbTest;

pub const MIN_VARIANTS: usize = 2;
pub const MAX_VARIANTS: usize = 10;

/// Tolerance for the weight sum, absorbs e.g. 33.33 + 33.33 + 33.34.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

/// Outcome of [`validate_ab_test`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self { valid: true, error: None }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self { valid: false, error: Some(error.into()) }
    }
}

/// Validate a candidate test, reporting the first failure as a message.
pub fn validate_ab_test(candidate: &AbTest) -> ValidationResult {
    match check_ab_test(candidate) {
        Ok(()) => ValidationResult::ok(),
        Err(e) => {
            tracing::warn!(test_id = %candidate.id, error = %e, "rejected test definition");
            ValidationResult::invalid(e.to_string())
        }
    }
}

/// Same checks as [`validate_ab_test`], as a `Result` for `?` callers.
pub fn check_ab_test(candidate: &AbTest) -> Result<()> {
    if candidate.name.trim().is_empty() {
        return Err(AbTestError::MissingName);
    }
    if candidate.form_id.trim().is_empty() {
        return Err(AbTestError::MissingFormId);
    }

    let count = candidate.variants.len();
    if count < MIN_VARIANTS {
        return Err(AbTestError::TooFewVariants(count));
    }
    if count > MAX_VARIANTS {
        return Err(AbTestError::TooManyVariants(count));
    }

    let weight_sum: f64 = candidate.variants.iter().map(|v| v.weight).sum();
    if !weight_sum.is_finite() || (weight_sum - 100.0).abs() > WEIGHT_SUM_TOLERANCE {
        return Err(AbTestError::WeightSum(weight_sum));
    }

    if !(0.0..=100.0).contains(&candidate.traffic_allocation) {
        return Err(AbTestError::TrafficAllocation(candidate.traffic_allocation));
    }

    let mut seen = HashSet::with_capacity(count);
    for v in &candidate.variants {
        if !seen.insert(v.id.as_str()) {
            return Err(AbTestError::DuplicateVariantId(v.id.clone()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Variant;

    fn valid_test() -> AbTest {
        AbTest::new("form_1", "Signup copy", "alice")
            .with_variant(Variant::new("Control", 50.0))
            .with_variant(Variant::new("Treatment", 50.0))
    }

    fn error_of(t: &AbTest) -> String {
        let r = validate_ab_test(t);
        assert!(!r.valid);
        r.error.unwrap_or_default()
    }

    #[test]
    fn test_valid_config_accepted() {
        let r = validate_ab_test(&valid_test());
        assert!(r.valid);
        assert!(r.error.is_none());
    }

    #[test]
    fn test_blank_name_rejected() {
        let t = AbTest { name: "   ".into(), ..valid_test() };
        assert!(error_of(&t).contains("name is required"));
    }

    #[test]
    fn test_missing_form_id_rejected() {
        let t = AbTest { form_id: String::new(), ..valid_test() };
        assert!(error_of(&t).contains("Form ID is required"));
    }

    #[test]
    fn test_one_variant_rejected() {
        let mut t = valid_test();
        t.variants.truncate(1);
        t.variants[0].weight = 100.0;
        assert!(error_of(&t).contains("At least 2 variants"));
    }

    #[test]
    fn test_eleven_variants_rejected() {
        let mut t = valid_test();
        t.variants = (0..11).map(|i| Variant::new(format!("V{i}"), 100.0 / 11.0)).collect();
        assert!(error_of(&t).contains("Maximum 10 variants"));
    }

    #[test]
    fn test_ten_variants_accepted() {
        let mut t = valid_test();
        t.variants = (0..10).map(|i| Variant::new(format!("V{i}"), 10.0)).collect();
        assert!(validate_ab_test(&t).valid);
    }

    #[test]
    fn test_weights_sum_60_rejected() {
        let mut t = valid_test();
        t.variants[0].weight = 30.0;
        t.variants[1].weight = 30.0;
        assert!(error_of(&t).contains("sum to 100"));
    }

    #[test]
    fn test_weight_sum_within_tolerance_accepted() {
        let mut t = valid_test();
        t.variants = vec![
            Variant::new("A", 33.33),
            Variant::new("B", 33.33),
            Variant::new("C", 33.34),
        ];
        assert!(validate_ab_test(&t).valid);
    }

    #[test]
    fn test_traffic_allocation_negative_rejected() {
        let t = valid_test().with_traffic_allocation(-1.0);
        assert!(!validate_ab_test(&t).valid);
    }

    #[test]
    fn test_traffic_allocation_above_100_rejected() {
        let t = valid_test().with_traffic_allocation(101.0);
        assert!(!validate_ab_test(&t).valid);
    }

    #[test]
    fn test_traffic_allocation_zero_accepted() {
        let t = valid_test().with_traffic_allocation(0.0);
        assert_eq!(validate_ab_test(&t), ValidationResult::ok());
    }

    #[test]
    fn test_duplicate_variant_ids_rejected() {
        let mut t = valid_test();
        t.variants[1].id = t.variants[0].id.clone();
        assert!(error_of(&t).contains("unique"));
    }

    #[test]
    fn test_first_failure_wins() {
        // Blank name and bad weights: the name check runs first.
        let mut t = AbTest { name: String::new(), ..valid_test() };
        t.variants[0].weight = 10.0;
        assert!(error_of(&t).contains("name is required"));
    }

    #[test]
    fn test_check_ab_test_returns_typed_error() {
        let t = AbTest { form_id: String::new(), ..valid_test() };
        assert!(matches!(check_ab_test(&t), Err(AbTestError::MissingFormId)));
    }

    #[test]
    fn test_validation_result_json_omits_error_when_valid() {
        let json = serde_json::to_string(&ValidationResult::ok()).unwrap();
        assert_eq!(json, r#"{"valid":true}"#);
    }
}
