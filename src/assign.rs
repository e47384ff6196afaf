//! # Stage: Variant Assigner
//!
//! ## Responsibility
//! Deterministic hash bucketing of a user into a test variant, or out of the
//! test entirely when traffic allocation is below 100%.
//!
//! ## Guarantees
//! - Deterministic: a given `(test id, user id)` always maps to the same result,
//!   across restarts and across hosts (SHA-1, not the std `Hasher`)
//! - Independent draws: inclusion and variant choice use different salts
//! - Total: every bucket in [0, 100) maps to exactly one variant
//!
//! ## NOT Responsible For
//! - Validating the test (see [`crate::validate`]); malformed input yields an
//!   unspecified but non-panicking result
//! - Recording the impression (caller's concern)

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::model::{AbTest, Variant};

const ALLOCATION_SALT: &str = "allocation";
const VARIANT_SALT: &str = "variant";

/// Result of [`assign_variant`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub in_test: bool,
    pub variant_id: Option<String>,
}

impl Assignment {
    pub fn excluded() -> Self {
        Self { in_test: false, variant_id: None }
    }

    pub fn assigned(variant_id: impl Into<String>) -> Self {
        Self { in_test: true, variant_id: Some(variant_id.into()) }
    }
}

/// Map `(test_id, user_id, salt)` to a pseudo-uniform value in `[0, 100)`.
///
/// Hashes `"{test_id}:{user_id}:{salt}"` with SHA-1 and takes the top 53 bits
/// of the first 8 digest bytes (big-endian), so the result is exactly
/// representable and strictly below 100. Exposed so other services can
/// reproduce assignments.
pub fn bucket(test_id: &str, user_id: &str, salt: &str) -> f64 {
    let mut hasher = Sha1::new();
    hasher.update(test_id.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    hasher.update(b":");
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let value = u64::from_be_bytes(head) >> 11;
    value as f64 / (1u64 << 53) as f64 * 100.0
}

/// Assign `user_id` to a variant of `test`, or exclude them from it.
pub fn assign_variant(test: &AbTest, user_id: &str) -> Assignment {
    let allocation_bucket = bucket(&test.id, user_id, ALLOCATION_SALT);
    if allocation_bucket >= test.traffic_allocation {
        tracing::debug!(test_id = %test.id, user_id, bucket = allocation_bucket, "user excluded from test");
        return Assignment::excluded();
    }

    let variant_bucket = bucket(&test.id, user_id, VARIANT_SALT);
    match select_variant(&test.variants, variant_bucket) {
        Some(v) => {
            tracing::debug!(test_id = %test.id, user_id, variant_id = %v.id, bucket = variant_bucket, "user assigned");
            Assignment::assigned(v.id.clone())
        }
        None => Assignment::excluded(),
    }
}

/// Walk cumulative weight ranges `[cum, cum + weight)` in declared order.
/// The last variant absorbs any floating-point remainder.
fn select_variant(variants: &[Variant], point: f64) -> Option<&Variant> {
    let (last, rest) = variants.split_last()?;
    let mut cumulative = 0.0;
    for v in rest {
        cumulative += v.weight;
        if point < cumulative {
            return Some(v);
        }
    }
    Some(last)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_with(weights: &[f64], traffic: f64) -> AbTest {
        let mut t = AbTest::new("form_1", "t", "u").with_traffic_allocation(traffic);
        t.id = "abtest_fixed".into();
        for (i, w) in weights.iter().enumerate() {
            let mut v = Variant::new(format!("V{i}"), *w);
            v.id = format!("var_{i}");
            t.variants.push(v);
        }
        t
    }

    #[test]
    fn test_bucket_in_range() {
        for i in 0..1000 {
            let b = bucket("abtest_x", &format!("user-{i}"), "allocation");
            assert!((0.0..100.0).contains(&b), "bucket={b}");
        }
    }

    #[test]
    fn test_bucket_stable() {
        assert_eq!(bucket("t", "u", "s"), bucket("t", "u", "s"));
    }

    #[test]
    fn test_bucket_known_answer() {
        // SHA-1("abtest_pinned:user-1:allocation"), top 53 bits scaled to [0, 100).
        assert_eq!(bucket("abtest_pinned", "user-1", ALLOCATION_SALT), 76.87501275042115);
        assert_eq!(bucket("abtest_pinned", "user-1", VARIANT_SALT), 12.140444514307347);
        assert_eq!(bucket("abtest_pinned", "user-2", ALLOCATION_SALT), 80.46809742693965);
    }

    #[test]
    fn test_assign_pinned_users() {
        let mut t = test_with(&[50.0, 50.0], 80.0);
        t.id = "abtest_pinned".into();
        assert_eq!(assign_variant(&t, "user-1"), Assignment::assigned("var_0"));
        assert_eq!(assign_variant(&t, "user-2"), Assignment::excluded());
        assert_eq!(assign_variant(&t, "user-5"), Assignment::assigned("var_1"));
    }

    #[test]
    fn test_bucket_salt_changes_value() {
        assert_ne!(bucket("t", "u", ALLOCATION_SALT), bucket("t", "u", VARIANT_SALT));
    }

    #[test]
    fn test_bucket_test_id_changes_value() {
        assert_ne!(bucket("t1", "u", "s"), bucket("t2", "u", "s"));
    }

    #[test]
    fn test_assign_deterministic() {
        let t = test_with(&[50.0, 50.0], 80.0);
        for i in 0..100 {
            let user = format!("user-{i}");
            assert_eq!(assign_variant(&t, &user), assign_variant(&t, &user));
        }
    }

    #[test]
    fn test_zero_allocation_always_excluded() {
        let t = test_with(&[50.0, 50.0], 0.0);
        for i in 0..500 {
            assert_eq!(assign_variant(&t, &format!("u{i}")), Assignment::excluded());
        }
    }

    #[test]
    fn test_full_allocation_always_included() {
        let t = test_with(&[50.0, 50.0], 100.0);
        for i in 0..500 {
            let a = assign_variant(&t, &format!("u{i}"));
            assert!(a.in_test);
            assert!(a.variant_id.is_some());
        }
    }

    #[test]
    fn test_single_variant_always_chosen() {
        let t = test_with(&[100.0], 100.0);
        for i in 0..200 {
            assert_eq!(assign_variant(&t, &format!("u{i}")).variant_id.as_deref(), Some("var_0"));
        }
    }

    #[test]
    fn test_select_variant_boundaries() {
        let t = test_with(&[70.0, 30.0], 100.0);
        assert_eq!(select_variant(&t.variants, 0.0).map(|v| v.id.as_str()), Some("var_0"));
        assert_eq!(select_variant(&t.variants, 69.999).map(|v| v.id.as_str()), Some("var_0"));
        assert_eq!(select_variant(&t.variants, 70.0).map(|v| v.id.as_str()), Some("var_1"));
        assert_eq!(select_variant(&t.variants, 99.999).map(|v| v.id.as_str()), Some("var_1"));
    }

    #[test]
    fn test_last_variant_absorbs_remainder() {
        // Weights sum slightly under 100.
        let t = test_with(&[33.33, 33.33, 33.33], 100.0);
        assert_eq!(select_variant(&t.variants, 99.995).map(|v| v.id.as_str()), Some("var_2"));
    }

    #[test]
    fn test_zero_weight_variant_never_chosen() {
        let t = test_with(&[0.0, 100.0], 100.0);
        for i in 0..300 {
            assert_eq!(assign_variant(&t, &format!("u{i}")).variant_id.as_deref(), Some("var_1"));
        }
    }

    #[test]
    fn test_no_variants_excluded_without_panic() {
        let t = test_with(&[], 100.0);
        assert_eq!(assign_variant(&t, "u"), Assignment::excluded());
    }

    #[test]
    fn test_assignment_json_shape() {
        let json = serde_json::to_string(&Assignment::excluded()).unwrap();
        assert_eq!(json, r#"{"inTest":false,"variantId":null}"#);
        let json = serde_json::to_string(&Assignment::assigned("var_a")).unwrap();
        assert_eq!(json, r#"{"inTest":true,"variantId":"var_a"}"#);
    }
}
