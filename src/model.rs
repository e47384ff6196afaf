//! # Data model: tests and variants
//!
//! ## Responsibility
//! The records the storage and API layers hand to this crate. Field names
//! serialize in `camelCase` so persisted JSON round-trips unchanged.
//!
//! ## Guarantees
//! - Serde-compatible with the persisted record shape
//! - Counter fields are never mutated by the assignment or analysis code
//!
//! ## NOT Responsible For
//! - Enforcing invariants (see [`crate::validate`])
//! - Incrementing counters atomically (storage's concern)

use serde::{Deserialize, Serialize};

use crate::ids::{generate_test_id, generate_variant_id, now_ms};

// ---------------------------------------------------------------------------
// TestStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a test. Transitions are driven by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[default]
    Draft,
    Running,
    Completed,
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TestStatus::Draft     => write!(f, "draft"),
            TestStatus::Running   => write!(f, "running"),
            TestStatus::Completed => write!(f, "completed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Counts — the minimal input of the statistics functions
// ---------------------------------------------------------------------------

/// Anything carrying an impression and conversion counter.
pub trait Counts {
    fn impressions(&self) -> u64;
    fn conversions(&self) -> u64;
}

/// Bare counter pair, for callers that don't hold full [`Variant`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VariantCounts {
    pub impressions: u64,
    pub conversions: u64,
}

impl VariantCounts {
    pub fn new(impressions: u64, conversions: u64) -> Self {
        Self { impressions, conversions }
    }
}

impl Counts for VariantCounts {
    fn impressions(&self) -> u64 {
        self.impressions
    }

    fn conversions(&self) -> u64 {
        self.conversions
    }
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

/// One alternative form configuration within a test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Share of in-test traffic, in percent. Weights of one test sum to 100.
    pub weight: f64,
    /// Opaque form definition; never inspected here.
    #[serde(default)]
    pub form_snapshot: serde_json::Value,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default)]
    pub conversions: u64,
}

impl Variant {
    /// New variant with a generated id and zeroed counters.
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            id: generate_variant_id(),
            name: name.into(),
            weight,
            form_snapshot: serde_json::Value::Null,
            impressions: 0,
            conversions: 0,
        }
    }

    pub fn with_counts(mut self, impressions: u64, conversions: u64) -> Self {
        self.impressions = impressions;
        self.conversions = conversions;
        self
    }

    /// Observed conversion rate, 0 when nothing has been served.
    pub fn conversion_rate(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.conversions as f64 / self.impressions as f64
        }
    }
}

impl Counts for Variant {
    fn impressions(&self) -> u64 {
        self.impressions
    }

    fn conversions(&self) -> u64 {
        self.conversions
    }
}

// ---------------------------------------------------------------------------
// AbTest
// ---------------------------------------------------------------------------

/// A/B test over variants of one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbTest {
    pub id: String,
    #[serde(default)]
    pub form_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: TestStatus,
    #[serde(default)]
    pub variants: Vec<Variant>,
    /// Tracked goal names, opaque here.
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Percentage of users that enter the test at all, in [0, 100].
    #[serde(default = "default_traffic_allocation")]
    pub traffic_allocation: f64,
    /// Unix epoch milliseconds.
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<u64>,
}

fn default_traffic_allocation() -> f64 {
    100.0
}

impl AbTest {
    /// New draft test with a generated id, full traffic and no variants.
    pub fn new(form_id: impl Into<String>, name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: generate_test_id(),
            form_id: form_id.into(),
            name: name.into(),
            status: TestStatus::Draft,
            variants: Vec::new(),
            metrics: Vec::new(),
            traffic_allocation: default_traffic_allocation(),
            created_at: now_ms(),
            created_by: created_by.into(),
            started_at: None,
            ended_at: None,
        }
    }

    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variants.push(variant);
        self
    }

    pub fn with_traffic_allocation(mut self, traffic_allocation: f64) -> Self {
        self.traffic_allocation = traffic_allocation;
        self
    }

    pub fn with_metric(mut self, metric: impl Into<String>) -> Self {
        self.metrics.push(metric.into());
        self
    }

    /// Mark the test running and stamp `started_at`. No-op unless draft.
    pub fn start(&mut self) {
        if self.status != TestStatus::Draft {
            return;
        }
        self.status = TestStatus::Running;
        self.started_at = Some(now_ms());
    }

    /// Mark the test completed and stamp `ended_at`. No-op once completed.
    pub fn complete(&mut self) {
        if self.status == TestStatus::Completed {
            return;
        }
        self.status = TestStatus::Completed;
        self.ended_at = Some(now_ms());
    }

    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == variant_id)
    }

    pub fn total_impressions(&self) -> u64 {
        self.variants.iter().map(|v| v.impressions).sum()
    }

    pub fn total_conversions(&self) -> u64 {
        self.variants.iter().map(|v| v.conversions).sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_test_is_draft_with_prefixed_id() {
        let t = AbTest::new("form_1", "Signup", "alice");
        assert!(t.id.starts_with("abtest_"));
        assert_eq!(t.status, TestStatus::Draft);
        assert_eq!(t.traffic_allocation, 100.0);
        assert!(t.created_at > 0);
    }

    #[test]
    fn test_variant_conversion_rate() {
        let v = Variant::new("A", 50.0).with_counts(200, 50);
        assert!((v.conversion_rate() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_variant_conversion_rate_zero_impressions() {
        assert_eq!(Variant::new("A", 50.0).conversion_rate(), 0.0);
    }

    #[test]
    fn test_start_then_complete_stamps_times() {
        let mut t = AbTest::new("f", "n", "u");
        t.start();
        assert_eq!(t.status, TestStatus::Running);
        assert!(t.started_at.is_some());
        t.complete();
        assert_eq!(t.status, TestStatus::Completed);
        assert!(t.ended_at.is_some());
    }

    #[test]
    fn test_start_ignored_when_completed() {
        let mut t = AbTest::new("f", "n", "u");
        t.complete();
        t.start();
        assert_eq!(t.status, TestStatus::Completed);
        assert!(t.started_at.is_none());
    }

    #[test]
    fn test_totals() {
        let t = AbTest::new("f", "n", "u")
            .with_variant(Variant::new("A", 50.0).with_counts(100, 10))
            .with_variant(Variant::new("B", 50.0).with_counts(120, 30));
        assert_eq!(t.total_impressions(), 220);
        assert_eq!(t.total_conversions(), 40);
    }

    #[test]
    fn test_variant_lookup() {
        let t = AbTest::new("f", "n", "u").with_variant(Variant::new("A", 100.0));
        let id = t.variants[0].id.clone();
        assert_eq!(t.variant(&id).map(|v| v.name.as_str()), Some("A"));
        assert!(t.variant("var_missing").is_none());
    }

    #[test]
    fn test_json_uses_camel_case() {
        let t = AbTest::new("form_9", "n", "u").with_variant(Variant::new("A", 100.0));
        let json = serde_json::to_value(&t).unwrap();
        assert_eq!(json["formId"], "form_9");
        assert_eq!(json["trafficAllocation"], 100.0);
        assert_eq!(json["status"], "draft");
        assert!(json["variants"][0].get("formSnapshot").is_some());
        assert!(json.get("startedAt").is_none());
    }

    #[test]
    fn test_json_missing_optional_fields_default() {
        let raw = r#"{
            "id": "abtest_x",
            "name": "Checkout",
            "variants": [{"id": "var_a", "weight": 100}]
        }"#;
        let t: AbTest = serde_json::from_str(raw).unwrap();
        assert_eq!(t.form_id, "");
        assert_eq!(t.traffic_allocation, 100.0);
        assert_eq!(t.variants[0].impressions, 0);
        assert_eq!(t.status, TestStatus::Draft);
    }

    #[test]
    fn test_status_display() {
        assert_eq!(TestStatus::Running.to_string(), "running");
        assert_eq!(TestStatus::Completed.to_string(), "completed");
    }
}
