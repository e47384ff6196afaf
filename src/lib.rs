//! Experiment assignment and statistical analysis for A/B testing form variants.
//!
//! Every function here is pure and synchronous: callers hand in a test
//! snapshot (as persisted by their storage layer) and get a value back.
//!
//! ```
//! use form_abtest::{analyze_test_results, assign_variant, validate_ab_test, AbTest, Variant};
//!
//! let test = AbTest::new("form_42", "Signup button copy", "alice")
//!     .with_variant(Variant::new("Control", 50.0))
//!     .with_variant(Variant::new("Shorter copy", 50.0));
//! assert!(validate_ab_test(&test).valid);
//!
//! let a = assign_variant(&test, "visitor-123");
//! assert_eq!(a, assign_variant(&test, "visitor-123"));
//!
//! let report = analyze_test_results(&test);
//! assert!(report.winner.is_none());
//! ```

pub mod analyze;
pub mod assign;
pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod model;
pub mod stats;
pub mod validate;

pub use analyze::{analyze_test_results, analyze_test_results_with, TestReport, VariantResult};
pub use assign::{assign_variant, bucket, Assignment};
pub use config::AnalysisConfig;
pub use error::{AbTestError, Result};
pub use ids::{generate_test_id, generate_variant_id};
pub use model::{AbTest, Counts, TestStatus, Variant, VariantCounts};
pub use stats::{
    calculate_chi_squared, calculate_chi_squared_with, calculate_conversion_rate,
    calculate_conversion_rate_with, ChiSquaredResult, ConversionRate,
};
pub use validate::{check_ab_test, validate_ab_test, ValidationResult};
