use thiserror::Error;

/// Crate-level error type.
///
/// The validation variants render fixed phrases ("name is required",
/// "sum to 100", ...) that API callers match on, so their messages are
/// part of the public contract.
#[derive(Debug, Error)]
pub enum AbTestError {
    #[error("Test name is required")]
    MissingName,

    #[error("Form ID is required")]
    MissingFormId,

    #[error("At least 2 variants are required, got {0}")]
    TooFewVariants(usize),

    #[error("Maximum 10 variants allowed, got {0}")]
    TooManyVariants(usize),

    #[error("Variant weights must sum to 100, got {0}")]
    WeightSum(f64),

    #[error("Traffic allocation must be between 0 and 100, got {0}")]
    TrafficAllocation(f64),

    #[error("Variant IDs must be unique: '{0}' appears more than once")]
    DuplicateVariantId(String),

    #[error("invalid analysis config: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl AbTestError {
    /// `true` for the errors produced by test-definition validation.
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            AbTestError::Config(_) | AbTestError::Io(_) | AbTestError::Json(_) | AbTestError::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, AbTestError>;
