//! Error types for feature selection

use thiserror::Error;

/// Result type alias for selection operations
pub type Result<T> = std::result::Result<T, SelectionError>;

/// Main error type for the selection engine
#[derive(Error, Debug)]
pub enum SelectionError {
    /// Invalid or contradictory setup, raised before any model is fitted
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A fold's model fit, predict or scoring step failed
    #[error("Model fit failed on fold {fold} for features [{}]: {reason}", .subset.join(", "))]
    ModelFitError {
        subset: Vec<String>,
        fold: usize,
        reason: String,
    },

    #[error("Selector not fitted")]
    NotFitted,

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("No features selected: {0}")]
    EmptySelection(String),

    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SelectionError {
    /// Whether this error only invalidates the candidate subset being scored
    pub fn is_model_fit(&self) -> bool {
        matches!(self, SelectionError::ModelFitError { .. })
    }
}

impl From<polars::error::PolarsError> for SelectionError {
    fn from(err: polars::error::PolarsError) -> Self {
        SelectionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for SelectionError {
    fn from(err: serde_json::Error) -> Self {
        SelectionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for SelectionError {
    fn from(err: ndarray::ShapeError) -> Self {
        SelectionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SelectionError::ConfigError("bad cv".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad cv");
    }

    #[test]
    fn test_model_fit_error_carries_context() {
        let err = SelectionError::ModelFitError {
            subset: vec!["age".to_string(), "income".to_string()],
            fold: 3,
            reason: "singular matrix".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("fold 3"));
        assert!(msg.contains("age, income"));
        assert!(msg.contains("singular matrix"));
        assert!(err.is_model_fit());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SelectionError = io_err.into();
        assert!(matches!(err, SelectionError::IoError(_)));
        assert!(!err.is_model_fit());
    }
}
