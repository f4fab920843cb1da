//! Error types for kgloss

use thiserror::Error;

/// Main error type for loss construction and evaluation
#[derive(Error, Debug)]
pub enum Error {
    /// No loss is registered under the requested name
    #[error("Unknown loss '{name}'. Registered losses: {available}")]
    UnknownLoss {
        /// Requested name
        name: String,
        /// Comma separated list of registered names
        available: String,
    },

    /// A hyperparameter needed by the loss was never supplied
    #[error("Hyperparameter '{key}' required by loss '{loss}' was not passed to the loss function")]
    MissingHyperparameter {
        /// Loss name
        loss: String,
        /// Missing key
        key: String,
    },

    /// A hyperparameter was supplied with an unusable value
    #[error("Invalid hyperparameter '{key}': {reason}")]
    InvalidHyperparameter {
        /// Offending key
        key: String,
        /// What was wrong with it
        reason: String,
    },

    /// `get_state` was asked for a class parameter the loss does not define
    #[error("Unknown class parameter '{key}' for loss '{loss}'")]
    UnknownParameter {
        /// Loss name
        loss: String,
        /// Requested key
        key: String,
    },

    /// Input tensors disagree on a size the loss depends on
    #[error("Shape mismatch ({context}): expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Which relation was violated
        context: String,
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Margin losses cannot line up the negatives against the positives
    #[error("Cannot pair {negatives} negative scores with {positives} positive scores")]
    UnpairableScores {
        /// Number of positive scores
        positives: usize,
        /// Number of negative scores
        negatives: usize,
    },

    /// A value that must be bound late (e.g. `num_entities`) is missing
    #[error("Missing dependency configuration: {0}")]
    MissingDependencyConfiguration(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tensor operation error
    #[error("Tensor operation error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Other errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for kgloss operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing hyperparameter error
    pub fn missing_hyperparameter(loss: impl Into<String>, key: impl Into<String>) -> Self {
        Self::MissingHyperparameter {
            loss: loss.into(),
            key: key.into(),
        }
    }

    /// Create an invalid hyperparameter error
    pub fn invalid_hyperparameter(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidHyperparameter {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a shape mismatch error
    pub fn shape_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Create a missing dependency configuration error
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependencyConfiguration(msg.into())
    }
}
