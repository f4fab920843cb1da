//! Configuration structures for selecting and building a loss

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::loss::{HyperParams, Loss, LossRegistry};
use crate::loss::bce::NUM_ENTITIES;

/// Loss selection as it appears in a training configuration file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossConfig {
    /// Registered loss name
    pub loss: String,
    /// Number of negatives generated per positive
    pub eta: usize,
    /// Loss-specific hyperparameters
    #[serde(default)]
    pub loss_params: HyperParams,
    /// Log the resolved hyperparameters on construction
    #[serde(default)]
    pub verbose: bool,
    /// Entity count, needed by `bce` with label smoothing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_entities: Option<usize>,
}

impl LossConfig {
    /// Minimal configuration for `loss` with `eta` negatives
    pub fn new(loss: impl Into<String>, eta: usize) -> Self {
        Self {
            loss: loss.into(),
            eta,
            loss_params: HyperParams::new(),
            verbose: false,
            num_entities: None,
        }
    }

    /// Load configuration from a JSON or YAML file, chosen by extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate against the built-in losses
    pub fn validate(&self) -> Result<()> {
        self.validate_with(LossRegistry::global())
    }

    /// Validate against a specific registry
    pub fn validate_with(&self, registry: &LossRegistry) -> Result<()> {
        if self.eta == 0 {
            return Err(Error::config("eta must be at least 1"));
        }
        if self.num_entities == Some(0) {
            return Err(Error::config("num_entities must be at least 1"));
        }
        registry.lookup(&self.loss)?;
        Ok(())
    }

    /// Build the configured loss.
    ///
    /// Hyperparameters the loss does not declare are dropped, and
    /// `num_entities` is bound after construction when present.
    pub fn build(&self, registry: &LossRegistry) -> Result<Loss> {
        self.validate_with(registry)?;
        let params = registry.filter_params(&self.loss, &self.loss_params)?;
        let dropped = self.loss_params.len() - params.len();
        if dropped > 0 {
            debug!(loss = %self.loss, dropped, "Ignoring hyperparameters not declared by the loss");
        }

        let mut loss = registry.construct(&self.loss, self.eta, &params, self.verbose)?;
        if let Some(num_entities) = self.num_entities {
            loss.set_hyperparam(NUM_ENTITIES, num_entities);
        }
        Ok(loss)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of plain text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
