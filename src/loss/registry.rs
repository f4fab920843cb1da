//! Name -> loss descriptor table
//!
//! The table is built once and never mutated afterwards. [`LossRegistry::global`]
//! holds the built-in losses; callers that add their own variants build a table
//! with [`LossRegistryBuilder`] and pass it where losses are resolved by name.

use super::adversarial::SelfAdversarialLoss;
use super::bce::BceLoss;
use super::likelihood::{MulticlassNllLoss, NllLoss};
use super::margin::{AbsoluteMarginLoss, PairwiseLoss};
use super::params::{ClassParams, HyperParams};
use super::{Loss, LossFunction};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

static GLOBAL_REGISTRY: Lazy<LossRegistry> = Lazy::new(LossRegistry::standard);

/// Everything the registry knows about one loss variant
#[derive(Clone)]
pub struct LossDescriptor {
    name: String,
    implementation: Arc<dyn LossFunction>,
    external_params: Vec<String>,
    class_params: ClassParams,
}

impl LossDescriptor {
    fn new(
        name: &str,
        implementation: Arc<dyn LossFunction>,
        external_params: &[&str],
        class_params: ClassParams,
    ) -> Self {
        Self {
            name: name.to_string(),
            implementation,
            external_params: external_params.iter().map(|p| p.to_string()).collect(),
            class_params,
        }
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Variant hooks
    pub fn implementation(&self) -> &dyn LossFunction {
        self.implementation.as_ref()
    }

    /// Hyperparameters the variant reads, in declaration order
    pub fn external_params(&self) -> &[String] {
        &self.external_params
    }

    /// Behavioural flags
    pub fn class_params(&self) -> &ClassParams {
        &self.class_params
    }
}

impl fmt::Debug for LossDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LossDescriptor")
            .field("name", &self.name)
            .field("implementation", &self.implementation)
            .field("external_params", &self.external_params)
            .field("class_params", &self.class_params)
            .finish()
    }
}

/// Collects registrations before freezing them into a [`LossRegistry`]
#[derive(Debug, Default)]
pub struct LossRegistryBuilder {
    losses: HashMap<String, LossDescriptor>,
}

impl LossRegistryBuilder {
    /// Empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the built-in losses
    pub fn with_standard_losses() -> Self {
        let mut builder = Self::new();
        for descriptor in standard_descriptors() {
            builder.losses.insert(descriptor.name.clone(), descriptor);
        }
        builder
    }

    /// Bind `name` to a loss implementation.
    ///
    /// Fails with a configuration error when the name is empty or taken, or a
    /// declared parameter name is empty or repeated.
    pub fn register<L>(
        mut self,
        name: &str,
        implementation: L,
        external_params: &[&str],
        class_params: ClassParams,
    ) -> Result<Self>
    where
        L: LossFunction + 'static,
    {
        if name.trim().is_empty() {
            return Err(registration_error("loss name must not be empty"));
        }
        if self.losses.contains_key(name) {
            return Err(registration_error(format!("loss '{}' is already registered", name)));
        }
        let mut seen = HashSet::new();
        for param in external_params {
            if param.trim().is_empty() {
                return Err(registration_error(format!(
                    "loss '{}' declares an empty hyperparameter name",
                    name
                )));
            }
            if !seen.insert(*param) {
                return Err(registration_error(format!(
                    "loss '{}' declares hyperparameter '{}' twice",
                    name, param
                )));
            }
        }

        debug!(loss = name, params = ?external_params, "Registering loss");
        let descriptor = LossDescriptor::new(name, Arc::new(implementation), external_params, class_params);
        self.losses.insert(name.to_string(), descriptor);
        Ok(self)
    }

    /// Freeze the table
    pub fn build(self) -> LossRegistry {
        LossRegistry { losses: self.losses }
    }
}

fn registration_error(msg: impl Into<String>) -> Error {
    let err = Error::config(msg);
    error!("{}", err);
    err
}

fn standard_descriptors() -> Vec<LossDescriptor> {
    vec![
        LossDescriptor::new("pairwise", Arc::new(PairwiseLoss), &["margin"], ClassParams::default()),
        LossDescriptor::new("nll", Arc::new(NllLoss), &[], ClassParams::default()),
        LossDescriptor::new(
            "absolute_margin",
            Arc::new(AbsoluteMarginLoss),
            &["margin"],
            ClassParams::default(),
        ),
        LossDescriptor::new(
            "self_adversarial",
            Arc::new(SelfAdversarialLoss),
            &["margin", "alpha"],
            ClassParams::unequal_sizes(),
        ),
        LossDescriptor::new(
            "multiclass_nll",
            Arc::new(MulticlassNllLoss),
            &[],
            ClassParams::unequal_sizes(),
        ),
        LossDescriptor::new(
            "bce",
            Arc::new(BceLoss),
            &["label_smoothing", "label_weighting"],
            ClassParams::unequal_sizes(),
        ),
    ]
}

/// Immutable table of loss descriptors keyed by name
#[derive(Debug, Clone)]
pub struct LossRegistry {
    losses: HashMap<String, LossDescriptor>,
}

impl LossRegistry {
    /// Start an empty builder
    pub fn builder() -> LossRegistryBuilder {
        LossRegistryBuilder::new()
    }

    /// Table holding the built-in losses
    pub fn standard() -> Self {
        LossRegistryBuilder::with_standard_losses().build()
    }

    /// Process-wide table of built-in losses, built on first use
    pub fn global() -> &'static LossRegistry {
        &GLOBAL_REGISTRY
    }

    /// Resolve a loss by name
    pub fn lookup(&self, name: &str) -> Result<&LossDescriptor> {
        self.losses.get(name).ok_or_else(|| {
            let err = Error::UnknownLoss {
                name: name.to_string(),
                available: self.names().join(", "),
            };
            error!("{}", err);
            err
        })
    }

    /// Whether `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.losses.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.losses.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Descriptors, sorted by name
    pub fn descriptors(&self) -> Vec<&LossDescriptor> {
        let mut descriptors: Vec<&LossDescriptor> = self.losses.values().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Number of registered losses
    pub fn len(&self) -> usize {
        self.losses.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.losses.is_empty()
    }

    /// Look up `name` and construct an instance
    pub fn construct(&self, name: &str, eta: usize, hyperparams: &HyperParams, verbose: bool) -> Result<Loss> {
        let descriptor = self.lookup(name)?.clone();
        Loss::new(descriptor, eta, hyperparams, verbose)
    }

    /// Keep only the hyperparameters `name` declares.
    ///
    /// Useful when one parameter grid is shared by several losses.
    pub fn filter_params(&self, name: &str, hyperparams: &HyperParams) -> Result<HyperParams> {
        let descriptor = self.lookup(name)?;
        Ok(hyperparams
            .iter()
            .filter(|(key, _)| descriptor.external_params.iter().any(|p| p == *key))
            .map(|(key, value)| (key.clone(), *value))
            .collect())
    }
}

/// Construct a built-in loss by name from the global table
pub fn construct_loss(name: &str, eta: usize, hyperparams: &HyperParams, verbose: bool) -> Result<Loss> {
    LossRegistry::global().construct(name, eta, hyperparams, verbose)
}
