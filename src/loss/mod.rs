//! Loss functions for knowledge-graph embedding training
//!
//! Every loss reduces the scores of positive (observed) triples and negative
//! (corrupted) triples to a single scalar tensor to be minimized.
//!
//! # Key Components
//!
//! - **LossFunction**: variant hooks (`init_hyperparams`, `check_inputs`, `reduce`)
//! - **Loss**: a constructed instance with validated hyperparameters
//! - **LossRegistry**: immutable name -> descriptor table
//! - **Variants**: pairwise, absolute margin, NLL, multiclass NLL,
//!   self-adversarial and binary cross-entropy
//!
//! # Usage
//!
//! ```rust,ignore
//! use kgloss::loss::{construct_loss, HyperParams};
//! use candle_core::{Device, Tensor};
//!
//! let loss = construct_loss("pairwise", 1, &HyperParams::new(), false)?;
//! let pos = Tensor::new(&[1.0f32, 0.2], &Device::Cpu)?;
//! let neg = Tensor::new(&[0.0f32, 0.4], &Device::Cpu)?;
//! let value = loss.apply(&pos, &neg)?;
//! value.backward()?;
//! ```

pub mod adversarial;
pub mod bce;
pub mod likelihood;
pub mod margin;
pub mod params;
pub mod registry;
pub mod utils;

use crate::error::{Error, Result};
use candle_core::Tensor;
use std::fmt;
use tracing::{debug, error, info, instrument};

pub use adversarial::{SelfAdversarialLoss, DEFAULT_ALPHA_ADVERSARIAL, DEFAULT_MARGIN_ADVERSARIAL};
pub use bce::{BceLoss, BCE_EPSILON};
pub use likelihood::{MulticlassNllLoss, NllLoss};
pub use margin::{AbsoluteMarginLoss, PairwiseLoss, DEFAULT_MARGIN};
pub use params::{ClassParams, HyperParams, LossParameters, ParamValue, ETA, REQUIRE_SAME_SIZE_POS_NEG};
pub use registry::{construct_loss, LossDescriptor, LossRegistry, LossRegistryBuilder};
pub use utils::{clip_before_exp, DEFAULT_CLIP_EXP_LOWER, DEFAULT_CLIP_EXP_UPPER};

/// Hooks implemented by every loss variant.
///
/// `init_hyperparams` and `reduce` are required. `check_inputs` defaults to the
/// same-length rule driven by [`ClassParams`].
pub trait LossFunction: Send + Sync + fmt::Debug {
    /// Parse declared hyperparameters into `params`, applying defaults for
    /// missing optional keys. Unrecognized keys are ignored.
    fn init_hyperparams(&self, hyperparams: &HyperParams, params: &mut LossParameters) -> Result<()>;

    /// Build the assertions that must hold before `reduce` runs.
    fn check_inputs(
        &self,
        class_params: &ClassParams,
        params: &LossParameters,
        scores_pos: &Tensor,
        scores_neg: &Tensor,
    ) -> Result<Vec<ShapeAssertion>> {
        same_size_assertions(class_params, params, scores_pos, scores_neg)
    }

    /// Compute the scalar loss.
    fn reduce(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor>;
}

/// A size relation between the two inputs that must hold for a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeAssertion {
    /// Both inputs must contain the same number of scores
    SameLength {
        /// Name of the first input
        left: &'static str,
        /// Name of the second input
        right: &'static str,
        /// Length of the first input
        left_len: usize,
        /// Length of the second input
        right_len: usize,
    },
}

impl ShapeAssertion {
    /// Fail with [`Error::ShapeMismatch`] if the relation does not hold
    pub fn verify(&self) -> Result<()> {
        match self {
            Self::SameLength {
                left,
                right,
                left_len,
                right_len,
            } if left_len != right_len => Err(Error::shape_mismatch(
                format!("len({}) must equal len({})", right, left),
                *left_len,
                *right_len,
            )),
            Self::SameLength { .. } => Ok(()),
        }
    }
}

/// Same-length assertion for positives/negatives when the descriptor demands it
/// and `eta != 1`; otherwise nothing.
pub fn same_size_assertions(
    class_params: &ClassParams,
    params: &LossParameters,
    scores_pos: &Tensor,
    scores_neg: &Tensor,
) -> Result<Vec<ShapeAssertion>> {
    if class_params.require_same_size_pos_neg && params.eta()? != 1 {
        debug!("Same size positives and negatives required, eta is not 1");
        Ok(vec![ShapeAssertion::SameLength {
            left: "scores_pos",
            right: "scores_neg",
            left_len: scores_pos.elem_count(),
            right_len: scores_neg.elem_count(),
        }])
    } else {
        Ok(Vec::new())
    }
}

/// A constructed loss: descriptor plus validated hyperparameters.
///
/// `apply` takes `&self` and keeps no per-call state, so one instance can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct Loss {
    descriptor: LossDescriptor,
    parameters: LossParameters,
}

impl Loss {
    /// Validate `eta` and the hyperparameters, yielding a ready instance
    pub fn new(descriptor: LossDescriptor, eta: usize, hyperparams: &HyperParams, verbose: bool) -> Result<Self> {
        if eta == 0 {
            let err = Error::invalid_hyperparameter(ETA, "number of negatives must be at least 1");
            error!("{}", err);
            return Err(err);
        }

        let mut parameters = LossParameters::new(descriptor.name(), eta);
        if let Err(err) = descriptor.implementation().init_hyperparams(hyperparams, &mut parameters) {
            error!(loss = descriptor.name(), "Some of the hyperparams for loss were not usable: {}", err);
            return Err(err);
        }

        if verbose {
            info!("--------- Loss ---------");
            info!("Name : {}", descriptor.name());
            for (key, value) in parameters.iter() {
                info!(loss = descriptor.name(), "{} : {}", key, value);
            }
        }

        Ok(Self { descriptor, parameters })
    }

    /// Registered name
    pub fn name(&self) -> &str {
        self.descriptor.name()
    }

    /// Negative-sample count
    pub fn eta(&self) -> Result<usize> {
        self.parameters.eta()
    }

    /// Descriptor this instance was built from
    pub fn descriptor(&self) -> &LossDescriptor {
        &self.descriptor
    }

    /// Resolved hyperparameters
    pub fn parameters(&self) -> &LossParameters {
        &self.parameters
    }

    /// Read a class-level flag of the descriptor, e.g. `require_same_size_pos_neg`
    pub fn get_state(&self, param_name: &str) -> Result<ParamValue> {
        self.descriptor
            .class_params()
            .get(param_name)
            .ok_or_else(|| Error::UnknownParameter {
                loss: self.name().to_string(),
                key: param_name.to_string(),
            })
    }

    /// Bind a hyperparameter that is only known after the model is built
    /// (e.g. `num_entities`). Overriding an existing value is logged.
    pub fn set_hyperparam(&mut self, key: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        if let Some(previous) = self.parameters.insert(key, value) {
            info!(
                loss = self.name(),
                "{} already exists in loss hyperparameters with value {}, overriding with value {}",
                key,
                previous,
                value
            );
        }
    }

    /// Assertions that `apply` will check for these inputs
    pub fn check_inputs(&self, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Vec<ShapeAssertion>> {
        self.descriptor.implementation().check_inputs(
            self.descriptor.class_params(),
            &self.parameters,
            scores_pos,
            scores_neg,
        )
    }

    /// Check the inputs, then compute the loss.
    ///
    /// Inputs of shape `[n]` or `[n, 1]` are flattened first. For `bce` the
    /// arguments are `(y_true, y_pred)`.
    #[instrument(skip_all, fields(loss = %self.name()))]
    pub fn apply(&self, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let scores_pos = scores_pos.flatten_all()?;
        let scores_neg = scores_neg.flatten_all()?;

        for assertion in self.check_inputs(&scores_pos, &scores_neg)? {
            if let Err(err) = assertion.verify() {
                error!("{}", err);
                return Err(err);
            }
        }

        self.descriptor
            .implementation()
            .reduce(&self.parameters, &scores_pos, &scores_neg)
    }
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name())?;
        for (i, (key, value)) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests;
