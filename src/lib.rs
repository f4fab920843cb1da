//! kgloss - loss functions for knowledge-graph embedding models
//!
//! Given the scores an embedding model assigns to positive (observed) and
//! negative (corrupted) triples, each loss reduces them to a scalar tensor for
//! gradient descent. Losses are selected by name from a [`LossRegistry`],
//! validated once at construction and then applied any number of times.
//!
//! ```rust,ignore
//! use kgloss::{construct_loss, HyperParams, ParamValue};
//! use candle_core::{Device, Tensor};
//!
//! let params = HyperParams::from([("margin".to_string(), ParamValue::Float(2.0))]);
//! let loss = construct_loss("self_adversarial", 10, &params, true)?;
//! let value = loss.apply(&scores_pos, &scores_neg)?;
//! let grads = value.backward()?;
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod logging;
pub mod loss;

// Re-exports
pub use config::{LoggingConfig, LossConfig};
pub use error::{Error, Result};
pub use loss::{
    clip_before_exp, construct_loss, ClassParams, HyperParams, Loss, LossDescriptor, LossFunction,
    LossParameters, LossRegistry, LossRegistryBuilder, ParamValue, ShapeAssertion,
};
