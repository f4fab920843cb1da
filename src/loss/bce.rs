//! Binary cross-entropy over dense entity labels (ConvE-style 1-N scoring)
//!
//! Unlike the ranking losses, `apply` receives `(y_true, y_pred)`: a multi-hot
//! label vector over all entities and the matching prediction logits.

use super::params::{bool_or, optional_float_or, ClassParams, HyperParams, LossParameters};
use super::utils::{log_sigmoid, sigmoid_cross_entropy_with_logits};
use super::{LossFunction, ShapeAssertion};
use crate::error::{Error, Result};
use candle_core::Tensor;
use candle_nn::ops;
use tracing::{debug, error};

/// Added inside `log(1 - sigmoid(x) + eps)` when label weighting is on
pub const BCE_EPSILON: f64 = 1e-6;

/// Late-bound hyperparameter holding the entity count used by label smoothing
pub const NUM_ENTITIES: &str = "num_entities";

/// Binary cross-entropy with optional label smoothing and label weighting.
#[derive(Debug, Clone, Copy, Default)]
pub struct BceLoss;

impl BceLoss {
    fn smoothed_labels(params: &LossParameters, y_true: &Tensor) -> Result<Tensor> {
        match params.optional_float("label_smoothing")? {
            Some(smoothing) => {
                let num_entities = params.count(NUM_ENTITIES)?;
                Ok(y_true.affine(1.0 - smoothing, smoothing / num_entities as f64)?)
            }
            None => Ok(y_true.clone()),
        }
    }
}

impl LossFunction for BceLoss {
    fn init_hyperparams(&self, hyperparams: &HyperParams, params: &mut LossParameters) -> Result<()> {
        params.insert(
            "label_smoothing",
            optional_float_or(hyperparams, "label_smoothing", None)?,
        );
        params.insert(
            "label_weighting",
            bool_or(hyperparams, "label_weighting", false)?,
        );
        Ok(())
    }

    fn check_inputs(
        &self,
        _class_params: &ClassParams,
        params: &LossParameters,
        y_true: &Tensor,
        y_pred: &Tensor,
    ) -> Result<Vec<ShapeAssertion>> {
        debug!("Same size y_true and y_pred required");
        let assertions = vec![ShapeAssertion::SameLength {
            left: "y_pred",
            right: "y_true",
            left_len: y_pred.elem_count(),
            right_len: y_true.elem_count(),
        }];

        if params.optional_float("label_smoothing")?.is_some() && !params.contains(NUM_ENTITIES) {
            let msg = "To apply label smoothing the number of entities must be known. \
                       Set it with set_hyperparam(\"num_entities\", value)";
            error!("{}", msg);
            return Err(Error::missing_dependency(msg));
        }

        Ok(assertions)
    }

    fn reduce(&self, params: &LossParameters, y_true: &Tensor, y_pred: &Tensor) -> Result<Tensor> {
        let y_true = Self::smoothed_labels(params, y_true)?;

        if params.boolean("label_weighting")? {
            let wt = y_true.mean_all()?;
            let positive = y_true
                .broadcast_mul(&wt.affine(-1.0, 1.0)?)?
                .mul(&log_sigmoid(y_pred)?)?;
            let not_sigmoid = ops::sigmoid(y_pred)?.affine(-1.0, 1.0 + BCE_EPSILON)?.log()?;
            let negative = y_true
                .affine(-1.0, 1.0)?
                .broadcast_mul(&wt)?
                .mul(&not_sigmoid)?;
            Ok(positive.add(&negative)?.sum_all()?.neg()?)
        } else {
            Ok(sigmoid_cross_entropy_with_logits(&y_true, y_pred)?.sum_all()?)
        }
    }
}
