//! Negative log-likelihood losses

use super::params::{HyperParams, LossParameters};
use super::utils::{clip_before_exp, negative_grid, softplus};
use super::LossFunction;
use crate::error::Result;
use candle_core::Tensor;
use candle_nn::ops;

/// Negative log-likelihood (Trouillon et al. 2016).
///
/// Positives carry label `+1`, negatives `-1`:
/// `sum(log(1 + exp(-y * f(t))))` over both sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct NllLoss;

impl LossFunction for NllLoss {
    fn init_hyperparams(&self, _hyperparams: &HyperParams, _params: &mut LossParameters) -> Result<()> {
        Ok(())
    }

    fn reduce(&self, _params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let scores_pos = clip_before_exp(scores_pos)?;
        let scores_neg = clip_before_exp(scores_neg)?;
        let scores = Tensor::cat(&[&scores_pos.neg()?, &scores_neg], 0)?;
        Ok(softplus(&scores)?.sum_all()?)
    }
}

/// Multiclass NLL (Chen et al. 2015, Kadlec et al. 2017).
///
/// Each positive competes with its `eta` corruptions in a softmax; the loss is
/// `-sum(log(exp(f(t+)) / (exp(f(t+)) + sum(exp(f(t-))))))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MulticlassNllLoss;

impl LossFunction for MulticlassNllLoss {
    fn init_hyperparams(&self, _hyperparams: &HyperParams, _params: &mut LossParameters) -> Result<()> {
        Ok(())
    }

    fn reduce(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let scores_pos = clip_before_exp(scores_pos)?;
        let scores_neg = clip_before_exp(scores_neg)?;

        let n = scores_pos.elem_count();
        let grid = negative_grid(&scores_neg, params.eta()?, n)?;

        // Row 0 holds the positive, rows 1..=eta its negatives.
        let candidates = Tensor::cat(&[&scores_pos.reshape((1, n))?, &grid], 0)?;
        let log_softmax_score = ops::log_softmax(&candidates, 0)?.get(0)?;
        Ok(log_softmax_score.sum_all()?.neg()?)
    }
}
