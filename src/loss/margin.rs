//! Max-margin ranking losses

use super::params::{float_or, HyperParams, LossParameters};
use super::utils::pair_scores;
use super::LossFunction;
use crate::error::Result;
use candle_core::Tensor;

/// Default margin used by the pairwise and absolute margin losses
pub const DEFAULT_MARGIN: f64 = 1.0;

/// Pairwise max-margin loss (Bordes et al. 2013):
/// `sum(max(0, margin - f(t+) + f(t-)))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PairwiseLoss;

impl LossFunction for PairwiseLoss {
    fn init_hyperparams(&self, hyperparams: &HyperParams, params: &mut LossParameters) -> Result<()> {
        params.insert("margin", float_or(hyperparams, "margin", DEFAULT_MARGIN)?);
        Ok(())
    }

    fn reduce(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let margin = params.float("margin")?;
        let (pos, neg) = pair_scores(scores_pos, scores_neg)?;
        let hinge = neg.sub(&pos)?.affine(1.0, margin)?.relu()?;
        Ok(hinge.sum_all()?)
    }
}

/// Absolute margin loss (Hamaguchi et al. 2017):
/// `sum(max(0, margin + f(t-)) - f(t+))`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsoluteMarginLoss;

impl LossFunction for AbsoluteMarginLoss {
    fn init_hyperparams(&self, hyperparams: &HyperParams, params: &mut LossParameters) -> Result<()> {
        params.insert("margin", float_or(hyperparams, "margin", DEFAULT_MARGIN)?);
        Ok(())
    }

    fn reduce(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let margin = params.float("margin")?;
        let (pos, neg) = pair_scores(scores_pos, scores_neg)?;
        let loss = neg.affine(1.0, margin)?.relu()?.sub(&pos)?;
        Ok(loss.sum_all()?)
    }
}
