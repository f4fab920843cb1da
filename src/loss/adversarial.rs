//! Self-adversarial negative sampling loss (Sun et al. 2019, RotatE)
//!
//! ```text
//! L = -sum(log σ(γ + f(t+))) - sum_i p(t-_i) log σ(-f(t-_i) - γ)
//! p(t-_j) = exp(α f(t-_j)) / sum_i exp(α f(t-_i))
//! ```
//!
//! The distribution `p` is taken over the `eta` corruptions of each positive,
//! so harder negatives receive more of the gradient. The weights stay attached
//! to the graph and are differentiated like any other factor.

use super::params::{float_or, HyperParams, LossParameters};
use super::utils::{log_sigmoid, negative_grid};
use super::LossFunction;
use crate::error::Result;
use candle_core::Tensor;
use candle_nn::ops;

/// Default sampling temperature
pub const DEFAULT_ALPHA_ADVERSARIAL: f64 = 0.5;

/// Default margin for the adversarial loss
pub const DEFAULT_MARGIN_ADVERSARIAL: f64 = 3.0;

/// Self-adversarial loss; negatives outnumber positives by `eta`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelfAdversarialLoss;

impl SelfAdversarialLoss {
    /// Sampling weights `softmax(alpha * grid, axis 0)` over the `eta x n`
    /// negative grid. Every column sums to one.
    pub fn sampling_weights(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let grid = negative_grid(scores_neg, params.eta()?, scores_pos.elem_count())?;
        Self::grid_weights(params, &grid)
    }

    fn grid_weights(params: &LossParameters, grid: &Tensor) -> Result<Tensor> {
        let alpha = params.float("alpha")?;
        Ok(ops::softmax(&grid.affine(alpha, 0.0)?, 0)?)
    }
}

impl LossFunction for SelfAdversarialLoss {
    fn init_hyperparams(&self, hyperparams: &HyperParams, params: &mut LossParameters) -> Result<()> {
        params.insert("margin", float_or(hyperparams, "margin", DEFAULT_MARGIN_ADVERSARIAL)?);
        params.insert("alpha", float_or(hyperparams, "alpha", DEFAULT_ALPHA_ADVERSARIAL)?);
        Ok(())
    }

    fn reduce(&self, params: &LossParameters, scores_pos: &Tensor, scores_neg: &Tensor) -> Result<Tensor> {
        let margin = params.float("margin")?;
        let grid = negative_grid(scores_neg, params.eta()?, scores_pos.elem_count())?;
        let p_neg = Self::grid_weights(params, &grid)?;

        let pos_term = log_sigmoid(&scores_pos.affine(1.0, margin)?)?.sum_all()?;
        let neg_term = p_neg
            .mul(&log_sigmoid(&grid.affine(-1.0, -margin)?)?)?
            .sum_all()?;

        Ok(pos_term.neg()?.sub(&neg_term)?)
    }
}
