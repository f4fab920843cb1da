//! Numerical stability helpers shared by the loss variants
//!
//! Every helper is composed from differentiable candle ops so gradients flow
//! back through the scores.

use crate::error::{Error, Result};
use candle_core::Tensor;

/// Min score below which values are clipped before exponentiation
pub const DEFAULT_CLIP_EXP_LOWER: f64 = -75.0;

/// Max score above which values are clipped before exponentiation
pub const DEFAULT_CLIP_EXP_UPPER: f64 = 75.0;

/// Clamp every element into `[-75, 75]` ahead of an `exp`.
pub fn clip_before_exp(value: &Tensor) -> Result<Tensor> {
    Ok(value.clamp(DEFAULT_CLIP_EXP_LOWER, DEFAULT_CLIP_EXP_UPPER)?)
}

/// `log(1 + exp(x))`, evaluated as `relu(x) + log(1 + exp(-|x|))`.
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    let tail = x.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    Ok(x.relu()?.add(&tail)?)
}

/// `log(sigmoid(x)) = -softplus(-x)`
pub fn log_sigmoid(x: &Tensor) -> Result<Tensor> {
    Ok(softplus(&x.neg()?)?.neg()?)
}

/// Elementwise sigmoid cross-entropy with logits:
/// `relu(x) - x * z + log(1 + exp(-|x|))`.
pub fn sigmoid_cross_entropy_with_logits(labels: &Tensor, logits: &Tensor) -> Result<Tensor> {
    let tail = logits.abs()?.neg()?.exp()?.affine(1.0, 1.0)?.log()?;
    Ok(logits.relu()?.sub(&logits.mul(labels)?)?.add(&tail)?)
}

/// Reshape `eta * n` negatives into an `eta x n` grid, column `j` holding the
/// negatives generated for positive `j`.
pub fn negative_grid(scores_neg: &Tensor, eta: usize, n: usize) -> Result<Tensor> {
    let expected = eta * n;
    let actual = scores_neg.elem_count();
    if actual != expected {
        return Err(Error::shape_mismatch(
            format!("negatives must be eta ({}) x positives ({})", eta, n),
            expected,
            actual,
        ));
    }
    Ok(scores_neg.reshape((eta, n))?)
}

/// Line up positives against their negatives for the margin losses.
///
/// Equal lengths pair elementwise. Negatives that are an exact multiple of the
/// positives are laid out as a grid with one row per corruption round and each
/// positive broadcast down its column. A single score on the negative side
/// broadcasts against all positives. Anything else is
/// [`Error::UnpairableScores`].
pub fn pair_scores(scores_pos: &Tensor, scores_neg: &Tensor) -> Result<(Tensor, Tensor)> {
    let n_pos = scores_pos.elem_count();
    let n_neg = scores_neg.elem_count();

    if n_pos == n_neg {
        return Ok((scores_pos.clone(), scores_neg.clone()));
    }
    if n_pos > 0 && n_neg % n_pos == 0 {
        let rows = n_neg / n_pos;
        let neg = scores_neg.reshape((rows, n_pos))?;
        let pos = scores_pos.reshape((1, n_pos))?.broadcast_as((rows, n_pos))?;
        return Ok((pos, neg));
    }
    if n_neg == 1 {
        let neg = scores_neg.reshape(1)?.broadcast_as(n_pos)?;
        return Ok((scores_pos.clone(), neg));
    }
    Err(Error::UnpairableScores {
        positives: n_pos,
        negatives: n_neg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_core::Device;

    fn values(t: &Tensor) -> Vec<f32> {
        t.flatten_all().unwrap().to_vec1::<f32>().unwrap()
    }

    #[test]
    fn test_clip_bounds() -> Result<()> {
        let x = Tensor::new(&[-1000f32, -75.0, 0.5, 75.0, 1e9], &Device::Cpu)?;
        assert_eq!(values(&clip_before_exp(&x)?), vec![-75.0, -75.0, 0.5, 75.0, 75.0]);
        Ok(())
    }

    #[test]
    fn test_softplus_matches_naive_form() -> Result<()> {
        let raw = [-3f32, -0.5, 0.0, 0.7, 4.0];
        let x = Tensor::new(&raw, &Device::Cpu)?;
        for (got, x) in values(&softplus(&x)?).iter().zip(raw) {
            assert_relative_eq!(*got, (1.0 + x.exp()).ln(), epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_softplus_large_inputs_stay_finite() -> Result<()> {
        let x = Tensor::new(&[-500f32, 500.0], &Device::Cpu)?;
        let out = values(&softplus(&x)?);
        assert_relative_eq!(out[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(out[1], 500.0, epsilon = 1e-3);
        Ok(())
    }

    #[test]
    fn test_log_sigmoid() -> Result<()> {
        let raw = [-2f32, 0.0, 3.0];
        let x = Tensor::new(&raw, &Device::Cpu)?;
        for (got, x) in values(&log_sigmoid(&x)?).iter().zip(raw) {
            let expected = (1.0 / (1.0 + (-x).exp())).ln();
            assert_relative_eq!(*got, expected, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_negative_grid_rejects_wrong_count() -> Result<()> {
        let neg = Tensor::new(&[1f32, 2.0, 3.0, 4.0, 5.0], &Device::Cpu)?;
        let err = negative_grid(&neg, 2, 2).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 4, actual: 5, .. }));
        Ok(())
    }

    #[test]
    fn test_negative_grid_columns_follow_positives() -> Result<()> {
        let neg = Tensor::new(&[1f32, 2.0, 3.0, 4.0, 5.0, 6.0], &Device::Cpu)?;
        let grid = negative_grid(&neg, 3, 2)?;
        assert_eq!(grid.dims(), &[3, 2]);
        assert_eq!(grid.to_vec2::<f32>()?, vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]);
        Ok(())
    }

    #[test]
    fn test_pair_scores_grid() -> Result<()> {
        let pos = Tensor::new(&[1f32, 2.0], &Device::Cpu)?;
        let neg = Tensor::new(&[10f32, 20.0, 30.0, 40.0], &Device::Cpu)?;
        let (p, n) = pair_scores(&pos, &neg)?;
        assert_eq!(p.to_vec2::<f32>()?, vec![vec![1.0, 2.0], vec![1.0, 2.0]]);
        assert_eq!(n.to_vec2::<f32>()?, vec![vec![10.0, 20.0], vec![30.0, 40.0]]);
        Ok(())
    }

    #[test]
    fn test_pair_scores_incompatible() -> Result<()> {
        let pos = Tensor::new(&[1f32, 2.0], &Device::Cpu)?;
        let neg = Tensor::new(&[1f32, 2.0, 3.0], &Device::Cpu)?;
        assert!(matches!(
            pair_scores(&pos, &neg),
            Err(Error::UnpairableScores { positives: 2, negatives: 3 })
        ));
        Ok(())
    }
}
