//! Tests for the shared loss contract

use super::*;
use candle_core::{DType, Device};

fn scores(values: &[f32]) -> Tensor {
    Tensor::new(values, &Device::Cpu).unwrap()
}

#[test]
fn test_eta_is_stored() -> Result<()> {
    let loss = construct_loss("pairwise", 5, &HyperParams::new(), false)?;
    assert_eq!(loss.eta()?, 5);
    assert_eq!(loss.parameters().get(ETA), Some(&ParamValue::Int(5)));
    Ok(())
}

#[test]
fn test_zero_eta_is_rejected() {
    let err = construct_loss("nll", 0, &HyperParams::new(), false).unwrap_err();
    assert!(matches!(err, Error::InvalidHyperparameter { ref key, .. } if key == ETA));
}

#[test]
fn test_wrong_hyperparameter_type_fails_construction() {
    let hyperparams = HyperParams::from([("margin".to_string(), ParamValue::Bool(true))]);
    let err = construct_loss("pairwise", 1, &hyperparams, false).unwrap_err();
    assert!(matches!(err, Error::InvalidHyperparameter { ref key, .. } if key == "margin"));
}

#[test]
fn test_unrecognized_hyperparameters_are_ignored() -> Result<()> {
    let hyperparams = HyperParams::from([
        ("margin".to_string(), ParamValue::Float(2.0)),
        ("learning_rate".to_string(), ParamValue::Float(0.1)),
    ]);
    let loss = construct_loss("pairwise", 1, &hyperparams, true)?;
    assert!(!loss.parameters().contains("learning_rate"));
    assert_eq!(loss.parameters().float("margin")?, 2.0);
    Ok(())
}

#[test]
fn test_get_state() -> Result<()> {
    let pairwise = construct_loss("pairwise", 2, &HyperParams::new(), false)?;
    assert_eq!(pairwise.get_state(REQUIRE_SAME_SIZE_POS_NEG)?, ParamValue::Bool(true));

    for name in ["self_adversarial", "multiclass_nll", "bce"] {
        let loss = construct_loss(name, 2, &HyperParams::new(), false)?;
        assert_eq!(loss.get_state(REQUIRE_SAME_SIZE_POS_NEG)?, ParamValue::Bool(false), "{}", name);
    }

    // Class parameters only; instance hyperparameters are not visible here.
    let err = pairwise.get_state("margin").unwrap_err();
    assert!(matches!(err, Error::UnknownParameter { ref key, .. } if key == "margin"));
    Ok(())
}

#[test]
fn test_set_hyperparam_overrides() -> Result<()> {
    let mut loss = construct_loss("bce", 1, &HyperParams::new(), false)?;
    loss.set_hyperparam("num_entities", 10usize);
    loss.set_hyperparam("num_entities", 20usize);
    assert_eq!(loss.parameters().count("num_entities")?, 20);
    Ok(())
}

#[test]
fn test_eta_override_keeps_size_check() -> Result<()> {
    let mut loss = construct_loss("pairwise", 2, &HyperParams::new(), false)?;
    loss.set_hyperparam(ETA, 2.0);
    assert_eq!(loss.eta()?, 2);
    let err = loss.apply(&scores(&[1.0, 2.0]), &scores(&[0.0, 1.0, 2.0, 3.0])).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { expected: 2, actual: 4, .. }));

    loss.set_hyperparam(ETA, 2.5);
    let err = loss.apply(&scores(&[1.0, 2.0]), &scores(&[0.0, 1.0])).unwrap_err();
    assert!(matches!(err, Error::InvalidHyperparameter { ref key, .. } if key == ETA));
    Ok(())
}

#[test]
fn test_eta_override_reshapes_grid() -> Result<()> {
    let mut loss = construct_loss("multiclass_nll", 1, &HyperParams::new(), false)?;
    loss.set_hyperparam(ETA, 3.0);
    let err = loss.apply(&scores(&[0.0, 1.0]), &scores(&[0.0, 1.0])).unwrap_err();
    assert!(matches!(err, Error::ShapeMismatch { expected: 6, actual: 2, .. }));
    Ok(())
}

#[test]
fn test_check_inputs_depends_on_eta() -> Result<()> {
    let pos = scores(&[1.0, 2.0]);
    let neg = scores(&[1.0, 2.0, 3.0]);

    let eta_one = construct_loss("pairwise", 1, &HyperParams::new(), false)?;
    assert!(eta_one.check_inputs(&pos, &neg)?.is_empty());

    let eta_two = construct_loss("pairwise", 2, &HyperParams::new(), false)?;
    let assertions = eta_two.check_inputs(&pos, &neg)?;
    assert_eq!(
        assertions,
        vec![ShapeAssertion::SameLength {
            left: "scores_pos",
            right: "scores_neg",
            left_len: 2,
            right_len: 3,
        }]
    );
    assert!(assertions[0].verify().is_err());
    Ok(())
}

#[test]
fn test_assertions_recomputed_per_call() -> Result<()> {
    let loss = construct_loss("pairwise", 2, &HyperParams::new(), false)?;
    assert!(loss.apply(&scores(&[1.0, 2.0]), &scores(&[0.0, 1.0])).is_ok());
    assert!(loss.apply(&scores(&[1.0, 2.0]), &scores(&[0.0])).is_err());
    // A smaller final batch is fine as long as the sizes agree.
    assert!(loss.apply(&scores(&[1.0]), &scores(&[0.0])).is_ok());
    Ok(())
}

#[test]
fn test_column_vectors_are_flattened() -> Result<()> {
    let loss = construct_loss("pairwise", 2, &HyperParams::new(), false)?;
    let pos = Tensor::new(&[[1.0f32], [0.0]], &Device::Cpu)?;
    let neg = Tensor::new(&[[0.0f32], [0.5]], &Device::Cpu)?;
    let value = loss.apply(&pos, &neg)?.to_scalar::<f32>()?;
    assert_eq!(value, 1.5);
    Ok(())
}

#[test]
fn test_apply_is_idempotent() -> Result<()> {
    let pos = scores(&[0.3, -0.2, 1.1]);
    let neg = scores(&[0.1, 0.4, -0.6, 0.9, 0.0, 2.0]);
    for name in ["self_adversarial", "multiclass_nll"] {
        let loss = construct_loss(name, 2, &HyperParams::new(), false)?;
        let first = loss.apply(&pos, &neg)?.to_scalar::<f32>()?;
        let second = loss.apply(&pos, &neg)?.to_scalar::<f32>()?;
        assert_eq!(first, second, "{}", name);
    }
    Ok(())
}

#[test]
fn test_result_is_rank_zero() -> Result<()> {
    let loss = construct_loss("nll", 1, &HyperParams::new(), false)?;
    let value = loss.apply(&scores(&[0.5]), &scores(&[0.5]))?;
    assert_eq!(value.rank(), 0);
    assert_eq!(value.dtype(), DType::F32);
    Ok(())
}

#[test]
fn test_f64_scores() -> Result<()> {
    let loss = construct_loss("pairwise", 1, &HyperParams::new(), false)?;
    let pos = Tensor::new(&[1.0f64], &Device::Cpu)?;
    let neg = Tensor::new(&[0.25f64], &Device::Cpu)?;
    assert_eq!(loss.apply(&pos, &neg)?.to_scalar::<f64>()?, 0.25);
    Ok(())
}

#[test]
fn test_display() -> Result<()> {
    let loss = construct_loss("self_adversarial", 2, &HyperParams::new(), false)?;
    assert_eq!(loss.to_string(), "self_adversarial(alpha=0.5, eta=2, margin=3)");
    Ok(())
}

#[test]
fn test_instances_are_shareable_across_threads() -> Result<()> {
    let loss = std::sync::Arc::new(construct_loss("nll", 1, &HyperParams::new(), false)?);
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let loss = loss.clone();
            std::thread::spawn(move || {
                let pos = scores(&[i as f32]);
                let neg = scores(&[0.0]);
                loss.apply(&pos, &neg).and_then(|v| Ok(v.to_scalar::<f32>()?))
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("worker panicked")?.is_finite());
    }
    Ok(())
}
