//! Loss functions used to monitor training.
use crate::activations::Activation;
use crate::error::{Error, Result};

/// Mean squared error.
pub fn mse_loss(pred: &[f64], target: &[f64]) -> Result<f64> {
    Error::check_len(target.len(), pred.len())?;
    if pred.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| (p - t).powi(2))
        .sum();
    Ok(sum / pred.len() as f64)
}

/// Cross-entropy loss (assumes `pred` is a valid probability distribution)
pub fn cross_entropy_loss(pred: &[f64], target: &[f64]) -> Result<f64> {
    Error::check_len(target.len(), pred.len())?;
    let eps = 1e-12;
    let loss: f64 = pred
        .iter()
        .zip(target)
        .map(|(&p, &t)| -t * p.clamp(eps, 1.0 - eps).ln())
        .sum();
    Ok(loss)
}

/// The loss the output activation is trained against: cross-entropy for
/// softmax, MSE otherwise.
pub fn sample_loss(output_activation: Activation, pred: &[f64], target: &[f64]) -> Result<f64> {
    match output_activation {
        Activation::Softmax => cross_entropy_loss(pred, target),
        Activation::Tanh | Activation::ReLU | Activation::Sigmoid => mse_loss(pred, target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mse_of_known_vectors() {
        let l = mse_loss(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        assert!((l - 0.5).abs() < 1e-12);
    }

    #[test]
    fn cross_entropy_of_one_hot() {
        let l = cross_entropy_loss(&[0.25, 0.75], &[0.0, 1.0]).unwrap();
        assert!((l + 0.75f64.ln()).abs() < 1e-12);
        // zero probability is clamped instead of producing infinity
        assert!(cross_entropy_loss(&[1.0, 0.0], &[0.0, 1.0]).unwrap().is_finite());
    }

    #[test]
    fn size_mismatch_is_an_error() {
        assert!(mse_loss(&[1.0], &[1.0, 2.0]).is_err());
        assert!(cross_entropy_loss(&[1.0, 0.0], &[1.0]).is_err());
    }

    #[test]
    fn sample_loss_picks_by_activation() {
        let pred = [0.5, 0.5];
        let target = [1.0, 0.0];
        assert_eq!(
            sample_loss(Activation::Softmax, &pred, &target).unwrap(),
            cross_entropy_loss(&pred, &target).unwrap()
        );
        assert_eq!(
            sample_loss(Activation::Sigmoid, &pred, &target).unwrap(),
            mse_loss(&pred, &target).unwrap()
        );
    }
}
