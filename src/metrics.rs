//! Metrics for evaluating a trained network.
use crate::datasets::Sample;
use crate::error::Result;
use crate::network::Network;

/// Index of the largest value; the first one wins ties. `0` for an empty slice.
pub fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0usize, |max_i, (i, &v)| if v > values[max_i] { i } else { max_i })
}

/// Fraction of samples whose predicted class matches the one-hot target.
pub fn accuracy(dataset: &[Sample], model: &Network) -> Result<f64> {
    if dataset.is_empty() {
        return Ok(0.0);
    }
    let mut correct = 0;
    for (input, target) in dataset {
        let pred = model.predict(input)?;
        if argmax(&pred) == argmax(target) {
            correct += 1;
        }
    }
    Ok(correct as f64 / dataset.len() as f64)
}

/// `matrix[true_class][predicted_class]` counts; classes at or beyond
/// `num_classes` are skipped.
pub fn confusion_matrix(
    dataset: &[Sample],
    model: &Network,
    num_classes: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut cm = vec![vec![0; num_classes]; num_classes];
    for (input, target) in dataset {
        let pred_class = argmax(&model.predict(input)?);
        let true_class = argmax(target);
        if pred_class < num_classes && true_class < num_classes {
            cm[true_class][pred_class] += 1;
        }
    }
    Ok(cm)
}
