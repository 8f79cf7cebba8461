//! Activation functions: scalar value, derivative at the cached output, and
//! the vector-level softmax.
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The activation applied by every neuron of a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Activation {
    /// Tanh: (exp(x) - exp(-x)) / (exp(x) + exp(-x))
    #[serde(alias = "tanh")]
    Tanh,
    /// ReLU: max(0, x)
    #[serde(alias = "relu")]
    ReLU,
    /// Sigmoid: 1 / (1 + exp(-x))
    #[serde(alias = "sigmoid")]
    Sigmoid,
    /// Softmax over the whole layer. Per neuron the logit passes through
    /// unchanged; [`softmax`] normalizes the collected vector.
    #[serde(alias = "softmax")]
    Softmax,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::ReLU => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Softmax => x,
        }
    }

    /// Local derivative expressed in terms of the activation's own output.
    ///
    /// Softmax has no per-neuron derivative; its gradient is folded into the
    /// output error when paired with cross-entropy, so this returns `0.0`.
    pub fn derivative(self, output: f64) -> f64 {
        match self {
            Activation::Tanh => 1.0 - output * output,
            Activation::ReLU => (output > 0.0) as u8 as f64,
            Activation::Sigmoid => output * (1.0 - output),
            Activation::Softmax => 0.0,
        }
    }

    pub fn is_softmax(self) -> bool {
        self == Activation::Softmax
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Activation::Tanh => "Tanh",
            Activation::ReLU => "ReLU",
            Activation::Sigmoid => "Sigmoid",
            Activation::Softmax => "Softmax",
        };
        f.write_str(name)
    }
}

impl FromStr for Activation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "tanh" => Ok(Activation::Tanh),
            "relu" => Ok(Activation::ReLU),
            "sigmoid" => Ok(Activation::Sigmoid),
            "softmax" => Ok(Activation::Softmax),
            _ => Err(Error::UnknownActivation(s.to_string())),
        }
    }
}

/// Numerically stable softmax: the largest logit is subtracted before
/// exponentiating.
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let exp_sum: f64 = exps.iter().sum();
    if !exp_sum.is_finite() || exp_sum <= 0.0 {
        // NaN logits; fall back to uniform rather than propagating NaN
        let n = logits.len() as f64;
        return vec![1.0 / n; logits.len()];
    }
    exps.into_iter().map(|e| e / exp_sum).collect()
}
