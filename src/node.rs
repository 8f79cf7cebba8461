//! A single neuron: weights, bias, and the per-step output/delta scratch values.
use crate::activations::Activation;
use crate::error::{Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Initial parameter values for freshly built neurons.
///
/// Weights are drawn from `U(-span, span)`; every bias starts at `bias`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightInit {
    pub span: f64,
    pub bias: f64,
}

impl Default for WeightInit {
    fn default() -> Self {
        Self {
            span: 0.1,
            bias: 0.1,
        }
    }
}

impl WeightInit {
    pub fn uniform(span: f64) -> Self {
        Self {
            span,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub weights: Vec<f64>,
    pub bias: f64,
    /// Output of the last `feed_forward` (the raw logit for softmax layers
    /// until the layer normalizes it).
    pub output: f64,
    /// Error signal of the last backpropagation step.
    pub delta: f64,
    pub activation: Activation,
}

impl Node {
    pub fn new<R: Rng>(
        num_inputs: usize,
        activation: Activation,
        init: &WeightInit,
        rng: &mut R,
    ) -> Self {
        let weights = (0..num_inputs)
            .map(|_| {
                if init.span > 0.0 {
                    rng.gen_range(-init.span..init.span)
                } else {
                    0.0
                }
            })
            .collect();
        Self {
            weights,
            bias: init.bias,
            output: 0.0,
            delta: 0.0,
            activation,
        }
    }

    /// Builds a node from known parameters, with zeroed caches.
    pub fn from_parameters(weights: Vec<f64>, bias: f64, activation: Activation) -> Self {
        Self {
            weights,
            bias,
            output: 0.0,
            delta: 0.0,
            activation,
        }
    }

    pub fn num_inputs(&self) -> usize {
        self.weights.len()
    }

    /// `Σ inputs[i] * weights[i] + bias`, without touching the caches.
    pub fn pre_activation(&self, inputs: &[f64]) -> Result<f64> {
        Error::check_len(self.weights.len(), inputs.len())?;
        let sum: f64 = inputs
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| x * w)
            .sum();
        Ok(sum + self.bias)
    }

    /// Computes and caches this neuron's output.
    pub fn feed_forward(&mut self, inputs: &[f64]) -> Result<f64> {
        let sum = self.pre_activation(inputs)?;
        self.output = self.activation.apply(sum);
        Ok(self.output)
    }

    pub fn activation_derivative(&self) -> f64 {
        self.activation.derivative(self.output)
    }

    /// One gradient step along the cached delta.
    pub fn update_weights(&mut self, inputs: &[f64], learning_rate: f64) {
        let step = learning_rate * self.delta;
        for (w, &x) in self.weights.iter_mut().zip(inputs) {
            *w += step * x;
        }
        self.bias += step;
    }

    /// Bias followed by weights, the order used by the weights file.
    pub fn parameters(&self) -> impl Iterator<Item = f64> + '_ {
        std::iter::once(self.bias).chain(self.weights.iter().copied())
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + 1
    }

    /// Overwrites bias then weights from `values`, which must hold at least
    /// `parameter_count()` items.
    pub(crate) fn assign_parameters(&mut self, values: &mut impl Iterator<Item = f64>) {
        if let Some(b) = values.next() {
            self.bias = b;
        }
        for w in self.weights.iter_mut() {
            if let Some(v) = values.next() {
                *w = v;
            }
        }
    }
}

/// Caches are scratch state and do not take part in equality.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.activation == other.activation
            && self.bias == other.bias
            && self.weights == other.weights
    }
}
