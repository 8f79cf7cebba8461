//! Dense layer: an ordered set of neurons sharing one activation and input width.
use crate::activations::{softmax, Activation};
use crate::error::{Error, Result};
use crate::node::{Node, WeightInit};
use rand::Rng;

/// A fully-connected (dense) layer.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseLayer {
    pub neurons: Vec<Node>,
    activation: Activation,
    input_size: usize,
}

impl DenseLayer {
    /// Create a layer of `num_neurons` neurons, each reading `num_inputs` values.
    pub fn new<R: Rng>(
        num_neurons: usize,
        num_inputs: usize,
        activation: Activation,
        init: &WeightInit,
        rng: &mut R,
    ) -> Self {
        let neurons = (0..num_neurons)
            .map(|_| Node::new(num_inputs, activation, init, rng))
            .collect();
        Self {
            neurons,
            activation,
            input_size: num_inputs,
        }
    }

    /// Assemble a layer from existing neurons; every neuron must have the
    /// layer's activation and `input_size` weights.
    pub fn from_neurons(
        neurons: Vec<Node>,
        activation: Activation,
        input_size: usize,
    ) -> Result<Self> {
        for (i, n) in neurons.iter().enumerate() {
            if n.activation != activation {
                return Err(Error::InvalidTopology(format!(
                    "neuron {i} uses {} in a {activation} layer",
                    n.activation
                )));
            }
            if n.num_inputs() != input_size {
                return Err(Error::InvalidTopology(format!(
                    "neuron {i} has {} weights, layer input width is {input_size}",
                    n.num_inputs()
                )));
            }
        }
        Ok(Self {
            neurons,
            activation,
            input_size,
        })
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.neurons.len()
    }

    pub fn parameter_count(&self) -> usize {
        self.neurons.iter().map(Node::parameter_count).sum()
    }

    /// Forward pass that updates each neuron's cached output.
    pub fn feed_forward(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        let raw = self
            .neurons
            .iter_mut()
            .map(|n| n.feed_forward(inputs))
            .collect::<Result<Vec<f64>>>()?;
        if !self.activation.is_softmax() {
            return Ok(raw);
        }
        let probs = softmax(&raw);
        for (n, &p) in self.neurons.iter_mut().zip(&probs) {
            n.output = p;
        }
        Ok(probs)
    }

    /// Forward pass that leaves the caches untouched.
    pub fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let raw = self
            .neurons
            .iter()
            .map(|n| n.pre_activation(inputs).map(|z| self.activation.apply(z)))
            .collect::<Result<Vec<f64>>>()?;
        if self.activation.is_softmax() {
            Ok(softmax(&raw))
        } else {
            Ok(raw)
        }
    }

    /// Output-layer error: `target - output`, gated by the activation
    /// derivative except for softmax (softmax + cross-entropy).
    pub(crate) fn assign_output_deltas(&mut self, targets: &[f64]) {
        let softmax = self.activation.is_softmax();
        for (n, &t) in self.neurons.iter_mut().zip(targets) {
            let error = t - n.output;
            n.delta = if softmax {
                error
            } else {
                error * n.activation_derivative()
            };
        }
    }

    /// Hidden-layer error from the layer this one feeds into:
    /// `delta_j = Σ_k next.w[k][j] * next.delta[k] * f'(out_j)`.
    pub(crate) fn assign_hidden_deltas(&mut self, next: &DenseLayer) {
        for (j, n) in self.neurons.iter_mut().enumerate() {
            let error_sum: f64 = next
                .neurons
                .iter()
                .map(|k| k.weights[j] * k.delta)
                .sum();
            n.delta = error_sum * n.activation_derivative();
        }
    }

    pub fn update_weights(&mut self, inputs: &[f64], learning_rate: f64) {
        for n in &mut self.neurons {
            n.update_weights(inputs, learning_rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn layer(activation: Activation) -> DenseLayer {
        let neurons = vec![
            Node::from_parameters(vec![1.0, 0.0], 0.0, activation),
            Node::from_parameters(vec![0.0, 1.0], 0.0, activation),
            Node::from_parameters(vec![1.0, 1.0], -1.0, activation),
        ];
        DenseLayer::from_neurons(neurons, activation, 2).unwrap()
    }

    #[test]
    fn new_layer_has_requested_shape() {
        let mut rng = StdRng::seed_from_u64(1);
        let l = DenseLayer::new(4, 3, Activation::ReLU, &WeightInit::default(), &mut rng);
        assert_eq!(l.output_size(), 4);
        assert_eq!(l.input_size(), 3);
        assert!(l.neurons.iter().all(|n| n.num_inputs() == 3));
        assert_eq!(l.parameter_count(), 16);
    }

    #[test]
    fn softmax_layer_normalizes_and_caches() {
        let mut l = layer(Activation::Softmax);
        let out = l.feed_forward(&[2.0, 3.0]).unwrap();
        let sum: f64 = out.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        for (n, &p) in l.neurons.iter().zip(&out) {
            assert_eq!(n.output, p);
        }
        assert_eq!(l.predict(&[2.0, 3.0]).unwrap(), out);
    }

    #[test]
    fn predict_leaves_caches_alone() {
        let l = layer(Activation::Tanh);
        let before = l.neurons.iter().map(|n| n.output).collect::<Vec<_>>();
        let out = l.predict(&[0.5, -0.5]).unwrap();
        assert_eq!(out.len(), 3);
        let after = l.neurons.iter().map(|n| n.output).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn mismatched_input_fails() {
        let mut l = layer(Activation::ReLU);
        assert!(matches!(
            l.feed_forward(&[1.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejects_neurons_with_wrong_arity() {
        let neurons = vec![Node::from_parameters(vec![1.0], 0.0, Activation::ReLU)];
        assert!(matches!(
            DenseLayer::from_neurons(neurons, Activation::ReLU, 2),
            Err(Error::InvalidTopology(_))
        ));
    }

    #[test]
    fn hidden_deltas_follow_next_layer_weights() {
        let mut hidden = layer(Activation::ReLU);
        hidden.feed_forward(&[1.0, 2.0]).unwrap();
        let mut next = DenseLayer::from_neurons(
            vec![Node::from_parameters(vec![0.5, -1.0, 2.0], 0.0, Activation::Sigmoid)],
            Activation::Sigmoid,
            3,
        )
        .unwrap();
        next.neurons[0].delta = 0.1;
        hidden.assign_hidden_deltas(&next);
        // all three hidden ReLU outputs are positive, so the derivative is 1
        assert!((hidden.neurons[0].delta - 0.05).abs() < 1e-12);
        assert!((hidden.neurons[1].delta + 0.1).abs() < 1e-12);
        assert!((hidden.neurons[2].delta - 0.2).abs() < 1e-12);
    }
}
