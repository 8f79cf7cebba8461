//! Feed-forward network with online backpropagation and weight persistence.
use crate::activations::Activation;
use crate::error::{Error, Result};
use crate::layers::DenseLayer;
use crate::node::{Node, WeightInit};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

/// Version written into checkpoint files.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Layer activations and initial weights for [`Network::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub hidden_activation: Activation,
    pub output_activation: Activation,
    pub init: WeightInit,
}

impl Default for NetworkConfig {
    /// The digit classifier: ReLU hidden layers feeding a softmax output.
    fn default() -> Self {
        Self {
            hidden_activation: Activation::ReLU,
            output_activation: Activation::Softmax,
            init: WeightInit::default(),
        }
    }
}

impl NetworkConfig {
    /// Every layer uses `activation`; the regression/binary variant.
    pub fn uniform(activation: Activation, init: WeightInit) -> Self {
        Self {
            hidden_activation: activation,
            output_activation: activation,
            init,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layers: Vec<DenseLayer>,
    input_size: usize,
}

impl Network {
    /// Build `input_size -> hidden_sizes... -> output_size`.
    pub fn new<R: Rng>(
        hidden_sizes: &[usize],
        output_size: usize,
        input_size: usize,
        config: &NetworkConfig,
        rng: &mut R,
    ) -> Result<Self> {
        if hidden_sizes.is_empty() {
            return Err(Error::InvalidTopology(
                "at least one hidden layer is required".into(),
            ));
        }
        if input_size == 0 || output_size == 0 {
            return Err(Error::InvalidTopology(format!(
                "input size {input_size} and output size {output_size} must be positive"
            )));
        }
        if let Some(i) = hidden_sizes.iter().position(|&s| s == 0) {
            return Err(Error::InvalidTopology(format!("hidden layer {i} is empty")));
        }
        let init = config.init;
        if !init.bias.is_finite() || !(2.0 * init.span).is_finite() {
            return Err(Error::InvalidTopology(format!(
                "initial weight span {} and bias {} must be finite",
                init.span, init.bias
            )));
        }

        let mut layers = Vec::with_capacity(hidden_sizes.len() + 1);
        let mut prev_size = input_size;
        for &size in hidden_sizes {
            layers.push(DenseLayer::new(
                size,
                prev_size,
                config.hidden_activation,
                &config.init,
                rng,
            ));
            prev_size = size;
        }
        layers.push(DenseLayer::new(
            output_size,
            prev_size,
            config.output_activation,
            &config.init,
            rng,
        ));
        Self::from_layers(layers, input_size)
    }

    /// [`Network::new`] with a generator seeded from `seed`.
    pub fn with_seed(
        hidden_sizes: &[usize],
        output_size: usize,
        input_size: usize,
        config: &NetworkConfig,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new(hidden_sizes, output_size, input_size, config, &mut rng)
    }

    /// Assemble a network from prebuilt layers, checking that widths chain
    /// and that softmax appears only on the output layer.
    pub fn from_layers(layers: Vec<DenseLayer>, input_size: usize) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::InvalidTopology("network has no layers".into()));
        }
        let mut prev_size = input_size;
        for (i, layer) in layers.iter().enumerate() {
            if i + 1 < layers.len() && layer.activation().is_softmax() {
                return Err(Error::InvalidTopology(format!(
                    "layer {i} uses softmax, which is only supported on the output layer"
                )));
            }
            if layer.input_size() != prev_size {
                return Err(Error::InvalidTopology(format!(
                    "layer {i} reads {} values but receives {prev_size}",
                    layer.input_size()
                )));
            }
            if layer.output_size() == 0 {
                return Err(Error::InvalidTopology(format!("layer {i} is empty")));
            }
            prev_size = layer.output_size();
        }
        Ok(Self { layers, input_size })
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, DenseLayer::output_size)
    }

    pub fn output_activation(&self) -> Option<Activation> {
        self.layers.last().map(DenseLayer::activation)
    }

    /// Total number of biases and weights.
    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    /// Forward pass through every layer, refreshing the neuron caches.
    pub fn feed_forward(&mut self, inputs: &[f64]) -> Result<Vec<f64>> {
        let mut current = inputs.to_vec();
        for layer in &mut self.layers {
            current = layer.feed_forward(&current)?;
        }
        Ok(current)
    }

    /// Forward pass that only reads the network.
    pub fn predict(&self, inputs: &[f64]) -> Result<Vec<f64>> {
        let mut current = inputs.to_vec();
        for layer in &self.layers {
            current = layer.predict(&current)?;
        }
        Ok(current)
    }

    /// One online gradient step on a single example.
    ///
    /// Returns the outputs of the forward pass, computed before the weights
    /// were updated.
    pub fn back_propagate(
        &mut self,
        inputs: &[f64],
        targets: &[f64],
        learning_rate: f64,
    ) -> Result<Vec<f64>> {
        Error::check_len(self.output_size(), targets.len())?;

        // forward, keeping each layer's input for the update step
        let mut layer_inputs = Vec::with_capacity(self.layers.len());
        let mut current = inputs.to_vec();
        for layer in &mut self.layers {
            let next = layer.feed_forward(&current)?;
            layer_inputs.push(std::mem::replace(&mut current, next));
        }

        let Some((output_layer, _)) = self.layers.split_last_mut() else {
            return Err(Error::InvalidTopology("network has no layers".into()));
        };
        output_layer.assign_output_deltas(targets);

        // hidden deltas right to left, against the not yet updated weights
        for i in (0..self.layers.len() - 1).rev() {
            let (head, tail) = self.layers.split_at_mut(i + 1);
            head[i].assign_hidden_deltas(&tail[0]);
        }

        for (layer, input) in self.layers.iter_mut().zip(&layer_inputs) {
            layer.update_weights(input, learning_rate);
        }
        Ok(current)
    }

    /// Every parameter in file order: layer, neuron, bias, weights.
    pub fn parameters(&self) -> impl Iterator<Item = f64> + '_ {
        self.layers
            .iter()
            .flat_map(|l| l.neurons.iter())
            .flat_map(|n| n.parameters())
    }

    /// Write the flat weights file: one value per line, no header.
    pub fn save_network(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let context = || format!("writing weights to {}", path.display());
        let file = File::create(path).map_err(|e| Error::io(context(), e))?;
        let mut w = BufWriter::new(file);
        for value in self.parameters() {
            writeln!(w, "{value}").map_err(|e| Error::io(context(), e))?;
        }
        w.flush().map_err(|e| Error::io(context(), e))?;
        info!(
            path = %path.display(),
            parameters = self.parameter_count(),
            "saved weights"
        );
        Ok(())
    }

    /// Read a flat weights file into this network's existing topology.
    ///
    /// The whole file is parsed and its length checked before anything is
    /// assigned, so on error the network is unchanged.
    pub fn load_network(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading weights from {}", path.display()), e))?;
        let values = parse_weights(&text)?;
        let expected = self.parameter_count();
        if values.len() != expected {
            return Err(Error::WeightCount {
                expected,
                found: values.len(),
            });
        }
        let mut it = values.into_iter();
        for neuron in self.layers.iter_mut().flat_map(|l| l.neurons.iter_mut()) {
            neuron.assign_parameters(&mut it);
        }
        info!(path = %path.display(), parameters = expected, "loaded weights");
        Ok(())
    }

    /// Save a self-describing checkpoint (gzipped JSON with topology).
    pub fn save_checkpoint(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let context = || format!("writing checkpoint to {}", path.display());
        let json = serde_json::to_vec(&CheckpointDto::from_network(self))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(context(), e))?;
        }
        let file = File::create(path).map_err(|e| Error::io(context(), e))?;
        let mut enc = GzEncoder::new(file, Compression::default());
        enc.write_all(&json).map_err(|e| Error::io(context(), e))?;
        enc.finish().map_err(|e| Error::io(context(), e))?;
        info!(path = %path.display(), "saved checkpoint");
        Ok(())
    }

    /// Rebuild a network, topology included, from a checkpoint.
    pub fn load_checkpoint(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let context = || format!("reading checkpoint from {}", path.display());
        let file = File::open(path).map_err(|e| Error::io(context(), e))?;
        let mut buf = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut buf)
            .map_err(|e| Error::io(context(), e))?;
        let dto: CheckpointDto = serde_json::from_slice(&buf)?;
        let network = dto.into_network()?;
        info!(path = %path.display(), network = %network, "loaded checkpoint");
        Ok(network)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sizes = vec![self.input_size];
        sizes.extend(self.layers.iter().map(DenseLayer::output_size));
        write!(f, "Network: {sizes:?}")?;
        if let (Some(first), Some(last)) = (self.layers.first(), self.layers.last()) {
            write!(f, " ({} -> {})", first.activation(), last.activation())?;
        }
        Ok(())
    }
}

fn parse_weights(text: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for (i, line) in text.lines().enumerate() {
        for token in line.split_whitespace() {
            let v = token
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| Error::ParseWeight {
                    line: i + 1,
                    token: token.to_string(),
                })?;
            values.push(v);
        }
    }
    debug!(count = values.len(), "parsed weights file");
    Ok(values)
}

// ============ Checkpoint DTOs ============

#[derive(Debug, Serialize, Deserialize)]
struct NeuronDto {
    bias: f64,
    weights: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct LayerDto {
    activation: Activation,
    neurons: Vec<NeuronDto>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointDto {
    format_version: u32,
    input_size: usize,
    layers: Vec<LayerDto>,
}

impl CheckpointDto {
    fn from_network(network: &Network) -> Self {
        let layers = network
            .layers
            .iter()
            .map(|layer| LayerDto {
                activation: layer.activation(),
                neurons: layer
                    .neurons
                    .iter()
                    .map(|n| NeuronDto {
                        bias: n.bias,
                        weights: n.weights.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self {
            format_version: CHECKPOINT_VERSION,
            input_size: network.input_size,
            layers,
        }
    }

    fn into_network(self) -> Result<Network> {
        if self.format_version != CHECKPOINT_VERSION {
            return Err(Error::UnsupportedVersion(self.format_version));
        }
        let mut prev_size = self.input_size;
        let mut layers = Vec::with_capacity(self.layers.len());
        for ld in self.layers {
            let neurons = ld
                .neurons
                .into_iter()
                .map(|n| Node::from_parameters(n.weights, n.bias, ld.activation))
                .collect();
            let layer = DenseLayer::from_neurons(neurons, ld.activation, prev_size)?;
            prev_size = layer.output_size();
            layers.push(layer);
        }
        Network::from_layers(layers, self.input_size)
    }
}
