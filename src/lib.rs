//! A minimal multilayer perceptron: dense layers of neurons with per-layer
//! activations, trained one example at a time by backpropagation.
//!
//! - `Network` with forward inference, online SGD and weight persistence
//! - Tanh, ReLU, Sigmoid and layer-wide Softmax activations
//! - MNIST IDX loader (raw or gzipped)
//! - A small training driver, metrics and console helpers

pub mod activations;
pub mod datasets;
pub mod error;
pub mod layers;
pub mod loss;
pub mod metrics;
pub mod network;
pub mod node;
pub mod training;
pub mod utils;

pub use activations::{softmax, Activation};
pub use datasets::{load_dataset, one_hot, read_dataset, to_dataset, Dataset, MnistImage, Sample};
pub use error::{Error, Result};
pub use layers::DenseLayer;
pub use loss::{cross_entropy_loss, mse_loss, sample_loss};
pub use metrics::{accuracy, argmax, confusion_matrix};
pub use network::{Network, NetworkConfig};
pub use node::{Node, WeightInit};
pub use training::{train, EpochStats, TrainConfig};
pub use utils::{print_model_summary, print_summary_table, xor_dataset};
