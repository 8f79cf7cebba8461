//! Online training loop: one `back_propagate` per sample, running accuracy,
//! and an optional weights file rewritten after every epoch.
use crate::datasets::Sample;
use crate::error::{Error, Result};
use crate::loss::sample_loss;
use crate::metrics::argmax;
use crate::network::Network;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    /// Reshuffle the sample order at the start of every epoch.
    pub shuffle: bool,
    /// Seed of the shuffling generator.
    pub seed: u64,
    /// Log running accuracy every `log_every` samples; `0` disables it.
    pub log_every: usize,
    /// Flat weights file saved after every epoch.
    pub checkpoint: Option<PathBuf>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 5,
            learning_rate: 0.01,
            shuffle: true,
            seed: 42,
            log_every: 2000,
            checkpoint: None,
        }
    }
}

impl TrainConfig {
    /// Read a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EpochStats {
    pub epoch: usize,
    /// Accuracy of the predictions made just before each update.
    pub accuracy: f64,
    pub mean_loss: f64,
}

/// Train `network` online over `dataset` for `config.epochs` epochs.
pub fn train(
    network: &mut Network,
    dataset: &[Sample],
    config: &TrainConfig,
) -> Result<Vec<EpochStats>> {
    if dataset.is_empty() {
        return Err(Error::InvalidDataset("training set is empty".into()));
    }
    let output_activation = network
        .output_activation()
        .ok_or_else(|| Error::InvalidTopology("network has no layers".into()))?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut order: Vec<usize> = (0..dataset.len()).collect();
    let mut history = Vec::with_capacity(config.epochs);
    info!(
        network = %network,
        samples = dataset.len(),
        epochs = config.epochs,
        learning_rate = config.learning_rate,
        "starting training"
    );

    for epoch in 1..=config.epochs {
        if config.shuffle {
            order.shuffle(&mut rng);
        }
        let mut correct = 0usize;
        let mut total_loss = 0.0;
        for (i, &idx) in order.iter().enumerate() {
            let (input, target) = &dataset[idx];
            let outputs = network.back_propagate(input, target, config.learning_rate)?;
            total_loss += sample_loss(output_activation, &outputs, target)?;
            if argmax(&outputs) == argmax(target) {
                correct += 1;
            }
            let seen = i + 1;
            if config.log_every > 0 && seen % config.log_every == 0 {
                info!(
                    epoch,
                    seen,
                    total = dataset.len(),
                    accuracy = correct as f64 / seen as f64,
                    "training progress"
                );
            }
        }

        let stats = EpochStats {
            epoch,
            accuracy: correct as f64 / dataset.len() as f64,
            mean_loss: total_loss / dataset.len() as f64,
        };
        info!(
            epoch,
            accuracy = stats.accuracy,
            mean_loss = stats.mean_loss,
            "epoch complete"
        );
        if let Some(path) = &config.checkpoint {
            network.save_network(path)?;
        }
        history.push(stats);
    }
    Ok(history)
}
