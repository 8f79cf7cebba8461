//! Error type shared by every part of the crate.
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An input or target vector does not have the length the network expects.
    #[error("dimension mismatch: expected {expected} values, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The requested layer layout cannot form a usable network.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Opening, reading or writing a file failed.
    #[error("I/O failure ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A weights file does not hold exactly one value per parameter.
    #[error("weights file holds {found} values, network expects {expected}")]
    WeightCount { expected: usize, found: usize },

    #[error("malformed weight {token:?} on line {line}")]
    ParseWeight { line: usize, token: String },

    /// IDX headers that do not describe MNIST images or labels.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("unsupported checkpoint format version {0}")]
    UnsupportedVersion(u32),

    #[error("JSON encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown activation {0:?}")]
    UnknownActivation(String),
}

impl Error {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::DimensionMismatch { expected, actual })
        }
    }
}
