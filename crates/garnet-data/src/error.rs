use std::path::PathBuf;

/// All errors that can occur while preparing crystal datasets.
///
/// Construction problems (`Config`, `Index`) and split problems
/// (`Partition`) are fatal before any loading begins. Per-sample problems
/// (`Structure`, `MissingCache`, `Store`) are fatal to the single fetch
/// that triggered them; there is no retry or skip-and-continue policy.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// Missing root directory or index file at construction.
    #[error("configuration error: {0}")]
    Config(String),

    /// A malformed row in the index file.
    #[error("{}:{line}: {msg}", .path.display())]
    Index {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    /// Split sizes violate the partition preconditions.
    #[error("invalid split: {0}")]
    Partition(String),

    /// Structure parsing or descriptor computation failed for one sample.
    #[error("structure error for '{id}': {source}")]
    Structure {
        id: String,
        #[source]
        source: garnet_core::Error,
    },

    /// No cache entry exists for an identifier.
    #[error("no cached features for '{id}' at {}", .path.display())]
    MissingCache { id: String, path: PathBuf },

    /// A cache file exists but could not be read or validated.
    #[error("feature store error for '{id}': {msg}")]
    Store { id: String, msg: String },

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
