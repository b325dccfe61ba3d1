//! # garnet-data
//!
//! Data preparation for crystal property models.
//!
//! This crate provides:
//! - [`Dataset`] trait + [`CrystalDataset`] — index-backed crystal datasets
//!   with a one-time seeded shuffle and memoized access
//! - [`StructureFileSource`] / [`CachedFeatureSource`] — the two sample
//!   strategies: compute from a CIF file, or read previously cached features
//! - [`FeatureStore`] — per-identifier on-disk feature cache
//! - [`collate`] — variable-atom-count batch collation with an explicit
//!   atom-to-crystal grouping
//! - [`get_train_val_test_loader`] — train/val/test splitting plus
//!   randomized batch loaders

pub mod collate;
pub mod crystal;
pub mod dataset;
pub mod error;
pub mod index;
pub mod loader;
pub mod source;
pub mod store;

pub use collate::{collate, CrystalBatch};
pub use crystal::{CrystalDataset, DEFAULT_SEED};
pub use dataset::{Dataset, Sample, SampleSource};
pub use error::DataError;
pub use index::{load_index, IndexEntry, INDEX_FILE};
pub use loader::{
    get_train_val_test_loader, split_indices, Batches, DataLoader, LoaderConfig, SplitIndices,
    SubsetRandomSampler,
};
pub use source::{cached_dataset, structure_dataset, CachedFeatureSource, StructureFileSource};
pub use store::{FeatureStore, StoredEntry, STORE_EXT};
