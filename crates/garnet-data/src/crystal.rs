// CrystalDataset — index-backed dataset with one-time shuffle and memoized access

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::{Dataset, Sample, SampleSource};
use crate::error::DataError;
use crate::index::{self, IndexEntry};

/// Shuffle seed used by the convenience constructors.
pub const DEFAULT_SEED: u64 = 123;

/// An index-backed crystal dataset.
///
/// The index is loaded and shuffled exactly once at construction; the
/// resulting order is stable for the dataset's lifetime. Samples are
/// produced by the configured [`SampleSource`] on first access and
/// retained in an in-process map with no eviction (dataset sizes are
/// bounded and known at construction). The map is an optimization only:
/// every stage is deterministic, so a recomputed sample is
/// content-identical to a memoized one.
pub struct CrystalDataset<S: SampleSource> {
    entries: Vec<IndexEntry>,
    source: S,
    memo: Mutex<HashMap<usize, Sample>>,
    dataset_name: String,
}

impl<S: SampleSource> CrystalDataset<S> {
    /// Load the index at `index_path`, shuffle it with `seed`, and serve
    /// samples through `source`.
    pub fn new(index_path: &Path, source: S, seed: u64) -> Result<Self, DataError> {
        let mut entries = index::load_index(index_path)?;
        let mut rng = StdRng::seed_from_u64(seed);
        entries.shuffle(&mut rng);
        let dataset_name = format!("crystal-{}", source.kind());
        Ok(Self {
            entries,
            source,
            memo: Mutex::new(HashMap::new()),
            dataset_name,
        })
    }

    /// The shuffled index entries.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// The shuffled entry at position `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn entry(&self, i: usize) -> &IndexEntry {
        &self.entries[i]
    }
}

impl<S: SampleSource> Dataset for CrystalDataset<S> {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, index: usize) -> Result<Sample, DataError> {
        if let Some(sample) = self.memo.lock().unwrap().get(&index) {
            return Ok(sample.clone());
        }
        let entry = &self.entries[index];
        let sample = self.source.load(&entry.id, entry.target)?;
        self.memo
            .lock()
            .unwrap()
            .insert(index, sample.clone());
        Ok(sample)
    }

    fn name(&self) -> &str {
        &self.dataset_name
    }
}
