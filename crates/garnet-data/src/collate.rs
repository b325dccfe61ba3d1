// Batch collation — variable-sized crystals into stacked blocks

use std::ops::Range;

use garnet_core::AtomFeatures;

use crate::dataset::Sample;

/// A collated batch of crystals.
///
/// Atom rows of all crystals are stacked end to end; `crystal_atom_index[i]`
/// is the row range of crystal `i` in both stacked blocks. `targets` and
/// `ids` are positionally correlated with `crystal_atom_index`: all three
/// follow the input sample order.
#[derive(Debug, Clone)]
pub struct CrystalBatch {
    /// Stacked one-hot rows, `[Σ n_i, ONE_HOT_WIDTH]`.
    pub atom_features: AtomFeatures,
    /// Stacked descriptor rows, `[Σ n_i, D]`.
    pub descriptors: AtomFeatures,
    /// Row range of each crystal within the stacked blocks.
    pub crystal_atom_index: Vec<Range<usize>>,
    /// Stacked targets, one per crystal.
    pub targets: Vec<f64>,
    /// Structure identifiers, one per crystal.
    pub ids: Vec<String>,
}

impl CrystalBatch {
    /// Number of crystals in the batch.
    pub fn num_crystals(&self) -> usize {
        self.targets.len()
    }

    /// Total number of atoms across the batch.
    pub fn num_atoms(&self) -> usize {
        self.atom_features.rows()
    }
}

/// Collate samples into a batch, preserving input order exactly.
///
/// # Panics
/// Panics on an empty slice; a batch of zero crystals is out of contract.
pub fn collate(samples: &[Sample]) -> CrystalBatch {
    assert!(!samples.is_empty(), "collate: need at least one sample");

    let mut crystal_atom_index = Vec::with_capacity(samples.len());
    let mut targets = Vec::with_capacity(samples.len());
    let mut ids = Vec::with_capacity(samples.len());
    let mut base = 0;
    for sample in samples {
        let n = sample.num_atoms();
        crystal_atom_index.push(base..base + n);
        targets.push(sample.target);
        ids.push(sample.id.clone());
        base += n;
    }

    CrystalBatch {
        atom_features: AtomFeatures::concat(samples.iter().map(|s| &s.atom_features)),
        descriptors: AtomFeatures::concat(samples.iter().map(|s| &s.descriptor)),
        crystal_atom_index,
        targets,
        ids,
    }
}
