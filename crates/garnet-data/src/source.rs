// Sample sources — compute-from-structure-file and read-from-cache

use std::path::{Path, PathBuf};

use garnet_core::{element, DescriptorConfig, Structure, SymmetryFunctions};

use crate::crystal::{CrystalDataset, DEFAULT_SEED};
use crate::dataset::{Sample, SampleSource};
use crate::error::DataError;
use crate::index::INDEX_FILE;
use crate::store::FeatureStore;

/// Produces samples by parsing `<root>/<id>.cif` and computing the
/// per-atom features.
///
/// When a [`FeatureStore`] is attached, every computed sample is also
/// persisted there. The write is best-effort: a failure is reported on
/// stderr and the computed sample is returned regardless.
#[derive(Debug)]
pub struct StructureFileSource {
    root: PathBuf,
    symmetry: SymmetryFunctions,
    store: Option<FeatureStore>,
}

impl StructureFileSource {
    /// A source reading structure files under `root`.
    ///
    /// # Errors
    /// Fails when `root` is not an existing directory.
    pub fn new(root: impl Into<PathBuf>, config: DescriptorConfig) -> Result<Self, DataError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(DataError::Config(format!(
                "structure root {} does not exist",
                root.display()
            )));
        }
        Ok(Self {
            root,
            symmetry: SymmetryFunctions::new(config),
            store: None,
        })
    }

    /// Attach a feature store; every computed sample is persisted to it.
    pub fn with_store(mut self, store: FeatureStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Path of the structure file for `id`.
    pub fn structure_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.cif"))
    }
}

impl SampleSource for StructureFileSource {
    fn load(&self, id: &str, target: f64) -> Result<Sample, DataError> {
        let structure =
            Structure::from_cif_file(self.structure_path(id)).map_err(|source| {
                DataError::Structure {
                    id: id.to_string(),
                    source,
                }
            })?;

        let atom_features = element::encode_species(&structure.species);
        let descriptor = self
            .symmetry
            .compute(&structure)
            .map_err(|source| DataError::Structure {
                id: id.to_string(),
                source,
            })?;
        let sample = Sample::new(atom_features, descriptor, target, id.to_string());

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&sample) {
                eprintln!("[garnet] warning: could not cache features for '{id}': {e}");
            }
        }
        Ok(sample)
    }

    fn kind(&self) -> &'static str {
        "structures"
    }
}

/// Produces samples by reading previously cached features; never parses a
/// structure file or computes a descriptor.
///
/// Assumes a prior full pass of a structure-backed dataset populated the
/// store for every identifier this source will be asked for; a missing
/// entry is fatal to that fetch.
pub struct CachedFeatureSource {
    store: FeatureStore,
}

impl CachedFeatureSource {
    pub fn new(store: FeatureStore) -> Self {
        Self { store }
    }
}

impl SampleSource for CachedFeatureSource {
    fn load(&self, id: &str, target: f64) -> Result<Sample, DataError> {
        let entry = self.store.load(id)?;
        // Files written before targets were stored fall back to the index value.
        let target = entry.target.unwrap_or(target);
        Ok(Sample::new(
            entry.atom_features,
            entry.descriptor,
            target,
            id.to_string(),
        ))
    }

    fn kind(&self) -> &'static str {
        "cached"
    }
}

/// Open a structure-backed dataset rooted at `root` (`<root>/id_prop.csv`
/// plus one `<root>/<id>.cif` per entry), caching computed features under
/// `cache_root`.
pub fn structure_dataset(
    root: impl AsRef<Path>,
    cache_root: impl Into<PathBuf>,
    config: DescriptorConfig,
) -> Result<CrystalDataset<StructureFileSource>, DataError> {
    let root = root.as_ref();
    let source = StructureFileSource::new(root, config)?.with_store(FeatureStore::new(cache_root));
    CrystalDataset::new(&root.join(INDEX_FILE), source, DEFAULT_SEED)
}

/// Open a cache-backed dataset: index at `<root>/id_prop.csv`, features
/// read from `store_root`.
pub fn cached_dataset(
    root: impl AsRef<Path>,
    store_root: impl Into<PathBuf>,
) -> Result<CrystalDataset<CachedFeatureSource>, DataError> {
    let source = CachedFeatureSource::new(FeatureStore::new(store_root));
    CrystalDataset::new(&root.as_ref().join(INDEX_FILE), source, DEFAULT_SEED)
}
