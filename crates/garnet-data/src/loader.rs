// Split building and batch loading

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::collate::{collate, CrystalBatch};
use crate::dataset::{Dataset, Sample};
use crate::error::DataError;

/// Configuration for [`get_train_val_test_loader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Samples per batch.
    pub batch_size: usize,
    /// Training subset size; `None` uses every index outside val/test.
    pub train_size: Option<usize>,
    /// Validation subset size.
    pub val_size: usize,
    /// Test subset size.
    pub test_size: usize,
    /// Whether to produce a test loader. When false the test-range
    /// indices are withheld: no produced loader can draw them.
    pub return_test: bool,
    /// Parallel sample fetches per batch (0 = sequential).
    pub num_workers: usize,
    /// Seed for the per-traversal sampling orders.
    pub seed: Option<u64>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            train_size: None,
            val_size: 1000,
            test_size: 1000,
            return_test: false,
            num_workers: 0,
            seed: None,
        }
    }
}

impl LoaderConfig {
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }

    pub fn train_size(mut self, n: usize) -> Self {
        self.train_size = Some(n);
        self
    }

    pub fn val_size(mut self, n: usize) -> Self {
        self.val_size = n;
        self
    }

    pub fn test_size(mut self, n: usize) -> Self {
        self.test_size = n;
        self
    }

    pub fn return_test(mut self, r: bool) -> Self {
        self.return_test = r;
        self
    }

    pub fn num_workers(mut self, n: usize) -> Self {
        self.num_workers = n;
        self
    }

    pub fn seed(mut self, s: u64) -> Self {
        self.seed = Some(s);
        self
    }
}

/// Contiguous index ranges over the already-shuffled dataset ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `[0, total)` into train/val/test index ranges.
///
/// `val` covers `[T−(v+t), T−t)` and `test` covers `[T−t, T)`. `train`
/// covers `[0, train_size)` when set, otherwise every index before the
/// val range.
///
/// # Errors
/// `Partition` when the sizes cannot fit: unset `train_size` requires
/// `val_size + test_size < total`; set requires
/// `train_size + val_size + test_size <= total`.
pub fn split_indices(total: usize, config: &LoaderConfig) -> Result<SplitIndices, DataError> {
    let held_out = config.val_size + config.test_size;
    match config.train_size {
        None => {
            if held_out >= total {
                return Err(DataError::Partition(format!(
                    "val_size + test_size ({held_out}) must be smaller than the dataset \
                     ({total}) when train_size is unset"
                )));
            }
            eprintln!(
                "[garnet] warning: train_size not set, training on all {} entries outside val/test",
                total - held_out
            );
        }
        Some(train) => {
            if train + held_out > total {
                return Err(DataError::Partition(format!(
                    "train_size + val_size + test_size ({}) exceeds the dataset ({total})",
                    train + held_out
                )));
            }
        }
    }

    let train_end = config.train_size.unwrap_or(total - held_out);
    let val_start = total - held_out;
    let test_start = total - config.test_size;

    Ok(SplitIndices {
        train: (0..train_end).collect(),
        val: (val_start..test_start).collect(),
        test: (test_start..total).collect(),
    })
}

/// Samples a fixed index set in a fresh random order on every traversal,
/// without replacement within a traversal.
pub struct SubsetRandomSampler {
    indices: Vec<usize>,
    rng: StdRng,
}

impl SubsetRandomSampler {
    pub fn new(indices: Vec<usize>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { indices, rng }
    }

    /// Number of indices drawn per traversal.
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Whether the index set is empty.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// One full traversal: every index exactly once, freshly shuffled.
    pub fn draw(&mut self) -> Vec<usize> {
        let mut order = self.indices.clone();
        order.shuffle(&mut self.rng);
        order
    }
}

/// Batched loader over one subset of a dataset.
pub struct DataLoader<'a> {
    dataset: &'a dyn Dataset,
    sampler: SubsetRandomSampler,
    batch_size: usize,
    num_workers: usize,
}

impl<'a> DataLoader<'a> {
    /// Create a loader drawing from `sampler`'s index set.
    ///
    /// # Panics
    /// Panics if `batch_size` is zero.
    pub fn new(
        dataset: &'a dyn Dataset,
        sampler: SubsetRandomSampler,
        batch_size: usize,
        num_workers: usize,
    ) -> Self {
        assert!(batch_size > 0, "batch_size must be positive");
        Self {
            dataset,
            sampler,
            batch_size,
            num_workers,
        }
    }

    /// Number of samples drawn per epoch.
    pub fn len(&self) -> usize {
        self.sampler.len()
    }

    /// Whether the loader's subset is empty.
    pub fn is_empty(&self) -> bool {
        self.sampler.is_empty()
    }

    /// Batches per epoch.
    pub fn num_batches(&self) -> usize {
        self.len().div_ceil(self.batch_size)
    }

    /// Fetch one batch worth of samples, in parallel when workers are
    /// configured.
    fn fetch_samples(&self, indices: &[usize]) -> Result<Vec<Sample>, DataError> {
        if self.num_workers > 0 && indices.len() > 1 {
            indices.par_iter().map(|&i| self.dataset.get(i)).collect()
        } else {
            indices.iter().map(|&i| self.dataset.get(i)).collect()
        }
    }

    /// Iterate one epoch of batches in a fresh sampling order.
    ///
    /// A failed sample fetch aborts its batch with the error; there is no
    /// retry or skip.
    pub fn iter_epoch(&mut self) -> Batches<'_, 'a> {
        let order = self.sampler.draw();
        Batches {
            loader: self,
            order,
            batch_idx: 0,
        }
    }
}

/// Iterator over one epoch of collated batches.
pub struct Batches<'l, 'a> {
    loader: &'l DataLoader<'a>,
    order: Vec<usize>,
    batch_idx: usize,
}

impl Iterator for Batches<'_, '_> {
    type Item = Result<CrystalBatch, DataError>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.batch_idx * self.loader.batch_size;
        if start >= self.order.len() {
            return None;
        }
        let end = (start + self.loader.batch_size).min(self.order.len());
        self.batch_idx += 1;

        let samples = match self.loader.fetch_samples(&self.order[start..end]) {
            Ok(samples) => samples,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(collate(&samples)))
    }
}

/// Partition a dataset and produce its train/val/test loaders.
///
/// The test loader exists only when `config.return_test` is set;
/// otherwise the test-range indices are withheld entirely for the run.
///
/// # Errors
/// `Partition` when the configured sizes violate the split preconditions.
pub fn get_train_val_test_loader<'a>(
    dataset: &'a dyn Dataset,
    config: &LoaderConfig,
) -> Result<(DataLoader<'a>, DataLoader<'a>, Option<DataLoader<'a>>), DataError> {
    let split = split_indices(dataset.len(), config)?;
    // Distinct seed streams keep the three traversal orders independent.
    let seed_for = |k: u64| config.seed.map(|s| s + k);

    let train = DataLoader::new(
        dataset,
        SubsetRandomSampler::new(split.train, seed_for(0)),
        config.batch_size,
        config.num_workers,
    );
    let val = DataLoader::new(
        dataset,
        SubsetRandomSampler::new(split.val, seed_for(1)),
        config.batch_size,
        config.num_workers,
    );
    let test = if config.return_test {
        Some(DataLoader::new(
            dataset,
            SubsetRandomSampler::new(split.test, seed_for(2)),
            config.batch_size,
            config.num_workers,
        ))
    } else {
        None
    };
    Ok((train, val, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use garnet_core::AtomFeatures;

    /// Dataset whose sample id encodes the index; index `fail_at` errors.
    struct StubDataset {
        size: usize,
        fail_at: Option<usize>,
    }

    impl StubDataset {
        fn new(size: usize) -> Self {
            Self {
                size,
                fail_at: None,
            }
        }
    }

    impl Dataset for StubDataset {
        fn len(&self) -> usize {
            self.size
        }

        fn get(&self, index: usize) -> Result<Sample, DataError> {
            if self.fail_at == Some(index) {
                return Err(DataError::Config(format!("stub failure at {index}")));
            }
            let onehot = AtomFeatures::from_flat(vec![0.0; 104], 104).unwrap();
            let descriptor = AtomFeatures::from_flat(vec![index as f64; 4], 4).unwrap();
            Ok(Sample::new(onehot, descriptor, index as f64, index.to_string()))
        }
    }

    #[test]
    fn split_ranges_anchor_to_the_tail() {
        // T = 1000, val 100, test 100, train unset:
        // train [0, 800), val [800, 900), test [900, 1000)
        let config = LoaderConfig::default().val_size(100).test_size(100);
        let split = split_indices(1000, &config).unwrap();
        assert_eq!(split.train, (0..800).collect::<Vec<_>>());
        assert_eq!(split.val, (800..900).collect::<Vec<_>>());
        assert_eq!(split.test, (900..1000).collect::<Vec<_>>());
    }

    #[test]
    fn split_exact_boundary() {
        // train + val + test == total is the exact boundary: allowed
        let config = LoaderConfig::default()
            .train_size(10)
            .val_size(5)
            .test_size(5);
        let split = split_indices(20, &config).unwrap();
        assert_eq!(split.train, (0..10).collect::<Vec<_>>());
        assert_eq!(split.val, vec![10, 11, 12, 13, 14]);
        assert_eq!(split.test, vec![15, 16, 17, 18, 19]);

        let err = split_indices(19, &config).unwrap_err();
        assert!(matches!(err, DataError::Partition(_)));
    }

    #[test]
    fn split_unset_train_requires_strict_headroom() {
        let config = LoaderConfig::default().val_size(5).test_size(5);
        assert!(split_indices(11, &config).is_ok());
        let err = split_indices(10, &config).unwrap_err();
        assert!(matches!(err, DataError::Partition(_)));
    }

    #[test]
    fn sampler_draws_whole_set_without_replacement() {
        let mut sampler = SubsetRandomSampler::new((10..30).collect(), Some(42));
        let mut drawn = sampler.draw();
        assert_eq!(drawn.len(), 20);
        drawn.sort_unstable();
        assert_eq!(drawn, (10..30).collect::<Vec<_>>());
    }

    #[test]
    fn sampler_reshuffles_between_traversals() {
        let mut sampler = SubsetRandomSampler::new((0..100).collect(), Some(42));
        let first = sampler.draw();
        let second = sampler.draw();
        assert_ne!(first, second);
    }

    #[test]
    fn loader_batches_cover_epoch() {
        let ds = StubDataset::new(10);
        let sampler = SubsetRandomSampler::new((0..10).collect(), Some(1));
        let mut loader = DataLoader::new(&ds, sampler, 3, 0);
        assert_eq!(loader.num_batches(), 4);

        let mut seen = Vec::new();
        for batch in loader.iter_epoch() {
            let batch = batch.unwrap();
            assert!(batch.num_crystals() <= 3);
            for id in &batch.ids {
                seen.push(id.parse::<usize>().unwrap());
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn loader_with_workers_matches_sequential_contract() {
        let ds = StubDataset::new(8);
        let sampler = SubsetRandomSampler::new((0..8).collect(), Some(9));
        let mut loader = DataLoader::new(&ds, sampler, 4, 2);
        for batch in loader.iter_epoch() {
            let batch = batch.unwrap();
            // Targets follow the ids positionally regardless of fetch order
            for (id, &target) in batch.ids.iter().zip(&batch.targets) {
                assert_eq!(id.parse::<f64>().unwrap(), target);
            }
        }
    }

    #[test]
    fn failed_fetch_aborts_its_batch() {
        let ds = StubDataset {
            size: 4,
            fail_at: Some(2),
        };
        let sampler = SubsetRandomSampler::new((0..4).collect(), Some(3));
        let mut loader = DataLoader::new(&ds, sampler, 4, 0);
        let result = loader.iter_epoch().next().unwrap();
        assert!(result.is_err());
    }

    #[test]
    fn withheld_test_range_is_never_drawn() {
        let ds = StubDataset::new(20);
        let config = LoaderConfig::default()
            .batch_size(4)
            .val_size(4)
            .test_size(4)
            .seed(7);
        let (mut train, mut val, test) = get_train_val_test_loader(&ds, &config).unwrap();
        assert!(test.is_none());
        assert_eq!(train.len(), 12);
        assert_eq!(val.len(), 4);

        // Repeated full traversals never touch the test range [16, 20)
        for _ in 0..3 {
            for batch in train.iter_epoch() {
                for id in batch.unwrap().ids {
                    assert!(id.parse::<usize>().unwrap() < 12);
                }
            }
            for batch in val.iter_epoch() {
                let idx_range = 12..16;
                for id in batch.unwrap().ids {
                    assert!(idx_range.contains(&id.parse::<usize>().unwrap()));
                }
            }
        }
    }

    #[test]
    fn return_test_produces_the_test_loader() {
        let ds = StubDataset::new(20);
        let config = LoaderConfig::default()
            .batch_size(4)
            .val_size(4)
            .test_size(4)
            .return_test(true)
            .seed(7);
        let (_, _, test) = get_train_val_test_loader(&ds, &config).unwrap();
        let mut test = test.unwrap();
        assert_eq!(test.len(), 4);
        let mut seen = Vec::new();
        for batch in test.iter_epoch() {
            for id in batch.unwrap().ids {
                seen.push(id.parse::<usize>().unwrap());
            }
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![16, 17, 18, 19]);
    }

    #[test]
    fn explicit_train_size_limits_the_train_range() {
        let ds = StubDataset::new(20);
        let config = LoaderConfig::default()
            .batch_size(8)
            .train_size(6)
            .val_size(4)
            .test_size(4)
            .seed(1);
        let (mut train, _, _) = get_train_val_test_loader(&ds, &config).unwrap();
        assert_eq!(train.len(), 6);
        for batch in train.iter_epoch() {
            for id in batch.unwrap().ids {
                assert!(id.parse::<usize>().unwrap() < 6);
            }
        }
    }
}
