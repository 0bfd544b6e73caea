//! Cross-validation splitters

use crate::error::{Result, SelectionError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single train/test split
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

impl CVSplit {
    /// Build a split from explicit index lists
    pub fn new(fold_idx: usize, train_indices: Vec<usize>, test_indices: Vec<usize>) -> Self {
        Self {
            train_indices,
            test_indices,
            fold_idx,
        }
    }
}

/// Anything that can turn a sample count into train/test folds.
///
/// `groups` holds one label per row; splitters that do not use groups ignore it.
pub trait Splitter: Send + Sync + fmt::Debug {
    fn split(
        &self,
        n_samples: usize,
        y: &Array1<f64>,
        groups: Option<&[i64]>,
    ) -> Result<Vec<CVSplit>>;

    /// Whether the splitter keeps each group on one side of every fold
    fn supports_groups(&self) -> bool {
        false
    }
}

fn check_n_splits(n_splits: usize, n_units: usize, unit: &str) -> Result<()> {
    if n_splits < 2 {
        return Err(SelectionError::ConfigError(format!(
            "n_splits must be at least 2, got {}",
            n_splits
        )));
    }
    if n_units < n_splits {
        return Err(SelectionError::ConfigError(format!(
            "number of {} ({}) must be >= n_splits ({})",
            unit, n_units, n_splits
        )));
    }
    Ok(())
}

/// Sizes of `n_splits` contiguous chunks covering `n` items, larger chunks first
fn fold_sizes(n: usize, n_splits: usize) -> Vec<usize> {
    let base = n / n_splits;
    let remainder = n % n_splits;
    (0..n_splits)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Turn per-fold test sets into complete splits over `0..n_samples`
fn splits_from_test_sets(n_samples: usize, test_sets: Vec<Vec<usize>>) -> Vec<CVSplit> {
    test_sets
        .into_iter()
        .enumerate()
        .map(|(fold_idx, mut test_indices)| {
            test_indices.sort_unstable();
            let mut in_test = vec![false; n_samples];
            for &i in &test_indices {
                in_test[i] = true;
            }
            let train_indices = (0..n_samples).filter(|&i| !in_test[i]).collect();
            CVSplit::new(fold_idx, train_indices, test_indices)
        })
        .collect()
}

/// K-Fold cross-validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KFold {
    pub n_splits: usize,
    /// Seed for shuffling rows before chunking; `None` keeps row order
    pub shuffle_seed: Option<u64>,
}

impl KFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    /// Shuffle rows with a fixed seed before chunking
    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl Splitter for KFold {
    fn split(&self, n_samples: usize, _y: &Array1<f64>, _groups: Option<&[i64]>) -> Result<Vec<CVSplit>> {
        check_n_splits(self.n_splits, n_samples, "samples")?;

        let mut indices: Vec<usize> = (0..n_samples).collect();
        if let Some(seed) = self.shuffle_seed {
            indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        }

        let mut test_sets = Vec::with_capacity(self.n_splits);
        let mut current = 0;
        for size in fold_sizes(n_samples, self.n_splits) {
            test_sets.push(indices[current..current + size].to_vec());
            current += size;
        }

        Ok(splits_from_test_sets(n_samples, test_sets))
    }
}

/// Stratified K-Fold (maintains class distribution)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StratifiedKFold {
    pub n_splits: usize,
    pub shuffle_seed: Option<u64>,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            shuffle_seed: None,
        }
    }

    pub fn with_shuffle(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }
}

impl Splitter for StratifiedKFold {
    fn split(&self, n_samples: usize, y: &Array1<f64>, _groups: Option<&[i64]>) -> Result<Vec<CVSplit>> {
        check_n_splits(self.n_splits, n_samples, "samples")?;
        if y.len() != n_samples {
            return Err(SelectionError::ShapeError {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }

        // Class order is fixed by label value so folds are reproducible
        let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &val) in y.iter().enumerate() {
            class_indices.entry(val.round() as i64).or_default().push(idx);
        }

        if let Some(seed) = self.shuffle_seed {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for indices in class_indices.values_mut() {
                indices.shuffle(&mut rng);
            }
        }

        // Deal each class round-robin, continuing where the previous class stopped
        let mut test_sets: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        let mut next = 0;
        for indices in class_indices.values() {
            for &idx in indices {
                test_sets[next % self.n_splits].push(idx);
                next += 1;
            }
        }

        Ok(splits_from_test_sets(n_samples, test_sets))
    }
}

/// Group K-Fold (keeps groups together)
///
/// Groups are assigned largest first to the currently smallest fold, ties
/// broken by group label and fold index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupKFold {
    pub n_splits: usize,
}

impl GroupKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }
}

impl Splitter for GroupKFold {
    fn split(&self, n_samples: usize, _y: &Array1<f64>, groups: Option<&[i64]>) -> Result<Vec<CVSplit>> {
        let groups = groups.ok_or_else(|| {
            SelectionError::ConfigError("GroupKFold requires group labels".to_string())
        })?;
        if groups.len() != n_samples {
            return Err(SelectionError::ConfigError(format!(
                "groups has {} labels for {} rows",
                groups.len(),
                n_samples
            )));
        }

        let mut members: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (idx, &g) in groups.iter().enumerate() {
            members.entry(g).or_default().push(idx);
        }
        check_n_splits(self.n_splits, members.len(), "groups")?;

        let mut ordered: Vec<(i64, Vec<usize>)> = members.into_iter().collect();
        ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(&b.0)));

        let mut test_sets: Vec<Vec<usize>> = vec![Vec::new(); self.n_splits];
        for (_, rows) in ordered {
            let target = (0..self.n_splits)
                .min_by_key(|&f| (test_sets[f].len(), f))
                .unwrap_or(0);
            test_sets[target].extend(rows);
        }

        Ok(splits_from_test_sets(n_samples, test_sets))
    }

    fn supports_groups(&self) -> bool {
        true
    }
}

/// Time series split (no shuffling, respects temporal order)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeriesSplit {
    pub n_splits: usize,
    pub max_train_size: Option<usize>,
}

impl TimeSeriesSplit {
    pub fn new(n_splits: usize) -> Self {
        Self {
            n_splits,
            max_train_size: None,
        }
    }

    pub fn with_max_train_size(mut self, size: usize) -> Self {
        self.max_train_size = Some(size);
        self
    }
}

impl Splitter for TimeSeriesSplit {
    fn split(&self, n_samples: usize, _y: &Array1<f64>, _groups: Option<&[i64]>) -> Result<Vec<CVSplit>> {
        check_n_splits(self.n_splits, n_samples, "samples")?;
        let test_size = n_samples / (self.n_splits + 1);
        if test_size == 0 {
            return Err(SelectionError::ConfigError(format!(
                "{} samples are too few for {} time series splits",
                n_samples, self.n_splits
            )));
        }

        // The last fold's test set ends at the final sample
        let first_test_start = n_samples - self.n_splits * test_size;
        Ok((0..self.n_splits)
            .map(|fold_idx| {
                let test_start = first_test_start + fold_idx * test_size;
                let train_start = self
                    .max_train_size
                    .map_or(0, |max| test_start.saturating_sub(max));
                CVSplit::new(
                    fold_idx,
                    (train_start..test_start).collect(),
                    (test_start..test_start + test_size).collect(),
                )
            })
            .collect())
    }
}

/// Repeated K-Fold with a different shuffle per repeat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatedKFold {
    pub n_splits: usize,
    pub n_repeats: usize,
    pub seed: u64,
}

impl RepeatedKFold {
    pub fn new(n_splits: usize, n_repeats: usize, seed: u64) -> Self {
        Self {
            n_splits,
            n_repeats,
            seed,
        }
    }
}

impl Splitter for RepeatedKFold {
    fn split(&self, n_samples: usize, y: &Array1<f64>, groups: Option<&[i64]>) -> Result<Vec<CVSplit>> {
        if self.n_repeats == 0 {
            return Err(SelectionError::ConfigError(
                "n_repeats must be at least 1".to_string(),
            ));
        }

        let mut all_splits = Vec::with_capacity(self.n_splits * self.n_repeats);
        for repeat in 0..self.n_repeats {
            let kfold = KFold::new(self.n_splits).with_shuffle(self.seed.wrapping_add(repeat as u64));
            for mut split in kfold.split(n_samples, y, groups)? {
                split.fold_idx += repeat * self.n_splits;
                all_splits.push(split);
            }
        }

        Ok(all_splits)
    }
}
