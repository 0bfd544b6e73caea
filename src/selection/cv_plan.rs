//! Normalisation of a cross-validation specification into a replayable plan

use crate::error::{Result, SelectionError};
use crate::training::{CVSplit, GroupKFold, KFold, Splitter, StratifiedKFold, TaskType};
use ndarray::Array1;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// How the folds of a fit are produced
#[derive(Debug, Clone)]
pub enum CvSpec {
    /// Number of folds; grouped, stratified or plain K-Fold depending on the inputs
    Folds(usize),
    /// A splitter to run once per fit
    Splitter(Arc<dyn Splitter>),
    /// Pre-built folds used as given
    Explicit(Vec<CVSplit>),
}

impl Default for CvSpec {
    fn default() -> Self {
        CvSpec::Folds(3)
    }
}

/// Folds shared by every evaluation of one fit call
#[derive(Debug, Clone, PartialEq)]
pub struct CvPlan {
    folds: Arc<[CVSplit]>,
}

impl CvPlan {
    /// Materialise and validate the folds for `n_rows` rows
    pub fn build(
        spec: &CvSpec,
        n_rows: usize,
        y: &Array1<f64>,
        groups: Option<&[i64]>,
        task: TaskType,
    ) -> Result<Self> {
        if let Some(groups) = groups {
            if groups.len() != n_rows {
                return Err(SelectionError::ConfigError(format!(
                    "groups has {} labels for {} rows",
                    groups.len(),
                    n_rows
                )));
            }
        }

        let folds = match spec {
            CvSpec::Folds(k) => {
                if *k < 2 {
                    return Err(SelectionError::ConfigError(format!(
                        "cv needs at least 2 folds, got {}",
                        k
                    )));
                }
                match (groups, task) {
                    (Some(_), _) => GroupKFold::new(*k).split(n_rows, y, groups),
                    (None, TaskType::Classification) => StratifiedKFold::new(*k).split(n_rows, y, None),
                    (None, TaskType::Regression) => KFold::new(*k).split(n_rows, y, None),
                }?
            }
            CvSpec::Splitter(splitter) => {
                if groups.is_some() && !splitter.supports_groups() {
                    return Err(SelectionError::ConfigError(format!(
                        "groups were given but {:?} does not split by group",
                        splitter
                    )));
                }
                splitter.split(n_rows, y, groups)?
            }
            CvSpec::Explicit(folds) => {
                if folds.len() < 2 {
                    return Err(SelectionError::ConfigError(format!(
                        "explicit cv needs at least 2 folds, got {}",
                        folds.len()
                    )));
                }
                folds.clone()
            }
        };

        if folds.is_empty() {
            return Err(SelectionError::ConfigError(
                "cross-validation produced no folds".to_string(),
            ));
        }
        for fold in &folds {
            Self::check_fold(fold, n_rows, groups)?;
        }

        debug!(n_folds = folds.len(), n_rows, grouped = groups.is_some(), "Built CV plan");
        Ok(Self {
            folds: folds.into(),
        })
    }

    fn check_fold(fold: &CVSplit, n_rows: usize, groups: Option<&[i64]>) -> Result<()> {
        if fold.train_indices.is_empty() || fold.test_indices.is_empty() {
            return Err(SelectionError::ConfigError(format!(
                "fold {} has an empty train or test side",
                fold.fold_idx
            )));
        }
        if let Some(&bad) = fold
            .train_indices
            .iter()
            .chain(fold.test_indices.iter())
            .find(|&&i| i >= n_rows)
        {
            return Err(SelectionError::ConfigError(format!(
                "fold {} references row {} of {}",
                fold.fold_idx, bad, n_rows
            )));
        }
        if let Some(groups) = groups {
            let train_groups: HashSet<i64> = fold.train_indices.iter().map(|&i| groups[i]).collect();
            if let Some(&i) = fold.test_indices.iter().find(|&&i| train_groups.contains(&groups[i])) {
                return Err(SelectionError::ConfigError(format!(
                    "group {} appears in both train and test of fold {}",
                    groups[i], fold.fold_idx
                )));
            }
        }
        Ok(())
    }

    pub fn folds(&self) -> &[CVSplit] {
        &self.folds
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }
}
