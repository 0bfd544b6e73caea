//! Scores, importance records and the dropped-feature report

use crate::error::{Result, SelectionError};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Cross-validated score of one feature subset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    pub mean: f64,
    /// Sample standard deviation across folds (0 for a single fold)
    pub std: f64,
    pub fold_scores: Vec<f64>,
}

impl CvScore {
    pub fn from_fold_scores(fold_scores: Vec<f64>) -> Result<Self> {
        if fold_scores.is_empty() {
            return Err(SelectionError::ComputationError(
                "no fold scores to aggregate".to_string(),
            ));
        }
        let (mean, std) = mean_and_std(&fold_scores);
        Ok(Self {
            mean,
            std,
            fold_scores,
        })
    }
}

/// Mean and sample standard deviation; callers guarantee a non-empty slice
pub(crate) fn mean_and_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = if values.len() > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    } else {
        0.0
    };
    (mean, std)
}

/// Mean contribution of one feature and its spread across folds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub mean: f64,
    pub std: f64,
}

impl FeatureImportance {
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    pub fn from_score(score: &CvScore) -> Self {
        Self::new(score.mean, score.std)
    }

    /// Aggregate per-fold values of one feature
    pub fn from_folds(values: &[f64]) -> Result<Self> {
        if values.is_empty() {
            return Err(SelectionError::ComputationError(
                "no fold values to aggregate".to_string(),
            ));
        }
        let (mean, std) = mean_and_std(values);
        Ok(Self::new(mean, std))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportanceEntry {
    pub feature: String,
    pub mean: f64,
    pub std: f64,
}

/// Insertion-ordered map from feature name to importance.
///
/// Each feature is written once; values are always finite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportanceRecord {
    entries: Vec<ImportanceEntry>,
}

impl ImportanceRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, feature: impl Into<String>, importance: FeatureImportance) -> Result<()> {
        let feature = feature.into();
        if !importance.mean.is_finite() || !importance.std.is_finite() {
            return Err(SelectionError::ComputationError(format!(
                "non-finite importance for feature '{}'",
                feature
            )));
        }
        if self.get(&feature).is_some() {
            return Err(SelectionError::ComputationError(format!(
                "importance for feature '{}' recorded twice",
                feature
            )));
        }
        self.entries.push(ImportanceEntry {
            feature,
            mean: importance.mean,
            std: importance.std,
        });
        Ok(())
    }

    pub fn get(&self, feature: &str) -> Option<FeatureImportance> {
        self.entries
            .iter()
            .find(|e| e.feature == feature)
            .map(|e| FeatureImportance::new(e.mean, e.std))
    }

    pub fn entries(&self) -> &[ImportanceEntry] {
        &self.entries
    }

    pub fn features(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.feature.clone()).collect()
    }

    pub fn means(&self) -> Array1<f64> {
        self.entries.iter().map(|e| e.mean).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Average of the recorded means
    pub fn mean_importance(&self) -> Option<f64> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.iter().map(|e| e.mean).sum::<f64>() / self.entries.len() as f64)
        }
    }
}

/// Why a candidate feature was not selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DropReason {
    /// Importance did not clear the threshold
    BelowThreshold,
    /// Not picked by MRMR
    Redundant,
    /// Every evaluation involving the feature failed
    NonViable,
    /// The search stopped before reaching the feature
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedFeature {
    pub name: String,
    pub reason: DropReason,
}

impl DroppedFeature {
    pub fn new(name: impl Into<String>, reason: DropReason) -> Self {
        Self {
            name: name.into(),
            reason,
        }
    }
}

/// An accepted state of a recursive search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub subset: Vec<String>,
    pub score: CvScore,
}

impl Checkpoint {
    pub fn new(subset: Vec<String>, score: CvScore) -> Self {
        Self { subset, score }
    }
}
