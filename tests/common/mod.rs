//! Shared fixtures for the integration tests
#![allow(dead_code)]

use kolosal_select::prelude::*;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An estimator whose cross-validated score is looked up from a table.
///
/// Every scripted feature column holds its own integer id in every row, so the
/// estimator can tell which subset it was fitted on. Columns that are not a
/// constant positive integer (probes, for example) are "unknown": they do not
/// take part in the score lookup and get `unknown_importance`.
#[derive(Debug, Clone)]
pub struct ScriptedEstimator {
    scores: Arc<BTreeMap<Vec<u32>, f64>>,
    importances: Arc<BTreeMap<u32, f64>>,
    unknown_importance: f64,
    fitted: Option<(Vec<Option<u32>>, f64)>,
}

impl ScriptedEstimator {
    pub fn new(scores: &[(&[u32], f64)]) -> Self {
        let scores = scores
            .iter()
            .map(|(ids, score)| {
                let mut key = ids.to_vec();
                key.sort_unstable();
                (key, *score)
            })
            .collect();
        Self {
            scores: Arc::new(scores),
            importances: Arc::new(BTreeMap::new()),
            unknown_importance: 0.0,
            fitted: None,
        }
    }

    pub fn with_importances(mut self, importances: &[(u32, f64)]) -> Self {
        self.importances = Arc::new(importances.iter().cloned().collect());
        self
    }

    pub fn with_unknown_importance(mut self, importance: f64) -> Self {
        self.unknown_importance = importance;
        self
    }

    fn column_id(x: &Array2<f64>, j: usize) -> Option<u32> {
        let first = x[[0, j]];
        let constant = x.column(j).iter().all(|&v| v == first);
        if constant && first >= 1.0 && first.fract() == 0.0 {
            Some(first as u32)
        } else {
            None
        }
    }
}

impl Estimator for ScriptedEstimator {
    fn fit(&mut self, x: &Array2<f64>, _y: &Array1<f64>) -> Result<()> {
        let ids: Vec<Option<u32>> = (0..x.ncols()).map(|j| Self::column_id(x, j)).collect();
        let mut key: Vec<u32> = ids.iter().flatten().cloned().collect();
        key.sort_unstable();
        let score = *self.scores.get(&key).ok_or_else(|| {
            SelectionError::ComputationError(format!("no scripted score for {:?}", key))
        })?;
        self.fitted = Some((ids, score));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (_, score) = self.fitted.as_ref().ok_or(SelectionError::NotFitted)?;
        Ok(Array1::from_elem(x.nrows(), *score))
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        let (ids, _) = self.fitted.as_ref()?;
        Some(
            ids.iter()
                .map(|id| match id {
                    Some(id) => self.importances.get(id).cloned().unwrap_or(0.0),
                    None => self.unknown_importance,
                })
                .collect(),
        )
    }

    fn has_feature_importances(&self) -> bool {
        true
    }

    fn unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            fitted: None,
            ..self.clone()
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// A scripted estimator that reports no native importances and counts its fits
#[derive(Debug, Clone)]
pub struct CountingEstimator {
    inner: ScriptedEstimator,
    fits: Arc<AtomicUsize>,
}

impl CountingEstimator {
    pub fn new(inner: ScriptedEstimator) -> Self {
        Self {
            inner,
            fits: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared across every unfitted copy
    pub fn fits(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fits)
    }
}

impl Estimator for CountingEstimator {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fits.fetch_add(1, Ordering::SeqCst);
        self.inner.fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.inner.predict(x)
    }

    fn unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            inner: ScriptedEstimator {
                fitted: None,
                ..self.inner.clone()
            },
            fits: Arc::clone(&self.fits),
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Scores a fold by the mean prediction, which is the scripted score
#[derive(Debug)]
pub struct MeanPrediction;

impl Metric for MeanPrediction {
    fn name(&self) -> &str {
        "mean_prediction"
    }

    fn compute(&self, _y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        y_pred
            .mean()
            .ok_or_else(|| SelectionError::ComputationError("empty fold".to_string()))
    }
}

pub fn mean_prediction() -> Scoring {
    Scoring::Custom(Arc::new(MeanPrediction))
}

/// A dataset of scripted feature columns, `(name, id)`, over `n_rows` rows
pub fn scripted_dataset(n_rows: usize, features: &[(&str, u32)]) -> Dataset {
    let y = Array1::from_iter((0..n_rows).map(|i| i as f64));
    let mut dataset = Dataset::new("y", y);
    for (name, id) in features {
        dataset
            .add_numeric(*name, vec![*id as f64; n_rows])
            .unwrap();
    }
    dataset
}

/// y = 3a + 2b + 0.01 * noise over 60 rows
pub fn linear_dataset() -> Dataset {
    let n = 60;
    let a: Vec<f64> = (0..n).map(|i| (i % 13) as f64).collect();
    let b: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 31) % 17) as f64 / 17.0).collect();
    let y: Vec<f64> = (0..n)
        .map(|i| 3.0 * a[i] + 2.0 * b[i] + 0.01 * noise[i])
        .collect();

    let mut dataset = Dataset::new("y", Array1::from_vec(y));
    dataset.add_numeric("a", a).unwrap();
    dataset.add_numeric("b", b).unwrap();
    dataset.add_numeric("noise", noise).unwrap();
    dataset
}

pub fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
