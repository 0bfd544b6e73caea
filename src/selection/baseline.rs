//! Reference performance of the full feature set and synthetic probe columns

use super::config::ProbeDistribution;
use super::evaluator::{Evaluator, FoldModels};
use super::importance::{CvScore, FeatureImportance, ImportanceRecord};
use crate::data::{Column, Dataset};
use crate::error::{Result, SelectionError};
use ndarray::Array1;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

/// Full-set score plus everything the strategies reuse from those fits
#[derive(Debug)]
pub struct Baseline {
    pub features: Vec<String>,
    pub score: CvScore,
    /// Mean and std across folds of the fold models' native importances
    pub native_importances: Option<ImportanceRecord>,
    pub fold_models: FoldModels,
}

impl Baseline {
    /// Cross-validate the estimator on every feature in `features`
    pub fn establish(evaluator: &Evaluator<'_>, features: &[String]) -> Result<Self> {
        let (score, fold_models) = evaluator.evaluate_with_models(features)?;
        let native_importances = native_importances(&fold_models, features)?;
        info!(
            n_features = features.len(),
            mean = score.mean,
            std = score.std,
            "Established baseline"
        );
        Ok(Self {
            features: features.to_vec(),
            score,
            native_importances,
            fold_models,
        })
    }

    /// Native importances, or a configuration error naming the estimator
    pub fn require_native_importances(&self, estimator_name: &str) -> Result<&ImportanceRecord> {
        self.native_importances.as_ref().ok_or_else(|| {
            SelectionError::ConfigError(format!(
                "{} does not expose feature importances",
                estimator_name
            ))
        })
    }
}

/// Aggregate per-fold native importances; `None` if any fold model has none
fn native_importances(models: &FoldModels, features: &[String]) -> Result<Option<ImportanceRecord>> {
    let mut per_fold: Vec<Array1<f64>> = Vec::with_capacity(models.len());
    for model in models {
        match model.feature_importances() {
            Some(imp) if imp.len() == features.len() => per_fold.push(imp),
            Some(imp) => {
                return Err(SelectionError::ShapeError {
                    expected: format!("{} importances", features.len()),
                    actual: format!("{} importances", imp.len()),
                })
            }
            None => return Ok(None),
        }
    }

    let mut record = ImportanceRecord::new();
    for (j, name) in features.iter().enumerate() {
        let values: Vec<f64> = per_fold.iter().map(|imp| imp[j]).collect();
        record.insert(name.clone(), FeatureImportance::from_folds(&values)?)?;
    }
    Ok(Some(record))
}

/// Generate `n_probes` probe columns for `dataset`, seeded by `seed`.
///
/// Shuffled probes copy the real `variables` round-robin.
pub fn generate_probes(
    dataset: &Dataset,
    variables: &[String],
    n_probes: usize,
    distribution: ProbeDistribution,
    seed: u64,
) -> Result<Vec<Column>> {
    if n_probes == 0 {
        return Err(SelectionError::ConfigError(
            "probe selection needs at least one probe".to_string(),
        ));
    }

    let n_rows = dataset.n_rows();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut probes = Vec::with_capacity(n_probes);

    for i in 0..n_probes {
        let kind = match distribution {
            ProbeDistribution::All => ProbeDistribution::CYCLE[i % ProbeDistribution::CYCLE.len()],
            other => other,
        };
        let values: Vec<f64> = match kind {
            ProbeDistribution::Normal => (0..n_rows).map(|_| 3.0 * standard_normal(&mut rng)).collect(),
            ProbeDistribution::Uniform => (0..n_rows).map(|_| rng.gen::<f64>()).collect(),
            ProbeDistribution::Binary => (0..n_rows).map(|_| rng.gen_range(0..2) as f64).collect(),
            ProbeDistribution::Discrete => (0..n_rows).map(|_| poisson(&mut rng, 3.0)).collect(),
            ProbeDistribution::Shuffled | ProbeDistribution::All => {
                let source = &variables[i % variables.len()];
                let mut values = dataset.column(source)?.values().to_vec();
                values.shuffle(&mut rng);
                values
            }
        };
        let name = format!("{}_probe_{}", kind.prefix(), i);
        probes.push(Column::numeric(name, Array1::from_vec(values))?);
    }

    Ok(probes)
}

/// Box-Muller transform
fn standard_normal(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// Knuth's multiplication method
fn poisson(rng: &mut ChaCha8Rng, lambda: f64) -> f64 {
    let limit = (-lambda).exp();
    let mut k = 0u32;
    let mut p = 1.0;
    loop {
        p *= rng.gen::<f64>();
        if p <= limit {
            return k as f64;
        }
        k += 1;
    }
}
