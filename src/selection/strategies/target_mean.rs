use super::{viable, SearchContext, SearchStrategy, StrategyOutcome};
use crate::data::ColumnType;
use crate::error::{Result, SelectionError};
use crate::selection::config::BinningStrategy;
use crate::selection::importance::{FeatureImportance, ImportanceRecord};
use crate::selection::stats::bin_edges;
use crate::training::{CVSplit, TaskType};
use ndarray::Array1;
use std::collections::HashMap;

/// Score each feature by how well its per-level training target mean predicts
/// the held-out target. No estimator is fitted.
///
/// Categorical features use their levels; numerical features are binned on
/// the training rows of every fold.
#[derive(Debug, Clone)]
pub struct TargetMeanPerformance {
    pub bins: usize,
    pub strategy: BinningStrategy,
}

impl TargetMeanPerformance {
    /// Level key of every row, with bin edges fitted on the training rows
    fn keys(&self, values: &Array1<f64>, dtype: ColumnType, train: &[usize]) -> Vec<i64> {
        match dtype {
            ColumnType::Numeric => {
                let train_values: Vec<f64> = train.iter().map(|&i| values[i]).collect();
                let edges = bin_edges(&train_values, self.bins, self.strategy);
                values
                    .iter()
                    .map(|&v| edges.partition_point(|&e| e < v) as i64)
                    .collect()
            }
            ColumnType::Categorical | ColumnType::DateTime => {
                values.iter().map(|&v| v as i64).collect()
            }
        }
    }

    fn fold_score(&self, ctx: &SearchContext<'_>, feature: &str, split: &CVSplit) -> Result<f64> {
        let column = ctx.dataset.column(feature)?;
        let target = ctx.dataset.target();
        let keys = self.keys(column.values(), column.dtype(), &split.train_indices);

        let mut sums: HashMap<i64, (f64, usize)> = HashMap::new();
        let mut total = 0.0;
        for &i in &split.train_indices {
            let entry = sums.entry(keys[i]).or_insert((0.0, 0));
            entry.0 += target[i];
            entry.1 += 1;
            total += target[i];
        }
        let global_mean = total / split.train_indices.len() as f64;

        let as_labels = ctx.task == TaskType::Classification && !ctx.scoring.needs_proba();
        let y_pred: Array1<f64> = split
            .test_indices
            .iter()
            .map(|&i| {
                let mean = sums
                    .get(&keys[i])
                    .map_or(global_mean, |&(sum, count)| sum / count as f64);
                if as_labels {
                    if mean >= 0.5 {
                        1.0
                    } else {
                        0.0
                    }
                } else {
                    mean
                }
            })
            .collect();

        ctx.scoring
            .score(&ctx.dataset.target_rows(&split.test_indices), &y_pred)
            .map_err(|err| SelectionError::ModelFitError {
                subset: vec![feature.to_string()],
                fold: split.fold_idx,
                reason: err.to_string(),
            })
    }

    fn feature_score(&self, ctx: &SearchContext<'_>, feature: &str) -> Result<FeatureImportance> {
        let scores = ctx
            .plan
            .folds()
            .iter()
            .map(|split| self.fold_score(ctx, feature, split))
            .collect::<Result<Vec<f64>>>()?;
        FeatureImportance::from_folds(&scores)
    }
}

impl SearchStrategy for TargetMeanPerformance {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        if self.bins < 2 {
            return Err(SelectionError::ConfigError(format!(
                "target mean selection needs at least 2 bins, got {}",
                self.bins
            )));
        }
        if ctx.task == TaskType::Classification
            && ctx.dataset.target().iter().any(|&v| v != 0.0 && v != 1.0)
        {
            return Err(SelectionError::ConfigError(
                "target mean selection supports binary 0/1 classification targets only".to_string(),
            ));
        }

        let results = ctx
            .executor
            .map(ctx.variables, |name| self.feature_score(ctx, name));

        let mut importances = ImportanceRecord::new();
        let mut non_viable = Vec::new();
        for (name, result) in ctx.variables.iter().zip(results) {
            match viable(result)? {
                Some(imp) => importances.insert(name.clone(), imp)?,
                None => non_viable.push(name.clone()),
            }
        }

        Ok(StrategyOutcome::thresholded(importances, non_viable))
    }
}
