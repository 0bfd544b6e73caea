use super::{viable, SearchContext, SearchStrategy, StrategyOutcome};
use crate::error::{Result, SelectionError};
use crate::selection::importance::{FeatureImportance, ImportanceRecord};
use ndarray::{Array1, Array2};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Permutation importance on the held-out rows of every fold.
///
/// Each fold reuses the baseline model fitted on that fold. The column is
/// shuffled with a stream derived from the feature and fold index, so results
/// do not depend on evaluation order.
#[derive(Debug, Clone, Default)]
pub struct Shuffling;

struct HeldOut {
    x: Array2<f64>,
    y: Array1<f64>,
}

impl Shuffling {
    fn drift(
        ctx: &SearchContext<'_>,
        held_out: &[HeldOut],
        feature_idx: usize,
    ) -> Result<FeatureImportance> {
        let baseline = ctx.baseline()?;
        let n_folds = held_out.len();
        let mut drifts = Vec::with_capacity(n_folds);

        for (fold, (data, model)) in held_out.iter().zip(&baseline.fold_models).enumerate() {
            let mut rng = ChaCha8Rng::seed_from_u64(ctx.random_state);
            rng.set_stream((feature_idx * n_folds + fold) as u64);

            let mut x = data.x.clone();
            let mut column = x.column(feature_idx).to_vec();
            column.shuffle(&mut rng);
            x.column_mut(feature_idx).assign(&Array1::from_vec(column));

            let shuffled = ctx
                .scoring
                .score_estimator(model.as_ref(), &x, &data.y)
                .map_err(|err| SelectionError::ModelFitError {
                    subset: vec![ctx.variables[feature_idx].clone()],
                    fold: ctx.plan.folds()[fold].fold_idx,
                    reason: err.to_string(),
                })?;
            drifts.push(baseline.score.fold_scores[fold] - shuffled);
        }

        FeatureImportance::from_folds(&drifts)
    }
}

impl SearchStrategy for Shuffling {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let baseline = ctx.baseline()?;
        if baseline.features != ctx.variables || baseline.fold_models.len() != ctx.plan.n_folds() {
            return Err(SelectionError::ComputationError(
                "baseline does not match the candidate features".to_string(),
            ));
        }

        let held_out = ctx
            .plan
            .folds()
            .iter()
            .map(|split| {
                Ok(HeldOut {
                    x: ctx.dataset.matrix_rows(ctx.variables, &split.test_indices)?,
                    y: ctx.dataset.target_rows(&split.test_indices),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let indices: Vec<usize> = (0..ctx.variables.len()).collect();
        let results = ctx
            .executor
            .map(&indices, |&j| Self::drift(ctx, &held_out, j));

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
