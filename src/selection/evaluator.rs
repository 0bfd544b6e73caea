//! Cross-validated scoring of feature subsets

use super::cv_plan::CvPlan;
use super::importance::CvScore;
use crate::data::Dataset;
use crate::error::{Result, SelectionError};
use crate::metrics::Scoring;
use crate::training::{CVSplit, Estimator};
use crate::utils::Executor;
use tracing::debug;

/// Estimators fitted on each fold of the plan, in fold order
pub type FoldModels = Vec<Box<dyn Estimator>>;

/// Scores feature subsets on the shared CV plan.
///
/// Every fold fits a fresh copy of the configured estimator.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    dataset: &'a Dataset,
    plan: &'a CvPlan,
    estimator: &'a dyn Estimator,
    scoring: &'a Scoring,
    executor: &'a Executor,
}

impl<'a> Evaluator<'a> {
    pub fn new(
        dataset: &'a Dataset,
        plan: &'a CvPlan,
        estimator: &'a dyn Estimator,
        scoring: &'a Scoring,
        executor: &'a Executor,
    ) -> Self {
        Self {
            dataset,
            plan,
            estimator,
            scoring,
            executor,
        }
    }

    /// Mean and sample std of the oriented fold scores
    pub fn evaluate(&self, subset: &[String]) -> Result<CvScore> {
        self.evaluate_with_models(subset).map(|(score, _)| score)
    }

    /// Like [`Evaluator::evaluate`] but also returns the fitted fold models
    pub fn evaluate_with_models(&self, subset: &[String]) -> Result<(CvScore, FoldModels)> {
        if subset.is_empty() {
            return Err(SelectionError::ConfigError(
                "cannot evaluate an empty feature subset".to_string(),
            ));
        }
        for name in subset {
            self.dataset.column(name)?;
        }

        let results = self
            .executor
            .try_map(self.plan.folds(), |split| self.fit_fold(subset, split))?;

        let (fold_scores, models): (Vec<f64>, FoldModels) = results.into_iter().unzip();
        let score = CvScore::from_fold_scores(fold_scores)?;
        debug!(
            n_features = subset.len(),
            mean = score.mean,
            std = score.std,
            "Evaluated subset"
        );
        Ok((score, models))
    }

    fn fit_fold(&self, subset: &[String], split: &CVSplit) -> Result<(f64, Box<dyn Estimator>)> {
        let x_train = self.dataset.matrix_rows(subset, &split.train_indices)?;
        let y_train = self.dataset.target_rows(&split.train_indices);
        let x_test = self.dataset.matrix_rows(subset, &split.test_indices)?;
        let y_test = self.dataset.target_rows(&split.test_indices);

        let mut model = self.estimator.unfitted();
        let score = model
            .fit(&x_train, &y_train)
            .and_then(|_| self.scoring.score_estimator(model.as_ref(), &x_test, &y_test))
            .map_err(|err| SelectionError::ModelFitError {
                subset: subset.to_vec(),
                fold: split.fold_idx,
                reason: err.to_string(),
            })?;
        Ok((score, model))
    }
}
