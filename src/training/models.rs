//! Estimator capability consumed by the selectors

use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of supervised task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskType {
    #[default]
    Regression,
    /// Targets are class labels encoded as `f64`; binary targets use 0 and 1
    Classification,
}

/// A model that can be refit from scratch on every fold.
///
/// Selectors never reuse a fitted instance across folds: each fold starts
/// from [`Estimator::unfitted`], so implementations may keep any state they
/// like between `fit` and `predict`.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Positive-class probabilities for binary classifiers
    fn predict_proba(&self, _x: &Array2<f64>) -> Result<Array1<f64>> {
        Err(SelectionError::ConfigError(format!(
            "{} does not provide class probabilities",
            self.name()
        )))
    }

    /// Native per-feature importances (if available), aligned with the columns
    /// seen in `fit`
    fn feature_importances(&self) -> Option<Array1<f64>> {
        None
    }

    /// Whether a fitted instance reports [`Estimator::feature_importances`].
    /// Queried before any fitting so that importance-driven selectors can
    /// reject the estimator up front.
    fn has_feature_importances(&self) -> bool {
        false
    }

    /// A fresh copy with the same hyperparameters and no fitted state
    fn unfitted(&self) -> Box<dyn Estimator>;

    /// Short display name
    fn name(&self) -> &str;
}

/// Reject shapes and values no estimator can learn from
pub(crate) fn check_training_data(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(SelectionError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 || x.ncols() == 0 {
        return Err(SelectionError::DataError(format!(
            "cannot fit on a {}x{} matrix",
            x.nrows(),
            x.ncols()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(SelectionError::DataError(
            "training data contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
