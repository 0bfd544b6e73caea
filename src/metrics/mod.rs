//! Scoring metrics used to evaluate candidate feature subsets
//!
//! Every score handed to a selector is *oriented*: greater is always better.
//! Error metrics are exposed in negated form (`NegMeanSquaredError`) and custom
//! metrics declaring `greater_is_better() == false` are negated on the way out.

use crate::error::{Result, SelectionError};
use crate::training::{Estimator, TaskType};
use ndarray::{Array1, Array2};
use std::fmt;
use std::sync::Arc;

/// A user-supplied metric
pub trait Metric: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Raw metric value for one fold
    fn compute(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64>;

    fn greater_is_better(&self) -> bool {
        true
    }

    /// Whether `y_pred` should be positive-class probabilities instead of labels
    fn needs_proba(&self) -> bool {
        false
    }
}

/// Cross-validation scoring rule
#[derive(Clone, Debug)]
pub enum Scoring {
    /// For regression: R² coefficient of determination
    R2,
    /// For regression: Mean squared error (negated for maximization)
    NegMeanSquaredError,
    /// For regression: Mean absolute error (negated for maximization)
    NegMeanAbsoluteError,
    /// For classification: Accuracy score
    Accuracy,
    /// For binary classification: Precision of class 1
    Precision,
    /// For binary classification: Recall of class 1
    Recall,
    /// For binary classification: F1 score of class 1
    F1,
    /// For binary classification: area under the ROC curve
    RocAuc,
    Custom(Arc<dyn Metric>),
}

impl Scoring {
    /// Default rule for a task: R² for regression, ROC AUC for classification
    pub fn default_for(task: TaskType) -> Self {
        match task {
            TaskType::Regression => Scoring::R2,
            TaskType::Classification => Scoring::RocAuc,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Scoring::R2 => "r2".to_string(),
            Scoring::NegMeanSquaredError => "neg_mean_squared_error".to_string(),
            Scoring::NegMeanAbsoluteError => "neg_mean_absolute_error".to_string(),
            Scoring::Accuracy => "accuracy".to_string(),
            Scoring::Precision => "precision".to_string(),
            Scoring::Recall => "recall".to_string(),
            Scoring::F1 => "f1".to_string(),
            Scoring::RocAuc => "roc_auc".to_string(),
            Scoring::Custom(metric) => metric.name().to_string(),
        }
    }

    pub fn needs_proba(&self) -> bool {
        match self {
            Scoring::RocAuc => true,
            Scoring::Custom(metric) => metric.needs_proba(),
            _ => false,
        }
    }

    /// Whether the rule only makes sense on class labels
    pub fn is_classification(&self) -> bool {
        matches!(
            self,
            Scoring::Accuracy | Scoring::Precision | Scoring::Recall | Scoring::F1 | Scoring::RocAuc
        )
    }

    /// Oriented score for one fold; never NaN
    pub fn score(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(SelectionError::ShapeError {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} predictions", y_pred.len()),
            });
        }
        if y_true.is_empty() {
            return Err(SelectionError::ComputationError(
                "cannot score an empty fold".to_string(),
            ));
        }

        let value = match self {
            Scoring::R2 => r2_score(y_true, y_pred),
            Scoring::NegMeanSquaredError => -mean_squared_error(y_true, y_pred),
            Scoring::NegMeanAbsoluteError => -mean_absolute_error(y_true, y_pred),
            Scoring::Accuracy => accuracy(y_true, y_pred),
            Scoring::Precision => {
                let c = BinaryCounts::from_labels(y_true, y_pred);
                ratio(c.tp, c.tp + c.fp)
            }
            Scoring::Recall => {
                let c = BinaryCounts::from_labels(y_true, y_pred);
                ratio(c.tp, c.tp + c.fn_)
            }
            Scoring::F1 => {
                let c = BinaryCounts::from_labels(y_true, y_pred);
                ratio(2.0 * c.tp, 2.0 * c.tp + c.fp + c.fn_)
            }
            Scoring::RocAuc => roc_auc(y_true, y_pred)?,
            Scoring::Custom(metric) => {
                let raw = metric.compute(y_true, y_pred)?;
                if metric.greater_is_better() {
                    raw
                } else {
                    -raw
                }
            }
        };

        if !value.is_finite() {
            return Err(SelectionError::ComputationError(format!(
                "{} produced a non-finite score",
                self.name()
            )));
        }
        Ok(value)
    }

    /// Predict with a fitted estimator in the form this rule consumes, then score
    pub fn score_estimator(
        &self,
        estimator: &dyn Estimator,
        x: &Array2<f64>,
        y_true: &Array1<f64>,
    ) -> Result<f64> {
        let y_pred = if self.needs_proba() {
            estimator.predict_proba(x)?
        } else {
            estimator.predict(x)?
        };
        self.score(y_true, &y_pred)
    }
}

/// R² with the convention that a constant target scores 1 when predicted exactly and 0 otherwise
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|&y| (y - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(&t, &p)| (t - p).powi(2))
        .sum();
    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

pub fn mean_squared_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(|d| d * d).mean().unwrap_or(0.0)
}

pub fn mean_absolute_error(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    (y_true - y_pred).mapv(f64::abs).mean().unwrap_or(0.0)
}

pub fn accuracy(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(&t, &p)| (t - p).abs() < 0.5)
        .count();
    correct as f64 / y_true.len() as f64
}

fn ratio(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

struct BinaryCounts {
    tp: f64,
    fp: f64,
    fn_: f64,
}

impl BinaryCounts {
    fn from_labels(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut counts = Self {
            tp: 0.0,
            fp: 0.0,
            fn_: 0.0,
        };
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t >= 0.5, p >= 0.5) {
                (true, true) => counts.tp += 1.0,
                (false, true) => counts.fp += 1.0,
                (true, false) => counts.fn_ += 1.0,
                (false, false) => {}
            }
        }
        counts
    }
}

/// ROC AUC through the Mann-Whitney rank statistic, averaging tied ranks
pub fn roc_auc(y_true: &Array1<f64>, y_score: &Array1<f64>) -> Result<f64> {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&t| t >= 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(SelectionError::ComputationError(
            "ROC AUC is undefined when only one class is present".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        y_score[a]
            .partial_cmp(&y_score[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && y_score[order[j + 1]] == y_score[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&k| y_true[k] >= 0.5).map(|k| ranks[k]).sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    Ok(u / (n_pos * n_neg) as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[derive(Debug)]
    struct MaxError;

    impl Metric for MaxError {
        fn name(&self) -> &str {
            "max_error"
        }

        fn compute(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
            Ok((y_true - y_pred).mapv(f64::abs).fold(0.0, |a, &b| a.max(b)))
        }

        fn greater_is_better(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_regression_scores_are_oriented() {
        let y = array![1.0, 2.0, 3.0];
        let perfect = Scoring::NegMeanSquaredError.score(&y, &y).unwrap();
        let off = Scoring::NegMeanSquaredError
            .score(&y, &array![2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(perfect, 0.0);
        assert!(perfect > off);
        assert!((Scoring::R2.score(&y, &y).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_custom_lower_is_better_is_negated() {
        let scoring = Scoring::Custom(Arc::new(MaxError));
        let score = scoring.score(&array![1.0, 2.0], &array![1.5, 4.0]).unwrap();
        assert_eq!(score, -2.0);
        assert_eq!(scoring.name(), "max_error");
    }

    #[test]
    fn test_classification_counts() {
        let y_true = array![1.0, 1.0, 0.0, 0.0];
        let y_pred = array![1.0, 0.0, 1.0, 0.0];
        assert_eq!(Scoring::Accuracy.score(&y_true, &y_pred).unwrap(), 0.5);
        assert_eq!(Scoring::Precision.score(&y_true, &y_pred).unwrap(), 0.5);
        assert_eq!(Scoring::Recall.score(&y_true, &y_pred).unwrap(), 0.5);
        assert_eq!(Scoring::F1.score(&y_true, &y_pred).unwrap(), 0.5);
    }

    #[test]
    fn test_roc_auc() {
        let y = array![0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &array![0.1, 0.4, 0.35, 0.8]).unwrap(), 0.75);
        assert_eq!(roc_auc(&y, &array![0.5, 0.5, 0.5, 0.5]).unwrap(), 0.5);
        assert!(roc_auc(&array![1.0, 1.0], &array![0.2, 0.3]).is_err());
    }

    #[test]
    fn test_default_scoring_per_task() {
        assert!(matches!(Scoring::default_for(TaskType::Regression), Scoring::R2));
        assert!(Scoring::default_for(TaskType::Classification).needs_proba());
    }
}
