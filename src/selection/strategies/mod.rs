//! Search strategies
//!
//! Each strategy turns the shared inputs of one fit into an importance record
//! and, unless it leaves that to the selector's threshold, a keep/drop verdict.

mod addition;
mod elimination;
mod mrmr;
mod probe;
mod shuffling;
mod single_feature;
mod target_mean;

pub use addition::RecursiveAddition;
pub use elimination::RecursiveElimination;
pub use mrmr::Mrmr;
pub use probe::ProbeFeature;
pub use shuffling::Shuffling;
pub use single_feature::SingleFeaturePerformance;
pub use target_mean::TargetMeanPerformance;

use super::baseline::Baseline;
use super::config::TieBreak;
use super::cv_plan::CvPlan;
use super::evaluator::Evaluator;
use super::importance::{Checkpoint, DroppedFeature, ImportanceRecord};
use crate::data::Dataset;
use crate::error::{Result, SelectionError};
use crate::metrics::Scoring;
use crate::training::{Estimator, TaskType};
use crate::utils::Executor;
use std::cmp::Ordering;
use tracing::warn;

/// Read-only inputs shared by every strategy during one fit
pub struct SearchContext<'a> {
    pub dataset: &'a Dataset,
    /// Candidate features, in dataset order
    pub variables: &'a [String],
    pub plan: &'a CvPlan,
    pub scoring: &'a Scoring,
    pub estimator: Option<&'a dyn Estimator>,
    pub baseline: Option<&'a Baseline>,
    pub executor: &'a Executor,
    pub task: TaskType,
    pub tie_break: TieBreak,
    pub random_state: u64,
}

impl<'a> SearchContext<'a> {
    pub fn evaluator(&self) -> Result<Evaluator<'a>> {
        let estimator = self.estimator.ok_or_else(|| {
            SelectionError::ConfigError("this selection method needs an estimator".to_string())
        })?;
        Ok(Evaluator::new(
            self.dataset,
            self.plan,
            estimator,
            self.scoring,
            self.executor,
        ))
    }

    pub fn baseline(&self) -> Result<&'a Baseline> {
        self.baseline.ok_or_else(|| {
            SelectionError::ComputationError("baseline was not established".to_string())
        })
    }

    pub fn estimator_name(&self) -> &str {
        self.estimator.map_or("<none>", |e| e.name())
    }

    fn position(&self, name: &str) -> usize {
        self.dataset.position(name).unwrap_or(usize::MAX)
    }

    /// Tie-break order between two feature names
    pub fn tie_order(&self, a: &str, b: &str) -> Ordering {
        self.tie_break
            .compare((a, self.position(a)), (b, self.position(b)))
    }

    /// Sort `(feature, score)` pairs by score, then by the tie-break order
    pub fn rank(&self, items: &mut [(String, f64)], descending: bool) {
        items.sort_by(|a, b| {
            let primary = if descending {
                b.1.partial_cmp(&a.1)
            } else {
                a.1.partial_cmp(&b.1)
            };
            primary
                .unwrap_or(Ordering::Equal)
                .then_with(|| self.tie_order(&a.0, &b.0))
        });
    }
}

/// How the selector turns an importance record into a selection
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Keep every viable feature whose importance is strictly above the configured threshold
    ApplyThreshold,
    /// Every candidate was already decided by the search
    Decided {
        dropped: Vec<DroppedFeature>,
        threshold: Option<f64>,
    },
}

/// Result of one strategy run
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub importances: ImportanceRecord,
    pub verdict: Verdict,
    /// Features whose evaluation failed
    pub non_viable: Vec<String>,
    pub checkpoints: Vec<Checkpoint>,
    pub probe_importances: Option<ImportanceRecord>,
}

impl StrategyOutcome {
    fn thresholded(importances: ImportanceRecord, non_viable: Vec<String>) -> Self {
        Self {
            importances,
            verdict: Verdict::ApplyThreshold,
            non_viable,
            checkpoints: Vec::new(),
            probe_importances: None,
        }
    }
}

/// A polymorphic search over the candidate features
pub trait SearchStrategy {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome>;
}

/// Turn a model-fit failure into `None`, logging the offending subset and fold
pub(crate) fn viable<T>(result: Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_model_fit() => {
            warn!(error = %err, "Candidate subset is not viable");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}
