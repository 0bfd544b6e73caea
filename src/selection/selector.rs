//! Selection orchestrator: configuration, fit lifecycle and fitted state

use super::baseline::{generate_probes, Baseline};
use super::config::{
    AdditionRanking, BinningStrategy, MrmrScheme, ProbeAggregate, ProbeDistribution,
    RelevanceMethod, SelectionMethod, Threshold, TieBreak,
};
use super::cv_plan::{CvPlan, CvSpec};
use super::evaluator::Evaluator;
use super::importance::{Checkpoint, CvScore, DropReason, DroppedFeature, ImportanceRecord};
use super::strategies::{
    Mrmr, ProbeFeature, RecursiveAddition, RecursiveElimination, SearchContext, SearchStrategy,
    Shuffling, SingleFeaturePerformance, StrategyOutcome, TargetMeanPerformance, Verdict,
};
use crate::data::{resolve_variables, Dataset};
use crate::error::{Result, SelectionError};
use crate::metrics::Scoring;
use crate::training::{Estimator, TaskType};
use crate::utils::ParallelConfig;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_BINS: usize = 5;

/// Everything a fit freezes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedSelection {
    pub method: SelectionMethod,
    /// Name of the scoring rule
    pub scoring: String,
    /// Every feature of the fitted dataset, in order
    pub feature_names_in: Vec<String>,
    /// Candidates the method chose among
    pub variables: Vec<String>,
    /// Features kept by `transform`, in dataset order; non-candidates pass through
    pub selected_features: Vec<String>,
    pub features_to_drop: Vec<String>,
    pub importances: ImportanceRecord,
    /// Native importances of the baseline model, when one was fitted
    pub native_importances: Option<ImportanceRecord>,
    pub probe_importances: Option<ImportanceRecord>,
    pub dropped: Vec<DroppedFeature>,
    pub non_viable: Vec<String>,
    pub baseline: Option<CvScore>,
    /// Numeric threshold the decisions were made against
    pub threshold: Option<f64>,
    /// Accepted states of a recursive search, in order
    pub checkpoints: Vec<Checkpoint>,
}

impl FittedSelection {
    /// Why a feature was dropped, if it was
    pub fn drop_reason(&self, feature: &str) -> Option<DropReason> {
        self.dropped
            .iter()
            .find(|d| d.name == feature)
            .map(|d| d.reason)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Save the fitted selection to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load a fitted selection from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

/// Cross-validated feature selector
#[derive(Debug, Clone)]
pub struct FeatureSelector {
    method: SelectionMethod,
    estimator: Option<Arc<dyn Estimator>>,
    cv: CvSpec,
    groups: Option<Vec<i64>>,
    scoring: Option<Scoring>,
    threshold: Option<Threshold>,
    variables: Option<Vec<String>>,
    confirm_variables: bool,
    task: TaskType,
    n_jobs: Option<usize>,
    random_state: u64,
    tie_break: TieBreak,
    allow_empty: bool,
    fitted: Option<FittedSelection>,
}

impl FeatureSelector {
    /// Create a new feature selector with the given method
    pub fn new(method: SelectionMethod) -> Self {
        Self {
            method,
            estimator: None,
            cv: CvSpec::default(),
            groups: None,
            scoring: None,
            threshold: None,
            variables: None,
            confirm_variables: false,
            task: TaskType::Regression,
            n_jobs: None,
            random_state: 0,
            tie_break: TieBreak::default(),
            allow_empty: false,
            fitted: None,
        }
    }

    /// Recursive feature elimination
    pub fn recursive_elimination() -> Self {
        Self::new(SelectionMethod::RecursiveElimination)
    }

    /// Recursive feature addition, ranked by native importance
    pub fn recursive_addition() -> Self {
        Self::new(SelectionMethod::RecursiveAddition {
            ranking: AdditionRanking::default(),
            patience: None,
        })
    }

    pub fn single_feature_performance() -> Self {
        Self::new(SelectionMethod::SingleFeaturePerformance)
    }

    pub fn shuffling() -> Self {
        Self::new(SelectionMethod::Shuffling)
    }

    /// Target mean performance with 5 equal-width bins for numerical features
    pub fn target_mean_performance() -> Self {
        Self::new(SelectionMethod::TargetMeanPerformance {
            bins: DEFAULT_BINS,
            strategy: BinningStrategy::default(),
        })
    }

    /// Probe selection using collective native importances and the mean probe
    pub fn probe_feature(n_probes: usize, distribution: ProbeDistribution) -> Self {
        Self::new(SelectionMethod::ProbeFeature {
            n_probes,
            distribution,
            collective: true,
            aggregate: ProbeAggregate::default(),
            margin: 0.0,
        })
    }

    /// MRMR with the difference scheme
    pub fn mrmr(relevance: RelevanceMethod, max_features: Option<usize>) -> Self {
        Self::new(SelectionMethod::Mrmr {
            relevance,
            scheme: MrmrScheme::Difference,
            max_features,
        })
    }

    pub fn with_estimator<E: Estimator + 'static>(mut self, estimator: E) -> Self {
        self.estimator = Some(Arc::new(estimator));
        self
    }

    pub fn with_cv(mut self, cv: CvSpec) -> Self {
        self.cv = cv;
        self
    }

    /// Row-aligned group labels; rows sharing a label never straddle a fold
    pub fn with_groups(mut self, groups: Vec<i64>) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn with_scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = Some(scoring);
        self
    }

    pub fn with_threshold(mut self, threshold: Threshold) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn with_variables(mut self, variables: Vec<String>) -> Self {
        self.variables = Some(variables);
        self
    }

    /// Silently skip configured variables that are absent from the data
    pub fn with_confirm_variables(mut self, confirm: bool) -> Self {
        self.confirm_variables = confirm;
        self
    }

    pub fn with_task(mut self, task: TaskType) -> Self {
        self.task = task;
        self
    }

    /// Worker threads for fold and feature evaluations; 0 uses every core
    pub fn with_n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = Some(n_jobs);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Accept a fit that drops every candidate
    pub fn with_allow_empty(mut self, allow_empty: bool) -> Self {
        self.allow_empty = allow_empty;
        self
    }

    pub fn method(&self) -> &SelectionMethod {
        &self.method
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Fitted state, or `NotFitted`
    pub fn fitted(&self) -> Result<&FittedSelection> {
        self.fitted.as_ref().ok_or(SelectionError::NotFitted)
    }

    /// Selected feature names
    pub fn selected_features(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.selected_features)
    }

    pub fn features_to_drop(&self) -> Result<&[String]> {
        Ok(&self.fitted()?.features_to_drop)
    }

    pub fn importances(&self) -> Result<&ImportanceRecord> {
        Ok(&self.fitted()?.importances)
    }

    /// Restore a selector from previously frozen state
    pub fn from_fitted(fitted: FittedSelection) -> Self {
        let mut selector = Self::new(fitted.method.clone());
        selector.fitted = Some(fitted);
        selector
    }

    fn threshold_policy(&self) -> Result<Option<Threshold>> {
        match self.threshold {
            Some(threshold) if !self.method.accepts_threshold(&threshold) => {
                Err(SelectionError::ConfigError(format!(
                    "{} does not support threshold {:?}",
                    self.method.name(),
                    threshold
                )))
            }
            Some(threshold) => Ok(Some(threshold)),
            None => Ok(self.method.default_threshold()),
        }
    }

    fn validate(&self, dataset: &Dataset, scoring: &Scoring) -> Result<()> {
        if self.method.needs_estimator() && self.estimator.is_none() {
            return Err(SelectionError::ConfigError(format!(
                "{} needs an estimator",
                self.method.name()
            )));
        }
        if self.task == TaskType::Regression && scoring.is_classification() {
            return Err(SelectionError::ConfigError(format!(
                "scoring '{}' needs a classification task",
                scoring.name()
            )));
        }
        if dataset.target().iter().any(|v| !v.is_finite()) {
            return Err(SelectionError::DataError(format!(
                "target '{}' contains non-finite values",
                dataset.target_name()
            )));
        }
        if let Some(estimator) = &self.estimator {
            if self.method.needs_native_importances() && !estimator.has_feature_importances() {
                return Err(SelectionError::ConfigError(format!(
                    "{} ranks features by native importances, which {} does not expose",
                    self.method.name(),
                    estimator.name()
                )));
            }
        }
        if let SelectionMethod::ProbeFeature { margin, .. } = &self.method {
            if !margin.is_finite() {
                return Err(SelectionError::ConfigError("probe margin must be finite".to_string()));
            }
        }
        Ok(())
    }

    fn mrmr_size(&self, requested: Option<usize>, n_candidates: usize) -> Result<usize> {
        match requested {
            None => Ok(((n_candidates as f64 * 0.2) as usize).max(1)),
            Some(k) if k == 0 || k > n_candidates => Err(SelectionError::ConfigError(format!(
                "max_features must be between 1 and {}, got {}",
                n_candidates, k
            ))),
            Some(k) => Ok(k),
        }
    }

    /// Fit the selector to a dataset
    pub fn fit(&mut self, dataset: &Dataset) -> Result<&mut Self> {
        self.fitted = None;

        let scoring = self
            .scoring
            .clone()
            .unwrap_or_else(|| Scoring::default_for(self.task));
        let policy = self.threshold_policy()?;
        self.validate(dataset, &scoring)?;

        let variables = resolve_variables(
            dataset,
            self.variables.as_deref(),
            self.method.accepted_types(),
            self.confirm_variables,
        )?;
        info!(
            method = self.method.name(),
            n_rows = dataset.n_rows(),
            n_candidates = variables.len(),
            scoring = %scoring.name(),
            "Fitting feature selector"
        );

        let plan = CvPlan::build(
            &self.cv,
            dataset.n_rows(),
            dataset.target(),
            self.groups.as_deref(),
            self.task,
        )?;
        let executor = ParallelConfig { n_jobs: self.n_jobs }.executor()?;

        // Probe columns join the working dataset before anything is fitted
        let (augmented, probe_names) = match &self.method {
            SelectionMethod::ProbeFeature {
                n_probes,
                distribution,
                ..
            } => {
                let probes =
                    generate_probes(dataset, &variables, *n_probes, *distribution, self.random_state)?;
                let names: Vec<String> = probes.iter().map(|c| c.name().to_string()).collect();
                (Some(dataset.with_columns(probes)?), names)
            }
            _ => (None, Vec::new()),
        };
        let working = augmented.as_ref().unwrap_or(dataset);

        let estimator = self.estimator.as_deref();
        let baseline = match estimator {
            Some(estimator) if self.method.needs_baseline(policy.as_ref()) => {
                let evaluator = Evaluator::new(working, &plan, estimator, &scoring, &executor);
                // Probes are scored alongside the real features by one model
                let all: Vec<String> = variables.iter().chain(&probe_names).cloned().collect();
                Some(Baseline::establish(&evaluator, &all)?)
            }
            _ => None,
        };

        let numeric_threshold = |policy: Option<Threshold>| -> Result<f64> {
            match policy {
                Some(Threshold::Value(v)) => Ok(v),
                Some(Threshold::Auto) => baseline
                    .as_ref()
                    .map(|b| b.score.std)
                    .ok_or_else(|| SelectionError::ComputationError("baseline was not established".to_string())),
                other => Err(SelectionError::ConfigError(format!(
                    "{} needs a numeric threshold, got {:?}",
                    self.method.name(),
                    other
                ))),
            }
        };

        let strategy: Box<dyn SearchStrategy> = match &self.method {
            SelectionMethod::RecursiveElimination => Box::new(RecursiveElimination {
                threshold: numeric_threshold(policy)?,
            }),
            SelectionMethod::RecursiveAddition { ranking, patience } => Box::new(RecursiveAddition {
                threshold: numeric_threshold(policy)?,
                ranking: *ranking,
                patience: *patience,
            }),
            SelectionMethod::SingleFeaturePerformance => Box::new(SingleFeaturePerformance),
            SelectionMethod::Shuffling => Box::new(Shuffling),
            SelectionMethod::TargetMeanPerformance { bins, strategy } => {
                Box::new(TargetMeanPerformance {
                    bins: *bins,
                    strategy: *strategy,
                })
            }
            SelectionMethod::ProbeFeature {
                collective,
                aggregate,
                margin,
                ..
            } => Box::new(ProbeFeature {
                probe_names: probe_names.clone(),
                collective: *collective,
                aggregate: *aggregate,
                margin: *margin,
            }),
            SelectionMethod::Mrmr {
                relevance,
                scheme,
                max_features,
            } => Box::new(Mrmr {
                relevance: *relevance,
                scheme: *scheme,
                max_features: self.mrmr_size(*max_features, variables.len())?,
            }),
        };

        let ctx = SearchContext {
            dataset: working,
            variables: &variables,
            plan: &plan,
            scoring: &scoring,
            estimator,
            baseline: baseline.as_ref(),
            executor: &executor,
            task: self.task,
            tie_break: self.tie_break,
            random_state: self.random_state,
        };
        let outcome = strategy.run(&ctx)?;

        let fitted = self.finalize(dataset, variables, &scoring, policy, baseline, outcome)?;
        info!(
            n_selected = fitted.selected_features.len(),
            n_dropped = fitted.features_to_drop.len(),
            threshold = ?fitted.threshold,
            "Feature selection complete"
        );
        self.fitted = Some(fitted);
        Ok(self)
    }

    fn finalize(
        &self,
        dataset: &Dataset,
        variables: Vec<String>,
        scoring: &Scoring,
        policy: Option<Threshold>,
        baseline: Option<Baseline>,
        outcome: StrategyOutcome,
    ) -> Result<FittedSelection> {
        let StrategyOutcome {
            importances,
            verdict,
            non_viable,
            checkpoints,
            probe_importances,
        } = outcome;

        let (dropped, threshold) = match verdict {
            Verdict::Decided { dropped, threshold } => (dropped, threshold),
            Verdict::ApplyThreshold => {
                let threshold = match policy {
                    Some(Threshold::Value(v)) => Some(v),
                    Some(Threshold::Auto) => baseline.as_ref().map(|b| b.score.std),
                    Some(Threshold::Mean) | None => importances.mean_importance(),
                };
                let mut dropped = Vec::new();
                for name in &variables {
                    let reason = match (importances.get(name), threshold) {
                        (Some(imp), Some(t)) if imp.mean > t => None,
                        (Some(_), _) => Some(DropReason::BelowThreshold),
                        (None, _) => Some(DropReason::NonViable),
                    };
                    if let Some(reason) = reason {
                        debug!(feature = %name, ?reason, "Dropping feature");
                        dropped.push(DroppedFeature::new(name.clone(), reason));
                    }
                }
                (dropped, threshold)
            }
        };

        if dropped.len() >= variables.len() && !self.allow_empty {
            return Err(SelectionError::EmptySelection(format!(
                "{} dropped all {} candidate features",
                self.method.name(),
                variables.len()
            )));
        }

        let to_drop: HashSet<&str> = dropped.iter().map(|d| d.name.as_str()).collect();
        let feature_names_in = dataset.feature_names();
        let features_to_drop: Vec<String> = feature_names_in
            .iter()
            .filter(|f| to_drop.contains(f.as_str()))
            .cloned()
            .collect();
        let selected_features: Vec<String> = feature_names_in
            .iter()
            .filter(|f| !to_drop.contains(f.as_str()))
            .cloned()
            .collect();

        let (baseline_score, native_importances) = match baseline {
            Some(b) => (Some(b.score), b.native_importances),
            None => (None, None),
        };

        Ok(FittedSelection {
            method: self.method.clone(),
            scoring: scoring.name(),
            feature_names_in,
            variables,
            selected_features,
            features_to_drop,
            importances,
            native_importances,
            probe_importances,
            dropped,
            non_viable,
            baseline: baseline_score,
            threshold,
            checkpoints,
        })
    }

    /// Fit on a DataFrame whose `target` column holds the target
    pub fn fit_frame(&mut self, df: &DataFrame, target: &str) -> Result<&mut Self> {
        let dataset = Dataset::from_dataframe(df, target)?;
        self.fit(&dataset)
    }

    /// Project a dataset onto the selected features
    pub fn transform(&self, dataset: &Dataset) -> Result<Dataset> {
        let fitted = self.fitted()?;
        dataset.select(&fitted.selected_features)
    }

    /// Drop the rejected features from a DataFrame, keeping every other column
    pub fn transform_frame(&self, df: &DataFrame) -> Result<DataFrame> {
        let fitted = self.fitted()?;
        let present: HashSet<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        if let Some(missing) = fitted.selected_features.iter().find(|f| !present.contains(*f)) {
            return Err(SelectionError::FeatureNotFound(missing.clone()));
        }

        let drop: HashSet<&str> = fitted.features_to_drop.iter().map(|s| s.as_str()).collect();
        let keep: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .filter(|n| !drop.contains(n.as_str()))
            .collect();
        Ok(df.select(keep)?)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, dataset: &Dataset) -> Result<Dataset> {
        self.fit(dataset)?;
        self.transform(dataset)
    }
}
