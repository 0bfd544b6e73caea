//! Selection method and decision-policy configuration

use crate::data::ColumnType;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Decision threshold compared against per-feature importances
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Threshold {
    /// Fixed value
    Value(f64),
    /// Standard deviation of the baseline fold scores
    Auto,
    /// Mean of the viable features' importances
    Mean,
}

/// Order used to break ties between equal importances or net scores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TieBreak {
    /// Earlier dataset column wins
    #[default]
    ColumnOrder,
    /// Later dataset column wins
    ReverseColumnOrder,
    /// Lexicographically smaller name wins
    Alphabetical,
}

impl TieBreak {
    /// `Less` when `a` should come before `b`; each item is `(name, column position)`
    pub fn compare(&self, a: (&str, usize), b: (&str, usize)) -> Ordering {
        match self {
            TieBreak::ColumnOrder => a.1.cmp(&b.1),
            TieBreak::ReverseColumnOrder => b.1.cmp(&a.1),
            TieBreak::Alphabetical => a.0.cmp(b.0).then(a.1.cmp(&b.1)),
        }
    }
}

/// How recursive addition orders the candidate features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AdditionRanking {
    /// Native importances of the full-set baseline model, descending
    #[default]
    NativeImportance,
    /// Cross-validated score of each feature on its own, descending
    SingleFeature,
}

/// Distribution of the synthetic probe columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeDistribution {
    /// Normal with mean 0 and standard deviation 3
    #[default]
    Normal,
    /// Uniform on [0, 1)
    Uniform,
    /// 0 or 1 with equal probability
    Binary,
    /// Poisson counts with lambda 3
    Discrete,
    /// Permuted copy of a real feature
    Shuffled,
    /// Cycle through every distribution above
    All,
}

impl ProbeDistribution {
    pub(crate) const CYCLE: [ProbeDistribution; 5] = [
        ProbeDistribution::Normal,
        ProbeDistribution::Uniform,
        ProbeDistribution::Binary,
        ProbeDistribution::Discrete,
        ProbeDistribution::Shuffled,
    ];

    /// Column name prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            ProbeDistribution::Normal => "gaussian",
            ProbeDistribution::Uniform => "uniform",
            ProbeDistribution::Binary => "binary",
            ProbeDistribution::Discrete => "discrete",
            ProbeDistribution::Shuffled => "shuffled",
            ProbeDistribution::All => "all",
        }
    }
}

/// How probe importances collapse into one threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProbeAggregate {
    #[default]
    Mean,
    Max,
}

/// Discretisation used by target-mean selection for numerical features
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BinningStrategy {
    #[default]
    EqualWidth,
    EqualFrequency,
    /// Widths grow geometrically from the minimum
    IncreasingWidth,
}

/// MRMR relevance and redundancy statistic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RelevanceMethod {
    /// F-statistic for relevance, mean absolute Pearson correlation for redundancy
    #[default]
    FStatistic,
    /// Binned mutual information for both
    MutualInformation,
}

/// How MRMR combines relevance and redundancy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MrmrScheme {
    /// relevance - redundancy
    #[default]
    Difference,
    /// relevance / redundancy
    Quotient,
}

/// Feature selection strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionMethod {
    /// Drop features, least important first, while performance holds up
    RecursiveElimination,
    /// Add features, most important first, while performance improves
    RecursiveAddition {
        ranking: AdditionRanking,
        /// Consecutive rejections after which the search stops
        patience: Option<usize>,
    },
    /// Cross-validate every feature on its own
    SingleFeaturePerformance,
    /// Permutation importance on held-out folds
    Shuffling,
    /// Score per-category or per-bin target means without a model
    TargetMeanPerformance {
        bins: usize,
        strategy: BinningStrategy,
    },
    /// Compare every feature against synthetic noise columns
    ProbeFeature {
        n_probes: usize,
        distribution: ProbeDistribution,
        /// Use native importances of one model on all features and probes
        /// instead of single-feature performance
        collective: bool,
        aggregate: ProbeAggregate,
        margin: f64,
    },
    /// Minimum redundancy, maximum relevance ranking
    Mrmr {
        relevance: RelevanceMethod,
        scheme: MrmrScheme,
        /// Defaults to 20% of the candidates, at least one
        max_features: Option<usize>,
    },
}

impl SelectionMethod {
    pub fn name(&self) -> &'static str {
        match self {
            SelectionMethod::RecursiveElimination => "recursive_elimination",
            SelectionMethod::RecursiveAddition { .. } => "recursive_addition",
            SelectionMethod::SingleFeaturePerformance => "single_feature_performance",
            SelectionMethod::Shuffling => "shuffling",
            SelectionMethod::TargetMeanPerformance { .. } => "target_mean_performance",
            SelectionMethod::ProbeFeature { .. } => "probe_feature",
            SelectionMethod::Mrmr { .. } => "mrmr",
        }
    }

    /// Threshold used when none is configured; `None` for methods that derive their own
    pub fn default_threshold(&self) -> Option<Threshold> {
        match self {
            SelectionMethod::RecursiveElimination | SelectionMethod::RecursiveAddition { .. } => {
                Some(Threshold::Value(0.01))
            }
            SelectionMethod::SingleFeaturePerformance
            | SelectionMethod::Shuffling
            | SelectionMethod::TargetMeanPerformance { .. } => Some(Threshold::Mean),
            SelectionMethod::ProbeFeature { .. } | SelectionMethod::Mrmr { .. } => None,
        }
    }

    /// Whether the method accepts this threshold policy
    pub fn accepts_threshold(&self, threshold: &Threshold) -> bool {
        match (self, threshold) {
            (SelectionMethod::ProbeFeature { .. } | SelectionMethod::Mrmr { .. }, _) => false,
            (_, Threshold::Value(v)) => v.is_finite(),
            (
                SelectionMethod::RecursiveElimination
                | SelectionMethod::RecursiveAddition { .. }
                | SelectionMethod::Shuffling,
                Threshold::Auto,
            ) => true,
            (
                SelectionMethod::SingleFeaturePerformance
                | SelectionMethod::Shuffling
                | SelectionMethod::TargetMeanPerformance { .. },
                Threshold::Mean,
            ) => true,
            _ => false,
        }
    }

    /// Column kinds the method can select among
    pub fn accepted_types(&self) -> &'static [ColumnType] {
        match self {
            SelectionMethod::TargetMeanPerformance { .. } => {
                &[ColumnType::Numeric, ColumnType::Categorical]
            }
            _ => &[ColumnType::Numeric],
        }
    }

    /// Whether the method fits the configured estimator
    pub fn needs_estimator(&self) -> bool {
        !matches!(
            self,
            SelectionMethod::TargetMeanPerformance { .. } | SelectionMethod::Mrmr { .. }
        )
    }

    /// Whether the method ranks features by the estimator's native importances
    pub fn needs_native_importances(&self) -> bool {
        matches!(
            self,
            SelectionMethod::RecursiveElimination
                | SelectionMethod::RecursiveAddition {
                    ranking: AdditionRanking::NativeImportance,
                    ..
                }
                | SelectionMethod::ProbeFeature {
                    collective: true,
                    ..
                }
        )
    }

    /// Whether the method needs the cross-validated score of the full feature
    /// set under the given threshold policy
    pub fn needs_baseline(&self, threshold: Option<&Threshold>) -> bool {
        match self {
            SelectionMethod::RecursiveElimination | SelectionMethod::Shuffling => true,
            SelectionMethod::RecursiveAddition { ranking, .. } => {
                *ranking == AdditionRanking::NativeImportance
                    || matches!(threshold, Some(Threshold::Auto))
            }
            SelectionMethod::ProbeFeature { collective, .. } => *collective,
            _ => false,
        }
    }
}
