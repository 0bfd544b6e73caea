//! Kolosal Select - cross-validated feature selection
//!
//! This crate picks feature subsets for tabular supervised learning by
//! measuring cross-validated model performance.
//!
//! # Modules
//!
//! - [`selection`] - Selection strategies, CV plans and the [`FeatureSelector`] orchestrator
//! - [`training`] - Estimators and cross-validation splitters
//! - [`metrics`] - Scoring rules, oriented so that greater is better
//! - [`data`] - Typed feature columns and the `Dataset` container
//! - [`utils`] - Parallel execution helpers
//!
//! # Example
//!
//! ```no_run
//! use kolosal_select::prelude::*;
//!
//! # fn run(dataset: &Dataset) -> kolosal_select::Result<()> {
//! let mut selector = FeatureSelector::recursive_elimination()
//!     .with_estimator(LinearRegression::new())
//!     .with_cv(CvSpec::Folds(5))
//!     .with_threshold(Threshold::Value(0.01));
//!
//! let reduced = selector.fit_transform(dataset)?;
//! println!("kept {:?}", selector.selected_features()?);
//! # let _ = reduced;
//! # Ok(())
//! # }
//! ```
//!
//! [`FeatureSelector`]: selection::FeatureSelector

// Core error handling
pub mod error;

// Data and models
pub mod data;
pub mod metrics;
pub mod training;

// Selection
pub mod selection;

// Utilities
pub mod utils;

pub use error::{Result, SelectionError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, SelectionError};

    // Data
    pub use crate::data::{Column, ColumnType, Dataset};

    // Models and cross-validation
    pub use crate::training::{
        CVSplit, DecisionTree, Estimator, GroupKFold, KFold, LinearRegression,
        LogisticRegression, RepeatedKFold, Splitter, StratifiedKFold, TaskType, TimeSeriesSplit,
    };

    // Scoring
    pub use crate::metrics::{Metric, Scoring};

    // Selection
    pub use crate::selection::{
        AdditionRanking, BinningStrategy, CvSpec, DropReason, FeatureSelector, FittedSelection,
        ImportanceRecord, MrmrScheme, ProbeAggregate, ProbeDistribution, RelevanceMethod,
        SelectionMethod, Threshold, TieBreak,
    };
}
