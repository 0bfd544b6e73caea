//! Model training module
//!
//! Provides the estimator capability the selectors fit on every fold, a few
//! built-in estimators, and the cross-validation splitters:
//! - Linear models (OLS/Ridge, logistic regression)
//! - Decision trees
//! - K-Fold, stratified, grouped, time series and repeated splitters

mod models;
pub mod cross_validation;
pub mod decision_tree;
pub mod linear_models;

pub use models::{Estimator, TaskType};
pub use cross_validation::{
    CVSplit, GroupKFold, KFold, RepeatedKFold, Splitter, StratifiedKFold, TimeSeriesSplit,
};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use linear_models::{LinearRegression, LogisticRegression};
