//! Cross-validated feature selection
//!
//! A [`FeatureSelector`] resolves its candidate features, builds one
//! [`CvPlan`] that every evaluation replays, optionally establishes a
//! baseline model on all candidates, then hands control to the configured
//! search strategy:
//!
//! - recursive elimination and recursive addition
//! - single feature performance
//! - shuffling (permutation importance)
//! - target mean performance
//! - probe features
//! - minimum redundancy maximum relevance (MRMR)

pub mod baseline;
pub mod config;
pub mod cv_plan;
pub mod evaluator;
pub mod importance;
mod selector;
pub mod stats;
pub mod strategies;

pub use baseline::{generate_probes, Baseline};
pub use config::{
    AdditionRanking, BinningStrategy, MrmrScheme, ProbeAggregate, ProbeDistribution,
    RelevanceMethod, SelectionMethod, Threshold, TieBreak,
};
pub use cv_plan::{CvPlan, CvSpec};
pub use evaluator::{Evaluator, FoldModels};
pub use importance::{
    Checkpoint, CvScore, DropReason, DroppedFeature, FeatureImportance, ImportanceEntry,
    ImportanceRecord,
};
pub use selector::{FeatureSelector, FittedSelection};
