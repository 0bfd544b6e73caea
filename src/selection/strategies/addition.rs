use super::{viable, SearchContext, SearchStrategy, StrategyOutcome, Verdict};
use crate::error::Result;
use crate::selection::config::AdditionRanking;
use crate::selection::importance::{
    Checkpoint, CvScore, DropReason, DroppedFeature, FeatureImportance, ImportanceRecord,
};
use std::collections::HashMap;
use tracing::debug;

/// Add features most-important first, keeping an addition only when it
/// improves on the last accepted checkpoint by more than the threshold.
///
/// Rejected features are never retried. The first viable feature seeds the
/// search and its importance is its own score; every later feature's
/// importance is the gain its addition brings.
#[derive(Debug, Clone)]
pub struct RecursiveAddition {
    pub threshold: f64,
    pub ranking: AdditionRanking,
    pub patience: Option<usize>,
}

impl RecursiveAddition {
    /// Candidates in trial order plus any solo scores computed while ranking
    fn ranking(&self, ctx: &SearchContext<'_>) -> Result<(Vec<String>, HashMap<String, Option<CvScore>>)> {
        let mut solo = HashMap::new();
        let mut ranked: Vec<(String, f64)> = Vec::with_capacity(ctx.variables.len());

        match self.ranking {
            AdditionRanking::NativeImportance => {
                let native = ctx.baseline()?.require_native_importances(ctx.estimator_name())?;
                for name in ctx.variables {
                    if let Some(imp) = native.get(name) {
                        ranked.push((name.clone(), imp.mean));
                    }
                }
                ctx.rank(&mut ranked, true);
                Ok((ranked.into_iter().map(|(n, _)| n).collect(), solo))
            }
            AdditionRanking::SingleFeature => {
                let evaluator = ctx.evaluator()?;
                let results = ctx
                    .executor
                    .map(ctx.variables, |name| evaluator.evaluate(std::slice::from_ref(name)));

                let mut failed = Vec::new();
                for (name, result) in ctx.variables.iter().zip(results) {
                    match viable(result)? {
                        Some(score) => {
                            ranked.push((name.clone(), score.mean));
                            solo.insert(name.clone(), Some(score));
                        }
                        None => {
                            solo.insert(name.clone(), None);
                            failed.push(name.clone());
                        }
                    }
                }
                ctx.rank(&mut ranked, true);
                let order = ranked.into_iter().map(|(n, _)| n).chain(failed).collect();
                Ok((order, solo))
            }
        }
    }
}

impl SearchStrategy for RecursiveAddition {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let evaluator = ctx.evaluator()?;
        let (order, mut solo) = self.ranking(ctx)?;

        let mut checkpoints: Vec<Checkpoint> = Vec::new();
        let mut importances = ImportanceRecord::new();
        let mut non_viable = Vec::new();
        let mut dropped = Vec::new();
        let mut rejections = 0usize;

        for feature in order {
            if self.patience.map_or(false, |p| rejections >= p) {
                dropped.push(DroppedFeature::new(feature, DropReason::NotAttempted));
                continue;
            }

            if checkpoints.is_empty() {
                // Seed with the first feature that can be fitted on its own
                let score = match solo.remove(&feature) {
                    Some(cached) => cached,
                    None => viable(evaluator.evaluate(std::slice::from_ref(&feature)))?,
                };
                match score {
                    Some(score) => {
                        debug!(feature = %feature, score = score.mean, "Seeded addition");
                        importances.insert(feature.clone(), FeatureImportance::from_score(&score))?;
                        checkpoints.push(Checkpoint::new(vec![feature], score));
                    }
                    None => {
                        dropped.push(DroppedFeature::new(feature.clone(), DropReason::NonViable));
                        non_viable.push(feature);
                    }
                }
                continue;
            }
            let last = &checkpoints[checkpoints.len() - 1];

            let mut candidate = last.subset.clone();
            candidate.push(feature.clone());

            let score = match viable(evaluator.evaluate(&candidate))? {
                Some(score) => score,
                None => {
                    dropped.push(DroppedFeature::new(feature.clone(), DropReason::NonViable));
                    non_viable.push(feature);
                    rejections += 1;
                    continue;
                }
            };

            let gain = score.mean - last.score.mean;
            importances.insert(feature.clone(), FeatureImportance::new(gain, score.std))?;

            if gain > self.threshold {
                debug!(feature = %feature, gain, "Feature added");
                checkpoints.push(Checkpoint::new(candidate, score));
                rejections = 0;
            } else {
                debug!(feature = %feature, gain, "Addition does not improve performance");
                dropped.push(DroppedFeature::new(feature, DropReason::BelowThreshold));
                rejections += 1;
            }
        }

        Ok(StrategyOutcome {
            importances,
            verdict: Verdict::Decided {
                dropped,
                threshold: Some(self.threshold),
            },
            non_viable,
            checkpoints,
            probe_importances: None,
        })
    }
}
