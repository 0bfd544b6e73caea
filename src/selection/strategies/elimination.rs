use super::{viable, SearchContext, SearchStrategy, StrategyOutcome, Verdict};
use crate::error::Result;
use crate::selection::importance::{
    Checkpoint, DropReason, DroppedFeature, FeatureImportance, ImportanceRecord,
};
use tracing::debug;

/// Remove features least-important first, keeping a removal only while the
/// score drop from the last accepted checkpoint stays within the threshold.
///
/// A feature's importance is the score drop its removal causes.
#[derive(Debug, Clone)]
pub struct RecursiveElimination {
    pub threshold: f64,
}

impl SearchStrategy for RecursiveElimination {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let evaluator = ctx.evaluator()?;
        let baseline = ctx.baseline()?;
        let native = baseline.require_native_importances(ctx.estimator_name())?;

        let mut ranking: Vec<(String, f64)> = Vec::with_capacity(ctx.variables.len());
        for name in ctx.variables {
            if let Some(imp) = native.get(name) {
                ranking.push((name.clone(), imp.mean));
            }
        }
        ctx.rank(&mut ranking, false);

        let mut checkpoints = vec![Checkpoint::new(baseline.features.clone(), baseline.score.clone())];
        let mut importances = ImportanceRecord::new();
        let mut non_viable = Vec::new();
        let mut dropped = Vec::new();

        for (feature, _) in ranking {
            let last = match checkpoints.last() {
                Some(last) => last,
                None => break,
            };

            // The sole remaining feature stays; its contribution is the whole score
            if last.subset.len() == 1 {
                importances.insert(feature, FeatureImportance::from_score(&last.score))?;
                continue;
            }

            let candidate: Vec<String> = last
                .subset
                .iter()
                .filter(|f| **f != feature)
                .cloned()
                .collect();

            let score = match viable(evaluator.evaluate(&candidate))? {
                Some(score) => score,
                None => {
                    non_viable.push(feature);
                    continue;
                }
            };

            let drift = last.score.mean - score.mean;
            importances.insert(feature.clone(), FeatureImportance::new(drift, score.std))?;

            if drift > self.threshold {
                debug!(feature = %feature, drift, "Removal degrades performance, feature kept");
            } else {
                debug!(feature = %feature, drift, "Feature removed");
                dropped.push(DroppedFeature::new(feature, DropReason::BelowThreshold));
                checkpoints.push(Checkpoint::new(candidate, score));
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
