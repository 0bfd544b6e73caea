use super::{viable, SearchContext, SearchStrategy, StrategyOutcome};
use crate::error::Result;
use crate::selection::importance::{FeatureImportance, ImportanceRecord};

/// Cross-validate every candidate on its own; the importance is the solo score
#[derive(Debug, Clone, Default)]
pub struct SingleFeaturePerformance;

impl SearchStrategy for SingleFeaturePerformance {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let evaluator = ctx.evaluator()?;
        let results = ctx
            .executor
            .map(ctx.variables, |name| evaluator.evaluate(std::slice::from_ref(name)));

        let mut importances = ImportanceRecord::new();
        let mut non_viable = Vec::new();
        for (name, result) in ctx.variables.iter().zip(results) {
            match viable(result)? {
                Some(score) => importances.insert(name.clone(), FeatureImportance::from_score(&score))?,
                None => non_viable.push(name.clone()),
            }
        }

        Ok(StrategyOutcome::thresholded(importances, non_viable))
    }
}
