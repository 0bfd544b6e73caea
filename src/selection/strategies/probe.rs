use super::{viable, SearchContext, SearchStrategy, StrategyOutcome, Verdict};
use crate::error::{Result, SelectionError};
use crate::selection::config::ProbeAggregate;
use crate::selection::importance::{DropReason, DroppedFeature, FeatureImportance, ImportanceRecord};
use tracing::{debug, warn};

/// Keep the features that beat synthetic noise.
///
/// The context dataset already carries the probe columns. In collective mode
/// importances come from the baseline model fitted on features and probes
/// together; otherwise every feature and probe is cross-validated alone.
#[derive(Debug, Clone)]
pub struct ProbeFeature {
    pub probe_names: Vec<String>,
    pub collective: bool,
    pub aggregate: ProbeAggregate,
    pub margin: f64,
}

impl ProbeFeature {
    fn collective_importances(
        &self,
        ctx: &SearchContext<'_>,
    ) -> Result<(ImportanceRecord, ImportanceRecord, Vec<String>)> {
        let native = ctx
            .baseline()?
            .require_native_importances(ctx.estimator_name())?;

        let mut real = ImportanceRecord::new();
        let mut probes = ImportanceRecord::new();
        for entry in native.entries() {
            let imp = FeatureImportance::new(entry.mean, entry.std);
            if self.probe_names.contains(&entry.feature) {
                probes.insert(entry.feature.clone(), imp)?;
            } else {
                real.insert(entry.feature.clone(), imp)?;
            }
        }
        Ok((real, probes, Vec::new()))
    }

    fn single_feature_importances(
        &self,
        ctx: &SearchContext<'_>,
    ) -> Result<(ImportanceRecord, ImportanceRecord, Vec<String>)> {
        let evaluator = ctx.evaluator()?;
        let names: Vec<String> = ctx
            .variables
            .iter()
            .chain(self.probe_names.iter())
            .cloned()
            .collect();
        let results = ctx
            .executor
            .map(&names, |name| evaluator.evaluate(std::slice::from_ref(name)));

        let mut real = ImportanceRecord::new();
        let mut probes = ImportanceRecord::new();
        let mut non_viable = Vec::new();
        for (idx, (name, result)) in names.iter().zip(results).enumerate() {
            let is_probe = idx >= ctx.variables.len();
            match viable(result)? {
                Some(score) if is_probe => probes.insert(name.clone(), FeatureImportance::from_score(&score))?,
                Some(score) => real.insert(name.clone(), FeatureImportance::from_score(&score))?,
                None if is_probe => warn!(probe = %name, "Probe could not be scored"),
                None => non_viable.push(name.clone()),
            }
        }
        Ok((real, probes, non_viable))
    }
}

impl SearchStrategy for ProbeFeature {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let (importances, probe_importances, non_viable) = if self.collective {
            self.collective_importances(ctx)?
        } else {
            self.single_feature_importances(ctx)?
        };

        let probe_means = probe_importances.means();
        let reference = match self.aggregate {
            ProbeAggregate::Mean => probe_means.mean(),
            ProbeAggregate::Max => probe_means.iter().cloned().reduce(f64::max),
        }
        .ok_or_else(|| SelectionError::ComputationError("no probe could be scored".to_string()))?;
        let threshold = reference + self.margin;
        debug!(threshold, n_probes = probe_importances.len(), "Probe threshold");

        let mut dropped = Vec::new();
        for name in ctx.variables {
            if non_viable.contains(name) {
                dropped.push(DroppedFeature::new(name.clone(), DropReason::NonViable));
            } else if importances.get(name).map_or(true, |imp| imp.mean <= threshold) {
                dropped.push(DroppedFeature::new(name.clone(), DropReason::BelowThreshold));
            }
        }

        Ok(StrategyOutcome {
            importances,
            verdict: Verdict::Decided {
                dropped,
                threshold: Some(threshold),
            },
            non_viable,
            checkpoints: Vec::new(),
            probe_importances: Some(probe_importances),
        })
    }
}
