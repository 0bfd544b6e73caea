use super::{SearchContext, SearchStrategy, StrategyOutcome, Verdict};
use crate::error::Result;
use crate::selection::config::{MrmrScheme, RelevanceMethod};
use crate::selection::importance::{DropReason, DroppedFeature, FeatureImportance, ImportanceRecord};
use crate::selection::stats::{f_classif, f_regression, mutual_information, pearson};
use crate::training::TaskType;
use ndarray::{Array2, ArrayView1};
use std::cmp::Ordering;
use tracing::debug;

/// Floor for the quotient scheme's denominator
const MIN_REDUNDANCY: f64 = 1e-12;

/// Greedy minimum-redundancy maximum-relevance ranking.
///
/// Importances are the relevance statistics. Features left unpicked are
/// reported as redundant.
#[derive(Debug, Clone)]
pub struct Mrmr {
    pub relevance: RelevanceMethod,
    pub scheme: MrmrScheme,
    pub max_features: usize,
}

impl Mrmr {
    fn relevance(&self, x: ArrayView1<f64>, y: ArrayView1<f64>, task: TaskType) -> f64 {
        match (self.relevance, task) {
            (RelevanceMethod::FStatistic, TaskType::Regression) => f_regression(x, y),
            (RelevanceMethod::FStatistic, TaskType::Classification) => f_classif(x, y),
            (RelevanceMethod::MutualInformation, task) => {
                mutual_information(x, y, task == TaskType::Classification)
            }
        }
    }

    fn association(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.relevance {
            RelevanceMethod::FStatistic => pearson(a, b).abs(),
            RelevanceMethod::MutualInformation => mutual_information(a, b, false),
        }
    }

    fn net(&self, relevance: f64, redundancy: f64) -> f64 {
        match self.scheme {
            MrmrScheme::Difference => relevance - redundancy,
            MrmrScheme::Quotient => relevance / redundancy.max(MIN_REDUNDANCY),
        }
    }
}

impl SearchStrategy for Mrmr {
    fn run(&self, ctx: &SearchContext<'_>) -> Result<StrategyOutcome> {
        let x: Array2<f64> = ctx.dataset.matrix(ctx.variables)?;
        let y = ctx.dataset.target();
        let n_features = ctx.variables.len();

        let relevance: Vec<f64> = (0..n_features)
            .map(|j| self.relevance(x.column(j), y.view(), ctx.task))
            .collect();

        let mut importances = ImportanceRecord::new();
        for (name, &rel) in ctx.variables.iter().zip(&relevance) {
            importances.insert(name.clone(), FeatureImportance::new(rel, 0.0))?;
        }

        let mut selected: Vec<usize> = Vec::new();
        let mut remaining: Vec<usize> = (0..n_features).collect();
        let mut redundancy_sum = vec![0.0; n_features];

        while selected.len() < self.max_features && !remaining.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (pos, &j) in remaining.iter().enumerate() {
                let score = if selected.is_empty() {
                    relevance[j]
                } else {
                    self.net(relevance[j], redundancy_sum[j] / selected.len() as f64)
                };
                let better = match best {
                    None => true,
                    Some((best_pos, best_score)) => match score.partial_cmp(&best_score) {
                        Some(Ordering::Greater) => true,
                        Some(Ordering::Equal) => {
                            let current = &ctx.variables[remaining[best_pos]];
                            ctx.tie_order(&ctx.variables[j], current) == Ordering::Less
                        }
                        _ => false,
                    },
                };
                if better {
                    best = Some((pos, score));
                }
            }

            let (pos, score) = match best {
                Some(best) => best,
                None => break,
            };
            if self.scheme == MrmrScheme::Difference && !selected.is_empty() && score <= 0.0 {
                debug!(score, "No remaining feature has a positive net score");
                break;
            }

            let pick = remaining.remove(pos);
            debug!(feature = %ctx.variables[pick], score, "MRMR pick");
            for &j in &remaining {
                redundancy_sum[j] += self.association(x.column(j), x.column(pick));
            }
            selected.push(pick);
        }

        let dropped = remaining
            .into_iter()
            .map(|j| DroppedFeature::new(ctx.variables[j].clone(), DropReason::Redundant))
            .collect();

        Ok(StrategyOutcome {
            importances,
            verdict: Verdict::Decided {
                dropped,
                threshold: None,
            },
            non_viable: Vec::new(),
            checkpoints: Vec::new(),
            probe_importances: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quotient_floors_redundancy() {
        let mrmr = Mrmr {
            relevance: RelevanceMethod::FStatistic,
            scheme: MrmrScheme::Quotient,
            max_features: 1,
        };
        assert!(mrmr.net(2.0, 0.0).is_finite());
        assert_eq!(mrmr.net(2.0, 0.5), 4.0);
    }
}
