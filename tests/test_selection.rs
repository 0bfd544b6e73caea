//! Integration test: selection strategies on scripted scores

mod common;

use common::{mean_prediction, names, scripted_dataset, CountingEstimator, ScriptedEstimator};
use kolosal_select::prelude::*;
use ndarray::Array1;
use std::sync::atomic::Ordering;

fn abc() -> Dataset {
    scripted_dataset(30, &[("A", 1), ("B", 2), ("C", 3)])
}

#[test]
fn test_single_feature_performance_with_value_threshold() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5), (&[3], 0.4)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.6));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A"]));
    assert_eq!(fitted.features_to_drop, names(&["B", "C"]));
    assert_eq!(fitted.threshold, Some(0.6));
    assert_eq!(fitted.scoring, "mean_prediction");

    let a = fitted.importances.get("A").unwrap();
    assert!((a.mean - 0.9).abs() < 1e-12);
    assert!(a.std < 1e-12);
    assert_eq!(fitted.drop_reason("B"), Some(DropReason::BelowThreshold));
    assert!(fitted.baseline.is_none());
}

#[test]
fn test_single_feature_performance_mean_threshold() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5), (&[3], 0.4)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction());
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert!((fitted.threshold.unwrap() - 0.6).abs() < 1e-12);
    assert_eq!(fitted.selected_features, names(&["A"]));
}

#[test]
fn test_non_viable_feature_is_dropped_and_reported() {
    // No score for C alone: every fold fit fails
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.6));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.non_viable, names(&["C"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::NonViable));
    assert!(fitted.importances.get("C").is_none());
    assert_eq!(fitted.selected_features, names(&["A"]));
}

#[test]
fn test_empty_selection() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5), (&[3], 0.4)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator.clone())
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.95));
    assert!(matches!(selector.fit(&abc()), Err(SelectionError::EmptySelection(_))));
    assert!(!selector.is_fitted());

    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.95))
        .with_allow_empty(true);
    selector.fit(&abc()).unwrap();
    assert!(selector.selected_features().unwrap().is_empty());
}

#[test]
fn test_recursive_elimination_checkpoints() {
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.90),
        (&[1, 2], 0.895),
        (&[1], 0.70),
        (&[2], 0.60),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)]);

    let mut selector = FeatureSelector::recursive_elimination()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.01));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.features_to_drop, names(&["C"]));
    assert_eq!(fitted.checkpoints.len(), 2);
    assert_eq!(fitted.checkpoints[1].subset, names(&["A", "B"]));

    let baseline = fitted.baseline.as_ref().unwrap();
    assert!((baseline.mean - 0.90).abs() < 1e-12);

    let drifts: Vec<f64> = ["C", "B", "A"]
        .iter()
        .map(|f| fitted.importances.get(f).unwrap().mean)
        .collect();
    assert!((drifts[0] - 0.005).abs() < 1e-9);
    assert!((drifts[1] - 0.195).abs() < 1e-9);
    assert!((drifts[2] - 0.295).abs() < 1e-9);

    let native = fitted.native_importances.as_ref().unwrap();
    assert!((native.get("A").unwrap().mean - 0.5).abs() < 1e-12);
}

#[test]
fn test_recursive_elimination_auto_threshold_uses_baseline_std() {
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.90),
        (&[1, 2], 0.90),
        (&[1], 0.70),
        (&[2], 0.60),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)]);

    let mut selector = FeatureSelector::recursive_elimination()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Auto);
    selector.fit(&abc()).unwrap();

    // Scripted folds agree, so the baseline std and the threshold are ~0
    let fitted = selector.fitted().unwrap();
    assert!(fitted.threshold.unwrap().abs() < 1e-12);
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
}

#[test]
fn test_baseline_failure_is_an_error() {
    // No score for {A, B}: the baseline cannot be fitted on any fold
    let estimator = ScriptedEstimator::new(&[(&[1, 2, 3], 0.90)]);
    let mut selector = FeatureSelector::recursive_elimination()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_variables(names(&["A", "B"]));
    let result = selector.fit(&abc());
    assert!(matches!(result, Err(SelectionError::ModelFitError { .. })));
    assert!(!selector.is_fitted());
}

#[test]
fn test_recursive_addition() {
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.855),
        (&[1], 0.70),
        (&[1, 2], 0.85),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)]);

    let mut selector = FeatureSelector::recursive_addition()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.01));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::BelowThreshold));
    assert_eq!(fitted.checkpoints.len(), 2);
    assert!((fitted.importances.get("A").unwrap().mean - 0.70).abs() < 1e-12);
    assert!((fitted.importances.get("B").unwrap().mean - 0.15).abs() < 1e-9);
}

#[test]
fn test_recursive_addition_patience() {
    let dataset = scripted_dataset(30, &[("A", 1), ("B", 2), ("C", 3), ("D", 4)]);
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3, 4], 0.90),
        (&[1], 0.70),
        (&[1, 2], 0.85),
        (&[1, 2, 3], 0.855),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1), (4, 0.05)]);

    let mut selector = FeatureSelector::new(SelectionMethod::RecursiveAddition {
        ranking: AdditionRanking::NativeImportance,
        patience: Some(1),
    })
    .with_estimator(estimator)
    .with_scoring(mean_prediction())
    .with_threshold(Threshold::Value(0.01));
    selector.fit(&dataset).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::BelowThreshold));
    assert_eq!(fitted.drop_reason("D"), Some(DropReason::NotAttempted));
    assert!(fitted.importances.get("D").is_none());
}

#[test]
fn test_recursive_addition_single_feature_ranking() {
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.855),
        (&[1], 0.40),
        (&[2], 0.80),
        (&[3], 0.10),
        (&[1, 2], 0.85),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)]);

    let mut selector = FeatureSelector::new(SelectionMethod::RecursiveAddition {
        ranking: AdditionRanking::SingleFeature,
        patience: None,
    })
    .with_estimator(estimator)
    .with_scoring(mean_prediction())
    .with_threshold(Threshold::Value(0.01));
    selector.fit(&abc()).unwrap();

    // Trial order is B (0.8), A (0.4), C (0.1)
    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.checkpoints[0].subset, names(&["B"]));
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::BelowThreshold));
}

#[test]
fn test_probe_feature_collective() {
    let estimator = ScriptedEstimator::new(&[(&[1, 2, 3], 0.9)])
        .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)])
        .with_unknown_importance(0.2);

    let mut selector = FeatureSelector::probe_feature(3, ProbeDistribution::Normal)
        .with_estimator(estimator)
        .with_scoring(mean_prediction());
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::BelowThreshold));
    assert!((fitted.threshold.unwrap() - 0.2).abs() < 1e-12);

    let probes = fitted.probe_importances.as_ref().unwrap();
    assert_eq!(
        probes.features(),
        names(&["gaussian_probe_0", "gaussian_probe_1", "gaussian_probe_2"])
    );
    // Probes never leak into the selection or the importances of real features
    assert_eq!(fitted.importances.len(), 3);
    assert_eq!(fitted.feature_names_in, names(&["A", "B", "C"]));
}

#[test]
fn test_probe_feature_rejects_threshold() {
    let estimator = ScriptedEstimator::new(&[(&[1, 2, 3], 0.9)]);
    let mut selector = FeatureSelector::probe_feature(2, ProbeDistribution::Uniform)
        .with_estimator(estimator)
        .with_threshold(Threshold::Value(0.1));
    assert!(matches!(selector.fit(&abc()), Err(SelectionError::ConfigError(_))));
}

#[test]
fn test_variables_restrict_candidates() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_variables(names(&["A", "B", "missing"]))
        .with_confirm_variables(true)
        .with_threshold(Threshold::Value(0.6));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.variables, names(&["A", "B"]));
    // C was never a candidate and passes through
    assert_eq!(fitted.selected_features, names(&["A", "C"]));
    assert_eq!(fitted.features_to_drop, names(&["B"]));
}

#[test]
fn test_unknown_variable_without_confirm() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_variables(names(&["A", "B", "missing"]));
    assert!(matches!(selector.fit(&abc()), Err(SelectionError::FeatureNotFound(_))));
}

#[test]
fn test_refit_replaces_state() {
    let estimator = ScriptedEstimator::new(&[(&[1], 0.9), (&[2], 0.5), (&[3], 0.4)]);
    let mut selector = FeatureSelector::single_feature_performance()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.6));
    selector.fit(&abc()).unwrap();
    assert!(selector.is_fitted());

    let smaller = scripted_dataset(30, &[("A", 1)]);
    assert!(selector.fit(&smaller).is_err());
    assert!(!selector.is_fitted());
}

#[test]
fn test_fit_is_idempotent() {
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.90),
        (&[1, 2], 0.895),
        (&[1], 0.70),
        (&[2], 0.60),
    ])
    .with_importances(&[(1, 0.5), (2, 0.3), (3, 0.1)]);
    let mut selector = FeatureSelector::recursive_elimination()
        .with_estimator(estimator)
        .with_scoring(mean_prediction());

    selector.fit(&abc()).unwrap();
    let first = selector.fitted().unwrap().clone();
    selector.fit(&abc()).unwrap();
    assert_eq!(&first, selector.fitted().unwrap());
    for feature in &first.selected_features {
        assert!(first.feature_names_in.contains(feature));
    }
}

#[test]
fn test_importance_driven_methods_reject_estimator_before_fitting() {
    let methods = [
        FeatureSelector::recursive_elimination(),
        FeatureSelector::recursive_addition(),
        FeatureSelector::probe_feature(2, ProbeDistribution::Normal),
    ];
    for selector in methods {
        let estimator = CountingEstimator::new(ScriptedEstimator::new(&[(&[1, 2, 3], 0.9)]));
        let fits = estimator.fits();
        let method = selector.method().name();
        let mut selector = selector.with_estimator(estimator).with_scoring(mean_prediction());

        assert!(
            matches!(selector.fit(&abc()), Err(SelectionError::ConfigError(_))),
            "{} accepted an estimator without importances",
            method
        );
        assert_eq!(fits.load(Ordering::SeqCst), 0);
    }
}

#[test]
fn test_addition_by_solo_score_needs_no_full_set_model() {
    // No score for {A, B, C} and no native importances
    let estimator = CountingEstimator::new(ScriptedEstimator::new(&[
        (&[1], 0.40),
        (&[2], 0.80),
        (&[3], 0.10),
        (&[1, 2], 0.85),
    ]));
    let mut selector = FeatureSelector::new(SelectionMethod::RecursiveAddition {
        ranking: AdditionRanking::SingleFeature,
        patience: None,
    })
    .with_estimator(estimator)
    .with_scoring(mean_prediction())
    .with_threshold(Threshold::Value(0.01));
    selector.fit(&abc()).unwrap();

    let fitted = selector.fitted().unwrap();
    assert!(fitted.baseline.is_none());
    assert!(fitted.native_importances.is_none());
    assert_eq!(fitted.checkpoints[0].subset, names(&["B"]));
    assert_eq!(fitted.selected_features, names(&["A", "B"]));
    assert_eq!(fitted.drop_reason("C"), Some(DropReason::NonViable));
}

#[test]
fn test_recursive_elimination_four_features() {
    let dataset = scripted_dataset(30, &[("A", 1), ("B", 2), ("C", 3), ("D", 4)]);
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3, 4], 0.80),
        (&[1, 2, 3], 0.79),
        (&[1, 2], 0.75),
        (&[1, 3], 0.70),
        (&[2, 3], 0.68),
    ])
    .with_importances(&[(1, 0.5), (2, 0.4), (3, 0.2), (4, 0.1)]);

    let mut selector = FeatureSelector::recursive_elimination()
        .with_estimator(estimator)
        .with_scoring(mean_prediction())
        .with_threshold(Threshold::Value(0.02));
    selector.fit(&dataset).unwrap();

    // D costs 0.01 and goes; dropping C as well would cost 0.04
    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["A", "B", "C"]));
    assert_eq!(fitted.features_to_drop, names(&["D"]));
    assert_eq!(fitted.checkpoints.len(), 2);
    assert_eq!(fitted.checkpoints[1].subset, names(&["A", "B", "C"]));
    assert!((fitted.importances.get("D").unwrap().mean - 0.01).abs() < 1e-9);
    assert!((fitted.importances.get("C").unwrap().mean - 0.04).abs() < 1e-9);
}

#[test]
fn test_tie_break_decides_elimination_order() {
    // Column order is c, a, b and every native importance is equal
    let dataset = scripted_dataset(30, &[("c", 1), ("a", 2), ("b", 3)]);
    let estimator = ScriptedEstimator::new(&[
        (&[1, 2, 3], 0.9),
        (&[2, 3], 0.9),
        (&[1, 2], 0.9),
        (&[1, 3], 0.9),
        (&[1], 0.5),
        (&[2], 0.5),
        (&[3], 0.5),
    ])
    .with_importances(&[(1, 0.1), (2, 0.1), (3, 0.1)]);

    let dropped = |tie_break: TieBreak| {
        let mut selector = FeatureSelector::recursive_elimination()
            .with_estimator(estimator.clone())
            .with_scoring(mean_prediction())
            .with_threshold(Threshold::Value(0.01))
            .with_tie_break(tie_break);
        selector.fit(&dataset).unwrap();
        selector.features_to_drop().unwrap().to_vec()
    };

    assert_eq!(dropped(TieBreak::ColumnOrder), names(&["c"]));
    assert_eq!(dropped(TieBreak::ReverseColumnOrder), names(&["b"]));
    assert_eq!(dropped(TieBreak::Alphabetical), names(&["a"]));
}

fn duplicated_signal() -> Dataset {
    let n = 40;
    let x: Vec<f64> = (0..n).map(|i| (i % 9) as f64).collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 13) % 11) as f64).collect();
    let y = Array1::from_iter((0..n).map(|i| 2.0 * x[i] + ((i * 7) % 5) as f64 / 10.0));

    let mut dataset = Dataset::new("y", y);
    dataset.add_numeric("zeta", x.clone()).unwrap();
    dataset.add_numeric("alpha", x).unwrap();
    dataset.add_numeric("noise", noise).unwrap();
    dataset
}

#[test]
fn test_mrmr_f_statistic_ranking() {
    let dataset = duplicated_signal();
    let fit = |tie_break: TieBreak| {
        let mut selector = FeatureSelector::mrmr(RelevanceMethod::FStatistic, Some(1))
            .with_tie_break(tie_break);
        selector.fit(&dataset).unwrap();
        selector.fitted().unwrap().clone()
    };

    let fitted = fit(TieBreak::ColumnOrder);
    assert_eq!(fitted.selected_features, names(&["zeta"]));
    assert_eq!(fitted.drop_reason("alpha"), Some(DropReason::Redundant));
    assert_eq!(fitted.drop_reason("noise"), Some(DropReason::Redundant));
    assert!(fitted.threshold.is_none());

    let relevance = |f: &str| fitted.importances.get(f).unwrap().mean;
    assert_eq!(relevance("zeta"), relevance("alpha"));
    assert!(relevance("zeta") > relevance("noise"));

    // Equal relevance: the tie-break picks between the duplicates
    assert_eq!(fit(TieBreak::Alphabetical).selected_features, names(&["alpha"]));
    assert_eq!(fit(TieBreak::ReverseColumnOrder).selected_features, names(&["alpha"]));
}

#[test]
fn test_mrmr_difference_stops_without_positive_net_score() {
    // copy carries exactly the information already picked with x
    let n = 32;
    let x: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let mut dataset = Dataset::new("y", Array1::from_vec(x.clone()));
    dataset.add_numeric("x", x.clone()).unwrap();
    dataset.add_numeric("copy", x).unwrap();

    let mut selector = FeatureSelector::new(SelectionMethod::Mrmr {
        relevance: RelevanceMethod::MutualInformation,
        scheme: MrmrScheme::Difference,
        max_features: Some(2),
    });
    selector.fit(&dataset).unwrap();

    let fitted = selector.fitted().unwrap();
    assert_eq!(fitted.selected_features, names(&["x"]));
    assert_eq!(fitted.drop_reason("copy"), Some(DropReason::Redundant));

    let mut quotient = FeatureSelector::new(SelectionMethod::Mrmr {
        relevance: RelevanceMethod::MutualInformation,
        scheme: MrmrScheme::Quotient,
        max_features: Some(2),
    });
    quotient.fit(&dataset).unwrap();
    assert_eq!(quotient.selected_features().unwrap(), names(&["x", "copy"]).as_slice());
}

#[test]
fn test_shuffling_auto_threshold_uses_baseline_std() {
    let n = 60;
    let a: Vec<f64> = (0..n).map(|i| (i % 13) as f64).collect();
    let noise: Vec<f64> = (0..n).map(|i| ((i * 31) % 17) as f64 / 17.0).collect();
    let y = Array1::from_iter((0..n).map(|i| 3.0 * a[i] + (((i * 7) % 11) as f64 - 5.0) / 5.0));

    let mut dataset = Dataset::new("y", y);
    dataset.add_numeric("a", a).unwrap();
    dataset.add_numeric("noise", noise).unwrap();

    let mut selector = FeatureSelector::shuffling()
        .with_estimator(LinearRegression::new())
        .with_threshold(Threshold::Auto)
        .with_random_state(5);
    selector.fit(&dataset).unwrap();

    let fitted = selector.fitted().unwrap();
    let threshold = fitted.threshold.unwrap();
    assert_eq!(threshold, fitted.baseline.as_ref().unwrap().std);
    assert!(threshold > 0.0);
    assert!(fitted.selected_features.contains(&"a".to_string()));
    for feature in fitted.importances.features() {
        let importance = fitted.importances.get(&feature).unwrap();
        assert_eq!(
            fitted.selected_features.contains(&feature),
            importance.mean > threshold,
            "{} was decided against the wrong threshold",
            feature
        );
    }
}
