//! Decision tree implementation

use super::models::{check_training_data, Estimator};
use crate::error::{Result, SelectionError};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf {
        value: f64,
        /// Share of class `1.0` among the leaf's samples (classification only)
        positive_rate: f64,
        n_samples: usize,
    },
    /// Internal node with split
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

/// Impurity criterion
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Criterion {
    /// Gini impurity (classification)
    Gini,
    /// Entropy (classification)
    Entropy,
    /// Mean squared error (regression)
    MSE,
}

/// Running sufficient statistics for one side of a split
#[derive(Debug, Clone)]
struct SideStats {
    count: usize,
    sum: f64,
    sq_sum: f64,
    class_counts: Vec<usize>,
}

impl SideStats {
    fn empty(n_classes: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sq_sum: 0.0,
            class_counts: vec![0; n_classes],
        }
    }

    fn add(&mut self, y: f64, class: Option<usize>) {
        self.count += 1;
        self.sum += y;
        self.sq_sum += y * y;
        if let Some(c) = class {
            self.class_counts[c] += 1;
        }
    }

    fn remove(&mut self, y: f64, class: Option<usize>) {
        self.count -= 1;
        self.sum -= y;
        self.sq_sum -= y * y;
        if let Some(c) = class {
            self.class_counts[c] -= 1;
        }
    }

    fn impurity(&self, criterion: Criterion) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        match criterion {
            Criterion::Gini => {
                1.0 - self
                    .class_counts
                    .iter()
                    .map(|&c| (c as f64 / n).powi(2))
                    .sum::<f64>()
            }
            Criterion::Entropy => -self
                .class_counts
                .iter()
                .filter(|&&c| c > 0)
                .map(|&c| {
                    let p = c as f64 / n;
                    p * p.ln()
                })
                .sum::<f64>(),
            Criterion::MSE => (self.sq_sum / n - (self.sum / n).powi(2)).max(0.0),
        }
    }
}

/// Decision tree model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    root: Option<TreeNode>,
    /// Maximum depth
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Impurity criterion
    pub criterion: Criterion,
    n_features: usize,
    feature_importances: Option<Array1<f64>>,
    is_classification: bool,
    classes: Vec<f64>,
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new_regressor()
    }
}

impl DecisionTree {
    /// Create a new classifier tree
    pub fn new_classifier() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            criterion: Criterion::Gini,
            n_features: 0,
            feature_importances: None,
            is_classification: true,
            classes: Vec::new(),
        }
    }

    /// Create a new regressor tree
    pub fn new_regressor() -> Self {
        Self {
            criterion: Criterion::MSE,
            is_classification: false,
            ..Self::new_classifier()
        }
    }

    /// Set maximum depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set minimum samples to split
    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    /// Set minimum samples in leaf
    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Set criterion
    pub fn with_criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Get tree depth
    pub fn depth(&self) -> usize {
        fn node_depth(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 1,
                TreeNode::Split { left, right, .. } => 1 + node_depth(left).max(node_depth(right)),
            }
        }
        self.root.as_ref().map_or(0, node_depth)
    }

    fn class_of(&self, y: f64) -> Option<usize> {
        if !self.is_classification {
            return None;
        }
        self.classes
            .binary_search_by(|c| c.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal))
            .ok()
    }

    fn stats_for(&self, y: &Array1<f64>, indices: &[usize]) -> SideStats {
        let mut stats = SideStats::empty(self.classes.len());
        for &i in indices {
            stats.add(y[i], self.class_of(y[i]));
        }
        stats
    }

    fn build_tree(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let stats = self.stats_for(y, indices);
        let parent_impurity = stats.impurity(self.criterion);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_impurity <= 1e-12;

        if !should_stop {
            if let Some((feature, threshold, gain)) = self.find_best_split(x, y, indices, &stats) {
                let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| x[[i, feature]] <= threshold);

                importances[feature] += n_samples as f64 * gain;

                let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
                let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));
                return TreeNode::Split {
                    feature_idx: feature,
                    threshold,
                    left,
                    right,
                    n_samples,
                };
            }
        }

        self.leaf(&stats)
    }

    fn leaf(&self, stats: &SideStats) -> TreeNode {
        let n = stats.count.max(1) as f64;
        let (value, positive_rate) = if self.is_classification {
            // Majority class; ties go to the smaller label
            let mut best = 0;
            for (k, &count) in stats.class_counts.iter().enumerate() {
                if count > stats.class_counts[best] {
                    best = k;
                }
            }
            let positive = self
                .classes
                .iter()
                .position(|&c| c == 1.0)
                .map_or(0.0, |k| stats.class_counts[k] as f64 / n);
            (self.classes.get(best).copied().unwrap_or(0.0), positive)
        } else {
            (stats.sum / n, 0.0)
        };
        TreeNode::Leaf {
            value,
            positive_rate,
            n_samples: stats.count,
        }
    }

    /// Best (feature, threshold, gain) over all features, scanning sorted values once
    fn find_best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        parent: &SideStats,
    ) -> Option<(usize, f64, f64)> {
        let parent_impurity = parent.impurity(self.criterion);
        let n = indices.len() as f64;
        let mut best: Option<(usize, f64, f64)> = None;

        for feature in 0..x.ncols() {
            let mut order = indices.to_vec();
            order.sort_by(|&a, &b| {
                x[[a, feature]]
                    .partial_cmp(&x[[b, feature]])
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut left = SideStats::empty(self.classes.len());
            let mut right = parent.clone();

            for pos in 0..order.len() - 1 {
                let i = order[pos];
                let class = self.class_of(y[i]);
                left.add(y[i], class);
                right.remove(y[i], class);

                let current = x[[i, feature]];
                let next = x[[order[pos + 1], feature]];
                if next <= current {
                    continue;
                }
                if left.count < self.min_samples_leaf || right.count < self.min_samples_leaf {
                    continue;
                }

                let weighted = (left.count as f64 * left.impurity(self.criterion)
                    + right.count as f64 * right.impurity(self.criterion))
                    / n;
                let gain = parent_impurity - weighted;
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((feature, (current + next) / 2.0, gain));
                }
            }
        }

        best
    }

    fn find_leaf<'a>(node: &'a TreeNode, sample: ndarray::ArrayView1<f64>) -> &'a TreeNode {
        match node {
            TreeNode::Leaf { .. } => node,
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if sample[*feature_idx] <= *threshold {
                    Self::find_leaf(left, sample)
                } else {
                    Self::find_leaf(right, sample)
                }
            }
        }
    }

    fn leaves_for(&self, x: &Array2<f64>) -> Result<Vec<&TreeNode>> {
        let root = self.root.as_ref().ok_or(SelectionError::NotFitted)?;
        if x.ncols() != self.n_features {
            return Err(SelectionError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| Self::find_leaf(root, row)).collect())
    }
}

impl Estimator for DecisionTree {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_training_data(x, y)?;
        self.n_features = x.ncols();

        if self.is_classification {
            let mut classes: Vec<f64> = y.to_vec();
            classes.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            classes.dedup();
            self.classes = classes;
        } else {
            self.classes.clear();
        }

        let mut importances = vec![0.0; self.n_features];
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_tree(x, y, &indices, 0, &mut importances));

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }
        self.feature_importances = Some(Array1::from_vec(importances));
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let leaves = self.leaves_for(x)?;
        Ok(leaves
            .into_iter()
            .map(|leaf| match leaf {
                TreeNode::Leaf { value, .. } => *value,
                TreeNode::Split { .. } => f64::NAN,
            })
            .collect())
    }

    fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_classification {
            return Err(SelectionError::ConfigError(
                "regression trees do not provide class probabilities".to_string(),
            ));
        }
        let leaves = self.leaves_for(x)?;
        Ok(leaves
            .into_iter()
            .map(|leaf| match leaf {
                TreeNode::Leaf { positive_rate, .. } => *positive_rate,
                TreeNode::Split { .. } => f64::NAN,
            })
            .collect())
    }

    fn feature_importances(&self) -> Option<Array1<f64>> {
        self.feature_importances.clone()
    }

    fn has_feature_importances(&self) -> bool {
        true
    }

    fn unfitted(&self) -> Box<dyn Estimator> {
        Box::new(Self {
            root: None,
            n_features: 0,
            feature_importances: None,
            classes: Vec::new(),
            ..self.clone()
        })
    }

    fn name(&self) -> &str {
        if self.is_classification {
            "DecisionTreeClassifier"
        } else {
            "DecisionTreeRegressor"
        }
    }
}
