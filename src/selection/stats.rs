//! Univariate statistics shared by the filter-style strategies

use super::config::BinningStrategy;
use ndarray::ArrayView1;
use std::collections::{BTreeMap, HashMap};

/// Keeps F-statistics finite when a feature explains the target exactly
const MAX_R2: f64 = 1.0 - 1e-12;

/// Pearson correlation; 0 when either side is constant
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len() as f64;
    if n < 2.0 {
        return 0.0;
    }

    let x_mean = x.mean().unwrap_or(0.0);
    let y_mean = y.mean().unwrap_or(0.0);

    let mut cov = 0.0;
    let mut x_var = 0.0;
    let mut y_var = 0.0;
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        let dx = xv - x_mean;
        let dy = yv - y_mean;
        cov += dx * dy;
        x_var += dx * dx;
        y_var += dy * dy;
    }

    if x_var <= 0.0 || y_var <= 0.0 {
        return 0.0;
    }
    (cov / (x_var.sqrt() * y_var.sqrt())).clamp(-1.0, 1.0)
}

/// Univariate linear-regression F-statistic: r² / (1 - r²) * (n - 2)
pub fn f_regression(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len();
    if n < 3 {
        return 0.0;
    }
    let r2 = pearson(x, y).powi(2).min(MAX_R2);
    r2 / (1.0 - r2) * (n - 2) as f64
}

/// One-way ANOVA F-statistic of `x` across the classes in `y`
pub fn f_classif(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    let n = x.len();
    let mut groups: BTreeMap<i64, (usize, f64)> = BTreeMap::new();
    for (&xv, &yv) in x.iter().zip(y.iter()) {
        let entry = groups.entry(yv.round() as i64).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += xv;
    }
    let k = groups.len();
    if k < 2 || n <= k {
        return 0.0;
    }

    let grand_mean = x.mean().unwrap_or(0.0);
    let ss_between: f64 = groups
        .values()
        .map(|&(count, sum)| count as f64 * (sum / count as f64 - grand_mean).powi(2))
        .sum();
    let ss_within: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xv, &yv)| {
            let (count, sum) = groups[&(yv.round() as i64)];
            (xv - sum / count as f64).powi(2)
        })
        .sum();
    let ss_total = ss_between + ss_within;
    if ss_total <= 0.0 {
        return 0.0;
    }

    // Same cap as the regression statistic, applied to the explained share
    let explained = (ss_between / ss_total).min(MAX_R2);
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    (explained / df_between) / ((1.0 - explained) / df_within)
}

/// Number of equal-width bins used for mutual information estimates
fn mi_bins(n: usize) -> usize {
    ((n as f64).sqrt() as usize).clamp(2, 20)
}

/// Equal-width bin index of every value
fn discretize(x: ArrayView1<f64>, n_bins: usize) -> Vec<usize> {
    let min_val = x.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_val = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let range = max_val - min_val;
    if range <= 0.0 {
        return vec![0; x.len()];
    }

    let bin_width = range / n_bins as f64;
    x.iter()
        .map(|&v| (((v - min_val) / bin_width) as usize).min(n_bins - 1))
        .collect()
}

fn class_codes(y: ArrayView1<f64>) -> Vec<usize> {
    let mut codes: BTreeMap<i64, usize> = BTreeMap::new();
    for &v in y.iter() {
        let next = codes.len();
        codes.entry(v.round() as i64).or_insert(next);
    }
    y.iter().map(|&v| codes[&(v.round() as i64)]).collect()
}

/// Mutual information (nats) between two binned variables.
///
/// `y_discrete` treats `y` as class labels instead of binning it.
pub fn mutual_information(x: ArrayView1<f64>, y: ArrayView1<f64>, y_discrete: bool) -> f64 {
    let n = x.len();
    if n < 2 {
        return 0.0;
    }

    let n_bins = mi_bins(n);
    let x_bins = discretize(x, n_bins);
    let y_bins = if y_discrete {
        class_codes(y)
    } else {
        discretize(y, n_bins)
    };

    let mut joint: HashMap<(usize, usize), usize> = HashMap::new();
    let mut x_counts: HashMap<usize, usize> = HashMap::new();
    let mut y_counts: HashMap<usize, usize> = HashMap::new();
    for (&xb, &yb) in x_bins.iter().zip(y_bins.iter()) {
        *joint.entry((xb, yb)).or_insert(0) += 1;
        *x_counts.entry(xb).or_insert(0) += 1;
        *y_counts.entry(yb).or_insert(0) += 1;
    }

    // Summed in key order so the result does not depend on hash order
    let mut cells: Vec<((usize, usize), usize)> = joint.into_iter().collect();
    cells.sort_unstable();

    let total = n as f64;
    let mut mi = 0.0;
    for ((xb, yb), count) in cells {
        let p_xy = count as f64 / total;
        let p_x = x_counts[&xb] as f64 / total;
        let p_y = y_counts[&yb] as f64 / total;
        mi += p_xy * (p_xy / (p_x * p_y)).ln();
    }

    mi.max(0.0)
}

/// Interior bin edges fitted on `values`; a value `v` falls in bin
/// `edges.partition_point(|&e| e < v)`
pub fn bin_edges(values: &[f64], bins: usize, strategy: BinningStrategy) -> Vec<f64> {
    if values.is_empty() || bins < 2 {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max <= min {
        return Vec::new();
    }

    let mut edges: Vec<f64> = match strategy {
        BinningStrategy::EqualWidth => {
            let width = (max - min) / bins as f64;
            (1..bins).map(|k| min + width * k as f64).collect()
        }
        BinningStrategy::EqualFrequency => {
            let mut sorted = values.to_vec();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            (1..bins)
                .map(|k| quantile(&sorted, k as f64 / bins as f64))
                .collect()
        }
        BinningStrategy::IncreasingWidth => {
            let increment = (max - min).powf(1.0 / bins as f64);
            (1..bins).map(|k| min + increment.powi(k as i32)).collect()
        }
    };

    edges.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    edges.dedup();
    edges.retain(|&e| e > min && e < max);
    edges
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
