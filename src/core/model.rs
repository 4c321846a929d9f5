use crate::core::error::ForecastError;
use crate::core::features::{TrainingExample, FEATURE_LEN};

/// Number of trees in the default ensemble.
pub const DEFAULT_TREES: usize = 100;

const MAX_DEPTH: usize = 10;
const MIN_SPLIT: usize = 2;

/// Capability contract for the forecasting model: fit on sliding-window
/// examples, then produce a *distribution* of predictions per query so
/// the engine can derive percentile intervals. Any implementation
/// satisfying this works; the bagged tree ensemble below is the
/// reference one.
pub trait Regressor {
    fn fit(&mut self, examples: &[TrainingExample]) -> Result<(), ForecastError>;

    /// Produce exactly `sample_count` predictions for one feature
    /// vector by querying the ensemble's constituent estimators.
    fn predict_ensemble(&self, features: &[f64; FEATURE_LEN], sample_count: usize) -> Vec<f64>;
}

// ── Feature scaling ───────────────────────────────────────────────────

/// Standardizes features with mean/std computed from the training set
/// only. A zero-variance feature keeps scale 1 so it passes through
/// unchanged instead of dividing by zero.
#[derive(Debug, Clone)]
struct FeatureScaler {
    mean: [f64; FEATURE_LEN],
    scale: [f64; FEATURE_LEN],
}

impl FeatureScaler {
    fn fit(examples: &[TrainingExample]) -> Self {
        let n = examples.len() as f64;
        let mut mean = [0.0; FEATURE_LEN];
        for ex in examples {
            for (m, v) in mean.iter_mut().zip(ex.features.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut scale = [0.0; FEATURE_LEN];
        for ex in examples {
            for f in 0..FEATURE_LEN {
                scale[f] += (ex.features[f] - mean[f]).powi(2);
            }
        }
        for s in &mut scale {
            *s = (*s / n).sqrt();
            if *s == 0.0 {
                *s = 1.0;
            }
        }

        Self { mean, scale }
    }

    fn transform(&self, features: &[f64; FEATURE_LEN]) -> [f64; FEATURE_LEN] {
        let mut out = [0.0; FEATURE_LEN];
        for f in 0..FEATURE_LEN {
            out[f] = (features[f] - self.mean[f]) / self.scale[f];
        }
        out
    }
}

// ── Regression tree ───────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    root: TreeNode,
}

impl RegressionTree {
    fn fit(xs: &[[f64; FEATURE_LEN]], ys: &[f64], indices: Vec<usize>) -> Self {
        Self {
            root: build_node(xs, ys, indices, 0),
        }
    }

    fn predict(&self, x: &[f64; FEATURE_LEN]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf(value) => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if x[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

fn node_mean(ys: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| ys[i]).sum::<f64>() / indices.len() as f64
}

fn node_sse(ys: &[f64], indices: &[usize]) -> f64 {
    let m = node_mean(ys, indices);
    indices.iter().map(|&i| (ys[i] - m).powi(2)).sum()
}

fn build_node(xs: &[[f64; FEATURE_LEN]], ys: &[f64], indices: Vec<usize>, depth: usize) -> TreeNode {
    let parent_sse = node_sse(ys, &indices);
    if depth >= MAX_DEPTH || indices.len() < MIN_SPLIT || parent_sse == 0.0 {
        return TreeNode::Leaf(node_mean(ys, &indices));
    }

    match best_split(xs, ys, &indices, parent_sse) {
        Some((feature, threshold, left_idx, right_idx)) => TreeNode::Split {
            feature,
            threshold,
            left: Box::new(build_node(xs, ys, left_idx, depth + 1)),
            right: Box::new(build_node(xs, ys, right_idx, depth + 1)),
        },
        None => TreeNode::Leaf(node_mean(ys, &indices)),
    }
}

/// Exhaustive split search minimizing the summed squared error of the
/// two children. Candidate thresholds are midpoints between consecutive
/// distinct feature values; ties keep the first candidate found, which
/// keeps tree construction deterministic.
fn best_split(
    xs: &[[f64; FEATURE_LEN]],
    ys: &[f64],
    indices: &[usize],
    parent_sse: f64,
) -> Option<(usize, f64, Vec<usize>, Vec<usize>)> {
    let mut best: Option<(f64, usize, f64)> = None;

    for feature in 0..FEATURE_LEN {
        let mut ordered: Vec<usize> = indices.to_vec();
        ordered.sort_by(|&a, &b| {
            xs[a][feature]
                .partial_cmp(&xs[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        for cut in 1..ordered.len() {
            let lo = xs[ordered[cut - 1]][feature];
            let hi = xs[ordered[cut]][feature];
            if lo == hi {
                continue;
            }
            let threshold = (lo + hi) / 2.0;
            let left: Vec<usize> = ordered[..cut].to_vec();
            let right: Vec<usize> = ordered[cut..].to_vec();
            let sse = node_sse(ys, &left) + node_sse(ys, &right);
            if best.map_or(sse < parent_sse, |(b, _, _)| sse < b) {
                best = Some((sse, feature, threshold));
            }
        }
    }

    let (_, feature, threshold) = best?;
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| xs[i][feature] <= threshold);
    Some((feature, threshold, left, right))
}

// ── Bagged ensemble ───────────────────────────────────────────────────

/// Bootstrap-aggregated regression trees. Each tree is fit on a
/// resample drawn from a seeded RNG, so a fixed seed makes the whole
/// model, and every forecast derived from it, reproducible.
#[derive(Debug)]
pub struct BaggedTreeModel {
    seed: u64,
    n_trees: usize,
    scaler: Option<FeatureScaler>,
    trees: Vec<RegressionTree>,
}

impl BaggedTreeModel {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            n_trees: DEFAULT_TREES,
            scaler: None,
            trees: Vec::new(),
        }
    }

    #[cfg(test)]
    fn with_trees(seed: u64, n_trees: usize) -> Self {
        Self {
            n_trees,
            ..Self::new(seed)
        }
    }
}

impl Regressor for BaggedTreeModel {
    fn fit(&mut self, examples: &[TrainingExample]) -> Result<(), ForecastError> {
        if examples.is_empty() {
            return Err(ForecastError::ModelFit("empty training set".to_string()));
        }
        for ex in examples {
            if !ex.target.is_finite() || ex.features.iter().any(|f| !f.is_finite()) {
                return Err(ForecastError::ModelFit(
                    "non-finite value in training data".to_string(),
                ));
            }
        }

        let scaler = FeatureScaler::fit(examples);
        let xs: Vec<[f64; FEATURE_LEN]> =
            examples.iter().map(|ex| scaler.transform(&ex.features)).collect();
        let ys: Vec<f64> = examples.iter().map(|ex| ex.target).collect();

        let mut rng = fastrand::Rng::with_seed(self.seed);
        let n = examples.len();
        self.trees = (0..self.n_trees)
            .map(|_| {
                let sample: Vec<usize> = (0..n).map(|_| rng.usize(0..n)).collect();
                RegressionTree::fit(&xs, &ys, sample)
            })
            .collect();
        self.scaler = Some(scaler);
        Ok(())
    }

    fn predict_ensemble(&self, features: &[f64; FEATURE_LEN], sample_count: usize) -> Vec<f64> {
        let Some(scaler) = &self.scaler else {
            return Vec::new();
        };
        if self.trees.is_empty() {
            return Vec::new();
        }
        let scaled = scaler.transform(features);
        // Round-robin over the constituent trees keeps the draw
        // deterministic for any sample count.
        (0..sample_count)
            .map(|i| self.trees[i % self.trees.len()].predict(&scaled))
            .collect()
    }
}
