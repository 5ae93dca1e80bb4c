//! CART regression tree.

use super::{Regressor, check_training_data, check_width};
use crate::error::{LearningError, Result};
use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Two feature values closer than this are treated as equal when splitting.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Maximum depth; the root is at depth 0.
    pub max_depth: usize,
    /// Minimum samples a node needs before it may split.
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split.
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeParams {
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree grown greedily on squared error.
///
/// Each split sends rows with `x[feature] <= threshold` left, where the
/// threshold is the midpoint between two adjacent distinct values. Features
/// are visited in a seeded random order per node, so among equally good
/// splits the seed decides. Leaves predict the mean target of their rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    params: TreeParams,
    seed: u64,
    n_features: usize,
    nodes: Vec<Node>,
}

impl DecisionTreeRegressor {
    pub fn new(params: TreeParams) -> Self {
        Self {
            params,
            seed: 0,
            n_features: 0,
            nodes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn params(&self) -> &TreeParams {
        &self.params
    }

    /// Number of nodes, leaves included. Zero before fitting.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Depth of the deepest leaf. Zero for a single-leaf tree.
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, left).max(walk(nodes, right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Fit on the given row indices of `x`/`y`. Repeated indices count once
    /// per occurrence, which is how bootstrap samples are passed in.
    pub(crate) fn fit_rows(&mut self, x: &Array2<f64>, y: &Array1<f64>, rows: Vec<usize>) -> Result<()> {
        check_training_data(x, y)?;
        if rows.is_empty() {
            return Err(LearningError::InvalidData(
                "cannot fit a tree on zero rows".to_string(),
            ));
        }

        let mut grower = Grower {
            x,
            y,
            params: self.params,
            rng: StdRng::seed_from_u64(self.seed),
            nodes: Vec::new(),
        };
        let mut rows = rows;
        grower.grow(&mut rows, 0);

        self.n_features = x.ncols();
        self.nodes = grower.nodes;
        Ok(())
    }

    fn predict_row(&self, row: ndarray::ArrayView1<'_, f64>) -> f64 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => id = if row[feature] <= threshold { left } else { right },
            }
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.fit_rows(x, y, (0..x.nrows()).collect())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(LearningError::NotFitted);
        }
        check_width(x, self.n_features)?;
        Ok(x.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }

    fn is_fitted(&self) -> bool {
        !self.nodes.is_empty()
    }
}

struct Grower<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: TreeParams,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

impl Grower<'_> {
    /// Grow the subtree for `rows` and return its node index.
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let n = rows.len() as f64;
        let sum: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let mean = sum / n;

        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });

        let pure = rows.iter().all(|&r| (self.y[r] - mean).abs() <= f64::EPSILON * mean.abs().max(1.0));
        if depth >= self.params.max_depth
            || rows.len() < self.params.min_samples_split
            || rows.len() < 2 * self.params.min_samples_leaf
            || pure
        {
            return id;
        }

        let Some(best) = self.best_split(rows, sum) else {
            return id;
        };

        // Partition in place: left rows first.
        let mut boundary = 0;
        for i in 0..rows.len() {
            if self.x[[rows[i], best.feature]] <= best.threshold {
                rows.swap(i, boundary);
                boundary += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(boundary);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        id
    }

    /// Best split by the squared-error proxy `sum_l²/n_l + sum_r²/n_r`.
    fn best_split(&mut self, rows: &[usize], total: f64) -> Option<BestSplit> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf;
        let parent_proxy = total * total / n as f64;

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in features {
            sorted.clear();
            sorted.extend(rows.iter().map(|&r| (self.x[[r, feature]], self.y[r])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            if sorted[n - 1].0 <= sorted[0].0 + FEATURE_THRESHOLD {
                continue;
            }

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += sorted[i].1;
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf {
                    continue;
                }
                if n_right < min_leaf {
                    break;
                }
                let (lo, hi) = (sorted[i].0, sorted[i + 1].0);
                if hi <= lo + FEATURE_THRESHOLD {
                    continue;
                }

                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64;
                if proxy > best.as_ref().map_or(parent_proxy, |b| b.proxy) {
                    let mut threshold = lo / 2.0 + hi / 2.0;
                    if threshold >= hi || !threshold.is_finite() {
                        threshold = lo;
                    }
                    best = Some(BestSplit {
                        feature,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }
}
