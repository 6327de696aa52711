//! CART regression tree

use super::Regressor;
use crate::error::{AutopriceError, Result};
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Nodes at least this large search their candidate features in parallel
const PARALLEL_SPLIT_MIN: usize = 20_000;

/// Decision tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with prediction value
    Leaf { value: f64, n_samples: usize },
    /// Internal node; rows with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut node = self;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    node = if row[*feature_idx] <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}

/// Regression tree grown greedily on squared-error reduction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    root: Option<TreeNode>,
    /// Maximum depth; `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Features drawn per split; `None` considers all
    pub max_features: Option<usize>,
    pub random_state: u64,
    n_features: usize,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self::new()
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            random_state: 0,
            n_features: 0,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: usize) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    /// Fit the tree to training data
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<&mut Self> {
        if x.nrows() != y.len() {
            return Err(AutopriceError::ShapeError {
                expected: format!("y length = {}", x.nrows()),
                actual: format!("y length = {}", y.len()),
            });
        }
        if x.nrows() == 0 {
            return Err(AutopriceError::ValidationError(
                "cannot fit a tree on empty data".to_string(),
            ));
        }
        if self.min_samples_leaf == 0 || self.min_samples_split < 2 {
            return Err(AutopriceError::ConfigurationError(
                "min_samples_leaf must be >= 1 and min_samples_split >= 2".to_string(),
            ));
        }

        self.n_features = x.ncols();
        let mut rng = ChaCha8Rng::seed_from_u64(self.random_state);
        let indices: Vec<usize> = (0..x.nrows()).collect();
        self.root = Some(self.build_node(x, y, indices, 0, &mut rng));
        Ok(self)
    }

    fn build_node(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: Vec<usize>,
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let n = indices.len();
        let value = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

        let depth_allows = self.max_depth.map_or(true, |d| depth < d);
        let pure = indices.iter().all(|&i| y[i] == y[indices[0]]);
        if !depth_allows || pure || n < self.min_samples_split || n < 2 * self.min_samples_leaf {
            return TreeNode::Leaf { value, n_samples: n };
        }

        let Some(split) = self.best_split(x, y, &indices, rng) else {
            return TreeNode::Leaf { value, n_samples: n };
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[[i, split.feature_idx]] <= split.threshold);

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left: Box::new(self.build_node(x, y, left, depth + 1, rng)),
            right: Box::new(self.build_node(x, y, right, depth + 1, rng)),
            n_samples: n,
        }
    }

    fn candidate_features(&self, rng: &mut ChaCha8Rng) -> Vec<usize> {
        match self.max_features {
            Some(m) if m < self.n_features => {
                let mut features = index::sample(rng, self.n_features, m.max(1)).into_vec();
                features.sort_unstable();
                features
            }
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        indices: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Option<SplitCandidate> {
        let features = self.candidate_features(rng);
        let scan = |&f: &usize| self.scan_feature(x, y, indices, f);

        let candidates: Vec<Option<SplitCandidate>> = if indices.len() >= PARALLEL_SPLIT_MIN {
            features.par_iter().map(scan).collect()
        } else {
            features.iter().map(scan).collect()
        };

        // Strictly greater keeps the lowest feature index on ties
        candidates.into_iter().flatten().fold(None, |best, c| match best {
            Some(b) if b.gain >= c.gain => Some(b),
            _ => Some(c),
        })
    }

    /// Best threshold on one feature by a sorted sweep over prefix sums.
    fn scan_feature(&self, x: &Array2<f64>, y: &Array1<f64>, indices: &[usize], feature: usize) -> Option<SplitCandidate> {
        let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[[i, feature]], y[i])).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = pairs.len();
        let total: f64 = pairs.iter().map(|p| p.1).sum();
        let parent = total * total / n as f64;
        let min_leaf = self.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;
        let mut left_sum = 0.0;
        for i in 0..n - 1 {
            left_sum += pairs[i].1;
            let n_left = i + 1;
            let n_right = n - n_left;
            if n_left < min_leaf {
                continue;
            }
            if n_right < min_leaf {
                break;
            }

            let (here, next) = (pairs[i].0, pairs[i + 1].0);
            if here == next || next.is_nan() {
                continue;
            }

            let right_sum = total - left_sum;
            let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64 - parent;
            if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
                let mut threshold = (here + next) / 2.0;
                if threshold >= next || threshold.is_infinite() {
                    threshold = here;
                }
                best = Some(SplitCandidate {
                    feature_idx: feature,
                    threshold,
                    gain,
                });
            }
        }
        best
    }

    /// Make predictions
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let root = self.root.as_ref().ok_or(AutopriceError::ModelNotFitted)?;
        if x.ncols() != self.n_features {
            return Err(AutopriceError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }
        Ok(x.rows().into_iter().map(|row| root.predict_row(row)).collect())
    }

    /// Depth of the fitted tree (0 for a single leaf)
    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }
}

impl Regressor for DecisionTreeRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        DecisionTreeRegressor::fit(self, x, y).map(|_| ())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        DecisionTreeRegressor::predict(self, x)
    }

    fn is_fitted(&self) -> bool {
        self.root.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_step_function() {
        let x = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let y = array![5.0, 5.0, 5.0, 20.0, 20.0, 20.0];

        let mut tree = DecisionTreeRegressor::new().with_max_depth(1);
        tree.fit(&x, &y).unwrap();

        let pred = tree.predict(&array![[0.0], [6.4], [100.0]]).unwrap();
        assert_eq!(pred.to_vec(), vec![5.0, 5.0, 20.0]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_max_depth_respected() {
        let x = Array2::from_shape_fn((64, 2), |(i, j)| ((i * 7 + j * 13) % 64) as f64);
        let y: Array1<f64> = (0..64).map(|i| (i as f64).sin()).collect();

        let mut tree = DecisionTreeRegressor::new().with_max_depth(3);
        tree.fit(&x, &y).unwrap();
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_min_samples_leaf() {
        let x = array![[1.0], [2.0], [3.0], [4.0]];
        let y = array![0.0, 0.0, 0.0, 100.0];

        let mut tree = DecisionTreeRegressor::new().with_min_samples_leaf(2);
        tree.fit(&x, &y).unwrap();
        // The outlier cannot be isolated in its own leaf
        let pred = tree.predict(&array![[4.0]]).unwrap();
        assert_eq!(pred[0], 50.0);
    }

    #[test]
    fn test_unfitted_and_shape_errors() {
        let tree = DecisionTreeRegressor::new();
        assert!(matches!(tree.predict(&array![[1.0]]), Err(AutopriceError::ModelNotFitted)));

        let mut tree = DecisionTreeRegressor::new();
        tree.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]).unwrap();
        assert!(tree.predict(&array![[1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_feature_subsampling_is_seeded() {
        let x = Array2::from_shape_fn((50, 4), |(i, j)| ((i * (j + 3)) % 17) as f64);
        let y: Array1<f64> = (0..50).map(|i| (i % 5) as f64).collect();

        let mut a = DecisionTreeRegressor::new().with_max_features(2).with_random_state(7);
        let mut b = DecisionTreeRegressor::new().with_max_features(2).with_random_state(7);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }
}
