//! Bagged regression-tree ensemble
//!
//! CART trees grown on bootstrap samples with an exhaustive best split over
//! every feature (squared-error criterion). Trees are independent, so they
//! are fitted in parallel; each tree draws from its own generator seeded
//! from the forest seed, which keeps the result independent of scheduling.

use crate::config::ForestConfig;
use crate::error::{ForecastError, Result};
use crate::models::{FittedRegressor, Regressor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Node of a fitted regression tree
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Best split found for a node
#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    /// Summed squared error of the two children
    sse: f64,
}

/// A single fitted regression tree
#[derive(Debug, Clone)]
pub struct RegressionTree {
    root: TreeNode,
    /// Total squared-error reduction attributed to each feature
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `sample` (duplicates allowed)
    fn fit(x: &[Vec<f64>], y: &[f64], sample: Vec<usize>, config: &ForestConfig) -> Self {
        let n_features = x.first().map_or(0, Vec::len);
        let mut builder = TreeBuilder {
            x,
            y,
            config,
            impurity_decrease: vec![0.0; n_features],
        };
        let root = builder.build(sample, 0);

        Self {
            root,
            impurity_decrease: builder.impurity_decrease,
        }
    }

    pub fn predict(&self, features: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }

    /// Depth of the deepest leaf (a lone root leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a ForestConfig,
    impurity_decrease: Vec<f64>,
}

impl TreeBuilder<'_> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n = indices.len();
        let (sum, sum_sq) = indices.iter().fold((0.0, 0.0), |(s, sq), &i| {
            (s + self.y[i], sq + self.y[i] * self.y[i])
        });
        let mean = sum / n as f64;
        let node_sse: f64 = indices.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        if depth >= self.config.max_depth
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
            || node_sse <= f64::EPSILON
        {
            return TreeNode::Leaf { value: mean };
        }

        let Some(split) = self.best_split(&indices, sum, sum_sq) else {
            return TreeNode::Leaf { value: mean };
        };

        self.impurity_decrease[split.feature] += node_sse - split.sse;

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left, depth + 1)),
            right: Box::new(self.build(right, depth + 1)),
        }
    }

    fn best_split(&self, indices: &[usize], sum: f64, sum_sq: f64) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.config.min_samples_leaf;
        let n_features = self.x[indices[0]].len();
        let mut best: Option<SplitCandidate> = None;
        let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in 0..n_features {
            sorted.clear();
            sorted.extend(indices.iter().map(|&i| (self.x[i][feature], self.y[i])));
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for k in 0..n - 1 {
                let (value, target) = sorted[k];
                left_sum += target;
                left_sq += target * target;

                let next_value = sorted[k + 1].0;
                if value >= next_value {
                    continue;
                }
                let left_n = k + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = sum - left_sum;
                let right_sq = sum_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);

                if best.map_or(true, |b| sse < b.sse) {
                    let mut threshold = value + (next_value - value) / 2.0;
                    if threshold >= next_value {
                        threshold = value;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        sse,
                    });
                }
            }
        }

        best
    }
}

/// Random forest regressor settings
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    name: String,
    config: ForestConfig,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: format!(
                "Random Forest (trees={}, max_depth={})",
                config.n_estimators, config.max_depth
            ),
            config,
        })
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        let config = ForestConfig::default();
        Self {
            name: format!(
                "Random Forest (trees={}, max_depth={})",
                config.n_estimators, config.max_depth
            ),
            config,
        }
    }
}

/// Fitted forest; predictions are the mean over trees
#[derive(Debug, Clone)]
pub struct FittedForest {
    name: String,
    n_features: usize,
    trees: Vec<RegressionTree>,
    importances: Vec<f64>,
}

impl FittedForest {
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Regressor for RandomForestRegressor {
    type Fitted = FittedForest;

    fn fit(&self, features: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        if features.is_empty() {
            return Err(ForecastError::NoTrainableData(
                "cannot fit a forest on zero rows".to_string(),
            ));
        }
        if features.len() != targets.len() {
            return Err(ForecastError::ModelError(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }
        let n_features = features[0].len();
        if n_features == 0 || features.iter().any(|row| row.len() != n_features) {
            return Err(ForecastError::ModelError(
                "feature rows must share a non-zero width".to_string(),
            ));
        }
        if features.iter().flatten().chain(targets).any(|v| !v.is_finite()) {
            return Err(ForecastError::ModelError(
                "training data contains non-finite values".to_string(),
            ));
        }

        let n = features.len();
        let config = &self.config;
        let trees: Vec<RegressionTree> = (0..config.n_estimators)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(t as u64));
                let sample: Vec<usize> = if config.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(features, targets, sample, config)
            })
            .collect();

        let importances = average_importances(&trees, n_features);

        Ok(FittedForest {
            name: self.name.clone(),
            n_features,
            trees,
            importances,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Per-tree normalised impurity decrease, averaged and renormalised
fn average_importances(trees: &[RegressionTree], n_features: usize) -> Vec<f64> {
    let mut totals = vec![0.0; n_features];
    for tree in trees {
        let tree_total: f64 = tree.impurity_decrease.iter().sum();
        if tree_total <= 0.0 {
            continue;
        }
        for (acc, &dec) in totals.iter_mut().zip(&tree.impurity_decrease) {
            *acc += dec / tree_total;
        }
    }

    let grand_total: f64 = totals.iter().sum();
    if grand_total > 0.0 {
        totals.iter_mut().for_each(|v| *v /= grand_total);
    }
    totals
}

impl FittedRegressor for FittedForest {
    fn predict_one(&self, features: &[f64]) -> Result<f64> {
        if features.len() != self.n_features {
            return Err(ForecastError::ModelError(format!(
                "expected {} features, got {}",
                self.n_features,
                features.len()
            )));
        }
        if features.iter().any(|v| v.is_nan()) {
            return Err(ForecastError::ModelError(
                "prediction input contains NaN".to_string(),
            ));
        }

        let total: f64 = self.trees.iter().map(|tree| tree.predict(features)).sum();
        Ok(total / self.trees.len() as f64)
    }

    fn feature_importances(&self) -> Option<Vec<f64>> {
        Some(self.importances.clone())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..40).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..40).map(|i| if i < 20 { 10.0 } else { 50.0 }).collect();
        (x, y)
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_estimators: 10,
            ..ForestConfig::default()
        }
    }

    #[test]
    fn test_single_tree_learns_step() {
        let (x, y) = step_data();
        let config = ForestConfig {
            bootstrap: false,
            ..ForestConfig::default()
        };
        let tree = RegressionTree::fit(&x, &y, (0..x.len()).collect(), &config);

        assert_eq!(tree.depth(), 1);
        assert_relative_eq!(tree.predict(&[5.0, 0.0]), 10.0);
        assert_relative_eq!(tree.predict(&[30.0, 1.0]), 50.0);
        // threshold sits midway between 19 and 20
        assert_relative_eq!(tree.predict(&[19.4, 0.0]), 10.0);
        assert_relative_eq!(tree.predict(&[19.6, 0.0]), 50.0);
        assert!(tree.impurity_decrease[0] > 0.0);
        assert_eq!(tree.impurity_decrease[1], 0.0);
    }

    #[test]
    fn test_constant_target_is_single_leaf() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y = vec![3.0; 10];
        let tree = RegressionTree::fit(&x, &y, (0..10).collect(), &ForestConfig::default());
        assert_eq!(tree.depth(), 0);
        assert_relative_eq!(tree.predict(&[100.0]), 3.0);
    }

    #[test]
    fn test_depth_is_bounded() {
        let x: Vec<Vec<f64>> = (0..200).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..200).map(|i| ((i * 37) % 101) as f64).collect();
        let config = ForestConfig {
            max_depth: 3,
            bootstrap: false,
            ..ForestConfig::default()
        };
        let tree = RegressionTree::fit(&x, &y, (0..200).collect(), &config);
        assert!(tree.depth() <= 3);
    }

    #[test]
    fn test_forest_is_reproducible() {
        let (x, y) = step_data();
        let forest = RandomForestRegressor::new(small_config()).unwrap();

        let a = forest.fit(&x, &y).unwrap();
        let b = forest.fit(&x, &y).unwrap();
        for row in &x {
            assert_eq!(a.predict_one(row).unwrap(), b.predict_one(row).unwrap());
        }
        assert_eq!(a.trees().len(), 10);
    }

    #[test]
    fn test_importances_sum_to_one() {
        let (x, y) = step_data();
        let fitted = RandomForestRegressor::new(small_config())
            .unwrap()
            .fit(&x, &y)
            .unwrap();
        let importances = fitted.feature_importances().unwrap();

        assert_relative_eq!(importances.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(importances[0] > importances[1]);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let forest = RandomForestRegressor::default();
        assert!(matches!(
            forest.fit(&[], &[]),
            Err(ForecastError::NoTrainableData(_))
        ));
        assert!(forest.fit(&[vec![1.0], vec![2.0]], &[1.0]).is_err());
        assert!(forest.fit(&[vec![1.0], vec![f64::NAN]], &[1.0, 2.0]).is_err());
        assert!(forest.fit(&[vec![1.0], vec![1.0, 2.0]], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_predict_checks_width() {
        let (x, y) = step_data();
        let fitted = RandomForestRegressor::new(small_config())
            .unwrap()
            .fit(&x, &y)
            .unwrap();
        assert!(fitted.predict_one(&[1.0]).is_err());
    }
}
