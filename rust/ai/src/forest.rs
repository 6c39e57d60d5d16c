//! Random forest classifier over small categorical feature vectors.
//!
//! Trees split on `feature <= threshold` using Gini impurity. Every tree is
//! grown on a bootstrap sample and considers a random subset of
//! `sqrt(n_features)` features per split. All randomness comes from one
//! seeded ChaCha20 generator so a fit is reproducible.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::seq::index;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Unlimited when `None`.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ForestError {
    #[error("Training set is empty")]
    EmptyTrainingSet,
    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
    #[error("Feature rows must all have {expected} columns, found {found}")]
    RaggedFeatures { expected: usize, found: usize },
    #[error("Forest needs at least one tree")]
    NoTrees,
    #[error("Fit cancelled after {completed} trees")]
    Cancelled { completed: usize },
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: Node,
}

impl DecisionTree {
    /// Class distribution of the leaf `row` falls into.
    pub fn predict_proba(&self, row: &[u8]) -> &[f64] {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or_default() as f64;
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + depth(left).max(depth(right)),
            }
        }
        depth(&self.root)
    }
}

/// Borrowed training data with labels already mapped to class indices.
struct Samples<'a, R> {
    rows: &'a [R],
    classes: &'a [usize],
    n_classes: usize,
    n_features: usize,
}

impl<R: AsRef<[u8]>> Samples<'_, R> {
    fn value(&self, sample: usize, feature: usize) -> u8 {
        self.rows[sample].as_ref()[feature]
    }

    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.classes[i]] += 1;
        }
        counts
    }
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

struct TreeBuilder<'a, 'r, R> {
    samples: &'a Samples<'r, R>,
    config: &'a ForestConfig,
    max_features: usize,
}

impl<R: AsRef<[u8]>> TreeBuilder<'_, '_, R> {
    fn grow(&self, indices: Vec<usize>, depth: usize, rng: &mut ChaCha20Rng) -> Node {
        let counts = self.samples.class_counts(&indices);
        let total = indices.len();
        let impurity = gini(&counts, total);

        let depth_reached = self.config.max_depth.is_some_and(|max| depth >= max);
        if impurity == 0.0 || total < self.config.min_samples_split || depth_reached {
            return leaf(&counts, total);
        }

        let Some((feature, threshold)) = self.best_split(&indices, impurity, rng) else {
            return leaf(&counts, total);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| (self.samples.value(i, feature) as f64) <= threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.grow(left, depth + 1, rng)),
            right: Box::new(self.grow(right, depth + 1, rng)),
        }
    }

    /// Best Gini split among `max_features` randomly ordered features.
    /// Features past that budget are tried only while no split reducing
    /// impurity has been found.
    fn best_split(
        &self,
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha20Rng,
    ) -> Option<(usize, f64)> {
        let total = indices.len();
        let parent_counts = self.samples.class_counts(indices);
        let order = index::sample(rng, self.samples.n_features, self.samples.n_features);
        let mut best: Option<(usize, f64, f64)> = None;

        for (visited, feature) in order.iter().enumerate() {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            // value -> class counts, in ascending value order
            let mut by_value: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
            for &i in indices {
                let counts = by_value
                    .entry(self.samples.value(i, feature))
                    .or_insert_with(|| vec![0; self.samples.n_classes]);
                counts[self.samples.classes[i]] += 1;
            }
            if by_value.len() < 2 {
                continue;
            }

            let values: Vec<(u8, Vec<usize>)> = by_value.into_iter().collect();
            let mut left = vec![0; self.samples.n_classes];
            let mut left_total = 0;
            for pair in values.windows(2) {
                let (value, counts) = &pair[0];
                for (acc, c) in left.iter_mut().zip(counts) {
                    *acc += c;
                }
                left_total += counts.iter().sum::<usize>();

                let right: Vec<usize> = parent_counts
                    .iter()
                    .zip(&left)
                    .map(|(all, l)| all - l)
                    .collect();
                let right_total = total - left_total;
                let weighted = (left_total as f64 * gini(&left, left_total)
                    + right_total as f64 * gini(&right, right_total))
                    / total as f64;

                if weighted >= parent_impurity - 1e-12 {
                    continue;
                }
                let threshold = (*value as f64 + pair[1].0 as f64) / 2.0;
                if best.is_none_or(|(_, _, score)| weighted < score) {
                    best = Some((feature, threshold, weighted));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

fn leaf(counts: &[usize], total: usize) -> Node {
    let distribution = counts
        .iter()
        .map(|&c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
        .collect();
    Node::Leaf { distribution }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    classes: Vec<u8>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit<R: AsRef<[u8]>>(
        rows: &[R],
        labels: &[u8],
        config: &ForestConfig,
    ) -> Result<Self, ForestError> {
        Self::fit_with_cancel(rows, labels, config, None)
    }

    /// Fit, checking `cancel` before each tree.
    pub fn fit_with_cancel<R: AsRef<[u8]>>(
        rows: &[R],
        labels: &[u8],
        config: &ForestConfig,
        cancel: Option<&AtomicBool>,
    ) -> Result<Self, ForestError> {
        if rows.is_empty() {
            return Err(ForestError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(ForestError::LengthMismatch {
                features: rows.len(),
                labels: labels.len(),
            });
        }
        if config.n_trees == 0 {
            return Err(ForestError::NoTrees);
        }
        let n_features = rows[0].as_ref().len();
        if let Some(bad) = rows.iter().find(|r| r.as_ref().len() != n_features) {
            return Err(ForestError::RaggedFeatures {
                expected: n_features,
                found: bad.as_ref().len(),
            });
        }

        let mut classes: Vec<u8> = labels.to_vec();
        classes.sort_unstable();
        classes.dedup();
        let class_index: Vec<usize> = labels
            .iter()
            .map(|l| classes.iter().position(|c| c == l).unwrap_or_default())
            .collect();

        let samples = Samples {
            rows,
            classes: &class_index,
            n_classes: classes.len(),
            n_features,
        };
        let max_features = ((n_features as f64).sqrt() as usize).clamp(1, n_features.max(1));
        let builder = TreeBuilder {
            samples: &samples,
            config,
            max_features,
        };

        let mut rng = ChaCha20Rng::seed_from_u64(config.seed);
        let n = rows.len();
        let mut trees = Vec::with_capacity(config.n_trees);
        for _ in 0..config.n_trees {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                return Err(ForestError::Cancelled {
                    completed: trees.len(),
                });
            }
            let bootstrap: Vec<usize> = (0..n).map(|_| rng.random_range(0..n)).collect();
            let root = builder.grow(bootstrap, 0, &mut rng);
            trees.push(DecisionTree { root });
        }

        Ok(Self {
            trees,
            classes,
            n_features,
        })
    }

    /// Class labels seen during fit, ascending. Probabilities are aligned
    /// with this order.
    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Average of the per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[u8]) -> Vec<f64> {
        let mut proba = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in proba.iter_mut().zip(tree.predict_proba(row)) {
                *acc += p;
            }
        }
        let n = self.trees.len().max(1) as f64;
        proba.iter_mut().for_each(|p| *p /= n);
        proba
    }

    /// Most probable label; the lowest label wins a draw.
    pub fn predict(&self, row: &[u8]) -> Option<u8> {
        let proba = self.predict_proba(row);
        argmax(&proba).map(|i| self.classes[i])
    }
}

pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    // label follows the first feature, the second is noise
    fn first_feature_rule() -> (Vec<[u8; 2]>, Vec<u8>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for _ in 0..10 {
            for (a, b) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                rows.push([a, b]);
                labels.push(a);
            }
        }
        (rows, labels)
    }

    #[test]
    fn gini_of_pure_and_mixed_nodes() {
        assert_eq!(gini(&[4, 0], 4), 0.0);
        assert!((gini(&[2, 2], 4) - 0.5).abs() < 1e-12);
        assert_eq!(gini(&[], 0), 0.0);
    }

    #[test]
    fn learns_a_single_feature_rule() {
        let (rows, labels) = first_feature_rule();
        let config = ForestConfig {
            n_trees: 25,
            ..ForestConfig::default()
        };
        let forest = RandomForest::fit(&rows, &labels, &config).unwrap();
        assert_eq!(forest.classes(), &[0, 1]);
        for (row, label) in rows.iter().zip(&labels).take(4) {
            assert_eq!(forest.predict(row), Some(*label));
        }
    }

    #[test]
    fn probabilities_sum_to_one() {
        let (rows, labels) = first_feature_rule();
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();
        let proba = forest.predict_proba(&[0, 1]);
        assert_eq!(proba.len(), 2);
        assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn same_seed_same_forest() {
        let rows: Vec<[u8; 3]> = (0..30u8).map(|i| [i % 3, (i / 3) % 3, i % 2]).collect();
        let labels: Vec<u8> = (0..30u8).map(|i| (i * 7 % 3) as u8).collect();
        let config = ForestConfig::default();
        let a = RandomForest::fit(&rows, &labels, &config).unwrap();
        let b = RandomForest::fit(&rows, &labels, &config).unwrap();
        for row in &rows {
            assert_eq!(a.predict_proba(row), b.predict_proba(row));
        }
    }

    #[test]
    fn single_class_predicts_it_with_certainty() {
        let rows = vec![[1u8, 2]; 5];
        let labels = vec![2u8; 5];
        let forest = RandomForest::fit(&rows, &labels, &ForestConfig::default()).unwrap();
        assert_eq!(forest.classes(), &[2]);
        assert_eq!(forest.predict_proba(&[0, 0]), vec![1.0]);
        assert!(forest.trees().iter().all(|t| t.depth() == 0));
    }

    #[test]
    fn rejects_bad_input() {
        let empty: Vec<[u8; 2]> = Vec::new();
        assert_eq!(
            RandomForest::fit(&empty, &[], &ForestConfig::default()).unwrap_err(),
            ForestError::EmptyTrainingSet
        );
        assert!(matches!(
            RandomForest::fit(&[[0u8]], &[0, 1], &ForestConfig::default()),
            Err(ForestError::LengthMismatch { .. })
        ));
        let ragged = vec![vec![0u8, 1], vec![0u8]];
        assert!(matches!(
            RandomForest::fit(&ragged, &[0, 1], &ForestConfig::default()),
            Err(ForestError::RaggedFeatures { .. })
        ));
    }

    #[test]
    fn cancel_flag_stops_fit() {
        let (rows, labels) = first_feature_rule();
        let cancel = AtomicBool::new(true);
        let err = RandomForest::fit_with_cancel(&rows, &labels, &ForestConfig::default(), Some(&cancel))
            .unwrap_err();
        assert_eq!(err, ForestError::Cancelled { completed: 0 });
    }

    #[test]
    fn argmax_prefers_first_maximum() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[]), None);
    }
}
