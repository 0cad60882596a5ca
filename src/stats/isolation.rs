//! Seeded isolation forest over the batch feature matrix.
//!
//! Anomalous points are easier to isolate with random axis-parallel splits,
//! so they end up at shallower depths. The forest is fully deterministic for
//! a given seed: same matrix in, same scores out.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::features::FEATURE_COUNT;

/// Euler-Mascheroni constant, used by the average path length normalizer.
const EULER_GAMMA: f64 = 0.577_215_664_9;

/// One node of an isolation tree, stored arena-style.
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    /// Path length for one point, with the standard size correction at
    /// leaves that still hold more than one sample.
    fn path_length(&self, point: &[f64]) -> f64 {
        let mut index = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { size } => {
                    return depth + average_path_length(*size);
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if point[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// c(n): expected path length of an unsuccessful BST search over n points.
fn average_path_length(n: usize) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let n = n as f64;
    let harmonic = (n - 1.0).ln() + EULER_GAMMA;
    2.0 * harmonic - 2.0 * (n - 1.0) / n
}

fn build_tree(
    matrix: &Array2<f64>,
    sample: &mut Vec<usize>,
    max_depth: usize,
    rng: &mut StdRng,
) -> IsolationTree {
    let mut tree = IsolationTree { nodes: Vec::new() };
    build_node(matrix, sample, 0, max_depth, rng, &mut tree);
    tree
}

/// Recursively grow one subtree, returning the arena index of its root.
fn build_node(
    matrix: &Array2<f64>,
    sample: &mut [usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
    tree: &mut IsolationTree,
) -> usize {
    if depth >= max_depth || sample.len() <= 1 {
        tree.nodes.push(Node::Leaf { size: sample.len() });
        return tree.nodes.len() - 1;
    }

    // Only features with spread inside this sample can split it.
    let mut splittable = Vec::new();
    for feature in 0..FEATURE_COUNT {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &row in sample.iter() {
            let v = matrix[[row, feature]];
            min = min.min(v);
            max = max.max(v);
        }
        if max > min {
            splittable.push((feature, min, max));
        }
    }
    if splittable.is_empty() {
        tree.nodes.push(Node::Leaf { size: sample.len() });
        return tree.nodes.len() - 1;
    }

    let (feature, min, max) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(min..max);

    // Partition in place: indices below the threshold move to the front.
    let mut split = 0;
    for i in 0..sample.len() {
        if matrix[[sample[i], feature]] < threshold {
            sample.swap(i, split);
            split += 1;
        }
    }

    // Reserve the split node before recursing so children see stable indices.
    tree.nodes.push(Node::Leaf { size: 0 });
    let node_index = tree.nodes.len() - 1;
    let (left_sample, right_sample) = sample.split_at_mut(split);
    let left = build_node(matrix, left_sample, depth + 1, max_depth, rng, tree);
    let right = build_node(matrix, right_sample, depth + 1, max_depth, rng, tree);
    tree.nodes[node_index] = Node::Split {
        feature,
        threshold,
        left,
        right,
    };
    node_index
}

/// A fitted forest plus the per-feature split counts it accumulated.
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees on subsamples of up to `sample_size` rows.
    pub fn fit(matrix: &Array2<f64>, n_trees: usize, sample_size: usize, seed: u64) -> Self {
        let n = matrix.nrows();
        let sample_size = sample_size.min(n).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let mut sample: Vec<usize> = if sample_size >= n {
                (0..n).collect()
            } else {
                // Sample without replacement by partial Fisher-Yates.
                let mut indices: Vec<usize> = (0..n).collect();
                for i in 0..sample_size {
                    let j = rng.gen_range(i..n);
                    indices.swap(i, j);
                }
                indices.truncate(sample_size);
                indices
            };
            trees.push(build_tree(matrix, &mut sample, max_depth, &mut rng));
        }
        IsolationForest { trees, sample_size }
    }

    /// Anomaly score in (0, 1] per row; higher means more isolated.
    pub fn score(&self, matrix: &Array2<f64>) -> Vec<f64> {
        let normalizer = average_path_length(self.sample_size).max(1e-10);
        let mut scores = Vec::with_capacity(matrix.nrows());
        for row in matrix.rows() {
            let point = row.as_slice().unwrap_or(&[]);
            let mean_depth: f64 = self
                .trees
                .iter()
                .map(|t| t.path_length(point))
                .sum::<f64>()
                / self.trees.len() as f64;
            scores.push(2f64.powf(-mean_depth / normalizer));
        }
        scores
    }

    /// Split-frequency feature importance, normalized to sum to 1 when any
    /// splits exist.
    pub fn feature_importance(&self) -> [f64; FEATURE_COUNT] {
        let mut counts = [0.0f64; FEATURE_COUNT];
        for tree in &self.trees {
            for node in &tree.nodes {
                if let Node::Split { feature, .. } = node {
                    counts[*feature] += 1.0;
                }
            }
        }
        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            for c in counts.iter_mut() {
                *c /= total;
            }
        }
        counts
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn matrix_with_outlier() -> Array2<f64> {
        // 30 tightly clustered rows plus one far outlier.
        let n = 31;
        let mut m = Array2::zeros((n, FEATURE_COUNT));
        for i in 0..30 {
            for f in 0..FEATURE_COUNT {
                m[[i, f]] = 1.0 + (i % 3) as f64 * 0.01;
            }
        }
        for f in 0..FEATURE_COUNT {
            m[[30, f]] = 100.0;
        }
        m
    }

    #[test]
    fn test_outlier_scores_highest() {
        let m = matrix_with_outlier();
        let forest = IsolationForest::fit(&m, 100, 256, 42);
        let scores = forest.score(&m);
        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(30));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let m = matrix_with_outlier();
        let a = IsolationForest::fit(&m, 50, 256, 42).score(&m);
        let b = IsolationForest::fit(&m, 50, 256, 42).score(&m);
        assert_eq!(a, b);
        let c = IsolationForest::fit(&m, 50, 256, 7).score(&m);
        assert_ne!(a, c);
    }

    #[test]
    fn test_constant_matrix_gives_uniform_scores() {
        let m = Array2::from_elem((10, FEATURE_COUNT), 5.0);
        let forest = IsolationForest::fit(&m, 20, 256, 42);
        let scores = forest.score(&m);
        for s in &scores {
            assert!((s - scores[0]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_importance_sums_to_one_when_splits_exist() {
        let m = matrix_with_outlier();
        let forest = IsolationForest::fit(&m, 50, 256, 42);
        let importance = forest.feature_importance();
        let total: f64 = importance.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_path_length_small_n() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert!(average_path_length(2) > 0.0);
    }
}
