//! Local Outlier Factor over the batch feature matrix.
//!
//! Density-based complement to the isolation forest: a point is anomalous
//! when its local density is low relative to its k nearest neighbors.

use ndarray::Array2;

use crate::features::FEATURE_COUNT;

/// Guard against division by zero when a neighborhood collapses to a point.
const MIN_DENSITY: f64 = 1e-10;

/// LOF scores per row. `k` is clamped to `n - 1`; callers must ensure
/// `n >= 2`.
pub fn lof_scores(matrix: &Array2<f64>, k: usize) -> Vec<f64> {
    let n = matrix.nrows();
    let k = k.min(n - 1).max(1);

    // Pairwise euclidean distances; batches are small enough for O(n^2).
    let mut distances = vec![vec![0.0f64; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let mut sum = 0.0;
            for f in 0..matrix.ncols() {
                let d = matrix[[i, f]] - matrix[[j, f]];
                sum += d * d;
            }
            let dist = sum.sqrt();
            distances[i][j] = dist;
            distances[j][i] = dist;
        }
    }

    // k nearest neighbors of each point, ties broken by index for
    // reproducibility.
    let mut neighbors: Vec<Vec<usize>> = Vec::with_capacity(n);
    let mut k_distance = vec![0.0f64; n];
    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| distances[i][a].total_cmp(&distances[i][b]).then(a.cmp(&b)));
        order.truncate(k);
        k_distance[i] = distances[i][*order.last().unwrap_or(&i)];
        neighbors.push(order);
    }

    // Local reachability density.
    let mut lrd = vec![0.0f64; n];
    for i in 0..n {
        let sum: f64 = neighbors[i]
            .iter()
            .map(|&j| distances[i][j].max(k_distance[j]))
            .sum();
        lrd[i] = k as f64 / sum.max(MIN_DENSITY);
    }

    // LOF ratio: mean neighbor density over own density.
    let mut scores = Vec::with_capacity(n);
    for i in 0..n {
        let neighbor_density: f64 =
            neighbors[i].iter().map(|&j| lrd[j]).sum::<f64>() / k as f64;
        scores.push(neighbor_density / lrd[i].max(MIN_DENSITY));
    }
    scores
}

/// Per-feature importance: mean absolute difference from neighbor values,
/// aggregated over all points and normalized to sum to 1.
pub fn feature_importance(matrix: &Array2<f64>, k: usize) -> [f64; FEATURE_COUNT] {
    let n = matrix.nrows();
    let mut importance = [0.0f64; FEATURE_COUNT];
    if n < 2 {
        return importance;
    }
    let k = k.min(n - 1).max(1);

    for i in 0..n {
        let mut order: Vec<usize> = (0..n).filter(|&j| j != i).collect();
        order.sort_by(|&a, &b| {
            let da = row_distance(matrix, i, a);
            let db = row_distance(matrix, i, b);
            da.total_cmp(&db).then(a.cmp(&b))
        });
        order.truncate(k);
        for &j in &order {
            for f in 0..FEATURE_COUNT.min(matrix.ncols()) {
                importance[f] += (matrix[[i, f]] - matrix[[j, f]]).abs();
            }
        }
    }

    let total: f64 = importance.iter().sum();
    if total > 0.0 {
        for v in importance.iter_mut() {
            *v /= total;
        }
    }
    importance
}

fn row_distance(matrix: &Array2<f64>, a: usize, b: usize) -> f64 {
    let mut sum = 0.0;
    for f in 0..matrix.ncols() {
        let d = matrix[[a, f]] - matrix[[b, f]];
        sum += d * d;
    }
    sum.sqrt()
}

// ============================================================================
// TESTS
// ============================================================================
