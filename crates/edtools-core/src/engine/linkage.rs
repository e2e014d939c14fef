//! Agglomerative clustering and the flat cut of the resulting tree.

use super::config::LinkageMethod;
use super::distance::DistanceMatrix;
use super::error::EngineError;
use kodama::linkage as kodama_linkage;
use tracing::debug;

/// Fraction of the largest merge distance used when no cutoff is given.
pub const DEFAULT_CUTOFF_FRACTION: f64 = 0.7;

/// One agglomeration step.
///
/// Cluster ids follow the usual convention: `0..n` are the observations and
/// the cluster created by merge `k` has id `n + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub distance: f64,
    /// Number of observations in the merged cluster.
    pub size: usize,
}

/// The full merge sequence of one clustering run (`n - 1` merges).
#[derive(Debug, Clone, PartialEq)]
pub struct LinkageTree {
    n: usize,
    method: LinkageMethod,
    merges: Vec<Merge>,
}

/// Rounds to a fixed number of decimals.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

impl LinkageTree {
    /// Links the datasets of `matrix` with the given method.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InsufficientData`] for fewer than two datasets.
    pub fn build(matrix: &DistanceMatrix, method: LinkageMethod) -> Result<Self, EngineError> {
        let n = matrix.len();
        if n < 2 {
            return Err(EngineError::InsufficientData { found: n });
        }
        let mut condensed = matrix.condensed().to_vec();
        let dendrogram = kodama_linkage(&mut condensed, n, method.to_kodama());
        let merges: Vec<Merge> = dendrogram
            .steps()
            .iter()
            .map(|step| Merge {
                left: step.cluster1.min(step.cluster2),
                right: step.cluster1.max(step.cluster2),
                distance: step.dissimilarity,
                size: step.size,
            })
            .collect();
        debug!(n, %method, merges = merges.len(), "Built linkage tree.");
        Ok(Self { n, method, merges })
    }

    /// Number of observations (leaves).
    pub fn leaves(&self) -> usize {
        self.n
    }

    pub fn method(&self) -> LinkageMethod {
        self.method
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    pub fn max_distance(&self) -> f64 {
        self.merges.iter().map(|m| m.distance).fold(0.0, f64::max)
    }

    /// `0.7 × max merge distance`, rounded to 4 decimals.
    pub fn default_cutoff(&self) -> f64 {
        round_to(DEFAULT_CUTOFF_FRACTION * self.max_distance(), 4)
    }

    /// Largest merge distance inside the subtree rooted at each node.
    fn subtree_max(&self) -> Vec<f64> {
        let mut max = vec![0.0; self.n + self.merges.len()];
        for (k, merge) in self.merges.iter().enumerate() {
            max[self.n + k] = merge.distance.max(max[merge.left]).max(max[merge.right]);
        }
        max
    }

    /// Cuts the tree at `threshold`.
    ///
    /// Two observations share a cluster iff the subtree joining them has no
    /// merge above the threshold. Labels start at 1 and are numbered in order
    /// of first appearance.
    pub fn cut(&self, threshold: f64) -> Result<ClusterAssignment, EngineError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(EngineError::InvalidThreshold(threshold));
        }
        let subtree_max = self.subtree_max();
        let total = self.n + self.merges.len();
        let mut parent: Vec<usize> = (0..total).collect();
        let mut cohesion = vec![0.0; total];

        for (k, merge) in self.merges.iter().enumerate() {
            let node = self.n + k;
            if subtree_max[node] <= threshold {
                let left = find(&mut parent, merge.left);
                let right = find(&mut parent, merge.right);
                parent[left] = node;
                parent[right] = node;
                cohesion[node] = subtree_max[node];
            }
        }

        let mut labels = vec![0; self.n];
        let mut root_labels: Vec<(usize, usize)> = Vec::new();
        let mut group_cohesion = Vec::new();
        for (leaf, label) in labels.iter_mut().enumerate() {
            let root = find(&mut parent, leaf);
            *label = match root_labels.iter().find(|(r, _)| *r == root) {
                Some(&(_, existing)) => existing,
                None => {
                    let next = root_labels.len() + 1;
                    root_labels.push((root, next));
                    group_cohesion.push(cohesion[root]);
                    next
                }
            };
        }

        Ok(ClusterAssignment {
            threshold,
            labels,
            cohesion: group_cohesion,
        })
    }
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

/// Flat clustering of the observations at one threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    threshold: f64,
    labels: Vec<usize>,
    cohesion: Vec<f64>,
}

impl ClusterAssignment {
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Cluster label (1-based) of every observation, by observation index.
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn cluster_count(&self) -> usize {
        self.cohesion.len()
    }

    /// Observation indices of one cluster, ascending.
    pub fn members(&self, label: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == label)
            .map(|(i, _)| i)
            .collect()
    }

    /// Largest merge distance inside a cluster; zero for singletons.
    pub fn cohesion(&self, label: usize) -> Option<f64> {
        label.checked_sub(1).and_then(|i| self.cohesion.get(i)).copied()
    }

    /// All clusters as `(label, members)` in label order.
    pub fn clusters(&self) -> Vec<(usize, Vec<usize>)> {
        (1..=self.cluster_count())
            .map(|label| (label, self.members(label)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::merge::CorrelationEntry;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Points on a line: 0, 1, 3, 10, 10.5.
    fn line_tree(method: LinkageMethod) -> LinkageTree {
        let points = [0.0f64, 1.0, 3.0, 10.0, 10.5];
        let n = points.len();
        let mut condensed = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                condensed.push((points[i] - points[j]).abs());
            }
        }
        let matrix = DistanceMatrix::from_condensed(n, condensed).unwrap();
        LinkageTree::build(&matrix, method).unwrap()
    }

    #[test]
    fn fewer_than_two_observations_cannot_be_linked() {
        for n in [0, 1] {
            let matrix = DistanceMatrix::from_condensed(n, Vec::new()).unwrap();
            assert!(matches!(
                LinkageTree::build(&matrix, LinkageMethod::Average),
                Err(EngineError::InsufficientData { found }) if found == n
            ));
        }
    }

    #[test]
    fn tree_has_n_minus_one_merges_ending_in_full_cluster() {
        for method in LinkageMethod::ALL {
            let tree = line_tree(method);
            assert_eq!(tree.merges().len(), 4, "{method}");
            assert_eq!(tree.merges().last().unwrap().size, 5, "{method}");
        }
    }

    #[test]
    fn single_linkage_merge_distances_are_nearest_neighbour_gaps() {
        let tree = line_tree(LinkageMethod::Single);
        let distances: Vec<f64> = tree.merges().iter().map(|m| m.distance).collect();
        assert_eq!(distances, vec![0.5, 1.0, 2.0, 7.0]);
        assert_eq!(tree.max_distance(), 7.0);
        assert_eq!(tree.default_cutoff(), 4.9);
    }

    #[test]
    fn cut_at_zero_gives_singletons() {
        for method in LinkageMethod::ALL {
            let assignment = line_tree(method).cut(0.0).unwrap();
            assert_eq!(assignment.cluster_count(), 5);
            assert_eq!(assignment.labels(), &[1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn cut_at_max_distance_gives_one_cluster() {
        for method in LinkageMethod::ALL {
            let tree = line_tree(method);
            let assignment = tree.cut(tree.max_distance()).unwrap();
            assert_eq!(assignment.cluster_count(), 1, "{method}");
            assert_eq!(assignment.members(1), vec![0, 1, 2, 3, 4]);
            assert!(approx_eq(assignment.cohesion(1).unwrap(), tree.max_distance()));
        }
    }

    #[test]
    fn raising_the_cutoff_never_adds_clusters() {
        for method in LinkageMethod::ALL {
            let tree = line_tree(method);
            let mut previous = usize::MAX;
            for step in 0..=80 {
                let count = tree.cut(step as f64 * 0.125).unwrap().cluster_count();
                assert!(count <= previous, "{method} at step {step}");
                previous = count;
            }
        }
    }

    #[test]
    fn labels_follow_first_appearance_and_cohesion_tracks_groups() {
        let tree = line_tree(LinkageMethod::Single);
        let assignment = tree.cut(2.5).unwrap();
        assert_eq!(assignment.labels(), &[1, 1, 1, 2, 2]);
        assert_eq!(assignment.cohesion(1), Some(2.0));
        assert_eq!(assignment.cohesion(2), Some(0.5));
        assert_eq!(assignment.cohesion(3), None);
        assert_eq!(
            assignment.clusters(),
            vec![(1, vec![0, 1, 2]), (2, vec![3, 4])]
        );
    }

    #[test]
    fn invalid_threshold_is_rejected() {
        let tree = line_tree(LinkageMethod::Average);
        assert!(matches!(tree.cut(-1.0), Err(EngineError::InvalidThreshold(_))));
        assert!(matches!(tree.cut(f64::NAN), Err(EngineError::InvalidThreshold(_))));
    }

    #[test]
    fn correlation_chain_joins_ends_only_near_maximal_threshold() {
        let entries = vec![
            CorrelationEntry::new(0, 1, 0.95),
            CorrelationEntry::new(0, 2, 0.10),
            CorrelationEntry::new(1, 2, 0.92),
        ];
        let matrix = DistanceMatrix::from_correlations(&entries, 3).unwrap();
        let far = matrix.get(0, 2);
        assert!(approx_eq(far, (1.0f64 - 0.01).sqrt()));
        assert!(matrix.get(0, 1) < 0.32 && matrix.get(1, 2) < 0.40);

        let complete = LinkageTree::build(&matrix, LinkageMethod::Complete).unwrap();
        let below = complete.cut(far - 1e-6).unwrap();
        assert_ne!(below.labels()[0], below.labels()[2]);
        let above = complete.cut(far).unwrap();
        assert_eq!(above.labels()[0], above.labels()[2]);

        let single = LinkageTree::build(&matrix, LinkageMethod::Single).unwrap();
        let chained = single.cut(matrix.get(1, 2)).unwrap();
        assert_eq!(chained.cluster_count(), 1);
    }

    #[test]
    fn default_cutoff_is_reproducible() {
        let first = line_tree(LinkageMethod::Average).default_cutoff();
        for _ in 0..5 {
            assert_eq!(line_tree(LinkageMethod::Average).default_cutoff(), first);
        }
        assert_eq!(round_to(first, 4), first);
    }

    #[test]
    fn round_to_keeps_requested_decimals() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(2.0, 4), 2.0);
    }
}
