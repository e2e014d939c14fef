//! Pairwise distances between datasets, stored in condensed form.
//!
//! The condensed layout keeps the strict upper triangle of the symmetric
//! `n × n` matrix row by row, which is the input expected by the linkage step.

use super::config::CellMetric;
use super::error::EngineError;
use crate::core::models::cell::{AngleTransform, UnitCell};
use crate::core::models::merge::CorrelationEntry;

/// Symmetric, zero-diagonal, non-negative distance matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    n: usize,
    condensed: Vec<f64>,
}

/// Position of the pair `(i, j)`, `i < j`, in the condensed vector.
#[inline]
pub(crate) fn condensed_index(n: usize, i: usize, j: usize) -> usize {
    n * i - i * (i + 1) / 2 + j - i - 1
}

impl DistanceMatrix {
    /// Wraps an existing condensed vector after checking its length and values.
    pub fn from_condensed(n: usize, condensed: Vec<f64>) -> Result<Self, EngineError> {
        let expected = n * n.saturating_sub(1) / 2;
        if condensed.len() != expected {
            return Err(EngineError::DimensionMismatch {
                expected,
                found: condensed.len(),
            });
        }
        for i in 0..n {
            for j in i + 1..n {
                let value = condensed[condensed_index(n, i, j)];
                if !value.is_finite() || value < 0.0 {
                    return Err(EngineError::InvalidDistance { i, j, value });
                }
            }
        }
        Ok(Self { n, condensed })
    }

    /// Builds distances from a sparse correlation table over `n` datasets.
    ///
    /// Pairs absent from the table count as uncorrelated and end up at the
    /// maximal distance of 1.
    pub fn from_correlations(entries: &[CorrelationEntry], n: usize) -> Result<Self, EngineError> {
        let cc = correlation_matrix(entries, n)?;
        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                condensed.push(correlation_to_distance(cc[i][j]));
            }
        }
        Ok(Self { n, condensed })
    }

    /// Builds distances between unit cells with the chosen metric.
    ///
    /// Cells are compared as given; axis ordering must already be consistent.
    /// The angle transform only affects the euclidean metric.
    pub fn from_cells(
        cells: &[UnitCell],
        metric: CellMetric,
        transform: AngleTransform,
    ) -> Result<Self, EngineError> {
        let n = cells.len();
        let transformed: Vec<[f64; 6]> = cells.iter().map(|c| transform.apply(c.params())).collect();
        let mut condensed = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in i + 1..n {
                let value = match metric {
                    CellMetric::Euclidean => euclidean(&transformed[i], &transformed[j]),
                    CellMetric::Lcv => lcv_distance(&cells[i], &cells[j]),
                    CellMetric::Volume => volume_difference(&cells[i], &cells[j]),
                };
                if !value.is_finite() {
                    return Err(EngineError::InvalidDistance { i, j, value });
                }
                condensed.push(value);
            }
        }
        Ok(Self { n, condensed })
    }

    /// Number of datasets.
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => 0.0,
            std::cmp::Ordering::Less => self.condensed[condensed_index(self.n, i, j)],
            std::cmp::Ordering::Greater => self.condensed[condensed_index(self.n, j, i)],
        }
    }

    pub fn condensed(&self) -> &[f64] {
        &self.condensed
    }

    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        (0..self.n)
            .map(|i| (0..self.n).map(|j| self.get(i, j)).collect())
            .collect()
    }
}

/// Dense correlation matrix: zero everywhere, one on the diagonal, each
/// entry mirrored and negative values clipped to zero.
pub fn correlation_matrix(
    entries: &[CorrelationEntry],
    n: usize,
) -> Result<Vec<Vec<f64>>, EngineError> {
    let mut cc = vec![vec![0.0; n]; n];
    for (i, row) in cc.iter_mut().enumerate() {
        row[i] = 1.0;
    }
    for entry in entries {
        for index in [entry.i, entry.j] {
            if index >= n {
                return Err(EngineError::IndexOutOfRange { index, n });
            }
        }
        if entry.i == entry.j {
            continue;
        }
        let value = entry.cc.max(0.0);
        cc[entry.i][entry.j] = value;
        cc[entry.j][entry.i] = value;
    }
    Ok(cc)
}

#[inline]
pub fn correlation_to_distance(cc: f64) -> f64 {
    (1.0 - cc * cc).max(0.0).sqrt()
}

/// Inverse of [`correlation_to_distance`] for non-negative correlations.
#[inline]
pub fn distance_to_correlation(d: f64) -> f64 {
    (1.0 - d * d).max(0.0).sqrt()
}

pub fn euclidean(a: &[f64; 6], b: &[f64; 6]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Face diagonals `(d_ab, d_ac, d_bc)` spanned by each pair of axes and the
/// supplement of the angle between them.
fn face_diagonals(cell: &UnitCell) -> [f64; 3] {
    let [a, b, c] = cell.lengths();
    let [alpha, beta, gamma] = cell.angles();
    let diagonal = |x: f64, y: f64, angle: f64| {
        (x * x + y * y - 2.0 * x * y * (180.0 - angle).to_radians().cos()).sqrt()
    };
    [diagonal(a, b, gamma), diagonal(a, c, beta), diagonal(b, c, alpha)]
}

/// Linear cell variation: the largest relative difference between
/// corresponding face diagonals.
pub fn lcv_distance(c1: &UnitCell, c2: &UnitCell) -> f64 {
    face_diagonals(c1)
        .iter()
        .zip(face_diagonals(c2))
        .map(|(d1, d2)| (d1 - d2).abs() / d1.min(d2))
        .fold(0.0, f64::max)
}

pub fn volume_difference(c1: &UnitCell, c2: &UnitCell) -> f64 {
    (c1.volume() - c2.volume()).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn cell(params: [f64; 6]) -> UnitCell {
        UnitCell::new(params).unwrap()
    }

    #[test]
    fn condensed_index_walks_upper_triangle_row_major() {
        let n = 4;
        let order: Vec<usize> = (0..n)
            .flat_map(|i| (i + 1..n).map(move |j| condensed_index(n, i, j)))
            .collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn correlation_distances_are_symmetric_with_zero_diagonal() {
        let entries = vec![
            CorrelationEntry::new(0, 1, 0.95),
            CorrelationEntry::new(1, 2, 0.92),
            CorrelationEntry::new(0, 2, 0.10),
        ];
        let d = DistanceMatrix::from_correlations(&entries, 3).unwrap();
        for i in 0..3 {
            assert_eq!(d.get(i, i), 0.0);
            for j in 0..3 {
                assert_eq!(d.get(i, j), d.get(j, i));
                assert!(d.get(i, j) >= 0.0);
            }
        }
        assert!(approx_eq(d.get(0, 1), (1.0f64 - 0.95 * 0.95).sqrt()));
    }

    #[test]
    fn perfect_and_absent_correlations_map_to_extremes() {
        let entries = vec![CorrelationEntry::new(0, 1, 1.0)];
        let d = DistanceMatrix::from_correlations(&entries, 3).unwrap();
        assert_eq!(d.get(0, 1), 0.0);
        assert_eq!(d.get(0, 2), 1.0);
        assert_eq!(d.get(1, 2), 1.0);
    }

    #[test]
    fn negative_correlations_are_clipped_to_zero() {
        let negative = DistanceMatrix::from_correlations(&[CorrelationEntry::new(0, 1, -0.4)], 2).unwrap();
        let zero = DistanceMatrix::from_correlations(&[CorrelationEntry::new(0, 1, 0.0)], 2).unwrap();
        assert_eq!(negative, zero);
        assert_eq!(negative.get(0, 1), 1.0);
    }

    #[test]
    fn correlation_index_outside_dataset_count_is_rejected() {
        let result = DistanceMatrix::from_correlations(&[CorrelationEntry::new(0, 5, 0.9)], 3);
        assert!(matches!(
            result,
            Err(EngineError::IndexOutOfRange { index: 5, n: 3 })
        ));
    }

    #[test]
    fn distance_and_correlation_conversions_invert_each_other() {
        for cc in [0.0, 0.3, 0.77, 1.0] {
            assert!(approx_eq(distance_to_correlation(correlation_to_distance(cc)), cc));
        }
    }

    #[test]
    fn lcv_distance_is_symmetric_and_zero_on_identity() {
        let c1 = cell([10.0, 11.0, 12.0, 88.0, 95.0, 91.0]);
        let c2 = cell([10.3, 10.8, 12.5, 90.0, 92.0, 89.0]);
        assert_eq!(lcv_distance(&c1, &c1), 0.0);
        assert!(approx_eq(lcv_distance(&c1, &c2), lcv_distance(&c2, &c1)));
        assert!(lcv_distance(&c1, &c2) > 0.0);
    }

    #[test]
    fn lcv_distance_of_scaled_cubic_cells_is_relative_edge_change() {
        let c1 = cell([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]);
        let c2 = cell([11.0, 11.0, 11.0, 90.0, 90.0, 90.0]);
        assert!(approx_eq(lcv_distance(&c1, &c2), 0.1));
    }

    #[test]
    fn cell_metrics_produce_expected_values() {
        let cells = [
            cell([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]),
            cell([10.0, 10.0, 12.0, 90.0, 90.0, 90.0]),
        ];
        let euclid = DistanceMatrix::from_cells(&cells, CellMetric::Euclidean, AngleTransform::Degrees).unwrap();
        assert!(approx_eq(euclid.get(0, 1), 2.0));
        let volume = DistanceMatrix::from_cells(&cells, CellMetric::Volume, AngleTransform::Degrees).unwrap();
        assert!(approx_eq(volume.get(0, 1), 200.0));
    }

    #[test]
    fn sine_transform_ignores_supplementary_angle_ambiguity() {
        let cells = [
            cell([10.0, 10.0, 10.0, 90.0, 80.0, 90.0]),
            cell([10.0, 10.0, 10.0, 90.0, 100.0, 90.0]),
        ];
        let d = DistanceMatrix::from_cells(&cells, CellMetric::Euclidean, AngleTransform::Sine).unwrap();
        assert!(d.get(0, 1) < 1e-12);
    }

    #[test]
    fn from_condensed_validates_shape_and_values() {
        assert!(matches!(
            DistanceMatrix::from_condensed(3, vec![1.0, 2.0]),
            Err(EngineError::DimensionMismatch { expected: 3, found: 2 })
        ));
        assert!(matches!(
            DistanceMatrix::from_condensed(2, vec![f64::NAN]),
            Err(EngineError::InvalidDistance { i: 0, j: 1, .. })
        ));
        let d = DistanceMatrix::from_condensed(3, vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(d.to_dense(), vec![
            vec![0.0, 1.0, 2.0],
            vec![1.0, 0.0, 3.0],
            vec![2.0, 3.0, 0.0],
        ]);
    }
}
