//! Filtering of flat clusters and per-group summaries.

use super::distance::{DistanceMatrix, distance_to_correlation};
use super::linkage::ClusterAssignment;
use crate::core::models::merge::MergeReport;
use crate::core::models::observation::Observation;
use crate::core::utils::statistics::{column_summary, mean, min_max, weighted_mean_std};

/// A flat cluster that survived the size filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub label: usize,
    /// 0-based observation indices, ascending.
    pub members: Vec<usize>,
    /// Largest merge distance inside the group.
    pub cohesion: f64,
}

impl Group {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member indices numbered from 1, as shown to users.
    pub fn display_members(&self) -> Vec<usize> {
        self.members.iter().map(|i| i + 1).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grouping {
    pub threshold: f64,
    pub groups: Vec<Group>,
    /// Clusters dropped by the size filter.
    pub ignored_clusters: usize,
    /// Observations in the dropped clusters.
    pub ignored_observations: usize,
}

/// Keeps the clusters with more than `min_size` members.
pub fn filter_groups(assignment: &ClusterAssignment, min_size: usize) -> Grouping {
    let mut groups = Vec::new();
    let mut ignored_clusters = 0;
    let mut ignored_observations = 0;
    for (label, members) in assignment.clusters() {
        if members.len() <= min_size {
            ignored_clusters += 1;
            ignored_observations += members.len();
            continue;
        }
        groups.push(Group {
            label,
            cohesion: assignment.cohesion(label).unwrap_or(0.0),
            members,
        });
    }
    Grouping {
        threshold: assignment.threshold(),
        groups,
        ignored_clusters,
        ignored_observations,
    }
}

/// Statistics of the unit cells in one group.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGroupSummary {
    pub label: usize,
    pub members: Vec<usize>,
    pub ids: Vec<String>,
    pub mean: [f64; 6],
    pub min: [f64; 6],
    pub max: [f64; 6],
    /// Mean, minimum and maximum volume.
    pub volume: (f64, f64, f64),
    /// Cell averaged with the observation weights.
    pub weighted_mean: [f64; 6],
    pub cohesion: f64,
}

pub fn summarize_cells(group: &Group, observations: &[Observation]) -> CellGroupSummary {
    let selected: Vec<&Observation> = group.members.iter().map(|&i| &observations[i]).collect();
    let params: Vec<[f64; 6]> = selected.iter().map(|o| *o.cell.params()).collect();
    let volumes: Vec<f64> = selected.iter().map(|o| o.cell.volume()).collect();
    let weights: Vec<f64> = selected.iter().map(|o| o.weight).collect();

    let (mean_cell, min_cell, max_cell) = column_summary(&params).unwrap_or_default();
    let (v_min, v_max) = min_max(&volumes).unwrap_or_default();
    let mut weighted = mean_cell;
    for (k, slot) in weighted.iter_mut().enumerate() {
        let column: Vec<f64> = params.iter().map(|p| p[k]).collect();
        if let Some((m, _)) = weighted_mean_std(&column, &weights) {
            *slot = m;
        }
    }

    CellGroupSummary {
        label: group.label,
        members: group.display_members(),
        ids: selected.iter().map(|o| o.id.clone()).collect(),
        mean: mean_cell,
        min: min_cell,
        max: max_cell,
        volume: (mean(&volumes).unwrap_or_default(), v_min, v_max),
        weighted_mean: weighted,
        cohesion: group.cohesion,
    }
}

/// Cohesion and membership of one correlation group.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationGroupSummary {
    pub label: usize,
    pub members: Vec<usize>,
    /// Reflection files of the members; `None` where the report lists none.
    pub files: Vec<Option<String>>,
    pub cohesion_distance: f64,
    /// The cohesion expressed as a correlation coefficient.
    pub cohesion_cc: f64,
    /// Mean correlation over all member pairs.
    pub mean_cc: f64,
}

pub fn summarize_correlations(
    group: &Group,
    matrix: &DistanceMatrix,
    report: &MergeReport,
) -> CorrelationGroupSummary {
    let pair_cc: Vec<f64> = group
        .members
        .iter()
        .enumerate()
        .flat_map(|(k, &i)| {
            group.members[k + 1..]
                .iter()
                .map(move |&j| distance_to_correlation(matrix.get(i, j)))
        })
        .collect();
    CorrelationGroupSummary {
        label: group.label,
        members: group.display_members(),
        files: group
            .members
            .iter()
            .map(|&i| report.filename(i).map(str::to_string))
            .collect(),
        cohesion_distance: group.cohesion,
        cohesion_cc: distance_to_correlation(group.cohesion),
        mean_cc: mean(&pair_cc).unwrap_or(1.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::cell::UnitCell;
    use crate::core::models::merge::CorrelationEntry;
    use crate::engine::config::LinkageMethod;
    use crate::engine::linkage::LinkageTree;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn observation(id: &str, edge: f64, weight: f64) -> Observation {
        let cell = UnitCell::new([edge, edge, edge, 90.0, 90.0, 90.0]).unwrap();
        Observation::new(id, cell, 195, weight)
    }

    fn chain_report() -> MergeReport {
        let mut report = MergeReport::default();
        report.correlations = vec![
            CorrelationEntry::new(0, 1, 0.95),
            CorrelationEntry::new(0, 2, 0.10),
            CorrelationEntry::new(1, 2, 0.92),
        ];
        report.filenames.insert(0, "a/XDS_ASCII.HKL".to_string());
        report.filenames.insert(1, "b/XDS_ASCII.HKL".to_string());
        report
    }

    #[test]
    fn size_filter_drops_small_clusters_and_counts_them() {
        let matrix = DistanceMatrix::from_condensed(3, vec![0.1, 5.0, 5.0]).unwrap();
        let tree = LinkageTree::build(&matrix, LinkageMethod::Average).unwrap();
        let assignment = tree.cut(1.0).unwrap();

        let filtered = filter_groups(&assignment, 1);
        assert_eq!(filtered.groups.len(), 1);
        assert_eq!(filtered.groups[0].display_members(), vec![1, 2]);
        assert_eq!(filtered.ignored_clusters, 1);
        assert_eq!(filtered.ignored_observations, 1);

        let everything = filter_groups(&assignment, 0);
        assert_eq!(everything.groups.len(), 2);
        assert_eq!(everything.ignored_clusters, 0);
    }

    #[test]
    fn cell_summary_reports_ranges_and_weighted_mean() {
        let observations = vec![
            observation("x1", 10.0, 1.0),
            observation("x2", 12.0, 3.0),
        ];
        let group = Group {
            label: 1,
            members: vec![0, 1],
            cohesion: 3.46,
        };
        let summary = summarize_cells(&group, &observations);
        assert_eq!(summary.members, vec![1, 2]);
        assert_eq!(summary.ids, vec!["x1", "x2"]);
        assert!(approx_eq(summary.mean[0], 11.0));
        assert_eq!(summary.min[0], 10.0);
        assert_eq!(summary.max[2], 12.0);
        assert!(approx_eq(summary.weighted_mean[0], 11.5));
        assert!(approx_eq(summary.weighted_mean[3], 90.0));
        assert!(approx_eq(summary.volume.1, 1000.0));
        assert!(approx_eq(summary.volume.2, 1728.0));
        assert!(approx_eq(summary.volume.0, 1364.0));
    }

    #[test]
    fn correlation_summary_converts_cohesion_back_to_cc() {
        let report = chain_report();
        let matrix = DistanceMatrix::from_correlations(&report.correlations, 3).unwrap();
        let group = Group {
            label: 2,
            members: vec![0, 1],
            cohesion: matrix.get(0, 1),
        };
        let summary = summarize_correlations(&group, &matrix, &report);
        assert_eq!(summary.members, vec![1, 2]);
        assert!(approx_eq(summary.cohesion_cc, 0.95));
        assert!(approx_eq(summary.mean_cc, 0.95));
        assert_eq!(summary.files[1].as_deref(), Some("b/XDS_ASCII.HKL"));
    }

    #[test]
    fn missing_file_names_are_kept_as_gaps() {
        let report = chain_report();
        let matrix = DistanceMatrix::from_correlations(&report.correlations, 3).unwrap();
        let group = Group {
            label: 1,
            members: vec![1, 2],
            cohesion: matrix.get(1, 2),
        };
        let summary = summarize_correlations(&group, &matrix, &report);
        assert_eq!(summary.files, vec![Some("b/XDS_ASCII.HKL".to_string()), None]);
        assert!(approx_eq(summary.cohesion_cc, 0.92));
    }
}
