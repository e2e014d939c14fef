use crate::core::io::cells_yaml::CellRecord;
use crate::core::models::observation::Observation;
use crate::engine::config::CellClusterConfig;
use crate::engine::distance::DistanceMatrix;
use crate::engine::error::EngineError;
use crate::engine::grouping::{CellGroupSummary, Grouping, filter_groups, summarize_cells};
use crate::engine::linkage::LinkageTree;
use tracing::{info, instrument, warn};

/// Observations with axis-ordered cells and their linkage tree.
#[derive(Debug, Clone)]
pub struct CellLinkage {
    pub observations: Vec<Observation>,
    /// Position of each observation in the input list.
    pub source_index: Vec<usize>,
    pub matrix: DistanceMatrix,
    pub tree: LinkageTree,
}

#[derive(Debug, Clone)]
pub struct CellClusterResult {
    pub grouping: Grouping,
    pub summaries: Vec<CellGroupSummary>,
}

/// Turns records into observations, leaving out any with an invalid cell.
pub fn observations_from_records(
    records: &[CellRecord],
    use_raw_cell: bool,
) -> (Vec<Observation>, Vec<usize>) {
    let mut observations = Vec::with_capacity(records.len());
    let mut source_index = Vec::with_capacity(records.len());
    for (i, record) in records.iter().enumerate() {
        match record.to_observation(use_raw_cell) {
            Ok(obs) => {
                observations.push(obs);
                source_index.push(i);
            }
            Err(source) => {
                let e = EngineError::InvalidCell {
                    id: record.directory.clone(),
                    source,
                };
                warn!("Excluding dataset: {}", e);
            }
        }
    }
    (observations, source_index)
}

/// Normalizes axis order, builds the distance matrix and links.
#[instrument(skip_all, name = "cell_linkage_workflow")]
pub fn link(
    observations: Vec<Observation>,
    source_index: Vec<usize>,
    config: &CellClusterConfig,
) -> Result<CellLinkage, EngineError> {
    let observations: Vec<Observation> = observations
        .into_iter()
        .map(|mut o| {
            o.cell = o.cell.sorted_by_length();
            o
        })
        .collect();
    let cells: Vec<_> = observations.iter().map(|o| o.cell).collect();
    let matrix = DistanceMatrix::from_cells(&cells, config.metric, config.transform)?;
    let tree = LinkageTree::build(&matrix, config.cluster.method)?;
    info!(
        datasets = observations.len(),
        metric = %config.metric,
        transform = %config.transform,
        method = %config.cluster.method,
        "Linked unit cells."
    );
    Ok(CellLinkage {
        observations,
        source_index,
        matrix,
        tree,
    })
}

impl CellLinkage {
    /// Cuts at `threshold` and summarizes every group larger than `min_size`.
    pub fn summarize(&self, threshold: f64, min_size: usize) -> Result<CellClusterResult, EngineError> {
        let assignment = self.tree.cut(threshold)?;
        let grouping = filter_groups(&assignment, min_size);
        let summaries = grouping
            .groups
            .iter()
            .map(|g| summarize_cells(g, &self.observations))
            .collect();
        if grouping.ignored_clusters > 0 {
            info!(
                "Ignored {} clusters with {} or fewer items",
                grouping.ignored_clusters, min_size
            );
        }
        Ok(CellClusterResult {
            grouping,
            summaries,
        })
    }

    /// Input positions of the members of one summary.
    pub fn source_members(&self, summary: &CellGroupSummary) -> Vec<usize> {
        summary
            .members
            .iter()
            .map(|&m| self.source_index[m - 1])
            .collect()
    }
}

/// Full unit-cell clustering: link, cut at the configured or default
/// cutoff, filter and summarize.
#[instrument(skip_all, name = "cell_clustering_workflow")]
pub fn run(
    records: &[CellRecord],
    config: &CellClusterConfig,
) -> Result<(CellLinkage, CellClusterResult), EngineError> {
    let (observations, source_index) = observations_from_records(records, config.use_raw_cell);
    let linkage = link(observations, source_index, config)?;
    let threshold = config
        .cluster
        .cutoff
        .unwrap_or_else(|| linkage.tree.default_cutoff());
    let result = linkage.summarize(threshold, config.cluster.min_size)?;
    Ok((linkage, result))
}
