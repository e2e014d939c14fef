use edtools::core::io::filelist::GatherCriteria;
use edtools::core::models::cell::AngleTransform;
use edtools::engine::config::{CellMetric, LinkageMethod};
use edtools::workflows::correlation_clustering::ScalingOptions;

/// Clustering settings after merging the file, `--set` and defaults.
/// Subcommand flags are applied on top of these.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringSettings {
    pub method: LinkageMethod,
    pub distance: Option<f64>,
    pub min_size: usize,
    pub metric: CellMetric,
    pub angle_transform: AngleTransform,
    pub use_raw_cell: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub threads: usize,
    pub clustering: ClusteringSettings,
    pub scaling: ScalingOptions,
    pub gather: GatherCriteria,
}
