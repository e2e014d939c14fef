use crate::core::io::filelist::{FileListEntry, write_file_list};
use crate::core::io::pointless::{PointlessLogFile, PointlessSummary};
use crate::core::io::traits::ReportFile;
use crate::core::io::xscale_inp::{XscaleInp, XscaleInput, write_xdsconv_inp};
use crate::core::io::xscale_lp::XscaleLpFile;
use crate::core::models::merge::{MergeReport, MergedStatistics};
use crate::engine::config::{ClusterConfig, LinkageMethod};
use crate::engine::distance::DistanceMatrix;
use crate::engine::error::EngineError;
use crate::engine::grouping::{
    CorrelationGroupSummary, Grouping, filter_groups, summarize_correlations,
};
use crate::engine::linkage::LinkageTree;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct CorrelationLinkage {
    pub matrix: DistanceMatrix,
    pub tree: LinkageTree,
}

#[derive(Debug, Clone)]
pub struct CorrelationClusterResult {
    pub grouping: Grouping,
    pub summaries: Vec<CorrelationGroupSummary>,
}

/// Builds correlation distances for every dataset of the report and links them.
#[instrument(skip_all, name = "correlation_linkage_workflow")]
pub fn link(report: &MergeReport, method: LinkageMethod) -> Result<CorrelationLinkage, EngineError> {
    let n = report.dataset_count();
    let matrix = DistanceMatrix::from_correlations(&report.correlations, n)?;
    let tree = LinkageTree::build(&matrix, method)?;
    info!(datasets = n, pairs = report.correlations.len(), %method, "Linked datasets by correlation.");
    Ok(CorrelationLinkage { matrix, tree })
}

impl CorrelationLinkage {
    pub fn summarize(
        &self,
        report: &MergeReport,
        threshold: f64,
        min_size: usize,
    ) -> Result<CorrelationClusterResult, EngineError> {
        let assignment = self.tree.cut(threshold)?;
        let grouping = filter_groups(&assignment, min_size);
        if grouping.ignored_clusters > 0 {
            info!(
                "Ignored {} clusters with {} or fewer items",
                grouping.ignored_clusters, min_size
            );
        }
        let summaries = grouping
            .groups
            .iter()
            .map(|g| summarize_correlations(g, &self.matrix, report))
            .collect();
        Ok(CorrelationClusterResult {
            grouping,
            summaries,
        })
    }
}

#[instrument(skip_all, name = "correlation_clustering_workflow")]
pub fn run(
    report: &MergeReport,
    config: &ClusterConfig,
) -> Result<(CorrelationLinkage, CorrelationClusterResult), EngineError> {
    let linkage = link(report, config.method)?;
    let threshold = config
        .cutoff
        .unwrap_or_else(|| linkage.tree.default_cutoff());
    let result = linkage.summarize(report, threshold, config.min_size)?;
    Ok((linkage, result))
}

/// Settings for the per-cluster scaling input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingOptions {
    pub resolution: (f64, f64),
    pub snrc: f64,
}

impl Default for ScalingOptions {
    fn default() -> Self {
        Self {
            resolution: (20.0, 0.8),
            snrc: 2.0,
        }
    }
}

pub fn cluster_directory_name(label: usize) -> String {
    format!("cluster_{label}")
}

/// Structure-solution instructions shared by every cluster when present in `root`.
pub const SHELX_INS: &str = "shelx.ins";

/// Prepares `root/cluster_{label}`: numbered copies of the member reflection
/// files, `XSCALE.INP`, `filelist.txt` and `XDSCONV.INP`. A `shelx.ins` in
/// `root` is copied along.
pub fn write_cluster_inputs(
    root: &Path,
    summary: &CorrelationGroupSummary,
    report: &MergeReport,
    threshold: f64,
    method: LinkageMethod,
    options: &ScalingOptions,
) -> Result<PathBuf, EngineError> {
    let space_group_line = report
        .space_group_line
        .as_deref()
        .ok_or(EngineError::IncompleteMergeReport("space group line"))?;
    let unit_cell_line = report
        .unit_cell_line
        .as_deref()
        .ok_or(EngineError::IncompleteMergeReport("unit cell line"))?;

    let dir = root.join(cluster_directory_name(summary.label));
    fs::create_dir_all(&dir)?;

    let members: Vec<String> = summary.members.iter().map(|m| m.to_string()).collect();
    let mut inp = XscaleInp::new(
        space_group_line.trim().to_string(),
        unit_cell_line.trim().to_string(),
        options.resolution,
    );
    inp.snrc = options.snrc;
    inp.header = vec![
        format!("Clustered data from {} data sets", summary.members.len()),
        format!("Cluster items: [{}]", members.join(", ")),
        format!("Cluster distance cutoff: {threshold}"),
        format!("Cluster method: {method}"),
    ];

    let mut file_list = Vec::with_capacity(summary.files.len());
    for (k, (member, file)) in summary.members.iter().zip(&summary.files).enumerate() {
        let number = k + 1;
        let src = file
            .as_deref()
            .map(PathBuf::from)
            .ok_or_else(|| EngineError::input("XSCALE.LP", format!("no input file listed for data set {member}")))?;
        let name = src
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| EngineError::input(&src, "not a file name"))?;
        let local = format!("{number}_{name}");
        fs::copy(&src, dir.join(&local)).map_err(|e| EngineError::input(&src, e))?;
        debug!(src = %src.display(), dst = %local, "Copied reflection file.");

        inp.inputs.push(XscaleInput {
            file: local.clone(),
            origin: Some(src.display().to_string()),
        });
        file_list.push(FileListEntry {
            number,
            file: PathBuf::from(local),
            resolution: options.resolution,
            source: src.parent().map(Path::to_path_buf).unwrap_or_default(),
        });
    }

    let mut writer = BufWriter::new(File::create(dir.join("XSCALE.INP"))?);
    inp.write_to(&mut writer)?;
    writer.flush()?;

    let mut writer = BufWriter::new(File::create(dir.join("filelist.txt"))?);
    write_file_list(&mut writer, &file_list)?;
    writer.flush()?;

    let mut writer = BufWriter::new(File::create(dir.join("XDSCONV.INP"))?);
    write_xdsconv_inp(&mut writer, options.resolution)?;
    writer.flush()?;

    let shelx = root.join(SHELX_INS);
    if shelx.is_file() {
        fs::copy(&shelx, dir.join(SHELX_INS)).map_err(|e| EngineError::input(&shelx, e))?;
        debug!(dst = %dir.display(), "Copied shelx.ins.");
    }

    Ok(dir)
}

/// Results already present in a cluster directory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterOutcome {
    pub statistics: Option<MergedStatistics>,
    pub pointless: Option<PointlessSummary>,
}

/// Reads `XSCALE.LP` and `pointless.log` from `dir` when they exist.
/// Unreadable reports are logged and treated as absent.
pub fn collect_cluster_outcome(dir: &Path) -> ClusterOutcome {
    let mut outcome = ClusterOutcome::default();
    let xscale_lp = dir.join("XSCALE.LP");
    if xscale_lp.is_file() {
        match XscaleLpFile::read_from_path(&xscale_lp) {
            Ok(report) => outcome.statistics = report.statistics,
            Err(e) => warn!("Could not read {}: {}", xscale_lp.display(), e),
        }
    }
    let pointless_log = dir.join("pointless.log");
    if pointless_log.is_file() {
        match PointlessLogFile::read_from_path(&pointless_log) {
            Ok(summary) if !summary.is_empty() => outcome.pointless = Some(summary),
            Ok(_) => {}
            Err(e) => warn!("Could not read {}: {}", pointless_log.display(), e),
        }
    }
    outcome
}
