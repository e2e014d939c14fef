use super::{CommandContext, format_cell};
use crate::cli::FindCellArgs;
use crate::config;
use crate::error::{CliError, Result};
use edtools::core::io::cellparm::CellparmFile;
use edtools::core::io::cells_yaml::{CellRecord, CellsYamlFile};
use edtools::core::io::traits::RecordFile;
use edtools::core::models::cell::PARAMETER_NAMES;
use edtools::engine::config::CellClusterConfig;
use edtools::engine::threshold::ThresholdSelector;
use edtools::workflows::cell_clustering::{self, CellClusterResult, CellLinkage};
use edtools::workflows::cell_estimate::{self, CellEstimate};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn run(args: FindCellArgs, ctx: &CommandContext) -> Result<()> {
    run_in(args, ctx, Path::new("."))
}

pub fn run_in(args: FindCellArgs, ctx: &CommandContext, out_dir: &Path) -> Result<()> {
    let records = load_records(&args.input)?;
    println!("Loaded {} unit cells from file {}", records.len(), args.input.display());

    if args.dendrogram {
        let config = config::cell_cluster_config(&ctx.config, &args)?;
        return show_dendrogram(&records, &config);
    }

    if args.cluster {
        let config = config::cell_cluster_config(&ctx.config, &args)?;
        let (linkage, result) = cell_clustering::run(&records, &config)?;
        print_clusters(&linkage, &result, &config);
        let written = write_clusters(&records, &linkage, &result, out_dir)?;
        for (label, path) in written {
            println!("Wrote cluster {} to file `{}`", label, path.display());
        }
    } else {
        let use_raw_cell = !args.use_bravais_lattice && ctx.config.clustering.use_raw_cell;
        let (observations, _) = cell_clustering::observations_from_records(&records, use_raw_cell);
        let estimate = cell_estimate::run(&observations)?;
        print!("{}", format_estimate(&estimate));
    }
    Ok(())
}

/// Reads a YAML cell list, or a CELLPARM.INP when the file has an `.INP` extension.
fn load_records(path: &Path) -> Result<Vec<CellRecord>> {
    let is_cellparm = path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("inp"));
    if !is_cellparm {
        return CellsYamlFile::read_from_path(path).map_err(|e| CliError::parsing(path, e));
    }
    let entries = CellparmFile::read_from_path(path).map_err(|e| CliError::parsing(path, e))?;
    Ok(entries
        .iter()
        .enumerate()
        .map(|(i, entry)| CellRecord::from_cellparm(i + 1, entry))
        .collect())
}

fn show_dendrogram(records: &[CellRecord], config: &CellClusterConfig) -> Result<()> {
    let (observations, source_index) =
        cell_clustering::observations_from_records(records, config.use_raw_cell);
    let linkage = cell_clustering::link(observations, source_index, config)?;
    let initial = config
        .cluster
        .cutoff
        .or_else(|| config.metric.initial_display_cutoff());
    let selector = ThresholdSelector::new(&linkage.tree, initial);
    info!(threshold = selector.threshold(), "Rendering dendrogram.");
    print!("{}", selector.render());
    Ok(())
}

fn print_clusters(linkage: &CellLinkage, result: &CellClusterResult, config: &CellClusterConfig) {
    println!("{}", "-".repeat(40));
    for summary in &result.summaries {
        println!("\nCluster #{} ({} items)", summary.label, summary.members.len());
        for &member in &summary.members {
            let cell = linkage.observations[member - 1].cell;
            println!(
                "{:5} {}  Vol.: {:6.1}",
                member,
                format_cell(cell.params()),
                cell.volume()
            );
        }
        println!(" ---");
        let (v_mean, v_min, v_max) = summary.volume;
        println!("Mean: {}  Vol.: {:6.1}", format_cell(&summary.mean), v_mean);
        println!(" Min: {}  Vol.: {:6.1}", format_cell(&summary.min), v_min);
        println!(" Max: {}  Vol.: {:6.1}", format_cell(&summary.max), v_max);
    }
    println!();
    println!("Linkage method = {}", config.cluster.method);
    println!("Cutoff distance = {:.4}", result.grouping.threshold);
    println!("Distance metric = {}", config.metric);
    if result.grouping.ignored_clusters > 0 {
        println!(
            "Ignored {} clusters ({} data sets) with {} or fewer items",
            result.grouping.ignored_clusters,
            result.grouping.ignored_observations,
            config.cluster.min_size
        );
    }
    println!();
}

/// Writes the records of each cluster to its own cells.yaml subset.
fn write_clusters(
    records: &[CellRecord],
    linkage: &CellLinkage,
    result: &CellClusterResult,
    out_dir: &Path,
) -> Result<Vec<(usize, PathBuf)>> {
    let mut written = Vec::with_capacity(result.summaries.len());
    for summary in &result.summaries {
        let subset: Vec<CellRecord> = linkage
            .source_members(summary)
            .into_iter()
            .map(|i| records[i].clone())
            .collect();
        let path = out_dir.join(CellsYamlFile::cluster_file_name(summary.label, subset.len()));
        CellsYamlFile::write_to_path(&subset, &path).map_err(|e| CliError::parsing(&path, e))?;
        written.push((summary.label, path));
    }
    Ok(written)
}

fn format_estimate(estimate: &CellEstimate) -> String {
    let row = |values: &[f64; 6]| values.iter().map(|v| format!("{v:8.3}")).collect::<String>();
    let named: Vec<String> = PARAMETER_NAMES
        .iter()
        .zip(estimate.constants.iter().zip(&estimate.esds))
        .map(|(name, (c, e))| format!("{name}={c:.3}({e:.3})"))
        .collect();
    let constants: Vec<String> = estimate.constants.iter().map(|v| format!("{v:.3}")).collect();

    format!(
        "\nWeighted mean of histogram analysis\n---\nUnit cell parameters: {}\nUnit cell esds:       {}\n\n{}\n\nUNIT_CELL_CONSTANTS= {}\n",
        row(&estimate.constants),
        row(&estimate.esds),
        named.join(", "),
        constants.join(" ")
    )
}
