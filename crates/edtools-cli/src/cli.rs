use clap::{Args, Parser, Subcommand};
use edtools::engine::config::{CellMetric, LinkageMethod};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Stef Smeets",
    version,
    about = "edtools - Consolidation, clustering and merging of serial electron-diffraction datasets processed with XDS.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Number of worker threads used for batch jobs (default: 4).
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Path to a configuration file in TOML format.
    /// Defaults to `config.toml` in the user configuration directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override a configuration value, e.g. `-S clustering.method=ward`.
    /// Can be used multiple times.
    #[arg(
        short = 'S',
        long = "set",
        value_name = "KEY=VALUE",
        global = true,
        num_args(1)
    )]
    pub set_values: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consolidate the CORRECT.LP reports of a batch into cell lists and a file list.
    Extract(ExtractArgs),
    /// Estimate a common unit cell, or cluster the unit cells of a batch.
    FindCell(FindCellArgs),
    /// Cluster datasets by the correlations reported in XSCALE.LP.
    Cluster(ClusterArgs),
    /// Apply the same edits to every XDS.INP file found.
    UpdateXds(UpdateXdsArgs),
    /// Write XSCALE.INP and XDSCONV.INP for merging a batch.
    MakeXscale(MakeXscaleArgs),
}

/// Arguments for the `extract` subcommand.
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// CORRECT.LP files or directories to search recursively (default: current directory).
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Only use reports located in a directory with this name (e.g. SMV_reprocessed).
    #[arg(long = "match", value_name = "DIR")]
    pub match_dir: Option<String>,

    /// Copy the accepted XDS_ASCII.HKL files into the current directory.
    #[arg(short, long)]
    pub gather: bool,

    /// Read the unrefined cells from XPARM.XDS instead of CORRECT.LP and write
    /// cells_xparm.yaml (for a first clustering pass before integration).
    #[arg(short = 'x', long, conflicts_with = "gather")]
    pub xparm: bool,
}

/// Arguments for the `find-cell` subcommand.
#[derive(Args, Debug)]
pub struct FindCellArgs {
    /// Cell list written by `extract` (cells.yaml, cells_xparm.yaml or CELLPARM.INP).
    #[arg(value_name = "FILE", default_value = "cells.yaml")]
    pub input: PathBuf,

    /// Cluster the unit cells instead of estimating a single cell.
    #[arg(short, long)]
    pub cluster: bool,

    /// Cutoff distance for the clusters (default: 0.7 x largest merge distance).
    #[arg(short, long, value_name = "FLOAT")]
    pub distance: Option<f64>,

    /// Linkage method: single, average, complete, median, weighted, centroid or ward.
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<LinkageMethod>,

    /// Distance between unit cells: euclidean, lcv or volume.
    #[arg(short = 't', long, value_name = "METRIC")]
    pub metric: Option<CellMetric>,

    /// Use the refined (Bravais lattice) cells instead of the raw cells.
    #[arg(short = 'l', long)]
    pub use_bravais_lattice: bool,

    /// Express the angles in radians before a euclidean comparison.
    #[arg(short = 'r', long, conflicts_with = "sine")]
    pub radians: bool,

    /// Use the sine of the angles before a euclidean comparison.
    #[arg(long)]
    pub sine: bool,

    /// Leave out clusters with this many members or fewer.
    #[arg(short = 's', long, value_name = "NUM")]
    pub min_size: Option<usize>,

    /// Print the dendrogram and the cut it implies, then exit.
    #[arg(short = 'g', long)]
    pub dendrogram: bool,
}

/// Arguments for the `cluster` subcommand.
#[derive(Args, Debug)]
pub struct ClusterArgs {
    /// Merge report holding the correlations between the input datasets.
    #[arg(value_name = "FILE", default_value = "XSCALE.LP")]
    pub input: PathBuf,

    /// Cutoff distance for the clusters (default: 0.7 x largest merge distance).
    #[arg(short, long, value_name = "FLOAT")]
    pub distance: Option<f64>,

    /// Linkage method: single, average, complete, median, weighted, centroid or ward.
    #[arg(short, long, value_name = "METHOD")]
    pub method: Option<LinkageMethod>,

    /// Leave out clusters with this many members or fewer.
    #[arg(short = 's', long, value_name = "NUM")]
    pub min_size: Option<usize>,

    /// Resolution range used for scaling each cluster (default: 20.0 0.8).
    #[arg(short, long, num_args = 2, value_names = ["DMAX", "DMIN"])]
    pub resolution: Option<Vec<f64>>,

    /// I/sigma cutoff used for scaling each cluster (default: 2).
    #[arg(short = 'i', long = "ioversigma", value_name = "FLOAT")]
    pub snrc: Option<f64>,

    /// Print the dendrogram and the cut it implies, then exit.
    #[arg(short = 'g', long)]
    pub dendrogram: bool,
}

/// Arguments for the `update-xds` subcommand.
#[derive(Args, Debug)]
pub struct UpdateXdsArgs {
    /// XDS.INP files or directories to search recursively (default: current directory).
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Only edit files located in a directory with this name.
    #[arg(long = "match", value_name = "DIR")]
    pub match_dir: Option<String>,

    /// New space group number.
    #[arg(short, long, value_name = "NUM")]
    pub spgr: Option<u16>,

    /// New unit cell constants.
    #[arg(short, long, num_args = 6, value_names = ["A", "B", "C", "AL", "BE", "GA"])]
    pub cell: Option<Vec<f64>>,

    /// Comment out the cell and space group keywords.
    #[arg(long)]
    pub comment: bool,

    /// New MAX_CELL_AXIS_ERROR and MAX_CELL_ANGLE_ERROR.
    #[arg(short = 'e', long, num_args = 2, value_names = ["AXIS", "ANGLE"])]
    pub max_error: Option<Vec<f64>>,

    /// New OVERLOAD value.
    #[arg(short, long, value_name = "NUM")]
    pub overload: Option<u64>,

    /// New INCLUDE_RESOLUTION_RANGE.
    #[arg(short, long, num_args = 2, value_names = ["LOW", "HIGH"])]
    pub resolution: Option<Vec<f64>>,

    /// Drop the first and last frames from the frame ranges.
    #[arg(long)]
    pub cut_frames: bool,

    /// New WFAC1 value.
    #[arg(short, long, value_name = "FLOAT")]
    pub wfac1: Option<f64>,

    /// Line added verbatim at the end of the file.
    #[arg(short, long, value_name = "LINE")]
    pub append: Option<String>,

    /// Jobs written to the JOB= line (e.g. `--jobs CORRECT`).
    #[arg(long, num_args = 1.., value_name = "JOB")]
    pub jobs: Vec<String>,
}

/// Arguments for the `make-xscale` subcommand.
#[derive(Args, Debug)]
pub struct MakeXscaleArgs {
    /// cells.yaml files and/or XDS_ASCII.HKL files
    /// (default: cells.yaml, or every *XDS_ASCII.HKL in the current directory).
    #[arg(value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Space group number (default: most common lowest-symmetry space group).
    #[arg(short, long, value_name = "NUM")]
    pub spgr: Option<u16>,

    /// Unit cell constants (default: mean unit cell).
    #[arg(short, long, num_args = 6, value_names = ["A", "B", "C", "AL", "BE", "GA"])]
    pub cell: Option<Vec<f64>>,

    /// Resolution range for every input file (default: 20.0 0.8).
    #[arg(short, long, num_args = 2, value_names = ["DMAX", "DMIN"])]
    pub resolution: Option<Vec<f64>>,
}

/// Converts a clap multi-value into a fixed-size array.
pub fn fixed<const N: usize>(values: &[f64]) -> Option<[f64; N]> {
    values.try_into().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn find_cell_parses_clustering_options() {
        let cli = Cli::parse_from([
            "edtools", "find-cell", "-c", "-m", "ward", "-t", "lcv", "-d", "0.5", "-s", "2",
        ]);
        let Commands::FindCell(args) = cli.command else {
            panic!("expected find-cell");
        };
        assert!(args.cluster);
        assert_eq!(args.method, Some(LinkageMethod::Ward));
        assert_eq!(args.metric, Some(CellMetric::Lcv));
        assert_eq!(args.distance, Some(0.5));
        assert_eq!(args.min_size, Some(2));
        assert_eq!(args.input, PathBuf::from("cells.yaml"));
    }

    #[test]
    fn radians_and_sine_are_exclusive() {
        assert!(Cli::try_parse_from(["edtools", "find-cell", "-r", "--sine"]).is_err());
    }

    #[test]
    fn global_flags_are_accepted_after_the_subcommand() {
        let cli = Cli::parse_from([
            "edtools",
            "cluster",
            "-r",
            "20",
            "1.0",
            "-vv",
            "-j",
            "2",
            "-S",
            "scaling.snrc=3",
        ]);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.threads, Some(2));
        assert_eq!(cli.set_values, vec!["scaling.snrc=3".to_string()]);
        let Commands::Cluster(args) = cli.command else {
            panic!("expected cluster");
        };
        assert_eq!(args.resolution, Some(vec![20.0, 1.0]));
        assert_eq!(args.input, PathBuf::from("XSCALE.LP"));
    }

    #[test]
    fn cell_override_needs_six_values() {
        assert!(Cli::try_parse_from(["edtools", "make-xscale", "-c", "1", "2", "3"]).is_err());
        let cli = Cli::parse_from(["edtools", "make-xscale", "-c", "10", "11", "12", "90", "95", "90"]);
        let Commands::MakeXscale(args) = cli.command else {
            panic!("expected make-xscale");
        };
        let cell: Option<[f64; 6]> = args.cell.as_deref().and_then(fixed);
        assert_eq!(cell, Some([10.0, 11.0, 12.0, 90.0, 95.0, 90.0]));
    }
}
