use super::CommandContext;
use crate::cli::ClusterArgs;
use crate::config;
use crate::error::{CliError, Result};
use edtools::core::io::traits::ReportFile;
use edtools::core::io::xscale_lp::XscaleLpFile;
use edtools::core::models::merge::{MergeReport, MergedStatistics};
use edtools::engine::grouping::CorrelationGroupSummary;
use edtools::engine::progress::{Progress, ProgressReporter};
use edtools::engine::threshold::ThresholdSelector;
use edtools::workflows::correlation_clustering::{self, ClusterOutcome};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::info;

const SORT_KEY: &str = "Completeness";

/// One cluster with whatever scaling results are already on disk.
struct ClusterRow<'a> {
    summary: &'a CorrelationGroupSummary,
    outcome: ClusterOutcome,
}

pub fn run(args: ClusterArgs, ctx: &CommandContext) -> Result<()> {
    run_in(args, ctx, Path::new("."))
}

pub fn run_in(args: ClusterArgs, ctx: &CommandContext, out_dir: &Path) -> Result<()> {
    let report = XscaleLpFile::read_from_path(&args.input)
        .map_err(|e| CliError::parsing(&args.input, e))?;
    let mut merge = report.merge;
    resolve_input_files(&mut merge, args.input.parent().unwrap_or(Path::new("")));

    let config = config::correlation_cluster_config(&ctx.config, &args)?;
    let options = config::scaling_options(&ctx.config, &args)?;

    if args.dendrogram {
        let linkage = correlation_clustering::link(&merge, config.method)?;
        let selector = ThresholdSelector::new(&linkage.tree, config.cutoff);
        print!("{}", selector.render());
        return Ok(());
    }

    let (_, result) = correlation_clustering::run(&merge, &config)?;
    let threshold = result.grouping.threshold;
    info!(
        clusters = result.summaries.len(),
        threshold, "Preparing cluster directories."
    );

    let progress = ctx.progress();
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    reporter.report(Progress::PhaseStart {
        name: "Writing cluster inputs",
    });
    let written = ctx.pool.run(&result.summaries, &reporter, |summary, _| {
        correlation_clustering::write_cluster_inputs(
            out_dir,
            summary,
            &merge,
            threshold,
            config.method,
            &options,
        )
    });
    reporter.report(Progress::PhaseFinish);

    let mut rows = Vec::with_capacity(written.len());
    let mut first_error = None;
    for (summary, outcome) in result.summaries.iter().zip(written) {
        match outcome {
            Ok(dir) => {
                println!("Wrote XSCALE.INP for cluster {} to {}", summary.label, dir.display());
                rows.push(ClusterRow {
                    summary,
                    outcome: correlation_clustering::collect_cluster_outcome(&dir),
                });
            }
            Err(e) => {
                println!("Cluster {}: {}", summary.label, e);
                first_error.get_or_insert(e);
            }
        }
    }
    if rows.is_empty() {
        if let Some(e) = first_error {
            return Err(e.into());
        }
    }

    print!("{}", format_results(&rows, threshold, &config.method.to_string()));
    Ok(())
}

/// Makes relative reflection file names relative to the report's directory.
fn resolve_input_files(merge: &mut MergeReport, base: &Path) {
    for name in merge.filenames.values_mut() {
        let path = PathBuf::from(name.as_str());
        if path.is_relative() {
            *name = base.join(path).display().to_string();
        }
    }
}

fn quality_flags(stats: &MergedStatistics) -> (char, char, char) {
    let flag = |good: bool| if good { '*' } else { ' ' };
    (
        flag(stats.cc_half > 90.0),
        flag(stats.completeness > 80.0),
        flag(stats.r_meas < 0.30),
    )
}

fn format_results(rows: &[ClusterRow], threshold: f64, method: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\nClustering results\n");
    let _ = writeln!(out, "Cutoff distance: {:.3}", threshold);
    let _ = writeln!(
        out,
        "Equivalent CC(I): {:.3}",
        (1.0 - threshold * threshold).max(0.0).sqrt()
    );
    let _ = writeln!(out, "Method: {}\n", method);
    let _ = writeln!(
        out,
        "  #  N_clust   CC(1/2)    N_obs   N_uniq   N_poss    Compl.   N_comp    R_meas    d_min  i/sigma  | Lauegr.  prob. conf.  idx"
    );

    let mut sorted: Vec<&ClusterRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        let key = |r: &ClusterRow| r.outcome.statistics.as_ref().map(|s| s.completeness);
        match (key(a), key(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.summary.label.cmp(&b.summary.label),
        }
    });

    for row in sorted {
        let label = row.summary.label;
        let size = row.summary.members.len();
        let Some(stats) = &row.outcome.statistics else {
            let _ = writeln!(
                out,
                "{:3}  {:5}   (not scaled yet, mean CC {:.3})",
                label, size, row.summary.mean_cc
            );
            continue;
        };
        let (p1, p2, p3) = quality_flags(stats);
        let mut stars = [p1, p2, p3];
        stars.sort_by(|a, b| b.cmp(a));
        let p0: String = stars.iter().collect();
        let _ = write!(
            out,
            "{:3}{} {:5} {:8.1}{} {:8} {:8} {:8} {:8.1}{} {:8} {:8.3}{} {:8.2} {:8.2}",
            label,
            p0,
            size,
            stats.cc_half,
            p1,
            stats.n_obs,
            stats.n_unique,
            stats.n_possible,
            stats.completeness,
            p2,
            stats.n_compared,
            stats.r_meas,
            p3,
            stats.d_min,
            stats.i_over_sigma
        );
        if let Some(p) = &row.outcome.pointless {
            let _ = write!(
                out,
                "  | {:>7} {:5.2} {:6.2}  {}",
                p.laue_group.as_deref().unwrap_or("-"),
                p.probability.unwrap_or(f64::NAN),
                p.confidence.unwrap_or(f64::NAN),
                p.reindex_operator.as_deref().unwrap_or("")
            );
        }
        out.push('\n');
    }
    let _ = writeln!(out, "(Sorted by '{}')\n", SORT_KEY);

    for row in rows {
        let members: Vec<String> = row.summary.members.iter().map(|m| m.to_string()).collect();
        let _ = writeln!(out, "Cluster {}: [{}]", row.summary.label, members.join(", "));
    }
    out
}
