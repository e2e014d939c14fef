use super::{CommandContext, format_cell};
use crate::cli::ExtractArgs;
use crate::error::{CliError, Result};
use crate::utils::discovery;
use edtools::core::io::cellparm::CellparmFile;
use edtools::core::io::cells_table::write_cells_table;
use edtools::core::io::cells_yaml::CellsYamlFile;
use edtools::core::io::filelist::write_file_list;
use edtools::core::io::traits::RecordFile;
use edtools::core::models::observation::{IntegrationReport, ShellStatistics};
use edtools::core::symmetry::SpaceGroupTable;
use edtools::engine::progress::ProgressReporter;
use edtools::workflows::consolidate::{self, Consolidation};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

const CELLS_YAML: &str = "cells.yaml";
const CELLS_CSV: &str = "cells.csv";
const CELLPARM_INP: &str = "CELLPARM.INP";
const FILELIST: &str = "filelist.txt";

pub fn run(args: ExtractArgs, ctx: &CommandContext) -> Result<()> {
    run_in(args, ctx, Path::new("."))
}

/// Consolidates the reports and writes every output file into `out_dir`.
pub fn run_in(args: ExtractArgs, ctx: &CommandContext, out_dir: &Path) -> Result<()> {
    if args.xparm {
        return extract_indexing(&args, ctx, out_dir);
    }
    let paths = discovery::find_files(&args.paths, "CORRECT.LP", args.match_dir.as_deref());
    if paths.is_empty() {
        return Err(CliError::Argument("no CORRECT.LP files found".to_string()));
    }

    let table = SpaceGroupTable::standard();
    let progress = ctx.progress();
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let consolidation = consolidate::run(&paths, &table, &ctx.pool, &reporter);

    for (path, e) in &consolidation.failures {
        println!("Skipped {}: {}", path.display(), e);
    }
    if consolidation.reports.is_empty() {
        return Err(CliError::Argument(
            "none of the CORRECT.LP files could be parsed".to_string(),
        ));
    }

    for (i, report) in consolidation.reports.iter().enumerate() {
        println!("{}", cell_info(i + 1, report));
    }
    print!("{}", info_header());
    for (i, report) in consolidation.reports.iter().enumerate() {
        print!("{}", integration_info(i + 1, report));
    }

    write_outputs(&consolidation, ctx, args.gather, out_dir)?;

    println!("\nMost likely lattice types:");
    for (n, lattice) in consolidation.lattices.iter().enumerate() {
        println!(
            "{:3} Lattice type `{}` (spgr: {:3}) was found {:3} times (score: {:7})",
            n + 1,
            lattice.lattice,
            lattice.lowest_space_group,
            lattice.count,
            lattice.score
        );
    }
    println!("\n ** the score corresponds to the total number of indexed reflections.");
    Ok(())
}

fn extract_indexing(args: &ExtractArgs, ctx: &CommandContext, out_dir: &Path) -> Result<()> {
    let paths = discovery::find_files(&args.paths, "XPARM.XDS", args.match_dir.as_deref());
    if paths.is_empty() {
        return Err(CliError::Argument("no XPARM.XDS files found".to_string()));
    }

    let progress = ctx.progress();
    let reporter = ProgressReporter::with_callback(progress.get_callback());
    let cells = consolidate::indexing_cells(&paths, &ctx.pool, &reporter);
    for (path, e) in &cells.failures {
        println!("Skipped {}: {}", path.display(), e);
    }
    if cells.records.is_empty() {
        return Err(CliError::Argument(
            "none of the XPARM.XDS files could be read".to_string(),
        ));
    }

    let path = out_dir.join(CellsYamlFile::INDEXING_FILE_NAME);
    CellsYamlFile::write_to_path(&cells.records, &path).map_err(|e| CliError::parsing(&path, e))?;
    println!(
        "Wrote {} cells to file {}",
        cells.records.len(),
        CellsYamlFile::INDEXING_FILE_NAME
    );
    Ok(())
}

fn write_outputs(
    consolidation: &Consolidation,
    ctx: &CommandContext,
    gather: bool,
    out_dir: &Path,
) -> Result<()> {
    let count = consolidation.reports.len();

    let path = out_dir.join(CELLS_CSV);
    write_cells_table(&path, &consolidation.cell_rows()).map_err(|e| CliError::parsing(&path, e))?;
    println!("Wrote {} cells to file {}", count, CELLS_CSV);

    let path = out_dir.join(CELLS_YAML);
    CellsYamlFile::write_to_path(&consolidation.cell_records(), &path)
        .map_err(|e| CliError::parsing(&path, e))?;
    println!("Wrote {} cells to file {}", count, CELLS_YAML);

    let path = out_dir.join(CELLPARM_INP);
    CellparmFile::write_to_path(&consolidation.cellparm_entries(), &path)
        .map_err(|e| CliError::parsing(&path, e))?;
    println!("Wrote file {}", CELLPARM_INP);

    let criteria = &ctx.config.gather;
    let entries = consolidation.file_list(criteria, gather);
    if gather {
        let copied = consolidate::gather_reflection_files(&entries, out_dir);
        if copied < entries.len() {
            warn!("Only {} of {} reflection files were gathered", copied, entries.len());
        }
        info!(copied, "Gathered reflection files.");
    }
    let mut writer = BufWriter::new(File::create(out_dir.join(FILELIST))?);
    write_file_list(&mut writer, &entries)?;
    writer.flush()?;
    println!(
        "Wrote {} entries to file {} (completeness > {}%, CC(1/2) > {}%)",
        entries.len(),
        FILELIST,
        criteria.min_completeness,
        criteria.min_cc_half
    );
    Ok(())
}

fn cell_info(sequence: usize, report: &IntegrationReport) -> String {
    format!(
        "{:4}: {}\nSpgr {:4} - Cell {} - Vol {:10.2}",
        sequence,
        report.directory().display(),
        report.space_group,
        format_cell(report.cell.params()),
        report.cell.volume()
    )
}

fn info_header() -> String {
    format!(
        "   #   dmax  dmin    ntot   nuniq   compl   i/sig   rmeas CC(1/2)     ISa   B(ov)\n{}\n",
        "-".repeat(81)
    )
}

fn shell_columns(stats: &ShellStatistics) -> String {
    format!(
        "{:8}{:8}{:8.1}{:8.2}{:8.1}{:8.1}",
        stats.n_obs,
        stats.n_unique,
        stats.completeness,
        stats.i_over_sigma,
        stats.r_meas,
        stats.cc_half
    )
}

fn optional(value: Option<f64>) -> String {
    value.map_or_else(|| format!("{:>8}", "-"), |v| format!("{v:8.2}"))
}

/// Overall statistics row followed by the outer-shell row.
fn integration_info(sequence: usize, report: &IntegrationReport) -> String {
    let (dmax, dmin) = report.resolution_range.unwrap_or((0.0, report.outer_shell.1));
    let mut s = format!(
        "{:4} {:6.2}{:6.2}{}{}{}  # {}\n",
        sequence,
        dmax,
        dmin,
        shell_columns(&report.total),
        optional(report.isa),
        optional(report.b_overall),
        report.source.display()
    );
    if let Some(outer) = report.outer_statistics() {
        let (dmax, dmin) = report.outer_shell;
        s.push_str(&format!("   - {:6.2}{:6.2}{}\n", dmax, dmin, shell_columns(outer)));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::context;
    use edtools::core::io::cells_yaml::CellRecord;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    pub(crate) const CORRECT_LP: &str = "\
 DATA_RANGE=       1     121
 OSCILLATION_RANGE=  0.500000
 SPACE_GROUP_NUMBER=    5
 UNIT_CELL_CONSTANTS=    38.65    12.11    16.92  90.000 114.060  90.000
 CELL   38.71   12.13   16.95  90.000 114.100  90.000 as used by INTEGRATE

     a        b          ISa
 1.120E+00  4.500E-03    9.93

   WILSON LINE (using all data) : A=  -2.311 B=   1.523 CORRELATION=  0.98

 RESOLUTION RANGE  I/Sigma  Chi^2  R-FACTOR  R-FACTOR  NUMBER ACCEPTED REJECTED
   --------------------------------------------------------------------------
   20.00  0.80   8.3   1.0   12.1  13.3   3411   3002   12

 SUBSET OF INTENSITY DATA WITH SIGNAL/NOISE >= -3.0 AS FUNCTION OF RESOLUTION
 RESOLUTION     NUMBER OF REFLECTIONS    COMPLETENESS R-FACTOR  R-FACTOR COMPARED I/SIGMA   R-meas  CC(1/2)  Anomal  SigAno   Nano
   LIMIT     OBSERVED  UNIQUE  POSSIBLE     OF DATA   observed  expected                                      Corr

     2.37         889     366       390       93.8%       8.9%      9.2%      878    9.27     10.7%    99.2*    -7    0.583      75
     1.68        1520     635       710       89.4%      14.2%     14.9%     1501    5.40     17.1%    97.0*     2    0.612     141
    total        5261    2350      2960       79.4%      16.6%     17.0%     5111    4.92     19.9%    98.9*    -2    0.612     416
";

    fn dataset(root: &Path, name: &str, report: &str) -> PathBuf {
        let dir = root.join(name).join("SMV");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("CORRECT.LP"), report).unwrap();
        fs::write(dir.join("XDS_ASCII.HKL"), name).unwrap();
        dir
    }

    fn args(root: &Path, gather: bool) -> ExtractArgs {
        ExtractArgs {
            paths: vec![root.to_path_buf()],
            match_dir: Some("SMV".to_string()),
            gather,
            xparm: false,
        }
    }

    #[test]
    fn writes_cell_lists_and_file_list() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        dataset(data.path(), "exp_001", CORRECT_LP);
        dataset(data.path(), "exp_002", CORRECT_LP);
        dataset(data.path(), "exp_003", "not a report\n");

        run_in(args(data.path(), false), &context(), out.path()).unwrap();

        let records: Vec<CellRecord> =
            CellsYamlFile::read_from_path(out.path().join(CELLS_YAML)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].number, 1);
        assert_eq!(records[1].space_group, 5);
        assert_eq!(records[0].weight, 5261);

        let cellparm = CellparmFile::read_from_path(out.path().join(CELLPARM_INP)).unwrap();
        assert_eq!(cellparm.len(), 2);
        assert_eq!(cellparm[0].weight, 5261);

        let filelist = fs::read_to_string(out.path().join(FILELIST)).unwrap();
        assert_eq!(filelist.lines().count(), 2);
        assert!(filelist.contains("XDS_ASCII.HKL"));
        assert!(out.path().join(CELLS_CSV).is_file());
    }

    #[test]
    fn gather_copies_accepted_reflection_files() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        dataset(data.path(), "exp_001", CORRECT_LP);

        run_in(args(data.path(), true), &context(), out.path()).unwrap();

        let copied = fs::read_to_string(out.path().join("01_XDS_ASCII.HKL")).unwrap();
        assert_eq!(copied, "exp_001");
        let filelist = fs::read_to_string(out.path().join(FILELIST)).unwrap();
        assert!(filelist.contains("01_XDS_ASCII.HKL"));
    }

    #[test]
    fn nothing_found_is_an_argument_error() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let result = run_in(args(data.path(), false), &context(), out.path());
        assert!(matches!(result, Err(CliError::Argument(_))));
    }

    #[test]
    fn integration_rows_include_the_outer_shell() {
        let data = tempdir().unwrap();
        let dir = dataset(data.path(), "exp_001", CORRECT_LP);
        let report =
            edtools::core::io::correct_lp::CorrectLpFile::read_report(&dir.join("CORRECT.LP"))
                .unwrap();

        let text = integration_info(3, &report);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("   3  20.00  0.80    5261    2350"));
        assert!(lines[1].starts_with("   -   2.37  1.68    1520     635"));
        assert!(cell_info(3, &report).contains("Spgr    5 - Cell      38.65"));
    }

    const XPARM: &str = "\
 XPARM.XDS    VERSION Jan 10, 2022  BUILT=20220220
     1        0.0000    0.5000  0.999998  0.001852 -0.000385
       0.025079       0.000000       0.000000      39.872723
     5    38.7102    12.1287    16.9531  90.000 114.104  90.000
";

    #[test]
    fn xparm_mode_writes_indexing_cell_list_only() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let dir = data.path().join("exp_001").join("SMV");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("XPARM.XDS"), XPARM).unwrap();
        fs::write(dir.join("XDS.INP"), "DATA_RANGE= 1 81\nOSCILLATION_RANGE= 0.5\n").unwrap();

        let mut a = args(data.path(), false);
        a.xparm = true;
        run_in(a, &context(), out.path()).unwrap();

        let records =
            CellsYamlFile::read_from_path(out.path().join(CellsYamlFile::INDEXING_FILE_NAME)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rotation_range, Some(40.5));
        assert_eq!(records[0].space_group, 1);
        assert_eq!(records[0].cell(true).unwrap().b(), 12.1287);
        assert!(!out.path().join(CELLS_YAML).exists());
        assert!(!out.path().join(FILELIST).exists());
    }

    #[test]
    fn xparm_mode_without_files_is_an_argument_error() {
        let data = tempdir().unwrap();
        let out = tempdir().unwrap();
        let mut a = args(data.path(), false);
        a.xparm = true;
        let result = run_in(a, &context(), out.path());
        assert!(matches!(result, Err(CliError::Argument(_))));
    }
}
