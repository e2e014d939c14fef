use crate::core::io::cellparm::CellparmEntry;
use crate::core::io::cells_table::CellRow;
use crate::core::io::cells_yaml::CellRecord;
use crate::core::io::correct_lp::CorrectLpFile;
use crate::core::io::traits::ReportFile;
use crate::core::io::xds_inp::read_rotation_range;
use crate::core::io::xparm::XparmFile;
use crate::core::io::filelist::{FileListEntry, GatherCriteria, gathered_name};
use crate::core::models::observation::IntegrationReport;
use crate::core::symmetry::{LatticeScore, SpaceGroupTable, rank_lattices};
use crate::engine::batch::BatchPool;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Parsed integration reports of one batch, in input order.
#[derive(Debug, Clone)]
pub struct Consolidation {
    pub reports: Vec<IntegrationReport>,
    /// Reports that could not be parsed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    /// Bravais lattices ranked by total reflection count.
    pub lattices: Vec<LatticeScore>,
}

/// Parses every CORRECT.LP on the batch pool. A report that fails to parse
/// is logged and left out; the rest of the batch is unaffected.
#[instrument(skip_all, name = "consolidate_workflow")]
pub fn run(
    paths: &[PathBuf],
    table: &SpaceGroupTable,
    pool: &BatchPool,
    reporter: &ProgressReporter,
) -> Consolidation {
    reporter.report(Progress::PhaseStart {
        name: "Parsing reports",
    });
    info!(files = paths.len(), workers = pool.workers(), "Parsing integration reports.");

    let outcomes = pool.run(paths, reporter, |path, _| CorrectLpFile::read_report(path));

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Ok(report) => reports.push(report),
            Err(e) => failures.push((path.clone(), e.to_string())),
        }
    }
    reporter.report(Progress::PhaseFinish);

    let lattices = rank_lattices(
        table,
        reports.iter().map(|r| (r.space_group, r.total.n_obs as f64)),
    );
    info!(
        parsed = reports.len(),
        failed = failures.len(),
        "Consolidation complete."
    );

    Consolidation {
        reports,
        failures,
        lattices,
    }
}

impl Consolidation {
    pub fn cell_records(&self) -> Vec<CellRecord> {
        self.numbered()
            .map(|(i, r)| CellRecord::from_report(i, r))
            .collect()
    }

    pub fn cell_rows(&self) -> Vec<CellRow> {
        self.numbered().map(|(i, r)| CellRow::from_report(i, r)).collect()
    }

    /// CELLPARM.INP entries using the unrefined cells where available.
    pub fn cellparm_entries(&self) -> Vec<CellparmEntry> {
        self.reports
            .iter()
            .map(|r| CellparmEntry {
                source: Some(r.source.display().to_string()),
                cell: r.raw_cell.unwrap_or(r.cell),
                weight: r.total.n_obs,
            })
            .collect()
    }

    /// Datasets good enough to merge. With `gather` set the entries refer to
    /// local copies named after the dataset number.
    pub fn file_list(&self, criteria: &GatherCriteria, gather: bool) -> Vec<FileListEntry> {
        self.numbered()
            .filter(|(_, r)| criteria.accepts(r))
            .map(|(number, r)| FileListEntry {
                number,
                file: if gather {
                    PathBuf::from(gathered_name(number))
                } else {
                    r.source.with_file_name("XDS_ASCII.HKL")
                },
                resolution: r.resolution_range.unwrap_or((0.0, r.outer_shell.1)),
                source: r.source.clone(),
            })
            .collect()
    }

    /// Lowest-symmetry space group of the best supported lattice.
    pub fn most_likely_space_group(&self) -> Option<u16> {
        self.lattices.first().map(|l| l.lowest_space_group)
    }

    fn numbered(&self) -> impl Iterator<Item = (usize, &IntegrationReport)> {
        self.reports.iter().enumerate().map(|(i, r)| (i + 1, r))
    }
}

/// Cell list of a batch that has only been indexed so far.
#[derive(Debug, Clone, Default)]
pub struct IndexingCells {
    pub records: Vec<CellRecord>,
    pub failures: Vec<(PathBuf, String)>,
}

/// Reads the unrefined cell of every XPARM.XDS and the rotation range from
/// the XDS.INP next to it. Datasets are numbered in input order, skipping
/// failures.
#[instrument(skip_all, name = "indexing_cells_workflow")]
pub fn indexing_cells(
    paths: &[PathBuf],
    pool: &BatchPool,
    reporter: &ProgressReporter,
) -> IndexingCells {
    reporter.report(Progress::PhaseStart {
        name: "Reading indexing results",
    });
    let outcomes = pool.run(paths, reporter, |path, _| {
        let cell = XparmFile::read_from_path(path).map_err(|e| EngineError::input(path, e))?;
        let xds_inp = path.with_file_name("XDS.INP");
        let rotation = read_rotation_range(&xds_inp).map_err(|e| EngineError::input(&xds_inp, e))?;
        Ok::<_, EngineError>((cell, rotation))
    });
    reporter.report(Progress::PhaseFinish);

    let mut cells = IndexingCells::default();
    for (path, outcome) in paths.iter().zip(outcomes) {
        match outcome {
            Ok((cell, rotation)) => {
                let directory = path
                    .parent()
                    .map(|d| d.display().to_string())
                    .unwrap_or_default();
                let number = cells.records.len() + 1;
                cells
                    .records
                    .push(CellRecord::from_indexing(number, directory, cell, rotation));
            }
            Err(e) => cells.failures.push((path.clone(), e.to_string())),
        }
    }
    info!(
        parsed = cells.records.len(),
        failed = cells.failures.len(),
        "Indexing results collected."
    );
    cells
}

/// Copies the reflection file next to each gathered entry's report into
/// `destination`. Returns the number of files copied.
pub fn gather_reflection_files(entries: &[FileListEntry], destination: &Path) -> usize {
    let mut copied = 0;
    for entry in entries {
        let src = entry.source.with_file_name("XDS_ASCII.HKL");
        let dst = destination.join(&entry.file);
        match fs::copy(&src, &dst) {
            Ok(_) => copied += 1,
            Err(e) => warn!("Could not copy {} to {}: {}", src.display(), dst.display(), e),
        }
    }
    copied
}
