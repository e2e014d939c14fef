use super::cell::UnitCell;
use std::path::{Path, PathBuf};

/// Quality statistics of one resolution shell (or of the whole dataset) as
/// reported by the integration step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellStatistics {
    /// Total number of observed reflections.
    pub n_obs: u64,
    /// Number of unique reflections.
    pub n_unique: u64,
    /// Completeness in percent.
    pub completeness: f64,
    /// Mean I/sigma(I).
    pub i_over_sigma: f64,
    /// R_meas in percent.
    pub r_meas: f64,
    /// CC(1/2) in percent.
    pub cc_half: f64,
}

/// Everything extracted from a single integration report (CORRECT.LP).
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrationReport {
    /// Path of the parsed report.
    pub source: PathBuf,
    /// The refined cell.
    pub cell: UnitCell,
    /// The unrefined cell as used by INTEGRATE, if reported.
    pub raw_cell: Option<UnitCell>,
    pub space_group: u16,
    /// Low/high resolution limits of the processed data.
    pub resolution_range: Option<(f64, f64)>,
    /// Total rotation covered by the data in degrees.
    pub rotation_range: Option<f64>,
    pub isa: Option<f64>,
    pub b_overall: Option<f64>,
    /// Accepted shells keyed by their high-resolution limit, ordered from low to high resolution.
    pub shells: Vec<(f64, ShellStatistics)>,
    pub total: ShellStatistics,
    /// `(d_max, d_min)` limits of the highest accepted resolution shell.
    pub outer_shell: (f64, f64),
}

impl IntegrationReport {
    /// Directory that holds the report; used as the dataset identifier.
    pub fn directory(&self) -> &Path {
        self.source.parent().unwrap_or(&self.source)
    }

    /// Statistics of the outermost accepted shell.
    pub fn outer_statistics(&self) -> Option<&ShellStatistics> {
        self.shells
            .iter()
            .find(|(d, _)| (*d - self.outer_shell.1).abs() < 1e-9)
            .map(|(_, s)| s)
    }

    /// Collapses the report into the clustering model.
    ///
    /// The raw cell is preferred when `use_raw_cell` is set and the report
    /// contains one; the weight is the total number of observed reflections.
    pub fn to_observation(&self, use_raw_cell: bool) -> Observation {
        let cell = if use_raw_cell {
            self.raw_cell.unwrap_or(self.cell)
        } else {
            self.cell
        };
        Observation {
            id: self.directory().to_string_lossy().into_owned(),
            cell,
            space_group: self.space_group,
            weight: self.total.n_obs as f64,
        }
    }
}

/// One indexed/integrated dataset as seen by the clustering engine.
///
/// Observations are immutable once created: they are only read to compute
/// distances and group summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// Source file or directory of the dataset.
    pub id: String,
    pub cell: UnitCell,
    pub space_group: u16,
    /// Relative importance of the dataset, usually its total reflection count.
    pub weight: f64,
}

impl Observation {
    pub fn new(id: impl Into<String>, cell: UnitCell, space_group: u16, weight: f64) -> Self {
        Self {
            id: id.into(),
            cell,
            space_group,
            weight,
        }
    }
}
