use std::collections::BTreeMap;

/// Pairwise correlation between two datasets of a merge run.
///
/// Indices are 0-based; the report numbers datasets from 1 and the parser
/// converts on the way in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationEntry {
    pub i: usize,
    pub j: usize,
    /// Number of common reflections the correlation is based on.
    pub n_common: u64,
    pub cc: f64,
}

impl CorrelationEntry {
    pub fn new(i: usize, j: usize, cc: f64) -> Self {
        Self {
            i,
            j,
            n_common: 0,
            cc,
        }
    }
}

/// The parts of a merge report needed to regroup its input datasets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MergeReport {
    /// The space-group line as written in the report, e.g. `SPACE_GROUP_NUMBER=   5`.
    pub space_group_line: Option<String>,
    /// The cell line as written in the report, e.g. `UNIT_CELL_CONSTANTS= ...`.
    pub unit_cell_line: Option<String>,
    /// Input reflection files keyed by 0-based dataset index.
    pub filenames: BTreeMap<usize, String>,
    pub correlations: Vec<CorrelationEntry>,
}

impl MergeReport {
    /// Number of datasets taking part in the merge.
    ///
    /// This is the larger of the number of listed input files and one past the
    /// highest index that appears in a correlation entry.
    pub fn dataset_count(&self) -> usize {
        let from_pairs = self
            .correlations
            .iter()
            .map(|e| e.i.max(e.j) + 1)
            .max()
            .unwrap_or(0);
        let from_files = self.filenames.keys().next_back().map_or(0, |k| k + 1);
        from_pairs.max(from_files)
    }

    pub fn filename(&self, index: usize) -> Option<&str> {
        self.filenames.get(&index).map(String::as_str)
    }
}

/// Summary statistics of merged data (the `total` row of a merge report).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedStatistics {
    pub d_min: f64,
    pub n_obs: u64,
    pub n_unique: u64,
    pub n_possible: u64,
    /// Completeness in percent.
    pub completeness: f64,
    pub n_compared: u64,
    pub i_over_sigma: f64,
    /// R_meas as a fraction.
    pub r_meas: f64,
    /// CC(1/2) in percent.
    pub cc_half: f64,
}
