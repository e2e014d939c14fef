use super::fields::{FieldErrorKind, parse_float, parse_int};
use super::traits::ReportFile;
use crate::core::models::merge::{CorrelationEntry, MergeReport, MergedStatistics};
use std::io::{self, BufRead};
use thiserror::Error;

const FILES_MARKER: &str = "READING INPUT REFLECTION DATA FILES";
const CORRELATIONS_MARKER: &str = "CORRELATIONS BETWEEN INPUT DATA SETS AFTER CORRECTIONS";
const DIVIDER: &str = "******************************************************************************";
const TOTAL_MARKER: &str = "    total";
const HEADER_LINES: usize = 4;
const FILE_FIELDS: usize = 5;

#[derive(Debug, Error)]
pub enum XscaleLpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("Correlation entry on line {line} refers to data set 0 (numbering starts at 1)")]
    ZeroIndex { line: usize },
}

/// Everything read from an XSCALE.LP report.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XscaleReport {
    pub merge: MergeReport,
    /// Statistics of the merged data; absent when the run did not finish.
    pub statistics: Option<MergedStatistics>,
}

/// Reader for the XSCALE.LP report.
pub struct XscaleLpFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Scan,
    FileTable { skip: usize },
    Correlations { skip: usize },
}

impl ReportFile for XscaleLpFile {
    type Output = XscaleReport;
    type Error = XscaleLpError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut report = XscaleReport::default();
        let mut section = Section::Scan;
        let mut seen_correlations = false;
        let mut previous = String::new();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let at = |kind| XscaleLpError::Parse {
                line: line_num,
                kind,
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();

            match section {
                Section::FileTable { skip } if skip > 0 => {
                    section = Section::FileTable { skip: skip - 1 };
                }
                Section::FileTable { .. } => {
                    if tokens.len() == FILE_FIELDS {
                        let number: usize = parse_int(&tokens, 0, "data set number").map_err(at)?;
                        let index = number
                            .checked_sub(1)
                            .ok_or(XscaleLpError::ZeroIndex { line: line_num })?;
                        report.merge.filenames.insert(index, tokens[4].to_string());
                    }
                    if line.contains(DIVIDER) {
                        section = Section::Scan;
                    }
                }
                Section::Correlations { skip } if skip > 0 => {
                    section = Section::Correlations { skip: skip - 1 };
                }
                Section::Correlations { .. } => {
                    if tokens.is_empty() {
                        section = Section::Scan;
                    } else {
                        report
                            .merge
                            .correlations
                            .push(parse_correlation(&tokens, line_num)?);
                    }
                }
                Section::Scan => {
                    if line.starts_with(" SPACE_GROUP_NUMBER=") {
                        report.merge.space_group_line = Some(line.trim().to_string());
                    } else if line.starts_with(" UNIT_CELL_CONSTANTS=") {
                        report.merge.unit_cell_line = Some(line.trim().to_string());
                    } else if line.contains(FILES_MARKER) {
                        report.merge.filenames.clear();
                        section = Section::FileTable { skip: HEADER_LINES };
                    } else if line.contains(CORRELATIONS_MARKER) && !seen_correlations {
                        seen_correlations = true;
                        section = Section::Correlations { skip: HEADER_LINES };
                    } else if line.starts_with(TOTAL_MARKER) && report.statistics.is_none() {
                        report.statistics =
                            Some(parse_total(&tokens, &previous).map_err(at)?);
                    }
                }
            }

            previous = line;
        }

        Ok(report)
    }
}

fn parse_correlation(tokens: &[&str], line: usize) -> Result<CorrelationEntry, XscaleLpError> {
    let at = |kind| XscaleLpError::Parse { line, kind };
    let i: usize = parse_int(tokens, 0, "data set i").map_err(at)?;
    let j: usize = parse_int(tokens, 1, "data set j").map_err(at)?;
    let n_common = parse_int(tokens, 2, "common reflections").map_err(at)?;
    let cc = parse_float(tokens, 3, "correlation").map_err(at)?;
    match (i.checked_sub(1), j.checked_sub(1)) {
        (Some(i), Some(j)) => Ok(CorrelationEntry { i, j, n_common, cc }),
        _ => Err(XscaleLpError::ZeroIndex { line }),
    }
}

/// Decodes the `total` row; the row carries no resolution of its own, so the
/// limit of the preceding shell is used.
fn parse_total(tokens: &[&str], previous: &str) -> Result<MergedStatistics, FieldErrorKind> {
    let previous_tokens: Vec<&str> = previous.split_whitespace().collect();
    Ok(MergedStatistics {
        d_min: parse_float(&previous_tokens, 0, "d_min")?,
        n_obs: parse_int(tokens, 1, "N_obs")?,
        n_unique: parse_int(tokens, 2, "N_unique")?,
        n_possible: parse_int(tokens, 3, "N_possible")?,
        completeness: parse_float(tokens, 4, "completeness")?,
        n_compared: parse_int(tokens, 7, "N_compared")?,
        i_over_sigma: parse_float(tokens, 8, "I/sigma")?,
        r_meas: 0.01 * parse_float(tokens, 9, "R_meas")?,
        cc_half: parse_float(tokens, 10, "CC(1/2)")?,
    })
}
