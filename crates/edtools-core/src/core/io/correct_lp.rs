use super::fields::{FieldErrorKind, parse_cell, parse_float, parse_int};
use super::traits::ReportFile;
use crate::core::models::cell::UnitCell;
use crate::core::models::observation::{IntegrationReport, ShellStatistics};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Shells whose mean I/sigma falls below this value are not reported.
pub const IOS_THRESHOLD: f64 = 0.8;

const STATISTICS_MARKER: &str =
    " SUBSET OF INTENSITY DATA WITH SIGNAL/NOISE >= -3.0 AS FUNCTION OF RESOLUTION";
const TOTAL_MARKER: &str = "    total";
const RAW_CELL_SUFFIX: &str = "as used by INTEGRATE";
const ISA_HEADER: &str = "     a        b          ISa";
const WILSON_MARKER: &str = "   WILSON LINE (using all data)";
const RULE_MARKER: &str =
    "   --------------------------------------------------------------------------";
const SHELL_FIELDS: usize = 14;

#[derive(Debug, Error)]
pub enum CorrectLpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("Missing required record: {0}")]
    MissingRecord(&'static str),
    #[error("No resolution shell passed the I/sigma threshold")]
    NoStatistics,
}

/// Reader for the CORRECT.LP report written by XDS.
pub struct CorrectLpFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    Isa,
    ResolutionRange,
}

impl CorrectLpFile {
    /// Parses a report and records its location in the result.
    pub fn read_report(path: &Path) -> Result<IntegrationReport, CorrectLpError> {
        let mut report = Self::read_from_path(path)?;
        report.source = path.to_path_buf();
        Ok(report)
    }
}

impl ReportFile for CorrectLpFile {
    type Output = IntegrationReport;
    type Error = CorrectLpError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut cell: Option<UnitCell> = None;
        let mut raw_cell: Option<UnitCell> = None;
        let mut space_group: Option<u16> = None;
        let mut data_range: Option<(f64, f64)> = None;
        let mut oscillation: Option<f64> = None;
        let mut isa = None;
        let mut b_overall = None;
        let mut resolution_range = None;

        let mut in_block = false;
        let mut block: Vec<(usize, String)> = Vec::new();
        let mut pending = Pending::None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let at = |kind| CorrectLpError::Parse {
                line: line_num,
                kind,
            };
            let tokens: Vec<&str> = line.split_whitespace().collect();

            match std::mem::replace(&mut pending, Pending::None) {
                Pending::Isa => {
                    isa = Some(parse_float(&tokens, tokens.len().saturating_sub(1), "ISa").map_err(at)?);
                    continue;
                }
                Pending::ResolutionRange => {
                    // Not every ruled table starts with a resolution pair.
                    if let (Ok(lo), Ok(hi)) = (
                        parse_float(&tokens, 0, "resolution"),
                        parse_float(&tokens, 1, "resolution"),
                    ) {
                        resolution_range = Some((lo, hi));
                    }
                    continue;
                }
                Pending::None => {}
            }

            if line.starts_with(STATISTICS_MARKER) {
                in_block = true;
                block.clear();
            } else if line.starts_with(TOTAL_MARKER) {
                if in_block {
                    block.push((line_num, line.clone()));
                }
                in_block = false;
            } else if line.trim_end().ends_with(RAW_CELL_SUFFIX) {
                raw_cell = Some(parse_cell(&tokens, 1).map_err(at)?);
            } else if line.starts_with(" UNIT_CELL_CONSTANTS=") {
                cell = Some(parse_cell(&tokens, 1).map_err(at)?);
            } else if line.starts_with(" UNIT CELL PARAMETERS") {
                cell = Some(parse_cell(&tokens, 3).map_err(at)?);
            } else if line.starts_with(" SPACE GROUP NUMBER") {
                space_group = Some(
                    parse_int(&tokens, tokens.len().saturating_sub(1), "space group").map_err(at)?,
                );
            } else if line.starts_with(" SPACE_GROUP_NUMBER=") {
                space_group = Some(parse_int(&tokens, 1, "space group").map_err(at)?);
            } else if line.starts_with(" DATA_RANGE=") {
                data_range = Some((
                    parse_float(&tokens, 1, "data range").map_err(at)?,
                    parse_float(&tokens, 2, "data range").map_err(at)?,
                ));
            } else if line.starts_with(" OSCILLATION_RANGE") {
                oscillation = Some(
                    parse_float(&tokens, tokens.len().saturating_sub(1), "oscillation range")
                        .map_err(at)?,
                );
            } else if line.starts_with(ISA_HEADER) {
                pending = Pending::Isa;
            } else if line.starts_with(WILSON_MARKER) {
                b_overall = Some(
                    parse_float(&tokens, tokens.len().saturating_sub(3), "Wilson B").map_err(at)?,
                );
            } else if line.starts_with(RULE_MARKER) {
                pending = Pending::ResolutionRange;
            }

            if in_block {
                block.push((line_num, line));
            }
        }

        let (shells, total) = parse_statistics_block(&block)?;
        let d_min = shells
            .last()
            .map(|(d, _)| *d)
            .ok_or(CorrectLpError::NoStatistics)?;
        let total = total.ok_or(CorrectLpError::MissingRecord("total statistics row"))?;
        let cell = cell.ok_or(CorrectLpError::MissingRecord("unit cell"))?;
        let space_group = space_group.ok_or(CorrectLpError::MissingRecord("space group"))?;

        let outer_low = if shells.len() >= 2 {
            shells[shells.len() - 2].0
        } else {
            resolution_range.map_or(f64::INFINITY, |(lo, _)| lo)
        };

        let rotation_range = match (data_range, oscillation) {
            (Some((first, last)), Some(osc)) => Some((last - first) * osc),
            _ => None,
        };

        Ok(IntegrationReport {
            source: PathBuf::new(),
            cell,
            raw_cell,
            space_group,
            resolution_range,
            rotation_range,
            isa,
            b_overall,
            shells,
            total,
            outer_shell: (outer_low, d_min),
        })
    }
}

type ShellTable = (Vec<(f64, ShellStatistics)>, Option<ShellStatistics>);

/// Decodes the shell rows of the statistics block, keeping only shells that
/// pass [`IOS_THRESHOLD`] and extend the resolution.
fn parse_statistics_block(block: &[(usize, String)]) -> Result<ShellTable, CorrectLpError> {
    let mut shells = Vec::new();
    let mut total = None;
    let mut d_min = f64::INFINITY;

    for (line_num, line) in block {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() != SHELL_FIELDS {
            continue;
        }
        let is_total = tokens[0] == "total";
        let resolution = if is_total {
            None
        } else {
            match tokens[0].parse::<f64>() {
                Ok(d) => Some(d),
                Err(_) => continue,
            }
        };

        let stats = parse_shell(&tokens).map_err(|kind| CorrectLpError::Parse {
            line: *line_num,
            kind,
        })?;

        match resolution {
            None => total = Some(stats),
            Some(_) if stats.i_over_sigma < IOS_THRESHOLD => {}
            Some(d) => {
                if d < d_min {
                    d_min = d;
                    shells.push((d, stats));
                }
            }
        }
    }

    Ok((shells, total))
}

fn parse_shell(tokens: &[&str]) -> Result<ShellStatistics, FieldErrorKind> {
    Ok(ShellStatistics {
        n_obs: parse_int(tokens, 1, "N_obs")?,
        n_unique: parse_int(tokens, 2, "N_unique")?,
        completeness: parse_float(tokens, 4, "completeness")?,
        i_over_sigma: parse_float(tokens, 8, "I/sigma")?,
        r_meas: parse_float(tokens, 9, "R_meas")?,
        cc_half: parse_float(tokens, 10, "CC(1/2)")?,
    })
}
