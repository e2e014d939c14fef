use super::fields::{FieldErrorKind, parse_float};
use super::traits::ReportFile;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointlessError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
}

/// Symmetry verdict of a pointless run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointlessSummary {
    /// Laue group of the best solution with spaces removed, e.g. `C12/m1`.
    pub laue_group: Option<String>,
    pub reindex_operator: Option<String>,
    pub probability: Option<f64>,
    pub confidence: Option<f64>,
    /// Unit cell as printed by pointless.
    pub unit_cell: Option<String>,
}

impl PointlessSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Reader for `pointless.log`.
pub struct PointlessLogFile;

fn value_after_colon(line: &str) -> &str {
    line.rsplit(':').next().unwrap_or_default().trim()
}

impl ReportFile for PointlessLogFile {
    type Output = PointlessSummary;
    type Error = PointlessError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut summary = PointlessSummary::default();

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let at = |kind| PointlessError::Parse {
                line: line_num + 1,
                kind,
            };

            if line.contains("Best Solution") {
                let group = line.rsplit("point group").next().unwrap_or_default();
                summary.laue_group = Some(group.replace(' ', "").trim().to_string());
            }
            if line.starts_with("   Reindex operator:") {
                summary.reindex_operator = Some(value_after_colon(&line).to_string());
            } else if line.starts_with("   Laue group probability:") {
                summary.probability =
                    Some(parse_float(&[value_after_colon(&line)], 0, "probability").map_err(at)?);
            } else if line.starts_with("   Confidence:") {
                summary.confidence =
                    Some(parse_float(&[value_after_colon(&line)], 0, "confidence").map_err(at)?);
            } else if line.starts_with("   Unit cell:") {
                summary.unit_cell = Some(value_after_colon(&line).to_string());
            }
        }

        Ok(summary)
    }
}
