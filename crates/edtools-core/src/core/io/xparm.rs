use super::fields::{FieldErrorKind, parse_cell};
use super::traits::ReportFile;
use crate::core::models::cell::UnitCell;
use std::io::{self, BufRead};
use thiserror::Error;

/// 1-based line holding the space group and the six cell constants.
const CELL_LINE: usize = 4;

#[derive(Debug, Error)]
pub enum XparmError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("File ends after {0} lines, before the unit cell record")]
    Truncated(usize),
}

/// Reader for the unrefined unit cell in XPARM.XDS (written by IDXREF).
///
/// Only the cell record is decoded; the detector and beam geometry that
/// follows is ignored.
pub struct XparmFile;

impl ReportFile for XparmFile {
    type Output = UnitCell;
    type Error = XparmError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut count = 0;
        for line_res in reader.lines() {
            let line = line_res?;
            count += 1;
            if count == CELL_LINE {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                return parse_cell(&tokens, 1).map_err(|kind| XparmError::Parse {
                    line: CELL_LINE,
                    kind,
                });
            }
        }
        Err(XparmError::Truncated(count))
    }
}
