use super::fields::{FieldErrorKind, parse_cell, parse_int};
use super::traits::ReportFile;
use crate::core::models::cell::UnitCell;
use std::io::{self, BufRead};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XdsAsciiError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("Missing required header record: {0}")]
    MissingRecord(&'static str),
}

/// Crystal parameters stored in the header of an XDS_ASCII.HKL file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XdsAsciiHeader {
    pub cell: UnitCell,
    pub space_group: u16,
}

/// Reader for the `!`-prefixed header of XDS_ASCII.HKL reflection files.
///
/// Reading stops at the first reflection record, so large files are cheap.
pub struct XdsAsciiFile;

impl ReportFile for XdsAsciiFile {
    type Output = XdsAsciiHeader;
    type Error = XdsAsciiError;

    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error> {
        let mut cell = None;
        let mut space_group = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            if !line.starts_with('!') {
                break;
            }
            let at = |kind| XdsAsciiError::Parse {
                line: line_num,
                kind,
            };

            if line.contains("UNIT_CELL_CONSTANTS") {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                let start = tokens.len().saturating_sub(6);
                cell = Some(parse_cell(&tokens, start).map_err(at)?);
            }
            if line.contains("SPACE_GROUP_NUMBER") {
                let value = line.rsplit('=').next().unwrap_or_default().trim();
                space_group = Some(parse_int(&[value], 0, "space group").map_err(at)?);
            }
        }

        Ok(XdsAsciiHeader {
            cell: cell.ok_or(XdsAsciiError::MissingRecord("UNIT_CELL_CONSTANTS"))?,
            space_group: space_group.ok_or(XdsAsciiError::MissingRecord("SPACE_GROUP_NUMBER"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
!FORMAT=XDS_ASCII    MERGE=FALSE    FRIEDEL'S_LAW=TRUE
!OUTPUT_FILE=XDS_ASCII.HKL        DATE=15-Mar-2023
!SPACE_GROUP_NUMBER=   14
!UNIT_CELL_CONSTANTS=    10.512    12.034    14.221  90.000  97.310  90.000
!NUMBER_OF_ITEMS_IN_EACH_DATA_RECORD=12
!END_OF_HEADER
     0     0     2  1.234E+02  5.678E+00   512.1   498.2    12.0 0.05000   100  0   0.00
!SPACE_GROUP_NUMBER=   1
";

    #[test]
    fn reads_cell_and_space_group_from_header() {
        let header = XdsAsciiFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();
        assert_eq!(header.space_group, 14);
        assert_eq!(header.cell.a(), 10.512);
        assert_eq!(header.cell.beta(), 97.31);
    }

    #[test]
    fn missing_space_group_is_reported() {
        let text = SAMPLE.replace("!SPACE_GROUP_NUMBER=   14\n", "");
        assert!(matches!(
            XdsAsciiFile::read_from(&mut Cursor::new(text)),
            Err(XdsAsciiError::MissingRecord("SPACE_GROUP_NUMBER"))
        ));
    }
}
