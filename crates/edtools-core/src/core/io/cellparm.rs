use super::fields::{FieldErrorKind, parse_cell, parse_int};
use super::traits::RecordFile;
use crate::core::models::cell::UnitCell;
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellparmError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("Line {line} has no UNIT_CELL_CONSTANTS keyword")]
    MissingKeyword { line: usize },
}

/// One cell of a CELLPARM.INP file.
#[derive(Debug, Clone, PartialEq)]
pub struct CellparmEntry {
    /// Origin of the cell, taken from the `! n from PATH` comment.
    pub source: Option<String>,
    pub cell: UnitCell,
    pub weight: u64,
}

/// CELLPARM.INP, the input of the XDS `cellparm` program.
pub struct CellparmFile;

impl RecordFile for CellparmFile {
    type Record = CellparmEntry;
    type Error = CellparmError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error> {
        let mut entries = Vec::new();
        let mut source = None;

        for (line_num, line_res) in reader.lines().enumerate() {
            let line = line_res?;
            let line_num = line_num + 1;
            let (content, comment) = match line.split_once('!') {
                Some((content, comment)) => (content, Some(comment)),
                None => (line.as_str(), None),
            };
            if let Some(origin) = comment.and_then(|c| c.split_once(" from ")) {
                source = Some(origin.1.trim().to_string());
            }

            let content = content.trim().to_uppercase().replace('=', " ");
            if content.is_empty() {
                continue;
            }
            let tokens: Vec<&str> = content.split_whitespace().collect();
            let at = |kind| CellparmError::Parse {
                line: line_num,
                kind,
            };

            let key = tokens
                .iter()
                .position(|t| *t == "UNIT_CELL_CONSTANTS")
                .ok_or(CellparmError::MissingKeyword { line: line_num })?;
            let cell = parse_cell(&tokens, key + 1).map_err(at)?;
            let weight = match tokens.iter().position(|t| *t == "WEIGHT") {
                Some(w) => parse_int(&tokens, w + 1, "weight").map_err(at)?,
                None => 1,
            };

            entries.push(CellparmEntry {
                source: source.take(),
                cell,
                weight,
            });
        }

        Ok(entries)
    }

    fn write_to(records: &[Self::Record], writer: &mut impl Write) -> Result<(), Self::Error> {
        for (i, entry) in records.iter().enumerate() {
            writeln!(
                writer,
                "! {:3} from {}",
                i + 1,
                entry.source.as_deref().unwrap_or("unknown")
            )?;
            writeln!(
                writer,
                "UNIT_CELL_CONSTANTS= {} WEIGHT= {}",
                entry.cell, entry.weight
            )?;
        }
        Ok(())
    }
}
