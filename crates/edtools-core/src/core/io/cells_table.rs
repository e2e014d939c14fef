use crate::core::models::observation::IntegrationReport;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellsTableError {
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
}

/// One row of `cells.csv`, the tabular overview of a consolidated batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRow {
    pub number: usize,
    pub spgr: u16,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub al: f64,
    pub be: f64,
    pub ga: f64,
    pub volume: f64,
    pub rotation_angle: Option<f64>,
    pub total_completeness: f64,
    pub file: String,
}

impl CellRow {
    pub fn from_report(number: usize, report: &IntegrationReport) -> Self {
        let [a, b, c, al, be, ga] = *report.cell.params();
        Self {
            number,
            spgr: report.space_group,
            a,
            b,
            c,
            al,
            be,
            ga,
            volume: report.cell.volume(),
            rotation_angle: report.rotation_range,
            total_completeness: report.total.completeness,
            file: report.source.to_string_lossy().into_owned(),
        }
    }
}

fn csv_error(path: &Path) -> impl Fn(csv::Error) -> CellsTableError + '_ {
    move |source| CellsTableError::Csv {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

pub fn write_cells_table(path: &Path, rows: &[CellRow]) -> Result<(), CellsTableError> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_error(path))?;
    for row in rows {
        writer.serialize(row).map_err(csv_error(path))?;
    }
    writer
        .flush()
        .map_err(|e| csv_error(path)(csv::Error::from(e)))?;
    Ok(())
}

pub fn read_cells_table(path: &Path) -> Result<Vec<CellRow>, CellsTableError> {
    let mut reader = csv::Reader::from_path(path).map_err(csv_error(path))?;
    reader
        .deserialize::<CellRow>()
        .map(|r| r.map_err(csv_error(path)))
        .collect()
}
