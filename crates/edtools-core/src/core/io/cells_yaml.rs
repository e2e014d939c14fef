use super::cellparm::CellparmEntry;
use super::traits::RecordFile;
use crate::core::models::cell::{CellError, UnitCell};
use crate::core::models::observation::{IntegrationReport, Observation};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CellsYamlError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One dataset entry of `cells.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    /// Directory holding the processed dataset.
    pub directory: String,
    /// 1-based position in the consolidated batch.
    pub number: usize,
    /// Parameters are kept unvalidated so one bad entry does not spoil the file.
    pub unit_cell: [f64; 6],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_unit_cell: Option<[f64; 6]>,
    pub space_group: u16,
    pub weight: u64,
    /// Total rotation of the dataset in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_range: Option<f64>,
    /// Explicit reflection file; defaults to `XDS_ASCII.HKL` in `directory`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xds_ascii: Option<PathBuf>,
}

impl CellRecord {
    pub fn from_report(number: usize, report: &IntegrationReport) -> Self {
        Self {
            directory: report.directory().to_string_lossy().into_owned(),
            number,
            unit_cell: *report.cell.params(),
            raw_unit_cell: report.raw_cell.map(|c| *c.params()),
            space_group: report.space_group,
            weight: report.total.n_obs,
            rotation_range: report.rotation_range,
            xds_ascii: None,
        }
    }

    /// Entry for a dataset known only from indexing: the unrefined cell in
    /// P1 with unit weight.
    pub fn from_indexing(number: usize, directory: String, cell: UnitCell, rotation_range: f64) -> Self {
        Self {
            directory,
            number,
            unit_cell: *cell.params(),
            raw_unit_cell: Some(*cell.params()),
            space_group: 1,
            weight: 1,
            rotation_range: Some(rotation_range),
            xds_ascii: None,
        }
    }

    /// Entry for a CELLPARM.INP cell. The directory is the parent of the
    /// recorded source report, or empty when the origin is unknown.
    pub fn from_cellparm(number: usize, entry: &CellparmEntry) -> Self {
        let directory = entry
            .source
            .as_deref()
            .and_then(|s| Path::new(s).parent())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            directory,
            number,
            unit_cell: *entry.cell.params(),
            raw_unit_cell: Some(*entry.cell.params()),
            space_group: 1,
            weight: entry.weight,
            rotation_range: None,
            xds_ascii: None,
        }
    }

    /// The cell used for clustering: the raw cell when requested and
    /// available, the refined cell otherwise.
    pub fn cell(&self, use_raw_cell: bool) -> Result<UnitCell, CellError> {
        match (use_raw_cell, self.raw_unit_cell) {
            (true, Some(raw)) => UnitCell::new(raw),
            _ => UnitCell::new(self.unit_cell),
        }
    }

    pub fn reflection_file(&self) -> PathBuf {
        self.xds_ascii
            .clone()
            .unwrap_or_else(|| PathBuf::from(&self.directory).join("XDS_ASCII.HKL"))
    }

    pub fn to_observation(&self, use_raw_cell: bool) -> Result<Observation, CellError> {
        Ok(Observation::new(
            self.directory.clone(),
            self.cell(use_raw_cell)?,
            self.space_group,
            self.weight as f64,
        ))
    }
}

/// The `cells.yaml` list written by the consolidation step.
pub struct CellsYamlFile;

impl CellsYamlFile {
    /// Cell list written from XPARM.XDS files, before integration.
    pub const INDEXING_FILE_NAME: &'static str = "cells_xparm.yaml";

    /// File name used for the members of one cell cluster.
    pub fn cluster_file_name(label: usize, members: usize) -> String {
        format!("cells_cluster_{label}_{members}-items.yaml")
    }
}

impl RecordFile for CellsYamlFile {
    type Record = CellRecord;
    type Error = CellsYamlError;

    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    fn write_to(records: &[Self::Record], writer: &mut impl Write) -> Result<(), Self::Error> {
        serde_yaml::to_writer(writer, records)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SAMPLE: &str = "\
- directory: /data/exp_001
  number: 1
  raw_unit_cell: [38.7, 12.1, 16.9, 90.0, 114.1, 90.0]
  space_group: 5
  unit_cell: [38.65, 12.11, 16.92, 90.0, 114.06, 90.0]
  weight: 3411
- directory: /data/exp_002
  number: 2
  space_group: 1
  unit_cell: [38.5, 12.0, 16.8, 90.1, 114.2, 89.9]
  weight: 2200
";

    #[test]
    fn reads_records_with_optional_raw_cell() {
        let records = CellsYamlFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].cell(true).unwrap().a(), 38.7);
        assert_eq!(records[0].cell(false).unwrap().a(), 38.65);
        assert_eq!(records[1].raw_unit_cell, None);
        assert_eq!(records[1].cell(true).unwrap().a(), 38.5);
        assert_eq!(
            records[1].reflection_file(),
            PathBuf::from("/data/exp_002/XDS_ASCII.HKL")
        );
    }

    #[test]
    fn invalid_cell_only_affects_its_own_record() {
        let text = SAMPLE.replace("[38.5, 12.0", "[-38.5, 12.0");
        let records = CellsYamlFile::read_from(&mut Cursor::new(text)).unwrap();
        assert!(records[0].to_observation(false).is_ok());
        assert!(matches!(
            records[1].to_observation(false),
            Err(CellError::NonPositiveLength { name: "a", .. })
        ));
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let text = SAMPLE.replace("weight: 2200", "weight: many");
        assert!(matches!(
            CellsYamlFile::read_from(&mut Cursor::new(text)),
            Err(CellsYamlError::Yaml(_))
        ));
    }

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cells.yaml");
        let records = CellsYamlFile::read_from(&mut Cursor::new(SAMPLE)).unwrap();
        CellsYamlFile::write_to_path(&records, &path).unwrap();
        assert_eq!(CellsYamlFile::read_from_path(&path).unwrap(), records);
    }

    #[test]
    fn indexing_entries_use_raw_cell_in_p1() {
        let cell = UnitCell::new([38.71, 12.13, 16.95, 90.0, 114.1, 90.0]).unwrap();
        let record = CellRecord::from_indexing(4, "/data/exp_004".to_string(), cell, 30.0);
        assert_eq!(record.raw_unit_cell, Some(*cell.params()));
        assert_eq!(record.space_group, 1);
        assert_eq!(record.weight, 1);

        let mut text = Vec::new();
        CellsYamlFile::write_to(&[record.clone()], &mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("rotation_range: 30.0"));
        assert_eq!(CellsYamlFile::read_from(&mut Cursor::new(text)).unwrap(), vec![record]);
    }

    #[test]
    fn cluster_file_name_encodes_label_and_size() {
        assert_eq!(
            CellsYamlFile::cluster_file_name(3, 12),
            "cells_cluster_3_12-items.yaml"
        );
    }

    #[test]
    fn cellparm_entries_take_directory_from_their_source() {
        let cell = UnitCell::new([38.71, 12.13, 16.95, 90.0, 114.1, 90.0]).unwrap();
        let known = CellparmEntry {
            source: Some("/data/exp_002/CORRECT.LP".to_string()),
            cell,
            weight: 5261,
        };
        let record = CellRecord::from_cellparm(2, &known);
        assert_eq!(record.directory, "/data/exp_002");
        assert_eq!(record.weight, 5261);
        assert_eq!(record.cell(true).unwrap(), cell);

        let unknown = CellparmEntry { source: None, ..known };
        assert_eq!(CellRecord::from_cellparm(3, &unknown).directory, "");
    }
}
