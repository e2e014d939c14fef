use super::fields::{FieldErrorKind, parse_float, parse_int};
use crate::core::models::cell::UnitCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const FRAME_RANGE_KEYS: [&str; 3] = ["DATA_RANGE", "SPOT_RANGE", "BACKGROUND_RANGE"];
const CUT_FRAMES_FACTOR: f64 = 0.98;

#[derive(Debug, Error)]
pub enum XdsInpError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: FieldErrorKind },
    #[error("Missing keyword: {0}")]
    MissingKeyword(&'static str),
}

/// A set of edits applied to an XDS.INP file.
///
/// Every `None`/`false` field leaves the corresponding keyword untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XdsInpUpdate {
    pub cell: Option<UnitCell>,
    pub space_group: Option<u16>,
    /// Comment out the cell and space-group keywords.
    pub comment: bool,
    pub max_cell_axis_error: Option<f64>,
    pub max_cell_angle_error: Option<f64>,
    pub overload: Option<u64>,
    /// `(low, high)` resolution limits.
    pub resolution: Option<(f64, f64)>,
    pub wfac1: Option<f64>,
    /// Scale the frame ranges down to drop the first and last frames.
    pub cut_frames: bool,
    /// Verbatim line added at the end of the file.
    pub append: Option<String>,
    /// Jobs written to a `JOB=` line at the top; existing `JOB=` lines are removed.
    pub jobs: Vec<String>,
}

impl XdsInpUpdate {
    /// Returns the edited lines (without line terminators).
    pub fn apply(&self, lines: &[String]) -> Result<Vec<String>, XdsInpError> {
        let prefix = if self.comment { "!" } else { "" };
        let mut out = Vec::with_capacity(lines.len() + 3);

        if !self.jobs.is_empty() {
            let jobs: Vec<String> = self.jobs.iter().map(|j| j.to_uppercase()).collect();
            out.push(format!("JOB= {}", jobs.join(" ")));
            out.push(String::new());
        }

        for (index, line) in lines.iter().enumerate() {
            let replaced = if let (Some(cell), true) =
                (self.cell, line.contains("UNIT_CELL_CONSTANTS"))
            {
                let values: Vec<String> = cell.params().iter().map(|v| format!("{v:.3}")).collect();
                format!("{prefix}UNIT_CELL_CONSTANTS= {}", values.join(" "))
            } else if let (Some(spgr), true) = (self.space_group, line.contains("SPACE_GROUP_NUMBER"))
            {
                format!("{prefix}SPACE_GROUP_NUMBER= {spgr}")
            } else if let (Some(err), true) =
                (self.max_cell_axis_error, line.contains("MAX_CELL_AXIS_ERROR"))
            {
                format!("MAX_CELL_AXIS_ERROR= {err:.2}")
            } else if let (Some(err), true) =
                (self.max_cell_angle_error, line.contains("MAX_CELL_ANGLE_ERROR"))
            {
                format!("MAX_CELL_ANGLE_ERROR= {err:.2}")
            } else if let (Some(value), true) = (self.overload, line.contains("OVERLOAD")) {
                format!("OVERLOAD= {value}")
            } else if let (Some((low, high)), true) =
                (self.resolution, line.contains("INCLUDE_RESOLUTION_RANGE"))
            {
                format!("INCLUDE_RESOLUTION_RANGE= {low:.1} {high:.1}")
            } else if let (Some(wfac1), true) = (self.wfac1, line.contains("WFAC1")) {
                format!("WFAC1= {wfac1:.1}")
            } else if let (true, Some(key)) = (self.cut_frames, frame_range_key(line)) {
                cut_frame_range(key, line).map_err(|kind| XdsInpError::Parse {
                    line: index + 1,
                    kind,
                })?
            } else if self.comment
                && (line.contains("UNIT_CELL_CONSTANTS") || line.contains("SPACE_GROUP_NUMBER"))
            {
                format!("!{line}")
            } else if !self.jobs.is_empty() && line.contains("JOB=") {
                continue;
            } else {
                line.clone()
            };
            out.push(replaced);
        }

        if let Some(extra) = &self.append {
            out.push(extra.clone());
        }
        Ok(out)
    }

    /// Rewrites the file in place after copying the original to `XDS.INP~`.
    ///
    /// Returns the backup path. An empty file is backed up but left unchanged.
    pub fn update_file(&self, path: &Path) -> Result<PathBuf, XdsInpError> {
        let backup = path.with_file_name("XDS.INP~");
        fs::copy(path, &backup)?;

        let text = read_text(path)?;
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        if lines.is_empty() {
            return Ok(backup);
        }

        let mut updated = self.apply(&lines)?.join("\n");
        updated.push('\n');
        fs::write(path, updated)?;
        Ok(backup)
    }
}

/// Total rotation in degrees: `OSCILLATION_RANGE × (last − first + 1)` from
/// the `DATA_RANGE=` and `OSCILLATION_RANGE=` keywords.
pub fn rotation_range(text: &str) -> Result<f64, XdsInpError> {
    let mut frames = None;
    let mut oscillation = None;
    for (index, line) in text.lines().enumerate() {
        let at = |kind| XdsInpError::Parse {
            line: index + 1,
            kind,
        };
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line.starts_with("DATA_RANGE=") {
            let first = parse_float(&tokens, 1, "first frame").map_err(at)?;
            let last = parse_float(&tokens, 2, "last frame").map_err(at)?;
            frames = Some(last - first + 1.0);
        } else if line.starts_with("OSCILLATION_RANGE=") {
            oscillation = Some(parse_float(&tokens, 1, "oscillation range").map_err(at)?);
        }
    }
    let frames = frames.ok_or(XdsInpError::MissingKeyword("DATA_RANGE"))?;
    let oscillation = oscillation.ok_or(XdsInpError::MissingKeyword("OSCILLATION_RANGE"))?;
    Ok(oscillation * frames)
}

/// Reads an XDS.INP file and returns its total rotation range.
pub fn read_rotation_range(path: &Path) -> Result<f64, XdsInpError> {
    rotation_range(&read_text(path)?)
}

/// XDS.INP files written on Windows are often not valid UTF-8; fall back to
/// a byte-per-character decoding.
fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => err.into_bytes().iter().map(|&b| b as char).collect(),
    })
}

fn frame_range_key(line: &str) -> Option<&'static str> {
    let trimmed = line.trim_start();
    FRAME_RANGE_KEYS
        .into_iter()
        .find(|key| trimmed.starts_with(key))
}

fn cut_frame_range(key: &str, line: &str) -> Result<String, FieldErrorKind> {
    let values = line
        .split_once('=')
        .map_or(line.trim_start().get(key.len()..).unwrap_or_default(), |(_, v)| v);
    let values = values.split('!').next().unwrap_or_default();
    let tokens: Vec<&str> = values.split_whitespace().collect();
    let first: i64 = parse_int(&tokens, 0, "first frame")?;
    let last: i64 = parse_int(&tokens, 1, "last frame")?;
    let scale = |frame: i64| (frame as f64 * CUT_FRAMES_FACTOR).round_ties_even() as i64;
    Ok(format!("{key}= {} {}", scale(first), scale(last)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
JOB= XYCORR INIT COLSPOT IDXREF DEFPIX INTEGRATE CORRECT
DATA_RANGE=           1 150
SPOT_RANGE=           1 150
BACKGROUND_RANGE=     1 10
SPACE_GROUP_NUMBER= 0
UNIT_CELL_CONSTANTS= 10 20 30 90 90 90
MAX_CELL_AXIS_ERROR= 0.03
MAX_CELL_ANGLE_ERROR= 2.0
OVERLOAD= 130000
INCLUDE_RESOLUTION_RANGE= 20 0.8
WFAC1= 1.0
NAME_TEMPLATE_OF_DATA_FRAMES= SMV/data/?????.img";

    fn lines() -> Vec<String> {
        SAMPLE.lines().map(str::to_string).collect()
    }

    #[test]
    fn empty_update_keeps_file_unchanged() {
        assert_eq!(XdsInpUpdate::default().apply(&lines()).unwrap(), lines());
    }

    #[test]
    fn replaces_cell_and_space_group() {
        let update = XdsInpUpdate {
            cell: Some(UnitCell::new([38.65, 12.11, 16.92, 90.0, 114.06, 90.0]).unwrap()),
            space_group: Some(5),
            ..Default::default()
        };
        let out = update.apply(&lines()).unwrap();
        assert_eq!(out[4], "SPACE_GROUP_NUMBER= 5");
        assert_eq!(
            out[5],
            "UNIT_CELL_CONSTANTS= 38.650 12.110 16.920 90.000 114.060 90.000"
        );
    }

    #[test]
    fn comment_flag_comments_out_symmetry_keywords() {
        let update = XdsInpUpdate {
            comment: true,
            space_group: Some(1),
            ..Default::default()
        };
        let out = update.apply(&lines()).unwrap();
        assert_eq!(out[4], "!SPACE_GROUP_NUMBER= 1");
        assert_eq!(out[5], "!UNIT_CELL_CONSTANTS= 10 20 30 90 90 90");
    }

    #[test]
    fn numeric_options_use_fixed_precision() {
        let update = XdsInpUpdate {
            max_cell_axis_error: Some(0.05),
            max_cell_angle_error: Some(3.0),
            overload: Some(500000),
            resolution: Some((25.0, 0.8)),
            wfac1: Some(1.5),
            ..Default::default()
        };
        let out = update.apply(&lines()).unwrap();
        assert_eq!(out[6], "MAX_CELL_AXIS_ERROR= 0.05");
        assert_eq!(out[7], "MAX_CELL_ANGLE_ERROR= 3.00");
        assert_eq!(out[8], "OVERLOAD= 500000");
        assert_eq!(out[9], "INCLUDE_RESOLUTION_RANGE= 25.0 0.8");
        assert_eq!(out[10], "WFAC1= 1.5");
    }

    #[test]
    fn cut_frames_scales_every_range() {
        let update = XdsInpUpdate {
            cut_frames: true,
            ..Default::default()
        };
        let out = update.apply(&lines()).unwrap();
        assert_eq!(out[1], "DATA_RANGE= 1 147");
        assert_eq!(out[2], "SPOT_RANGE= 1 147");
        assert_eq!(out[3], "BACKGROUND_RANGE= 1 10");
    }

    #[test]
    fn jobs_replace_existing_job_line_and_append_goes_last() {
        let update = XdsInpUpdate {
            jobs: vec!["defpix".into(), "integrate".into(), "correct".into()],
            append: Some("STRONG_PIXEL= 6".into()),
            ..Default::default()
        };
        let out = update.apply(&lines()).unwrap();
        assert_eq!(out[0], "JOB= DEFPIX INTEGRATE CORRECT");
        assert_eq!(out[1], "");
        assert_eq!(out.iter().filter(|l| l.contains("JOB=")).count(), 1);
        assert_eq!(out.last().map(String::as_str), Some("STRONG_PIXEL= 6"));
    }

    #[test]
    fn rotation_range_counts_both_end_frames() {
        let text = format!("{SAMPLE}\nOSCILLATION_RANGE= 0.2500\n");
        assert_eq!(rotation_range(&text).unwrap(), 37.5);
    }

    #[test]
    fn rotation_range_needs_both_keywords() {
        assert!(matches!(
            rotation_range(SAMPLE),
            Err(XdsInpError::MissingKeyword("OSCILLATION_RANGE"))
        ));
        assert!(matches!(
            rotation_range("OSCILLATION_RANGE= 0.5\n"),
            Err(XdsInpError::MissingKeyword("DATA_RANGE"))
        ));
        assert!(matches!(
            rotation_range("DATA_RANGE= 1 many\nOSCILLATION_RANGE= 0.5\n"),
            Err(XdsInpError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn update_file_writes_backup_and_new_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("XDS.INP");
        fs::write(&path, SAMPLE).unwrap();
        let update = XdsInpUpdate {
            wfac1: Some(2.0),
            ..Default::default()
        };
        let backup = update.update_file(&path).unwrap();
        assert_eq!(backup, dir.path().join("XDS.INP~"));
        assert_eq!(fs::read_to_string(&backup).unwrap(), SAMPLE);
        assert!(fs::read_to_string(&path).unwrap().contains("WFAC1= 2.0\n"));
    }

    #[test]
    fn malformed_frame_range_reports_line() {
        let text = vec!["DATA_RANGE= 1".to_string()];
        let update = XdsInpUpdate {
            cut_frames: true,
            ..Default::default()
        };
        assert!(matches!(
            update.apply(&text),
            Err(XdsInpError::Parse { line: 1, .. })
        ));
    }
}
