use crate::core::models::observation::IntegrationReport;
use std::io::{self, Write};
use std::path::PathBuf;

/// Minimum quality a dataset needs before it is gathered for merging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GatherCriteria {
    /// Minimum overall completeness in percent.
    pub min_completeness: f64,
    /// Minimum overall CC(1/2) in percent.
    pub min_cc_half: f64,
}

impl Default for GatherCriteria {
    fn default() -> Self {
        Self {
            min_completeness: 10.0,
            min_cc_half: 90.0,
        }
    }
}

impl GatherCriteria {
    pub fn accepts(&self, report: &IntegrationReport) -> bool {
        report.total.cc_half >= self.min_cc_half
            && report.total.completeness >= self.min_completeness
    }
}

/// One line of `filelist.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileListEntry {
    pub number: usize,
    /// Reflection file as referenced by the merge input.
    pub file: PathBuf,
    pub resolution: (f64, f64),
    /// Where the dataset came from.
    pub source: PathBuf,
}

pub fn write_file_list(writer: &mut impl Write, entries: &[FileListEntry]) -> io::Result<()> {
    for e in entries {
        writeln!(
            writer,
            " {:3} {} {:8.2} {:8.2}  # {}",
            e.number,
            e.file.display(),
            e.resolution.0,
            e.resolution.1,
            e.source.display()
        )?;
    }
    Ok(())
}

/// Name under which a gathered reflection file is copied into the working directory.
pub fn gathered_name(number: usize) -> String {
    format!("{number:02}_XDS_ASCII.HKL")
}
