use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Defines the interface for reading text reports produced by external
/// crystallographic programs.
///
/// Reports are read-only: the suite never writes them back. Implementors
/// handle format-specific parsing and produce a typed summary.
pub trait ReportFile {
    /// The parsed summary of the report.
    type Output;

    /// The error type for parsing and I/O operations.
    type Error: Error + From<io::Error>;

    /// Parses a report from a buffered reader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The buffered reader to read from.
    ///
    /// # Errors
    ///
    /// Returns an error if a required record is missing, a field cannot be
    /// parsed, or reading fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Self::Output, Self::Error>;

    /// Parses a report from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self::Output, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }
}

/// Defines the interface for list-like files the suite both reads and
/// writes (cell lists consumed by other tools).
pub trait RecordFile {
    /// One entry of the file.
    type Record;

    /// The error type for parsing, serialization and I/O operations.
    type Error: Error + From<io::Error>;

    /// Reads every record from a buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an error if a record is malformed or reading fails.
    fn read_from(reader: &mut impl BufRead) -> Result<Vec<Self::Record>, Self::Error>;

    /// Writes the records to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    fn write_to(records: &[Self::Record], writer: &mut impl Write) -> Result<(), Self::Error>;

    /// Reads every record from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Self::Record>, Self::Error> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&mut reader)
    }

    /// Writes the records to a file path, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or writing fails.
    fn write_to_path<P: AsRef<Path>>(
        records: &[Self::Record],
        path: P,
    ) -> Result<(), Self::Error> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        Self::write_to(records, &mut writer)?;
        writer.flush()?;
        Ok(())
    }
}
