use crate::core::models::cell::UnitCell;
use std::io::{self, Write};

/// One `INPUT_FILE=` block of XSCALE.INP.
#[derive(Debug, Clone, PartialEq)]
pub struct XscaleInput {
    /// File name as XSCALE should open it.
    pub file: String,
    /// Original location, written as a comment above the block.
    pub origin: Option<String>,
}

/// Contents of an XSCALE.INP file.
#[derive(Debug, Clone, PartialEq)]
pub struct XscaleInp {
    /// Comment lines written at the top (without the leading `!`).
    pub header: Vec<String>,
    /// Minimum I/sigma of reflections used for scaling.
    pub snrc: f64,
    /// Complete space-group line, e.g. `SPACE_GROUP_NUMBER= 5`.
    pub space_group_line: String,
    /// Complete cell line, e.g. `UNIT_CELL_CONSTANTS= 38.650 ...`.
    pub unit_cell_line: String,
    /// `(d_max, d_min)` used for every input file.
    pub resolution: (f64, f64),
    pub inputs: Vec<XscaleInput>,
}

impl XscaleInp {
    pub fn new(space_group_line: String, unit_cell_line: String, resolution: (f64, f64)) -> Self {
        Self {
            header: Vec::new(),
            snrc: 2.0,
            space_group_line,
            unit_cell_line,
            resolution,
            inputs: Vec::new(),
        }
    }

    pub fn space_group_line(space_group: u16) -> String {
        format!("SPACE_GROUP_NUMBER= {space_group}")
    }

    pub fn unit_cell_line(cell: &UnitCell) -> String {
        let values: Vec<String> = cell.params().iter().map(|v| format!("{v:.3}")).collect();
        format!("UNIT_CELL_CONSTANTS= {}", values.join(" "))
    }

    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        if !self.header.is_empty() {
            for line in &self.header {
                writeln!(writer, "! {line}")?;
            }
            writeln!(writer)?;
        }
        writeln!(writer, "SNRC= {}", self.snrc)?;
        writeln!(writer, "SAVE_CORRECTION_IMAGES= FALSE")?;
        writeln!(writer, "{}", self.space_group_line)?;
        writeln!(writer, "{}", self.unit_cell_line)?;
        writeln!(writer)?;
        writeln!(writer, "OUTPUT_FILE= MERGED.HKL")?;
        writeln!(writer)?;

        let (d_max, d_min) = self.resolution;
        for input in &self.inputs {
            if let Some(origin) = &input.origin {
                writeln!(writer, "    ! {origin}")?;
            }
            writeln!(writer, "    INPUT_FILE= {}", input.file)?;
            writeln!(writer, "    INCLUDE_RESOLUTION_RANGE= {d_max:8.2} {d_min:8.2}")?;
            writeln!(writer)?;
        }
        Ok(())
    }
}

/// Writes XDSCONV.INP converting MERGED.HKL to a SHELX reflection file.
pub fn write_xdsconv_inp(writer: &mut impl Write, resolution: (f64, f64)) -> io::Result<()> {
    let (d_max, d_min) = resolution;
    writeln!(writer)?;
    writeln!(writer, "INPUT_FILE= MERGED.HKL")?;
    writeln!(writer, "INCLUDE_RESOLUTION_RANGE= {d_max:8.2} {d_min:8.2} ! optional")?;
    writeln!(
        writer,
        "OUTPUT_FILE= shelx.hkl  SHELX    ! Warning: do _not_ name this file \"temp.mtz\" !"
    )?;
    writeln!(writer, "FRIEDEL'S_LAW= FALSE             ! default is FRIEDEL'S_LAW=TRUE")?;
    Ok(())
}
