use super::CommandContext;
use crate::cli::{MakeXscaleArgs, fixed};
use crate::config::resolution_arg;
use crate::error::{CliError, Result};
use crate::utils::discovery;
use edtools::core::io::cells_yaml::CellsYamlFile;
use edtools::core::io::traits::{RecordFile, ReportFile};
use edtools::core::io::xds_ascii::XdsAsciiFile;
use edtools::core::io::xscale_inp::write_xdsconv_inp;
use edtools::core::models::cell::UnitCell;
use edtools::core::symmetry::SpaceGroupTable;
use edtools::workflows::merge_plan::{self, MergeSource};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

const CELLS_YAML: &str = "cells.yaml";
const REFLECTION_SUFFIX: &str = "XDS_ASCII.HKL";

pub fn run(args: MakeXscaleArgs, ctx: &CommandContext) -> Result<()> {
    run_in(args, ctx, Path::new("."))
}

/// Writes XSCALE.INP and XDSCONV.INP into `dir`; input files inside `dir`
/// are listed relative to it.
pub fn run_in(args: MakeXscaleArgs, ctx: &CommandContext, dir: &Path) -> Result<()> {
    let inputs = if args.inputs.is_empty() {
        default_inputs(dir)?
    } else {
        args.inputs.clone()
    };

    let mut sources = Vec::new();
    for input in &inputs {
        sources.extend(load_sources(input)?);
    }
    println!("Loaded {} cells", sources.len());
    if sources.is_empty() {
        return Err(CliError::Argument("no usable cells to merge".to_string()));
    }

    let cell_override = match args.cell.as_deref() {
        Some(values) => {
            let params = fixed::<6>(values).ok_or_else(|| {
                CliError::Argument(format!("expected six cell parameters, got {}", values.len()))
            })?;
            Some(UnitCell::new(params).map_err(|e| CliError::Argument(e.to_string()))?)
        }
        None => None,
    };
    let resolution = resolution_arg(args.resolution.as_deref())?.unwrap_or(ctx.config.scaling.resolution);

    let table = SpaceGroupTable::standard();
    let plan = merge_plan::run(&sources, &table, cell_override, args.spgr)?;

    if args.spgr.is_none() {
        for lattice in &plan.lattices {
            println!(
                "Lattice type `{}` (spgr: {:3}) was found {:3} times",
                lattice.lattice, lattice.laue_symmetry, lattice.count
            );
        }
        println!("Using lowest symmetry space group: {}", plan.space_group);
    }

    let inp = merge_plan::xscale_input(&plan, &sources, dir, resolution);
    let mut writer = BufWriter::new(File::create(dir.join("XSCALE.INP"))?);
    inp.write_to(&mut writer)?;
    writer.flush()?;

    let mut writer = BufWriter::new(File::create(dir.join("XDSCONV.INP"))?);
    write_xdsconv_inp(&mut writer, resolution)?;
    writer.flush()?;

    println!("\nUsing:");
    println!("  {}", inp.space_group_line);
    println!("  {}", inp.unit_cell_line);
    println!("\nWrote {} input files to XSCALE.INP", inp.inputs.len());
    Ok(())
}

fn default_inputs(dir: &Path) -> Result<Vec<PathBuf>> {
    let cells = dir.join(CELLS_YAML);
    if cells.is_file() {
        return Ok(vec![cells]);
    }
    let files = discovery::files_with_suffix(dir, REFLECTION_SUFFIX)?;
    if files.is_empty() {
        return Err(CliError::Argument(format!(
            "no {} or *{} files found in {}",
            CELLS_YAML,
            REFLECTION_SUFFIX,
            dir.display()
        )));
    }
    Ok(files)
}

/// Reads merge sources from a cell list or from a reflection file header.
fn load_sources(path: &Path) -> Result<Vec<MergeSource>> {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "yaml" | "yml" => {
            let records =
                CellsYamlFile::read_from_path(path).map_err(|e| CliError::parsing(path, e))?;
            let mut sources = Vec::with_capacity(records.len());
            for record in records {
                match UnitCell::new(record.unit_cell) {
                    Ok(cell) => sources.push(MergeSource {
                        file: record.reflection_file(),
                        cell,
                        space_group: record.space_group,
                    }),
                    Err(e) => warn!("Skipping {} #{}: {}", record.directory, record.number, e),
                }
            }
            Ok(sources)
        }
        "hkl" => {
            let header = XdsAsciiFile::read_from_path(path).map_err(|e| CliError::parsing(path, e))?;
            Ok(vec![MergeSource {
                file: path.to_path_buf(),
                cell: header.cell,
                space_group: header.space_group,
            }])
        }
        _ => Err(CliError::Argument(format!(
            "cannot read cells from {} (expected .yaml or .HKL)",
            path.display()
        ))),
    }
}
