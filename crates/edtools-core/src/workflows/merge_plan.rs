use crate::core::io::xscale_inp::{XscaleInp, XscaleInput};
use crate::core::models::cell::UnitCell;
use crate::core::symmetry::SpaceGroupTable;
use crate::core::utils::statistics::column_summary;
use crate::engine::error::EngineError;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// One reflection file to merge with its indexing result.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeSource {
    pub file: PathBuf,
    pub cell: UnitCell,
    pub space_group: u16,
}

/// How often a lattice (by its lowest-symmetry space group) occurs.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeCount {
    pub lattice: String,
    pub laue_symmetry: u16,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergePlan {
    pub cell: UnitCell,
    pub space_group: u16,
    /// Lattices among the sources, most common first.
    pub lattices: Vec<LatticeCount>,
}

/// Chooses the merge cell and space group.
///
/// Without overrides the cell is the mean cell and the space group the most
/// common lowest-symmetry space group (ties go to the first seen).
#[instrument(skip_all, name = "merge_plan_workflow")]
pub fn run(
    sources: &[MergeSource],
    table: &SpaceGroupTable,
    cell_override: Option<UnitCell>,
    space_group_override: Option<u16>,
) -> Result<MergePlan, EngineError> {
    if sources.is_empty() {
        return Err(EngineError::InsufficientData { found: 0 });
    }

    let mut lattices: Vec<LatticeCount> = Vec::new();
    for source in sources {
        let group = match table.get(source.space_group) {
            Ok(group) => group,
            Err(e) => {
                warn!("{}: {}", source.file.display(), e);
                continue;
            }
        };
        match lattices.iter_mut().find(|l| l.laue_symmetry == group.laue_symmetry) {
            Some(entry) => entry.count += 1,
            None => lattices.push(LatticeCount {
                lattice: group.lattice.clone(),
                laue_symmetry: group.laue_symmetry,
                count: 1,
            }),
        }
    }
    lattices.sort_by(|a, b| b.count.cmp(&a.count));

    let space_group = match space_group_override {
        Some(number) => {
            table.get(number)?;
            number
        }
        None => lattices
            .first()
            .map(|l| l.laue_symmetry)
            .ok_or(EngineError::InsufficientData { found: 0 })?,
    };

    let cell = match cell_override {
        Some(cell) => cell,
        None => {
            let params: Vec<[f64; 6]> = sources.iter().map(|s| *s.cell.params()).collect();
            let (mean, _, _) = column_summary(&params).unwrap_or_default();
            UnitCell::new(mean).map_err(|source| EngineError::InvalidCell {
                id: "mean cell".to_string(),
                source,
            })?
        }
    };

    info!(space_group, cell = %cell, files = sources.len(), "Merge plan ready.");
    Ok(MergePlan {
        cell,
        space_group,
        lattices,
    })
}

/// XSCALE.INP for all sources, with paths relative to `cwd` when possible.
pub fn xscale_input(plan: &MergePlan, sources: &[MergeSource], cwd: &Path, resolution: (f64, f64)) -> XscaleInp {
    let mut inp = XscaleInp::new(
        XscaleInp::space_group_line(plan.space_group),
        XscaleInp::unit_cell_line(&plan.cell),
        resolution,
    );
    inp.inputs = sources
        .iter()
        .map(|s| {
            let file = match s.file.strip_prefix(cwd) {
                Ok(relative) => relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/"),
                Err(_) => s.file.display().to_string(),
            };
            XscaleInput { file, origin: None }
        })
        .collect();
    inp
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn source(file: &str, a: f64, space_group: u16) -> MergeSource {
        MergeSource {
            file: PathBuf::from(file),
            cell: UnitCell::new([a, 12.0, 17.0, 90.0, 114.0, 90.0]).unwrap(),
            space_group,
        }
    }

    #[test]
    fn picks_mean_cell_and_most_common_lowest_symmetry() {
        let sources = vec![
            source("/w/a/XDS_ASCII.HKL", 38.0, 12),
            source("/w/b/XDS_ASCII.HKL", 39.0, 5),
            source("/w/c/XDS_ASCII.HKL", 40.0, 1),
        ];
        let plan = run(&sources, &SpaceGroupTable::standard(), None, None).unwrap();
        assert_eq!(plan.space_group, 5);
        assert_eq!(plan.lattices[0].lattice, "mC");
        assert_eq!(plan.lattices[0].count, 2);
        assert!(approx_eq(plan.cell.a(), 39.0));
    }

    #[test]
    fn overrides_take_precedence() {
        let sources = vec![source("a.HKL", 38.0, 5)];
        let cell = UnitCell::new([10.0, 10.0, 10.0, 90.0, 90.0, 90.0]).unwrap();
        let plan = run(&sources, &SpaceGroupTable::standard(), Some(cell), Some(14)).unwrap();
        assert_eq!(plan.space_group, 14);
        assert_eq!(plan.cell, cell);
        assert!(matches!(
            run(&sources, &SpaceGroupTable::standard(), None, Some(300)),
            Err(EngineError::Symmetry(_))
        ));
    }

    #[test]
    fn input_paths_are_relative_to_working_directory() {
        let sources = vec![source("/w/a/XDS_ASCII.HKL", 38.0, 5), source("/elsewhere/b.HKL", 39.0, 5)];
        let plan = run(&sources, &SpaceGroupTable::standard(), None, None).unwrap();
        let inp = xscale_input(&plan, &sources, Path::new("/w"), (20.0, 0.8));
        assert_eq!(inp.inputs[0].file, "a/XDS_ASCII.HKL");
        assert_eq!(inp.inputs[1].file, "/elsewhere/b.HKL");
        assert_eq!(inp.space_group_line, "SPACE_GROUP_NUMBER= 5");
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(run(&[], &SpaceGroupTable::standard(), None, None).is_err());
    }
}
