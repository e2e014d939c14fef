//! # Symmetry Module
//!
//! A read-only reference table of the 230 crystallographic space groups,
//! reduced to what the processing tools need: the Hermann–Mauguin symbol,
//! the crystal system, the Bravais lattice and the lowest-symmetry space
//! group sharing that lattice.
//!
//! The table is built explicitly with [`SpaceGroupTable::standard`] and
//! passed to whoever needs it; there is no process-wide instance.

use phf::{Map, phf_map};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SymmetryError {
    #[error("Unknown space group number {0} (expected 1-230)")]
    UnknownSpaceGroup(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrystalSystem {
    Triclinic,
    Monoclinic,
    Orthorhombic,
    Tetragonal,
    Trigonal,
    Hexagonal,
    Cubic,
}

impl CrystalSystem {
    fn from_number(number: u16) -> Self {
        match number {
            1..=2 => Self::Triclinic,
            3..=15 => Self::Monoclinic,
            16..=74 => Self::Orthorhombic,
            75..=142 => Self::Tetragonal,
            143..=167 => Self::Trigonal,
            168..=194 => Self::Hexagonal,
            _ => Self::Cubic,
        }
    }

    /// Lattice family letter used in Bravais lattice symbols.
    fn family(&self) -> char {
        match self {
            Self::Triclinic => 'a',
            Self::Monoclinic => 'm',
            Self::Orthorhombic => 'o',
            Self::Tetragonal => 't',
            Self::Trigonal | Self::Hexagonal => 'h',
            Self::Cubic => 'c',
        }
    }
}

impl fmt::Display for CrystalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Triclinic => "triclinic",
            Self::Monoclinic => "monoclinic",
            Self::Orthorhombic => "orthorhombic",
            Self::Tetragonal => "tetragonal",
            Self::Trigonal => "trigonal",
            Self::Hexagonal => "hexagonal",
            Self::Cubic => "cubic",
        };
        f.write_str(name)
    }
}

/// Lowest-symmetry space group for each Bravais lattice.
static LOWEST_SYMMETRY: Map<&'static str, u16> = phf_map! {
    "aP" => 1, "mP" => 3, "mC" => 5, "mI" => 5,
    "oP" => 16, "oC" => 21, "oI" => 23, "oF" => 22,
    "tP" => 75, "tI" => 79, "hP" => 143, "hR" => 146,
    "cP" => 195, "cF" => 196, "cI" => 197,
};

const SYMBOLS: [&str; 230] = [
    "P1", "P-1", "P2", "P21", "C2", "Pm", "Pc", "Cm", "Cc", "P2/m",
    "P21/m", "C2/m", "P2/c", "P21/c", "C2/c", "P222", "P2221", "P21212", "P212121", "C2221",
    "C222", "F222", "I222", "I212121", "Pmm2", "Pmc21", "Pcc2", "Pma2", "Pca21", "Pnc2",
    "Pmn21", "Pba2", "Pna21", "Pnn2", "Cmm2", "Cmc21", "Ccc2", "Amm2", "Abm2", "Ama2",
    "Aba2", "Fmm2", "Fdd2", "Imm2", "Iba2", "Ima2", "Pmmm", "Pnnn", "Pccm", "Pban",
    "Pmma", "Pnna", "Pmna", "Pcca", "Pbam", "Pccn", "Pbcm", "Pnnm", "Pmmn", "Pbcn",
    "Pbca", "Pnma", "Cmcm", "Cmca", "Cmmm", "Cccm", "Cmma", "Ccca", "Fmmm", "Fddd",
    "Immm", "Ibam", "Ibca", "Imma", "P4", "P41", "P42", "P43", "I4", "I41",
    "P-4", "I-4", "P4/m", "P42/m", "P4/n", "P42/n", "I4/m", "I41/a", "P422", "P4212",
    "P4122", "P41212", "P4222", "P42212", "P4322", "P43212", "I422", "I4122", "P4mm", "P4bm",
    "P42cm", "P42nm", "P4cc", "P4nc", "P42mc", "P42bc", "I4mm", "I4cm", "I41md", "I41cd",
    "P-42m", "P-42c", "P-421m", "P-421c", "P-4m2", "P-4c2", "P-4b2", "P-4n2", "I-4m2", "I-4c2",
    "I-42m", "I-42d", "P4/mmm", "P4/mcc", "P4/nbm", "P4/nnc", "P4/mbm", "P4/mnc", "P4/nmm", "P4/ncc",
    "P42/mmc", "P42/mcm", "P42/nbc", "P42/nnm", "P42/mbc", "P42/mnm", "P42/nmc", "P42/ncm", "I4/mmm", "I4/mcm",
    "I41/amd", "I41/acd", "P3", "P31", "P32", "R3", "P-3", "R-3", "P312", "P321",
    "P3112", "P3121", "P3212", "P3221", "R32", "P3m1", "P31m", "P3c1", "P31c", "R3m",
    "R3c", "P-31m", "P-31c", "P-3m1", "P-3c1", "R-3m", "R-3c", "P6", "P61", "P65",
    "P62", "P64", "P63", "P-6", "P6/m", "P63/m", "P622", "P6122", "P6522", "P6222",
    "P6422", "P6322", "P6mm", "P6cc", "P63cm", "P63mc", "P-6m2", "P-6c2", "P-62m", "P-62c",
    "P6/mmm", "P6/mcc", "P63/mcm", "P63/mmc", "P23", "F23", "I23", "P213", "I213", "Pm-3",
    "Pn-3", "Fm-3", "Fd-3", "Im-3", "Pa-3", "Ia-3", "P432", "P4232", "F432", "F4132",
    "I432", "P4332", "P4132", "I4132", "P-43m", "F-43m", "I-43m", "P-43n", "F-43c", "I-43d",
    "Pm-3m", "Pn-3n", "Pm-3n", "Pn-3m", "Fm-3m", "Fm-3c", "Fd-3m", "Fd-3c", "Im-3m", "Ia-3d",
];

/// One entry of the space-group table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceGroup {
    pub number: u16,
    pub symbol: &'static str,
    pub system: CrystalSystem,
    /// Bravais lattice symbol such as `mC` or `hR`.
    pub lattice: String,
    /// Number of the lowest-symmetry space group with the same lattice.
    pub laue_symmetry: u16,
}

impl SpaceGroup {
    fn build(number: u16, symbol: &'static str) -> Self {
        let system = CrystalSystem::from_number(number);
        let centering = match (system, symbol.chars().next()) {
            (CrystalSystem::Orthorhombic, Some('A')) => 'C',
            (_, Some(c)) => c,
            (_, None) => 'P',
        };
        let lattice = format!("{}{}", system.family(), centering);
        let laue_symmetry = LOWEST_SYMMETRY.get(lattice.as_str()).copied().unwrap_or(number);
        Self {
            number,
            symbol,
            system,
            lattice,
            laue_symmetry,
        }
    }
}

/// Read-only lookup table for space groups 1-230.
#[derive(Debug, Clone)]
pub struct SpaceGroupTable {
    groups: Vec<SpaceGroup>,
}

impl SpaceGroupTable {
    pub fn standard() -> Self {
        let groups = SYMBOLS
            .iter()
            .zip(1u16..)
            .map(|(symbol, number)| SpaceGroup::build(number, symbol))
            .collect();
        Self { groups }
    }

    pub fn get(&self, number: u16) -> Result<&SpaceGroup, SymmetryError> {
        number
            .checked_sub(1)
            .and_then(|i| self.groups.get(i as usize))
            .ok_or(SymmetryError::UnknownSpaceGroup(number))
    }

    /// Lowest-symmetry space group for a Bravais lattice symbol.
    pub fn lowest_symmetry(&self, lattice: &str) -> Option<u16> {
        LOWEST_SYMMETRY.get(lattice).copied()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Support for one Bravais lattice across a batch of datasets.
#[derive(Debug, Clone, PartialEq)]
pub struct LatticeScore {
    pub lattice: String,
    pub lowest_space_group: u16,
    /// Number of datasets indexed in this lattice.
    pub count: usize,
    /// Summed weight (usually indexed reflections) of those datasets.
    pub score: f64,
}

/// Ranks lattices by summed weight, highest first. Ties keep the order in
/// which the lattices were first seen; unknown space groups are skipped.
pub fn rank_lattices<I>(table: &SpaceGroupTable, entries: I) -> Vec<LatticeScore>
where
    I: IntoIterator<Item = (u16, f64)>,
{
    let mut order: Vec<LatticeScore> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (number, weight) in entries {
        let group = match table.get(number) {
            Ok(group) => group,
            Err(e) => {
                warn!("Skipping dataset in lattice ranking: {}", e);
                continue;
            }
        };
        let slot = *index.entry(group.lattice.clone()).or_insert_with(|| {
            order.push(LatticeScore {
                lattice: group.lattice.clone(),
                lowest_space_group: group.laue_symmetry,
                count: 0,
                score: 0.0,
            });
            order.len() - 1
        });
        order[slot].count += 1;
        order[slot].score += weight;
    }

    order.sort_by(|a, b| b.score.total_cmp(&a.score));
    order
}
