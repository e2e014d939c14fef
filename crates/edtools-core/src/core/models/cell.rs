use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Names of the six unit-cell parameters, in storage order.
pub const PARAMETER_NAMES: [&str; 6] = ["a", "b", "c", "al", "be", "ga"];

/// Smallest volume radicand accepted for a cell; flatter cells have no usable volume.
pub const MIN_RADICAND: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CellError {
    #[error("Cell edge '{name}' must be positive (value: {value})")]
    NonPositiveLength { name: &'static str, value: f64 },
    #[error("Cell angle '{name}' must lie strictly between 0 and 180 degrees (value: {value})")]
    AngleOutOfRange { name: &'static str, value: f64 },
    #[error("Cell angles do not describe a closed lattice (volume radicand {radicand:.3e} is not positive)")]
    DegenerateGeometry { radicand: f64 },
    #[error("Cell parameters must be finite numbers")]
    NotFinite,
    #[error("Expected 6 cell parameters, found {0}")]
    WrongCount(usize),
}

/// A crystallographic unit cell: three edge lengths in Ångström and three
/// interaxial angles in degrees.
///
/// The angle `alpha` lies between `b` and `c`, `beta` between `a` and `c`,
/// and `gamma` between `a` and `b`, so each angle is "opposite" the axis
/// with the same index. A `UnitCell` is always physically valid: construction
/// through [`UnitCell::new`] rejects non-positive edges, angles outside the
/// open interval (0°, 180°), and angle combinations whose volume radicand
/// is not above [`MIN_RADICAND`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 6]", into = "[f64; 6]")]
pub struct UnitCell {
    params: [f64; 6],
}

impl UnitCell {
    /// Validates the six parameters and builds a cell.
    ///
    /// # Errors
    ///
    /// Returns a [`CellError`] describing the first violated constraint.
    pub fn new(params: [f64; 6]) -> Result<Self, CellError> {
        if params.iter().any(|v| !v.is_finite()) {
            return Err(CellError::NotFinite);
        }
        for (i, &value) in params[..3].iter().enumerate() {
            if value <= 0.0 {
                return Err(CellError::NonPositiveLength {
                    name: PARAMETER_NAMES[i],
                    value,
                });
            }
        }
        for (i, &value) in params[3..].iter().enumerate() {
            if value <= 0.0 || value >= 180.0 {
                return Err(CellError::AngleOutOfRange {
                    name: PARAMETER_NAMES[i + 3],
                    value,
                });
            }
        }
        let radicand = volume_radicand(&params);
        if radicand.is_nan() || radicand <= MIN_RADICAND {
            return Err(CellError::DegenerateGeometry { radicand });
        }
        Ok(Self { params })
    }

    pub fn a(&self) -> f64 {
        self.params[0]
    }
    pub fn b(&self) -> f64 {
        self.params[1]
    }
    pub fn c(&self) -> f64 {
        self.params[2]
    }
    pub fn alpha(&self) -> f64 {
        self.params[3]
    }
    pub fn beta(&self) -> f64 {
        self.params[4]
    }
    pub fn gamma(&self) -> f64 {
        self.params[5]
    }

    /// The parameters as `[a, b, c, alpha, beta, gamma]`.
    pub fn params(&self) -> &[f64; 6] {
        &self.params
    }

    pub fn lengths(&self) -> [f64; 3] {
        [self.params[0], self.params[1], self.params[2]]
    }

    pub fn angles(&self) -> [f64; 3] {
        [self.params[3], self.params[4], self.params[5]]
    }

    /// Returns `1 + 2 cos(α) cos(β) cos(γ) − cos²α − cos²β − cos²γ`.
    pub fn radicand(&self) -> f64 {
        volume_radicand(&self.params)
    }

    /// Computes the cell volume in Å³ using the general triclinic formula.
    pub fn volume(&self) -> f64 {
        volume_of(&self.params)
    }

    /// Returns an equivalent cell whose axes are sorted so that `a <= b <= c`.
    ///
    /// Each angle travels with its opposite axis, so the lattice (and therefore
    /// the volume) is unchanged; only the labelling of the axes differs. This is
    /// the normalization applied before metrics that assume consistent axis
    /// ordering.
    pub fn sorted_by_length(&self) -> Self {
        let mut order = [0usize, 1, 2];
        order.sort_by(|&i, &j| self.params[i].total_cmp(&self.params[j]));
        let mut params = [0.0; 6];
        for (slot, &axis) in order.iter().enumerate() {
            params[slot] = self.params[axis];
            params[slot + 3] = self.params[axis + 3];
        }
        Self { params }
    }

    /// Returns the cell with axes relabelled `(a, b, c) -> (b, c, a)`.
    pub fn cycled(&self) -> Self {
        let p = &self.params;
        Self {
            params: [p[1], p[2], p[0], p[4], p[5], p[3]],
        }
    }
}

impl TryFrom<[f64; 6]> for UnitCell {
    type Error = CellError;

    fn try_from(params: [f64; 6]) -> Result<Self, Self::Error> {
        Self::new(params)
    }
}

impl TryFrom<&[f64]> for UnitCell {
    type Error = CellError;

    fn try_from(values: &[f64]) -> Result<Self, Self::Error> {
        let params: [f64; 6] = values
            .try_into()
            .map_err(|_| CellError::WrongCount(values.len()))?;
        Self::new(params)
    }
}

impl From<UnitCell> for [f64; 6] {
    fn from(cell: UnitCell) -> Self {
        cell.params
    }
}

impl fmt::Display for UnitCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for value in &self.params {
            write!(f, "{:10.2}", value)?;
        }
        Ok(())
    }
}

/// The radicand of the triclinic volume formula for raw parameters.
pub fn volume_radicand(params: &[f64; 6]) -> f64 {
    let (ca, cb, cg) = (
        params[3].to_radians().cos(),
        params[4].to_radians().cos(),
        params[5].to_radians().cos(),
    );
    1.0 + 2.0 * ca * cb * cg - ca * ca - cb * cb - cg * cg
}

/// Volume for raw parameters; `NaN` when the radicand is negative.
pub fn volume_of(params: &[f64; 6]) -> f64 {
    params[0] * params[1] * params[2] * volume_radicand(params).sqrt()
}

/// How cell angles are represented before a Euclidean comparison.
///
/// Reporting programs are free to give either `θ` or `180° − θ` for an
/// angle. `Sine` folds both onto the same value; `Radians` only shrinks the
/// weight of angle differences relative to length differences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AngleTransform {
    #[default]
    Degrees,
    Radians,
    Sine,
}

impl AngleTransform {
    /// Returns a transformed copy of `params`; lengths are left untouched.
    pub fn apply(&self, params: &[f64; 6]) -> [f64; 6] {
        let mut out = *params;
        match self {
            AngleTransform::Degrees => {}
            AngleTransform::Radians => {
                for v in &mut out[3..] {
                    *v = v.to_radians();
                }
            }
            AngleTransform::Sine => {
                for v in &mut out[3..] {
                    *v = v.to_radians().sin();
                }
            }
        }
        out
    }
}

impl fmt::Display for AngleTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AngleTransform::Degrees => "degrees",
            AngleTransform::Radians => "radians",
            AngleTransform::Sine => "sine",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for AngleTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "degrees" | "degree" | "deg" => Ok(AngleTransform::Degrees),
            "radians" | "radian" | "rad" => Ok(AngleTransform::Radians),
            "sine" | "sin" => Ok(AngleTransform::Sine),
            _ => Err(format!(
                "unknown angle transform '{}' (expected degrees, radians or sine)",
                s
            )),
        }
    }
}
