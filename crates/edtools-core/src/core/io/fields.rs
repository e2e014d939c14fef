use crate::core::models::cell::{CellError, UnitCell};
use std::str::FromStr;
use thiserror::Error;

/// Why a single whitespace-separated record could not be decoded.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FieldErrorKind {
    #[error("Expected at least {expected} fields, found {found}")]
    TooFewFields { expected: usize, found: usize },
    #[error("Invalid {kind} for {field} (value: '{value}')")]
    InvalidNumber {
        field: &'static str,
        kind: &'static str,
        value: String,
    },
    #[error("Invalid unit cell: {0}")]
    InvalidCell(#[from] CellError),
}

pub(crate) fn parse_int<T: FromStr>(
    tokens: &[&str],
    index: usize,
    field: &'static str,
) -> Result<T, FieldErrorKind> {
    parse_token(tokens, index, field, "integer", |s| s)
}

/// Parses a float, ignoring a trailing `%` or `*` marker.
pub(crate) fn parse_float(
    tokens: &[&str],
    index: usize,
    field: &'static str,
) -> Result<f64, FieldErrorKind> {
    parse_token(tokens, index, field, "number", |s| {
        s.trim_end_matches(['%', '*'])
    })
}

fn parse_token<'t, T: FromStr>(
    tokens: &[&'t str],
    index: usize,
    field: &'static str,
    kind: &'static str,
    clean: impl Fn(&'t str) -> &'t str,
) -> Result<T, FieldErrorKind> {
    let raw = tokens.get(index).ok_or(FieldErrorKind::TooFewFields {
        expected: index + 1,
        found: tokens.len(),
    })?;
    clean(*raw)
        .parse()
        .map_err(|_| FieldErrorKind::InvalidNumber {
            field,
            kind,
            value: (*raw).to_string(),
        })
}

/// Parses six consecutive tokens starting at `start` into a validated cell.
pub(crate) fn parse_cell(tokens: &[&str], start: usize) -> Result<UnitCell, FieldErrorKind> {
    if tokens.len() < start + 6 {
        return Err(FieldErrorKind::TooFewFields {
            expected: start + 6,
            found: tokens.len(),
        });
    }
    let mut params = [0.0; 6];
    for (k, slot) in params.iter_mut().enumerate() {
        *slot = parse_float(tokens, start + k, "unit cell")?;
    }
    Ok(UnitCell::new(params)?)
}
