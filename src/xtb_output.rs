//! Readers for the files xtb leaves in its working directory.
//!
//! | File | First line | Content used |
//! |------|-----------|--------------|
//! | `energy` | `$energy` | second token of line 1 |
//! | `gradient` | `$grad` | `n` rows after the `n` coordinate rows |
//! | `hessian` | `$hessian` | every token up to `$end`, `3n x 3n` |
//! | `xtbopt.xyz` | atom count | lines `2..2+n` |
//!
//! `n` is always the full atom count handed to xtb, frozen atoms included.

use crate::convert::TextMatrix;
use crate::text::{LineCursor, Result};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use std::path::Path;

lazy_static! {
    // 1.23, -0.032, 1.2e-4, .123, -1.0D-03
    static ref FLOAT_RE: Regex =
        Regex::new(r"^[-+]?(?:\d+\.\d*|\.\d+|\d+)(?:[eEdD][-+]?\d+)?$").unwrap();
}

/// Reads the Hessian written by `xtb --hess`.
///
/// Blank lines are skipped and reading stops at `$end`; the remaining tokens
/// must fill a `3 * num_atoms` square matrix, filled row by row.
pub fn read_hessian(path: &Path, num_atoms: usize) -> Result<TextMatrix> {
    let cursor = LineCursor::open(path)?;
    cursor.expect_tag(0, "$hessian")?;

    let mut values: Vec<String> = Vec::new();
    for (_, line) in cursor.iter_from(1) {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with("$end") {
            break;
        }
        values.extend(trimmed.split_whitespace().map(str::to_string));
    }

    // (side, element count); None when 3 * num_atoms overflows
    let expected = num_atoms
        .checked_mul(3)
        .and_then(|size| size.checked_mul(size).map(|len| (size, len)));
    let size = match expected {
        Some((size, len)) if len == values.len() => size,
        _ => {
            return Err(cursor.error(
                cursor.len(),
                format!(
                    "Hessian data size mismatch: expected {}, got {}",
                    expected.map_or_else(|| "more".to_string(), |(_, len)| len.to_string()),
                    values.len()
                ),
            ))
        }
    };

    debug!("Read {}x{} Hessian from {}", size, size, path.display());
    Ok(TextMatrix::from_row_slice(size, size, &values))
}

/// Reads the total energy from xtb's `energy` file.
pub fn read_energy(path: &Path) -> Result<String> {
    let cursor = LineCursor::open(path)?;
    cursor.expect_tag(0, "$energy")?;

    let line = cursor.line(1)?;
    let energy = line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| cursor.error(1, format!("no energy value in '{}'", line.trim())))?;
    if !FLOAT_RE.is_match(energy) {
        return Err(cursor.error(1, format!("invalid energy value '{}'", energy)));
    }

    debug!("Read energy {} from {}", energy, path.display());
    Ok(energy.to_string())
}

/// Reads the Cartesian gradient from xtb's Turbomole-style `gradient` file.
///
/// Layout: `$grad`, a cycle line, `num_atoms` coordinate rows, then the
/// `num_atoms` gradient rows that are returned.
pub fn read_gradient(path: &Path, num_atoms: usize) -> Result<TextMatrix> {
    let cursor = LineCursor::open(path)?;
    cursor.expect_tag(0, "$grad")?;

    let first = num_atoms
        .checked_add(2)
        .ok_or_else(|| cursor.error(0, format!("invalid atom count {}", num_atoms)))?;
    let rows = cursor.lines(first, num_atoms)?;
    let mut values = Vec::with_capacity(3 * rows.len());
    for (offset, row) in rows.iter().enumerate() {
        let tokens: Vec<&str> = row.split_whitespace().collect();
        if tokens.len() != 3 {
            return Err(cursor.error(
                first + offset,
                format!("expected 3 gradient components, found {}", tokens.len()),
            ));
        }
        values.extend(tokens.into_iter().map(str::to_string));
    }

    debug!("Read gradient of {} atoms from {}", num_atoms, path.display());
    Ok(TextMatrix::from_row_slice(num_atoms, 3, &values))
}

/// Reads the coordinate lines of an XYZ file (the optimised geometry).
pub fn read_xyz(path: &Path) -> Result<Vec<String>> {
    let cursor = LineCursor::open(path)?;
    let count_line = cursor.line(0)?;
    let num_atoms: usize = cursor.parse_int(0, count_line, "atom count")?;
    Ok(cursor.lines(2, num_atoms)?.to_vec())
}
