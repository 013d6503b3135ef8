//! Gradient and Hessian reshaping and GRRM text formatting.
//!
//! Matrices are `DMatrix<String>`: xtb's digits travel to GRRM untouched, and
//! nalgebra still gives us shape bookkeeping and cheap sub-views.
//!
//! # Frozen atoms
//!
//! xtb sees the frozen atoms appended after the regular ones (see
//! [`crate::qm_interface::write_xyz_input`]), so their rows and columns are
//! always the trailing ones. Resizing therefore just keeps the leading block
//! for `num_atoms` atoms.
//!
//! # Hessian layout
//!
//! GRRM reads the lower triangle in blocks of five columns:
//!
//! ```text
//! block 0: rows 0..n, columns 0..min(5, row+1)
//! block 1: rows 5..n, columns 5..min(10, row+1)
//! ...
//! ```
//!
//! each value right-justified in a 16-character field.

use nalgebra::DMatrix;

/// Zero as GRRM prints it.
pub const ZERO: &str = "0.000000000000";

/// Columns per Hessian block.
const HESSIAN_BLOCK_WIDTH: usize = 5;
/// Field width of one Hessian value.
const HESSIAN_FIELD_WIDTH: usize = 16;

/// A matrix of numeric tokens kept as text.
pub type TextMatrix = DMatrix<String>;

/// Drops the rows and columns that belong to frozen atoms.
///
/// Returns the leading `3 * num_atoms` square block. A matrix that is not
/// larger than that is returned unchanged.
pub fn resize_hessian(hessian: &TextMatrix, num_atoms: usize) -> TextMatrix {
    let size = num_atoms.saturating_mul(3);
    if size >= hessian.nrows() {
        return hessian.clone();
    }
    let cols = size.min(hessian.ncols());
    hessian.view((0, 0), (size, cols)).into_owned()
}

/// Keeps the gradient rows of the first `num_atoms` atoms.
pub fn resize_gradient(gradient: &TextMatrix, num_atoms: usize) -> TextMatrix {
    if num_atoms >= gradient.nrows() {
        return gradient.clone();
    }
    gradient.rows(0, num_atoms).into_owned()
}

/// Formats a Hessian as GRRM's blocked lower triangle.
pub fn format_hessian(hessian: &TextMatrix) -> Vec<String> {
    let rows = hessian.nrows();
    let cols = hessian.ncols();
    let blocks = rows.div_ceil(HESSIAN_BLOCK_WIDTH);

    let mut lines = Vec::new();
    for block in 0..blocks {
        let first_col = HESSIAN_BLOCK_WIDTH * block;
        for row in first_col..rows {
            let last_col = (first_col + HESSIAN_BLOCK_WIDTH).min(cols).min(row + 1);
            let line: String = (first_col..last_col)
                .map(|col| format!("{:>width$}", hessian[(row, col)], width = HESSIAN_FIELD_WIDTH))
                .collect();
            lines.push(line);
        }
    }
    lines
}

/// Formats a gradient as one `"  value"` line per component, row-major.
pub fn format_gradient(gradient: &TextMatrix) -> Vec<String> {
    gradient
        .row_iter()
        .flat_map(|row| row.iter().map(|value| format!("  {}", value)).collect::<Vec<_>>())
        .collect()
}

/// Zero Hessian block for tasks that do not compute one.
pub fn dummy_hessian(num_atoms: usize) -> Vec<String> {
    let size = 3 * num_atoms;
    format_hessian(&DMatrix::from_element(size, size, ZERO.to_string()))
}

/// Zero gradient block for tasks that do not compute one.
pub fn dummy_gradient(num_atoms: usize) -> Vec<String> {
    vec![format!("  {}", ZERO); 3 * num_atoms]
}

/// Zero dipole-derivative block, one triplet per Cartesian component.
pub fn dummy_dipole_derivatives(num_atoms: usize) -> Vec<String> {
    vec![format!("  {0}  {0}  {0}", ZERO); 3 * num_atoms]
}
