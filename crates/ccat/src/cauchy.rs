//! # Cauchy Matrix
//!
//! Coefficient generator for recovery packets. Each element of a Cauchy
//! matrix is `1 / (x_i - y_j)` for disjoint parameter sets `{x_i}` and
//! `{y_j}`; such a matrix is always full rank, and any square submatrix is
//! invertible — the property that makes it an MDS erasure code when stacked
//! under an identity block.
//!
//! The row parameters are `x_i = row` for rows `0..64` and the column
//! parameters are `y_j = col + 64` for columns `0..192`, so the two sets
//! never intersect and rows + columns fill GF(256) exactly. Each column is
//! then divided by its first-row element, which turns the entire first row
//! into ones:
//!
//! ```text
//! element(row, col) = (y_j + x_0) / (x_i + y_j)    with x_0 = 0
//!                   = y_j / (row XOR y_j)           in GF(256)
//! ```
//!
//! An all-ones row means a `row = 0` recovery packet is a plain XOR of its
//! window, and elimination steps that pivot on it degenerate to XOR. The
//! `row` argument here is the literal row index carried on the wire.

use crate::gf256;

/// Max original columns in the matrix. 192 originals leave 64 recovery rows
/// (192 + 64 = 256), enough for a 33% FEC rate, and 192 is a multiple of 64
/// so column bitmaps pack into whole words.
pub const MATRIX_COLUMN_COUNT: usize = 192;

/// Max recovery rows in the matrix.
pub const MATRIX_ROW_COUNT: usize = 256 - MATRIX_COLUMN_COUNT;

/// Coefficient for recovery row `row` and original column `col`.
///
/// `element(0, col) == 1` for every column.
#[inline]
pub fn element(row: u8, col: u8) -> u8 {
    debug_assert!((row as usize) < MATRIX_ROW_COUNT);
    debug_assert!((col as usize) < MATRIX_COLUMN_COUNT);
    let y = col + MATRIX_ROW_COUNT as u8;
    gf256::div(y, row ^ y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_row_is_all_ones() {
        for col in 0..MATRIX_COLUMN_COUNT as u8 {
            assert_eq!(element(0, col), 1, "col={col}");
        }
    }

    #[test]
    fn elements_are_nonzero() {
        for row in 0..MATRIX_ROW_COUNT as u8 {
            for col in 0..MATRIX_COLUMN_COUNT as u8 {
                assert_ne!(element(row, col), 0, "row={row} col={col}");
            }
        }
    }

    #[test]
    fn rows_are_distinct_per_column() {
        // Any two rows must differ in every column, otherwise subtracting
        // one recovery from another could cancel a column unexpectedly.
        for col in 0..MATRIX_COLUMN_COUNT as u8 {
            for r1 in 0..MATRIX_ROW_COUNT as u8 {
                for r2 in (r1 + 1)..MATRIX_ROW_COUNT as u8 {
                    assert_ne!(element(r1, col), element(r2, col));
                }
            }
        }
    }

    #[test]
    fn two_by_two_minors_invertible() {
        // Spot-check the MDS property: every 2x2 submatrix has a nonzero
        // determinant, so any two recoveries from distinct rows can solve
        // any two lost columns they both cover.
        for (r1, r2) in [(0u8, 1u8), (1, 2), (0, 63), (17, 40)] {
            for (c1, c2) in [(0u8, 1u8), (0, 191), (95, 96), (3, 150)] {
                let det = crate::gf256::mul(element(r1, c1), element(r2, c2))
                    ^ crate::gf256::mul(element(r1, c2), element(r2, c1));
                assert_ne!(det, 0, "rows ({r1},{r2}) cols ({c1},{c2})");
            }
        }
    }

    #[test]
    fn matches_closed_form() {
        // element = y / (row ^ y) with y = col + 64
        let row = 5u8;
        let col = 10u8;
        let y = col + 64;
        assert_eq!(element(row, col), gf256::div(y, row ^ y));
    }
}
