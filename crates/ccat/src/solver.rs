//! # Recovery Solver
//!
//! Gauss–Jordan elimination over GF(256). The decoder turns its buffered
//! recoveries into an augmented system — one column per still-missing
//! original, one row per recovery, the reduced combination payload as the
//! right-hand side — and this module row-reduces it. Every column whose
//! pivot row reduces to a unit vector is solved; rows that still mix
//! several unknowns are left for a later attempt once more packets arrive.
//!
//! A rank-deficient system is not an error. Elimination cost is bounded by
//! [`MAX_RECOVERY_COLUMNS`] and [`MAX_RECOVERY_ROWS`]; the decoder defers
//! attempts on anything larger.
//!
//! Pivoting on a row-0 recovery hits the all-ones Cauchy row: the pivot is
//! already 1 and normalization is skipped, so the elimination step is a
//! plain XOR. That shortcut is the reason the first matrix row is all ones.

use crate::gf256;

/// Limit the number of unknowns in one recovery attempt.
pub const MAX_RECOVERY_COLUMNS: usize = 128;

/// Limit the number of recovery rows in one attempt.
pub const MAX_RECOVERY_ROWS: usize = MAX_RECOVERY_COLUMNS + 32;

/// One row of the augmented system: coefficients over the ordered unknown
/// set, and the reduced combination payload as the right-hand side. All
/// rows in a system must share the same `data` width.
#[derive(Debug, Clone)]
pub struct EliminationRow {
    pub coeffs: Vec<u8>,
    pub data: Vec<u8>,
}

/// Row-reduce the system in place and extract solved columns.
///
/// Returns `(column, payload)` pairs for every unknown whose pivot row is a
/// unit vector after reduction. The payload is the full-width right-hand
/// side scaled so the pivot is 1; the caller trims it to the true length.
pub fn eliminate(rows: &mut [EliminationRow], columns: usize) -> Vec<(usize, Vec<u8>)> {
    let mut pivot_of_col: Vec<Option<usize>> = vec![None; columns];
    let mut pivot_row = 0usize;

    for col in 0..columns {
        // Partial pivoting: first row below the frontier with a nonzero
        // coefficient in this column.
        let found = (pivot_row..rows.len()).find(|&r| rows[r].coeffs[col] != 0);
        let row_idx = match found {
            Some(r) => r,
            None => continue, // column unsolvable this round
        };
        rows.swap(pivot_row, row_idx);

        // Scale the pivot row so the pivot element becomes 1. Row-0
        // recoveries pivot at 1 already and skip this entirely.
        let pivot_val = rows[pivot_row].coeffs[col];
        if pivot_val != 1 {
            gf256::div_mem(&mut rows[pivot_row].coeffs, pivot_val);
            gf256::div_mem(&mut rows[pivot_row].data, pivot_val);
        }

        // Eliminate the column from every other row. One clone of the
        // pivot row per column keeps the borrow checker out of the inner
        // loop.
        let pivot_coeffs = rows[pivot_row].coeffs.clone();
        let pivot_data = rows[pivot_row].data.clone();
        for other in 0..rows.len() {
            if other == pivot_row {
                continue;
            }
            let factor = rows[other].coeffs[col];
            if factor == 0 {
                continue;
            }
            gf256::muladd_mem(&mut rows[other].coeffs, factor, &pivot_coeffs);
            gf256::muladd_mem(&mut rows[other].data, factor, &pivot_data);
        }

        pivot_of_col[col] = Some(pivot_row);
        pivot_row += 1;
        if pivot_row == rows.len() {
            break;
        }
    }

    // A column is solved only when its pivot row mixes no other unknown.
    let mut solved = Vec::new();
    for (col, pivot) in pivot_of_col.iter().enumerate() {
        let Some(row_idx) = pivot else { continue };
        let row = &rows[*row_idx];
        let is_unit = row
            .coeffs
            .iter()
            .enumerate()
            .all(|(j, &c)| if j == col { c == 1 } else { c == 0 });
        if is_unit {
            solved.push((col, row.data.clone()));
        }
    }
    solved
}
