//! Validation of symmetric positive-definite stacks.
//!
//! Cheap structural checks (shape, finiteness, symmetry, diagonal sign) run
//! first. Positive-definiteness itself is decided by attempting the LDL'
//! factorization: a non-positive pivot is the definitive failure.

use crate::error::{Error, MatrixDefect, Result};
use crate::ldl::ldl_decompose_inplace;
use crate::parallel::{ParallelConfig, for_each_slice_mut, map_slices};
use crate::stack::MatrixStack;

/// Relative tolerance for `|a_ij - a_ji|`, scaled by `max(1, max |a|)` of the slice.
pub const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// A stack that passed validation, with the factors of the trial decomposition.
#[derive(Debug, Clone)]
pub struct ValidatedStack {
    /// The input with every slice replaced by `(M + M') / 2`.
    pub matrices: MatrixStack,
    /// LDL' factors of `matrices`.
    pub ldl: MatrixStack,
}

/// Check that every slice is square, symmetric and positive-definite.
pub fn validate(stack: &MatrixStack) -> Result<()> {
    validate_and_factor(stack, &ParallelConfig::default()).map(|_| ())
}

/// Validate `stack` and keep the symmetrized copy and its LDL' factors.
pub fn validate_and_factor(stack: &MatrixStack, config: &ParallelConfig) -> Result<ValidatedStack> {
    check_structure(stack, config)?;

    let matrices = symmetrize(stack);
    let mut ldl = matrices.clone();
    let n = ldl.rows();
    let len = ldl.slice_len();
    for_each_slice_mut(ldl.as_mut_slice(), len, config, |_, slice| {
        ldl_decompose_inplace(slice, n)
    })?;

    Ok(ValidatedStack { matrices, ldl })
}

/// Structural checks that need no factorization.
///
/// Fails with [`Error::InvalidDimension`] for an empty dimension and
/// [`Error::InvalidMatrix`] for the first defective slice.
pub fn check_structure(stack: &MatrixStack, config: &ParallelConfig) -> Result<()> {
    let [rows, cols, slices] = stack.shape();
    if rows == 0 || cols == 0 || slices == 0 {
        return Err(Error::InvalidDimension {
            rows,
            cols,
            slices,
        });
    }
    if rows != cols {
        return Err(Error::InvalidMatrix {
            slice: 0,
            defect: MatrixDefect::NotSquare { rows, cols },
        });
    }

    map_slices(slices, config, |k| {
        check_slice(stack.slice_data(k), rows).map_err(|defect| Error::InvalidMatrix {
            slice: k,
            defect,
        })
    })
    .map(|_| ())
}

fn check_slice(a: &[f64], n: usize) -> std::result::Result<(), MatrixDefect> {
    let mut max_abs: f64 = 1.0;
    for (idx, v) in a.iter().enumerate() {
        if !v.is_finite() {
            return Err(MatrixDefect::NonFinite {
                row: idx % n,
                col: idx / n,
            });
        }
        max_abs = max_abs.max(v.abs());
    }

    let tol = SYMMETRY_TOLERANCE * max_abs;
    for col in 0..n {
        for row in (col + 1)..n {
            let deviation = (a[row + col * n] - a[col + row * n]).abs();
            if deviation > tol {
                return Err(MatrixDefect::NotSymmetric {
                    row,
                    col,
                    deviation,
                });
            }
        }
    }

    for index in 0..n {
        let value = a[index + index * n];
        if value <= 0.0 {
            return Err(MatrixDefect::NonPositiveDiagonal { index, value });
        }
    }

    Ok(())
}

/// Replace every square slice `M` with `(M + M') / 2`.
pub fn symmetrize(stack: &MatrixStack) -> MatrixStack {
    let mut out = stack.clone();
    if !stack.is_square() {
        return out;
    }
    let n = stack.rows();
    for k in 0..stack.num_slices() {
        let slice = out.slice_data_mut(k);
        for col in 0..n {
            for row in (col + 1)..n {
                let avg = 0.5 * (slice[row + col * n] + slice[col + row * n]);
                slice[row + col * n] = avg;
                slice[col + row * n] = avg;
            }
        }
    }
    out
}
