//! Square-root-free LDL' Cholesky factorization.
//!
//! The factorization is computed in place on a column-major `n × n` buffer:
//! the strictly lower triangle receives the unit-lower factor `L` (its unit
//! diagonal is implicit) and the diagonal receives `D`, so that
//! `L · diag(D) · L' = M`. Only the lower triangle of the input is read and
//! the upper triangle is left as it was.
//!
//! Compared to the LL' form this avoids `n` square roots, and the matching
//! solve in [`ldl_solve_into`] never divides by a square root either.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::parallel::{ParallelConfig, for_each_slice_mut, map_slices};
use crate::stack::MatrixStack;
use crate::validate::check_structure;

/// A pivot must exceed `n * PIVOT_TOLERANCE_FACTOR * |m_jj|` to be accepted.
pub const PIVOT_TOLERANCE_FACTOR: f64 = f64::EPSILON;

/// Factor one column-major `n × n` matrix in place.
///
/// Fails with [`Error::NotPositiveDefinite`] (slice 0, pivot `j`) on the first
/// pivot that is not safely positive. On failure the buffer is partially
/// overwritten.
pub fn ldl_decompose_inplace(a: &mut [f64], n: usize) -> Result<()> {
    if a.len() != n * n {
        return Err(Error::DimensionMismatch {
            expected: n * n,
            actual: a.len(),
        });
    }

    let scale = n as f64 * PIVOT_TOLERANCE_FACTOR;

    for j in 0..n {
        let m_jj = a[j + j * n];
        let mut d = m_jj;
        for c in 0..j {
            let l_jc = a[j + c * n];
            d -= l_jc * l_jc * a[c + c * n];
        }

        // Negated comparison so NaN pivots are rejected as well.
        if !(d > scale * m_jj.abs()) {
            log::trace!("LDL pivot {} rejected: d = {:e}", j, d);
            return Err(Error::NotPositiveDefinite {
                slice: 0,
                pivot: Some(j),
            });
        }
        a[j + j * n] = d;

        for i in (j + 1)..n {
            let mut s = a[i + j * n];
            for c in 0..j {
                s -= a[i + c * n] * a[j + c * n] * a[c + c * n];
            }
            a[i + j * n] = s / d;
        }
    }

    Ok(())
}

/// Solve `L · diag(D) · L' · x = b` for one factored slice.
///
/// `factors` is the output of [`ldl_decompose_inplace`]; `out` receives `x`.
pub fn ldl_solve_into(factors: &[f64], n: usize, b: &[f64], out: &mut [f64]) -> Result<()> {
    if b.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: b.len(),
        });
    }
    if factors.len() != n * n {
        return Err(Error::DimensionMismatch {
            expected: n * n,
            actual: factors.len(),
        });
    }
    if out.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: out.len(),
        });
    }

    // Forward: L y = b, unit diagonal.
    out.copy_from_slice(b);
    for c in 0..n {
        let y_c = out[c];
        for i in (c + 1)..n {
            out[i] -= factors[i + c * n] * y_c;
        }
    }

    // z = y / D
    for i in 0..n {
        out[i] /= factors[i + i * n];
    }

    // Backward: L' x = z, unit diagonal. Column i of L is row i of L'.
    for i in (0..n).rev() {
        let mut s = out[i];
        for r in (i + 1)..n {
            s -= factors[r + i * n] * out[r];
        }
        out[i] = s;
    }

    Ok(())
}

/// Compute the LDL' factorization of every slice of `stack` in place.
///
/// The slices are checked for shape, finiteness, symmetry and diagonal sign
/// first. Positive-definiteness is decided by the factorization itself. On
/// error the contents of `stack` are unspecified.
pub fn compute_chol_inplace(stack: &mut MatrixStack) -> Result<()> {
    compute_chol_inplace_with(stack, &ParallelConfig::default())
}

/// [`compute_chol_inplace`] with explicit parallel settings.
pub fn compute_chol_inplace_with(stack: &mut MatrixStack, config: &ParallelConfig) -> Result<()> {
    check_structure(stack, config)?;
    let n = stack.rows();
    let len = stack.slice_len();
    for_each_slice_mut(stack.as_mut_slice(), len, config, |_, slice| {
        ldl_decompose_inplace(slice, n)
    })
}

/// Solve every slice of an LDL' stack against the shared right-hand side.
///
/// Returns an `n × K` matrix whose column `k` solves slice `k`.
pub fn solve_ldl_stack(
    factors: &MatrixStack,
    rhs: &DVector<f64>,
    config: &ParallelConfig,
) -> Result<DMatrix<f64>> {
    let n = factors.rows();
    if rhs.len() != n {
        return Err(Error::DimensionMismatch {
            expected: n,
            actual: rhs.len(),
        });
    }

    let b = rhs.as_slice();
    let columns = map_slices(factors.num_slices(), config, |k| {
        let mut x = vec![0.0; n];
        ldl_solve_into(factors.slice_data(k), n, b, &mut x)?;
        Ok(x)
    })?;

    Ok(DMatrix::from_vec(n, columns.len(), columns.concat()))
}

/// Rebuild `L · diag(D) · L'` from one factored slice.
pub fn reconstruct_ldl(factors: &[f64], n: usize) -> DMatrix<f64> {
    let packed = DMatrix::from_column_slice(n, n, factors);
    let mut l = packed.lower_triangle();
    l.fill_diagonal(1.0);
    let d = packed.diagonal();
    let ld = DMatrix::from_fn(n, n, |i, j| l[(i, j)] * d[j]);
    ld * l.transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::dmatrix;

    fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a - b).abs().max()
    }

    #[test]
    fn test_ldl_2x2() {
        // [[2, 1], [1, 2]] = L diag(2, 1.5) L' with L[1,0] = 0.5
        let mut a = vec![2.0, 1.0, 1.0, 2.0];
        ldl_decompose_inplace(&mut a, 2).unwrap();

        assert!((a[0] - 2.0).abs() < 1e-14);
        assert!((a[3] - 1.5).abs() < 1e-14);
        assert!((a[1] - 0.5).abs() < 1e-14);
    }

    #[test]
    fn test_ldl_solve_2x2() {
        let mut a = vec![2.0, 1.0, 1.0, 2.0];
        ldl_decompose_inplace(&mut a, 2).unwrap();

        let mut x = vec![0.0; 2];
        ldl_solve_into(&a, 2, &[1.0, 1.0], &mut x).unwrap();

        assert!((x[0] - 1.0 / 3.0).abs() < 1e-14);
        assert!((x[1] - 1.0 / 3.0).abs() < 1e-14);
    }

    #[test]
    fn test_ldl_reconstructs_3x3() {
        let m = dmatrix![
            4.0, 12.0, -16.0;
            12.0, 37.0, -43.0;
            -16.0, -43.0, 98.0
        ];
        let mut a = m.as_slice().to_vec();
        ldl_decompose_inplace(&mut a, 3).unwrap();

        // Known LL' factor diag is [2, 1, 3] so D = [4, 1, 9].
        assert!((a[0] - 4.0).abs() < 1e-12);
        assert!((a[4] - 1.0).abs() < 1e-12);
        assert!((a[8] - 9.0).abs() < 1e-12);

        let rebuilt = reconstruct_ldl(&a, 3);
        assert!(max_abs_diff(&rebuilt, &m) < 1e-10);
    }

    #[test]
    fn test_ldl_ignores_upper_triangle() {
        let mut a = vec![2.0, 1.0, 99.0, 2.0];
        ldl_decompose_inplace(&mut a, 2).unwrap();
        assert!((a[1] - 0.5).abs() < 1e-14);
        assert!((a[3] - 1.5).abs() < 1e-14);
        assert_eq!(a[2], 99.0);
    }

    #[test]
    fn test_ldl_rejects_indefinite() {
        // Eigenvalues 3 and -1
        let mut a = vec![1.0, 2.0, 2.0, 1.0];
        let result = ldl_decompose_inplace(&mut a, 2);
        assert_eq!(
            result,
            Err(Error::NotPositiveDefinite {
                slice: 0,
                pivot: Some(1)
            })
        );
    }

    #[test]
    fn test_ldl_rejects_singular() {
        let mut a = vec![1.0, 1.0, 1.0, 1.0];
        let result = ldl_decompose_inplace(&mut a, 2);
        assert!(matches!(
            result,
            Err(Error::NotPositiveDefinite { pivot: Some(1), .. })
        ));
    }

    #[test]
    fn test_ldl_rejects_nan_pivot() {
        let mut a = vec![f64::NAN];
        assert!(ldl_decompose_inplace(&mut a, 1).is_err());
    }

    #[test]
    fn test_ldl_buffer_length_mismatch() {
        let mut a = vec![1.0; 5];
        let result = ldl_decompose_inplace(&mut a, 2);
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }

    #[test]
    fn test_solve_ldl_stack_shape() {
        let mut stack = MatrixStack::from_matrices(&[
            dmatrix![2.0, 0.0; 0.0, 4.0],
            dmatrix![1.0, 0.0; 0.0, 8.0],
            dmatrix![2.0, 1.0; 1.0, 2.0],
        ])
        .unwrap();
        compute_chol_inplace(&mut stack).unwrap();

        let rhs = DVector::from_vec(vec![2.0, 8.0]);
        let x = solve_ldl_stack(&stack, &rhs, &ParallelConfig::default()).unwrap();
        assert_eq!(x.shape(), (2, 3));
        assert!((x[(0, 0)] - 1.0).abs() < 1e-14);
        assert!((x[(1, 0)] - 2.0).abs() < 1e-14);
        assert!((x[(0, 1)] - 2.0).abs() < 1e-14);
        assert!((x[(1, 1)] - 1.0).abs() < 1e-14);
        assert!((x[(0, 2)] + 4.0 / 3.0).abs() < 1e-12);
        assert!((x[(1, 2)] - 14.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_solve_ldl_stack_rhs_mismatch() {
        let mut stack = MatrixStack::identity(3, 2);
        compute_chol_inplace(&mut stack).unwrap();
        let result = solve_ldl_stack(&stack, &DVector::zeros(2), &ParallelConfig::default());
        assert!(matches!(
            result,
            Err(Error::DimensionMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_compute_chol_inplace_reports_slice() {
        let mut stack = MatrixStack::from_matrices(&[
            dmatrix![2.0, 1.0; 1.0, 2.0],
            dmatrix![1.0, 2.0; 2.0, 1.0],
        ])
        .unwrap();
        let err = compute_chol_inplace(&mut stack).unwrap_err();
        assert_eq!(
            err,
            Error::NotPositiveDefinite {
                slice: 1,
                pivot: Some(1)
            }
        );
    }
}
