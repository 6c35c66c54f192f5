//! LL' Cholesky factorization and solves backed by nalgebra.
//!
//! This is the baseline the LDL' engine is checked against, and the engine
//! behind the LL' solve path.

use nalgebra::linalg::Cholesky;
use nalgebra::{DMatrix, DMatrixView, DVector};

use crate::error::{Error, Result};
use crate::parallel::{ParallelConfig, map_slices};
use crate::stack::MatrixStack;
use crate::validate::check_structure;

/// Factor one symmetric positive-definite matrix as `L · L'`.
///
/// Returns the lower-triangular `L` with zeros above the diagonal. Only the
/// lower triangle of `matrix` is read.
pub fn cholesky_ll(matrix: DMatrixView<'_, f64>) -> Result<DMatrix<f64>> {
    if !matrix.is_square() {
        return Err(Error::DimensionMismatch {
            expected: matrix.nrows(),
            actual: matrix.ncols(),
        });
    }

    Cholesky::new(matrix.into_owned())
        .map(|chol| chol.l())
        .ok_or(Error::NotPositiveDefinite {
            slice: 0,
            pivot: None,
        })
}

/// Solve `L · L' · x = b` with two triangular solves.
pub fn ll_solve(l: DMatrixView<'_, f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if l.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: l.nrows(),
            actual: b.len(),
        });
    }

    let y = l
        .solve_lower_triangular(b)
        .ok_or(Error::NotPositiveDefinite {
            slice: 0,
            pivot: None,
        })?;
    l.tr_solve_lower_triangular(&y)
        .ok_or(Error::NotPositiveDefinite {
            slice: 0,
            pivot: None,
        })
}

/// Compute the LL' factorization of every slice of `stack`.
pub fn compute_chol_reference(stack: &MatrixStack) -> Result<MatrixStack> {
    compute_chol_reference_with(stack, &ParallelConfig::default())
}

/// [`compute_chol_reference`] with explicit parallel settings.
pub fn compute_chol_reference_with(
    stack: &MatrixStack,
    config: &ParallelConfig,
) -> Result<MatrixStack> {
    check_structure(stack, config)?;
    let factors = map_slices(stack.num_slices(), config, |k| cholesky_ll(stack.slice(k)))?;
    MatrixStack::from_matrices(&factors)
}

/// Solve every slice of an LL' stack against the shared right-hand side.
///
/// Returns an `n × K` matrix whose column `k` solves slice `k`.
pub fn solve_ll_stack(
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

    let columns = map_slices(factors.num_slices(), config, |k| {
        ll_solve(factors.slice(k), rhs).map(|x| x.as_slice().to_vec())
    })?;

    Ok(DMatrix::from_vec(n, columns.len(), columns.concat()))
}

/// Rebuild `L · L'` from one LL' factor slice.
pub fn reconstruct_ll(l: DMatrixView<'_, f64>) -> DMatrix<f64> {
    let l = l.lower_triangle();
    &l * l.transpose()
}
