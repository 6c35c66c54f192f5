//! Batched solves against either Cholesky representation.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use crate::error::Result;
use crate::ldl::{compute_chol_inplace_with, solve_ldl_stack};
use crate::parallel::ParallelConfig;
use crate::reference::{compute_chol_reference_with, solve_ll_stack};
use crate::stack::MatrixStack;

/// Which Cholesky representation a decomposition stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Factorization {
    /// `L · L'` with `L` lower-triangular, computed by nalgebra.
    Ll,
    /// `L · diag(D) · L'` with unit-lower `L` and `D` packed on the diagonal.
    Ldl,
}

impl Factorization {
    pub const ALL: [Factorization; 2] = [Factorization::Ll, Factorization::Ldl];

    /// Short name for display.
    pub fn name(&self) -> &'static str {
        match self {
            Factorization::Ll => "LL'",
            Factorization::Ldl => "LDL'",
        }
    }
}

impl fmt::Display for Factorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Factor every slice of `stack` in the requested representation.
///
/// Returns a new stack; `stack` is left untouched.
pub fn decompose(
    form: Factorization,
    stack: &MatrixStack,
    config: &ParallelConfig,
) -> Result<MatrixStack> {
    match form {
        Factorization::Ll => compute_chol_reference_with(stack, config),
        Factorization::Ldl => {
            let mut factors = stack.clone();
            compute_chol_inplace_with(&mut factors, config)?;
            Ok(factors)
        }
    }
}

/// Solve each slice of `factors` against the shared `rhs`.
///
/// The result is `n × K`; column `k` is the solution for slice `k`.
pub fn solve(
    form: Factorization,
    factors: &MatrixStack,
    rhs: &DVector<f64>,
    config: &ParallelConfig,
) -> Result<DMatrix<f64>> {
    match form {
        Factorization::Ll => solve_ll_stack(factors, rhs, config),
        Factorization::Ldl => solve_ldl_stack(factors, rhs, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use nalgebra::{dmatrix, dvector};

    fn sample_stack() -> MatrixStack {
        MatrixStack::from_matrices(&[
            dmatrix![2.0, 1.0; 1.0, 2.0],
            dmatrix![5.0, 2.0; 2.0, 3.0],
            dmatrix![1.0, 0.0; 0.0, 1.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_both_paths_agree() {
        let stack = sample_stack();
        let config = ParallelConfig::default();
        let rhs = dvector![1.0, -2.0];

        let x_ll = solve(
            Factorization::Ll,
            &decompose(Factorization::Ll, &stack, &config).unwrap(),
            &rhs,
            &config,
        )
        .unwrap();
        let x_ldl = solve(
            Factorization::Ldl,
            &decompose(Factorization::Ldl, &stack, &config).unwrap(),
            &rhs,
            &config,
        )
        .unwrap();

        assert!((&x_ll - &x_ldl).abs().max() < 1e-12);

        for k in 0..stack.num_slices() {
            let residual = stack.slice(k) * x_ll.column(k) - &rhs;
            assert!(residual.amax() < 1e-12, "slice {} residual {}", k, residual.amax());
        }
    }

    #[test]
    fn test_decompose_does_not_touch_input() {
        let stack = sample_stack();
        let before = stack.clone();
        decompose(Factorization::Ldl, &stack, &ParallelConfig::default()).unwrap();
        assert_eq!(stack, before);
    }

    #[test]
    fn test_solve_mismatch_both_forms() {
        let stack = sample_stack();
        let config = ParallelConfig::default();
        for form in Factorization::ALL {
            let factors = decompose(form, &stack, &config).unwrap();
            let result = solve(form, &factors, &dvector![1.0, 2.0, 3.0], &config);
            assert!(matches!(
                result,
                Err(Error::DimensionMismatch {
                    expected: 2,
                    actual: 3
                })
            ));
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Factorization::Ll.to_string(), "LL'");
        assert_eq!(Factorization::Ldl.to_string(), "LDL'");
    }
}
