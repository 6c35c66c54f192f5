//! # Cholstack
//!
//! Batched Cholesky factorization and solves for stacks of symmetric
//! positive-definite matrices, written in Rust.
//!
//! Cholstack provides:
//! - A contiguous `[N, N, K]` matrix stack
//! - Validation of symmetric positive-definite input
//! - The square-root-free LDL' factorization, computed in place
//! - The LL' factorization backed by nalgebra
//! - A batch store that caches both factorizations and solves `K` systems
//!   sharing one right-hand side, in parallel
//!
//! ## Quick Start
//!
//! ```rust
//! use cholstack::prelude::*;
//!
//! let mut problem = BatchProblem::with_seed(4, 3, 7).unwrap();
//! let rhs = DVector::from_element(4, 1.0);
//!
//! let x = problem.solve_ldl(&rhs).unwrap();
//! assert_eq!(x.shape(), (4, 3));
//! ```
//!
//! ## Supplying Matrices
//!
//! ```rust
//! use cholstack::prelude::*;
//! use nalgebra::dmatrix;
//!
//! let stack = MatrixStack::from_matrices(&[dmatrix![2.0, 1.0; 1.0, 2.0]]).unwrap();
//! let mut problem = BatchProblem::from_matrices(stack).unwrap();
//!
//! let ldl = problem.decomposition_ldl().unwrap();
//! assert!((ldl.get(1, 1, 0) - 1.5).abs() < 1e-14);
//!
//! let x = problem.solve_ll(&DVector::from_element(2, 1.0)).unwrap();
//! assert!((x[(0, 0)] - 1.0 / 3.0).abs() < 1e-14);
//! ```

// Re-export member crates
pub use cholstack_batch as batch;
pub use cholstack_linalg as linalg;

// ============================================================================
// Convenient re-exports from cholstack_linalg
// ============================================================================

pub use cholstack_linalg::{
    // Errors
    Error,
    // Representations
    Factorization,
    MatrixDefect,
    // Storage
    MatrixStack,
    // Parallel execution
    ParallelConfig,
    Result,
    SYMMETRY_TOLERANCE,
    ValidatedStack,
    // LL' (nalgebra) engine
    compute_chol_reference,
    // LDL' engine
    compute_chol_inplace,
    decompose,
    ldl_decompose_inplace,
    ldl_solve_into,
    reconstruct_ldl,
    reconstruct_ll,
    solve,
    // Validation
    symmetrize,
    validate,
};

// ============================================================================
// Convenient re-exports from cholstack_batch
// ============================================================================

pub use cholstack_batch::{BatchProblem, CacheState, generate_spd_stack};

// ============================================================================
// Re-export commonly used external types
// ============================================================================

/// Re-export of nalgebra's dynamic vector type.
pub use nalgebra::DVector;

/// Re-export of nalgebra's dynamic matrix type.
pub use nalgebra::DMatrix;

// ============================================================================
// Prelude module for convenient imports
// ============================================================================

/// Prelude module containing commonly used types.
///
/// ```rust
/// use cholstack::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{BatchProblem, Error, Factorization, MatrixStack, ParallelConfig, Result};

    pub use crate::{compute_chol_inplace, compute_chol_reference, validate};

    // Common external types
    pub use crate::{DMatrix, DVector};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let problem = BatchProblem::with_seed(2, 2, 0).unwrap();
        let stack: &MatrixStack = problem.matrices();
        assert_eq!(stack.shape(), [2, 2, 2]);
        assert!(validate(stack).is_ok());
    }

    #[test]
    fn test_static_entry_points_agree() {
        let problem = BatchProblem::with_seed(5, 3, 12).unwrap();
        let ll = compute_chol_reference(problem.matrices()).unwrap();
        let mut ldl = problem.matrices().clone();
        compute_chol_inplace(&mut ldl).unwrap();

        for k in 0..3 {
            let l_ii = ll.get(2, 2, k);
            assert!((l_ii * l_ii - ldl.get(2, 2, k)).abs() < 1e-10);
        }
    }

    #[test]
    fn test_error_reexport() {
        let err = BatchProblem::new(0, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidDimension { .. }));
    }
}
