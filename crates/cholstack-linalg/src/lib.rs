//! Batched Cholesky factorization and solves for Cholstack.
//!
//! This crate provides:
//! - [`MatrixStack`], a contiguous `[n, n, K]` stack of column-major matrices
//! - Validation of symmetric positive-definite stacks
//! - The square-root-free LDL' factorization, computed in place
//! - The LL' factorization backed by nalgebra
//! - Batched solves of `K` systems sharing one right-hand side
//! - Per-slice parallel execution over rayon
//!
//! ```
//! use cholstack_linalg::{MatrixStack, compute_chol_inplace, solve_ldl_stack, ParallelConfig};
//! use nalgebra::{dmatrix, dvector};
//!
//! let mut stack = MatrixStack::from_matrices(&[dmatrix![2.0, 1.0; 1.0, 2.0]]).unwrap();
//! compute_chol_inplace(&mut stack).unwrap();
//! assert!((stack.get(1, 1, 0) - 1.5).abs() < 1e-14);
//!
//! let x = solve_ldl_stack(&stack, &dvector![1.0, 1.0], &ParallelConfig::default()).unwrap();
//! assert!((x[(0, 0)] - 1.0 / 3.0).abs() < 1e-14);
//! ```

pub mod error;
pub mod ldl;
pub mod parallel;
pub mod reference;
pub mod solve;
pub mod stack;
pub mod validate;

pub use error::{Error, MatrixDefect, Result};
pub use ldl::{
    compute_chol_inplace, compute_chol_inplace_with, ldl_decompose_inplace, ldl_solve_into,
    reconstruct_ldl, solve_ldl_stack,
};
pub use parallel::{ParallelConfig, for_each_slice_mut, map_slices};
pub use reference::{
    cholesky_ll, compute_chol_reference, compute_chol_reference_with, ll_solve, reconstruct_ll,
    solve_ll_stack,
};
pub use solve::{Factorization, decompose, solve};
pub use stack::MatrixStack;
pub use validate::{
    SYMMETRY_TOLERANCE, ValidatedStack, check_structure, symmetrize, validate, validate_and_factor,
};
