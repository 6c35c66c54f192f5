//! Batch store for stacks of symmetric positive-definite matrices.
//!
//! [`BatchProblem`] owns `K` SPD matrices of size `N × N`, computes their
//! LL' and LDL' Cholesky factorizations on demand, caches them, and solves
//! all `K` systems against one shared right-hand side. Random problems are
//! generated from a seed with the counter-based RNG in [`rng`], so the same
//! seed always yields the same stack regardless of thread count.
//!
//! # Usage
//!
//! ```
//! use cholstack_batch::BatchProblem;
//! use nalgebra::DVector;
//!
//! let mut problem = BatchProblem::with_seed(8, 4, 42).unwrap();
//! let rhs = DVector::from_element(8, 1.0);
//!
//! let x_ll = problem.solve_ll(&rhs).unwrap();
//! let x_ldl = problem.solve_ldl(&rhs).unwrap();
//!
//! assert_eq!(x_ldl.shape(), (8, 4));
//! assert!((x_ll - x_ldl).abs().max() < 1e-10);
//! ```

mod problem;
pub mod rng;

pub use cholstack_linalg::{Error, Factorization, MatrixStack, ParallelConfig, Result};
pub use problem::{BatchProblem, CacheState};
pub use rng::generate_spd_stack;
