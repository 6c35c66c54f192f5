//! Per-slice parallel execution using rayon.
//!
//! Every slice of a stack is independent, so batch operations fan out one
//! task per slice over rayon's work-stealing pool:
//! 1. Each task only touches its own slice (and shared read-only inputs)
//! 2. Every task runs to completion, failed or not
//! 3. After the join, the error of the lowest failing slice is returned
//!
//! Small batches run sequentially; the results are identical either way.

use rayon::prelude::*;

use crate::error::{Error, Result};

/// Configuration for per-slice parallel execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Minimum slices to use parallel execution (below this, sequential is faster).
    pub min_slices_for_parallel: usize,
    /// Minimum slices handed to one rayon task. None = rayon default.
    pub chunk_size: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_slices_for_parallel: 4,
            chunk_size: None,
        }
    }
}

impl ParallelConfig {
    /// Config that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self {
            min_slices_for_parallel: usize::MAX,
            chunk_size: None,
        }
    }

    /// Create config with explicit chunk size.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size.max(1));
        self
    }

    /// Create config with minimum parallel threshold.
    pub fn with_min_parallel(mut self, min: usize) -> Self {
        self.min_slices_for_parallel = min;
        self
    }

    /// Whether a batch of `slices` should be fanned out.
    pub fn use_parallel(&self, slices: usize) -> bool {
        slices >= self.min_slices_for_parallel && rayon::current_num_threads() > 1
    }
}

/// Run `f` for every slice index and collect the results in slice order.
///
/// All slices are processed even when some fail; the error returned is the
/// one from the lowest failing index, tagged with that index.
pub fn map_slices<T, F>(slices: usize, config: &ParallelConfig, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(usize) -> Result<T> + Sync + Send,
{
    let results: Vec<Result<T>> = if config.use_parallel(slices) {
        log::debug!(
            "Fanning out {} slices over {} threads",
            slices,
            rayon::current_num_threads()
        );
        let iter = (0..slices).into_par_iter();
        match config.chunk_size {
            Some(chunk) => iter.with_min_len(chunk).map(&f).collect(),
            None => iter.map(&f).collect(),
        }
    } else {
        (0..slices).map(&f).collect()
    };

    first_error(results)
}

/// Run `f` on each `chunk_len`-sized chunk of `data` in place.
///
/// Used for in-place factorizations where every chunk is one slice.
/// Every chunk is visited; on failure chunks may be partially written and the
/// lowest failing slice index is reported.
pub fn for_each_slice_mut<F>(
    data: &mut [f64],
    chunk_len: usize,
    config: &ParallelConfig,
    f: F,
) -> Result<()>
where
    F: Fn(usize, &mut [f64]) -> Result<()> + Sync + Send,
{
    if chunk_len == 0 {
        return Ok(());
    }
    let slices = data.len() / chunk_len;

    let results: Vec<Result<()>> = if config.use_parallel(slices) {
        log::debug!(
            "Fanning out {} in-place slices over {} threads",
            slices,
            rayon::current_num_threads()
        );
        let iter = data.par_chunks_exact_mut(chunk_len).enumerate();
        match config.chunk_size {
            Some(chunk) => iter
                .with_min_len(chunk)
                .map(|(k, s)| f(k, s))
                .collect(),
            None => iter.map(|(k, s)| f(k, s)).collect(),
        }
    } else {
        data.chunks_exact_mut(chunk_len)
            .enumerate()
            .map(|(k, s)| f(k, s))
            .collect()
    };

    first_error(results).map(|_| ())
}

/// Unwrap per-slice results, keeping the error of the lowest failing slice.
fn first_error<T>(results: Vec<Result<T>>) -> Result<Vec<T>> {
    let mut values = Vec::with_capacity(results.len());
    let mut failure: Option<Error> = None;
    for (k, result) in results.into_iter().enumerate() {
        match result {
            Ok(v) => values.push(v),
            Err(e) => {
                if failure.is_none() {
                    failure = Some(e.at_slice(k));
                }
            }
        }
    }
    match failure {
        Some(e) => Err(e),
        None => Ok(values),
    }
}
