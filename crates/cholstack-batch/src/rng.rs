//! Counter-based random generation of symmetric positive-definite stacks.
//!
//! Every entry is a pure function of `(seed, slice, entry)` hashed with
//! SplitMix64, so slices can be generated on any thread in any order and the
//! stack comes out bit-identical.
//!
//! Each slice is `A · A' + n · I` for a standard-normal `A`, which is
//! symmetric and strictly positive-definite (its smallest eigenvalue is at
//! least `n`).

use std::f64::consts::PI;

use cholstack_linalg::{MatrixStack, ParallelConfig, Result, map_slices};
use nalgebra::DMatrix;

/// SplitMix64 finalizer.
#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9e3779b97f4a7c15);
    x = (x ^ (x >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94d049bb133111eb);
    x ^ (x >> 31)
}

/// Uniform value in `[0, 1)` for entry `entry` of slice `slice`.
#[inline]
fn unit_interval(seed: u64, slice: u64, entry: u64) -> f64 {
    let key = seed
        ^ slice.wrapping_mul(0x517cc1b727220a95)
        ^ entry.wrapping_mul(0x5851f42d4c957f2d);
    // top 53 bits fill the mantissa
    (splitmix64(key) >> 11) as f64 / (1u64 << 53) as f64
}

/// Standard-normal value for entry `entry` of slice `slice` (Box-Muller).
#[inline]
fn standard_normal(seed: u64, slice: u64, entry: u64) -> f64 {
    let u1 = unit_interval(seed, slice, 2 * entry).max(f64::MIN_POSITIVE);
    let u2 = unit_interval(seed, slice, 2 * entry + 1);
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Derive the seed that follows `seed` in a generation sequence.
#[inline]
pub fn next_seed(seed: u64) -> u64 {
    splitmix64(seed ^ 0xd1b54a32d192ed03)
}

/// Seed taken from the system clock, for callers that do not supply one.
pub fn clock_seed() -> u64 {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    splitmix64(nanos)
}

/// Generate slice `slice_idx` of a random SPD stack: `A · A' + n · I`.
pub fn random_spd_matrix(n: usize, seed: u64, slice_idx: usize) -> DMatrix<f64> {
    let slice = slice_idx as u64;
    let a = DMatrix::from_fn(n, n, |i, j| standard_normal(seed, slice, (j * n + i) as u64));
    let mut m = &a * a.transpose();
    for i in 0..n {
        m[(i, i)] += n as f64;
    }
    // Blocked products need not be bit-symmetric.
    (&m + m.transpose()) * 0.5
}

/// Generate `k` random `n × n` SPD matrices from `seed`.
///
/// Slices are generated in parallel; the output depends only on
/// `(n, k, seed)`.
pub fn generate_spd_stack(
    n: usize,
    k: usize,
    seed: u64,
    config: &ParallelConfig,
) -> Result<MatrixStack> {
    let slices = map_slices(k, config, |idx| Ok(random_spd_matrix(n, seed, idx)))?;
    MatrixStack::from_matrices(&slices)
}
