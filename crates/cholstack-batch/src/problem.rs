//! Batch store: a stack of SPD matrices with cached factorizations.
//!
//! A [`BatchProblem`] owns `K` symmetric positive-definite `N × N` matrices
//! and computes each Cholesky representation on first use. Both caches are
//! dropped whenever the matrices are replaced.
//!
//! Methods that may fill a cache take `&mut self`. Once filled, a cache can
//! be read through a shared reference with [`BatchProblem::cached`].

use cholstack_linalg::{
    Error, Factorization, MatrixStack, ParallelConfig, Result, decompose, solve,
    validate_and_factor,
};
use nalgebra::{DMatrix, DVector};

use crate::rng::{clock_seed, generate_spd_stack, next_seed};

/// Cache state for one factorization.
#[derive(Debug, Clone, Default)]
pub enum CacheState {
    #[default]
    Absent,
    Cached(MatrixStack),
}

impl CacheState {
    pub fn get(&self) -> Option<&MatrixStack> {
        match self {
            CacheState::Absent => None,
            CacheState::Cached(stack) => Some(stack),
        }
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CacheState::Cached(_))
    }
}

/// `K` SPD matrices of size `N × N` plus their cached factorizations.
#[derive(Debug, Clone)]
pub struct BatchProblem {
    n: usize,
    k: usize,
    matrices: MatrixStack,
    ll: CacheState,
    ldl: CacheState,
    seed: u64,
    config: ParallelConfig,
}

impl BatchProblem {
    /// Generate `k` random SPD matrices of size `n × n`, seeded from the clock.
    pub fn new(n: usize, k: usize) -> Result<Self> {
        Self::with_seed(n, k, clock_seed())
    }

    /// Generate `k` random SPD matrices of size `n × n` from `seed`.
    pub fn with_seed(n: usize, k: usize, seed: u64) -> Result<Self> {
        Self::with_seed_and_config(n, k, seed, ParallelConfig::default())
    }

    /// Generate from `seed`, running slice work under `config`.
    pub fn with_seed_and_config(
        n: usize,
        k: usize,
        seed: u64,
        config: ParallelConfig,
    ) -> Result<Self> {
        check_dims(n, k)?;
        let matrices = generate_spd_stack(n, k, seed, &config)?;
        log::info!("Generated {} SPD matrices of size {}x{} (seed {:#x})", k, n, n, seed);
        Ok(Self {
            n,
            k,
            matrices,
            ll: CacheState::Absent,
            ldl: CacheState::Absent,
            seed,
            config,
        })
    }

    /// Build from caller-supplied matrices, validated as in [`Self::set_matrices`].
    pub fn from_matrices(matrices: MatrixStack) -> Result<Self> {
        let config = ParallelConfig::default();
        let validated = validate_and_factor(&matrices, &config)?;
        let [n, _, k] = validated.matrices.shape();
        Ok(Self {
            n,
            k,
            matrices: validated.matrices,
            ll: CacheState::Absent,
            ldl: CacheState::Absent,
            seed: clock_seed(),
            config,
        })
    }

    /// Replace the parallel execution settings.
    pub fn with_config(mut self, config: ParallelConfig) -> Self {
        self.config = config;
        self
    }

    /// Square matrix size.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Number of matrices.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Seed of the most recent generation.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn config(&self) -> &ParallelConfig {
        &self.config
    }

    /// Replace everything with `k` new random `n × n` SPD matrices.
    ///
    /// The seed advances deterministically from the previous one. On error
    /// the problem is unchanged.
    pub fn generate(&mut self, n: usize, k: usize) -> Result<()> {
        check_dims(n, k)?;
        let seed = next_seed(self.seed);
        let matrices = generate_spd_stack(n, k, seed, &self.config)?;
        log::info!("Generated {} SPD matrices of size {}x{} (seed {:#x})", k, n, n, seed);

        self.n = n;
        self.k = k;
        self.matrices = matrices;
        self.seed = seed;
        self.invalidate();
        Ok(())
    }

    /// Validate and replace the matrices.
    ///
    /// Slices must be square, symmetric (within
    /// [`SYMMETRY_TOLERANCE`](cholstack_linalg::SYMMETRY_TOLERANCE)) and
    /// positive-definite. The stored copy is symmetrized and both caches
    /// return to [`CacheState::Absent`]. On error the problem is unchanged.
    pub fn set_matrices(&mut self, matrices: MatrixStack) -> Result<()> {
        let validated = validate_and_factor(&matrices, &self.config).inspect_err(|e| {
            log::warn!("Rejected matrix stack {:?}: {}", matrices.shape(), e);
        })?;

        let [n, _, k] = validated.matrices.shape();
        self.n = n;
        self.k = k;
        self.matrices = validated.matrices;
        self.invalidate();
        Ok(())
    }

    /// The stored matrices, shape `[n, n, k]`.
    pub fn matrices(&self) -> &MatrixStack {
        &self.matrices
    }

    /// LL' factors, lower-triangular per slice. Computed on first use.
    pub fn decomposition_ll(&mut self) -> Result<&MatrixStack> {
        self.decomposition(Factorization::Ll)
    }

    /// LDL' factors: L below the diagonal, D on it. Computed on first use.
    pub fn decomposition_ldl(&mut self) -> Result<&MatrixStack> {
        self.decomposition(Factorization::Ldl)
    }

    /// Factors in the requested form, computing and caching them on a miss.
    ///
    /// If any slice fails, nothing is cached and the error names the lowest
    /// failing slice.
    pub fn decomposition(&mut self, form: Factorization) -> Result<&MatrixStack> {
        let cache = match form {
            Factorization::Ll => &mut self.ll,
            Factorization::Ldl => &mut self.ldl,
        };
        loop {
            match cache {
                CacheState::Cached(factors) => return Ok(factors),
                CacheState::Absent => {
                    log::debug!(
                        "Computing {} factorization of {} matrices ({}x{})",
                        form,
                        self.k,
                        self.n,
                        self.n
                    );
                    *cache = CacheState::Cached(decompose(form, &self.matrices, &self.config)?);
                }
            }
        }
    }

    /// Factors in the requested form if already computed.
    pub fn cached(&self, form: Factorization) -> Option<&MatrixStack> {
        self.cache(form).get()
    }

    pub fn is_cached(&self, form: Factorization) -> bool {
        self.cache(form).is_cached()
    }

    /// Solve every system with the LL' factors. Result is `n × k`.
    pub fn solve_ll(&mut self, rhs: &DVector<f64>) -> Result<DMatrix<f64>> {
        self.solve(Factorization::Ll, rhs)
    }

    /// Solve every system with the LDL' factors. Result is `n × k`.
    pub fn solve_ldl(&mut self, rhs: &DVector<f64>) -> Result<DMatrix<f64>> {
        self.solve(Factorization::Ldl, rhs)
    }

    /// Solve `M_k x_k = rhs` for every slice `k` using the requested factors.
    pub fn solve(&mut self, form: Factorization, rhs: &DVector<f64>) -> Result<DMatrix<f64>> {
        if rhs.len() != self.n {
            return Err(Error::DimensionMismatch {
                expected: self.n,
                actual: rhs.len(),
            });
        }
        let config = self.config.clone();
        let factors = self.decomposition(form)?;
        solve(form, factors, rhs, &config)
    }

    fn invalidate(&mut self) {
        self.ll = CacheState::Absent;
        self.ldl = CacheState::Absent;
    }

    fn cache(&self, form: Factorization) -> &CacheState {
        match form {
            Factorization::Ll => &self.ll,
            Factorization::Ldl => &self.ldl,
        }
    }

}

fn check_dims(n: usize, k: usize) -> Result<()> {
    if n == 0 || k == 0 {
        return Err(Error::InvalidDimension {
            rows: n,
            cols: n,
            slices: k,
        });
    }
    Ok(())
}
