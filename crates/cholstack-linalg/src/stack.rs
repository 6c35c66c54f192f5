//! Stack of dense matrices stored as one contiguous buffer.
//!
//! A [`MatrixStack`] holds `slices` matrices of shape `rows × cols`. Each
//! slice is column-major and slices are laid out back to back, so element
//! `(i, j)` of slice `k` lives at `k * rows * cols + j * rows + i`.

use nalgebra::{DMatrix, DMatrixView, DMatrixViewMut};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct MatrixStack {
    rows: usize,
    cols: usize,
    slices: usize,
    data: Vec<f64>,
}

impl MatrixStack {
    /// Create a zero-filled stack.
    pub fn zeros(rows: usize, cols: usize, slices: usize) -> Self {
        Self {
            rows,
            cols,
            slices,
            data: vec![0.0; rows * cols * slices],
        }
    }

    /// Create a stack of `slices` identity matrices of size `n × n`.
    pub fn identity(n: usize, slices: usize) -> Self {
        let mut stack = Self::zeros(n, n, slices);
        for k in 0..slices {
            stack.slice_mut(k).fill_with_identity();
        }
        stack
    }

    /// Wrap an existing slice-major, column-major buffer.
    pub fn from_column_major(
        rows: usize,
        cols: usize,
        slices: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = rows * cols * slices;
        if data.len() != expected {
            return Err(Error::DimensionMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            rows,
            cols,
            slices,
            data,
        })
    }

    /// Stack a list of equally sized matrices.
    pub fn from_matrices(matrices: &[DMatrix<f64>]) -> Result<Self> {
        let Some(first) = matrices.first() else {
            return Err(Error::InvalidDimension {
                rows: 0,
                cols: 0,
                slices: 0,
            });
        };
        let (rows, cols) = first.shape();
        let mut data = Vec::with_capacity(rows * cols * matrices.len());
        for m in matrices {
            if m.shape() != (rows, cols) {
                return Err(Error::DimensionMismatch {
                    expected: rows * cols,
                    actual: m.len(),
                });
            }
            data.extend_from_slice(m.as_slice());
        }
        Ok(Self {
            rows,
            cols,
            slices: matrices.len(),
            data,
        })
    }

    /// Build an `n × n × slices` stack from a per-slice generator.
    ///
    /// Fails with [`Error::DimensionMismatch`] if a generated slice is not
    /// `n × n`.
    pub fn from_fn<F>(n: usize, slices: usize, mut f: F) -> Result<Self>
    where
        F: FnMut(usize) -> DMatrix<f64>,
    {
        let mut data = Vec::with_capacity(n * n * slices);
        for k in 0..slices {
            let m = f(k);
            if m.shape() != (n, n) {
                return Err(Error::DimensionMismatch {
                    expected: n * n,
                    actual: m.len(),
                });
            }
            data.extend_from_slice(m.as_slice());
        }
        Ok(Self {
            rows: n,
            cols: n,
            slices,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn num_slices(&self) -> usize {
        self.slices
    }

    /// Shape as `[rows, cols, slices]`.
    pub fn shape(&self) -> [usize; 3] {
        [self.rows, self.cols, self.slices]
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of elements in one slice.
    #[inline]
    pub fn slice_len(&self) -> usize {
        self.rows * self.cols
    }

    /// Element `(row, col)` of slice `k`.
    #[inline]
    pub fn get(&self, row: usize, col: usize, k: usize) -> f64 {
        self.data[k * self.slice_len() + col * self.rows + row]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, k: usize, value: f64) {
        let idx = k * self.slice_len() + col * self.rows + row;
        self.data[idx] = value;
    }

    /// Raw column-major data of slice `k`.
    pub fn slice_data(&self, k: usize) -> &[f64] {
        let len = self.slice_len();
        &self.data[k * len..(k + 1) * len]
    }

    pub fn slice_data_mut(&mut self, k: usize) -> &mut [f64] {
        let len = self.slice_len();
        &mut self.data[k * len..(k + 1) * len]
    }

    /// Borrow slice `k` as an nalgebra matrix view.
    pub fn slice(&self, k: usize) -> DMatrixView<'_, f64> {
        DMatrixView::from_slice(self.slice_data(k), self.rows, self.cols)
    }

    pub fn slice_mut(&mut self, k: usize) -> DMatrixViewMut<'_, f64> {
        let (rows, cols) = (self.rows, self.cols);
        DMatrixViewMut::from_slice(self.slice_data_mut(k), rows, cols)
    }

    /// Copy slice `k` into an owned matrix.
    pub fn to_matrix(&self, k: usize) -> DMatrix<f64> {
        self.slice(k).into_owned()
    }

    /// Copy every slice into owned matrices.
    pub fn to_matrices(&self) -> Vec<DMatrix<f64>> {
        (0..self.slices).map(|k| self.to_matrix(k)).collect()
    }

    /// Iterate over the raw column-major data of each slice.
    pub fn slices_data(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, and a zero-sized slice has nothing to yield
        let len = self.slice_len().max(1);
        self.data.chunks_exact(len).take(self.slices)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }
}
