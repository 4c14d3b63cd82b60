//! Definitions and constructors for row-major dense matrices.
//!
//! Element (i, j) of a [`Dense`] lives at `i * stride + j`; the stride may
//! exceed the column count so that sub-views and padded layouts share the
//! same addressing.

/// Row-major dense matrix with an explicit row stride.
///
/// - `values`: element storage, length = `nrows * stride`
/// - `stride`: row stride (>= ncols)
/// - `nrows`: number of rows
/// - `ncols`: number of columns
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Dense<T> {
    pub values: Vec<T>, // Elements, row-major with stride
    pub stride: usize,  // Row stride (>= ncols)
    pub ncols: usize,   // Number of columns
    pub nrows: usize,   // Number of rows
}

impl<T: Copy> Dense<T> {
    /// Constructs a `Dense<T>` from parts.
    ///
    /// # Returns
    /// * `Ok(Dense)` if `stride >= ncols` and `values.len() == nrows * stride`
    /// * `Err(String)` otherwise
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        stride: usize,
        values: Vec<T>,
    ) -> Result<Self, String> {
        if stride < ncols {
            return Err("stride must be at least ncols".into());
        }
        let Some(len) = nrows.checked_mul(stride) else {
            return Err("nrows * stride overflows".into());
        };
        if values.len() != len {
            return Err("values length must be nrows * stride".into());
        }
        Ok(Self {
            values,
            stride,
            ncols,
            nrows,
        })
    }

    /// Constructs a contiguous `Dense<T>` (stride == ncols) from a row-major vector.
    pub fn from_vec(nrows: usize, ncols: usize, values: Vec<T>) -> Result<Self, String> {
        Self::from_parts(nrows, ncols, ncols, values)
    }

    /// Constructs a contiguous `Dense<T>` with every element set to `value`.
    #[must_use]
    pub fn filled(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            values: vec![value; nrows * ncols],
            stride: ncols,
            ncols,
            nrows,
        }
    }

    /// Constructs the 1x1 matrix holding `value`, as used for scaling factors.
    #[must_use]
    pub fn scalar(value: T) -> Self {
        Self {
            values: vec![value],
            stride: 1,
            ncols: 1,
            nrows: 1,
        }
    }

    /// Returns element (row, col).
    #[inline]
    #[must_use]
    pub fn at(&self, row: usize, col: usize) -> T {
        debug_assert!(row < self.nrows);
        debug_assert!(col < self.ncols);
        self.values[row * self.stride + col]
    }

    /// Returns a mutable reference to element (row, col).
    #[inline]
    pub fn at_mut(&mut self, row: usize, col: usize) -> &mut T {
        debug_assert!(row < self.nrows);
        debug_assert!(col < self.ncols);
        &mut self.values[row * self.stride + col]
    }

    /// Returns the shape of the matrix as (nrows, ncols).
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
}
