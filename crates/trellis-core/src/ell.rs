//! Definitions and constructors for ELL (ELLPACK) format matrices.
//!
//! This file provides:
//! - The Ell struct for 2D sparse matrices in ELL format.
//! - The EllIndex trait for the signed column-index types.
//! - Constructors, validation, and slot accessors.
//!
//! ELL format pads every row to a fixed width: each row stores exactly
//! `max_nnz_per_row` slots, and the i-th slot of row r lives at offset
//! `r + i * stride` in both the value and column-index arrays. Padding
//! slots carry the sentinel column index and contribute nothing.

use std::fmt::Debug;

/// Signed column-index type usable in [`Ell`] storage.
///
/// The sentinel [`EllIndex::INVALID`] (-1) marks a padding slot; the value
/// paired with it is unused.
pub trait EllIndex: Copy + Send + Sync + Eq + Debug + 'static {
    /// Sentinel marking a padding slot.
    const INVALID: Self;

    /// Converts a valid (non-sentinel) index into a usize offset.
    fn as_usize(self) -> usize;

    /// Widens the index for range checks, preserving sign.
    fn as_i64(self) -> i64;
}

impl EllIndex for i32 {
    const INVALID: Self = -1;

    #[inline]
    fn as_usize(self) -> usize {
        debug_assert!(self >= 0);
        #[allow(clippy::cast_sign_loss)]
        {
            self as usize
        }
    }

    #[inline]
    fn as_i64(self) -> i64 {
        i64::from(self)
    }
}

impl EllIndex for i64 {
    const INVALID: Self = -1;

    #[inline]
    fn as_usize(self) -> usize {
        debug_assert!(self >= 0);
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        {
            self as usize
        }
    }

    #[inline]
    fn as_i64(self) -> i64 {
        self
    }
}

/// ELL (ELLPACK) format for 2D sparse matrices.
///
/// Stores a fixed number of slots per row in two column-major panels so that
/// consecutive rows of the same slot index are adjacent in memory.
///
/// - `values`: slot values, length = `stride * max_nnz_per_row`
/// - `col_idxs`: slot column indices, same length; `INVALID` marks padding
/// - `max_nnz_per_row`: number of stored slots per row
/// - `stride`: row-panel stride (>= nrows)
/// - `nrows`: number of rows in the matrix
/// - `ncols`: number of columns in the matrix
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Ell<T, I> {
    pub values: Vec<T>,          // Slot values (length = stride * max_nnz_per_row)
    pub col_idxs: Vec<I>,        // Slot column indices (same length)
    pub max_nnz_per_row: usize,  // Stored slots per row
    pub stride: usize,           // Row-panel stride (>= nrows)
    pub ncols: usize,            // Number of columns
    pub nrows: usize,            // Number of rows
}

impl<T, I> Ell<T, I> {
    /// Returns the number of stored slots, padding included.
    #[inline]
    #[must_use]
    pub fn nnz_stored(&self) -> usize {
        self.values.len()
    }

    /// Returns the shape of the matrix as (nrows, ncols).
    #[inline]
    #[must_use]
    pub const fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
}

impl<T: Copy, I: EllIndex> Ell<T, I> {
    /// Constructs an `Ell<T, I>` from parts, with optional index checking.
    ///
    /// # Arguments
    /// * `nrows` - Number of rows in the matrix
    /// * `ncols` - Number of columns in the matrix
    /// * `max_nnz_per_row` - Stored slots per row
    /// * `stride` - Row-panel stride, must be >= nrows
    /// * `col_idxs` - Slot column indices (length = stride * max_nnz_per_row)
    /// * `values` - Slot values (same length)
    /// * `check` - If true, validate every slot's column index
    ///
    /// # Returns
    /// * `Ok(Ell)` if inputs are valid
    /// * `Err(String)` if validation fails
    pub fn from_parts(
        nrows: usize,
        ncols: usize,
        max_nnz_per_row: usize,
        stride: usize,
        col_idxs: Vec<I>,
        values: Vec<T>,
        check: bool,
    ) -> Result<Self, String> {
        if stride < nrows {
            return Err("stride must be at least nrows".into());
        }
        let Some(slots) = stride.checked_mul(max_nnz_per_row) else {
            return Err("stride * max_nnz_per_row overflows".into());
        };
        if values.len() != slots {
            return Err("values length must be stride * max_nnz_per_row".into());
        }
        if col_idxs.len() != slots {
            return Err("col_idxs length must be stride * max_nnz_per_row".into());
        }
        if check {
            // Only the slots of real rows matter; rows in [nrows, stride) are
            // panel padding and may hold anything.
            let Ok(ncols_i) = i64::try_from(ncols) else {
                return Err("ncols exceeds the index range".into());
            };
            for i in 0..max_nnz_per_row {
                for r in 0..nrows {
                    let c = col_idxs[r + i * stride].as_i64();
                    if c != -1 && !(0..ncols_i).contains(&c) {
                        return Err("column index out of bounds".into());
                    }
                }
            }
        }
        Ok(Self {
            values,
            col_idxs,
            max_nnz_per_row,
            stride,
            ncols,
            nrows,
        })
    }

    /// Constructs an `Ell<T, I>` from parts without any checks.
    ///
    /// # Safety contract (not enforced)
    /// Caller must ensure:
    /// - values.len() == col_idxs.len() == stride * max_nnz_per_row
    /// - stride >= nrows
    /// - every slot of a row below nrows holds `INVALID` or an index in [0, ncols)
    #[inline]
    #[must_use]
    pub fn from_parts_unchecked(
        nrows: usize,
        ncols: usize,
        max_nnz_per_row: usize,
        stride: usize,
        col_idxs: Vec<I>,
        values: Vec<T>,
    ) -> Self {
        Self {
            values,
            col_idxs,
            max_nnz_per_row,
            stride,
            ncols,
            nrows,
        }
    }

    /// Returns the column index of slot `i` of row `row`.
    #[inline]
    #[must_use]
    pub fn col_at(&self, row: usize, i: usize) -> I {
        debug_assert!(row < self.nrows);
        debug_assert!(i < self.max_nnz_per_row);
        self.col_idxs[row + i * self.stride]
    }

    /// Returns the value of slot `i` of row `row`.
    #[inline]
    #[must_use]
    pub fn val_at(&self, row: usize, i: usize) -> T {
        debug_assert!(row < self.nrows);
        debug_assert!(i < self.max_nnz_per_row);
        self.values[row + i * self.stride]
    }
}
