//! Parallel SpMV kernels for ELL matrices.
//!
//! Three traversal strategies cover the right-hand-side range:
//! - [`spmv_small_rhs`] processes four consecutive rows per iteration for
//!   1 to 4 right-hand sides,
//! - [`spmv_blocked`] walks one row at a time and blocks the right-hand-side
//!   dimension in groups of four,
//! - [`spmv_blocked_f64`] is the `f64` rendition of the blocked walk with a
//!   four-wide vector inner block.
//!
//! [`spmv`] and [`advanced_spmv`] pick the strategy from the right-hand-side
//! count; a narrow type-gated fast path for `(f64, i32)` single-vector
//! products lives in [`crate::avx512`].
#![allow(
    clippy::many_single_char_names,
    reason = "Math kernels conventionally use i/j/k to denote indices"
)]

use crate::accessor::{DenseView, EllView};
use crate::avx512;
use crate::precision::{Arithmetic, Promote, PromoteFrom, Scalar, Widest};
use rayon::prelude::*;
use std::any::TypeId;
use trellis_core::{Dense, Ell, EllIndex, Executor};
use wide::f64x4;

/// Rows processed together by the small-RHS kernel.
const ROW_BLOCK: usize = 4;

/// Right-hand sides processed together by the blocked kernels.
const RHS_BLOCK: usize = 4;

fn assert_spmv_shapes<MV, IV, OV, IT>(a: &Ell<MV, IT>, b: &Dense<IV>, c: &Dense<OV>) {
    assert_eq!(a.nrows, c.nrows, "a and c must have the same row count");
    assert_eq!(a.ncols, b.nrows, "a column count must equal b row count");
    assert_eq!(b.ncols, c.ncols, "b and c must have the same column count");
}

/// c[r, j] = out(r, j, sum_i a[r, i] * b[col(r, i), j]) for NUM_RHS <= 4.
///
/// Rows are traversed in parallel blocks of four so the slot loads of
/// consecutive rows stay adjacent in the ELL panels; rows past the last full
/// block run through a scalar tail with identical semantics. Padding slots
/// are skipped in both paths.
pub fn spmv_small_rhs<const NUM_RHS: usize, A, MV, IV, OV, IT, F>(
    exec: &Executor,
    a: &Ell<MV, IT>,
    b: &Dense<IV>,
    c: &mut Dense<OV>,
    out: F,
) where
    A: Arithmetic<MV, IV, OV>,
    MV: Scalar,
    IV: Scalar,
    OV: Scalar,
    IT: EllIndex,
    F: Fn(usize, usize, A) -> A + Sync,
{
    assert_eq!(b.ncols, NUM_RHS, "b column count must match NUM_RHS");
    let nrows = a.nrows;
    let max_nnz = a.max_nnz_per_row;
    let stride = a.stride;
    let a_vals: EllView<'_, MV, A> = EllView::new(&a.values);
    let b_vals: DenseView<'_, IV, A> = DenseView::new(&b.values, b.stride);
    let col_idxs = &a.col_idxs;
    let c_stride = c.stride;
    let c_addr = c.values.as_mut_ptr() as usize;

    let full_blocks = nrows / ROW_BLOCK;
    exec.install(|| {
        (0..full_blocks).into_par_iter().for_each(|block| {
            let first_row = block * ROW_BLOCK;
            let c_ptr = c_addr as *mut OV;
            let mut values = [A::zero(); ROW_BLOCK];
            let mut cols = [IT::INVALID; ROW_BLOCK];
            let mut partial_sum = [[A::zero(); NUM_RHS]; ROW_BLOCK];
            for i in 0..max_nnz {
                for next in 0..ROW_BLOCK {
                    let slot = first_row + next + i * stride;
                    values[next] = a_vals.at(slot);
                    cols[next] = col_idxs[slot];
                }
                for next in 0..ROW_BLOCK {
                    if cols[next] != IT::INVALID {
                        let b_row = cols[next].as_usize();
                        for j in 0..NUM_RHS {
                            partial_sum[next][j] += values[next] * b_vals.at(b_row, j);
                        }
                    }
                }
            }
            for next in 0..ROW_BLOCK {
                let row = first_row + next;
                for j in 0..NUM_RHS {
                    let v = out(row, j, partial_sum[next][j]);
                    // SAFETY: each (row, j) cell belongs to exactly one row
                    // block, and this thread owns the block.
                    unsafe {
                        *c_ptr.add(row * c_stride + j) = v.demote();
                    }
                }
            }
        });
    });

    for row in (full_blocks * ROW_BLOCK)..nrows {
        let mut partial_sum = [A::zero(); NUM_RHS];
        for i in 0..max_nnz {
            let slot = row + i * stride;
            let col = col_idxs[slot];
            if col != IT::INVALID {
                let val = a_vals.at(slot);
                let b_row = col.as_usize();
                for j in 0..NUM_RHS {
                    partial_sum[j] += val * b_vals.at(b_row, j);
                }
            }
        }
        for j in 0..NUM_RHS {
            let v = out(row, j, partial_sum[j]);
            *c.at_mut(row, j) = v.demote();
        }
    }
}

/// c[r, j] = out(r, j, sum_i a[r, i] * b[col(r, i), j]) for many right-hand
/// sides.
///
/// Rows are traversed in parallel one at a time; within a row the right-hand
/// sides are blocked in groups of `BLOCK_SIZE` so the accumulator stays in
/// registers, with a final pass reusing the leading accumulator slots for
/// the trailing columns.
pub fn spmv_blocked<const BLOCK_SIZE: usize, A, MV, IV, OV, IT, F>(
    exec: &Executor,
    a: &Ell<MV, IT>,
    b: &Dense<IV>,
    c: &mut Dense<OV>,
    out: F,
) where
    A: Arithmetic<MV, IV, OV>,
    MV: Scalar,
    IV: Scalar,
    OV: Scalar,
    IT: EllIndex,
    F: Fn(usize, usize, A) -> A + Sync,
{
    let num_rhs = b.ncols;
    assert!(
        num_rhs > BLOCK_SIZE,
        "blocked kernel requires more than BLOCK_SIZE right-hand sides"
    );
    let nrows = a.nrows;
    let max_nnz = a.max_nnz_per_row;
    let stride = a.stride;
    let a_vals: EllView<'_, MV, A> = EllView::new(&a.values);
    let b_vals: DenseView<'_, IV, A> = DenseView::new(&b.values, b.stride);
    let col_idxs = &a.col_idxs;
    let c_stride = c.stride;
    let c_addr = c.values.as_mut_ptr() as usize;
    let rounded_rhs = num_rhs / BLOCK_SIZE * BLOCK_SIZE;

    exec.install(|| {
        (0..nrows).into_par_iter().for_each(|row| {
            let c_ptr = c_addr as *mut OV;
            for rhs_base in (0..rounded_rhs).step_by(BLOCK_SIZE) {
                let mut partial_sum = [A::zero(); BLOCK_SIZE];
                for i in 0..max_nnz {
                    let slot = row + i * stride;
                    let col = col_idxs[slot];
                    if col != IT::INVALID {
                        let val = a_vals.at(slot);
                        let b_row = col.as_usize();
                        for (j, acc) in partial_sum.iter_mut().enumerate() {
                            *acc += val * b_vals.at(b_row, rhs_base + j);
                        }
                    }
                }
                for (j, acc) in partial_sum.iter().enumerate() {
                    let rhs = rhs_base + j;
                    let v = out(row, rhs, *acc);
                    // SAFETY: this thread is the only writer of row `row`.
                    unsafe {
                        *c_ptr.add(row * c_stride + rhs) = v.demote();
                    }
                }
            }
            let mut partial_sum = [A::zero(); BLOCK_SIZE];
            for i in 0..max_nnz {
                let slot = row + i * stride;
                let col = col_idxs[slot];
                if col != IT::INVALID {
                    let val = a_vals.at(slot);
                    let b_row = col.as_usize();
                    for rhs in rounded_rhs..num_rhs {
                        partial_sum[rhs - rounded_rhs] += val * b_vals.at(b_row, rhs);
                    }
                }
            }
            for rhs in rounded_rhs..num_rhs {
                let v = out(row, rhs, partial_sum[rhs - rounded_rhs]);
                // SAFETY: this thread is the only writer of row `row`.
                unsafe {
                    *c_ptr.add(row * c_stride + rhs) = v.demote();
                }
            }
        });
    });
}

/// `f64` rendition of [`spmv_blocked`] for the plain product: the inner
/// right-hand-side block becomes one four-wide vector accumulator.
pub fn spmv_blocked_f64<IT: EllIndex>(
    exec: &Executor,
    a: &Ell<f64, IT>,
    b: &Dense<f64>,
    c: &mut Dense<f64>,
) {
    let num_rhs = b.ncols;
    assert!(
        num_rhs > RHS_BLOCK,
        "blocked kernel requires more than RHS_BLOCK right-hand sides"
    );
    let nrows = a.nrows;
    let max_nnz = a.max_nnz_per_row;
    let stride = a.stride;
    let b_stride = b.stride;
    let c_stride = c.stride;
    let c_addr = c.values.as_mut_ptr() as usize;
    let rounded_rhs = num_rhs / RHS_BLOCK * RHS_BLOCK;

    exec.install(|| {
        (0..nrows).into_par_iter().for_each(|row| {
            let c_ptr = c_addr as *mut f64;
            for rhs_base in (0..rounded_rhs).step_by(RHS_BLOCK) {
                let mut acc = f64x4::splat(0.0);
                for i in 0..max_nnz {
                    let slot = row + i * stride;
                    let col = a.col_idxs[slot];
                    if col != IT::INVALID {
                        let av = f64x4::splat(a.values[slot]);
                        let vb = unsafe {
                            let q = b
                                .values
                                .as_ptr()
                                .add(col.as_usize() * b_stride + rhs_base)
                                .cast::<[f64; 4]>();
                            f64x4::new(core::ptr::read_unaligned(q))
                        };
                        acc += vb * av;
                    }
                }
                let lanes = acc.to_array();
                for (j, lane) in lanes.iter().enumerate() {
                    // SAFETY: this thread is the only writer of row `row`.
                    unsafe {
                        *c_ptr.add(row * c_stride + rhs_base + j) = *lane;
                    }
                }
            }
            let mut partial_sum = [0.0f64; RHS_BLOCK];
            for i in 0..max_nnz {
                let slot = row + i * stride;
                let col = a.col_idxs[slot];
                if col != IT::INVALID {
                    let val = a.values[slot];
                    let b_row = col.as_usize();
                    for rhs in rounded_rhs..num_rhs {
                        partial_sum[rhs - rounded_rhs] =
                            val.mul_add(b.values[b_row * b_stride + rhs], partial_sum[rhs - rounded_rhs]);
                    }
                }
            }
            for rhs in rounded_rhs..num_rhs {
                // SAFETY: this thread is the only writer of row `row`.
                unsafe {
                    *c_ptr.add(row * c_stride + rhs) = partial_sum[rhs - rounded_rhs];
                }
            }
        });
    });
}

fn try_spmv_blocked_f64<MV, IV, OV, IT>(
    exec: &Executor,
    a: &Ell<MV, IT>,
    b: &Dense<IV>,
    c: &mut Dense<OV>,
) -> bool
where
    MV: Scalar,
    IV: Scalar,
    OV: Scalar,
    IT: EllIndex,
{
    if TypeId::of::<(MV, IV, OV)>() != TypeId::of::<(f64, f64, f64)>() {
        return false;
    }
    // SAFETY: the TypeId check above proves MV = IV = OV = f64; the casts
    // reinterpret only the value type parameter, which has identical layout.
    let a = unsafe { &*std::ptr::from_ref(a).cast::<Ell<f64, IT>>() };
    let b = unsafe { &*std::ptr::from_ref(b).cast::<Dense<f64>>() };
    let c = unsafe { &mut *std::ptr::from_mut(c).cast::<Dense<f64>>() };
    spmv_blocked_f64(exec, a, b, c);
    true
}

/// c = a * b.
///
/// Dispatches on the right-hand-side count: type-gated vector kernel or
/// [`spmv_small_rhs`] for a single right-hand side, [`spmv_small_rhs`] up to
/// four, and the blocked kernels beyond that. A zero column count returns
/// without touching `c`.
///
/// # Panics
///
/// Panics when the shapes of `a`, `b`, and `c` disagree.
pub fn spmv<MV, IV, OV, IT>(exec: &Executor, a: &Ell<MV, IT>, b: &Dense<IV>, c: &mut Dense<OV>)
where
    MV: Scalar + Promote<IV>,
    IV: Scalar,
    OV: Scalar,
    IT: EllIndex,
    <MV as Promote<IV>>::Widest: Promote<OV>,
    Widest<MV, IV, OV>: Arithmetic<MV, IV, OV>,
{
    assert_spmv_shapes(a, b, c);
    let num_rhs = b.ncols;
    if num_rhs == 0 {
        return;
    }
    let out = |_row: usize, _col: usize, value: Widest<MV, IV, OV>| value;
    match num_rhs {
        1 => {
            if avx512::try_spmv_vect(exec, a, b, c) {
                return;
            }
            spmv_small_rhs::<1, _, _, _, _, _, _>(exec, a, b, c, out);
        }
        2 => spmv_small_rhs::<2, _, _, _, _, _, _>(exec, a, b, c, out),
        3 => spmv_small_rhs::<3, _, _, _, _, _, _>(exec, a, b, c, out),
        4 => spmv_small_rhs::<4, _, _, _, _, _, _>(exec, a, b, c, out),
        _ => {
            if try_spmv_blocked_f64(exec, a, b, c) {
                return;
            }
            spmv_blocked::<RHS_BLOCK, _, _, _, _, _, _>(exec, a, b, c, out);
        }
    }
}

/// c = alpha * a * b + beta * c.
///
/// `alpha` and `beta` are 1x1 matrices; only their (0, 0) cell is read. The
/// prior value of each output cell is read in working precision by the same
/// thread that then overwrites it, so the epilogue folds into the traversal
/// without synchronization.
///
/// # Panics
///
/// Panics when the shapes of `a`, `b`, and `c` disagree or when `alpha` or
/// `beta` is not 1x1.
pub fn advanced_spmv<MV, IV, OV, IT>(
    exec: &Executor,
    alpha: &Dense<MV>,
    a: &Ell<MV, IT>,
    b: &Dense<IV>,
    beta: &Dense<OV>,
    c: &mut Dense<OV>,
) where
    MV: Scalar + Promote<IV>,
    IV: Scalar,
    OV: Scalar,
    IT: EllIndex,
    <MV as Promote<IV>>::Widest: Promote<OV>,
    Widest<MV, IV, OV>: Arithmetic<MV, IV, OV>,
{
    assert_spmv_shapes(a, b, c);
    assert_eq!(alpha.shape(), (1, 1), "alpha must be 1x1");
    assert_eq!(beta.shape(), (1, 1), "beta must be 1x1");
    let num_rhs = b.ncols;
    if num_rhs == 0 {
        return;
    }
    let alpha_val: Widest<MV, IV, OV> = PromoteFrom::promote(alpha.at(0, 0));
    let beta_val: Widest<MV, IV, OV> = PromoteFrom::promote(beta.at(0, 0));
    let c_addr = c.values.as_ptr() as usize;
    let c_stride = c.stride;
    let out = move |row: usize, col: usize, value: Widest<MV, IV, OV>| {
        // SAFETY: each (row, col) cell is read here before its single writer
        // stores to it, always on the same thread.
        let prior = unsafe { *(c_addr as *const OV).add(row * c_stride + col) };
        alpha_val * value + beta_val * Widest::<MV, IV, OV>::promote(prior)
    };
    match num_rhs {
        1 => spmv_small_rhs::<1, _, _, _, _, _, _>(exec, a, b, c, out),
        2 => spmv_small_rhs::<2, _, _, _, _, _, _>(exec, a, b, c, out),
        3 => spmv_small_rhs::<3, _, _, _, _, _, _>(exec, a, b, c, out),
        4 => spmv_small_rhs::<4, _, _, _, _, _, _>(exec, a, b, c, out),
        _ => spmv_blocked::<RHS_BLOCK, _, _, _, _, _, _>(exec, a, b, c, out),
    }
}
