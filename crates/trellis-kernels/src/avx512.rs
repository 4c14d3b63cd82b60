//! AVX-512 fast path for single right-hand-side `(f64, i32)` products.
//!
//! Eight consecutive rows form one 512-bit lane group: the row block's slot
//! values load as one vector, their column indices as a 256-bit integer
//! vector, and a masked 32-bit-indexed gather pulls the matching right-hand
//! side entries. Masking the gather keeps padding slots from issuing loads
//! that could fall outside `b`; masking the FMA keeps their values out of
//! the accumulator whatever they hold.
//!
//! The path needs avx512f (gather, FMA) and avx512vl (256-bit integer
//! compare-to-mask). Detection is cached after the first query; any other
//! type tuple, a strided right-hand side, or a host without the features
//! falls back to the scalar kernel.

use crate::precision::Scalar;
use trellis_core::{Dense, Ell, EllIndex, Executor};

#[cfg(target_arch = "x86_64")]
use rayon::prelude::*;
#[cfg(target_arch = "x86_64")]
use std::sync::OnceLock;

#[cfg(target_arch = "x86_64")]
static AVX512: OnceLock<bool> = OnceLock::new();

/// Returns whether the vector kernel is usable on this host.
#[cfg(target_arch = "x86_64")]
#[must_use]
pub fn avx512_available() -> bool {
    *AVX512.get_or_init(|| {
        is_x86_feature_detected!("avx512f") && is_x86_feature_detected!("avx512vl")
    })
}

/// Returns whether the vector kernel is usable on this host.
#[cfg(not(target_arch = "x86_64"))]
#[must_use]
pub const fn avx512_available() -> bool {
    false
}

/// Routes a single-RHS product to [`spmv_vect_f64_i32`] when the value types
/// are all `f64`, the index type is `i32`, `b` is contiguous, and the host
/// supports the required features. Returns whether it ran.
pub(crate) fn try_spmv_vect<MV, IV, OV, IT>(
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
    #[cfg(target_arch = "x86_64")]
    {
        use std::any::TypeId;

        if TypeId::of::<(MV, IV, OV, IT)>() == TypeId::of::<(f64, f64, f64, i32)>()
            && b.stride == 1
            && avx512_available()
        {
            // SAFETY: the TypeId check proves the concrete types; the casts
            // reinterpret type parameters with identical layout.
            let a = unsafe { &*std::ptr::from_ref(a).cast::<Ell<f64, i32>>() };
            let b = unsafe { &*std::ptr::from_ref(b).cast::<Dense<f64>>() };
            let c = unsafe { &mut *std::ptr::from_mut(c).cast::<Dense<f64>>() };
            spmv_vect_f64_i32(exec, a, b, c);
            return true;
        }
    }
    let _ = (exec, a, b, c);
    false
}

/// c = a * b for a single contiguous right-hand side over `(f64, i32)`
/// storage, eight rows per iteration.
///
/// Rows past the last full block of eight run through a scalar tail with
/// identical semantics, padding slots skipped.
///
/// # Panics
///
/// Panics when `b` has more than one column or a stride above one, or when
/// the host lacks avx512f/avx512vl.
#[cfg(target_arch = "x86_64")]
pub fn spmv_vect_f64_i32(
    exec: &Executor,
    a: &Ell<f64, i32>,
    b: &Dense<f64>,
    c: &mut Dense<f64>,
) {
    const VECT_SIZE: usize = 8;

    assert_eq!(b.ncols, 1, "vector kernel handles a single right-hand side");
    assert_eq!(b.stride, 1, "vector kernel requires a contiguous right-hand side");
    assert!(avx512_available(), "vector kernel requires avx512f and avx512vl");
    let nrows = a.nrows;
    let max_nnz = a.max_nnz_per_row;
    let stride = a.stride;
    let c_stride = c.stride;
    let c_addr = c.values.as_mut_ptr() as usize;

    let full_blocks = nrows / VECT_SIZE;
    exec.install(|| {
        (0..full_blocks).into_par_iter().for_each(|block| {
            let c_ptr = c_addr as *mut f64;
            // SAFETY: feature support was asserted at entry, the block holds
            // eight in-bounds rows, and this thread owns them.
            unsafe { spmv_row_block(a, b, c_ptr, c_stride, block * VECT_SIZE) }
        });
    });

    for row in (full_blocks * VECT_SIZE)..nrows {
        let mut partial_sum = 0.0f64;
        for i in 0..max_nnz {
            let slot = row + i * stride;
            let col = a.col_idxs[slot];
            if col != -1 {
                partial_sum = a.values[slot].mul_add(b.values[col.as_usize()], partial_sum);
            }
        }
        c.values[row * c_stride] = partial_sum;
    }
}

/// Processes the eight rows starting at `first_row`.
///
/// # Safety
///
/// Caller must ensure avx512f and avx512vl are available, that
/// `first_row + 8 <= a.nrows`, and that `c_ptr` addresses a matrix of
/// `a.nrows` rows with stride `c_stride` whose rows in this block no other
/// thread writes.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f,avx512vl")]
unsafe fn spmv_row_block(
    a: &Ell<f64, i32>,
    b: &Dense<f64>,
    c_ptr: *mut f64,
    c_stride: usize,
    first_row: usize,
) {
    use std::arch::x86_64::*;

    let max_nnz = a.max_nnz_per_row;
    let stride = a.stride;
    let a_ptr = a.values.as_ptr();
    let col_ptr = a.col_idxs.as_ptr();
    let b_ptr = b.values.as_ptr();
    let invalid = _mm256_set1_epi32(-1);

    let mut partial_sum = _mm512_setzero_pd();
    for i in 0..max_nnz {
        let a_values = _mm512_loadu_pd(a_ptr.add(first_row + i * stride));
        let cols = _mm256_loadu_si256(col_ptr.add(first_row + i * stride).cast::<__m256i>());
        let mask = _mm256_cmpneq_epi32_mask(cols, invalid);
        let b_values = _mm512_mask_i32gather_pd::<8>(_mm512_setzero_pd(), mask, cols, b_ptr);
        partial_sum = _mm512_mask3_fmadd_pd(a_values, b_values, partial_sum, mask);
    }

    let mut lanes = [0.0f64; 8];
    _mm512_storeu_pd(lanes.as_mut_ptr(), partial_sum);
    for (next, lane) in lanes.iter().enumerate() {
        *c_ptr.add((first_row + next) * c_stride) = *lane;
    }
}
