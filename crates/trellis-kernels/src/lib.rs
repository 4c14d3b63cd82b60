//! Parallel, vectorized SpMV kernels for ELL matrices (pure Rust)
//!
//! The crate computes `c = a * b` and `c = alpha * a * b + beta * c` where
//! `a` is sparse in ELL format and `b`, `c` are dense. Arithmetic runs in
//! the widest precision among the three value types; traversal strategy is
//! picked from the right-hand-side count, with a type-gated AVX-512 fast
//! path for the dominant single-vector `(f64, i32)` case.
#![allow(
    clippy::missing_panics_doc,
    reason = "Kernels assert shape preconditions on invalid input; panic sections are kept to the dispatch entry points"
)]

pub mod accessor;
pub mod avx512;
pub mod precision;
pub mod spmv;

pub use accessor::{DenseView, EllView};
pub use avx512::avx512_available;
#[cfg(target_arch = "x86_64")]
pub use avx512::spmv_vect_f64_i32;
pub use precision::{
    ArithScalar, Arithmetic, DemoteInto, Promote, PromoteFrom, Scalar, Widest,
};
pub use spmv::{advanced_spmv, spmv, spmv_blocked, spmv_blocked_f64, spmv_small_rhs};
