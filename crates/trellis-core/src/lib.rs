//! Core data structures for trellis (pure Rust)
//!
//! This crate owns the storage containers the kernels operate on:
//! - [`Ell`], the ELLPACK sparse matrix format,
//! - [`Dense`], a row-major dense matrix with an explicit row stride,
//! - [`Executor`], the handle selecting where kernels run their parallel loops.

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod dense;
pub mod ell;
pub mod executor;

pub use dense::Dense;
pub use ell::{Ell, EllIndex};
pub use executor::Executor;
