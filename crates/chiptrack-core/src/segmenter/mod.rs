//! Chunk planning for ranged downloads.
//!
//! Splits `[0, total_len)` into one contiguous chunk per worker and computes
//! the inclusive byte range each worker requests.

mod range;

pub use range::{nominal_chunk_size, plan_chunks, Chunk};
