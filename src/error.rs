//! Error types for the fatal and transient failure modes described by the
//! allocator/collector contract.
//!
//! Most of the public surface (`new`, `root_insert`, `collect`) never
//! returns a `Result` at all — a null pointer *is* the transient-failure
//! signal, and structural corruption is fatal by contract (see the crate
//! root docs). `GcError` exists for the handful of internal call sites that
//! can reasonably hand the caller something to log or assert on before the
//! process gives up: heap-region reservation, and the `pub(crate)`
//! allocator primitives exercised directly by tests.

use thiserror::Error;

/// Failure modes the collector can observe.
///
/// `MapFailed` and `HeapExhausted` are non-fatal in the sense that a caller
/// holding a `Result` can recover; `DoubleFree` and `FreeListCorruption`
/// indicate the allocator's own invariants have already been violated and
/// are always treated as fatal once they reach the public API.
#[derive(Debug, Error)]
pub enum GcError {
  /// The initial anonymous mapping for the heap region could not be
  /// established.
  #[error("failed to reserve {requested} bytes of heap via mmap")]
  MapFailed {
    /// Size of the mapping that was requested.
    requested: usize,
  },

  /// `allocate` had neither a free-list fit nor remaining bump space.
  #[error("heap exhausted: requested {requested} bytes, {remaining} remain")]
  HeapExhausted {
    /// Size of the failed request.
    requested: usize,
    /// Bytes left between the frontier and the end of the region.
    remaining: usize,
  },

  /// `deallocate` was called on a block whose header is already marked
  /// free.
  #[error("double free at block {block:#x}")]
  DoubleFree {
    /// Address of the block header involved.
    block: usize,
  },

  /// The free list contains a block whose header claims `allocated =
  /// true`; the allocator's own bookkeeping has been corrupted.
  #[error("free list corruption: block {block:#x} is marked allocated")]
  FreeListCorruption {
    /// Address of the offending block header.
    block: usize,
  },
}
