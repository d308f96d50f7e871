//! Heap region: a single large virtual-address reservation the allocator
//! bumps a frontier through.
//!
//! ## Overview
//!
//! Unlike the teacher allocator this crate grew from (which extends the
//! process data segment one `sbrk` call at a time), the collector needs a
//! large region reserved *once*, up front, so block headers never move and
//! pointers into the heap stay stable across collections. `sbrk` cannot
//! reserve address space without committing it and is not safe to share
//! with the C library's own allocator; `mmap` with `MAP_PRIVATE |
//! MAP_ANONYMOUS` is the standard replacement (the same primitive
//! `jgespiga-memalloc`'s region module and the reference C implementation
//! both use).
//!
//! ```text
//!   ┌──────────────────────────────────────────────────────────────┐
//!   │                     reserved region                          │
//!   │   ┌───────────────────────────┬──────────────────────────┐   │
//!   │   │   issued (alloc + free)   │          unused           │   │
//!   │   └───────────────────────────┴──────────────────────────┘   │
//!   start                        frontier                        end
//!   └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! `start <= frontier <= end` always holds; every byte in `[start,
//! frontier)` has been issued at least once, either as a live block or as a
//! free-list block.

use std::ffi::c_void;
use std::ptr;

use log::debug;

use crate::error::GcError;

/// Default heap reservation size used by the process-wide singleton: 2 GiB,
/// matching the reference implementation's compile-time constant.
pub const DEFAULT_HEAP_SIZE: usize = 2 * 1024 * 1024 * 1024;

/// A single reserved, never-moved virtual address range with a bump
/// frontier.
pub(crate) struct HeapRegion {
  pub start: usize,
  pub end: usize,
  pub frontier: usize,
}

impl HeapRegion {
  /// Reserves `size` bytes via an anonymous private mapping.
  ///
  /// This is the only place the collector talks to the OS for memory;
  /// everything else is bookkeeping over the mapping returned here.
  /// Mapping failure is the one way `ensure_initialized` can fail, and it
  /// is fatal at every call site that doesn't explicitly want a `Result`
  /// (see `Gc::global`).
  pub fn reserve(size: usize) -> Result<Self, GcError> {
    let addr = unsafe {
      libc::mmap(
        ptr::null_mut(),
        size,
        libc::PROT_READ | libc::PROT_WRITE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };

    if addr == libc::MAP_FAILED {
      return Err(GcError::MapFailed { requested: size });
    }

    let start = addr as usize;
    let end = start + size;
    debug!(
      "heap region reserved: start={:#x} end={:#x} size={}",
      start, end, size
    );

    Ok(Self { start, end, frontier: start })
  }

  /// Bytes remaining between the frontier and the end of the region.
  pub fn remaining(&self) -> usize {
    self.end - self.frontier
  }
}

impl Drop for HeapRegion {
  /// Releases the mapping back to the OS.
  ///
  /// The process-wide singleton (`Gc::global`) lives in a `static` and is
  /// never dropped, so this only fires for the heap-sized instances tests
  /// construct directly — without it, a large `cargo test` run would pile
  /// up one mapping per test.
  fn drop(&mut self) {
    unsafe {
      libc::munmap(self.start as *mut c_void, self.end - self.start);
    }
  }
}
