//! Best-fit free-list allocator with bump fallback.
//!
//! `allocate` first searches the free list for the smallest block that
//! still fits the request; only when no free block fits does it fall back
//! to placing a fresh header at the bump frontier. Blocks are never split
//! or coalesced — this keeps headers simple and pointers stable (the
//! collector is non-moving), at the cost of some internal fragmentation
//! that the best-fit search is there to mitigate.
//!
//! ```text
//!   allocate(n)
//!     │
//!     ▼
//!   pad frontier to PAYLOAD_ALIGN (always, win or lose)
//!     │
//!     ▼
//!   best-fit search over free list ──── hit ───▶ detach, mark allocated
//!     │ miss
//!     ▼
//!   bump: header at frontier, frontier += header + n
//!     │
//!     ▼
//!   prepend to allocated list, return payload pointer
//! ```

use log::{error, trace};

use crate::align::PAYLOAD_ALIGN;
use crate::block::{BlockHeader, BlockList, PayloadKind};
use crate::error::GcError;
use crate::region::HeapRegion;

/// Searches `free` for the best (smallest sufficient) fit for `size`.
///
/// Ties are broken by encounter order (the list is walked head-first, so
/// the most recently freed block of a given size wins); the search exits
/// early on an exact match. A block found with `allocated == true` is free
/// list corruption and is fatal.
///
/// # Safety
/// Every block reachable from `free.iter()` must be a valid `BlockHeader`.
unsafe fn find_best_fit(
  free: &BlockList,
  size: usize,
) -> Result<Option<*mut BlockHeader>, GcError> {
  let mut best: Option<*mut BlockHeader> = None;

  for block in free.iter() {
    let header = unsafe { &*block };
    if header.allocated {
      return Err(GcError::FreeListCorruption { block: block as usize });
    }
    if header.size < size {
      continue;
    }
    if header.size == size {
      return Ok(Some(block));
    }
    let replace = match best {
      None => true,
      Some(current) => header.size < unsafe { (*current).size },
    };
    if replace {
      best = Some(block);
    }
  }

  Ok(best)
}

/// Allocates `size` bytes, returning a 16-byte-aligned payload pointer, or
/// null if `size` is zero or the heap has no room.
///
/// The frontier is padded for alignment *before* the free-list search and
/// that padding is never undone, even when the request is ultimately
/// satisfied from the free list — this mirrors the reference allocator's
/// single code path and is an intentionally observable quirk rather than a
/// bug (see the design notes' Open Question resolution).
///
/// # Safety
/// `region`, `free`, and `allocated` must describe a single consistent
/// allocator instance; no other call may be touching them concurrently.
pub(crate) unsafe fn allocate(
  region: &mut HeapRegion,
  free: &mut BlockList,
  allocated: &mut BlockList,
  size: usize,
) -> Result<*mut u8, GcError> {
  if size == 0 {
    return Ok(std::ptr::null_mut());
  }

  let header_size = BlockHeader::SIZE;
  let padding =
    (header_size + PAYLOAD_ALIGN - (region.frontier % PAYLOAD_ALIGN)) % PAYLOAD_ALIGN;
  region.frontier += padding;

  if let Some(block) = unsafe { find_best_fit(free, size)? } {
    unsafe {
      free.remove(block);
      (*block).allocated = true;
      // A block reused from the free list may still carry the
      // `PayloadKind::Structured` tag (and dangling `*const Layout`) from
      // whatever typed allocation last occupied it; reset to `Atomic` so
      // only `Gc::new` re-establishes a layout, matching the fresh-header
      // branch below.
      (*block).payload_kind = PayloadKind::Atomic;
      allocated.push_front(block);
    }
    trace!("allocate: best-fit hit, size={} block={:#x}", size, block as usize);
    return Ok(unsafe { BlockHeader::payload_ptr(block) });
  }

  let block_addr = region.frontier;
  let payload_addr = block_addr + header_size;
  debug_assert_eq!(payload_addr % PAYLOAD_ALIGN, 0, "padding failed to align payload");

  let new_frontier = payload_addr + size;
  if new_frontier > region.end {
    error!(
      "allocate: heap exhausted, requested={} remaining={}",
      size,
      region.remaining()
    );
    return Err(GcError::HeapExhausted { requested: size, remaining: region.remaining() });
  }

  region.frontier = new_frontier;

  let block = block_addr as *mut BlockHeader;
  unsafe {
    std::ptr::write(
      block,
      BlockHeader {
        size,
        allocated: true,
        marked: false,
        payload_kind: PayloadKind::Atomic,
        prev: std::ptr::null_mut(),
        next: std::ptr::null_mut(),
      },
    );
    allocated.push_front(block);
  }

  trace!("allocate: bump, size={} block={:#x}", size, block_addr);
  Ok(payload_addr as *mut u8)
}

/// Moves the block backing `payload` from the allocated list to the free
/// list.
///
/// A null pointer is a no-op (matches C `free`). Deallocating a block that
/// is already free is double-free and is reported as an error rather than
/// silently accepted; the public API turns this into a fatal abort, but
/// tests can observe the `Result` directly.
///
/// # Safety
/// If non-null, `payload` must have been returned by a prior `allocate` (or
/// `new`) on this same `region`/`free`/`allocated` triple, and must not
/// already have been deallocated.
pub(crate) unsafe fn deallocate(
  free: &mut BlockList,
  allocated: &mut BlockList,
  payload: *mut u8,
) -> Result<(), GcError> {
  if payload.is_null() {
    return Ok(());
  }

  let block = unsafe { BlockHeader::from_payload(payload) };

  if !unsafe { (*block).allocated } {
    error!("deallocate: double free at {:#x}", block as usize);
    return Err(GcError::DoubleFree { block: block as usize });
  }

  unsafe {
    allocated.remove(block);
    (*block).allocated = false;
    free.push_front(block);
  }

  trace!("deallocate: block={:#x}", block as usize);
  Ok(())
}
