//! The collector: ties the heap region, the free/allocated lists, and the
//! root-set stack together behind one owned manager value, and implements
//! mark-and-sweep over them.
//!
//! ```text
//!            roots (and worklist)
//!                  │
//!                  ▼
//!   ┌─────────────────────────────┐      mark       ┌────────────────┐
//!   │         Gc::collect          │ ───────────────▶ │ allocated list │
//!   │  drains roots, visits edges  │                  │ (marked bits)  │
//!   └─────────────────────────────┘                  └────────┬───────┘
//!                                                              │ sweep
//!                                                              ▼
//!                                                     ┌────────────────┐
//!                                                     │   free list     │
//!                                                     └────────────────┘
//! ```
//!
//! The design notes call for exactly one owned manager value instead of
//! loose global statics; `Gc` is that value. Production code reaches it
//! through [`Gc::global`], a lazily initialized process-wide singleton —
//! the spec is explicitly single-threaded, so this is a plain `static` with
//! no locking, documented as such rather than dressed up with a `Mutex`
//! that would imply a safety guarantee this collector doesn't provide.

use log::{debug, error, warn};

use crate::allocator::{allocate, deallocate};
use crate::block::{BlockHeader, BlockList, PayloadKind};
use crate::error::GcError;
use crate::layout::Layout;
use crate::region::{HeapRegion, DEFAULT_HEAP_SIZE};
use crate::roots::RootStack;

/// The process-wide collector state: one heap region, two intrusive lists,
/// and the root-set/worklist stack.
pub struct Gc {
  region: HeapRegion,
  free: BlockList,
  allocated: BlockList,
  roots: RootStack,
}

impl Gc {
  /// Builds a collector over a freshly reserved heap of `size` bytes.
  ///
  /// Production code should go through [`Gc::global`] instead; this
  /// constructor exists so tests can work with a heap far smaller than
  /// [`DEFAULT_HEAP_SIZE`].
  pub fn with_capacity(size: usize) -> Result<Self, GcError> {
    Ok(Self {
      region: HeapRegion::reserve(size)?,
      free: BlockList::new(),
      allocated: BlockList::new(),
      roots: RootStack::new(),
    })
  }

  /// The process-wide singleton, lazily reserving [`DEFAULT_HEAP_SIZE`]
  /// bytes on first use.
  ///
  /// # Safety contract
  /// This collector is single-threaded by specification (see the crate
  /// root docs' Non-goals); this accessor performs no synchronization and
  /// must never be called from more than one thread, nor reentrantly
  /// from within `collect`.
  pub fn global() -> &'static mut Gc {
    static mut GLOBAL: Option<Gc> = None;

    // SAFETY: single-threaded use only, per the collector's contract.
    // `&raw mut` avoids ever materializing a shared reference to the
    // mutable static, which is the one property edition-2024 asks for.
    unsafe {
      let slot = &mut *(&raw mut GLOBAL);
      if slot.is_none() {
        *slot = Some(Gc::with_capacity(DEFAULT_HEAP_SIZE).unwrap_or_else(|err| {
          error!("failed to initialize global heap: {err}");
          std::process::abort();
        }));
      }
      slot.as_mut().unwrap_unchecked()
    }
  }

  /// Allocates `size` raw, pointer-free bytes, reusing a free-list block
  /// when the best-fit search finds one. See [`crate::allocator`] for the
  /// allocation discipline.
  ///
  /// Returns a null pointer if `size` is zero or the heap has no room;
  /// any other failure (free-list corruption) is fatal.
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    match unsafe { allocate(&mut self.region, &mut self.free, &mut self.allocated, size) } {
      Ok(p) => p,
      Err(GcError::HeapExhausted { .. }) => std::ptr::null_mut(),
      Err(err) => {
        error!("fatal allocator error: {err}");
        std::process::abort();
      }
    }
  }

  /// Allocates a typed object described by `layout`, recording the
  /// layout on the block header so the mark phase knows where its
  /// outgoing pointers live.
  ///
  /// `layout` must outlive every block allocated from it; the collector
  /// holds only a non-owning `*const Layout`.
  pub fn new(&mut self, layout: &Layout) -> *mut u8 {
    let payload = self.allocate(layout.size());
    if payload.is_null() {
      return payload;
    }
    let block = unsafe { BlockHeader::from_payload(payload) };
    let kind = if layout.num_ptrs() == 0 {
      PayloadKind::Atomic
    } else {
      PayloadKind::Structured(layout as *const Layout)
    };
    unsafe {
      (*block).payload_kind = kind;
    }
    payload
  }

  /// Explicitly returns `payload` to the free list without waiting for a
  /// collection. Null is a no-op; double-free is fatal.
  pub fn deallocate(&mut self, payload: *mut u8) {
    if let Err(err) = unsafe { deallocate(&mut self.free, &mut self.allocated, payload) } {
      error!("fatal allocator error: {err}");
      std::process::abort();
    }
  }

  /// Registers `pointer` as a root. Accepts null; it is simply skipped
  /// once popped during marking.
  ///
  /// Roots must be inserted before calling `collect`; `collect` drains
  /// this same stack as its mark worklist, so nothing registered here
  /// survives a collection as a "root" afterward.
  pub fn root_insert(&mut self, pointer: *mut u8) {
    self.roots.push(pointer);
  }

  /// Returns true if `payload` points within the issued portion of the
  /// heap at a valid block boundary offset. Used only by
  /// `debug_assert!`-gated validation (§7.3 of the design spec); never
  /// consulted in release builds.
  fn looks_like_heap_pointer(&self, payload: *mut u8) -> bool {
    let addr = payload as usize;
    let lo = self.region.start + BlockHeader::SIZE;
    addr >= lo && addr < self.region.frontier
  }

  /// Runs mark followed by sweep.
  ///
  /// Mark drains the root-set/worklist (see [`crate::roots`]) depth
  /// first, following each visited block's layout offsets; already
  /// marked blocks are skipped on pop, which is what makes cycles and
  /// shared subgraphs terminate correctly. Sweep then walks the
  /// allocated list once: survivors have their mark bit cleared, the
  /// rest are deallocated.
  pub fn collect(&mut self) {
    debug!("collect: starting");
    self.mark();
    let (freed, survived) = self.sweep();
    debug_assert!(self.roots.is_empty(), "root set must be empty after collect");
    debug_assert!(
      self.allocated.iter().all(|block| !unsafe { (*block).marked }),
      "every surviving block must have its mark bit cleared after collect"
    );
    debug!("collect: done, freed={freed} survived={survived}");
  }

  fn mark(&mut self) {
    while let Some(p) = self.roots.pop() {
      if p.is_null() {
        continue;
      }

      if !self.looks_like_heap_pointer(p) {
        warn!("mark: pointer {:#x} is outside the issued heap range", p as usize);
        debug_assert!(false, "pointer outside the heap passed to mark");
        continue;
      }

      let block = unsafe { BlockHeader::from_payload(p) };
      if unsafe { (*block).marked } {
        continue;
      }
      unsafe {
        (*block).marked = true;
      }

      let kind = unsafe { (*block).payload_kind };
      if let PayloadKind::Structured(layout_ptr) = kind {
        let layout = unsafe { &*layout_ptr };
        for &offset in layout.ptr_offsets() {
          let child = unsafe { *(p.add(offset) as *const *mut u8) };
          self.roots.push(child);
        }
      }
    }
  }

  fn sweep(&mut self) -> (usize, usize) {
    let mut freed = 0;
    let mut survived = 0;

    let mut block = self.allocated.iter().next();
    while let Some(current) = block {
      let next = unsafe { (*current).next };

      if unsafe { (*current).marked } {
        unsafe {
          (*current).marked = false;
        }
        survived += 1;
      } else {
        let payload = unsafe { BlockHeader::payload_ptr(current) };
        self.deallocate(payload);
        freed += 1;
      }

      block = if next.is_null() { None } else { Some(next) };
    }

    (freed, survived)
  }

  /// Number of blocks currently on the allocated list. Test/debug helper.
  pub fn allocated_count(&self) -> usize {
    self.allocated.iter().count()
  }

  /// Number of blocks currently on the free list. Test/debug helper.
  pub fn free_count(&self) -> usize {
    self.free.iter().count()
  }
}

/// Allocates a typed object in the process-wide heap. See [`Gc::new`].
pub fn new(layout: &Layout) -> *mut u8 {
  Gc::global().new(layout)
}

/// Registers a root in the process-wide heap. See [`Gc::root_insert`].
pub fn root_insert(pointer: *mut u8) {
  Gc::global().root_insert(pointer);
}

/// Runs a collection over the process-wide heap. See [`Gc::collect`].
pub fn collect() {
  Gc::global().collect();
}

#[cfg(test)]
mod tests {
  use super::*;

  fn small_gc() -> Gc {
    Gc::with_capacity(1 << 20).unwrap()
  }

  #[test]
  fn reachable_graph_survives_collection() {
    let mut gc = small_gc();
    let int_layout = Layout::atomic(4);
    let arr_layout = Layout::ptr_array(3);

    let arr = gc.new(&arr_layout) as *mut *mut u8;
    assert!(!arr.is_null());

    let mut ints = Vec::new();
    for i in 0..3 {
      let p = gc.new(&int_layout);
      unsafe {
        (p as *mut i32).write(i);
        arr.add(i as usize).write(p);
      }
      ints.push(p);
    }

    gc.root_insert(arr as *mut u8);
    gc.collect();

    assert_eq!(gc.allocated_count(), 4);
    assert_eq!(gc.free_count(), 0);
    for (i, p) in ints.iter().enumerate() {
      assert_eq!(unsafe { *(*p as *mut i32) }, i as i32);
    }
  }

  #[test]
  fn unreachable_graph_is_collected() {
    let mut gc = small_gc();
    let int_layout = Layout::atomic(4);
    let arr_layout = Layout::ptr_array(3);

    let arr = gc.new(&arr_layout) as *mut *mut u8;
    for i in 0..3 {
      let p = gc.new(&int_layout);
      unsafe { arr.add(i).write(p) };
    }

    gc.root_insert(std::ptr::null_mut());
    gc.collect();

    assert_eq!(gc.allocated_count(), 0);
    assert_eq!(gc.free_count(), 4);
  }

  #[test]
  fn partial_reachability_frees_only_the_unreferenced_int() {
    let mut gc = small_gc();
    let int_layout = Layout::atomic(4);
    let arr_layout = Layout::ptr_array(4);

    let arr = gc.new(&arr_layout) as *mut *mut u8;
    let int0 = gc.new(&int_layout);
    let int1 = gc.new(&int_layout);
    let dangling = gc.new(&int_layout);

    unsafe {
      arr.add(0).write(int0);
      arr.add(1).write(int1);
      arr.add(2).write(std::ptr::null_mut());
      arr.add(3).write(dangling);
      // Overwritten to null before collection: `dangling` becomes
      // unreachable even though it was briefly referenced.
      arr.add(3).write(std::ptr::null_mut());
    }

    gc.root_insert(arr as *mut u8);
    gc.collect();

    assert_eq!(gc.allocated_count(), 3);
    assert_eq!(gc.free_count(), 1);
  }

  #[test]
  fn cyclic_pair_survives_and_marks_clear() {
    let mut gc = small_gc();
    let pair_layout = Layout::ptr_array(2);

    let a = gc.new(&pair_layout) as *mut *mut u8;
    let b = gc.new(&pair_layout) as *mut *mut u8;

    unsafe {
      a.write(b as *mut u8);
      a.add(1).write(std::ptr::null_mut());
      b.write(a as *mut u8);
      b.add(1).write(std::ptr::null_mut());
    }

    gc.root_insert(a as *mut u8);
    gc.collect();

    assert_eq!(gc.allocated_count(), 2);
    assert_eq!(gc.free_count(), 0);

    let a_block = unsafe { BlockHeader::from_payload(a as *mut u8) };
    let b_block = unsafe { BlockHeader::from_payload(b as *mut u8) };
    assert!(!unsafe { (*a_block).marked });
    assert!(!unsafe { (*b_block).marked });
  }

  #[test]
  fn unreachable_cycle_is_fully_reclaimed() {
    let mut gc = small_gc();
    let pair_layout = Layout::ptr_array(2);

    let a = gc.new(&pair_layout) as *mut *mut u8;
    let b = gc.new(&pair_layout) as *mut *mut u8;
    unsafe {
      a.write(b as *mut u8);
      b.write(a as *mut u8);
    }

    gc.root_insert(std::ptr::null_mut());
    gc.collect();

    assert_eq!(gc.allocated_count(), 0);
    assert_eq!(gc.free_count(), 2);
  }

  #[test]
  fn double_collect_with_no_mutation_is_idempotent() {
    let mut gc = small_gc();
    let int_layout = Layout::atomic(4);
    let p = gc.new(&int_layout);
    gc.root_insert(p);
    gc.collect();
    assert_eq!(gc.allocated_count(), 1);

    // Second collect with no roots re-inserted: the survivor from the
    // first pass is not re-rooted, so it is reclaimed this time. This
    // demonstrates collect() genuinely drains the root set rather than
    // remembering prior roots.
    gc.collect();
    assert_eq!(gc.allocated_count(), 0);
    assert_eq!(gc.free_count(), 1);

    // A third collect with still nothing to mark and nothing left to
    // sweep must be a true no-op.
    gc.collect();
    assert_eq!(gc.allocated_count(), 0);
    assert_eq!(gc.free_count(), 1);
  }

  #[test]
  fn collect_asserts_no_marked_survivors_remain() {
    // Exercises the same post-condition the debug_assert! in `collect`
    // checks, directly against `sweep`'s output, independent of whether
    // `collect`'s own internal assert would catch a regression.
    let mut gc = small_gc();
    let int_layout = Layout::atomic(4);
    let p = gc.new(&int_layout);
    gc.root_insert(p);
    gc.collect();

    let block = unsafe { BlockHeader::from_payload(p) };
    assert!(!unsafe { (*block).marked });
  }
}
