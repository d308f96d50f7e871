//! # precisegc - a precise, stop-the-world mark-and-sweep collector
//!
//! This crate provides a **non-moving mark-and-sweep garbage collector**
//! layered on top of a best-fit free-list allocator that manages a single
//! large, pre-reserved virtual address region. Client code allocates typed
//! objects whose pointer layout is described externally via [`Layout`],
//! registers live roots, and triggers collection explicitly; the collector
//! reclaims unreachable objects back to the free list.
//!
//! ## Overview
//!
//! Unlike a pure bump allocator, `allocate` first tries to reuse a
//! same-or-larger block from the free list (best fit) before falling back
//! to bumping the frontier forward:
//!
//! ```text
//!   Heap Region:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         RESERVED REGION                              │
//!   │                                                                      │
//!   │   ┌─────┬─────┬─────┬─────┬───────────────────────────────────────┐  │
//!   │   │ A1  │ A2  │ A3  │ A4  │              unused                   │  │
//!   │   └─────┴─────┴─────┴─────┴───────────────────────────────────────┘  │
//!   │                           ▲                                     ▲    │
//!   │                           │                                     │    │
//!   │                       frontier                                 end   │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Freed blocks (A2 below) join the free list instead of shrinking the
//!   region; a later allocate() may hand A2's memory straight back out.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   precisegc
//!   ├── align      - alignment macros (align!, align_to!)
//!   ├── error      - GcError: fatal vs. transient failure modes
//!   ├── layout     - client-facing Layout descriptors
//!   ├── region     - HeapRegion: the single reserved mapping + bump frontier
//!   ├── block      - BlockHeader, the free/allocated intrusive lists
//!   ├── allocator  - best-fit allocate/deallocate over those lists
//!   ├── roots      - the root-set stack / mark worklist
//!   └── collector  - Gc: ties it together, implements mark + sweep
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use precisegc::{Gc, Layout};
//!
//! let mut gc = Gc::with_capacity(1 << 20).unwrap();
//!
//! let int_layout = Layout::atomic(4);
//! let p = gc.new(&int_layout) as *mut i32;
//! unsafe { *p = 42; }
//!
//! gc.root_insert(p as *mut u8);
//! gc.collect();
//! ```
//!
//! ## How It Works
//!
//! Each allocation is preceded by a fixed-size header placed just before
//! the payload:
//!
//! ```text
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │    Block Header       │         Payload                │
//!   │  ┌─────────────────┐  │                                │
//!   │  │ size: N         │  │  ┌──────────────────────────┐  │
//!   │  │ allocated: bool │  │  │                          │  │
//!   │  │ marked: bool    │  │  │     N bytes usable       │  │
//!   │  │ payload_kind    │  │  │                          │  │
//!   │  │ prev, next      │  │  └──────────────────────────┘  │
//!   │  └─────────────────┘  │                                │
//!   └───────────────────────┴────────────────────────────────┘
//!                           ▲
//!                           └── pointer returned to the client, always
//!                               16-byte aligned.
//! ```
//!
//! Collection walks the root set as a DFS worklist (documented on
//! [`Gc::collect`]), marking every reachable block, then sweeps the
//! allocated list once, reclaiming anything left unmarked.
//!
//! ## Features
//!
//! - **Precise marking**: pointer locations come from client-supplied
//!   [`Layout`] descriptors, never from conservative stack scanning.
//! - **Non-moving**: blocks never move, so raw pointers into the heap stay
//!   valid across a collection.
//! - **Best-fit reuse**: freed blocks are reused by size before the
//!   allocator ever bumps the frontier forward.
//!
//! ## Non-goals
//!
//! No compaction, no generations, no concurrent or incremental marking, no
//! conservative root scanning, no finalizers, no weak references, and no
//! multi-threaded safety — see `DESIGN.md` for the rationale behind each.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management
//! and precise pointer layouts supplied by the client. Violating a
//! [`Layout`]'s contract (an offset that isn't really a pointer, a pointer
//! that doesn't point into this heap) is undefined behavior; debug builds
//! catch some of these with `debug_assert!`.

pub mod align;
mod allocator;
mod block;
mod collector;
mod error;
mod layout;
mod region;
mod roots;

pub use collector::{collect, new, root_insert, Gc};
pub use error::GcError;
pub use layout::{Layout, PTR_WIDTH};
pub use region::DEFAULT_HEAP_SIZE;
