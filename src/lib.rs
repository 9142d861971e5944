//! # brkalloc - a best-fit `brk`/`mmap` general-purpose allocator
//!
//! This crate implements a `malloc`/`free`/`calloc`/`realloc` replacement
//! for Unix targets, built directly on `brk`/`sbrk` and `mmap`/`munmap`.
//!
//! ## Overview
//!
//! Small and medium requests are served from a single brk-managed arena:
//! an intrusive singly-linked list of blocks, each a header immediately
//! followed by its payload. Placement is best-fit — the smallest free
//! block that satisfies a request, ties broken in favor of whichever
//! qualifying block was encountered first. Requests at or above the mmap
//! threshold bypass the arena entirely and get their own anonymous
//! mapping, released back to the kernel independently on `free`.
//!
//! ```text
//!   Brk arena:
//!   ┌──────────────────────────────────────────────────────────────────┐
//!   │   ┌────┬────┬────┬────┬──────────────────────────────────────┐   │
//!   │   │ H1 │ H2 │ H3 │ H4 │              free space              │   │
//!   │   └────┴────┴────┴────┴──────────────────────────────────────┘   │
//!   │                                                          ▲       │
//!   │                                                    program break │
//!   └──────────────────────────────────────────────────────────────────┘
//!
//!   Each header:
//!   ┌───────────────────────┬────────────────────────────────┐
//!   │      BlockHeader       │           payload              │
//!   │  size / status / next  │        usable bytes            │
//!   └───────────────────────┴────────────────────────────────┘
//! ```
//!
//! ## Crate structure
//!
//! ```text
//!   brkalloc
//!   ├── align        - alignment arithmetic
//!   ├── config       - tunable constants (alignment, mmap threshold)
//!   ├── block        - the block header and its narrow unsafe handle type
//!   ├── os           - brk/mmap/page-size primitives
//!   ├── list         - the intrusive block list: search, split, coalesce
//!   ├── policy       - malloc/calloc placement and release
//!   ├── realloc      - the realloc decision tree
//!   ├── diagnostics  - optional per-call trace logging
//!   ├── allocator    - the public Allocator type and its GlobalAlloc impl
//!   └── abi          - optional extern "C" malloc/free/calloc/realloc (capi)
//! ```
//!
//! ## Quick start
//!
//! ```
//! use brkalloc::Allocator;
//!
//! let allocator = Allocator::new();
//! let ptr = allocator.allocate(64);
//! assert!(!ptr.is_null());
//! unsafe {
//!     ptr.write_bytes(0, 64);
//!     allocator.free(ptr);
//! }
//! ```
//!
//! Installed as the process-wide allocator:
//!
//! ```rust,ignore
//! use brkalloc::Allocator;
//!
//! #[global_allocator]
//! static ALLOCATOR: Allocator = Allocator::new();
//! ```
//!
//! ## Error handling
//!
//! The four public operations can't partially fail: there is no sensible
//! value to return from `allocate` if `brk` itself errors out from under
//! it. Every OS-primitive failure is logged at `error` level through the
//! `log` crate and then terminates the process, matching the "fatal and
//! loud" posture a general-purpose allocator needs rather than threading
//! a `Result` through every caller.
//!
//! ## Thread safety
//!
//! [`Allocator`] wraps its state in a `Mutex` purely so the type satisfies
//! `GlobalAlloc`'s `Sync` bound; the block-list algorithm itself has no
//! further concurrency design beyond "only one thread touches the list at
//! a time," which the mutex already guarantees.
//!
//! ## Limitations
//!
//! - **Unix-only**: requires `libc`'s `brk`/`sbrk`/`mmap`/`munmap`.
//! - **Fixed alignment per instance**: every allocation from one
//!   [`Allocator`] shares its `Config::alignment`; over-aligned requests
//!   beyond that are not supported.
//! - **Never shrinks the program break**: once extended, brk-backed arena
//!   space is reused but not returned to the OS (mapped blocks are the
//!   exception: they're `munmap`ped on free).

#[cfg(feature = "capi")]
pub mod abi;
pub mod align;
pub mod allocator;
pub mod block;
pub mod config;
pub mod diagnostics;
pub mod list;
pub mod os;
pub mod policy;
pub mod realloc;

pub use allocator::Allocator;
pub use config::Config;
