//! The public allocator surface.
//!
//! [`Allocator`] owns one block list and one [`Config`]; everything it does
//! is delegate to [`crate::policy`] and [`crate::realloc`] under a lock. The
//! lock exists purely to give the type a `Sync` bound so it can be
//! installed as a `#[global_allocator]`; the block-list algorithm itself is
//! neither designed for nor tested under concurrent access from multiple
//! threads at once (see the crate-level docs).

use std::alloc::{GlobalAlloc, Layout};
use std::sync::Mutex;

#[cfg(test)]
use crate::block::BlockHandle;
use crate::config::Config;
use crate::diagnostics;
use crate::list::BlockList;
use crate::os;
use crate::policy;
use crate::realloc;

struct Inner {
    list: BlockList,
    config: Config,
}

/// A best-fit, brk/mmap-backed general-purpose allocator.
///
/// Construct one with [`Allocator::new`] for the documented platform
/// defaults, or [`Allocator::with_config`] to override the alignment or
/// mmap threshold (mainly useful in tests, so mmap-routing scenarios don't
/// need to request 128 KiB per case).
pub struct Allocator {
    inner: Mutex<Inner>,
}

impl Allocator {
    /// Creates an allocator using [`Config::default`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates an allocator using a caller-supplied configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Mutex::new(Inner {
                list: BlockList::new(),
                config,
            }),
        }
    }

    /// `malloc`-equivalent: returns a pointer to at least `size` usable,
    /// unzeroed bytes, or a null pointer if `size` is zero.
    ///
    /// Terminates the process if an underlying OS primitive fails; see the
    /// crate-level error-handling notes.
    #[must_use]
    pub fn allocate(&self, size: usize) -> *mut u8 {
        if size == 0 {
            return std::ptr::null_mut();
        }
        let mut inner = self.inner.lock().unwrap();
        let header_size = inner.config.header_size();
        match policy::allocate(&mut inner.list, &inner.config, size) {
            Ok(block) => {
                let payload = block.payload(header_size);
                diagnostics::trace_allocate(size, payload);
                payload
            }
            Err(err) => os::fatal(err),
        }
    }

    /// `calloc`-equivalent: returns a pointer to `count * elem_size` zeroed
    /// bytes, or a null pointer if either argument is zero.
    #[must_use]
    pub fn zero_allocate(&self, count: usize, elem_size: usize) -> *mut u8 {
        if count == 0 || elem_size == 0 {
            return std::ptr::null_mut();
        }
        let mut inner = self.inner.lock().unwrap();
        let header_size = inner.config.header_size();
        match policy::zero_allocate(&mut inner.list, &inner.config, count, elem_size) {
            Ok(block) => {
                let payload = block.payload(header_size);
                unsafe { std::ptr::write_bytes(payload, 0, block.size()) };
                diagnostics::trace_allocate(count * elem_size, payload);
                payload
            }
            Err(err) => os::fatal(err),
        }
    }

    /// `free`-equivalent: releases the block backing `ptr`. A null pointer,
    /// or a pointer this allocator did not hand out, is a silent no-op.
    ///
    /// # Safety
    /// If non-null, `ptr` must be a pointer previously returned by this
    /// same `Allocator` via [`Allocator::allocate`], [`Allocator::zero_allocate`],
    /// or [`Allocator::reallocate`], and not already freed.
    pub unsafe fn free(&self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let mut inner = self.inner.lock().unwrap();
        let header_size = inner.config.header_size();
        let Some(block) = inner.list.find_by_payload(ptr, header_size) else {
            return;
        };
        match policy::release(&mut inner.list, &inner.config, block) {
            Ok(()) => diagnostics::trace_free(ptr),
            Err(err) => os::fatal(err),
        }
    }

    /// `realloc`-equivalent. A null `ptr` behaves like [`Allocator::allocate`];
    /// a `size` of zero behaves like [`Allocator::free`] and returns a null
    /// pointer.
    ///
    /// # Safety
    /// If non-null, `ptr` must be a pointer previously returned by this same
    /// `Allocator` and not already freed. On return, `ptr` is invalidated:
    /// either it was resized in place, or its contents were copied to a new
    /// block and the old block released.
    #[must_use]
    pub unsafe fn reallocate(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        if size == 0 {
            unsafe { self.free(ptr) };
            return std::ptr::null_mut();
        }

        let mut inner = self.inner.lock().unwrap();
        let header_size = inner.config.header_size();
        let Some(block) = inner.list.find_by_payload(ptr, header_size) else {
            return std::ptr::null_mut();
        };
        let config = inner.config;
        match realloc::reallocate(&mut inner.list, &config, block, size) {
            Ok(Some(new_block)) => {
                let payload = new_block.payload(header_size);
                diagnostics::trace_reallocate(ptr, size, payload);
                payload
            }
            Ok(None) => std::ptr::null_mut(),
            Err(err) => os::fatal(err),
        }
    }

    #[cfg(test)]
    fn block_count(&self) -> usize {
        self.inner.lock().unwrap().list.iter().count()
    }

    #[cfg(test)]
    fn find(&self, ptr: *mut u8) -> Option<BlockHandle> {
        let inner = self.inner.lock().unwrap();
        inner.list.find_by_payload(ptr, inner.config.header_size())
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::new()
    }
}

/// # Safety
/// `Allocator` only ever widens the set of bytes it owns (via `brk`/`mmap`)
/// and never moves memory out from under a live allocation, satisfying
/// `GlobalAlloc`'s aliasing requirements given the caller upholds the
/// contracts on [`Allocator::free`] and [`Allocator::reallocate`].
unsafe impl GlobalAlloc for Allocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        debug_assert!(layout.align() <= self.inner.lock().unwrap().config.alignment);
        self.allocate(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        unsafe { self.free(ptr) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        debug_assert!(layout.align() <= self.inner.lock().unwrap().config.alignment);
        self.zero_allocate(1, layout.size())
    }

    unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { self.reallocate(ptr, new_size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Status;

    fn test_allocator() -> Allocator {
        Allocator::with_config(Config {
            alignment: 8,
            mmap_threshold: 4096,
        })
    }

    #[test]
    fn allocate_write_read_and_free() {
        let allocator = test_allocator();
        let ptr = allocator.allocate(64);
        assert!(!ptr.is_null());
        unsafe {
            ptr.write_bytes(0xAB, 64);
            assert_eq!(*ptr, 0xAB);
        }
        unsafe { allocator.free(ptr) };
        assert!(allocator.find(ptr).map(BlockHandle::status) == Some(Status::Free));
    }

    #[test]
    fn allocate_zero_size_returns_null() {
        let allocator = test_allocator();
        assert!(allocator.allocate(0).is_null());
    }

    #[test]
    fn free_of_null_is_a_no_op() {
        let allocator = test_allocator();
        unsafe { allocator.free(std::ptr::null_mut()) };
    }

    #[test]
    fn zero_allocate_zeroes_memory() {
        let allocator = test_allocator();
        let ptr = allocator.zero_allocate(16, 4);
        assert!(!ptr.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn reallocate_preserves_contents_on_growth() {
        let allocator = test_allocator();
        let ptr = allocator.allocate(16);
        unsafe { ptr.write_bytes(0x7, 16) };
        let grown = unsafe { allocator.reallocate(ptr, 512) };
        assert!(!grown.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(grown, 16) };
        assert!(bytes.iter().all(|&b| b == 0x7));
    }

    #[test]
    fn reallocate_null_behaves_like_allocate() {
        let allocator = test_allocator();
        let ptr = unsafe { allocator.reallocate(std::ptr::null_mut(), 32) };
        assert!(!ptr.is_null());
    }

    #[test]
    fn reallocate_to_zero_frees_and_returns_null() {
        let allocator = test_allocator();
        let ptr = allocator.allocate(32);
        let result = unsafe { allocator.reallocate(ptr, 0) };
        assert!(result.is_null());
        assert_eq!(allocator.find(ptr).map(BlockHandle::status), Some(Status::Free));
    }

    #[test]
    fn reused_block_count_does_not_grow_unboundedly() {
        let allocator = test_allocator();
        for _ in 0..16 {
            let ptr = allocator.allocate(32);
            unsafe { allocator.free(ptr) };
        }
        assert!(allocator.block_count() <= 2);
    }
}
