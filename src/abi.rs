//! C ABI exports, gated behind the `capi` feature.
//!
//! These let this crate be linked in place of the system allocator from C
//! (or from Rust via `extern "C"`) rather than installed through
//! `#[global_allocator]`. All four symbols share one process-wide
//! [`Allocator`] instance.

use std::sync::LazyLock;

use crate::allocator::Allocator;

static ALLOCATOR: LazyLock<Allocator> = LazyLock::new(Allocator::new);

/// Allocates `size` bytes. Returns a null pointer if `size` is zero.
///
/// # Safety
/// Callable from C with any `size`; the returned pointer must eventually be
/// passed to at most one of [`free`] or [`realloc`], and only from this
/// same allocator.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn malloc(size: usize) -> *mut u8 {
    ALLOCATOR.allocate(size)
}

/// Allocates `count * size` zeroed bytes. Returns a null pointer if either
/// argument is zero.
///
/// # Safety
/// Same contract as [`malloc`].
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn calloc(count: usize, size: usize) -> *mut u8 {
    ALLOCATOR.zero_allocate(count, size)
}

/// Releases a block previously returned by [`malloc`], [`calloc`], or
/// [`realloc`]. A null pointer is a no-op.
///
/// # Safety
/// `ptr` must be null or a live pointer from this same allocator, not
/// already freed.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn free(ptr: *mut u8) {
    unsafe { ALLOCATOR.free(ptr) }
}

/// Resizes a block previously returned by [`malloc`], [`calloc`], or
/// [`realloc`]. A null `ptr` behaves like `malloc`; a zero `size` behaves
/// like `free` and returns a null pointer.
///
/// # Safety
/// `ptr` must be null or a live pointer from this same allocator, not
/// already freed. `ptr` is invalidated by the call regardless of whether
/// the block moved.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn realloc(ptr: *mut u8, size: usize) -> *mut u8 {
    unsafe { ALLOCATOR.reallocate(ptr, size) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malloc_free_round_trip() {
        let ptr = unsafe { malloc(128) };
        assert!(!ptr.is_null());
        unsafe { free(ptr) };
    }

    #[test]
    fn calloc_zeroes_memory() {
        let ptr = unsafe { calloc(8, 8) };
        assert!(!ptr.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 64) };
        assert!(bytes.iter().all(|&b| b == 0));
        unsafe { free(ptr) };
    }
}
