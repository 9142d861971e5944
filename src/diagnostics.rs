//! Structured logging for the allocator's public entry points.
//!
//! Fatal OS failures always log at `error` level through [`crate::os::fatal`].
//! The `diagnostics` feature additionally traces every successful call with
//! its size and resulting address, the moral equivalent of the teacher's
//! `print_alloc` debug helper, but routed through `log` instead of `println!`
//! so it composes with whatever subscriber the embedding application uses.

/// Traces a completed `malloc`/`calloc`-style allocation. A no-op unless
/// built with the `diagnostics` feature.
#[inline]
pub fn trace_allocate(requested: usize, address: *mut u8) {
    if cfg!(feature = "diagnostics") {
        log::trace!(
            "allocate(requested={requested}) -> {address:p} (break={:?})",
            crate::os::query_break()
        );
    }
}

/// Traces a completed `free`. A no-op unless built with the `diagnostics`
/// feature.
#[inline]
pub fn trace_free(address: *mut u8) {
    if cfg!(feature = "diagnostics") {
        log::trace!(
            "free({address:p}) (break={:?})",
            crate::os::query_break()
        );
    }
}

/// Traces a completed `realloc`. A no-op unless built with the
/// `diagnostics` feature.
#[inline]
pub fn trace_reallocate(old_address: *mut u8, requested: usize, new_address: *mut u8) {
    if cfg!(feature = "diagnostics") {
        log::trace!(
            "reallocate({old_address:p}, requested={requested}) -> {new_address:p} (break={:?})",
            crate::os::query_break()
        );
    }
}
