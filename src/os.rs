//! The operating-system primitive layer.
//!
//! Everything in this module is a thin, `unsafe`-isolating wrapper around
//! the five primitives the rest of the allocator is built on: querying and
//! advancing the program break, creating and releasing anonymous mappings,
//! and reading the system page size. No placement policy lives here.

use std::ffi::c_void;
use std::sync::OnceLock;

use libc::{self, intptr_t};

/// A failure in one of the OS primitives this allocator depends on.
///
/// Per the allocator's error-handling design, every one of these is
/// treated as fatal by the public API layer: none of the four public
/// operations can partially succeed, so there is nothing sensible to do
/// with an `Err` here except log it and terminate.
#[derive(Debug, thiserror::Error)]
pub enum OsError {
    #[error("sbrk(0) failed to report the current program break")]
    QueryBreak,
    #[error("brk failed to advance the program break (errno {0})")]
    AdvanceBreak(i32),
    #[error("mmap failed to create a {size}-byte anonymous mapping (errno {errno})")]
    MapAnon { size: usize, errno: i32 },
    #[error("munmap failed to release a {size}-byte mapping at {addr:p} (errno {errno})")]
    Unmap {
        addr: *mut u8,
        size: usize,
        errno: i32,
    },
}

/// Returns the current program break.
pub fn query_break() -> Result<*mut u8, OsError> {
    let ptr = unsafe { libc::sbrk(0) };
    if ptr as isize == -1 {
        Err(OsError::QueryBreak)
    } else {
        Ok(ptr.cast())
    }
}

/// Advances the program break to exactly `target`. Never rewinds: callers
/// are responsible for only ever requesting addresses above the current
/// break (see §9, "Non-shrinking break").
pub fn advance_break(target: *mut u8) -> Result<(), OsError> {
    let result = unsafe { libc::brk(target.cast::<c_void>()) };
    if result == -1 {
        Err(OsError::AdvanceBreak(errno()))
    } else {
        Ok(())
    }
}

/// Advances the program break by `delta` bytes past its current position
/// and returns the break's value *before* the advance — i.e. the start
/// address of the newly available region. This is the brk-tail-append and
/// initial-arena-preallocation primitive.
pub fn bump_break(delta: usize) -> Result<*mut u8, OsError> {
    let old = unsafe { libc::sbrk(delta as intptr_t) };
    if old as isize == -1 {
        Err(OsError::AdvanceBreak(errno()))
    } else {
        Ok(old.cast())
    }
}

/// Creates a private, anonymous, readable-writable mapping of exactly
/// `size` bytes.
pub fn map_anon(size: usize) -> Result<*mut u8, OsError> {
    let addr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_READ | libc::PROT_WRITE,
            libc::MAP_PRIVATE | libc::MAP_ANON,
            -1,
            0,
        )
    };
    if addr == libc::MAP_FAILED {
        Err(OsError::MapAnon {
            size,
            errno: errno(),
        })
    } else {
        Ok(addr.cast())
    }
}

/// Releases a mapping previously created by [`map_anon`].
pub fn unmap(addr: *mut u8, size: usize) -> Result<(), OsError> {
    let result = unsafe { libc::munmap(addr.cast::<c_void>(), size) };
    if result == -1 {
        Err(OsError::Unmap {
            addr,
            size,
            errno: errno(),
        })
    } else {
        Ok(())
    }
}

static PAGE_SIZE: OnceLock<usize> = OnceLock::new();

/// The system page size, queried once per process and cached thereafter.
#[must_use]
pub fn page_size() -> usize {
    *PAGE_SIZE.get_or_init(|| unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize })
}

fn errno() -> i32 {
    std::io::Error::last_os_error()
        .raw_os_error()
        .unwrap_or(0)
}

/// Logs `err` at `error` level and terminates the process.
///
/// Every OS-primitive failure reaches here: the public API layer never
/// propagates a `Result` back to the caller of `allocate`/`free`/etc.,
/// matching the source's `DIE`-style "print and exit" policy translated
/// into idiomatic Rust logging plus a diagnostic panic.
pub fn fatal(err: OsError) -> ! {
    log::error!("fatal allocator error: {err}");
    panic!("fatal allocator error: {err}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_plausible() {
        let size = page_size();
        assert!(size >= 4096);
        assert_eq!(size % 4096, 0);
    }

    #[test]
    fn map_and_unmap_round_trip() {
        let size = page_size();
        let addr = map_anon(size).expect("mmap should succeed");
        assert!(!addr.is_null());
        unmap(addr, size).expect("munmap should succeed");
    }
}
