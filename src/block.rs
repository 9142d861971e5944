//! The block header and the narrow unsafe layer around it.
//!
//! The allocator threads its metadata directly into the managed memory,
//! the way the teacher's `Block` does: a header immediately followed by
//! the payload it describes. [`BlockHandle`] is the one place that raw
//! pointer arithmetic on headers happens; everything above this module
//! only ever sees handles.

use std::mem;
use std::ptr::NonNull;

/// The lifecycle state of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Payload released; brk-backed, eligible for reuse or coalescing.
    Free,
    /// Payload in use; brk-backed.
    Alloc,
    /// Backed by its own anonymous mapping; destroyed on free rather than
    /// recycled.
    Mapped,
}

/// The fixed-size bookkeeping record at the start of every block.
#[repr(C)]
pub struct BlockHeader {
    size: usize,
    status: Status,
    next: *mut BlockHeader,
}

/// The unaligned size of [`BlockHeader`]; callers should use
/// [`crate::config::Config::header_size`] for the aligned size actually
/// used to place payloads.
pub(crate) const HEADER_SIZE: usize = mem::size_of::<BlockHeader>();

/// A non-null pointer to a [`BlockHeader`].
///
/// This is the allocator's "typed block handle": every field access and
/// every payload/header conversion goes through here, so the rest of the
/// crate deals in handles and never in raw `*mut BlockHeader` arithmetic.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle(NonNull<BlockHeader>);

impl BlockHandle {
    /// Wraps `ptr` as a block handle, or returns `None` for a null pointer
    /// (the list's "sentinel" representation).
    ///
    /// # Safety
    /// `ptr`, if non-null, must point to a live, properly initialized
    /// `BlockHeader` that outlives the handle.
    #[must_use]
    pub unsafe fn from_raw(ptr: *mut BlockHeader) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Initializes a new header at `ptr` and returns a handle to it.
    ///
    /// # Safety
    /// `ptr` must point to at least `HEADER_SIZE` writable, properly
    /// aligned bytes that are not currently part of any other block.
    #[must_use]
    pub unsafe fn init(ptr: *mut u8, size: usize, status: Status) -> Self {
        let header = ptr.cast::<BlockHeader>();
        unsafe {
            header.write(BlockHeader {
                size,
                status,
                next: std::ptr::null_mut(),
            });
            Self(NonNull::new_unchecked(header))
        }
    }

    #[must_use]
    pub fn as_ptr(self) -> *mut BlockHeader {
        self.0.as_ptr()
    }

    #[must_use]
    pub fn size(self) -> usize {
        unsafe { (*self.0.as_ptr()).size }
    }

    pub fn set_size(self, size: usize) {
        unsafe { (*self.0.as_ptr()).size = size }
    }

    #[must_use]
    pub fn status(self) -> Status {
        unsafe { (*self.0.as_ptr()).status }
    }

    pub fn set_status(self, status: Status) {
        unsafe { (*self.0.as_ptr()).status = status }
    }

    #[must_use]
    pub fn next(self) -> Option<BlockHandle> {
        unsafe { BlockHandle::from_raw((*self.0.as_ptr()).next) }
    }

    pub fn set_next(self, next: Option<BlockHandle>) {
        let raw = next.map_or(std::ptr::null_mut(), BlockHandle::as_ptr);
        unsafe { (*self.0.as_ptr()).next = raw }
    }

    /// The address of this block's payload, `header_size` bytes after the
    /// header.
    #[must_use]
    pub fn payload(self, header_size: usize) -> *mut u8 {
        unsafe { (self.0.as_ptr() as *mut u8).add(header_size) }
    }

    /// The address immediately after this block's payload: where a
    /// physically contiguous brk-backed successor's header would begin.
    #[must_use]
    pub fn end(self, header_size: usize) -> *mut u8 {
        unsafe { self.payload(header_size).add(self.size()) }
    }

    /// Recovers the block handle owning a payload pointer previously
    /// returned by [`BlockHandle::payload`] with the same `header_size`.
    ///
    /// # Safety
    /// `payload` must be a pointer this allocator previously handed out,
    /// not yet invalidated, and `header_size` must match the value used
    /// to produce it.
    #[must_use]
    pub unsafe fn from_payload(payload: *mut u8, header_size: usize) -> Self {
        let header = unsafe { payload.sub(header_size) }.cast::<BlockHeader>();
        unsafe {
            Self(NonNull::new_unchecked(header))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `BlockHeader` contains a `usize` and a raw pointer, so tests that
    /// hand-initialize one need a buffer aligned at least as strictly as
    /// the header itself, not just `u8`.
    #[repr(align(8))]
    struct AlignedBuf([u8; 64]);

    #[test]
    fn init_round_trips_through_payload() {
        let mut buf = AlignedBuf([0u8; 64]);
        let header_size = HEADER_SIZE;
        let handle = unsafe { BlockHandle::init(buf.0.as_mut_ptr(), 32, Status::Alloc) };

        assert_eq!(handle.size(), 32);
        assert_eq!(handle.status(), Status::Alloc);
        assert!(handle.next().is_none());

        let payload = handle.payload(header_size);
        let recovered = unsafe { BlockHandle::from_payload(payload, header_size) };
        assert_eq!(recovered.as_ptr(), handle.as_ptr());
    }

    #[test]
    fn next_links_and_unlinks() {
        let mut a = AlignedBuf([0u8; 64]);
        let mut b = AlignedBuf([0u8; 64]);

        let handle_a = unsafe { BlockHandle::init(a.0.as_mut_ptr(), 16, Status::Free) };
        let handle_b = unsafe { BlockHandle::init(b.0.as_mut_ptr(), 16, Status::Free) };

        handle_a.set_next(Some(handle_b));
        assert_eq!(handle_a.next().map(BlockHandle::as_ptr), Some(handle_b.as_ptr()));

        handle_a.set_next(None);
        assert!(handle_a.next().is_none());
    }
}
