//! The intrusive block list.
//!
//! One singly-linked list threads through every block the allocator has
//! ever created, brk-backed and mmap-backed alike, in the order they were
//! created. Placement, splitting, and coalescing are all expressed as
//! operations over this list; nothing above this module walks block
//! pointers directly.

use crate::block::{BlockHandle, Status};

/// The block list anchor. Cloning a [`BlockList`] aliases the same chain;
/// it carries no Drop behavior of its own, matching the fact that the
/// allocator owns the underlying memory for the life of the process.
#[derive(Clone, Copy)]
pub struct BlockList {
    head: Option<BlockHandle>,
}

impl BlockList {
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None }
    }

    #[must_use]
    pub fn head(self) -> Option<BlockHandle> {
        self.head
    }

    pub fn set_head(&mut self, head: Option<BlockHandle>) {
        self.head = head;
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.head.is_none()
    }

    /// Iterates the list in link order.
    pub fn iter(self) -> Iter {
        Iter { next: self.head }
    }

    /// Appends `block` to the end of the list. `O(n)`, matching the
    /// teacher's own tail-append traversal.
    pub fn push_back(&mut self, block: BlockHandle) {
        match self.last() {
            Some(tail) => tail.set_next(Some(block)),
            None => self.head = Some(block),
        }
    }

    /// Returns the last block in the list.
    #[must_use]
    pub fn last(self) -> Option<BlockHandle> {
        self.iter().last()
    }

    /// Returns the last brk-backed (non-mapped) block, used to find the
    /// block physically adjacent to the current program break.
    #[must_use]
    pub fn last_brk_backed(self) -> Option<BlockHandle> {
        self.iter().filter(|b| b.status() != Status::Mapped).last()
    }

    /// Splices a new brk-backed `block` in right after the last brk-backed
    /// node (or at the head, if none exists yet).
    ///
    /// Mapped blocks always appear after every brk-backed block, so a new
    /// brk block can never simply be appended at the absolute tail: if any
    /// mapped blocks already exist, that would land the new block after
    /// them.
    pub fn insert_after_last_brk_backed(&mut self, block: BlockHandle) {
        match self.last_brk_backed() {
            Some(anchor) => {
                block.set_next(anchor.next());
                anchor.set_next(Some(block));
            }
            None => {
                block.set_next(self.head);
                self.head = Some(block);
            }
        }
    }

    /// Removes `target` from the list. `target` must currently be linked.
    pub fn unlink(&mut self, target: BlockHandle) {
        match self.head {
            Some(head) if head.as_ptr() == target.as_ptr() => {
                self.head = target.next();
                return;
            }
            _ => {}
        }
        for block in self.iter() {
            if let Some(next) = block.next() {
                if next.as_ptr() == target.as_ptr() {
                    block.set_next(target.next());
                    return;
                }
            }
        }
    }

    /// Finds the smallest free block whose size is at least `size`. Ties
    /// resolve to whichever qualifying block was encountered first while
    /// walking from the head.
    #[must_use]
    pub fn find_best_fit(self, size: usize) -> Option<BlockHandle> {
        let mut best: Option<BlockHandle> = None;
        for block in self.iter() {
            if block.status() != Status::Free || block.size() < size {
                continue;
            }
            match best {
                Some(current) if block.size() >= current.size() => {}
                _ => best = Some(block),
            }
        }
        best
    }

    /// Locates the block owning a previously returned payload pointer.
    #[must_use]
    pub fn find_by_payload(self, payload: *mut u8, header_size: usize) -> Option<BlockHandle> {
        self.iter()
            .find(|block| block.payload(header_size) == payload)
    }

    /// Splits `block` so that its usable size becomes exactly `size`,
    /// carving a new free block out of the remainder and linking it in
    /// right after `block`.
    ///
    /// Only splits when the remainder is large enough to hold a header
    /// plus at least one aligned byte of payload; otherwise the whole
    /// block is handed over unsplit, avoiding unusably small free
    /// fragments.
    ///
    /// # Safety
    /// `block` must be brk-backed (mmap-backed blocks are never split) and
    /// `size` must not exceed `block.size()`.
    pub unsafe fn split(&mut self, block: BlockHandle, size: usize, header_size: usize, alignment: usize) {
        debug_assert!(size <= block.size());
        let remainder = block.size() - size;
        if remainder <= header_size {
            return;
        }
        let remainder_payload = remainder - header_size;
        if remainder_payload == 0 || remainder_payload % alignment != 0 {
            return;
        }
        let split_at = block.payload(header_size).wrapping_add(size);
        let new_block = unsafe { BlockHandle::init(split_at, remainder_payload, Status::Free) };
        new_block.set_next(block.next());
        block.set_size(size);
        block.set_next(Some(new_block));
    }

    /// Merges every run of adjacent, physically contiguous free blocks in
    /// the list into single blocks. Mapped blocks are never touched: a
    /// mapped block has no brk-contiguous neighbor by construction.
    pub fn coalesce_all(&mut self, header_size: usize) {
        let mut cursor = self.head;
        while let Some(block) = cursor {
            if block.status() == Status::Free {
                self.coalesce_forward(block, header_size, usize::MAX);
            }
            cursor = block.next();
        }
    }

    /// Merges `block` with as many immediately following, physically
    /// contiguous free blocks as it takes to reach at least `target_size`,
    /// or until the chain of contiguous free neighbors runs out,
    /// whichever comes first. Returns the number of blocks merged into
    /// `block`.
    ///
    /// This bounded form backs the reallocation paths that only need to
    /// grow a block far enough to satisfy a request, not to exhaustively
    /// flatten the whole free list.
    pub fn coalesce_forward(&mut self, block: BlockHandle, header_size: usize, target_size: usize) -> usize {
        let mut merged = 0;
        while block.size() < target_size {
            let Some(next) = block.next() else { break };
            if next.status() != Status::Free {
                break;
            }
            if block.end(header_size) != next.as_ptr().cast::<u8>() {
                break;
            }
            block.set_size(block.size() + header_size + next.size());
            block.set_next(next.next());
            merged += 1;
        }
        merged
    }
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new()
    }
}

/// An iterator over a [`BlockList`] in link order.
pub struct Iter {
    next: Option<BlockHandle>,
}

impl Iterator for Iter {
    type Item = BlockHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.next();
        Some(current)
    }
}
