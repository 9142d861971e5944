//! The reallocation decision tree.
//!
//! `realloc` has more legal moves than `malloc` or `free`: a request can be
//! satisfied in place, by growing into a contiguous free neighbor, by
//! extending the program break, or by relocating to a fresh block. The
//! branches below are tried in the order a careful shrink-first allocator
//! tries them, each labeled with the case it handles.

use crate::align::align;
use crate::block::{BlockHandle, Status};
use crate::config::Config;
use crate::list::BlockList;
use crate::os::{self, OsError};
use crate::policy;

/// Resizes `block`, previously returned by [`policy::allocate`] or
/// [`policy::zero_allocate`], to hold `requested` bytes.
///
/// The caller is responsible for the edge cases that don't involve an
/// existing block at all: a null pointer (equivalent to `malloc`) and a
/// zero size (equivalent to `free`) are handled one level up, in
/// [`crate::allocator`]. Returns `Ok(None)` for the one case that *does*
/// involve a block but still has no sensible answer: reallocating a block
/// that's already free.
pub fn reallocate(
    list: &mut BlockList,
    config: &Config,
    block: BlockHandle,
    requested: usize,
) -> Result<Option<BlockHandle>, OsError> {
    let header_size = config.header_size();
    let target = align(requested, config.alignment);

    // (A) reallocating an already-freed block is undefined; hand back the
    // sentinel rather than resurrecting a dangling block.
    if block.status() == Status::Free {
        return Ok(None);
    }

    // (B) a mapped block always relocates; it's never split, grown, or
    // shrunk in place.
    if block.status() == Status::Mapped {
        return relocate(list, config, block, target).map(Some);
    }

    // (C) no real change in size: nothing to do.
    if target == block.size() {
        return Ok(Some(block));
    }

    // (D) shrinking: split off the tail as a new free block and let it
    // coalesce with whatever follows it.
    if target < block.size() {
        unsafe { list.split(block, target, header_size, config.alignment) };
        if let Some(next) = block.next() {
            if next.status() == Status::Free {
                list.coalesce_forward(next, header_size, usize::MAX);
            }
        }
        return Ok(Some(block));
    }

    // Growing. (E) try absorbing contiguous free neighbors first, without
    // touching anything beyond what's needed.
    list.coalesce_forward(block, header_size, target);
    if block.size() >= target {
        unsafe { list.split(block, target, header_size, config.alignment) };
        return Ok(Some(block));
    }

    // (F) if `block` is now the last brk-backed block, the shortfall can be
    // satisfied by moving the program break, which keeps the block's
    // address stable.
    if list.last_brk_backed().map(BlockHandle::as_ptr) == Some(block.as_ptr()) {
        let shortfall = target - block.size();
        os::bump_break(shortfall)?;
        block.set_size(target);
        return Ok(Some(block));
    }

    // (G) no in-place option remains: relocate to a best-fit block, a
    // freshly extended tail, or a new mapping — `policy::allocate` decides
    // which, trying best-fit before falling back to the size threshold.
    relocate(list, config, block, target).map(Some)
}

/// Finds or creates a block of `target` bytes elsewhere, copies the old
/// payload into it, and releases the old block.
fn relocate(
    list: &mut BlockList,
    config: &Config,
    old_block: BlockHandle,
    target: usize,
) -> Result<BlockHandle, OsError> {
    let header_size = config.header_size();
    let new_block = policy::allocate(list, config, target)?;

    let copy_size = old_block.size().min(new_block.size());
    unsafe {
        std::ptr::copy_nonoverlapping(
            old_block.payload(header_size),
            new_block.payload(header_size),
            copy_size,
        );
    }

    policy::release(list, config, old_block)?;
    Ok(new_block)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            alignment: 8,
            mmap_threshold: 4096,
        }
    }

    #[test]
    fn shrinking_keeps_the_same_address() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, 256).unwrap();
        let addr = block.as_ptr();
        let shrunk = reallocate(&mut list, &config, block, 32).unwrap().unwrap();
        assert_eq!(shrunk.as_ptr(), addr);
        assert!(shrunk.size() >= 32);
    }

    #[test]
    fn growing_into_a_coalesced_neighbor_keeps_the_same_address() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, 64).unwrap();
        let addr = block.as_ptr();
        // the remainder of the preallocated arena sits free right after
        // `block`; growing into it should not require a move.
        let grown = reallocate(&mut list, &config, block, 128).unwrap().unwrap();
        assert_eq!(grown.as_ptr(), addr);
        assert!(grown.size() >= 128);
    }

    #[test]
    fn no_op_resize_returns_the_same_block() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, 64).unwrap();
        let same = reallocate(&mut list, &config, block, 64).unwrap().unwrap();
        assert_eq!(same.as_ptr(), block.as_ptr());
    }

    #[test]
    fn reallocating_a_freed_block_returns_the_sentinel() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, 64).unwrap();
        policy::release(&mut list, &config, block).unwrap();
        assert!(reallocate(&mut list, &config, block, 128).unwrap().is_none());
    }

    #[test]
    fn growing_an_allocation_past_the_mmap_threshold_still_tries_in_place_first() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, 64).unwrap();
        let addr = block.as_ptr();
        // nothing else is allocated, so the rest of the preallocated arena
        // sits free right behind `block` and easily covers the threshold;
        // this must stay in place rather than jump straight to a mapping.
        let grown = reallocate(&mut list, &config, block, config.mmap_threshold)
            .unwrap()
            .unwrap();
        assert_eq!(grown.as_ptr(), addr);
        assert_eq!(grown.status(), Status::Alloc);
    }

    #[test]
    fn reallocating_a_mapped_block_always_relocates_and_releases_the_mapping() {
        let mut list = BlockList::new();
        let config = test_config();
        let block = policy::allocate(&mut list, &config, config.mmap_threshold).unwrap();
        assert_eq!(block.status(), Status::Mapped);
        unsafe {
            *block.payload(config.header_size()) = 0x42;
        }
        let old_addr = block.as_ptr();
        let moved = reallocate(&mut list, &config, block, 50).unwrap().unwrap();
        assert_ne!(moved.as_ptr(), old_addr);
        assert_eq!(moved.status(), Status::Alloc);
        let byte = unsafe { *moved.payload(config.header_size()) };
        assert_eq!(byte, 0x42);
    }

    #[test]
    fn oversized_growth_with_no_in_place_option_relocates_to_a_mapping() {
        let mut list = BlockList::new();
        let config = test_config();
        // two adjacent small allocations: growing the first past the
        // threshold can't absorb the second (it's still live), so this
        // must fall through to relocation.
        let block = policy::allocate(&mut list, &config, 64).unwrap();
        let _neighbor = policy::allocate(&mut list, &config, 64).unwrap();
        unsafe {
            *block.payload(config.header_size()) = 0x42;
        }
        let moved = reallocate(&mut list, &config, block, config.mmap_threshold)
            .unwrap()
            .unwrap();
        assert_eq!(moved.status(), Status::Mapped);
        assert!(moved.size() >= config.mmap_threshold);
        let byte = unsafe { *moved.payload(config.header_size()) };
        assert_eq!(byte, 0x42);
    }
}
