//! Placement policy: deciding where a requested size comes from.
//!
//! This module answers exactly one question per call: which bytes does a
//! new allocation occupy. It never decides what counts as "large enough to
//! shrink" or walks the realloc decision tree; that lives in
//! [`crate::realloc`].

use crate::align::align;
use crate::block::{BlockHandle, Status};
use crate::config::Config;
use crate::list::BlockList;
use crate::os::{self, OsError};

/// Creates a standalone anonymous mapping sized to hold `payload_size`
/// bytes plus one header, and links it onto the end of `list`.
///
/// Mapped blocks are never split or coalesced; each owns exactly the
/// mapping backing it.
pub fn new_mapped_block(
    list: &mut BlockList,
    config: &Config,
    payload_size: usize,
) -> Result<BlockHandle, OsError> {
    let total = config.header_size() + payload_size;
    let mapped_len = align(total, os::page_size());
    let base = os::map_anon(mapped_len)?;
    let block = unsafe { BlockHandle::init(base, payload_size, Status::Mapped) };
    list.push_back(block);
    Ok(block)
}

/// Grows the program break by exactly `arena_size` bytes and links the
/// resulting span onto `list` as one free block. Called the first time the
/// brk arena is needed, which may be after mapped-only blocks already
/// exist, so the new block is spliced in before any of those rather than
/// appended at the absolute tail.
fn preallocate_arena(list: &mut BlockList, config: &Config, arena_size: usize) -> Result<(), OsError> {
    let base = os::bump_break(arena_size)?;
    let payload_size = arena_size - config.header_size();
    let block = unsafe { BlockHandle::init(base, payload_size, Status::Free) };
    list.insert_after_last_brk_backed(block);
    Ok(())
}

/// Appends brk-backed space sufficient for `payload_size` bytes to the end
/// of the managed heap, returning the block that now holds it.
///
/// Three cases, matching the three ways a brk-backed heap can grow:
/// - no brk-backed block exists yet (the list is empty, or holds only
///   mapped blocks): the initial arena is carved out via
///   [`preallocate_arena`] and then searched again;
/// - the last brk-backed block is free: the program break only needs to
///   move by the shortfall, and that free block is widened in place;
/// - the last brk-backed block is allocated: a brand new block is spliced
///   in right after it, ahead of any trailing mapped blocks.
fn extend_tail(list: &mut BlockList, config: &Config, payload_size: usize) -> Result<BlockHandle, OsError> {
    if list.last_brk_backed().is_none() {
        preallocate_arena(list, config, config.mmap_threshold)?;
        if let Some(fit) = list.find_best_fit(payload_size) {
            unsafe { list.split(fit, payload_size, config.header_size(), config.alignment) };
            fit.set_status(Status::Alloc);
            return Ok(fit);
        }
    }

    match list.last_brk_backed() {
        Some(last) if last.status() == Status::Free => {
            let shortfall = payload_size - last.size();
            os::bump_break(shortfall)?;
            last.set_size(payload_size);
            last.set_status(Status::Alloc);
            Ok(last)
        }
        _ => {
            let base = os::bump_break(config.header_size() + payload_size)?;
            let block = unsafe { BlockHandle::init(base, payload_size, Status::Alloc) };
            list.insert_after_last_brk_backed(block);
            Ok(block)
        }
    }
}

/// Places a `malloc`-style allocation of `requested` bytes: best-fit
/// search always runs first, regardless of size; only once no free block
/// qualifies does the size decide where the new space comes from — an
/// anonymous mapping at or above `config.mmap_threshold`, otherwise the
/// brk arena.
pub fn allocate(list: &mut BlockList, config: &Config, requested: usize) -> Result<BlockHandle, OsError> {
    let size = align(requested, config.alignment);

    if let Some(block) = list.find_best_fit(size) {
        unsafe { list.split(block, size, config.header_size(), config.alignment) };
        block.set_status(Status::Alloc);
        return Ok(block);
    }

    if size >= config.mmap_threshold {
        return new_mapped_block(list, config, size);
    }

    extend_tail(list, config, size)
}

/// Places a `calloc`-style allocation of `count * elem_size` bytes. Same
/// best-fit-first order as [`allocate`], but routes against the system
/// page size rather than `config.mmap_threshold` once no free block
/// qualifies, since a zeroed mapping is already zero on creation and
/// doesn't need a memset.
pub fn zero_allocate(
    list: &mut BlockList,
    config: &Config,
    count: usize,
    elem_size: usize,
) -> Result<BlockHandle, OsError> {
    let requested = count * elem_size;
    let size = align(requested, config.alignment);

    if let Some(block) = list.find_best_fit(size) {
        unsafe { list.split(block, size, config.header_size(), config.alignment) };
        block.set_status(Status::Alloc);
        return Ok(block);
    }

    if size >= os::page_size() {
        return new_mapped_block(list, config, size);
    }

    extend_tail(list, config, size)
}

/// Reverses [`allocate`]/[`zero_allocate`]/[`new_mapped_block`]: releases a
/// mapped block back to the kernel, or marks a brk-backed block free and
/// coalesces it with any free neighbors.
pub fn release(list: &mut BlockList, config: &Config, block: BlockHandle) -> Result<(), OsError> {
    if block.status() == Status::Mapped {
        let mapped_len = align(config.header_size() + block.size(), os::page_size());
        list.unlink(block);
        os::unmap(block.as_ptr().cast::<u8>(), mapped_len)?;
        return Ok(());
    }

    block.set_status(Status::Free);
    list.coalesce_all(config.header_size());
    Ok(())
}
