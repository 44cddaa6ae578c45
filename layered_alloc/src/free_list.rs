//! The two free-list encodings.
//!
//! *Unpacked* (block size < page): a block's first word is its successor
//! pointer; classic intrusive LIFO stack, no physical-memory effect.
//!
//! *Packed* (block size >= page): free blocks are recorded as pointers
//! inside page-sized nodes that live in place in one of the freed blocks.
//! Pushing a freed block usually just appends its address to the current
//! head node and decommits the block; only when the head node is absent
//! or full does a freed block get promoted to hold the node itself.

use crate::error::AllocError;
use crate::layer::LayerState;

const WORD: usize = std::mem::size_of::<usize>();

unsafe fn read_word(addr: usize, index: usize) -> usize {
    std::ptr::read((addr + index * WORD) as *const usize)
}

unsafe fn write_word(addr: usize, index: usize, value: usize) {
    std::ptr::write((addr + index * WORD) as *mut usize, value);
}

/// Maximum number of freed-block pointers a packed node can hold,
/// excluding its own two header words.
pub(crate) fn packed_node_capacity(page_size: usize) -> usize {
    page_size / WORD - 2
}

pub(crate) fn unpacked_push(layer: &mut LayerState, addr: usize) {
    unsafe { write_word(addr, 0, layer.free_head) };
    layer.free_head = addr;
}

pub(crate) fn unpacked_pop(layer: &mut LayerState) -> Option<usize> {
    if layer.free_head == 0 {
        return None;
    }
    let addr = layer.free_head;
    layer.free_head = unsafe { read_word(addr, 0) };
    Some(addr)
}

/// Push `addr` onto the packed free list. If the current head node is
/// absent or full, `addr` is promoted to be the new head node (its first
/// page is committed read/write and the remainder of its block is
/// decommitted); otherwise `addr`'s entire block is decommitted. Either
/// way, `addr` is then recorded in the head node's pointer array.
pub(crate) fn packed_push(
    layer: &mut LayerState,
    page_size: usize,
    addr: usize,
) -> Result<(), AllocError> {
    let max_k = packed_node_capacity(page_size);
    let head_full = layer.free_head != 0 && unsafe { read_word(layer.free_head, 1) } >= max_k;

    if layer.free_head == 0 || head_full {
        unsafe {
            vmem::commit(addr, page_size)?;
            write_word(addr, 0, layer.free_head);
            write_word(addr, 1, 0);
            if layer.block_size > page_size {
                vmem::decommit(addr + page_size, layer.block_size - page_size)?;
            }
        }
        layer.free_head = addr;
        log::trace!(
            "layer[block_size={}]: promoted {addr:#x} to free-list head node",
            layer.block_size
        );
    } else {
        unsafe { vmem::decommit(addr, layer.block_size)? };
    }

    unsafe {
        let k = read_word(layer.free_head, 1);
        write_word(layer.free_head, 2 + k, addr);
        write_word(layer.free_head, 1, k + 1);
    }
    Ok(())
}

/// Pop the most recently pushed block from the packed free list. If the
/// head node empties as a result, its page is decommitted and the
/// successor node (if any) becomes the new head.
pub(crate) fn packed_pop(
    layer: &mut LayerState,
    page_size: usize,
) -> Result<Option<usize>, AllocError> {
    if layer.free_head == 0 {
        return Ok(None);
    }

    let k = unsafe { read_word(layer.free_head, 1) };
    debug_assert!(k > 0, "a packed node with k == 0 must already have been retired");

    let spot = unsafe { read_word(layer.free_head, 2 + k - 1) };
    let new_k = k - 1;
    unsafe { write_word(layer.free_head, 1, new_k) };

    if new_k == 0 {
        let old_head = layer.free_head;
        layer.free_head = unsafe { read_word(old_head, 0) };
        unsafe { vmem::decommit(old_head, page_size)? };
        log::trace!("layer[block_size={}]: retired free-list node {old_head:#x}", layer.block_size);
    }

    Ok(Some(spot))
}
