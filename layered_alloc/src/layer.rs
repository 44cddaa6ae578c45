//! A single layer: one size class's bump pointer plus free list.

use crate::error::AllocError;
use crate::free_list;

/// Per-layer state. One instance per size class, living in the
/// allocator's layer table for the life of the process.
pub(crate) struct LayerState {
    /// Virtual address of this layer's first block.
    pub(crate) layer_base: usize,
    /// This layer's size class: `2^(i + s_min)`.
    pub(crate) block_size: usize,
    /// `m / block_size`: number of blocks this layer can ever hand out.
    pub(crate) capacity: usize,
    /// Index of the next never-used block.
    pub(crate) bump_index: usize,
    /// Number of currently-live blocks in this layer.
    pub(crate) in_use_count: usize,
    /// Address of the topmost free-list node (packed) or free block
    /// (unpacked), or `0` if the free list is empty.
    pub(crate) free_head: usize,
    /// Whether this layer uses the packed (>= page size) encoding.
    pub(crate) packed: bool,
}

/// Obtain a block from this layer: free-list pop if available, otherwise
/// bump. Returns `Ok(None)` on layer exhaustion — not undefined behavior,
/// just allocation failure.
pub(crate) fn get_block(layer: &mut LayerState, page_size: usize) -> Result<Option<usize>, AllocError> {
    let popped: Option<usize> = if layer.packed {
        free_list::packed_pop(layer, page_size)?
    } else {
        free_list::unpacked_pop(layer)
    };

    let addr = match popped {
        Some(addr) => addr,
        None => {
            if layer.bump_index >= layer.capacity {
                return Ok(None);
            }
            let addr = layer.layer_base + layer.bump_index * layer.block_size;
            layer.bump_index += 1;
            addr
        }
    };

    layer.in_use_count += 1;
    Ok(Some(addr))
}

/// Return `addr` to this layer's free list. `in_use_count` tracks live
/// blocks: decremented here on every free, regardless of which encoding
/// is in play.
pub(crate) fn free_block(layer: &mut LayerState, page_size: usize, addr: usize) -> Result<(), AllocError> {
    if layer.packed {
        free_list::packed_push(layer, page_size, addr)?;
    } else {
        free_list::unpacked_push(layer, addr);
    }
    layer.in_use_count -= 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unpacked_layer(block_size: usize, capacity: usize) -> LayerState {
        let region = vmem::reserve(block_size * capacity).unwrap();
        LayerState {
            layer_base: region.as_ptr() as usize,
            block_size,
            capacity,
            bump_index: 0,
            in_use_count: 0,
            free_head: 0,
            packed: false,
        }
    }

    #[test]
    fn bump_then_free_list_reuse_is_lifo() {
        let mut layer = unpacked_layer(64, 16);
        let page_size = vmem::page_size();

        let a = get_block(&mut layer, page_size).unwrap().unwrap();
        let b = get_block(&mut layer, page_size).unwrap().unwrap();
        assert_ne!(a, b);
        assert_eq!(layer.in_use_count, 2);

        free_block(&mut layer, page_size, a).unwrap();
        let c = get_block(&mut layer, page_size).unwrap().unwrap();
        assert_eq!(c, a);
        assert_eq!(layer.in_use_count, 2);
    }

    #[test]
    fn exhaustion_reports_none_without_corrupting_state() {
        let mut layer = unpacked_layer(4096, 2);
        let page_size = vmem::page_size();
        let a = get_block(&mut layer, page_size).unwrap().unwrap();
        let b = get_block(&mut layer, page_size).unwrap().unwrap();
        assert!(get_block(&mut layer, page_size).unwrap().is_none());
        assert_eq!(layer.in_use_count, 2);

        free_block(&mut layer, page_size, a).unwrap();
        let c = get_block(&mut layer, page_size).unwrap().unwrap();
        assert_eq!(c, a);
        assert_ne!(c, b);
    }
}
