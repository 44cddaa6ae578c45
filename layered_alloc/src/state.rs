//! The allocator's process-wide state: the reservation and the layer
//! table.

use std::ptr::NonNull;

use crate::config::Config;
use crate::error::AllocError;
use crate::layer::{self, LayerState};
use crate::realloc;
use crate::size_class;
use crate::util::align_up;

pub(crate) struct AllocatorState {
    base: usize,
    page_size: usize,
    layers: Vec<LayerState>,
}

impl AllocatorState {
    /// Reserve `cfg.v` bytes and build the layer table. Called at most
    /// once per allocator instance.
    pub(crate) fn init(cfg: &Config) -> Result<Self, AllocError> {
        // The largest layer's blocks must be aligned to `m`, but
        // `mmap`/`VirtualAlloc` only promise page alignment. Reserve
        // `v + m` bytes and carve out an `m`-aligned `v`-byte window from
        // it; the unaligned prefix (< m bytes) is left unbacked for the
        // life of the process.
        let raw = vmem::reserve(cfg.v + cfg.m).map_err(AllocError::Init)?;
        let base = align_up(raw.as_ptr() as usize, cfg.m);
        let page_size = vmem::page_size();

        let layers = (0..cfg.l)
            .map(|i| {
                let block_size = cfg.block_size(i);
                LayerState {
                    layer_base: base + i * cfg.m,
                    block_size,
                    capacity: cfg.m / block_size,
                    bump_index: 0,
                    in_use_count: 0,
                    free_head: 0,
                    packed: block_size >= page_size,
                }
            })
            .collect();

        log::info!("layered_alloc: reserved {:#x} bytes at {base:#x} across {} layers", cfg.v, cfg.l);
        Ok(Self { base, page_size, layers })
    }

    fn layer_index_for_ptr(&self, cfg: &Config, p: usize) -> usize {
        size_class::layer_index_for_ptr(cfg, self.base, p)
    }

    pub(crate) fn allocate(&mut self, cfg: &Config, n: usize) -> Option<NonNull<u8>> {
        let idx = size_class::layer_index_for_size(cfg, n)?;
        self.allocate_in_layer(idx)
    }

    fn allocate_in_layer(&mut self, idx: usize) -> Option<NonNull<u8>> {
        let page_size = self.page_size;
        let layer = &mut self.layers[idx];
        let addr = match layer::get_block(layer, page_size) {
            Ok(Some(addr)) => addr,
            Ok(None) => return None,
            Err(e) => {
                log::error!("layered_alloc: get_block failed on layer {idx}: {e}");
                return None;
            }
        };
        let block_size = layer.block_size;

        // Always (re-)commit: bump-path blocks have never been committed,
        // and packed free-list pops may have just decommitted the page
        // that held a retired node — this call re-establishes it either
        // way. Committing an already-committed page is a no-op.
        if let Err(e) = unsafe { vmem::commit(addr, block_size) } {
            log::error!("layered_alloc: commit failed for {addr:#x} ({block_size} bytes): {e}");
            return None;
        }

        NonNull::new(addr as *mut u8)
    }

    pub(crate) fn free(&mut self, cfg: &Config, p: NonNull<u8>) {
        let idx = self.layer_index_for_ptr(cfg, p.as_ptr() as usize);
        self.free_in_layer(idx, p.as_ptr() as usize);
    }

    fn free_in_layer(&mut self, idx: usize, addr: usize) {
        let page_size = self.page_size;
        let layer = &mut self.layers[idx];
        if let Err(e) = layer::free_block(layer, page_size, addr) {
            log::error!("layered_alloc: free_block failed on layer {idx} for {addr:#x}: {e}");
        }
    }

    pub(crate) fn reallocate(
        &mut self,
        cfg: &Config,
        p: Option<NonNull<u8>>,
        n: usize,
    ) -> Option<NonNull<u8>> {
        let p = match p {
            Some(p) => p,
            None => return self.allocate(cfg, n),
        };

        let old_idx = self.layer_index_for_ptr(cfg, p.as_ptr() as usize);
        let new_idx = size_class::layer_index_for_size(cfg, n)?;

        if new_idx == old_idx {
            // Already the right size class; nothing to move.
            return Some(p);
        }

        let dest = self.allocate_in_layer(new_idx)?;
        let old_block_size = self.layers[old_idx].block_size;
        let new_block_size = self.layers[new_idx].block_size;

        let outcome = realloc::transfer(
            cfg,
            p.as_ptr() as usize,
            dest.as_ptr() as usize,
            old_block_size,
            new_block_size,
        );

        if let Err(e) = outcome {
            log::error!(
                "layered_alloc: reallocate transfer {:#x} -> {:#x} failed: {e}",
                p.as_ptr() as usize,
                dest.as_ptr() as usize
            );
            // The new block is consumed but unreachable; the old block is
            // left untouched and still valid for the caller to free.
            return None;
        }

        self.free_in_layer(old_idx, p.as_ptr() as usize);
        Some(dest)
    }

    pub(crate) fn total_in_use(&self) -> usize {
        self.layers.iter().map(|l| l.in_use_count).sum()
    }
}
