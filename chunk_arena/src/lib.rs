//! A trivial fixed-size slab arena built directly on [`vmem`].
//!
//! This is explicitly *not* part of the layered allocator's core (see
//! spec §1, "Out of scope"). It exists as a small, self-contained
//! consumer of the `vmem` contract: one bump pointer, one free list, one
//! block size. `layered_alloc` does not depend on this crate and does not
//! call into it.

use std::ptr::NonNull;
use std::sync::Mutex;

#[repr(C)]
struct FreeNode {
    next: Option<NonNull<FreeNode>>,
}

struct Inner {
    base: usize,
    chunk_size: usize,
    capacity: usize,
    bump_index: usize,
    free_head: Option<NonNull<FreeNode>>,
    page_size: usize,
}

unsafe impl Send for Inner {}

/// A fixed-size slab of `capacity` chunks of `chunk_size` bytes each,
/// backed by one `vmem` reservation.
pub struct ChunkArena {
    inner: Mutex<Inner>,
}

unsafe impl Sync for ChunkArena {}

impl ChunkArena {
    /// Reserve `capacity * chunk_size` bytes of address space, committing
    /// nothing yet. `chunk_size` is rounded up to the page size.
    pub fn new(chunk_size: usize, capacity: usize) -> Result<Self, vmem::VmError> {
        let page_size = vmem::page_size();
        let chunk_size = chunk_size.next_multiple_of(page_size).max(page_size);
        let region = vmem::reserve(chunk_size * capacity)?;
        Ok(Self {
            inner: Mutex::new(Inner {
                base: region.as_ptr() as usize,
                chunk_size,
                capacity,
                bump_index: 0,
                free_head: None,
                page_size,
            }),
        })
    }

    /// Hand out one chunk, committing its backing pages. `None` once the
    /// arena is exhausted and nothing has been freed back into it.
    pub fn alloc(&self) -> Option<NonNull<u8>> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(head) = inner.free_head {
            inner.free_head = unsafe { (*head.as_ptr()).next };
            return Some(head.cast());
        }

        if inner.bump_index >= inner.capacity {
            return None;
        }
        let addr = inner.base + inner.bump_index * inner.chunk_size;
        inner.bump_index += 1;
        let chunk_size = inner.chunk_size;
        drop(inner);

        unsafe { vmem::commit(addr, chunk_size).ok()? };
        NonNull::new(addr as *mut u8)
    }

    /// Return a chunk previously obtained from [`alloc`] on this same
    /// arena. Decommits its backing pages immediately: chunk-arena memory
    /// never holds dirty data across a free/alloc cycle.
    ///
    /// # Safety
    /// `ptr` must have come from this arena's `alloc` and must not have
    /// already been freed.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        let mut inner = self.inner.lock().unwrap();
        let addr = ptr.as_ptr() as usize;
        let chunk_size = inner.chunk_size;
        let _ = vmem::decommit(addr, chunk_size);
        // Re-commit just the first word so the free-list link survives;
        // the rest of the chunk stays decommitted until reused.
        let _ = vmem::commit(addr, inner.page_size);

        let node = ptr.cast::<FreeNode>();
        (*node.as_ptr()).next = inner.free_head;
        inner.free_head = Some(node);
    }

    pub fn chunk_size(&self) -> usize {
        self.inner.lock().unwrap().chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_free_reuse_is_lifo() {
        let arena = ChunkArena::new(64, 8).unwrap();
        let a = arena.alloc().unwrap();
        let b = arena.alloc().unwrap();
        unsafe {
            arena.free(a);
            arena.free(b);
        }
        let c = arena.alloc().unwrap();
        assert_eq!(c, b);
        let d = arena.alloc().unwrap();
        assert_eq!(d, a);
    }

    #[test]
    fn exhausts_after_capacity() {
        let arena = ChunkArena::new(4096, 4).unwrap();
        for _ in 0..4 {
            assert!(arena.alloc().is_some());
        }
        assert!(arena.alloc().is_none());
    }

    #[test]
    fn freed_chunk_is_writable_again() {
        let arena = ChunkArena::new(4096, 2).unwrap();
        let p = arena.alloc().unwrap();
        unsafe {
            std::ptr::write_bytes(p.as_ptr(), 0x11, arena.chunk_size());
            arena.free(p);
        }
        let q = arena.alloc().unwrap();
        assert_eq!(p, q);
        unsafe {
            // Decommit wiped the page; a fresh mapping reads as zero.
            assert_eq!(*q.as_ptr(), 0);
        }
    }
}
