//! A thin wrapper over the OS virtual-memory primitives that
//! `layered_alloc`'s core is built on: reserve a contiguous range with no
//! backing, commit/decommit sub-ranges, remap a committed sub-range to a
//! new address without unmapping the source, and query page size / total
//! physical memory.
//!
//! This crate is deliberately dumb. It does no bookkeeping of its own —
//! every range it's asked to touch must already be known-good to the
//! caller. All the interesting state lives in `layered_alloc`.

mod error;

#[cfg(unix)]
#[path = "unix.rs"]
mod imp;

#[cfg(windows)]
#[path = "windows.rs"]
mod imp;

pub use error::VmError;

use std::ptr::NonNull;

/// Reserve `size` bytes of contiguous virtual address space with no
/// backing and no access. The returned pointer is valid for `size` bytes
/// of address space (not of memory) until the process exits.
pub fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    let ptr = imp::reserve(size)?;
    log::debug!("vmem: reserved {size:#x} bytes at {:#x}", ptr.as_ptr() as usize);
    Ok(ptr)
}

/// Commit `[addr, addr + len)` with read/write access. Idempotent: committing
/// an already-committed range is not an error.
///
/// # Safety
/// `[addr, addr + len)` must lie entirely within a range previously
/// returned by [`reserve`], page-aligned.
pub unsafe fn commit(addr: usize, len: usize) -> Result<(), VmError> {
    imp::commit(addr, len)
}

/// Decommit `[addr, addr + len)`: release its physical backing and reset
/// its protection to none, while keeping the address range reserved.
///
/// # Safety
/// `[addr, addr + len)` must lie entirely within a range previously
/// returned by [`reserve`], page-aligned, and must not be concurrently
/// accessed.
pub unsafe fn decommit(addr: usize, len: usize) -> Result<(), VmError> {
    let r = imp::decommit(addr, len);
    if r.is_ok() {
        log::trace!("vmem: decommitted {len:#x} bytes at {addr:#x}");
    }
    r
}

/// Set `[addr, addr + len)` to no access without releasing its backing.
///
/// # Safety
/// Same obligations as [`decommit`].
pub unsafe fn protect_none(addr: usize, len: usize) -> Result<(), VmError> {
    imp::protect_none(addr, len)
}

/// Whether this platform provides a "remap without unmap" primitive. When
/// `false`, [`remap`] always returns [`VmError::RemapUnsupported`] and
/// callers must fall back to the copy strategy for every size (spec §9).
pub fn remap_supported() -> bool {
    imp::remap_supported()
}

/// Move the mapping of `[src, src + len)` to `[dst, dst + len)` without
/// unmapping the source range. On return, `dst` holds what was at `src`;
/// `src` remains a valid, still-mapped address (its page table entries
/// are cleared rather than torn down), so it can be re-protected and
/// reused, but its prior contents are gone — a fresh access finds
/// zeroed anonymous pages, not the bytes that moved to `dst`.
///
/// # Safety
/// `[src, src + len)` must be currently committed; `[dst, dst + len)` must
/// lie within the reservation and must not overlap any live mapping.
pub unsafe fn remap(src: usize, dst: usize, len: usize) -> Result<(), VmError> {
    imp::remap(src, dst, len)
}

/// The OS page size, in bytes. Cheap to call repeatedly but callers that
/// need it on a hot path should cache it (as `layered_alloc` does in its
/// `AllocatorState`).
pub fn page_size() -> usize {
    imp::page_size()
}

/// Total installed physical memory, in bytes. Best-effort: `0` if the
/// platform query fails or isn't implemented. Not relied on for
/// correctness anywhere in `layered_alloc`; informational only.
pub fn total_physical_memory() -> usize {
    imp::total_physical_memory()
}
