//! POSIX backend: anonymous `mmap` reservations, `mprotect` for commit, and
//! a fresh `MAP_FIXED` anonymous mapping for decommit (this both drops the
//! physical pages and resets protection to none in a single syscall).

use std::ffi::c_void;
use std::io;
use std::ptr::NonNull;

use crate::VmError;

fn errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}

pub fn page_size() -> usize {
    // SAFETY: sysconf with a well-known name is always safe to call.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if n <= 0 { 4096 } else { n as usize }
}

pub fn total_physical_memory() -> usize {
    // SAFETY: sysconf with well-known names is always safe to call.
    unsafe {
        let pages = libc::sysconf(libc::_SC_PHYS_PAGES);
        let page_size = libc::sysconf(libc::_SC_PAGESIZE);
        if pages <= 0 || page_size <= 0 {
            0
        } else {
            pages as usize * page_size as usize
        }
    }
}

pub fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    // SAFETY: a fixed-address-free anonymous mapping never touches any
    // live memory; failure is reported via the null-pointer return.
    let ptr = unsafe {
        libc::mmap(
            std::ptr::null_mut(),
            size,
            libc::PROT_NONE,
            libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
            -1,
            0,
        )
    };
    if ptr == libc::MAP_FAILED {
        return Err(VmError::Reserve { size, errno: errno() });
    }
    // `mmap` with a null hint never returns null on success.
    Ok(NonNull::new(ptr as *mut u8).expect("mmap returned a null non-failure pointer"))
}

/// # Safety
/// `addr..addr+len` must lie within a region returned by [`reserve`] and
/// must not overlap a range concurrently accessed by another thread
/// without the caller's own synchronization.
pub unsafe fn commit(addr: usize, len: usize) -> Result<(), VmError> {
    let rc = libc::mprotect(addr as *mut c_void, len, libc::PROT_READ | libc::PROT_WRITE);
    if rc != 0 {
        return Err(VmError::Commit { addr, len, errno: errno() });
    }
    Ok(())
}

/// # Safety
/// Same obligations as [`commit`]. The pages are unmapped and replaced by
/// a fresh `PROT_NONE` anonymous mapping, so any dereference of this range
/// after `decommit` returns is undefined until a subsequent `commit`.
pub unsafe fn decommit(addr: usize, len: usize) -> Result<(), VmError> {
    let ptr = libc::mmap(
        addr as *mut c_void,
        len,
        libc::PROT_NONE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_FIXED | libc::MAP_NORESERVE,
        -1,
        0,
    );
    if ptr == libc::MAP_FAILED {
        return Err(VmError::Decommit { addr, len, errno: errno() });
    }
    Ok(())
}

/// # Safety
/// Same obligations as [`commit`].
pub unsafe fn protect_none(addr: usize, len: usize) -> Result<(), VmError> {
    let rc = libc::mprotect(addr as *mut c_void, len, libc::PROT_NONE);
    if rc != 0 {
        return Err(VmError::Protect { addr, len, errno: errno() });
    }
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn remap_supported() -> bool {
    true
}

#[cfg(not(target_os = "linux"))]
pub fn remap_supported() -> bool {
    false
}

/// # Safety
/// `src..src+len` must be a currently-committed range; `dst..dst+len` must
/// lie within the reservation and not overlap any live block.
///
/// Plain `MREMAP_MAYMOVE | MREMAP_FIXED` fully unmaps the source VMA on a
/// successful move, leaving no mapping at `src` at all — a later
/// `mprotect` on it fails with `ENOMEM`. `MREMAP_DONTUNMAP` keeps the
/// source VMA alive (its page table entries are cleared instead of torn
/// down) so it can still be re-protected and reused, which is what the
/// "without unmapping the source" contract above requires.
#[cfg(target_os = "linux")]
pub unsafe fn remap(src: usize, dst: usize, len: usize) -> Result<(), VmError> {
    let ptr = libc::mremap(
        src as *mut c_void,
        len,
        len,
        libc::MREMAP_MAYMOVE | libc::MREMAP_FIXED | libc::MREMAP_DONTUNMAP,
        dst as *mut c_void,
    );
    if ptr == libc::MAP_FAILED {
        return Err(VmError::Remap { src, dst, len, errno: errno() });
    }
    debug_assert_eq!(ptr as usize, dst);
    Ok(())
}

#[cfg(not(target_os = "linux"))]
pub unsafe fn remap(_src: usize, _dst: usize, _len: usize) -> Result<(), VmError> {
    Err(VmError::RemapUnsupported)
}
