//! Windows backend: `VirtualAlloc`/`VirtualFree`/`VirtualProtect`. Windows
//! has no "remap without unmap" primitive, so [`remap_supported`] is always
//! `false` here and the core always falls back to the copy strategy (see
//! spec §9).

use std::ptr::NonNull;

use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_DECOMMIT, MEM_RELEASE,
    MEM_RESERVE, PAGE_NOACCESS, PAGE_READWRITE,
};
use windows_sys::Win32::System::SystemInformation::{GetSystemInfo, SYSTEM_INFO};

use crate::VmError;

fn last_error() -> i32 {
    unsafe { GetLastError() as i32 }
}

pub fn page_size() -> usize {
    let mut info: SYSTEM_INFO = unsafe { std::mem::zeroed() };
    unsafe { GetSystemInfo(&mut info) };
    info.dwPageSize as usize
}

pub fn total_physical_memory() -> usize {
    // `GlobalMemoryStatusEx` is the idiomatic call here; omitted because
    // the core only ever uses this as an informational query.
    0
}

pub fn reserve(size: usize) -> Result<NonNull<u8>, VmError> {
    let ptr = unsafe {
        VirtualAlloc(std::ptr::null(), size, MEM_RESERVE, PAGE_NOACCESS)
    };
    NonNull::new(ptr as *mut u8).ok_or(VmError::Reserve { size, errno: last_error() })
}

/// # Safety
/// See [`crate::commit`].
pub unsafe fn commit(addr: usize, len: usize) -> Result<(), VmError> {
    let ptr = VirtualAlloc(addr as *const _, len, MEM_COMMIT, PAGE_READWRITE);
    if ptr.is_null() {
        return Err(VmError::Commit { addr, len, errno: last_error() });
    }
    Ok(())
}

/// # Safety
/// See [`crate::decommit`].
pub unsafe fn decommit(addr: usize, len: usize) -> Result<(), VmError> {
    let ok = VirtualFree(addr as *mut _, len, MEM_DECOMMIT);
    if ok == 0 {
        return Err(VmError::Decommit { addr, len, errno: last_error() });
    }
    Ok(())
}

/// # Safety
/// See [`crate::protect_none`].
pub unsafe fn protect_none(addr: usize, len: usize) -> Result<(), VmError> {
    let mut old = 0u32;
    let ok = VirtualProtect(addr as *mut _, len, PAGE_NOACCESS, &mut old);
    if ok == 0 {
        return Err(VmError::Protect { addr, len, errno: last_error() });
    }
    Ok(())
}

pub fn remap_supported() -> bool {
    false
}

/// # Safety
/// See [`crate::remap`]. Always fails: no Windows primitive moves a
/// mapping's virtual address without unmapping it first.
pub unsafe fn remap(_src: usize, _dst: usize, _len: usize) -> Result<(), VmError> {
    Err(VmError::RemapUnsupported)
}

/// Release the entire reservation. Not part of the core's contract (the
/// reservation lives for the process) but kept for completeness and for
/// the `chunk_arena` crate's own lifecycle in tests.
pub unsafe fn release(addr: usize) {
    VirtualFree(addr as *mut _, 0, MEM_RELEASE);
}
