use thiserror::Error;

/// Failure modes surfaced by the virtual-memory wrapper.
///
/// Every variant maps onto a single OS primitive from spec §6; callers in
/// `layered_alloc` translate all of these into the public "return null"
/// contract and only consult the variant for logging.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("failed to reserve {size} bytes of address space: {errno}")]
    Reserve { size: usize, errno: i32 },

    #[error("failed to commit [{addr:#x}, {addr:#x} + {len:#x}): {errno}")]
    Commit { addr: usize, len: usize, errno: i32 },

    #[error("failed to decommit [{addr:#x}, {addr:#x} + {len:#x}): {errno}")]
    Decommit { addr: usize, len: usize, errno: i32 },

    #[error("failed to change protection of [{addr:#x}, {addr:#x} + {len:#x}): {errno}")]
    Protect { addr: usize, len: usize, errno: i32 },

    #[error("failed to remap [{src:#x}, {src:#x} + {len:#x}) to {dst:#x}: {errno}")]
    Remap { src: usize, dst: usize, len: usize, errno: i32 },

    #[error("remap-without-unmap is not supported on this platform")]
    RemapUnsupported,
}
