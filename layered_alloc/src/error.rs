use thiserror::Error;

/// Internal/diagnostic error type. Never crosses the public three-operation
/// API: callers there only ever see `Option<NonNull<u8>>` or `()`. This
/// exists so the cold paths (init, free-list node churn, the
/// remap-vs-copy choice) can log *why* an operation returned null instead
/// of silently swallowing the reason.
#[derive(Debug, Error)]
pub enum AllocError {
    #[error("reservation failed during lazy init: {0}")]
    Init(#[source] vmem::VmError),
    #[error("virtual-memory operation failed: {0}")]
    Vm(#[from] vmem::VmError),
}
