//! Construction-time error taxonomy.
//!
//! Runtime enqueue/dequeue never fail (a fixed transfer that cannot
//! complete returns 0, a burst returns the partial count). `RingError` only
//! covers the two classes of construction-time failure: bad sizing and
//! allocation failure.

use thiserror::Error;

/// Errors that can occur while sizing, validating, or allocating a ring.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RingError {
    /// `count` was zero, or exceeded [`crate::flags::RING_SZ_MASK`].
    #[error("ring size {requested} is invalid (must be in 1..={max})")]
    InvalidSize { requested: u32, max: u32 },

    /// `count` was not a power of two and `EXACT_SZ` was not set.
    #[error("ring size {requested} is not a power of two")]
    NotPowerOfTwo { requested: u32 },

    /// The embedder's allocator could not satisfy the request.
    #[error("failed to allocate {bytes} bytes for ring storage")]
    AllocationFailed { bytes: usize },
}

impl RingError {
    /// Maps a `RingError` onto the conventional `EINVAL`/`ENOMEM` negative
    /// integer taxonomy used at the C ABI boundary.
    #[must_use]
    pub const fn as_errno(&self) -> i32 {
        match self {
            RingError::InvalidSize { .. } | RingError::NotPowerOfTwo { .. } => -libc_errno::EINVAL,
            RingError::AllocationFailed { .. } => -libc_errno::ENOMEM,
        }
    }
}

/// Minimal errno constants, kept local so the crate does not need to pull in
/// `libc` purely for two integer literals.
mod libc_errno {
    pub const EINVAL: i32 = 22;
    pub const ENOMEM: i32 = 12;
}
