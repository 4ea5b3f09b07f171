//! Memory fences and the 32-bit compare-and-swap primitive the reservation
//! protocol is built on.
//!
//! The original C implementation hand-writes an `x86` `lock cmpxchgl` and
//! treats its write-fence macro as an empty compiler barrier. That is not a
//! real store fence, and the correctness argument for publish-then-read
//! depends on one, so here we delegate to the target's real
//! sequentially-consistent atomics instead of reproducing that bug.

use std::sync::atomic::{fence, AtomicU32, Ordering};

/// A full bidirectional memory barrier.
#[inline]
pub fn full_fence() {
    fence(Ordering::SeqCst);
}

/// A store (release) fence: earlier writes are visible to any thread that
/// later observes the release-ordered publish this fence precedes.
#[inline]
pub fn store_fence() {
    fence(Ordering::Release);
}

/// A load (acquire) fence: later reads cannot be reordered before whatever
/// acquire-ordered load this fence follows.
#[inline]
pub fn load_fence() {
    fence(Ordering::Acquire);
}

/// Attempts to atomically replace `*dst` with `new` iff `*dst == expected`.
///
/// Uses `SeqCst` on both success and failure, matching the full barrier the
/// original's `lock cmpxchgl` gives for free; the reservation/publication
/// protocol in [`crate::ring`] is specified against that ordering.
#[inline]
pub fn compare_and_swap_u32(dst: &AtomicU32, expected: u32, new: u32) -> bool {
    dst.compare_exchange_weak(expected, new, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}
