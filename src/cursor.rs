//! A single side (producer or consumer) of a ring: its `head`/`tail` pair
//! and the reservation/publication primitives built on them.
//!
//! `head` tracks reservations issued on this side; `tail` tracks
//! reservations that have been fully published. The distance between a
//! side's own `head` and `tail` is always the number of in-flight
//! reservations on that side that have not yet been published: usually
//! zero or one outstanding reservation per thread, but more if producers
//! are still mid-commit when a CAS races ahead of them.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::fence::compare_and_swap_u32;
use crate::invariants::debug_assert_tail_not_past_head;

/// One side (producer or consumer) of a ring.
///
/// Exactly one `CursorBlock` instance of the pair is touched by any given
/// enqueue/dequeue call: producers only ever read/write `prod`, consumers
/// only ever read/write `cons`. The two blocks are cache-padded apart by
/// the caller ([`crate::ring::Ring`]) to avoid false sharing.
pub(crate) struct CursorBlock {
    pub head: AtomicU32,
    pub tail: AtomicU32,
    /// `true` selects exclusive mode (no CAS, no publish wait); `false`
    /// selects shared mode. Set once at construction, read without
    /// synchronization thereafter (spec: flags are immutable after init).
    pub single: bool,
}

impl CursorBlock {
    pub const fn new(single: bool) -> Self {
        Self {
            head: AtomicU32::new(0),
            tail: AtomicU32::new(0),
            single,
        }
    }

    /// Snapshot both counters with `Relaxed` loads, for introspection only.
    #[inline]
    pub fn snapshot(&self) -> (u32, u32) {
        (self.head.load(Ordering::Relaxed), self.tail.load(Ordering::Relaxed))
    }

    /// Reserve a range of slots on this side, dispatching on the runtime
    /// `single` flag set at construction.
    ///
    /// `compute` is invoked with the current `head` value (possibly more
    /// than once, if a shared-mode CAS loses a race) and must return the
    /// number of slots to claim, capped by whatever capacity/occupancy
    /// bound the caller has already computed against the opposite side's
    /// tail. Returning `0` aborts the reservation without touching `head`.
    ///
    /// Returns `(old_head, n_reserved)`.
    #[inline]
    pub fn move_head(&self, compute: impl FnMut(u32) -> u32) -> (u32, u32) {
        if self.single {
            Self::move_head_single(&self.head, compute)
        } else {
            Self::move_head_multi(&self.head, compute)
        }
    }

    /// Exclusive-mode reservation: a plain load/store, no CAS. Callers that
    /// statically know they are the sole user of this side (the `_sp`/`_sc`
    /// entry points in [`crate::ring::Ring`]) can call this directly to
    /// skip the runtime `single` check entirely.
    #[inline]
    pub fn move_head_single(head: &AtomicU32, mut compute: impl FnMut(u32) -> u32) -> (u32, u32) {
        let old = head.load(Ordering::Relaxed);
        let n = compute(old);
        if n != 0 {
            head.store(old.wrapping_add(n), Ordering::Relaxed);
        }
        (old, n)
    }

    /// Shared-mode reservation: a CAS loop, retried until it wins or the
    /// computed reservation size drops to zero. Callers that statically
    /// know multiple threads may contend on this side (the `_mp`/`_mc`
    /// entry points) can call this directly.
    #[inline]
    pub fn move_head_multi(head: &AtomicU32, mut compute: impl FnMut(u32) -> u32) -> (u32, u32) {
        loop {
            let old = head.load(Ordering::Relaxed);
            let n = compute(old);
            if n == 0 {
                return (old, 0);
            }
            if compare_and_swap_u32(head, old, old.wrapping_add(n)) {
                return (old, n);
            }
            std::hint::spin_loop();
        }
    }

    /// Publish a reservation of `n` slots starting at `old_head`.
    ///
    /// In shared mode this spins until `tail == old_head`, i.e. until every
    /// reservation issued before this one on the same side has itself been
    /// published, then advances `tail` past this one. This is the central
    /// serialization point that makes publication order match reservation
    /// order regardless of which thread finishes copying its payload
    /// first. In exclusive mode there is at most one reservation in flight
    /// at a time, so the wait is skipped entirely.
    #[inline]
    pub fn publish(&self, old_head: u32, n: u32) {
        if self.single {
            self.tail.store(old_head.wrapping_add(n), Ordering::Release);
            return;
        }
        while self.tail.load(Ordering::Relaxed) != old_head {
            std::hint::spin_loop();
        }
        let new_tail = old_head.wrapping_add(n);
        debug_assert_tail_not_past_head!(new_tail, self.head.load(Ordering::Relaxed));
        self.tail.store(new_tail, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mode_reserve_is_plain_store() {
        let c = CursorBlock::new(true);
        let (old, n) = c.move_head(|_head| 3);
        assert_eq!((old, n), (0, 3));
        assert_eq!(c.head.load(Ordering::Relaxed), 3);
        c.publish(old, n);
        assert_eq!(c.tail.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn zero_reservation_leaves_head_untouched() {
        let c = CursorBlock::new(false);
        let (old, n) = c.move_head(|_head| 0);
        assert_eq!((old, n), (0, 0));
        assert_eq!(c.head.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn shared_mode_publish_waits_for_predecessor() {
        let c = CursorBlock::new(false);
        // Two reservations, second published before first.
        let (old1, n1) = c.move_head(|_h| 2);
        let (old2, n2) = c.move_head(|_h| 3);
        assert_eq!((old1, n1), (0, 2));
        assert_eq!((old2, n2), (2, 3));

        // Publishing the second first would spin forever if not for the
        // first publish below running first in this single-threaded test;
        // here we just verify ordering is enforced by publishing in issue
        // order and checking tail lands where expected.
        c.publish(old1, n1);
        assert_eq!(c.tail.load(Ordering::Relaxed), 2);
        c.publish(old2, n2);
        assert_eq!(c.tail.load(Ordering::Relaxed), 5);
    }
}

#[cfg(test)]
mod layout_tests {
    use super::*;
    use memoffset::offset_of;
    use std::mem::{align_of, size_of};

    // head/tail/single must pack contiguously with no surprise padding
    // inserted by the compiler ahead of `crossbeam_utils::CachePadded`'s own
    // alignment, which is what actually isolates a `Ring`'s prod/cons pair
    // onto distinct cache lines (see the const assertion in ring.rs).
    #[test]
    fn cursor_block_fields_pack_without_gaps() {
        assert_eq!(offset_of!(CursorBlock, head), 0);
        assert_eq!(offset_of!(CursorBlock, tail), size_of::<AtomicU32>());
        assert_eq!(
            offset_of!(CursorBlock, single),
            2 * size_of::<AtomicU32>()
        );
        assert_eq!(align_of::<CursorBlock>(), align_of::<AtomicU32>());
    }
}
