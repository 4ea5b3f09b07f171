//! Ring data layout, lifecycle, and the enqueue/dequeue protocol.
//!
//! A [`Ring<T>`] owns its slot storage and a cache-line-isolated pair of
//! [`CursorBlock`]s. Enqueue and dequeue are fully decoupled: each side
//! synchronizes only on the opposite side's `tail` for capacity accounting,
//! and on its own `head`/`tail` for intra-side ordering (see [`CursorBlock`]).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::Ordering;

use crossbeam_utils::CachePadded;

use crate::cursor::CursorBlock;
use crate::error::RingError;
use crate::fence::{load_fence, store_fence};
use crate::flags::{RingFlags, RING_SZ_MASK};
use crate::invariants::{debug_assert_bounded_occupancy, debug_assert_reservation_within_bound};
use crate::util::{align_up, is_power_of_two, next_power_of_two_32, CACHE_LINE_SIZE};

/// Overhead charged for the two cache-line-isolated cursor blocks plus the
/// scalar bookkeeping fields, for the purposes of [`Ring::memsize`]. A real
/// embedder laying this out as one contiguous allocation (e.g. to place it in
/// shared memory) would reserve this much ahead of the slot array.
const HEADER_SIZE: usize = 2 * CACHE_LINE_SIZE;

// Compile-time layout assertion (spec: producer and consumer cursor blocks
// must each begin on a cache-line boundary). `CachePadded` guarantees this on
// every platform it supports; this just keeps us honest if that ever changes.
const _: () = assert!(std::mem::align_of::<CachePadded<CursorBlock>>() >= CACHE_LINE_SIZE);
const _: () = assert!(HEADER_SIZE % CACHE_LINE_SIZE == 0);

/// A bounded, lock-free, multi-producer/multi-consumer FIFO ring of
/// fixed-size, bit-copyable payload slots.
///
/// `T` must be `Copy`: slots are read with [`MaybeUninit::assume_init`]
/// rather than moved out, and the ring never runs a destructor over its
/// storage. This matches the handle-sized, non-owning payloads the protocol
/// is designed around (pointers, indices, small PODs), not a general
/// MPMC channel for owned, heap-backed values.
pub struct Ring<T: Copy> {
    flags: RingFlags,
    size: u32,
    mask: u32,
    capacity: u32,
    prod: CachePadded<CursorBlock>,
    cons: CachePadded<CursorBlock>,
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
}

// Safety: a slot at index `i` is written exclusively by the producer that
// reserved it and read exclusively by the consumer that reserved it, with
// the write happening-before the read via the `prod.tail` release/acquire
// pair established by `CursorBlock::publish`. No two threads ever touch the
// same slot without that edge between them.
unsafe impl<T: Copy + Send> Send for Ring<T> {}
unsafe impl<T: Copy + Send> Sync for Ring<T> {}

impl<T: Copy> Ring<T> {
    /// Validates `count`/`flags` and computes `(size, mask, capacity)`
    /// without allocating. Shared by [`Ring::memsize`], [`Ring::try_new`],
    /// and [`Ring::init_in_place`] so none of the three can disagree about
    /// which inputs they accept.
    fn validated_dims(count: u32, flags: RingFlags) -> Result<(u32, u32, u32), RingError> {
        if count == 0 || count > RING_SZ_MASK {
            return Err(RingError::InvalidSize {
                requested: count,
                max: RING_SZ_MASK,
            });
        }
        if flags.contains(RingFlags::EXACT_SZ) {
            let size = next_power_of_two_32(count + 1);
            Ok((size, size - 1, count))
        } else {
            if count < 2 || !is_power_of_two(count) {
                return Err(RingError::NotPowerOfTwo { requested: count });
            }
            Ok((count, count - 1, count - 1))
        }
    }

    /// Returns the number of bytes a [`Ring::try_new`] with this
    /// `count`/`flags` would need, without allocating it.
    pub fn memsize(count: u32, flags: RingFlags) -> Result<usize, RingError> {
        let (size, _mask, _capacity) = Self::validated_dims(count, flags)?;
        let slot_bytes = (size as usize)
            .checked_mul(std::mem::size_of::<T>())
            .ok_or(RingError::InvalidSize {
                requested: count,
                max: RING_SZ_MASK,
            })?;
        Ok(align_up(HEADER_SIZE + slot_bytes, CACHE_LINE_SIZE))
    }

    /// Allocates and initializes a new ring.
    ///
    /// Without `EXACT_SZ`, `count` must be a power of two in
    /// `[2, RING_SZ_MASK]` and `capacity` is `count - 1`. With `EXACT_SZ`,
    /// `count` may be any value in `[1, RING_SZ_MASK]`; storage is rounded
    /// up to `next_power_of_two(count + 1)` and `capacity` is `count`
    /// exactly.
    pub fn try_new(count: u32, flags: RingFlags) -> Result<Self, RingError> {
        let (size, _mask, _capacity) = Self::validated_dims(count, flags)?;

        let slot_bytes = (size as usize) * std::mem::size_of::<T>();
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(size as usize)
            .map_err(|_| RingError::AllocationFailed { bytes: slot_bytes })?;
        slots.resize_with(size as usize, || UnsafeCell::new(MaybeUninit::uninit()));

        Self::init_in_place(slots.into_boxed_slice(), count, flags)
    }

    /// Initializes a ring over caller-supplied storage instead of allocating
    /// its own, for an embedder that already owns the backing memory (e.g. a
    /// shared mapping laid out with [`Ring::memsize`]).
    ///
    /// `storage.len()` must equal the `size` that `count`/`flags` validate
    /// to; anything else is rejected as `InvalidSize` rather than silently
    /// truncated or leaked. Every slot is zeroed before the ring is handed
    /// back, regardless of what the caller's storage previously held.
    pub fn init_in_place(
        storage: Box<[UnsafeCell<MaybeUninit<T>>]>,
        count: u32,
        flags: RingFlags,
    ) -> Result<Self, RingError> {
        let (size, mask, capacity) = Self::validated_dims(count, flags)?;
        if storage.len() != size as usize {
            return Err(RingError::InvalidSize {
                requested: count,
                max: RING_SZ_MASK,
            });
        }

        for slot in storage.iter() {
            unsafe { std::ptr::write_bytes(slot.get(), 0, 1) };
        }

        let single_producer = flags.contains(RingFlags::SP_ENQ);
        let single_consumer = flags.contains(RingFlags::SC_DEQ);

        log::debug!(
            "ring initialized: size={size} mask={mask} capacity={capacity} \
             single_producer={single_producer} single_consumer={single_consumer}"
        );

        Ok(Self {
            flags,
            size,
            mask,
            capacity,
            prod: CachePadded::new(CursorBlock::new(single_producer)),
            cons: CachePadded::new(CursorBlock::new(single_consumer)),
            slots: storage,
        })
    }

    /// Construction flags this ring was built with.
    #[must_use]
    pub fn flags(&self) -> RingFlags {
        self.flags
    }

    /// Size of the backing slot array. Always a power of two.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// `size - 1`, used internally to wrap slot indices.
    #[must_use]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Maximum number of entries this ring may hold simultaneously.
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Current occupancy. A snapshot: immediately stale under concurrency.
    #[must_use]
    pub fn count(&self) -> u32 {
        let prod_tail = self.prod.snapshot().1;
        let cons_tail = self.cons.snapshot().1;
        prod_tail.wrapping_sub(cons_tail).min(self.capacity)
    }

    /// `capacity - count()`. A snapshot: immediately stale under concurrency.
    #[must_use]
    pub fn free_count(&self) -> u32 {
        self.capacity - self.count()
    }

    /// `true` iff `free_count() == 0` at the moment of the call.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.free_count() == 0
    }

    /// `true` iff `count() == 0` at the moment of the call.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    #[inline]
    unsafe fn write_slot(&self, idx: u32, value: T) {
        let i = (idx & self.mask) as usize;
        (*self.slots[i].get()).write(value);
    }

    #[inline]
    unsafe fn read_slot(&self, idx: u32) -> T {
        let i = (idx & self.mask) as usize;
        (*self.slots[i].get()).assume_init()
    }

    /// The producer-side reservation predicate: caps the requested count `n`
    /// at the free capacity observed against the consumer's published tail,
    /// either failing outright (`fixed`) or partially satisfying it (burst).
    #[inline]
    fn enqueue_compute(&self, n: u32, fixed: bool) -> impl FnMut(u32) -> u32 + '_ {
        move |head| {
            let cons_tail = self.cons.tail.load(Ordering::Acquire);
            let free = self.capacity.wrapping_sub(head.wrapping_sub(cons_tail));
            let n_to_do = if fixed {
                if n > free {
                    0
                } else {
                    n
                }
            } else {
                n.min(free)
            };
            debug_assert_reservation_within_bound!(n_to_do, free);
            n_to_do
        }
    }

    /// The consumer-side reservation predicate, symmetric to
    /// [`Ring::enqueue_compute`] against the producer's published tail.
    #[inline]
    fn dequeue_compute(&self, n: u32, fixed: bool) -> impl FnMut(u32) -> u32 + '_ {
        move |head| {
            let prod_tail = self.prod.tail.load(Ordering::Acquire);
            let avail = prod_tail.wrapping_sub(head);
            let n_to_do = if fixed {
                if n > avail {
                    0
                } else {
                    n
                }
            } else {
                n.min(avail)
            };
            debug_assert_reservation_within_bound!(n_to_do, avail);
            n_to_do
        }
    }

    /// Copies `n` items into slots `[old_head, old_head + n)`, store-fences,
    /// then publishes the reservation on the producer side.
    #[inline]
    fn copy_in_and_publish(&self, old_head: u32, n: u32, items: &[T]) {
        for i in 0..n {
            unsafe { self.write_slot(old_head.wrapping_add(i), items[i as usize]) };
        }
        store_fence();
        self.prod.publish(old_head, n);
        debug_assert_bounded_occupancy!(self.count(), self.capacity);
    }

    /// Load-fences, reads `n` items from slots `[old_head, old_head + n)`,
    /// then publishes the reservation on the consumer side.
    #[inline]
    fn copy_out_and_publish(&self, old_head: u32, n: u32, out: &mut [T]) {
        load_fence();
        for i in 0..n {
            out[i as usize] = unsafe { self.read_slot(old_head.wrapping_add(i)) };
        }
        self.cons.publish(old_head, n);
        debug_assert_bounded_occupancy!(self.count(), self.capacity);
    }

    fn enqueue_dispatch(&self, items: &[T], fixed: bool) -> u32 {
        let n = items.len() as u32;
        let (old_head, n_done) = self.prod.move_head(self.enqueue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_in_and_publish(old_head, n_done, items);
        n_done
    }

    fn enqueue_exclusive(&self, items: &[T], fixed: bool) -> u32 {
        let n = items.len() as u32;
        let (old_head, n_done) =
            CursorBlock::move_head_single(&self.prod.head, self.enqueue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_in_and_publish(old_head, n_done, items);
        n_done
    }

    fn enqueue_shared(&self, items: &[T], fixed: bool) -> u32 {
        let n = items.len() as u32;
        let (old_head, n_done) =
            CursorBlock::move_head_multi(&self.prod.head, self.enqueue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_in_and_publish(old_head, n_done, items);
        n_done
    }

    fn dequeue_dispatch(&self, out: &mut [T], fixed: bool) -> u32 {
        let n = out.len() as u32;
        let (old_head, n_done) = self.cons.move_head(self.dequeue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_out_and_publish(old_head, n_done, out);
        n_done
    }

    fn dequeue_exclusive(&self, out: &mut [T], fixed: bool) -> u32 {
        let n = out.len() as u32;
        let (old_head, n_done) =
            CursorBlock::move_head_single(&self.cons.head, self.dequeue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_out_and_publish(old_head, n_done, out);
        n_done
    }

    fn dequeue_shared(&self, out: &mut [T], fixed: bool) -> u32 {
        let n = out.len() as u32;
        let (old_head, n_done) =
            CursorBlock::move_head_multi(&self.cons.head, self.dequeue_compute(n, fixed));
        if n_done == 0 {
            return 0;
        }
        self.copy_out_and_publish(old_head, n_done, out);
        n_done
    }

    /// Enqueues exactly `items.len()` entries, or none at all. Dispatches on
    /// the producer side's runtime `single` mode.
    pub fn enqueue_bulk(&self, items: &[T]) -> u32 {
        self.enqueue_dispatch(items, true)
    }

    /// Enqueues as many of `items` as currently fit, up to `items.len()`.
    /// Dispatches on the producer side's runtime `single` mode.
    pub fn enqueue_burst(&self, items: &[T]) -> u32 {
        self.enqueue_dispatch(items, false)
    }

    /// Exclusive-mode `enqueue_bulk`: skips the runtime `single` check.
    /// Calling this against a ring built without `SP_ENQ` is a correctness
    /// bug, not a detected error: the caller is asserting sole ownership.
    pub fn enqueue_bulk_sp(&self, items: &[T]) -> u32 {
        self.enqueue_exclusive(items, true)
    }

    /// Exclusive-mode `enqueue_burst`. See [`Ring::enqueue_bulk_sp`].
    pub fn enqueue_burst_sp(&self, items: &[T]) -> u32 {
        self.enqueue_exclusive(items, false)
    }

    /// Shared-mode `enqueue_bulk`: always takes the CAS path, regardless of
    /// the ring's runtime `single` flag.
    pub fn enqueue_bulk_mp(&self, items: &[T]) -> u32 {
        self.enqueue_shared(items, true)
    }

    /// Shared-mode `enqueue_burst`. See [`Ring::enqueue_bulk_mp`].
    pub fn enqueue_burst_mp(&self, items: &[T]) -> u32 {
        self.enqueue_shared(items, false)
    }

    /// Dequeues exactly `out.len()` entries, or none at all. Dispatches on
    /// the consumer side's runtime `single` mode.
    pub fn dequeue_bulk(&self, out: &mut [T]) -> u32 {
        self.dequeue_dispatch(out, true)
    }

    /// Dequeues as many entries as are available, up to `out.len()`.
    /// Dispatches on the consumer side's runtime `single` mode.
    pub fn dequeue_burst(&self, out: &mut [T]) -> u32 {
        self.dequeue_dispatch(out, false)
    }

    /// Exclusive-mode `dequeue_bulk`. See [`Ring::enqueue_bulk_sp`].
    pub fn dequeue_bulk_sc(&self, out: &mut [T]) -> u32 {
        self.dequeue_exclusive(out, true)
    }

    /// Exclusive-mode `dequeue_burst`. See [`Ring::enqueue_bulk_sp`].
    pub fn dequeue_burst_sc(&self, out: &mut [T]) -> u32 {
        self.dequeue_exclusive(out, false)
    }

    /// Shared-mode `dequeue_bulk`. See [`Ring::enqueue_bulk_mp`].
    pub fn dequeue_bulk_mc(&self, out: &mut [T]) -> u32 {
        self.dequeue_shared(out, true)
    }

    /// Shared-mode `dequeue_burst`. See [`Ring::enqueue_bulk_mp`].
    pub fn dequeue_burst_mc(&self, out: &mut [T]) -> u32 {
        self.dequeue_shared(out, false)
    }

    /// Single-item convenience wrapper over `enqueue_bulk`. Returns `false`
    /// if the ring is full.
    pub fn enqueue(&self, item: T) -> bool {
        self.enqueue_dispatch(std::slice::from_ref(&item), true) == 1
    }

    /// Single-item convenience wrapper over `dequeue_bulk`. Returns `None`
    /// if the ring is empty.
    pub fn dequeue(&self) -> Option<T> {
        let (old_head, n_done) = self.cons.move_head(self.dequeue_compute(1, true));
        if n_done == 0 {
            return None;
        }
        load_fence();
        let value = unsafe { self.read_slot(old_head) };
        self.cons.publish(old_head, n_done);
        Some(value)
    }
}

impl<T: Copy> std::fmt::Debug for Ring<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ring")
            .field("flags", &self.flags)
            .field("size", &self.size)
            .field("mask", &self.mask)
            .field("capacity", &self.capacity)
            .field("count", &self.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_power_of_two_without_exact_sz() {
        let err = Ring::<usize>::try_new(3, RingFlags::empty()).unwrap_err();
        assert_eq!(err, RingError::NotPowerOfTwo { requested: 3 });
    }

    #[test]
    fn exact_sz_rounds_storage_and_keeps_exact_capacity() {
        let r = Ring::<usize>::try_new(3, RingFlags::EXACT_SZ).unwrap();
        assert_eq!(r.capacity(), 3);
        assert_eq!(r.size(), 4);
        assert_eq!(r.mask(), 3);
    }

    #[test]
    fn rejects_zero_and_oversized_count() {
        assert!(Ring::<usize>::try_new(0, RingFlags::empty()).is_err());
        assert!(Ring::<usize>::try_new(u32::MAX, RingFlags::empty()).is_err());
    }

    #[test]
    fn init_in_place_works_over_caller_supplied_storage() {
        let flags = RingFlags::SP_ENQ | RingFlags::SC_DEQ;
        let size = Ring::<u32>::validated_dims(8, flags).unwrap().0;
        let storage: Box<[UnsafeCell<MaybeUninit<u32>>]> = (0..size)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect();

        let r = Ring::<u32>::init_in_place(storage, 8, flags).unwrap();
        assert_eq!(r.capacity(), 7);
        assert!(r.enqueue(42));
        assert_eq!(r.dequeue(), Some(42));
    }

    #[test]
    fn init_in_place_rejects_mismatched_storage_length() {
        let flags = RingFlags::SP_ENQ | RingFlags::SC_DEQ;
        let storage: Box<[UnsafeCell<MaybeUninit<u32>>]> =
            (0..4).map(|_| UnsafeCell::new(MaybeUninit::uninit())).collect();
        assert!(Ring::<u32>::init_in_place(storage, 8, flags).is_err());
    }

    #[test]
    fn single_thread_fill_and_drain_in_order() {
        let r = Ring::<u32>::try_new(8, RingFlags::SP_ENQ | RingFlags::SC_DEQ).unwrap();
        for v in 1..=7u32 {
            assert!(r.enqueue(v), "enqueue {v} should succeed");
        }
        assert!(!r.enqueue(8), "ring should be full at capacity 7");

        let mut drained = Vec::new();
        while let Some(v) = r.dequeue() {
            drained.push(v);
        }
        assert_eq!(drained, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn burst_partial_transfer() {
        let r = Ring::<u32>::try_new(8, RingFlags::SP_ENQ | RingFlags::SC_DEQ).unwrap();
        let items: Vec<u32> = (0..10).collect();
        assert_eq!(r.enqueue_burst(&items), 7);
        assert_eq!(r.enqueue_bulk(&[99]), 0);

        let mut buf = [0u32; 100];
        assert_eq!(r.dequeue_burst(&mut buf), 7);
        assert_eq!(&buf[..7], &items[..7]);
    }

    #[test]
    fn wrap_correctness_across_repeated_cycles() {
        let r = Ring::<u32>::try_new(4, RingFlags::SP_ENQ | RingFlags::SC_DEQ).unwrap();
        let mut next_value = 0u32;
        for _ in 0..10 {
            let batch: Vec<u32> = (next_value..next_value + 3).collect();
            assert_eq!(r.enqueue_bulk(&batch), 3);
            let mut out = [0u32; 3];
            assert_eq!(r.dequeue_bulk(&mut out), 3);
            assert_eq!(out, [batch[0], batch[1], batch[2]]);
            next_value += 3;
        }
    }

    #[test]
    fn fixed_mode_is_all_or_nothing() {
        let r = Ring::<u32>::try_new(4, RingFlags::SP_ENQ | RingFlags::SC_DEQ).unwrap();
        assert_eq!(r.enqueue_bulk(&[1, 2, 3]), 3);
        // Only 0 free slots remain (capacity 3); a fixed request for 1 fails.
        assert_eq!(r.enqueue_bulk(&[4]), 0);
        assert_eq!(r.count(), 3);
    }

    #[test]
    fn introspection_tracks_occupancy() {
        let r = Ring::<u32>::try_new(8, RingFlags::SP_ENQ | RingFlags::SC_DEQ).unwrap();
        assert!(r.is_empty());
        r.enqueue_bulk(&[1, 2, 3]);
        assert_eq!(r.count(), 3);
        assert_eq!(r.free_count(), r.capacity() - 3);
        assert!(!r.is_full());
    }

    #[test]
    fn multi_producer_contention_preserves_per_producer_order() {
        use std::sync::Arc;
        use std::thread;

        const PRODUCERS: u32 = 8;
        const PER_PRODUCER: u32 = 20_000;
        const BATCH: u32 = 16;

        let ring: Arc<Ring<(u32, u32)>> =
            Arc::new(Ring::try_new(1024, RingFlags::SC_DEQ).unwrap());

        let producers: Vec<_> = (0..PRODUCERS)
            .map(|pid| {
                let ring = Arc::clone(&ring);
                thread::spawn(move || {
                    let mut sent = 0u32;
                    while sent < PER_PRODUCER {
                        let n = BATCH.min(PER_PRODUCER - sent);
                        let batch: Vec<(u32, u32)> =
                            (sent..sent + n).map(|seq| (pid, seq)).collect();
                        let mut offset = 0u32;
                        while offset < n {
                            let done = ring.enqueue_burst(&batch[offset as usize..]);
                            if done == 0 {
                                std::thread::yield_now();
                                continue;
                            }
                            offset += done;
                        }
                        sent += n;
                    }
                })
            })
            .collect();

        let total = PRODUCERS * PER_PRODUCER;
        let mut last_seen = vec![None; PRODUCERS as usize];
        let mut drained = 0u32;
        while drained < total {
            if let Some((pid, seq)) = ring.dequeue() {
                let last = &mut last_seen[pid as usize];
                if let Some(prev) = *last {
                    assert!(seq > prev, "per-producer order violated");
                }
                *last = Some(seq);
                drained += 1;
            } else {
                std::thread::yield_now();
            }
        }

        for p in producers {
            p.join().unwrap();
        }
    }
}
