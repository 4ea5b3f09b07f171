//! A bounded, lock-free, multi-producer/multi-consumer FIFO ring buffer for
//! fixed-size, pointer-width payload slots.
//!
//! Each side of the ring (producer and consumer) can independently be
//! configured as "single" (exactly one thread ever touches that side) or
//! "shared" (arbitrarily many threads contend via a CAS loop). Transfers
//! come in "bulk" (all-or-nothing) and "burst" (best-effort partial) flavors,
//! each additionally available in single- and multi-specialized forms that
//! skip the runtime mode check. See [`Ring`] for the core type and
//! [`RingBuilder`] for the easiest way to construct one.
//!
//! ```
//! use ringcore::RingBuilder;
//!
//! let ring = RingBuilder::new(8)
//!     .single_producer()
//!     .single_consumer()
//!     .build::<u32>()
//!     .unwrap();
//!
//! assert!(ring.enqueue(1));
//! assert!(ring.enqueue(2));
//! assert_eq!(ring.dequeue(), Some(1));
//! assert_eq!(ring.dequeue(), Some(2));
//! assert_eq!(ring.dequeue(), None);
//! ```

mod builder;
mod cursor;
mod error;
mod fence;
mod ffi;
mod flags;
mod invariants;
mod ring;
mod util;

pub use builder::RingBuilder;
pub use error::RingError;
pub use flags::RingFlags;
pub use ring::Ring;

pub use ffi::{
    ring_count, ring_create, ring_dequeue_bulk, ring_dequeue_burst, ring_empty,
    ring_enqueue_bulk, ring_enqueue_burst, ring_free, ring_free_count, ring_full, ring_init,
    ring_memsize, RingHandle,
};
