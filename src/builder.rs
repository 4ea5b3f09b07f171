//! Fluent construction front-end over [`Ring::try_new`].

use crate::error::RingError;
use crate::flags::RingFlags;
use crate::ring::Ring;

/// Builds a [`Ring`] from a requested count and a set of mode flags.
///
/// ```
/// use ringcore::{RingBuilder, RingError};
///
/// # fn main() -> Result<(), RingError> {
/// let ring = RingBuilder::new(1024)
///     .single_producer()
///     .build::<usize>()?;
/// assert_eq!(ring.capacity(), 1023);
/// # Ok(())
/// # }
/// ```
pub struct RingBuilder {
    count: u32,
    flags: RingFlags,
}

impl RingBuilder {
    /// Starts a builder for a ring sized by `count`. Interpreted as a power
    /// of two unless [`RingBuilder::exact_size`] is also called.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count,
            flags: RingFlags::empty(),
        }
    }

    /// Marks the producer side exclusive: exactly one thread will ever
    /// enqueue. Skips the CAS loop on that side.
    #[must_use]
    pub fn single_producer(mut self) -> Self {
        self.flags |= RingFlags::SP_ENQ;
        self
    }

    /// Marks the consumer side exclusive: exactly one thread will ever
    /// dequeue. Skips the CAS loop on that side.
    #[must_use]
    pub fn single_consumer(mut self) -> Self {
        self.flags |= RingFlags::SC_DEQ;
        self
    }

    /// Treats `count` as the exact usable capacity rather than requiring it
    /// to already be a power of two; storage is rounded up internally.
    #[must_use]
    pub fn exact_size(mut self) -> Self {
        self.flags |= RingFlags::EXACT_SZ;
        self
    }

    /// Consumes the builder and allocates the ring.
    pub fn build<T: Copy>(self) -> Result<Ring<T>, RingError> {
        Ring::try_new(self.count, self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_both_single_flags() {
        let ring = RingBuilder::new(8)
            .single_producer()
            .single_consumer()
            .build::<u32>()
            .unwrap();
        assert_eq!(ring.flags(), RingFlags::SP_ENQ | RingFlags::SC_DEQ);
        assert_eq!(ring.capacity(), 7);
    }

    #[test]
    fn builder_exact_size_rounds_storage() {
        let ring = RingBuilder::new(5).exact_size().build::<u32>().unwrap();
        assert_eq!(ring.capacity(), 5);
        assert_eq!(ring.size(), 8);
    }

    #[test]
    fn builder_propagates_construction_errors() {
        let err = RingBuilder::new(3).build::<u32>().unwrap_err();
        assert_eq!(err, RingError::NotPowerOfTwo { requested: 3 });
    }
}
