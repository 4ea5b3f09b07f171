//! Construction flags.
//!
//! Mirrors the `RING_F_*` flag set real bounded-ring implementations expose,
//! following the `bitflags` idiom used elsewhere in the reference corpus for
//! C-interop-shaped flag words.

use bitflags::bitflags;

bitflags! {
    /// Flags controlling a ring's construction-time behavior.
    ///
    /// Absence of `SP_ENQ`/`SC_DEQ` selects shared (multi) mode for that
    /// side; both flags may be set independently, giving four possible
    /// producer/consumer mode combinations.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RingFlags: u32 {
        /// The producer side is exclusive: exactly one thread ever enqueues.
        const SP_ENQ = 0x0001;
        /// The consumer side is exclusive: exactly one thread ever dequeues.
        const SC_DEQ = 0x0002;
        /// Treat `count` as the exact usable capacity; the backing storage
        /// is rounded up to the next power of two internally.
        const EXACT_SZ = 0x0004;
    }
}

/// Maximum supported ring storage size minus one. Kept well below
/// `u32::MAX` so that 32-bit cursor distances stay unambiguous.
pub const RING_SZ_MASK: u32 = 0x7fff_ffff;
