//! Debug-only assertion macros for the invariants documented on [`crate::ring::Ring`].
//!
//! Each macro is a no-op in release builds (`debug_assert!` underneath), so
//! there is zero cost once the protocol has been validated.

/// Occupancy never exceeds capacity: `prod.tail - cons.tail <= capacity`.
macro_rules! debug_assert_bounded_occupancy {
    ($occupied:expr, $capacity:expr) => {
        debug_assert!(
            $occupied <= $capacity,
            "occupancy {} exceeds capacity {}",
            $occupied,
            $capacity
        )
    };
}

/// A side's tail never overtakes its own head.
macro_rules! debug_assert_tail_not_past_head {
    ($tail:expr, $head:expr) => {
        debug_assert!(
            ($head.wrapping_sub($tail) as i32) >= 0,
            "tail {} overtook head {}",
            $tail,
            $head
        )
    };
}

/// A reservation never claims more than the free/occupied count it observed.
macro_rules! debug_assert_reservation_within_bound {
    ($n:expr, $bound:expr) => {
        debug_assert!(
            $n <= $bound,
            "reserved {} but only {} were available",
            $n,
            $bound
        )
    };
}

pub(crate) use debug_assert_bounded_occupancy;
pub(crate) use debug_assert_reservation_within_bound;
pub(crate) use debug_assert_tail_not_past_head;
