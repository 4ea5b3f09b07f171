//! C ABI shim over [`crate::ring::Ring`].
//!
//! Payloads are fixed at `usize` here: the concurrency core is generic, but a
//! C caller only ever hands across pointer-width opaque values, so the FFI
//! boundary is monomorphized once rather than exposed generically.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::ptr;

use crate::flags::RingFlags;
use crate::ring::Ring;

const RING_SUCCESS: i32 = 0;
const RING_ERROR_NULL_POINTER: i32 = -1;
const RING_ERROR_INVALID_ARG: i32 = -2;

/// Opaque handle to a ring, returned by [`ring_create`].
pub struct RingHandle {
    inner: Ring<usize>,
}

/// Allocates and initializes a ring of `count` pointer-width slots.
///
/// # Arguments
/// * `count` - requested size or exact capacity (see `flags`).
/// * `flags` - bitwise-or of `RingFlags` values (`SP_ENQ = 0x1`,
///   `SC_DEQ = 0x2`, `EXACT_SZ = 0x4`).
///
/// # Returns
/// Pointer to a `RingHandle`, or NULL if `count`/`flags` are invalid or
/// allocation fails. The failure reason is logged via the `log` facade.
#[no_mangle]
pub extern "C" fn ring_create(count: u32, flags: u32) -> *mut RingHandle {
    let flags = RingFlags::from_bits_truncate(flags);
    match Ring::try_new(count, flags) {
        Ok(inner) => Box::into_raw(Box::new(RingHandle { inner })),
        Err(e) => {
            log::error!("ring_create failed: {e}");
            ptr::null_mut()
        }
    }
}

/// Initializes a ring over caller-supplied storage instead of allocating its
/// own, for an embedder that already owns the backing memory (e.g. a shared
/// mapping sized ahead of time with [`ring_memsize`]).
///
/// # Arguments
/// * `buf` - pointer to `buf_len` contiguous pointer-width slots the caller
///   owns; ownership of this memory passes to the returned handle on
///   success, and it must not be freed except via [`ring_free`].
/// * `buf_len` - number of slots `buf` points to; must equal the `size`
///   that `count`/`flags` validate to (see [`ring_memsize`]).
/// * `count`, `flags` - as in [`ring_create`].
///
/// # Returns
/// Pointer to a `RingHandle`, or NULL if `buf` is NULL or `buf_len`/`count`/
/// `flags` are invalid. The failure reason is logged via the `log` facade.
#[no_mangle]
pub extern "C" fn ring_init(buf: *mut usize, buf_len: u32, count: u32, flags: u32) -> *mut RingHandle {
    if buf.is_null() {
        log::error!("ring_init called with a null buffer");
        return ptr::null_mut();
    }
    let flags = RingFlags::from_bits_truncate(flags);
    let storage: Box<[UnsafeCell<MaybeUninit<usize>>]> = unsafe {
        Box::from_raw(std::slice::from_raw_parts_mut(
            buf as *mut UnsafeCell<MaybeUninit<usize>>,
            buf_len as usize,
        ))
    };
    match Ring::init_in_place(storage, count, flags) {
        Ok(inner) => Box::into_raw(Box::new(RingHandle { inner })),
        Err(e) => {
            log::error!("ring_init failed: {e}");
            ptr::null_mut()
        }
    }
}

/// Reports the byte size a `ring_create(count, flags)` would allocate,
/// without allocating it.
///
/// # Returns
/// `0` and writes the size through `out_bytes` on success; a negative error
/// code on invalid input.
#[no_mangle]
pub extern "C" fn ring_memsize(count: u32, flags: u32, out_bytes: *mut usize) -> i32 {
    if out_bytes.is_null() {
        return RING_ERROR_NULL_POINTER;
    }
    let flags = RingFlags::from_bits_truncate(flags);
    match Ring::<usize>::memsize(count, flags) {
        Ok(bytes) => {
            unsafe { *out_bytes = bytes };
            RING_SUCCESS
        }
        Err(e) => {
            log::error!("ring_memsize rejected count={count}: {e}");
            RING_ERROR_INVALID_ARG
        }
    }
}

/// Releases a ring previously returned by [`ring_create`]. A NULL handle is
/// accepted and is a no-op.
#[no_mangle]
pub extern "C" fn ring_free(handle: *mut RingHandle) {
    if !handle.is_null() {
        unsafe {
            let _ = Box::from_raw(handle);
        }
    }
}

macro_rules! transfer_fn {
    ($name:ident, $method:ident) => {
        /// Transfers up to `n` pointer-width values between `buf` and the
        /// ring. Returns the number actually transferred (which may be `0`),
        /// or a negative error code if `handle`/`buf` are NULL.
        #[no_mangle]
        pub extern "C" fn $name(handle: *mut RingHandle, buf: *mut usize, n: u32) -> i32 {
            if handle.is_null() || buf.is_null() {
                return RING_ERROR_NULL_POINTER;
            }
            let ring = unsafe { &(*handle).inner };
            let slice = unsafe { std::slice::from_raw_parts_mut(buf, n as usize) };
            ring.$method(slice) as i32
        }
    };
}

transfer_fn!(ring_enqueue_bulk, enqueue_bulk);
transfer_fn!(ring_enqueue_burst, enqueue_burst);
transfer_fn!(ring_dequeue_bulk, dequeue_bulk);
transfer_fn!(ring_dequeue_burst, dequeue_burst);

/// Current occupancy, or a negative error code if `handle` is NULL.
#[no_mangle]
pub extern "C" fn ring_count(handle: *const RingHandle) -> i32 {
    if handle.is_null() {
        return RING_ERROR_NULL_POINTER;
    }
    unsafe { &(*handle).inner }.count() as i32
}

/// Free capacity, or a negative error code if `handle` is NULL.
#[no_mangle]
pub extern "C" fn ring_free_count(handle: *const RingHandle) -> i32 {
    if handle.is_null() {
        return RING_ERROR_NULL_POINTER;
    }
    unsafe { &(*handle).inner }.free_count() as i32
}

/// `1` if full, `0` if not, negative error code if `handle` is NULL.
#[no_mangle]
pub extern "C" fn ring_full(handle: *const RingHandle) -> i32 {
    if handle.is_null() {
        return RING_ERROR_NULL_POINTER;
    }
    i32::from(unsafe { &(*handle).inner }.is_full())
}

/// `1` if empty, `0` if not, negative error code if `handle` is NULL.
#[no_mangle]
pub extern "C" fn ring_empty(handle: *const RingHandle) -> i32 {
    if handle.is_null() {
        return RING_ERROR_NULL_POINTER;
    }
    i32::from(unsafe { &(*handle).inner }.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_enqueue_dequeue_free_roundtrip() {
        let handle = ring_create(8, RingFlags::SP_ENQ.bits() | RingFlags::SC_DEQ.bits());
        assert!(!handle.is_null());

        let mut input = [1usize, 2, 3];
        assert_eq!(ring_enqueue_bulk(handle, input.as_mut_ptr(), 3), 3);
        assert_eq!(ring_count(handle), 3);

        let mut out = [0usize; 3];
        assert_eq!(ring_dequeue_bulk(handle, out.as_mut_ptr(), 3), 3);
        assert_eq!(out, [1, 2, 3]);
        assert_eq!(ring_empty(handle), 1);

        ring_free(handle);
    }

    #[test]
    fn init_over_caller_supplied_buffer_roundtrips() {
        let flags = RingFlags::SP_ENQ.bits() | RingFlags::SC_DEQ.bits();
        let mut bytes = 0usize;
        assert_eq!(ring_memsize(8, flags, &mut bytes as *mut usize), RING_SUCCESS);

        let mut storage = vec![0usize; 8].into_boxed_slice();
        let handle = ring_init(storage.as_mut_ptr(), storage.len() as u32, 8, flags);
        assert!(!handle.is_null());
        std::mem::forget(storage);

        let mut input = [7usize];
        assert_eq!(ring_enqueue_bulk(handle, input.as_mut_ptr(), 1), 1);
        let mut out = [0usize; 1];
        assert_eq!(ring_dequeue_bulk(handle, out.as_mut_ptr(), 1), 1);
        assert_eq!(out, [7]);

        ring_free(handle);
    }

    #[test]
    fn init_rejects_null_buffer() {
        let handle = ring_init(ptr::null_mut(), 8, 8, 0);
        assert!(handle.is_null());
    }

    #[test]
    fn create_rejects_bad_count() {
        let handle = ring_create(3, 0);
        assert!(handle.is_null());
    }

    #[test]
    fn null_handle_reports_null_pointer_error() {
        assert_eq!(ring_count(ptr::null()), RING_ERROR_NULL_POINTER);
        assert_eq!(
            ring_enqueue_bulk(ptr::null_mut(), ptr::null_mut(), 0),
            RING_ERROR_NULL_POINTER
        );
    }

    #[test]
    fn memsize_reports_cache_line_multiple() {
        let mut bytes = 0usize;
        let rc = ring_memsize(1024, 0, &mut bytes as *mut usize);
        assert_eq!(rc, RING_SUCCESS);
        assert_eq!(bytes % crate::util::CACHE_LINE_SIZE, 0);
    }
}
