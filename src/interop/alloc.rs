//! The designated native allocator
//!
//! Every buffer handed across the boundary comes from the allocator the other
//! side already knows how to free: `CoTaskMemAlloc` on Windows, `malloc`
//! elsewhere. Live addresses are tracked together with who currently owns
//! them, so a stale release is reported instead of reaching the allocator.

use core::ptr::NonNull;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use super::encoding::StringEncoding;
use crate::errors::{MarshalError, Result};
use crate::logging;

/// Who is responsible for freeing a live buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Held by a `NativeString`; freed on drop
    Owned,
    /// Handed to a receiver with `into_raw`; freed through `release_raw`
    Transferred,
}

/// Bookkeeping for one live native buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Total size in bytes, terminator included
    pub size: usize,
    pub encoding: StringEncoding,
    pub ownership: Ownership,
}

static LIVE: Lazy<DashMap<usize, Allocation>> = Lazy::new(DashMap::new);

/// Allocate `size` bytes in the native arena and register them as `Owned`
pub fn allocate(size: usize, encoding: StringEncoding) -> Result<NonNull<u8>> {
    if size == 0 {
        return Err(MarshalError::invalid_argument("zero-sized native allocation"));
    }

    let ptr = unsafe { sys::alloc(size) };
    let ptr = NonNull::new(ptr).ok_or(MarshalError::AllocationFailed { size })?;

    let allocation = Allocation { size, encoding, ownership: Ownership::Owned };
    LIVE.insert(ptr.as_ptr() as usize, allocation);
    logging::log_allocation(size, ptr.as_ptr());
    Ok(ptr)
}

/// Move a live buffer from `from` to `to` ownership
///
/// Fails with `DoubleRelease` when the address is not live in state `from`.
pub fn transition(ptr: NonNull<u8>, from: Ownership, to: Ownership) -> Result<Allocation> {
    let address = ptr.as_ptr() as usize;

    match LIVE.get_mut(&address) {
        Some(mut entry) if entry.ownership == from => {
            entry.ownership = to;
            Ok(*entry)
        }
        _ => {
            logging::log_release_rejected(ptr.as_ptr());
            Err(MarshalError::DoubleRelease { address })
        }
    }
}

/// Free a live buffer exactly once, provided it is held as `expected`
///
/// Addresses that are not live, or are live under the other ownership, are
/// rejected without touching the allocator. A stale raw pointer whose address
/// was reused by a new `NativeString` therefore cannot free that string.
pub fn release(ptr: NonNull<u8>, expected: Ownership) -> Result<Allocation> {
    let address = ptr.as_ptr() as usize;

    // Removal is atomic, so of two racing releases only one reaches `free`
    match LIVE.remove_if(&address, |_, allocation| allocation.ownership == expected) {
        Some((_, allocation)) => {
            unsafe { sys::free(ptr.as_ptr(), allocation.size) };
            logging::log_deallocation(allocation.size, ptr.as_ptr());
            Ok(allocation)
        }
        None => {
            logging::log_release_rejected(ptr.as_ptr());
            Err(MarshalError::DoubleRelease { address })
        }
    }
}

/// Look up a live buffer by address
pub fn lookup(ptr: *const u8) -> Option<Allocation> {
    LIVE.get(&(ptr as usize)).map(|entry| *entry.value())
}

#[inline]
pub fn is_live(ptr: *const u8) -> bool {
    LIVE.contains_key(&(ptr as usize))
}

/// Number of buffers currently owned by someone
pub fn live_count() -> usize {
    LIVE.len()
}

/// Serializes tests that hand out raw pointers, so a stale release in one
/// test never meets another test's transferred buffer at a reused address
#[cfg(test)]
pub(crate) fn transfer_guard() -> parking_lot::MutexGuard<'static, ()> {
    static TRANSFERS: parking_lot::Mutex<()> = parking_lot::const_mutex(());
    TRANSFERS.lock()
}

#[cfg(unix)]
mod sys {
    pub unsafe fn alloc(size: usize) -> *mut u8 {
        libc::malloc(size) as *mut u8
    }

    pub unsafe fn free(ptr: *mut u8, _size: usize) {
        libc::free(ptr as *mut libc::c_void)
    }
}

#[cfg(windows)]
mod sys {
    use winapi::um::combaseapi::{CoTaskMemAlloc, CoTaskMemFree};

    pub unsafe fn alloc(size: usize) -> *mut u8 {
        CoTaskMemAlloc(size) as *mut u8
    }

    pub unsafe fn free(ptr: *mut u8, _size: usize) {
        CoTaskMemFree(ptr as *mut _)
    }
}

#[cfg(not(any(unix, windows)))]
mod sys {
    use std::alloc::{alloc as std_alloc, dealloc, Layout};

    const ALIGN: usize = 8;

    pub unsafe fn alloc(size: usize) -> *mut u8 {
        match Layout::from_size_align(size, ALIGN) {
            Ok(layout) => std_alloc(layout),
            Err(_) => core::ptr::null_mut(),
        }
    }

    pub unsafe fn free(ptr: *mut u8, size: usize) {
        if let Ok(layout) = Layout::from_size_align(size, ALIGN) {
            dealloc(ptr, layout)
        }
    }
}
