//! Anonymous shared memory segments.
//!
//! A [`Shared<T>`] maps `size_of::<T>() + tail` zeroed bytes with
//! `MAP_SHARED | MAP_ANONYMOUS` and exposes the head as `&T`. The mapping is
//! inherited by forked children; only the process that created it unmaps it.

use std::io;
use std::marker::PhantomData;
use std::mem;
use std::ops::Deref;
use std::ptr::{self, NonNull};

/// Marker for `#[repr(C)]` types that are valid when all-zero and only
/// mutated through atomics (or under their own lock).
///
/// # Safety
/// Implementors must be valid for the all-zero bit pattern, contain no
/// pointers, and synchronize every mutation themselves.
pub(crate) unsafe trait Zeroable: Sync {}

/// Owning handle to an anonymous shared mapping whose head is a `T`.
pub(crate) struct Shared<T: Zeroable> {
    ptr: NonNull<u8>,
    len: usize,
    _marker: PhantomData<T>,
}

// SAFETY: the mapping is plain memory; `T: Zeroable` guarantees every access
// to it is synchronized.
unsafe impl<T: Zeroable> Send for Shared<T> {}
// SAFETY: see above.
unsafe impl<T: Zeroable> Sync for Shared<T> {}

impl<T: Zeroable> Shared<T> {
    /// Maps a zeroed `T`.
    pub(crate) fn new() -> io::Result<Self> {
        Self::with_tail(0)
    }

    /// Maps a zeroed `T` followed by `tail` zeroed bytes.
    pub(crate) fn with_tail(tail: usize) -> io::Result<Self> {
        let len = mem::size_of::<T>()
            .checked_add(tail)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "segment too large"))?
            .max(1);

        // SAFETY: anonymous mapping, no fd, kernel picks the address.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(raw.cast::<u8>())
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;

        Ok(Self {
            ptr,
            len,
            _marker: PhantomData,
        })
    }

    /// Pointer to the first byte after the `T` head.
    pub(crate) fn tail_ptr(&self) -> *mut u8 {
        // SAFETY: the mapping is at least `size_of::<T>()` bytes long.
        unsafe { self.ptr.as_ptr().add(mem::size_of::<T>()) }
    }

    /// Number of bytes after the `T` head.
    pub(crate) fn tail_len(&self) -> usize {
        self.len.saturating_sub(mem::size_of::<T>())
    }
}

impl<T: Zeroable> Deref for Shared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: page-aligned, zero-initialized by the kernel, valid when
        // zeroed per `Zeroable`, and alive as long as `self`.
        unsafe { &*self.ptr.as_ptr().cast::<T>() }
    }
}

impl<T: Zeroable> Drop for Shared<T> {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` come from a successful mmap and are unmapped once.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[repr(C)]
    struct Pair {
        a: AtomicU64,
        b: AtomicU64,
    }

    unsafe impl Zeroable for Pair {}

    #[test]
    fn mapping_starts_zeroed() {
        let seg = Shared::<Pair>::with_tail(16).unwrap();
        assert_eq!(seg.a.load(Ordering::Relaxed), 0);
        assert_eq!(seg.b.load(Ordering::Relaxed), 0);
        assert_eq!(seg.tail_len(), 16);

        seg.b.store(7, Ordering::Relaxed);
        assert_eq!(seg.b.load(Ordering::Relaxed), 7);
    }
}
