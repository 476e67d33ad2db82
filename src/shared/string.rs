//! Fixed-capacity shared string, used for the info line under a progress bar.

use std::fmt;
use std::io;
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::shared::lock::ProcessLock;
use crate::shared::segment::{Shared, Zeroable};

#[repr(C)]
struct StringHeader {
    lock: ProcessLock,
    len: AtomicUsize,
}

// SAFETY: lock + atomic length; zero means empty string.
unsafe impl Zeroable for StringHeader {}

/// Cross-process UTF-8 buffer with a capacity fixed at creation.
///
/// Longer values are truncated to the capacity at a character boundary.
///
/// # Example
/// ```
/// use loopvisor::SharedString;
///
/// let s = SharedString::new(5).unwrap();
/// s.set("hello world");
/// assert_eq!(s.get(), "hello");
/// ```
#[derive(Clone)]
pub struct SharedString {
    inner: Arc<Shared<StringHeader>>,
}

impl SharedString {
    /// Allocates an empty string able to hold `capacity` bytes.
    pub fn new(capacity: usize) -> io::Result<Self> {
        Ok(Self {
            inner: Arc::new(Shared::<StringHeader>::with_tail(capacity)?),
        })
    }

    /// Allocates a string and stores `value` (truncated to `capacity`).
    pub fn with_value(capacity: usize, value: &str) -> io::Result<Self> {
        let s = Self::new(capacity)?;
        s.set(value);
        Ok(s)
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.inner.tail_len()
    }

    /// Replaces the content, truncating to the capacity.
    pub fn set(&self, value: &str) {
        let mut n = value.len().min(self.capacity());
        while !value.is_char_boundary(n) {
            n -= 1;
        }

        let _guard = self.inner.lock.lock();
        // SAFETY: `n <= capacity`, the regions cannot overlap (one is shared
        // memory, the other a borrowed str), and the lock excludes writers.
        unsafe {
            ptr::copy_nonoverlapping(value.as_ptr(), self.inner.tail_ptr(), n);
        }
        self.inner.len.store(n, Ordering::Release);
    }

    /// Returns a copy of the current content.
    pub fn get(&self) -> String {
        let _guard = self.inner.lock.lock();
        let n = self.inner.len.load(Ordering::Acquire).min(self.capacity());
        let mut buf = vec![0u8; n];
        // SAFETY: `n <= capacity`; the lock excludes concurrent writers.
        unsafe {
            ptr::copy_nonoverlapping(self.inner.tail_ptr(), buf.as_mut_ptr(), n);
        }
        match String::from_utf8(buf) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }

    /// Empties the string.
    pub fn clear(&self) {
        let _guard = self.inner.lock.lock();
        self.inner.len.store(0, Ordering::Release);
    }
}

impl fmt::Debug for SharedString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedString").field(&self.get()).finish()
    }
}
