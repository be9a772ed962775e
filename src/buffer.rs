//! Ownership of output buffers allocated by the platform
//!
//! A successful protect or unprotect call hands back memory the caller must
//! free with `LocalFree`. `OutputBuffer` owns that memory from the moment the
//! call returns: the contents are copied out, plaintext is overwritten with
//! zeros, and the memory is released exactly once. A failed release is
//! reported, never dropped.

use std::ffi::c_void;
use std::ptr;
use std::slice;

use zeroize::Zeroize;

use crate::error::{DpapiError, ErrorCategory, ErrorKind, Operation, Result};

/// Frees a platform allocation; returns null on success (`LocalFree` contract).
pub(crate) type FreeFn = unsafe fn(*mut c_void) -> *mut c_void;

pub(crate) struct OutputBuffer {
    ptr: *mut u8,
    len: usize,
    operation: Operation,
    free_fn: FreeFn,
}

impl OutputBuffer {
    /// Takes ownership of `len` bytes at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or point to `len` initialised bytes that nothing
    /// else frees, and `free_fn` must be the matching deallocator.
    pub(crate) unsafe fn new(ptr: *mut u8, len: usize, operation: Operation, free_fn: FreeFn) -> Self {
        Self {
            ptr,
            len,
            operation,
            free_fn,
        }
    }

    fn as_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        // SAFETY: guaranteed by the contract of `new`; we hold the only reference.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }

    fn wipe(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        // SAFETY: same region as `as_slice`, uniquely owned by us.
        unsafe { slice::from_raw_parts_mut(self.ptr, self.len) }.zeroize();
    }

    /// Copy out ciphertext and release the buffer as is.
    pub(crate) fn into_ciphertext(mut self) -> Result<Vec<u8>> {
        let ciphertext = self.as_slice().to_vec();
        self.free()?;
        Ok(ciphertext)
    }

    /// Copy out plaintext, zero the platform copy, then release it. If the
    /// release fails the copy is wiped as well.
    pub(crate) fn into_plaintext(mut self) -> Result<Vec<u8>> {
        let mut plaintext = self.as_slice().to_vec();
        self.wipe();
        if let Err(e) = self.free() {
            plaintext.zeroize();
            return Err(e);
        }
        Ok(plaintext)
    }

    fn free(&mut self) -> Result<()> {
        if self.ptr.is_null() {
            return Ok(());
        }
        let ptr = std::mem::replace(&mut self.ptr, ptr::null_mut());
        // SAFETY: `ptr` came from the allocator `free_fn` belongs to and is
        // freed exactly once since our copy is now null.
        let leftover = unsafe { (self.free_fn)(ptr as *mut c_void) };
        if leftover.is_null() {
            return Ok(());
        }
        let os_error = std::io::Error::last_os_error();
        Err(DpapiError::with_source(
            ErrorCategory::Internal,
            ErrorKind::ReleaseFailed {
                operation: self.operation,
            },
            format!("failed to release {} output buffer: {}", self.operation, os_error),
            os_error,
        ))
    }
}

impl Drop for OutputBuffer {
    fn drop(&mut self) {
        // Only reached with a live pointer when an unwind skipped
        // `into_*`; there is nobody left to report to.
        if !self.ptr.is_null() {
            self.wipe();
            let _ = self.free();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    thread_local! {
        static FREED_LEN: Cell<usize> = const { Cell::new(0) };
        static SEEN_AT_FREE: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
    }

    /// Heap buffer standing in for a platform allocation.
    fn allocate(bytes: &[u8]) -> (*mut u8, usize) {
        let len = bytes.len();
        FREED_LEN.with(|l| l.set(len));
        SEEN_AT_FREE.with(|s| *s.borrow_mut() = None);
        (Box::into_raw(bytes.to_vec().into_boxed_slice()) as *mut u8, len)
    }

    /// Snapshots the buffer contents, then frees it.
    unsafe fn recording_free(ptr: *mut c_void) -> *mut c_void {
        let len = FREED_LEN.with(Cell::get);
        let ptr = ptr as *mut u8;
        // SAFETY: `ptr` and `len` come from `allocate`.
        let snapshot = unsafe { slice::from_raw_parts(ptr, len) }.to_vec();
        SEEN_AT_FREE.with(|s| *s.borrow_mut() = Some(snapshot));
        // SAFETY: reclaims the box leaked by `allocate`.
        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(ptr, len)) });
        ptr::null_mut()
    }

    /// Snapshots and reclaims like `recording_free`, but reports failure.
    unsafe fn failing_free(ptr: *mut c_void) -> *mut c_void {
        // SAFETY: forwarded contract.
        unsafe { recording_free(ptr) };
        ptr
    }

    fn seen_at_free() -> Option<Vec<u8>> {
        SEEN_AT_FREE.with(|s| s.borrow().clone())
    }

    #[test]
    fn test_plaintext_zeroed_before_release() {
        let (ptr, len) = allocate(b"secret");
        let buffer = unsafe { OutputBuffer::new(ptr, len, Operation::Unprotect, recording_free) };
        assert_eq!(buffer.into_plaintext().unwrap(), b"secret");
        assert_eq!(seen_at_free(), Some(vec![0u8; 6]));
    }

    #[test]
    fn test_ciphertext_released_untouched() {
        let (ptr, len) = allocate(&[0xde, 0xad, 0xbe, 0xef]);
        let buffer = unsafe { OutputBuffer::new(ptr, len, Operation::Protect, recording_free) };
        assert_eq!(buffer.into_ciphertext().unwrap(), [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(seen_at_free(), Some(vec![0xde, 0xad, 0xbe, 0xef]));
    }

    #[test]
    fn test_release_failure_is_reported() {
        let (ptr, len) = allocate(b"secret");
        let buffer = unsafe { OutputBuffer::new(ptr, len, Operation::Unprotect, failing_free) };
        let err = buffer.into_plaintext().expect_err("expected release failure");
        assert_eq!(
            err.kind,
            ErrorKind::ReleaseFailed {
                operation: Operation::Unprotect
            }
        );
        // Wiped even though the release did not go through.
        assert_eq!(seen_at_free(), Some(vec![0u8; 6]));

        let (ptr, len) = allocate(b"blob");
        let buffer = unsafe { OutputBuffer::new(ptr, len, Operation::Protect, failing_free) };
        let err = buffer.into_ciphertext().expect_err("expected release failure");
        assert_eq!(
            err.kind,
            ErrorKind::ReleaseFailed {
                operation: Operation::Protect
            }
        );
    }

    #[test]
    fn test_null_output_is_empty_and_not_freed() {
        FREED_LEN.with(|l| l.set(0));
        SEEN_AT_FREE.with(|s| *s.borrow_mut() = None);
        let buffer =
            unsafe { OutputBuffer::new(ptr::null_mut(), 0, Operation::Unprotect, recording_free) };
        assert!(buffer.into_plaintext().unwrap().is_empty());
        assert_eq!(seen_at_free(), None);
    }

    #[test]
    fn test_drop_releases_and_wipes() {
        let (ptr, len) = allocate(b"leftover");
        drop(unsafe { OutputBuffer::new(ptr, len, Operation::Unprotect, recording_free) });
        assert_eq!(seen_at_free(), Some(vec![0u8; 8]));
    }
}
