//! Windows DPAPI calls (`CryptProtectData` / `CryptUnprotectData`)
//!
//! Buffers cross the boundary as `DATA_BLOB` descriptors. Output blobs are
//! allocated by the platform with `LocalAlloc` and handed to `OutputBuffer`,
//! which releases them with `LocalFree`.

use std::ffi::c_void;
use std::ptr;

// `DATA_BLOB` is an alias of `CRYPT_INTEGER_BLOB` in the Win32 headers;
// windows-sys only exposes the latter name.
use windows_sys::Win32::Foundation::LocalFree;
use windows_sys::Win32::Security::Cryptography::{
    CRYPT_INTEGER_BLOB, CryptProtectData, CryptUnprotectData,
};

use crate::buffer::OutputBuffer;
use crate::error::{DpapiError, ErrorCategory, ErrorKind, Operation, Result};
use crate::scope::UNPROTECT_FLAGS;

type DataBlob = CRYPT_INTEGER_BLOB;

/// Describe a borrowed slice for an input parameter.
///
/// An empty slice becomes a null pointer with zero length.
fn blob_from_slice(bytes: &[u8]) -> Result<DataBlob> {
    if bytes.is_empty() {
        return Ok(empty_blob());
    }
    let len = u32::try_from(bytes.len()).map_err(|e| {
        DpapiError::with_source(
            ErrorCategory::User,
            ErrorKind::InputTooLarge,
            format!("{} bytes exceeds the platform's blob size limit", bytes.len()),
            e,
        )
    })?;
    Ok(DataBlob {
        cbData: len,
        pbData: bytes.as_ptr() as *mut u8,
    })
}

fn empty_blob() -> DataBlob {
    DataBlob {
        cbData: 0,
        pbData: ptr::null_mut(),
    }
}

/// `LocalFree` in the shape `OutputBuffer` expects.
unsafe fn local_free(ptr: *mut c_void) -> *mut c_void {
    // SAFETY: forwarded from `OutputBuffer`, which only passes pointers the
    // platform allocated for us.
    unsafe { LocalFree(ptr) }
}

/// Takes ownership of an output blob filled in by a successful call.
///
/// # Safety
///
/// `blob` must come from a DPAPI call that returned success.
unsafe fn take_output(blob: DataBlob, operation: Operation) -> OutputBuffer {
    // SAFETY: the platform allocated `cbData` bytes at `pbData` with LocalAlloc.
    unsafe { OutputBuffer::new(blob.pbData, blob.cbData as usize, operation, local_free) }
}

/// Protect `plaintext` with the given flag word.
pub(crate) fn protect(plaintext: &[u8], entropy: Option<&[u8]>, flags: u32) -> Result<Vec<u8>> {
    let mut input = blob_from_slice(plaintext)?;
    let mut entropy = entropy.map(blob_from_slice).transpose()?;
    let mut output = empty_blob();

    // SAFETY: every descriptor points into a slice that outlives the call,
    // and `output` is a valid location for the platform to write into.
    let ok = unsafe {
        CryptProtectData(
            &mut input,
            ptr::null_mut(),
            entropy_ptr(&mut entropy),
            ptr::null_mut(),
            ptr::null_mut(),
            flags,
            &mut output,
        )
    };
    if ok == 0 {
        return Err(DpapiError::platform(
            Operation::Protect,
            std::io::Error::last_os_error(),
        ));
    }

    // SAFETY: the call succeeded, so `output` is ours to free.
    unsafe { take_output(output, Operation::Protect) }.into_ciphertext()
}

/// Unprotect `ciphertext`. The platform copy of the plaintext is zeroed
/// before it is released.
pub(crate) fn unprotect(ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>> {
    let mut input = blob_from_slice(ciphertext)?;
    let mut entropy = entropy.map(blob_from_slice).transpose()?;
    let mut output = empty_blob();

    // SAFETY: as in `protect`; the description out-parameter is not requested.
    let ok = unsafe {
        CryptUnprotectData(
            &mut input,
            ptr::null_mut(),
            entropy_ptr(&mut entropy),
            ptr::null_mut(),
            ptr::null_mut(),
            UNPROTECT_FLAGS,
            &mut output,
        )
    };
    if ok == 0 {
        return Err(DpapiError::platform(
            Operation::Unprotect,
            std::io::Error::last_os_error(),
        ));
    }

    // SAFETY: the call succeeded, so `output` is ours to free.
    unsafe { take_output(output, Operation::Unprotect) }.into_plaintext()
}

fn entropy_ptr(entropy: &mut Option<DataBlob>) -> *mut DataBlob {
    entropy
        .as_mut()
        .map_or(ptr::null_mut(), |blob| blob as *mut DataBlob)
}
