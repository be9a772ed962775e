//! The boundary between the convenience layer and the platform

use crate::error::Result;
use crate::scope::Scope;

/// A data protection facility.
///
/// Implementations receive entropy already normalised: `None` whenever the
/// caller supplied no entropy or an empty one.
pub trait Backend {
    /// Protect `plaintext`, returning an opaque blob.
    fn protect(&self, plaintext: &[u8], entropy: Option<&[u8]>, scope: Scope) -> Result<Vec<u8>>;

    /// Recover the plaintext from a blob produced by `protect` with the same entropy.
    fn unprotect(&self, ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn protect(&self, plaintext: &[u8], entropy: Option<&[u8]>, scope: Scope) -> Result<Vec<u8>> {
        (**self).protect(plaintext, entropy, scope)
    }

    fn unprotect(&self, ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>> {
        (**self).unprotect(ciphertext, entropy)
    }
}

/// The operating system's data protection API.
///
/// Stateless; the platform entry points are bound by the loader, so any
/// number of threads may use it at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBackend;

#[cfg(windows)]
impl Backend for SystemBackend {
    fn protect(&self, plaintext: &[u8], entropy: Option<&[u8]>, scope: Scope) -> Result<Vec<u8>> {
        crate::sys::protect(plaintext, entropy, scope.protect_flags())
    }

    fn unprotect(&self, ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>> {
        crate::sys::unprotect(ciphertext, entropy)
    }
}

#[cfg(not(windows))]
impl Backend for SystemBackend {
    fn protect(&self, _plaintext: &[u8], _entropy: Option<&[u8]>, _scope: Scope) -> Result<Vec<u8>> {
        Err(unsupported())
    }

    fn unprotect(&self, _ciphertext: &[u8], _entropy: Option<&[u8]>) -> Result<Vec<u8>> {
        Err(unsupported())
    }
}

#[cfg(not(windows))]
fn unsupported() -> crate::error::DpapiError {
    use crate::error::{DpapiError, ErrorCategory, ErrorKind};

    DpapiError::new(
        ErrorCategory::User,
        ErrorKind::Unsupported,
        "the Windows data protection API is not available on this platform",
    )
}
