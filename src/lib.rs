//! Encrypt and decrypt data with the Windows Data Protection API
//!
//! The platform does the cryptography with keys it manages for the current
//! user or the local machine. This crate marshals buffers across the call
//! boundary, owns the lifetime of the buffers the platform hands back, and
//! layers string, scope and entropy variants over the two primitives.
//!
//! ```no_run
//! let blob = dpapi::encrypt("Hello World!;")?;
//! assert_eq!(dpapi::decrypt(&blob)?, "Hello World!;");
//! # Ok::<(), dpapi::DpapiError>(())
//! ```

pub mod armor;
pub mod backend;
#[cfg_attr(not(windows), allow(dead_code))]
mod buffer;
pub mod error;
pub mod protector;
pub mod scope;
pub mod stable;

#[cfg(windows)]
mod sys;

pub use backend::{Backend, SystemBackend};
pub use error::{DpapiError, ErrorCategory, ErrorKind, Operation, Result};
pub use protector::Protector;
pub use scope::Scope;

/// Protect bytes with an explicit scope and optional entropy.
pub fn protect(plaintext: &[u8], scope: Scope, entropy: Option<&[u8]>) -> Result<Vec<u8>> {
    Protector::system().protect(plaintext, scope, entropy)
}

/// Unprotect bytes, supplying the same entropy used to protect them.
pub fn unprotect(ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>> {
    Protector::system().unprotect(ciphertext, entropy)
}

/// Encrypt a string for the current user, returning base64.
pub fn encrypt(secret: &str) -> Result<String> {
    Protector::system().encrypt(secret)
}

/// Encrypt a string for any user of the local machine, returning base64.
pub fn encrypt_machine_local(secret: &str) -> Result<String> {
    Protector::system().encrypt_machine_local(secret)
}

/// Encrypt a string for the current user, bound to `entropy`.
pub fn encrypt_entropy(secret: &str, entropy: &str) -> Result<String> {
    Protector::system().encrypt_entropy(secret, entropy)
}

/// Decrypt a base64 string produced by `encrypt` or `encrypt_machine_local`.
pub fn decrypt(data: &str) -> Result<String> {
    Protector::system().decrypt(data)
}

pub fn decrypt_entropy(data: &str, entropy: &str) -> Result<String> {
    Protector::system().decrypt_entropy(data, entropy)
}

pub fn encrypt_bytes(data: &[u8]) -> Result<Vec<u8>> {
    Protector::system().encrypt_bytes(data)
}

pub fn encrypt_bytes_machine_local(data: &[u8]) -> Result<Vec<u8>> {
    Protector::system().encrypt_bytes_machine_local(data)
}

pub fn encrypt_bytes_entropy(data: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
    Protector::system().encrypt_bytes_entropy(data, entropy)
}

pub fn decrypt_bytes(data: &[u8]) -> Result<Vec<u8>> {
    Protector::system().decrypt_bytes(data)
}

pub fn decrypt_bytes_entropy(data: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
    Protector::system().decrypt_bytes_entropy(data, entropy)
}
