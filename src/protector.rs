//! Layered encrypt/decrypt API over a `Backend`
//!
//! Everything here reduces to the backend's two primitives: scope picks the
//! flag word, entropy is passed through, and the string forms add UTF-8 and
//! base64 on top of the byte forms.

use zeroize::Zeroize;

use crate::armor;
use crate::backend::{Backend, SystemBackend};
use crate::error::{DpapiError, Result};
use crate::scope::Scope;

/// Encrypts and decrypts through a data protection backend.
#[derive(Debug, Clone, Default)]
pub struct Protector<B = SystemBackend> {
    backend: B,
}

impl Protector<SystemBackend> {
    /// A protector bound to the operating system's facility.
    pub fn system() -> Self {
        Self {
            backend: SystemBackend,
        }
    }
}

impl<B: Backend> Protector<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Protect `plaintext` for `scope`, optionally bound to `entropy`.
    ///
    /// Output is not deterministic; only `unprotect` with the same entropy
    /// is guaranteed to give back `plaintext`.
    pub fn protect(
        &self,
        plaintext: &[u8],
        scope: Scope,
        entropy: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        self.backend.protect(plaintext, normalize(entropy), scope)
    }

    /// Recover the plaintext of a blob. Scope is recorded in the blob itself.
    pub fn unprotect(&self, ciphertext: &[u8], entropy: Option<&[u8]>) -> Result<Vec<u8>> {
        self.backend.unprotect(ciphertext, normalize(entropy))
    }

    pub fn encrypt_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.protect(data, Scope::CurrentUser, None)
    }

    pub fn encrypt_bytes_machine_local(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.protect(data, Scope::LocalMachine, None)
    }

    pub fn encrypt_bytes_entropy(&self, data: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.protect(data, Scope::CurrentUser, Some(entropy))
    }

    pub fn decrypt_bytes(&self, data: &[u8]) -> Result<Vec<u8>> {
        self.unprotect(data, None)
    }

    pub fn decrypt_bytes_entropy(&self, data: &[u8], entropy: &[u8]) -> Result<Vec<u8>> {
        self.unprotect(data, Some(entropy))
    }

    /// Encrypt a string, returning the blob as base64.
    pub fn encrypt(&self, secret: &str) -> Result<String> {
        self.encrypt_str(secret, Scope::CurrentUser, None)
    }

    pub fn encrypt_machine_local(&self, secret: &str) -> Result<String> {
        self.encrypt_str(secret, Scope::LocalMachine, None)
    }

    pub fn encrypt_entropy(&self, secret: &str, entropy: &str) -> Result<String> {
        self.encrypt_str(secret, Scope::CurrentUser, Some(entropy.as_bytes()))
    }

    /// Decrypt a base64 blob produced by one of the string encrypt forms.
    pub fn decrypt(&self, data: &str) -> Result<String> {
        self.decrypt_str(data, None)
    }

    pub fn decrypt_entropy(&self, data: &str, entropy: &str) -> Result<String> {
        self.decrypt_str(data, Some(entropy.as_bytes()))
    }

    fn encrypt_str(&self, secret: &str, scope: Scope, entropy: Option<&[u8]>) -> Result<String> {
        let blob = self
            .protect(secret.as_bytes(), scope, entropy)
            .map_err(|e| e.with_context("failed to encrypt string"))?;
        Ok(armor::wrap(&blob))
    }

    fn decrypt_str(&self, data: &str, entropy: Option<&[u8]>) -> Result<String> {
        let blob = armor::unwrap(data)?;
        let plaintext = self
            .unprotect(&blob, entropy)
            .map_err(|e| e.with_context("failed to decrypt string"))?;
        plaintext_into_string(plaintext)
    }
}

/// Interpret recovered plaintext as UTF-8. On failure the bytes are wiped
/// and the error is `Encoding`.
pub fn plaintext_into_string(plaintext: Vec<u8>) -> Result<String> {
    String::from_utf8(plaintext).map_err(|e| {
        let utf8_error = e.utf8_error();
        e.into_bytes().zeroize();
        DpapiError::encoding(
            format!("decrypted data is not valid UTF-8: {}", utf8_error),
            utf8_error,
        )
    })
}

fn normalize(entropy: Option<&[u8]>) -> Option<&[u8]> {
    entropy.filter(|e| !e.is_empty())
}
