use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    /// Any failure that cannot be confidently attributed to any other error
    /// category in this enum.
    ///
    /// Platform failures land here: an access-denied, wrong-scope or
    /// wrong-entropy failure looks the same to us as a corrupted blob.
    Internal,

    /// The user provided invalid input or performed an action that is
    /// unsupported or impossible to complete.
    User,
}

/// Which platform primitive an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Protect,
    Unprotect,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Protect => f.write_str("protect"),
            Operation::Unprotect => f.write_str("unprotect"),
        }
    }
}

/// Fine-grained condition flags for consumers that want to branch on error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Textual input (base64, hex, UTF-8) is malformed. Raised before any
    /// platform call when decoding caller input.
    Encoding,
    /// A buffer is longer than the platform's 32-bit length field allows.
    InputTooLarge,
    /// The platform primitive returned failure. `os_error` is the platform's
    /// own error code, passed through without interpretation.
    PlatformCallFailed {
        operation: Operation,
        os_error: Option<i32>,
    },
    /// Releasing a platform-allocated output buffer failed.
    ReleaseFailed { operation: Operation },
    /// The data protection facility does not exist on this platform.
    Unsupported,
    /// Interaction with the filesystem or environment failed.
    Io,
    /// A stability fixture file could not be parsed.
    Fixture,
    /// A value read back from a stability fixture did not match.
    Mismatch,
}

#[derive(Debug, Error)]
#[error("{msg}")]
pub struct DpapiError {
    /// Broad error category, always provided.
    pub category: ErrorCategory,
    /// Specific condition tag.
    pub kind: ErrorKind,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
    msg: String,
}

impl DpapiError {
    /// Creates a new error with a category, kind and display message.
    pub fn new(category: ErrorCategory, kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            category,
            kind,
            source: None,
            msg: msg.into(),
        }
    }

    /// Creates a new error that retains the originating source error.
    pub fn with_source(
        category: ErrorCategory,
        kind: ErrorKind,
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            kind,
            source: Some(Box::new(source)),
            msg: msg.into(),
        }
    }

    /// Malformed textual input.
    pub fn encoding(
        msg: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(ErrorCategory::User, ErrorKind::Encoding, msg, source)
    }

    /// A failed platform call, carrying the platform error as source.
    pub fn platform(operation: Operation, os_error: std::io::Error) -> Self {
        Self::with_source(
            ErrorCategory::Internal,
            ErrorKind::PlatformCallFailed {
                operation,
                os_error: os_error.raw_os_error(),
            },
            format!("{} failed: {}", operation, os_error),
            os_error,
        )
    }

    /// The user-facing message carried by the error.
    pub fn message(&self) -> &str {
        &self.msg
    }

    /// Returns the preserved source error if present.
    pub fn source_error(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    /// The message followed by each cause not already part of it, joined by
    /// `": "`. Used by the binaries so context never hides the underlying reason.
    pub fn display_chain(&self) -> String {
        let mut out = self.msg.clone();
        let mut next = self.source_error().map(|e| e as &(dyn StdError + 'static));
        while let Some(err) = next {
            let msg = err.to_string();
            if !out.contains(&msg) {
                out.push_str(": ");
                out.push_str(&msg);
            }
            next = err.source();
        }
        out
    }

    /// Returns true if the platform primitive itself reported failure.
    pub fn is_platform_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::PlatformCallFailed { .. })
    }

    /// Wraps the current error with a higher-level message while preserving the original as source.
    pub fn with_context(self, msg: impl Into<String>) -> Self {
        let category = self.category;
        let kind = self.kind;
        Self {
            category,
            kind,
            source: Some(Box::new(self)),
            msg: msg.into(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DpapiError>;
