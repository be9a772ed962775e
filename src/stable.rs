//! Stability self-check
//!
//! Protects a fixed string and a fixed byte sequence, stores the blobs in a
//! per-user, per-host JSON fixture the first time it runs, and on every run
//! checks that the stored blobs still unprotect to the expected values. Run
//! it across reboots or key rotations to confirm old data stays readable.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::armor;
use crate::backend::Backend;
use crate::error::{DpapiError, ErrorCategory, ErrorKind, Result};
use crate::protector::Protector;

pub const STABLE_STRING: &str = "Hello World!";

/// Hex encoded.
pub const STABLE_BYTES: &str = "0102030405";

/// On-disk fixture. Blobs are base64, `stable_bytes` is hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableFile {
    pub stable_string: String,
    pub stable_bytes: String,
    pub user_string: String,
    pub user_bytes: String,
}

/// Fixture name for a domain, host and user: `{domain}.{host}.{user}.stable.json`.
pub fn fixture_name(domain: &str, host: &str, user: &str) -> String {
    format!("{}.{}.{}.stable.json", domain, host, user)
}

/// Default fixture path in `dir`, named after the current Windows session.
pub fn default_fixture_path(dir: &Path) -> Result<PathBuf> {
    let domain = env_component("USERDOMAIN")?;
    let host = env_component("COMPUTERNAME")?;
    let user = env_component("USERNAME")?;
    Ok(dir.join(fixture_name(&domain, &host, &user)))
}

fn env_component(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        Ok(_) => Err(DpapiError::new(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("environment variable {} is empty", name),
        )),
        Err(e) => Err(DpapiError::with_source(
            ErrorCategory::User,
            ErrorKind::Io,
            format!("cannot determine fixture name from {}", name),
            e,
        )),
    }
}

/// Protect the stable values with the default (current user) scope.
pub fn encrypt<B: Backend>(protector: &Protector<B>) -> Result<StableFile> {
    let user_string = protector
        .encrypt(STABLE_STRING)
        .map_err(|e| e.with_context("failed to encrypt stable string"))?;
    let bytes = armor::from_hex(STABLE_BYTES)?;
    let user_bytes = protector
        .encrypt_bytes(&bytes)
        .map_err(|e| e.with_context("failed to encrypt stable bytes"))?;
    Ok(StableFile {
        stable_string: STABLE_STRING.to_string(),
        stable_bytes: STABLE_BYTES.to_string(),
        user_string,
        user_bytes: armor::wrap(&user_bytes),
    })
}

/// Decrypt the blobs in `stored` and compare them with the expected values.
pub fn compare<B: Backend>(
    protector: &Protector<B>,
    stored: &StableFile,
    out: &mut dyn Write,
) -> Result<()> {
    let decrypted = protector
        .decrypt(&stored.user_string)
        .map_err(|e| e.with_context("failed to decrypt user string"))?;
    if decrypted != STABLE_STRING {
        return Err(mismatch(format!(
            "user string doesn't match: decrypted '{}' (expected '{}')",
            decrypted, STABLE_STRING
        )));
    }
    report(out, "user string matches")?;

    let blob = armor::unwrap(&stored.user_bytes)
        .map_err(|e| e.with_context("failed to decode user bytes"))?;
    let decrypted = protector
        .decrypt_bytes(&blob)
        .map_err(|e| e.with_context("failed to decrypt user bytes"))?;
    let decrypted = armor::to_hex(&decrypted);
    if decrypted != STABLE_BYTES {
        return Err(mismatch(format!(
            "user bytes don't match: decrypted '{}' (expected '{}')",
            decrypted, STABLE_BYTES
        )));
    }
    report(out, "user bytes matches")?;
    Ok(())
}

/// Run the full check against the fixture at `path`, creating it if needed.
pub fn run<B: Backend>(protector: &Protector<B>, path: &Path, out: &mut dyn Write) -> Result<()> {
    let fresh = encrypt(protector)?;

    let exists = path.try_exists().map_err(|e| io_error(path, "failed to stat", e))?;
    if !exists {
        report(out, &format!("writing: {}", path.display()))?;
        write_fixture(path, &fresh)?;
    }

    let written = fixture_date(path)?;
    report(out, &format!("reading: {} (from {})", path.display(), written))?;
    let stored = read_fixture(path)?;
    compare(protector, &stored, out)?;
    report(out, "all fields match")?;
    Ok(())
}

/// Local modification date of the fixture, as `YYYY-MM-DD`.
pub fn fixture_date(path: &Path) -> Result<String> {
    let modified = fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| io_error(path, "failed to read modification time of", e))?;
    Ok(DateTime::<Local>::from(modified).format("%Y-%m-%d").to_string())
}

pub fn read_fixture(path: &Path) -> Result<StableFile> {
    let body = fs::read(path).map_err(|e| io_error(path, "failed to read from", e))?;
    serde_json::from_slice(&body).map_err(|e| {
        DpapiError::with_source(
            ErrorCategory::User,
            ErrorKind::Fixture,
            format!("{} is not a valid fixture: {}", path.display(), e),
            e,
        )
    })
}

pub fn write_fixture(path: &Path, fixture: &StableFile) -> Result<()> {
    let body = serde_json::to_vec_pretty(fixture).map_err(|e| {
        DpapiError::with_source(
            ErrorCategory::Internal,
            ErrorKind::Fixture,
            "failed to serialize fixture",
            e,
        )
    })?;
    write_file_secure(path, &body)
}

/// Write file with secure permissions (0o600 on Unix)
fn write_file_secure(path: &Path, contents: &[u8]) -> Result<()> {
    #[cfg(unix)]
    {
        use std::fs::OpenOptions;
        use std::os::unix::fs::OpenOptionsExt;

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .map_err(|e| io_error(path, "failed to open", e))?;
        file.write_all(contents)
            .map_err(|e| io_error(path, "failed to write", e))?;
        Ok(())
    }

    #[cfg(not(unix))]
    {
        fs::write(path, contents).map_err(|e| io_error(path, "failed to write", e))
    }
}

fn report(out: &mut dyn Write, line: &str) -> Result<()> {
    writeln!(out, "{}", line).map_err(|e| {
        DpapiError::with_source(
            ErrorCategory::Internal,
            ErrorKind::Io,
            "failed to write report",
            e,
        )
    })
}

fn mismatch(msg: String) -> DpapiError {
    DpapiError::new(ErrorCategory::Internal, ErrorKind::Mismatch, msg)
}

fn io_error(path: &Path, action: &str, err: io::Error) -> DpapiError {
    let category = if err.kind() == io::ErrorKind::NotFound {
        ErrorCategory::User
    } else {
        ErrorCategory::Internal
    };
    DpapiError::with_source(
        category,
        ErrorKind::Io,
        format!("{} {}", action, path.display()),
        err,
    )
}
