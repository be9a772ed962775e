//! Round trips through the real Windows Data Protection API

#![cfg(windows)]

use dpapi::{ErrorKind, Operation, Scope};

#[test]
fn test_string() {
    let secret = "Hello World!;";
    let enc = dpapi::encrypt(secret).unwrap();
    assert_eq!(dpapi::decrypt(&enc).unwrap(), secret);
}

#[test]
fn test_bytes() {
    let secret = b"Hello World!;";
    let enc = dpapi::encrypt_bytes(secret).unwrap();
    assert_eq!(dpapi::decrypt_bytes(&enc).unwrap(), secret);
}

#[test]
fn test_fixed_bytes() {
    let secret = [0x01, 0x02, 0x03, 0x04, 0x05];
    let enc = dpapi::encrypt_bytes(&secret).unwrap();
    assert_eq!(dpapi::decrypt_bytes(&enc).unwrap(), secret);
}

#[test]
fn test_machine_local_string() {
    let secret = "Hello World!;";
    let enc = dpapi::encrypt_machine_local(secret).unwrap();
    assert_eq!(dpapi::decrypt(&enc).unwrap(), secret);
}

#[test]
fn test_machine_local_bytes() {
    let secret = b"Hello World!;";
    let enc = dpapi::encrypt_bytes_machine_local(secret).unwrap();
    assert_eq!(dpapi::decrypt_bytes(&enc).unwrap(), secret);
}

#[test]
fn test_entropy_string() {
    let secret = "Hello World!;";
    let enc = dpapi::encrypt_entropy(secret, "something").unwrap();
    assert_eq!(dpapi::decrypt_entropy(&enc, "something").unwrap(), secret);
}

#[test]
fn test_entropy_bytes() {
    let secret = b"Hello World!;";
    let enc = dpapi::encrypt_bytes_entropy(secret, b"something").unwrap();
    assert_eq!(dpapi::decrypt_bytes_entropy(&enc, b"something").unwrap(), secret);
}

#[test]
fn test_wrong_entropy_fails() {
    let enc = dpapi::encrypt_entropy("Hello World!;", "something").unwrap();
    let err = dpapi::decrypt_entropy(&enc, "different").expect_err("expected failure");
    assert!(matches!(
        err.kind,
        ErrorKind::PlatformCallFailed {
            operation: Operation::Unprotect,
            ..
        }
    ));
}

#[test]
fn test_missing_entropy_fails() {
    let enc = dpapi::encrypt_bytes_entropy(b"data", b"something").unwrap();
    let err = dpapi::decrypt_bytes(&enc).expect_err("expected failure");
    assert!(err.is_platform_failure());
}

#[test]
fn test_empty_plaintext() {
    for scope in [Scope::CurrentUser, Scope::LocalMachine] {
        for entropy in [None, Some(&b"e"[..])] {
            let enc = dpapi::protect(&[], scope, entropy).unwrap();
            assert!(!enc.is_empty());
            assert!(dpapi::unprotect(&enc, entropy).unwrap().is_empty());
        }
    }
}

#[test]
fn test_tampered_blob_fails() {
    let mut enc = dpapi::encrypt_bytes(b"Hello World!;").unwrap();
    let last = enc.len() - 1;
    enc[last] ^= 0x01;
    let err = dpapi::decrypt_bytes(&enc).expect_err("expected failure");
    assert!(err.is_platform_failure());
}

#[test]
fn test_not_deterministic_but_roundtrips() {
    let a = dpapi::encrypt_bytes(b"same").unwrap();
    let b = dpapi::encrypt_bytes(b"same").unwrap();
    assert_eq!(dpapi::decrypt_bytes(&a).unwrap(), b"same");
    assert_eq!(dpapi::decrypt_bytes(&b).unwrap(), b"same");
}

#[test]
fn test_large_plaintext() {
    let secret = vec![0x42u8; 128 * 1024];
    let enc = dpapi::encrypt_bytes(&secret).unwrap();
    assert_eq!(dpapi::decrypt_bytes(&enc).unwrap(), secret);
}

#[test]
fn test_concurrent_calls() {
    let handles: Vec<_> = (0..8u8)
        .map(|i| {
            std::thread::spawn(move || {
                let secret = vec![i; 64];
                let enc = dpapi::encrypt_bytes(&secret).unwrap();
                assert_eq!(dpapi::decrypt_bytes(&enc).unwrap(), secret);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}
