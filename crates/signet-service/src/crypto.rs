use std::num::NonZeroU32;

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

const OUTPUT_LEN: usize = 32;

pub const SALT_LEN: usize = 64;

/// Derive the stored password hash: PBKDF2-HMAC-SHA256 over the submitted
/// password with a random per-user salt and configured iteration count.
pub fn hash_password(password: &[u8], salt: &[u8], iterations: u32) -> Vec<u8> {
    let mut out = vec![0u8; OUTPUT_LEN];
    let iterations = NonZeroU32::new(iterations).expect("Iterations must be non-zero");
    pbkdf2_hmac::<Sha256>(password, salt, iterations.get(), &mut out);
    out
}

pub fn verify_password(password: &[u8], salt: &[u8], expected: &[u8], iterations: u32) -> bool {
    let iterations = NonZeroU32::new(iterations).expect("Iterations must be non-zero");
    if expected.len() != OUTPUT_LEN {
        return false;
    }

    // Derive and constant-time compare.
    let mut out = vec![0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(password, salt, iterations.get(), &mut out);
    subtle::ConstantTimeEq::ct_eq(out.as_ref(), expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let salt = b"0123456789abcdef";
        let hash = hash_password(b"password", salt, 1_000);
        assert_eq!(hash.len(), OUTPUT_LEN);
        assert!(verify_password(b"password", salt, &hash, 1_000));
    }

    #[test]
    fn wrong_password_rejected() {
        let salt = b"0123456789abcdef";
        let hash = hash_password(b"password", salt, 1_000);
        assert!(!verify_password(b"p@ssword", salt, &hash, 1_000));
    }

    #[test]
    fn wrong_salt_rejected() {
        let hash = hash_password(b"password", b"salt-one", 1_000);
        assert!(!verify_password(b"password", b"salt-two", &hash, 1_000));
    }

    #[test]
    fn malformed_stored_hash_rejected() {
        assert!(!verify_password(b"password", b"salt", b"too-short", 1_000));
    }

    #[test]
    fn same_password_different_salt_differs() {
        let a = hash_password(b"password", b"salt-one", 1_000);
        let b = hash_password(b"password", b"salt-two", 1_000);
        assert_ne!(a, b);
    }
}
