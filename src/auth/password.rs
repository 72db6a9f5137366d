//! Password hashing and verification.

use super::error::AuthError;

/// Hash a plaintext password with a per-call random salt.
///
/// The plaintext is never logged; a hashing failure is fatal rather than
/// falling back to a weaker digest.
pub fn hash(plaintext: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(plaintext, cost).map_err(AuthError::Hashing)
}

/// Verify a plaintext password against a stored digest.
///
/// Malformed digests count as a mismatch, not an error; the caller treats
/// both the same way.
#[must_use]
pub fn verify(plaintext: &str, digest: &str) -> bool {
    bcrypt::verify(plaintext, digest).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Cost 10 keeps the test suite responsive; production default is 12.
    const TEST_COST: u32 = 10;

    #[test]
    fn digest_never_equals_plaintext() {
        let digest = hash("Pw1!", TEST_COST).expect("hash");
        assert_ne!(digest, "Pw1!");
    }

    #[test]
    fn verify_accepts_matching_password() {
        let digest = hash("correct horse battery staple", TEST_COST).expect("hash");
        assert!(verify("correct horse battery staple", &digest));
    }

    #[test]
    fn verify_rejects_other_passwords() {
        let digest = hash("correct horse battery staple", TEST_COST).expect("hash");
        assert!(!verify("correct horse battery stapler", &digest));
        assert!(!verify("", &digest));
    }

    #[test]
    fn verify_rejects_garbage_digest() {
        assert!(!verify("anything", "not-a-bcrypt-digest"));
    }

    #[test]
    fn salts_differ_between_calls() {
        let first = hash("same input", TEST_COST).expect("hash");
        let second = hash("same input", TEST_COST).expect("hash");
        assert_ne!(first, second);
    }
}
