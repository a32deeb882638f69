//! Credential hashing and verification.
//!
//! Argon2 with the library's fixed default parameters and a random salt per
//! call, so hashing the same plaintext twice yields different digests. The
//! work happens on the blocking thread pool: the KDF's fixed CPU cost must
//! not stall the async request workers.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{UserError, UserResult};

/// Hash a plaintext password into a PHC-format digest.
pub async fn hash(plaintext: String) -> UserResult<String> {
    tokio::task::spawn_blocking(move || hash_blocking(&plaintext))
        .await
        .map_err(|e| UserError::Internal(format!("hashing task failed: {}", e)))?
}

/// Verify a plaintext password against a stored digest.
///
/// Returns `Ok(false)` on mismatch; fails only when the stored digest
/// itself cannot be parsed.
pub async fn verify(plaintext: String, digest: String) -> UserResult<bool> {
    tokio::task::spawn_blocking(move || verify_blocking(&plaintext, &digest))
        .await
        .map_err(|e| UserError::Internal(format!("verification task failed: {}", e)))?
}

/// Synchronous hashing, for callers already off the async runtime.
pub fn hash_blocking(plaintext: &str) -> UserResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| UserError::Internal(format!("password hashing failed: {}", e)))
}

/// Synchronous verification, for callers already off the async runtime.
pub fn verify_blocking(plaintext: &str, digest: &str) -> UserResult<bool> {
    let parsed_hash = PasswordHash::new(digest).map_err(|_| UserError::CorruptCredential)?;

    Ok(Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_digest_is_not_the_plaintext_and_verifies() {
        let digest = hash("Secret1A".to_string()).await.unwrap();
        assert_ne!(digest, "Secret1A");
        assert!(verify("Secret1A".to_string(), digest).await.unwrap());
    }

    #[tokio::test]
    async fn test_same_plaintext_hashes_differently() {
        let first = hash("Secret1A".to_string()).await.unwrap();
        let second = hash("Secret1A".to_string()).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_mismatch_is_false_not_error() {
        let digest = hash("Secret1A".to_string()).await.unwrap();
        assert!(!verify("WrongPass1".to_string(), digest).await.unwrap());
    }

    #[test]
    fn test_corrupt_digest_is_distinct_from_mismatch() {
        let err = verify_blocking("Secret1A", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, UserError::CorruptCredential));
    }
}
