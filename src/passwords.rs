//! PBKDF2-SHA256 password hashing.

use pbkdf2::{
    Algorithm, Params, Pbkdf2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use thiserror::Error;

/// Salt length in bytes.
pub const SALT_LENGTH: usize = 8;

pub const DEFAULT_ROUNDS: u32 = 600_000;

const OUTPUT_LENGTH: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("stored password hash is malformed: {0}")]
    MalformedHash(String),
}

/// PasswordService
///
/// Produces salted one-way hashes in PHC string form
/// (`$pbkdf2-sha256$i=<rounds>,l=32$<salt>$<hash>`). The round count only
/// affects new hashes; verification always uses the parameters embedded in the
/// stored string.
#[derive(Debug, Clone, Copy)]
pub struct PasswordService {
    rounds: u32,
}

impl PasswordService {
    pub fn new(rounds: u32) -> Self {
        Self { rounds }
    }

    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt_bytes: [u8; SALT_LENGTH] = rand::random();
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hashing(e.to_string()))?;

        let params = Params {
            rounds: self.rounds,
            output_length: OUTPUT_LENGTH,
        };

        Pbkdf2
            .hash_password_customized(
                password.as_bytes(),
                Some(Algorithm::Pbkdf2Sha256.ident()),
                None,
                params,
                &salt,
            )
            .map(|h| h.to_string())
            .map_err(|e| PasswordError::Hashing(e.to_string()))
    }

    /// Re-derives `password` with the stored hash's parameters and compares the
    /// outputs in constant time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash =
            PasswordHash::new(hash).map_err(|e| PasswordError::MalformedHash(e.to_string()))?;

        Ok(Pbkdf2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new(DEFAULT_ROUNDS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordService {
        PasswordService::new(1_000)
    }

    #[test]
    fn test_hash_and_verify() {
        let service = fast();
        let password = "correct horse battery staple";

        let hash = service.hash(password).unwrap();
        assert!(service.verify(password, &hash).unwrap());
        assert!(!service.verify("wrong_password", &hash).unwrap());
        assert!(!service.verify("", &hash).unwrap());
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let hash = fast().hash("hunter22").unwrap();
        assert!(!hash.contains("hunter22"));
        assert!(hash.starts_with("$pbkdf2-sha256$"));
        assert!(hash.contains("i=1000"));
    }

    #[test]
    fn test_same_password_gets_fresh_salt() {
        let service = fast();
        let a = service.hash("same").unwrap();
        let b = service.hash("same").unwrap();
        assert_ne!(a, b);
        assert!(service.verify("same", &a).unwrap());
        assert!(service.verify("same", &b).unwrap());
    }

    #[test]
    fn test_verify_uses_embedded_rounds() {
        let hash = PasswordService::new(2_000).hash("pw").unwrap();
        // A service configured differently still verifies older hashes.
        assert!(fast().verify("pw", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        assert!(matches!(
            fast().verify("pw", "not-a-phc-string"),
            Err(PasswordError::MalformedHash(_))
        ));
    }
}
