//! Credential hashing used at registration.
//!
//! The rule layer only ever hashes. Checking a password against a stored
//! credential belongs to whoever authenticates users and is offered here as
//! an inherent method of the concrete hasher.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

/// The hasher could not produce a credential.
#[derive(Error, Debug)]
#[error("failed to hash credential: {0}")]
pub struct CredentialError(String);

impl From<argon2::password_hash::Error> for CredentialError {
    fn from(err: argon2::password_hash::Error) -> Self {
        CredentialError(err.to_string())
    }
}

/// Turns a plaintext password into the opaque string stored on the user.
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError>;
}

/// Argon2id with default parameters, stored in PHC string format.
#[derive(Debug, Clone, Copy, Default)]
pub struct Argon2Hasher;

impl Argon2Hasher {
    /// Checks `plaintext` against a credential produced by [`CredentialHasher::hash`].
    pub fn verify(&self, plaintext: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    }
}

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, CredentialError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(plaintext.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }
}
