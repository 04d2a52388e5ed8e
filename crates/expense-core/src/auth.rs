//! Password hashing for stored user documents.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};

use crate::CoreError;

/// Hashes a password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, CoreError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| CoreError::PasswordHash(err.to_string()))
}

/// Checks `password` against a stored PHC hash string.
///
/// A malformed stored hash is reported as `InvalidCredentials` rather than leaking
/// storage details to the caller.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), CoreError> {
    let parsed = PasswordHash::new(password_hash).map_err(|err| {
        tracing::warn!("stored password hash is unreadable: {err}");
        CoreError::InvalidCredentials
    })?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| CoreError::InvalidCredentials)
}
