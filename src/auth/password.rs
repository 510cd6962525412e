use rand_core::OsRng;
use super::FailureReason;
use crate::utils::errors::GateError;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

///
/// Check the supplied plaintext against the stored PHC hash.
///
/// The argon2 verifier performs the constant-time comparison for us. Absent or
/// unparsable stored hashes should not occur under normal writes - they are
/// distinguished for logging but the caller surfaces them like any mismatch.
///
/// This is CPU-bound - callers should run it on the blocking pool.
///
pub fn verify(stored_hash: Option<&str>, plain_text_password: &str) -> Result<(), FailureReason> {

    let phc = stored_hash.ok_or(FailureReason::MissingStoredHash)?;

    let parsed_hash = PasswordHash::new(phc)
        .map_err(|_| FailureReason::InvalidStoredHash)?;

    Argon2::default().verify_password(plain_text_password.as_bytes(), &parsed_hash)
        .map_err(|_| FailureReason::PasswordMismatch)
}

///
/// Hash a plaintext into a PHC string ($argon2id$v=19$...) with a fresh salt.
///
pub fn hash_into_phc(plain_text_password: &str) -> Result<String, GateError> {
    let salt = SaltString::generate(&mut OsRng);

    Ok(Argon2::default()
        .hash_password(plain_text_password.as_bytes(), &salt)?
        .to_string())
}
