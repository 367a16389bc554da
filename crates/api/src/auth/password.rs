//! Argon2id password verification.
//!
//! Password creation and resets are handled by the external account
//! service; this module only verifies at login. Hashes use the PHC string
//! format so algorithm parameters and salt travel with the hash.

use argon2::password_hash::{PasswordHash, PasswordVerifier};
use argon2::Argon2;

/// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use argon2::password_hash::rand_core::OsRng;
    use argon2::password_hash::{PasswordHasher, SaltString};

    use super::*;

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .expect("hashing should succeed")
            .to_string()
    }

    #[test]
    fn correct_password_verifies() {
        let stored = hash("correct-horse-battery-staple");
        assert!(verify_password("correct-horse-battery-staple", &stored).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected_without_error() {
        let stored = hash("correct-horse-battery-staple");
        assert!(!verify_password("tr0ub4dor&3", &stored).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
