use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// A stored hash that cannot be parsed counts as a mismatch, not an error.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "stored password hash is malformed");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

/// Minimum 8 characters, at least one uppercase letter, one lowercase letter
/// and one digit.
pub fn check_strength(plain: &str) -> Result<(), &'static str> {
    if plain.chars().count() < 8 {
        return Err("password must be at least 8 characters long");
    }
    if !plain.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("password must contain an uppercase letter");
    }
    if !plain.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("password must contain a lowercase letter");
    }
    if !plain.chars().any(|c| c.is_ascii_digit()) {
        return Err("password must contain a digit");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "Correct-h0rse-Battery";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn hashes_are_salted_and_both_verify() {
        let password = "Abcdef12";
        let first = hash_password(password).expect("hashing should succeed");
        let second = hash_password(password).expect("hashing should succeed");
        assert_ne!(first, second);
        assert!(verify_password(password, &first));
        assert!(verify_password(password, &second));
    }

    #[test]
    fn verify_returns_false_on_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn verify_returns_false_on_truncated_hash() {
        let hash = hash_password("Abcdef12").expect("hashing should succeed");
        let truncated = &hash[..hash.len() / 2];
        assert!(!verify_password("Abcdef12", truncated));
    }

    #[test]
    fn strength_policy_cases() {
        assert!(check_strength("Abcdef12").is_ok());
        assert!(check_strength("Ab1").is_err());
        assert!(check_strength("abcdef12").is_err());
        assert!(check_strength("ABCDEF12").is_err());
        assert!(check_strength("Abcdefgh").is_err());
    }
}
