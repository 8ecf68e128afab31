//! Password hashing, token keys and generated logins

use anyhow::anyhow;
use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use rand::seq::IndexedRandom;

/// Characters used for generated passwords; quotes and backslash are left out
/// so the credentials file stays copy-paste safe
const PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_{|}~";

/// Length of generated passwords
pub const GENERATED_PASSWORD_LEN: usize = 12;

/// Hash a password with Argon2id and a random salt (PHC string)
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow!("failed to hash password: {e}"))
}

/// Check a password against a stored PHC string; malformed hashes never match
pub fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// New API token key: 20 random bytes, hex encoded
pub fn generate_token_key() -> String {
    hex::encode(rand::random::<[u8; 20]>())
}

/// Random password for imported accounts
pub fn generate_password(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .filter_map(|_| PASSWORD_ALPHABET.choose(&mut rng).map(|b| *b as char))
        .collect()
}

/// Login stem derived from a full name: lowercase ASCII letters and digits
/// of every word joined by dots. Falls back to `user` plus random hex.
pub fn username_stem(full_name: &str) -> String {
    let words: Vec<String> = full_name
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .map(|c| c.to_ascii_lowercase())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect();

    if words.is_empty() {
        format!("user{}", hex::encode(rand::random::<[u8; 4]>()))
    } else {
        words.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn token_keys_are_40_hex_chars() {
        let key = generate_token_key();
        assert_eq!(key.len(), 40);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, generate_token_key());
    }

    #[test]
    fn generated_passwords_use_safe_alphabet() {
        let password = generate_password(GENERATED_PASSWORD_LEN);
        assert_eq!(password.chars().count(), GENERATED_PASSWORD_LEN);
        assert!(!password.contains(['"', '\'', '\\', '`']));
    }

    #[test]
    fn stems_from_names() {
        assert_eq!(username_stem("Aibek Asanov"), "aibek.asanov");
        assert_eq!(username_stem("  Mary-Jane  O'Neil "), "maryjane.oneil");
        assert!(username_stem("Айбек").starts_with("user"));
    }
}
