//! Opaque login tokens.
//!
//! A token secret is 32 random bytes, hex encoded, and is only ever shown to
//! the client once. The store keeps the SHA-256 digest of the secret.
use rand::RngCore;
use sha2::{Digest, Sha256};

const SECRET_BYTES: usize = 32;

pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn digest(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secrets_are_hex_and_unique() {
        let a = generate_secret();
        let b = generate_secret();
        assert_eq!(a.len(), SECRET_BYTES * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn digest_is_stable_and_hides_secret() {
        let secret = generate_secret();
        assert_eq!(digest(&secret), digest(&secret));
        assert_ne!(digest(&secret), secret);
        assert_ne!(digest("a"), digest("b"));
    }
}
