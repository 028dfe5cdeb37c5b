use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

const SECRET_BYTES: usize = 32;

///
/// Normalise an email for lookups and uniqueness checks.
///
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

///
/// A url-safe random secret for emailed links. Only its digest is ever persisted.
///
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    OsRng.fill_bytes(&mut bytes);
    base64::encode_config(bytes, base64::URL_SAFE_NO_PAD)
}

///
/// Lower-case hex SHA-256 of the input. Used for token fingerprints and stored secret digests.
///
pub fn digest(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

///
/// Build a frontend link carrying a secret, e.g. https://app/reset-password?token=abc
///
pub fn build_link(frontend_url: &str, path: &str, secret: &str) -> String {
    format!("{}/{}?token={}", frontend_url.trim_end_matches('/'), path, secret)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn test_secrets_are_url_safe_and_unique() {
        let first = generate_secret();
        let second = generate_secret();

        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_digest_is_stable_hex() {
        assert_eq!(digest("abc"), "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad");
        assert_eq!(digest("abc").len(), 64);
    }

    #[test]
    fn test_build_link_trims_trailing_slash() {
        assert_eq!(build_link("http://localhost:3000/", "reset-password", "xyz"), "http://localhost:3000/reset-password?token=xyz");
    }
}
