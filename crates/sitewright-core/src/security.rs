//! Shared-secret verification and log redaction

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Keys whose values never reach the logs
const SENSITIVE_KEYS: [&str; 5] = ["secret", "token", "password", "api_key", "authorization"];

/// The secret every inbound task request must present.
///
/// Comparison hashes both sides to fixed-length digests and folds every byte,
/// so the time taken does not depend on where (or whether) the inputs differ.
#[derive(Clone)]
pub struct SharedSecret {
    digest: [u8; 32],
}

impl SharedSecret {
    pub fn new(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Constant-time check of a caller-provided secret
    pub fn verify(&self, provided: &str) -> bool {
        let candidate: [u8; 32] = Sha256::digest(provided.as_bytes()).into();
        constant_time_eq(&self.digest, &candidate)
    }
}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret(***)")
    }
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let diff = a
        .iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    std::hint::black_box(diff) == 0
}

/// Replace values of sensitive keys with a placeholder before logging
pub fn redact(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(key, value)| {
            let lower = key.to_lowercase();
            if SENSITIVE_KEYS.iter().any(|s| lower.contains(s)) {
                (key.clone(), "***REDACTED***".to_string())
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_match_accepted() {
        let secret = SharedSecret::new("correct horse battery staple");
        assert!(secret.verify("correct horse battery staple"));
    }

    #[test]
    fn test_single_character_difference_rejected() {
        let expected = "s3cret-value";
        let secret = SharedSecret::new(expected);

        for i in 0..expected.len() {
            let mut bytes = expected.as_bytes().to_vec();
            bytes[i] ^= 0x01;
            let candidate = String::from_utf8(bytes).unwrap();
            assert!(!secret.verify(&candidate), "accepted {:?}", candidate);
        }
    }

    #[test]
    fn test_prefix_and_extension_rejected() {
        let secret = SharedSecret::new("abc");
        assert!(!secret.verify(""));
        assert!(!secret.verify("ab"));
        assert!(!secret.verify("abcd"));
        assert!(!secret.verify("ABC"));
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = SharedSecret::new("hunter2");
        assert_eq!(format!("{:?}", secret), "SharedSecret(***)");
    }

    #[test]
    fn test_redact() {
        let mut data = BTreeMap::new();
        data.insert("email".to_string(), "a@b.c".to_string());
        data.insert("secret".to_string(), "x".to_string());
        data.insert("GITHUB_TOKEN".to_string(), "ghp".to_string());

        let redacted = redact(&data);
        assert_eq!(redacted["email"], "a@b.c");
        assert_eq!(redacted["secret"], "***REDACTED***");
        assert_eq!(redacted["GITHUB_TOKEN"], "***REDACTED***");
    }
}
