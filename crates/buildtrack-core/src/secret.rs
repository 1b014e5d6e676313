//! Secret values held in configuration.

use hmac::{Hmac, Mac};
use sha2::Sha256;

/// A credential that must never reach logs.
///
/// `Debug` and `Display` are redacted; use [`SecretString::expose`] at the
/// single point where the raw value is sent over the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Compare against a presented token in constant time.
    ///
    /// Both values are run through HMAC-SHA256 keyed by the secret and the
    /// fixed-size tags are compared, so neither content nor length leaks.
    pub fn matches(&self, candidate: &str) -> bool {
        let tag = |value: &str| {
            let mut mac = Hmac::<Sha256>::new_from_slice(self.0.as_bytes()).ok()?;
            mac.update(value.as_bytes());
            Some(mac)
        };
        match (tag(&self.0), tag(candidate)) {
            (Some(expected), Some(presented)) => presented
                .verify_slice(&expected.finalize().into_bytes())
                .is_ok(),
            _ => false,
        }
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretString(***)")
    }
}

impl std::fmt::Display for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("***")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::new("hunter2");
        assert_eq!(format!("{:?}", secret), "SecretString(***)");
        assert_eq!(secret.to_string(), "***");
        assert_eq!(secret.expose(), "hunter2");
    }

    #[test]
    fn test_matches() {
        let secret = SecretString::new("s3cret");
        assert!(secret.matches("s3cret"));
        assert!(!secret.matches("s3creT"));
        assert!(!secret.matches("s3cret "));
        assert!(!secret.matches(""));
        assert!(!secret.matches("s3c"));
        assert!(!secret.matches(&"s3cret".repeat(40)));
    }

    #[test]
    fn test_empty_secret_only_matches_empty() {
        let secret = SecretString::new("");
        assert!(secret.matches(""));
        assert!(!secret.matches("x"));
    }
}
