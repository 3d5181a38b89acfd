//! Redacting wrapper for credentials.

use serde::Deserialize;
use std::fmt;

/// A credential that never appears in logs or debug output.
///
/// Used for the document store access token. `Debug` and `Display` print
/// `[REDACTED]`; the value is only reachable through [`expose_secret`].
///
/// [`expose_secret`]: SecretString::expose_secret
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The raw value, for building an `Authorization` header
    #[inline]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_redacted_in_config_debug() {
        #[derive(Debug, Deserialize)]
        struct StoreSection {
            access_token: SecretString,
        }

        let section: StoreSection =
            serde_json::from_str(r#"{"access_token": "ya29.super-secret"}"#).unwrap();
        let rendered = format!("{:?}", section);
        assert!(rendered.contains("[REDACTED]"));
        assert!(!rendered.contains("ya29"));
        assert_eq!(section.access_token.expose_secret(), "ya29.super-secret");
    }

    #[test]
    fn test_display_redacted() {
        assert_eq!(SecretString::new("t").to_string(), "[REDACTED]");
    }
}
