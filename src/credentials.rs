use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::CredentialError;

/// Encodes and checks the gateway's single static `username:password` pair.
///
/// This is a shared-secret check with plain string comparison, not an
/// authentication scheme.
#[derive(Debug, Clone)]
pub struct CredentialCodec {
    username: String,
    password: String,
}

impl CredentialCodec {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `base64("<username>:<key>")`
    pub fn encode(&self, key: &str) -> String {
        STANDARD.encode(format!("{}:{key}", self.username))
    }

    /// Decodes `encoded` and compares both halves, split at the first `:`,
    /// with the configured pair.
    pub fn verify(&self, encoded: &str) -> Result<bool, CredentialError> {
        let decoded = String::from_utf8(STANDARD.decode(encoded.trim())?)?;
        let verified = match decoded.split_once(':') {
            Some((username, password)) => username == self.username && password == self.password,
            None => false,
        };
        Ok(verified)
    }
}
