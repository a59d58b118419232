//! Token persistence.

use std::sync::Mutex;

use super::oauth::OAuthTokens;
use crate::error::OAuthError;

/// Keyring service name.
pub const KEYRING_SERVICE: &str = "classcal";
const TOKENS_KEY: &str = "google_tokens";

/// Where OAuth tokens live between runs.
pub trait TokenStore: Send + Sync {
    fn load(&self) -> Result<Option<OAuthTokens>, OAuthError>;
    fn save(&self, tokens: &OAuthTokens) -> Result<(), OAuthError>;
    fn clear(&self) -> Result<(), OAuthError>;
}

/// Tokens stored as JSON in the OS keyring.
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
    key: String,
}

impl KeyringTokenStore {
    pub fn new() -> Self {
        Self {
            service: KEYRING_SERVICE.to_string(),
            key: TOKENS_KEY.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry, OAuthError> {
        Ok(keyring::Entry::new(&self.service, &self.key)?)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn load(&self) -> Result<Option<OAuthTokens>, OAuthError> {
        let raw = match self.entry()?.get_password() {
            Ok(pw) => pw,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(tokens) => Ok(Some(tokens)),
            Err(e) => {
                // Unreadable entry: behave as if signed out.
                tracing::warn!("ignoring unreadable stored tokens: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, tokens: &OAuthTokens) -> Result<(), OAuthError> {
        let json = serde_json::to_string(tokens)
            .map_err(|e| OAuthError::Keyring(format!("cannot serialize tokens: {e}")))?;
        self.entry()?.set_password(&json)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), OAuthError> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local store, for tests and one-off runs.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: Mutex<Option<OAuthTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: OAuthTokens) -> Self {
        Self {
            tokens: Mutex::new(Some(tokens)),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<OAuthTokens>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<OAuthTokens>, OAuthError> {
        Ok(self.slot().clone())
    }

    fn save(&self, tokens: &OAuthTokens) -> Result<(), OAuthError> {
        *self.slot() = Some(tokens.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), OAuthError> {
        *self.slot() = None;
        Ok(())
    }
}
