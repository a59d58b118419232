//! Google OAuth client secrets (`credentials.json` from the Cloud console).

use std::path::Path;

use serde::Deserialize;

use super::oauth::OAuthConfig;
use crate::error::OAuthError;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const DEFAULT_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// Console downloads wrap the secrets in `installed` or `web`.
#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    pub fn load(path: &Path) -> Result<Self, OAuthError> {
        if !path.exists() {
            return Err(OAuthError::CredentialsNotConfigured(format!(
                "client secrets file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            OAuthError::CredentialsNotConfigured(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, OAuthError> {
        let file: SecretsFile = serde_json::from_str(text).map_err(|e| {
            OAuthError::CredentialsNotConfigured(format!("invalid client secrets: {e}"))
        })?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            OAuthError::CredentialsNotConfigured(
                "client secrets have neither an 'installed' nor a 'web' section".into(),
            )
        })?;
        if secrets.client_id.is_empty() {
            return Err(OAuthError::CredentialsNotConfigured("empty client_id".into()));
        }
        Ok(secrets)
    }

    pub fn oauth_config(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            auth_url: self
                .auth_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTH_URL.to_string()),
            token_url: self
                .token_uri
                .clone()
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            scopes: vec![CALENDAR_SCOPE.to_string()],
        }
    }
}
