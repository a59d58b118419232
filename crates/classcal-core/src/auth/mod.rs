//! Google sign-in and access-token handling.
//!
//! [`Authenticator`] owns the OAuth client configuration and a [`TokenStore`].
//! It is built once per run and handed to the calendar client as an
//! [`AccessTokenProvider`], which refreshes the access token on demand.

pub mod oauth;
pub mod secrets;
pub mod store;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Mutex;

use crate::error::OAuthError;

pub use oauth::{OAuthConfig, OAuthTokens};
pub use secrets::ClientSecrets;
pub use store::{KeyringTokenStore, MemoryTokenStore, TokenStore};

/// Seconds to wait for the browser redirect.
pub const CALLBACK_TIMEOUT_SECS: u64 = 300;

const SERVICE_NAME: &str = "google";

/// Source of bearer tokens for API calls.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, OAuthError>;
}

/// Fixed token; useful for tests and externally managed credentials.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl AccessTokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, OAuthError> {
        Ok(self.0.clone())
    }
}

pub struct Authenticator<S> {
    oauth: OAuthConfig,
    store: S,
    http: Client,
    cache: Mutex<Option<OAuthTokens>>,
}

impl<S: TokenStore> Authenticator<S> {
    pub fn new(oauth: OAuthConfig, store: S) -> Self {
        Self {
            oauth,
            store,
            http: Client::new(),
            cache: Mutex::new(None),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run the interactive browser flow and store the result.
    pub async fn login(&self) -> Result<(), OAuthError> {
        let tokens = self.authorize().await?;
        *self.cache.lock().await = Some(tokens);
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), OAuthError> {
        self.store.clear()?;
        *self.cache.lock().await = None;
        Ok(())
    }

    /// Whether tokens are stored (they may still need a refresh).
    pub fn is_authenticated(&self) -> Result<bool, OAuthError> {
        Ok(self.store.load()?.is_some())
    }

    /// Make sure a usable token exists before the run starts.
    ///
    /// A stored token is reused, an expired one is refreshed, and when there
    /// is nothing usable the interactive flow runs.
    pub async fn ensure_authenticated(&self) -> Result<(), OAuthError> {
        let mut cache = self.cache.lock().await;
        let tokens = match self.store.load()? {
            Some(tokens) if !oauth::is_expired(&tokens) => tokens,
            Some(tokens) => match self.refresh(&tokens).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    tracing::warn!("stored credentials could not be refreshed ({e}); signing in again");
                    self.store.clear()?;
                    self.authorize().await?
                }
            },
            None => self.authorize().await?,
        };
        *cache = Some(tokens);
        Ok(())
    }

    async fn authorize(&self) -> Result<OAuthTokens, OAuthError> {
        let tokens = oauth::authorize(
            &self.http,
            &self.oauth,
            Duration::from_secs(CALLBACK_TIMEOUT_SECS),
        )
        .await?;
        self.store.save(&tokens)?;
        tracing::info!("signed in to Google Calendar");
        Ok(tokens)
    }

    async fn refresh(&self, tokens: &OAuthTokens) -> Result<OAuthTokens, OAuthError> {
        let refresh = tokens
            .refresh_token
            .as_deref()
            .ok_or_else(|| OAuthError::TokenRefreshFailed("no refresh token stored".into()))?;
        let fresh = oauth::refresh_token(&self.http, &self.oauth, refresh).await?;
        self.store.save(&fresh)?;
        tracing::debug!("access token refreshed");
        Ok(fresh)
    }
}

#[async_trait]
impl<S: TokenStore> AccessTokenProvider for Authenticator<S> {
    /// Current access token, refreshed when it is about to expire.
    async fn access_token(&self) -> Result<String, OAuthError> {
        let mut cache = self.cache.lock().await;
        let tokens = match cache.take() {
            Some(tokens) => tokens,
            None => self.store.load()?.ok_or_else(|| OAuthError::NotAuthenticated {
                service: SERVICE_NAME.to_string(),
            })?,
        };
        let tokens = if oauth::is_expired(&tokens) {
            match self.refresh(&tokens).await {
                Ok(fresh) => fresh,
                Err(e) => {
                    *cache = Some(tokens);
                    return Err(e);
                }
            }
        } else {
            tokens
        };
        let access = tokens.access_token.clone();
        *cache = Some(tokens);
        Ok(access)
    }
}
