//! OAuth2 Authorization Code flow for installed apps.
//!
//! 1. Binds a loopback listener on an ephemeral port
//! 2. Opens the browser to the authorization URL
//! 3. Waits for the redirect carrying `?code=...`
//! 4. Exchanges the code for an access token (+ refresh token)

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

use crate::error::OAuthError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>, // Unix timestamp
    pub token_type: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub auth_url: String,
    pub token_url: String,
    pub scopes: Vec<String>,
}

impl OAuthConfig {
    pub fn redirect_uri(port: u16) -> String {
        format!("http://127.0.0.1:{port}/")
    }

    pub fn auth_url_full(&self, redirect_uri: &str) -> Result<Url, OAuthError> {
        let mut url = Url::parse(&self.auth_url)
            .map_err(|e| OAuthError::AuthorizationFailed(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        Ok(url)
    }
}

/// Run the full flow: listen -> open browser -> wait for callback -> exchange code.
pub async fn authorize(
    http: &Client,
    config: &OAuthConfig,
    timeout: Duration,
) -> Result<OAuthTokens, OAuthError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| OAuthError::AuthorizationFailed(format!("cannot bind callback port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| OAuthError::AuthorizationFailed(e.to_string()))?
        .port();
    let redirect_uri = OAuthConfig::redirect_uri(port);

    let auth_url = config.auth_url_full(&redirect_uri)?;
    tracing::info!("opening browser for Google sign-in");
    if let Err(e) = open::that(auth_url.as_str()) {
        tracing::warn!("could not open browser ({e}); visit this URL manually: {auth_url}");
    }

    let code = tokio::time::timeout(timeout, wait_for_code(&listener)).await??;
    exchange_code(http, config, &code, &redirect_uri).await
}

/// Accept one redirect request and answer the browser.
async fn wait_for_code(listener: &TcpListener) -> Result<String, OAuthError> {
    let (mut stream, _) = listener
        .accept()
        .await
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;
    let mut buf = [0u8; 4096];
    let n = stream
        .read(&mut buf)
        .await
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;
    let request = String::from_utf8_lossy(&buf[..n]);

    let outcome = parse_callback(&request);
    let page = match &outcome {
        Ok(_) => "<h2>Authentication successful!</h2><p>You can close this tab.</p>",
        Err(_) => "<h2>Authentication failed.</h2><p>Return to the terminal for details.</p>",
    };
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n<html><body>{page}</body></html>"
    );
    // The browser page is cosmetic; the code is what matters.
    let _ = stream.write_all(response.as_bytes()).await;
    outcome
}

/// Extract the authorization code from `GET /?code=XXX&...`.
fn parse_callback(request: &str) -> Result<String, OAuthError> {
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| OAuthError::InvalidCallback("empty request".into()))?;
    let url = Url::parse(&format!("http://127.0.0.1{path}"))
        .map_err(|e| OAuthError::InvalidCallback(e.to_string()))?;

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "error" => return Err(OAuthError::AuthorizationFailed(value.to_string())),
            _ => {}
        }
    }
    code.ok_or_else(|| OAuthError::InvalidCallback("no code in callback".into()))
}

/// Exchange authorization code for tokens.
async fn exchange_code(
    http: &Client,
    config: &OAuthConfig,
    code: &str,
    redirect_uri: &str,
) -> Result<OAuthTokens, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("code", code),
        ("grant_type", "authorization_code"),
        ("redirect_uri", redirect_uri),
    ];

    let body = post_token_request(http, &config.token_url, &params)
        .await
        .map_err(OAuthError::TokenExchangeFailed)?;
    tokens_from_response(&body, None).map_err(OAuthError::TokenExchangeFailed)
}

/// Refresh an access token using a refresh token.
pub async fn refresh_token(
    http: &Client,
    config: &OAuthConfig,
    refresh: &str,
) -> Result<OAuthTokens, OAuthError> {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
        ("refresh_token", refresh),
        ("grant_type", "refresh_token"),
    ];

    let body = post_token_request(http, &config.token_url, &params)
        .await
        .map_err(OAuthError::TokenRefreshFailed)?;
    // Google omits the refresh token on refresh; keep the one we have.
    tokens_from_response(&body, Some(refresh)).map_err(OAuthError::TokenRefreshFailed)
}

async fn post_token_request(
    http: &Client,
    token_url: &str,
    params: &[(&str, &str)],
) -> Result<serde_json::Value, String> {
    let resp = http
        .post(token_url)
        .form(params)
        .send()
        .await
        .map_err(|e| e.to_string())?;
    let body: serde_json::Value = resp.json().await.map_err(|e| e.to_string())?;

    if let Some(error) = body.get("error") {
        let detail = body
            .get("error_description")
            .and_then(|v| v.as_str())
            .map(|d| format!(" ({d})"))
            .unwrap_or_default();
        let error = error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(format!("{error}{detail}"));
    }
    Ok(body)
}

fn tokens_from_response(
    body: &serde_json::Value,
    previous_refresh: Option<&str>,
) -> Result<OAuthTokens, String> {
    let access_token = body["access_token"]
        .as_str()
        .filter(|t| !t.is_empty())
        .ok_or("missing access_token in response")?
        .to_string();

    let expires_in = body.get("expires_in").and_then(|v| v.as_i64());
    let expires_at = expires_in.map(|ei| chrono::Utc::now().timestamp() + ei);

    Ok(OAuthTokens {
        access_token,
        refresh_token: body
            .get("refresh_token")
            .and_then(|v| v.as_str())
            .map(String::from)
            .or_else(|| previous_refresh.map(String::from)),
        expires_at,
        token_type: body["token_type"].as_str().unwrap_or("Bearer").to_string(),
        scope: body.get("scope").and_then(|v| v.as_str()).map(String::from),
    })
}

/// Check if stored tokens are expired (with 60s buffer).
pub fn is_expired(tokens: &OAuthTokens) -> bool {
    match tokens.expires_at {
        Some(exp) => chrono::Utc::now().timestamp() > exp - 60,
        None => false,
    }
}
