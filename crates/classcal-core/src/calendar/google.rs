//! Google Calendar v3 REST client.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use url::Url;

use super::{CalendarService, EventPayload, RemoteEvent, IDENTITY_PROPERTY};
use crate::auth::AccessTokenProvider;
use crate::error::RemoteError;
use crate::identity::EventIdentity;

/// Production API root.
pub const GOOGLE_CALENDAR_API: &str = "https://www.googleapis.com/calendar/v3/";

/// Google Calendar client authenticated through an [`AccessTokenProvider`].
pub struct GoogleCalendarClient<T> {
    http: Client,
    base_url: Url,
    tokens: T,
}

impl<T: AccessTokenProvider> GoogleCalendarClient<T> {
    /// Client for the public Google endpoint.
    pub fn new(tokens: T) -> Self {
        Self::with_base_url(tokens, GOOGLE_CALENDAR_API)
            .expect("GOOGLE_CALENDAR_API is a valid URL")
    }

    /// Client for another API root (used to point tests at a mock server).
    pub fn with_base_url(tokens: T, base_url: &str) -> Result<Self, RemoteError> {
        let mut base_url = Url::parse(base_url)
            .map_err(|e| RemoteError::Decode(format!("invalid base URL '{base_url}': {e}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http: Client::new(),
            base_url,
            tokens,
        })
    }

    /// `{base}/calendars/{calendar_id}/events`, with the id percent-encoded.
    fn events_url(&self, calendar_id: &str) -> Result<Url, RemoteError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RemoteError::Decode("base URL cannot hold a path".into()))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);
        Ok(url)
    }
}

#[async_trait]
impl<T: AccessTokenProvider> CalendarService for GoogleCalendarClient<T> {
    async fn find_event_by_identity(
        &self,
        calendar_id: &str,
        identity: &EventIdentity,
    ) -> Result<Option<RemoteEvent>, RemoteError> {
        let token = self.tokens.access_token().await?;
        let url = self.events_url(calendar_id)?;
        let filter = format!("{IDENTITY_PROPERTY}={identity}");

        tracing::debug!(%calendar_id, %identity, "looking up event");
        let resp = self
            .http
            .get(url)
            .bearer_auth(&token)
            .query(&[
                ("privateExtendedProperty", filter.as_str()),
                ("showDeleted", "false"),
                ("maxResults", "1"),
            ])
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let body: serde_json::Value = resp.json().await?;
        let items = body["items"]
            .as_array()
            .ok_or_else(|| RemoteError::Decode("missing items in response".into()))?;

        match items.first() {
            Some(item) => Ok(Some(serde_json::from_value(item.clone()).map_err(|e| {
                RemoteError::Decode(format!("invalid event in response: {e}"))
            })?)),
            None => Ok(None),
        }
    }

    async fn create_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> Result<RemoteEvent, RemoteError> {
        let token = self.tokens.access_token().await?;
        let url = self.events_url(calendar_id)?;

        tracing::debug!(%calendar_id, id = %payload.id, "creating event");
        let resp = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(payload)
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(RemoteError::Conflict(payload.id.clone()));
        }
        let resp = check_status(resp).await?;

        resp.json::<RemoteEvent>()
            .await
            .map_err(|e| RemoteError::Decode(format!("invalid event in response: {e}")))
    }
}

/// Map an unsuccessful response onto a [`RemoteError`].
async fn check_status(resp: Response) -> Result<Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["error"]["message"]
        .as_str()
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();
    let reason = body["error"]["errors"][0]["reason"].as_str().unwrap_or("");

    Err(match status {
        StatusCode::UNAUTHORIZED => RemoteError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => RemoteError::RateLimited,
        StatusCode::FORBIDDEN
            if matches!(reason, "rateLimitExceeded" | "userRateLimitExceeded") =>
        {
            RemoteError::RateLimited
        }
        _ => RemoteError::Api {
            status: status.as_u16(),
            message,
        },
    })
}
