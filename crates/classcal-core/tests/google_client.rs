//! Google Calendar client and token refresh against a mock HTTP server.

use chrono::NaiveDate;
use classcal_core::auth::{
    AccessTokenProvider, Authenticator, MemoryTokenStore, OAuthConfig, OAuthTokens, StaticToken,
    TokenStore,
};
use classcal_core::calendar::{CalendarService, EventPayload, GoogleCalendarClient};
use classcal_core::error::{OAuthError, RemoteError};
use classcal_core::recurrence::{build_recurrence, TermRange};
use classcal_core::schedule::{ScheduleRow, SessionDefinition};
use classcal_core::EventIdentity;
use mockito::{Matcher, Server};

fn session() -> SessionDefinition {
    ScheduleRow {
        course: "MATH101".into(),
        session_type: Some("Lecture".into()),
        day: "Monday".into(),
        start_time: "09:00".into(),
        end_time: "10:00".into(),
        location: "RoomA".into(),
        ..ScheduleRow::default()
    }
    .parse(1)
    .unwrap()
}

fn payload() -> EventPayload {
    let session = session();
    let term = TermRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
        NaiveDate::from_ymd_opt(2024, 4, 26).unwrap(),
    )
    .unwrap();
    let recurrence = build_recurrence(&session, &term, chrono_tz::America::Toronto).unwrap();
    let identity = EventIdentity::for_session(&session);
    EventPayload::build(&session, &recurrence, &identity).unwrap()
}

fn identity() -> EventIdentity {
    EventIdentity::for_session(&session())
}

fn client(server: &Server) -> GoogleCalendarClient<StaticToken> {
    GoogleCalendarClient::with_base_url(StaticToken::new("test-token"), &server.url()).unwrap()
}

#[tokio::test]
async fn test_find_event_by_identity_found() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/calendars/primary/events")
        .match_header("authorization", "Bearer test-token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded(
                "privateExtendedProperty".into(),
                "classcal_id=cls1e55ac13fa96d248ddb6".into(),
            ),
            Matcher::UrlEncoded("showDeleted".into(), "false".into()),
            Matcher::UrlEncoded("maxResults".into(), "1".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"items":[{"id":"cls1e55ac13fa96d248ddb6","summary":"MATH101 (Lecture)","status":"confirmed","htmlLink":"https://calendar.google.com/e"}]}"#,
        )
        .create_async()
        .await;

    let found = client(&server)
        .find_event_by_identity("primary", &identity())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, "cls1e55ac13fa96d248ddb6");
    assert_eq!(found.html_link.as_deref(), Some("https://calendar.google.com/e"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_find_event_by_identity_absent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"kind":"calendar#events","items":[]}"#)
        .create_async()
        .await;

    let found = client(&server)
        .find_event_by_identity("primary", &identity())
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn test_create_event_posts_payload() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/calendars/primary/events")
        .match_header("authorization", "Bearer test-token")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": "cls1e55ac13fa96d248ddb6",
            "recurrence": ["RRULE:FREQ=WEEKLY;UNTIL=20240427T035959Z"],
            "extendedProperties": {"private": {"classcal_id": "cls1e55ac13fa96d248ddb6"}}
        })))
        .with_status(200)
        .with_body(r#"{"id":"cls1e55ac13fa96d248ddb6","status":"confirmed"}"#)
        .create_async()
        .await;

    let created = client(&server).create_event("primary", &payload()).await.unwrap();
    assert_eq!(created.id, "cls1e55ac13fa96d248ddb6");
    assert_eq!(created.status.as_deref(), Some("confirmed"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_conflict() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/calendars/primary/events")
        .with_status(409)
        .with_body(r#"{"error":{"code":409,"message":"The requested identifier already exists."}}"#)
        .create_async()
        .await;

    let err = client(&server).create_event("primary", &payload()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Conflict(id) if id == "cls1e55ac13fa96d248ddb6"));
}

#[tokio::test]
async fn test_error_statuses() {
    let mut server = Server::new_async().await;
    let _unavailable = server
        .mock("POST", "/calendars/primary/events")
        .with_status(503)
        .with_body(r#"{"error":{"code":503,"message":"Backend Error"}}"#)
        .create_async()
        .await;
    let _unauthorized = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let c = client(&server);
    let err = c.create_event("primary", &payload()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Api { status: 503, ref message } if message == "Backend Error"));
    assert!(err.is_transient());

    let err = c.find_event_by_identity("primary", &identity()).await.unwrap_err();
    assert!(matches!(err, RemoteError::Unauthorized));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn test_rate_limit_forbidden() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/calendars/primary/events")
        .match_query(Matcher::Any)
        .with_status(403)
        .with_body(
            r#"{"error":{"code":403,"message":"Rate Limit Exceeded","errors":[{"reason":"rateLimitExceeded"}]}}"#,
        )
        .create_async()
        .await;

    let err = client(&server)
        .find_event_by_identity("primary", &identity())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::RateLimited));
}

fn oauth_config(server: &Server) -> OAuthConfig {
    OAuthConfig {
        client_id: "client".into(),
        client_secret: "secret".into(),
        auth_url: format!("{}/auth", server.url()),
        token_url: format!("{}/token", server.url()),
        scopes: vec!["https://www.googleapis.com/auth/calendar".into()],
    }
}

fn expired_tokens() -> OAuthTokens {
    OAuthTokens {
        access_token: "stale".into(),
        refresh_token: Some("refresh-1".into()),
        expires_at: Some(chrono::Utc::now().timestamp() - 10),
        token_type: "Bearer".into(),
        scope: None,
    }
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_stored() {
    let mut server = Server::new_async().await;
    let token_mock = server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"access_token":"fresh","expires_in":3599,"token_type":"Bearer"}"#)
        .create_async()
        .await;

    let store = MemoryTokenStore::with_tokens(expired_tokens());
    let auth = Authenticator::new(oauth_config(&server), store);
    auth.ensure_authenticated().await.unwrap();
    assert_eq!(auth.access_token().await.unwrap(), "fresh");
    token_mock.assert_async().await;
}

#[tokio::test]
async fn test_refresh_failure_during_run_surfaces_as_auth_error() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant","error_description":"Token has been expired or revoked."}"#)
        .create_async()
        .await;

    let auth = Authenticator::new(
        oauth_config(&server),
        MemoryTokenStore::with_tokens(expired_tokens()),
    );
    let err = auth.access_token().await.unwrap_err();
    assert!(matches!(err, OAuthError::TokenRefreshFailed(ref m) if m.contains("invalid_grant")));

    let client = GoogleCalendarClient::with_base_url(auth, &server.url()).unwrap();
    let err = client
        .find_event_by_identity("primary", &identity())
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Auth(OAuthError::TokenRefreshFailed(_))));
}

#[tokio::test]
async fn test_refreshed_token_keeps_refresh_token_in_store() {
    let mut server = Server::new_async().await;
    let _token = server
        .mock("POST", "/token")
        .with_status(200)
        .with_body(r#"{"access_token":"fresh","expires_in":3599}"#)
        .create_async()
        .await;

    let store = MemoryTokenStore::with_tokens(expired_tokens());
    let auth = Authenticator::new(oauth_config(&server), store);
    assert_eq!(auth.access_token().await.unwrap(), "fresh");

    let stored = auth.store().load().unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh-1"));
    assert!(stored.expires_at.unwrap() > chrono::Utc::now().timestamp());
}
