//! Integration tests for login and event listing using wiremock

mod common;

use burstbook::client::list::{EventLister, ResourceSource};
use burstbook::client::Session;
use burstbook::config::{Credentials, SiteConfig};
use burstbook::utils::error::{ListError, SessionError};
use chrono::{TimeZone, Utc};
use std::time::Duration;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{session, LIST_PATH};

fn credentials() -> Credentials {
    Credentials {
        email: "alumni@example.com".to_string(),
        password: "secret".to_string(),
    }
}

fn site(uri: &str) -> SiteConfig {
    SiteConfig {
        base_url: uri.to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_login_captures_token_and_cookie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><form><input type="hidden" name="_token" value="csrf-abc"></form></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_string_contains("email=alumni%40example.com"))
        .and(body_string_contains("_token=csrf-abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "PHPSESSID=xyz; Path=/")
                .set_body_string("welcome"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session = Session::with_base_url(&mock_server.uri()).unwrap();
    session
        .login(&site(&mock_server.uri()), &credentials())
        .await
        .unwrap();

    assert_eq!(session.csrf_token(), Some("csrf-abc"));
    assert!(session.has_session_cookie());
}

#[tokio::test]
async fn test_login_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&mock_server)
        .await;

    let mut session = Session::with_base_url(&mock_server.uri()).unwrap();
    let result = session.login(&site(&mock_server.uri()), &credentials()).await;

    assert!(matches!(
        result,
        Err(SessionError::LoginRejected { status: 401, .. })
    ));
    assert!(session.csrf_token().is_none());
}

#[tokio::test]
async fn test_login_falls_back_to_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(1_000)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut session =
        Session::new(&mock_server.uri(), "burstbook-test", Duration::from_millis(200)).unwrap();
    let result = session.login(&site(&mock_server.uri()), &credentials()).await;

    assert!(result.is_ok(), "JSON fallback should log in: {:?}", result.err());
}

#[tokio::test]
async fn test_list_events() {
    let mock_server = MockServer::start().await;
    let body = r#"{"result":[
        {"id":101,"event_name":"PREUNI Final Night","quota":"200","remaining_quota":"12",
         "reservation_start_date":"2025-08-01 09:00:00","event_date":"2025-08-20",
         "place":"Grand Hall","booking_id":null},
        {"id":"102","event_name":"Homecoming","remaining_quota":0,"booking_id":"55"}
    ]}"#;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_string_contains("a=list_all"))
        .and(body_string_contains("event_date="))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&mock_server)
        .await;

    let lister = EventLister::new(session(&mock_server.uri(), 2_000), LIST_PATH);
    let resources = lister.list().await.unwrap();

    assert_eq!(resources.len(), 2);

    let first = &resources[0];
    assert_eq!(first.id, "101");
    assert_eq!(first.remaining_quota, Some(12));
    assert_eq!(first.place.as_deref(), Some("Grand Hall"));
    assert!(!first.is_booked());
    // 09:00 WIB is 02:00 UTC
    assert_eq!(
        first.reservation_start,
        Some(Utc.with_ymd_and_hms(2025, 8, 1, 2, 0, 0).unwrap())
    );

    assert!(resources[1].is_booked());
    assert!(!resources[1].has_capacity());
}

#[tokio::test]
async fn test_list_non_200() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&mock_server)
        .await;

    let lister = EventLister::new(session(&mock_server.uri(), 2_000), LIST_PATH);
    let result = lister.list().await;

    assert!(matches!(result, Err(ListError::Status { status: 500, .. })));
}

#[tokio::test]
async fn test_list_unexpected_shape() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Please log in</html>"))
        .mount(&mock_server)
        .await;

    let lister = EventLister::new(session(&mock_server.uri(), 2_000), LIST_PATH);
    let result = lister.list().await;

    assert!(matches!(result, Err(ListError::UnexpectedShape(_))));
}
