#![allow(clippy::unwrap_used)]
// Integration tests for `Client` using wiremock.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fritzly_api::{
    Client, Credentials, Error, Method, SENTINEL_SID, SessionState, Transport,
};

const SID: &str = "9c8ab0f9ad0a1f76";

// ── Helpers ─────────────────────────────────────────────────────────

fn session_info(sid: &str, block_time: u64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<SessionInfo><SID>{sid}</SID><Challenge>1234567z</Challenge><BlockTime>{block_time}</BlockTime><Rights><Name>HomeAuto</Name><Access>2</Access></Rights></SessionInfo>"#
    )
}

async fn setup_with_timeout(timeout: Duration) -> (MockServer, Client) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let transport = Transport::with_client(reqwest::Client::new(), base_url);
    let credentials = Credentials::new("admin", "äbc".to_string().into());
    let client = Client::with_transport(transport, credentials, timeout);
    (server, client)
}

async fn setup() -> (MockServer, Client) {
    setup_with_timeout(Duration::from_secs(600)).await
}

async fn mount_challenge(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info(SENTINEL_SID, 0)))
        .expect(expected)
        .mount(server)
        .await;
}

async fn mount_login(server: &MockServer, sid: &str, block_time: u64, expected: u64) {
    Mock::given(method("POST"))
        .and(path("/login_sid.lua"))
        .and(body_string_contains("username=admin"))
        .and(body_string_contains(
            "response=1234567z-9e224a41eeefa284df7bb0f26c2913e2",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info(sid, block_time)))
        .expect(expected)
        .mount(server)
        .await;
}

// ── Authentication ──────────────────────────────────────────────────

#[tokio::test]
async fn test_connect_success() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    assert_eq!(client.session_state(), SessionState::Unauthenticated);
    client.connect().await.unwrap();

    assert_eq!(client.sid(), SID);
    assert_eq!(client.session_state(), SessionState::Authenticated);
    let rights = client.rights();
    assert_eq!(rights.len(), 1);
    assert_eq!(rights[0].name, "HomeAuto");
    assert_eq!(rights[0].access, 2);
}

#[tokio::test]
async fn test_sentinel_sid_is_invalid_credentials() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SENTINEL_SID, 12, 1).await;

    let result = client.connect().await;
    assert!(
        matches!(result, Err(Error::InvalidCredentials { block_time_secs: 12 })),
        "expected InvalidCredentials, got: {result:?}"
    );
    assert_eq!(client.sid(), SENTINEL_SID);
    assert_eq!(client.session_state(), SessionState::Challenged);
}

#[tokio::test]
async fn test_challenge_fetch_failure() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let result = client.connect().await;
    assert!(
        matches!(result, Err(Error::ChallengeFetch { .. })),
        "expected ChallengeFetch, got: {result:?}"
    );
}

#[tokio::test]
async fn test_reauth_failure_is_returned_verbatim() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SENTINEL_SID, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .respond_with(ResponseTemplate::new(200).set_body_string("never"))
        .expect(0)
        .mount(&server)
        .await;

    let result = client.aha("getswitchlist", None, &[]).await;
    assert!(
        matches!(result, Err(Error::InvalidCredentials { .. })),
        "expected InvalidCredentials, got: {result:?}"
    );
}

// ── Requests ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_send_logs_in_once_and_attaches_sid() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .and(query_param("switchcmd", "getswitchname"))
        .and(query_param("ain", "087610000434"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string("Wohnzimmer\n"))
        .expect(2)
        .mount(&server)
        .await;

    let name = client
        .aha("getswitchname", Some("087610000434"), &[])
        .await
        .unwrap();
    assert_eq!(name, "Wohnzimmer");

    // Session still valid: no second login.
    client
        .aha("getswitchname", Some("087610000434"), &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn test_expired_session_reauthenticates_exactly_once_per_call() {
    // A zero window makes every session expired by the time it is used.
    let (server, client) = setup_with_timeout(Duration::ZERO).await;
    mount_challenge(&server, 2).await;
    mount_login(&server, SID, 0, 2).await;

    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string("1"))
        .expect(2)
        .mount(&server)
        .await;

    client.aha("getswitchpresent", Some("x"), &[]).await.unwrap();
    assert_eq!(client.session_state(), SessionState::Expired);
    client.aha("getswitchpresent", Some("x"), &[]).await.unwrap();
}

#[tokio::test]
async fn test_non_success_status_is_surfaced() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/webservices/homeautoswitch.lua"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad ain"))
        .mount(&server)
        .await;

    let result = client.aha("getswitchname", Some("nope"), &[]).await;
    match result {
        Err(Error::UnexpectedStatus { code, body }) => {
            assert_eq!(code, 400);
            assert_eq!(body, "bad ain");
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_send_form_post_carries_sid_in_body() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    Mock::given(method("POST"))
        .and(path("/data.lua"))
        .and(body_string_contains("page=sh_dev"))
        .and(body_string_contains(format!("sid={SID}")))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .expect(1)
        .mount(&server)
        .await;

    let body = client
        .send(Method::POST, "data.lua", &[("page", "sh_dev")])
        .await
        .unwrap();
    assert_eq!(body, "{}");
}

#[tokio::test]
async fn test_send_json_uses_avm_sid_header() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    Mock::given(method("PUT"))
        .and(path("/api/v0/smarthome/configuration/unitsById/1"))
        .and(header("authorization", format!("AVM-SID {SID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({"name": "Flur"});
    let body = client
        .send_json(
            Method::PUT,
            "api/v0/smarthome/configuration/unitsById/1",
            Some(&payload),
        )
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(parsed["ok"], true);
}

// ── Logout ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_logout_drops_sid() {
    let (server, client) = setup().await;
    mount_challenge(&server, 1).await;
    mount_login(&server, SID, 0, 1).await;

    Mock::given(method("GET"))
        .and(path("/login_sid.lua"))
        .and(query_param("logout", "1"))
        .and(query_param("sid", SID))
        .respond_with(ResponseTemplate::new(200).set_body_string(session_info(SENTINEL_SID, 0)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    client.connect().await.unwrap();
    client.logout().await.unwrap();

    assert_eq!(client.sid(), SENTINEL_SID);
    assert_eq!(client.session_state(), SessionState::Closed);

    // Second logout has nothing to tell the router.
    client.logout().await.unwrap();
}
