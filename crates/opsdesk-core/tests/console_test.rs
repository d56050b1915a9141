// Integration tests for `Console` against a wiremock console.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opsdesk_api::models::LoginResponse;
use opsdesk_api::storage::keys;
use opsdesk_api::{GatewayTarget, KvStore, MemoryStore, Routing, Session, UserInfo};
use opsdesk_core::{Console, ConsoleConfig, CoreError};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Console, Arc<dyn KvStore>) {
    let server = MockServer::start().await;
    let target = GatewayTarget::new(Url::parse(&server.uri()).unwrap());
    let store: Arc<dyn KvStore> = Arc::new(MemoryStore::new());
    let console = Console::new(
        &ConsoleConfig::new(Routing::single("test", target)),
        Arc::clone(&store),
    )
    .unwrap();
    (server, console, store)
}

fn seed_session(console: &Console, expires_in: i64, refresh_in: i64, issued_ago: Duration) {
    let session = Session::from_login(
        LoginResponse {
            access_token: "tok-1".into(),
            expires_in,
            refresh_in: Some(refresh_in),
            user: Some(UserInfo {
                account: "ops".into(),
                name: "Ops".into(),
                role: "admin".into(),
            }),
        },
        Utc::now() - issued_ago,
        None,
    )
    .unwrap();
    console.client().sessions().save(&session).unwrap();
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_login_then_logout() {
    let (server, console, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "msg": "",
            "res": {
                "access_token": "tok-7",
                "expires_in": 7200,
                "user": { "account": "ops", "name": "Ops", "role": "admin" }
            }
        })))
        .mount(&server)
        .await;

    let session = console
        .login("ops", SecretString::from("pw".to_owned()))
        .await
        .unwrap();
    assert_eq!(session.access_token.expose_secret(), "tok-7");
    assert!(console.session().is_some());

    console.logout().unwrap();
    assert!(console.session().is_none());
}

#[tokio::test]
async fn test_rejected_login_keeps_no_session() {
    let (server, console, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 1002, "msg": "wrong password", "res": null
        })))
        .mount(&server)
        .await;

    let err = console
        .login("ops", SecretString::from("nope".to_owned()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Rejected { code: 1002, .. }));
    assert!(console.session().is_none());
}

#[tokio::test]
async fn test_ensure_session_refreshes_when_due() {
    let (server, console, _) = setup().await;
    seed_session(&console, 3600, 600, Duration::minutes(20));

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0, "msg": "", "res": { "access_token": "tok-2", "expires_in": 3600 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let session = console.ensure_session().await.unwrap();
    assert_eq!(session.access_token.expose_secret(), "tok-2");
    assert_eq!(session.user.account, "ops");
}

#[tokio::test]
async fn test_ensure_session_rejects_expired() {
    let (_server, console, _) = setup().await;
    seed_session(&console, 60, 30, Duration::hours(2));

    let err = console.ensure_session().await.unwrap_err();
    assert!(matches!(err, CoreError::NotAuthenticated));
    assert!(console.client().sessions().load().is_none());
}

// ── Alarms ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_alarm_summary_uses_stored_baseline() {
    let (server, console, store) = setup().await;
    store
        .set(keys::LAST_ALARM_CLEAR, "2025-01-01T12:00:00Z".into())
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/dashboard/snapshot"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0,
            "msg": "",
            "res": {
                "alarm_devices": [
                    { "device_id": 1, "device_name": "Pump 1", "alarm_at": "2025-01-01T00:00:00Z" },
                    { "device_id": 2, "device_name": "Pump 2", "alarm_at": "2025-01-02T00:00:00Z" }
                ],
                "device_total": 10,
                "online_total": 8
            }
        })))
        .mount(&server)
        .await;

    let (snapshot, summary) = console.alarm_summary().await.unwrap();
    assert_eq!(snapshot.device_total, 10);
    assert_eq!(summary.new.len(), 1);
    assert_eq!(summary.new[0].device_id, "2");
    assert_eq!(summary.historical.len(), 1);
}

#[tokio::test]
async fn test_clear_alarms_is_monotonic() {
    let (_server, console, _) = setup().await;
    let later = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();

    assert_eq!(console.clear_alarms(later).unwrap(), later);
    assert_eq!(
        console.clear_alarms(later - Duration::days(30)).unwrap(),
        later
    );
    assert_eq!(console.alarm_baseline(), Some(later));
}
