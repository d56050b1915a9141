// Integration tests for `ApiClient` using wiremock.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use url::Url;
use wiremock::matchers::{
    body_json, body_partial_json, body_string, body_string_contains, header, header_regex,
    method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

use opsdesk_api::models::{DeviceQuery, LoginResponse, NewAdmin, Topology, TopologyLink};
use opsdesk_api::{
    ApiClient, ClientConfig, Credentials, Error, ErrorKind, ExpiryCause, Feedback, GatewayTarget,
    LoginRedirect, Params, RequestOptions, Routing, Session, UserInfo,
};

// ── Helpers ─────────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingFeedback {
    loading: Mutex<Vec<bool>>,
    toasts: Mutex<Vec<String>>,
}

impl RecordingFeedback {
    fn toasts(&self) -> Vec<String> {
        self.toasts.lock().unwrap().clone()
    }

    fn loading(&self) -> Vec<bool> {
        self.loading.lock().unwrap().clone()
    }
}

impl Feedback for RecordingFeedback {
    fn loading(&self, active: bool) {
        self.loading.lock().unwrap().push(active);
    }

    fn toast(&self, message: &str) {
        self.toasts.lock().unwrap().push(message.to_owned());
    }
}

#[derive(Default)]
struct RecordingRedirect {
    calls: Mutex<Vec<Option<String>>>,
}

impl RecordingRedirect {
    fn calls(&self) -> Vec<Option<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl LoginRedirect for RecordingRedirect {
    fn redirect_to_login(&self, return_to: Option<&str>) {
        self.calls.lock().unwrap().push(return_to.map(String::from));
    }
}

struct Harness {
    server: MockServer,
    client: ApiClient,
    feedback: Arc<RecordingFeedback>,
    redirect: Arc<RecordingRedirect>,
}

fn build(config: ClientConfig) -> (ApiClient, Arc<RecordingFeedback>, Arc<RecordingRedirect>) {
    let feedback = Arc::new(RecordingFeedback::default());
    let redirect = Arc::new(RecordingRedirect::default());
    let client = ApiClient::builder(config)
        .http(reqwest::Client::new())
        .feedback(Arc::clone(&feedback) as Arc<dyn Feedback>)
        .redirect(Arc::clone(&redirect) as Arc<dyn LoginRedirect>)
        .build()
        .unwrap();
    (client, feedback, redirect)
}

async fn setup() -> Harness {
    let server = MockServer::start().await;
    let target = GatewayTarget::new(Url::parse(&server.uri()).unwrap());
    let (client, feedback, redirect) = build(ClientConfig::new(Routing::single("test", target)));
    Harness {
        server,
        client,
        feedback,
        redirect,
    }
}

fn ok(res: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "err": 0, "msg": "", "res": res }))
}

fn failed(err: i64, msg: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "err": err, "msg": msg, "res": null }))
}

fn seed_session(client: &ApiClient, token: &str) {
    let session = Session::from_login(
        LoginResponse {
            access_token: token.into(),
            expires_in: 3600,
            refresh_in: None,
            user: Some(UserInfo {
                account: "ops".into(),
                name: "Ops".into(),
                role: "admin".into(),
            }),
        },
        Utc::now(),
        None,
    )
    .unwrap();
    client.sessions().save(&session).unwrap();
}

// ── Happy path ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_success_envelope_resolves() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/types"))
        .respond_with(ok(json!([
            { "id": 1, "name": "Pump", "group": "water" },
            { "id": "2", "name": "Valve" }
        ])))
        .mount(&h.server)
        .await;

    let types = h.client.list_device_types().await.unwrap();

    assert_eq!(types.len(), 2);
    assert_eq!(types[0].id, "1");
    assert_eq!(types[0].group.as_deref(), Some("water"));
    assert_eq!(types[1].id, "2");
    assert!(h.feedback.toasts().is_empty());
}

#[tokio::test]
async fn test_request_returns_whole_envelope() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/anything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "err": 0, "msg": "fine", "res": { "n": 3 }
        })))
        .mount(&h.server)
        .await;

    let env = h
        .client
        .request::<Value>("/anything", &Params::new(), &RequestOptions::get())
        .await
        .unwrap();

    assert!(env.is_ok());
    assert_eq!(env.msg, "fine");
    assert_eq!(env.res, Some(json!({ "n": 3 })));
}

#[tokio::test]
async fn test_login_persists_session() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_partial_json(json!({ "account": "ops", "password": "hunter2" })))
        .respond_with(ok(json!({
            "access_token": "tok-9",
            "expires_in": 3600,
            "user": { "account": "ops", "name": "Ops", "role": "admin" }
        })))
        .mount(&h.server)
        .await;

    let session = h
        .client
        .login(&Credentials {
            account: "ops".into(),
            password: SecretString::from("hunter2".to_owned()),
        })
        .await
        .unwrap();

    assert_eq!(session.user.account, "ops");
    let stored = h.client.sessions().load().unwrap();
    assert_eq!(stored.access_token.expose_secret(), "tok-9");
    assert_eq!(h.feedback.loading(), vec![true, false]);
}

#[tokio::test]
async fn test_refresh_without_session_is_not_authenticated() {
    let h = setup().await;
    let err = h.client.refresh_token().await.unwrap_err();
    assert!(matches!(err, Error::NotAuthenticated));
}

#[tokio::test]
async fn test_refresh_keeps_user_when_omitted() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");

    Mock::given(method("POST"))
        .and(path("/auth/refresh-token"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ok(json!({ "access_token": "tok-2", "expires_in": 600 })))
        .mount(&h.server)
        .await;

    let session = h.client.refresh_token().await.unwrap();
    assert_eq!(session.access_token.expose_secret(), "tok-2");
    assert_eq!(session.user.account, "ops");
}

#[tokio::test]
async fn test_system_config_is_cached() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/system-config/get"))
        .respond_with(ok(json!({ "site_name": "Plant A", "beep": true })))
        .mount(&h.server)
        .await;

    assert!(h.client.cached_system_config().is_none());
    let config = h.client.get_system_config().await.unwrap();
    assert_eq!(config["site_name"], json!("Plant A"));
    assert_eq!(h.client.cached_system_config(), Some(config));
}

// ── Encoding ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_sends_query_parameters() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/list"))
        .and(query_param("keyword", "pump"))
        .and(query_param("page", "2"))
        .respond_with(ok(json!({
            "list": [{ "device_id": 7, "device_name": "Pump 7" }],
            "total": 11
        })))
        .mount(&h.server)
        .await;

    let page = h
        .client
        .list_devices(&DeviceQuery {
            keyword: Some("pump".into()),
            page: Some(2),
            ..DeviceQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.total, 11);
    assert_eq!(page.list[0].device_id, "7");
}

#[tokio::test]
async fn test_form_encoding() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/device/toggle-maintaining"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string("device_id=7&maintaining=true"))
        .respond_with(ok(Value::Null))
        .mount(&h.server)
        .await;

    h.client.toggle_device_maintaining("7", true).await.unwrap();
}

#[tokio::test]
async fn test_multipart_encoding() {
    let h = setup().await;

    Mock::given(method("POST"))
        .and(path("/files/upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"note\""))
        .and(body_string_contains("night shift"))
        .respond_with(ok(json!({ "file_id": "f-1" })))
        .mount(&h.server)
        .await;

    let mut params = Params::new();
    params.insert("note".into(), json!("night shift"));
    let res: Option<Value> = h.client.upload("/files/upload", &params).await.unwrap();
    assert_eq!(res, Some(json!({ "file_id": "f-1" })));
}

#[tokio::test]
async fn test_json_body_encoding() {
    let h = setup().await;

    let topology = Topology {
        nodes: Vec::new(),
        links: vec![TopologyLink {
            source: "a".into(),
            target: "b".into(),
            label: None,
        }],
    };

    Mock::given(method("POST"))
        .and(path("/topology/save"))
        .and(body_json(json!({
            "nodes": [],
            "links": [{ "source": "a", "target": "b", "label": null }]
        })))
        .respond_with(ok(Value::Null))
        .mount(&h.server)
        .await;

    h.client.save_topology(&topology).await.unwrap();
}

// ── Auth headers & routing ──────────────────────────────────────────

#[tokio::test]
async fn test_bearer_header_from_session() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");

    Mock::given(method("GET"))
        .and(path("/topology/get"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ok(json!({ "nodes": [], "links": [] })))
        .mount(&h.server)
        .await;

    let topology = h.client.get_topology().await.unwrap();
    assert!(topology.nodes.is_empty());
}

#[tokio::test]
async fn test_gateway_token_overrides_session() {
    let server = MockServer::start().await;
    let base = Url::parse(&server.uri()).unwrap();
    let iot_base = Url::parse(&format!("{}/iot", server.uri())).unwrap();

    let mut gateways = HashMap::new();
    gateways.insert("default".to_owned(), GatewayTarget::new(base));
    gateways.insert(
        "iot".to_owned(),
        GatewayTarget::new(iot_base).with_token(SecretString::from("svc-token".to_owned())),
    );
    let mut table = HashMap::new();
    table.insert("production".to_owned(), gateways);
    let (client, _, _) = build(ClientConfig::new(Routing::Deployed {
        environment: "production".into(),
        table,
    }));
    seed_session(&client, "tok-1");

    Mock::given(method("GET"))
        .and(path("/iot/sensors"))
        .and(header("authorization", "Bearer svc-token"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let res: Vec<Value> = client
        .fetch("/sensors", &Params::new(), &RequestOptions::get().gateway("iot"))
        .await
        .unwrap();
    assert!(res.is_empty());

    let err = client
        .fetch::<Value>("/x", &Params::new(), &RequestOptions::get().gateway("billing"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownGateway { .. }));
    assert_eq!(err.kind(), ErrorKind::Local);
}

#[tokio::test]
async fn test_development_routing_uses_local_prefix() {
    let server = MockServer::start().await;
    let (client, _, _) = build(ClientConfig::new(Routing::Development {
        local_base: Url::parse(&server.uri()).unwrap(),
    }));

    Mock::given(method("GET"))
        .and(path("/api/dashboard/snapshot"))
        .respond_with(ok(json!({ "alarm_devices": [], "device_total": 4 })))
        .mount(&server)
        .await;

    let snapshot = client.dashboard_snapshot().await.unwrap();
    assert_eq!(snapshot.device_total, 4);
}

// ── Failure handling ────────────────────────────────────────────────

#[tokio::test]
async fn test_business_error_toasts_server_message() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");

    Mock::given(method("POST"))
        .and(path("/admin/create"))
        .respond_with(failed(1001, "account exists"))
        .mount(&h.server)
        .await;

    let err = h
        .client
        .create_admin(&NewAdmin {
            account: "ops2".into(),
            name: "Ops Two".into(),
            role: "viewer".into(),
            password: "pw".into(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Business { code: 1001, .. }));
    assert_eq!(err.kind(), ErrorKind::Business);
    assert_eq!(h.feedback.toasts(), vec!["account exists".to_owned()]);
    // Business failures leave the session alone.
    assert!(h.client.sessions().load().is_some());
    assert!(h.redirect.calls().is_empty());
}

#[tokio::test]
async fn test_quiet_suppresses_toast_but_runs_hook() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/list"))
        .respond_with(failed(2002, "db offline"))
        .mount(&h.server)
        .await;

    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let opts = RequestOptions::get()
        .quiet()
        .on_failure(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

    let err = h
        .client
        .fetch::<Value>("/device/list", &Params::new(), &opts)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Business { code: 2002, .. }));
    assert!(h.feedback.toasts().is_empty());
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_server_error_maps_to_status() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/topology/get"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&h.server)
        .await;

    let err = h.client.get_topology().await.unwrap_err();

    match &err {
        Error::Status { status, body, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(body, "boom");
        }
        other => panic!("expected Status, got {other:?}"),
    }
    assert_eq!(err.kind(), ErrorKind::Network);
    assert_eq!(h.feedback.toasts(), vec!["Internal Server Error".to_owned()]);
}

#[tokio::test]
async fn test_sentinel_code_forces_one_logout() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");
    h.client.set_location(Some("/topology".into()));

    Mock::given(method("GET"))
        .and(path("/topology/get"))
        .respond_with(failed(401, "token expired"))
        .mount(&h.server)
        .await;

    let err = h.client.get_topology().await.unwrap_err();
    assert!(matches!(
        err,
        Error::SessionExpired {
            cause: ExpiryCause::SessionInvalid { code: 401 },
            ..
        }
    ));
    assert!(err.is_session_expired());

    // Session is gone right away; the redirect waits.
    assert!(h.client.sessions().load().is_none());
    assert!(h.client.logout_pending());
    assert!(h.redirect.calls().is_empty());

    // A second loss inside the window does not start another sequence.
    let _ = h.client.get_topology().await.unwrap_err();

    h.client.wait_logout().await;
    assert_eq!(h.redirect.calls(), vec![Some("/topology".to_owned())]);
    assert!(!h.client.logout_pending());
}

#[tokio::test]
async fn test_custom_sentinel_codes() {
    let server = MockServer::start().await;
    let target = GatewayTarget::new(Url::parse(&server.uri()).unwrap());
    let mut config = ClientConfig::new(Routing::single("test", target));
    config.session_invalid_codes = vec![10401];
    config.logout_delay = Duration::from_millis(10);
    let (client, _, redirect) = build(config);

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(failed(401, "plain business failure"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(failed(10401, "kicked"))
        .mount(&server)
        .await;

    let err = client
        .call("/a", &Params::new(), &RequestOptions::get())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Business { code: 401, .. }));

    let err = client
        .call("/b", &Params::new(), &RequestOptions::get())
        .await
        .unwrap_err();
    assert!(err.is_session_expired());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(redirect.calls().len(), 1);
}

#[tokio::test]
async fn test_unauthorized_rotates_scope_without_toast() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");
    let before = h.client.scopes().current();

    Mock::given(method("GET"))
        .and(path("/admin/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let err = h.client.list_admins(1, 20).await.unwrap_err();

    assert!(matches!(
        err,
        Error::SessionExpired {
            cause: ExpiryCause::Unauthorized,
            ..
        }
    ));
    assert!(before.is_cancelled());
    assert_ne!(h.client.scopes().current().id(), before.id());
    assert!(h.client.sessions().load().is_none());
    assert!(h.feedback.toasts().is_empty());
}

#[tokio::test]
async fn test_concurrent_unauthorized_redirects_once() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");

    Mock::given(method("GET"))
        .and(path("/admin/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    let (a, b, c) = tokio::join!(
        h.client.list_admins(1, 20),
        h.client.list_admins(2, 20),
        h.client.list_admins(3, 20),
    );
    for result in [a, b, c] {
        // Either the 401 itself or the cancellation it caused.
        let err = result.unwrap_err();
        assert!(err.is_session_expired() || matches!(err, Error::Cancelled));
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.redirect.calls().len(), 1);
}

// ── Blob responses ──────────────────────────────────────────────────

#[tokio::test]
async fn test_blob_returns_bytes() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/vnd.ms-excel")
                .set_body_bytes(b"PK\x03\x04sheet".to_vec()),
        )
        .mount(&h.server)
        .await;

    let bytes = h
        .client
        .export_devices(&DeviceQuery::default())
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04sheet");
}

#[tokio::test]
async fn test_blob_with_json_body_is_decode_error() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/device/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json;charset=UTF-8")
                .set_body_string(r#"{"err":500,"msg":"export failed"}"#),
        )
        .mount(&h.server)
        .await;

    let err = h
        .client
        .export_devices(&DeviceQuery::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Decode { ref message } if message == "export failed"));
    assert_eq!(err.kind(), ErrorKind::Decode);
    assert_eq!(h.feedback.toasts(), vec!["export failed".to_owned()]);
}

// ── Cancellation & loading ──────────────────────────────────────────

#[tokio::test]
async fn test_explicit_token_cancels_request() {
    let h = setup().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ok(Value::Null).set_delay(Duration::from_secs(5)))
        .mount(&h.server)
        .await;

    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let opts = RequestOptions::get().with_loading().cancel_with(token);
    let err = h
        .client
        .call("/slow", &Params::new(), &opts)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert!(h.feedback.toasts().is_empty());
    // The loading indicator is released on the cancellation path too.
    assert_eq!(h.feedback.loading(), vec![true, false]);
}

#[tokio::test]
async fn test_logout_cancels_in_flight_requests() {
    let h = setup().await;
    seed_session(&h.client, "tok-1");

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ok(Value::Null).set_delay(Duration::from_secs(5)))
        .mount(&h.server)
        .await;

    let client = h.client.clone();
    let pending = tokio::spawn(async move {
        client
            .call("/slow", &Params::new(), &RequestOptions::get())
            .await
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.client.logout().unwrap();

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert!(h.client.sessions().load().is_none());
    // Explicit logout is not a forced one.
    assert!(h.redirect.calls().is_empty());
}
