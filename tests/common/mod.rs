#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::json;
use tower::ServiceExt;

use reportnav::config::ServerConfig;
use reportnav::server::{router, AppState};
use reportnav::storage::MemoryReportStore;

pub fn test_config() -> ServerConfig {
    let mut users = BTreeMap::new();
    users.insert("alice".to_string(), "wonderland".to_string());
    users.insert("bob".to_string(), "builder".to_string());
    ServerConfig { secret: "test-secret".into(), users, ..Default::default() }
}

pub fn test_reports() -> Arc<MemoryReportStore> {
    let store = MemoryReportStore::new();
    for (id, drug) in [("r1", "aspirin"), ("r2", "ibuprofen"), ("r3", "paracetamol")] {
        let doc = json!({"_id": id, "drug": drug, "serious": id == "r2"});
        store.insert(id, doc.as_object().cloned().unwrap());
    }
    Arc::new(store)
}

pub fn test_state(config: ServerConfig) -> AppState {
    AppState::new(config, test_reports()).expect("build app state")
}

pub fn test_app() -> (Router, AppState) {
    let state = test_state(test_config());
    (router(state.clone()), state)
}

pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    cookie: Option<&str>,
    body: Option<(String, Vec<u8>)>,
) -> Response<Body> {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(c) = cookie {
        req = req.header(header::COOKIE, c);
    }
    let req = match body {
        Some((content_type, bytes)) => req.header(header::CONTENT_TYPE, content_type).body(Body::from(bytes)),
        None => req.body(Body::empty()),
    }
    .unwrap();
    app.clone().oneshot(req).await.unwrap()
}

pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    call(app, Method::GET, uri, cookie, None).await
}

pub async fn post(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    call(app, Method::POST, uri, cookie, None).await
}

pub fn location(resp: &Response<Body>) -> &str {
    resp.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()).unwrap_or("")
}

pub fn assert_redirect(resp: &Response<Body>, to: &str) {
    assert_eq!(resp.status(), StatusCode::SEE_OTHER, "expected redirect to {to}");
    assert_eq!(location(resp), to);
}

/// The `name=value` part of the Set-Cookie header, if any.
pub fn set_cookie(resp: &Response<Body>) -> Option<String> {
    let v = resp.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    v.split(';').next().map(|s| s.trim().to_string())
}

pub async fn body_string(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(resp: Response<Body>) -> serde_json::Value {
    serde_json::from_str(&body_string(resp).await).unwrap()
}

pub async fn login(app: &Router, user: &str, password: &str) -> Response<Body> {
    let form = format!("username={}&password={}", user, password);
    call(
        app,
        Method::POST,
        "/login",
        None,
        Some(("application/x-www-form-urlencoded".to_string(), form.into_bytes())),
    )
    .await
}

/// Log in and return the cookie to send on later requests.
pub async fn login_cookie(app: &Router, user: &str, password: &str) -> String {
    let resp = login(app, user, password).await;
    assert_redirect(&resp, "/");
    set_cookie(&resp).expect("session cookie")
}

pub fn multipart_file(filename: &str, content: &str) -> (String, Vec<u8>) {
    let boundary = "reportnavtestboundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{f}\"\r\nContent-Type: application/json\r\n\r\n{c}\r\n--{b}--\r\n",
        b = boundary,
        f = filename,
        c = content
    );
    (format!("multipart/form-data; boundary={}", boundary), body.into_bytes())
}

pub async fn upload(app: &Router, cookie: &str, filename: &str, content: &str) -> Response<Body> {
    call(app, Method::POST, "/upload", Some(cookie), Some(multipart_file(filename, content))).await
}
