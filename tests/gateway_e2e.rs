//! End-to-end tests: the full router driven against a stubbed upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceExt;

use watchgate::config::Config;
use watchgate::models::ProxyResult;
use watchgate::server::{router, AppState};

/// Stub upstream counting execute hits
async fn spawn_upstream(hits: Arc<AtomicUsize>) -> String {
    let hits_handler = hits.clone();
    let stub = Router::new()
        .route(
            "/api/internal-execute",
            post(move || {
                let hits = hits_handler.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Json(json!({"filtered_message": "done"}))
                }
            }),
        )
        .route(
            "/api/get-apps",
            get(|| async { Json(json!({"ShopApp": ["purchase"]})) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, stub).await.unwrap();
    });
    format!("http://{}", addr)
}

fn test_config(upstream_url: String) -> Config {
    Config {
        bind_addr: "127.0.0.1:0".to_string(),
        upstream_url,
        api_key: "test-key".to_string(),
        session_secret: "0123456789abcdef0123456789abcdef".to_string(),
        session_ttl: Some(chrono::Duration::hours(2)),
        users_json: r#"{"admin": "secret"}"#.to_string(),
        upstream_timeout: Duration::from_secs(5),
        catalog_timeout: Duration::from_secs(1),
        event_threshold: 40,
        report_interval: Duration::from_secs(3600),
        self_url: None,
        keepalive_interval: Duration::from_secs(600),
    }
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> ProxyResult {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_unauthenticated_send_is_401_and_never_reaches_upstream() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits.clone()).await;
    let app = router(AppState::new(test_config(upstream)));

    let response = app
        .oneshot(form_request(
            "/api/send",
            "platform=ios&device_id=d1&event_name=tap",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let result = body_json(response).await;
    assert!(!result.success);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_login_then_send_succeeds() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits.clone()).await;
    let app = router(AppState::new(test_config(upstream)));

    // Login sets the session cookie and redirects to the dashboard
    let response = app
        .clone()
        .oneshot(form_request("/login", "username=admin&password=secret"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/");

    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("login must set a session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    // Authenticated send reaches the upstream exactly once
    let mut request = form_request(
        "/api/send",
        "app_name=ShopApp&platform=ios&device_id=d1&event_name=purchase",
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = body_json(response).await;
    assert!(result.success);
    assert_eq!(result.message, "done");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bad_credentials_rerender_login() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits).await;
    let app = router(AppState::new(test_config(upstream)));

    let response = app
        .oneshot(form_request("/login", "username=admin&password=wrong"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(page.contains("Invalid username or password"));
}

#[tokio::test]
async fn test_index_serves_login_when_anonymous_and_dashboard_after_login() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits).await;
    let app = router(AppState::new(test_config(upstream)));

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8(bytes.to_vec())
        .unwrap()
        .contains("action=\"/login\""));

    let response = app
        .clone()
        .oneshot(form_request("/login", "username=admin&password=secret"))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let page = String::from_utf8(bytes.to_vec()).unwrap();
    // Dashboard greets the user and shows the upstream catalog
    assert!(page.contains("admin"));
    assert!(page.contains("ShopApp"));
}

#[tokio::test]
async fn test_logout_clears_session() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits.clone()).await;
    let app = router(AppState::new(test_config(upstream)));

    let response = app
        .clone()
        .oneshot(form_request("/login", "username=admin&password=secret"))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // The old cookie no longer authenticates
    let mut request = form_request(
        "/api/send",
        "platform=ios&device_id=d1&event_name=tap",
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let hits = Arc::new(AtomicUsize::new(0));
    let upstream = spawn_upstream(hits).await;
    let app = router(AppState::new(test_config(upstream)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_send_with_unreachable_upstream_still_200() {
    // Bind then drop to get a dead port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = router(AppState::new(test_config(format!("http://{}", addr))));

    let response = app
        .clone()
        .oneshot(form_request("/login", "username=admin&password=secret"))
        .await
        .unwrap();
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let mut request = form_request(
        "/api/send",
        "platform=ios&device_id=d1&event_name=tap",
    );
    request
        .headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let result = body_json(response).await;
    assert!(!result.success);
    assert!(!result.message.is_empty());
}
