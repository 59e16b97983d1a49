//! HTTP surface tests
//!
//! Drive the axum router in-process with `oneshot` against in-memory SQLite.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use ocelot::api;
use ocelot::auth::AuthService;
use ocelot::cache::MokaResponseCache;
use ocelot::config::{ApiKey, AuthConfig, AuthMode};
use ocelot::links::{LinkService, LinkServiceConfig};
use ocelot::storage::{SqliteStorage, Storage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 5).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

fn create_app(storage: Arc<dyn Storage>) -> Router {
    let cache = Arc::new(MokaResponseCache::new(1000, Duration::from_secs(300)));
    let service = Arc::new(LinkService::new(
        storage,
        cache,
        LinkServiceConfig::default(),
    ));
    let auth_service = Arc::new(
        AuthService::new(AuthConfig {
            mode: AuthMode::ApiKey,
            api_keys: vec![
                ApiKey {
                    key: "alice-key".to_string(),
                    user_id: "alice".to_string(),
                },
                ApiKey {
                    key: "bob-key".to_string(),
                    user_id: "bob".to_string(),
                },
            ],
            user_id_header: AuthConfig::default_user_id_header(),
        })
        .unwrap(),
    );

    api::create_api_router(service, auth_service)
}

fn shorten_request(body: &str, api_key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/links/shorten")
        .header("content-type", "application/json");
    if let Some(key) = api_key {
        builder = builder.header("x-api-key", key);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_shorten_redirect_and_stats_end_to_end() {
    let app = create_app(create_test_storage().await);

    let response = app
        .clone()
        .oneshot(shorten_request(
            r#"{"original_url": "https://example.com/page"}"#,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let created = json_body(response).await;
    let code = created["short_code"].as_str().unwrap().to_string();
    assert_eq!(code.len(), 6);
    assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(created["original_url"], "example.com/page");
    assert_eq!(created["clicks"], 0);
    assert!(created["owner_id"].is_null());

    let response = app
        .clone()
        .oneshot(get(&format!("/links/{code}")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://example.com/page"
    );
    assert!(response.headers().get(header::CACHE_CONTROL).is_some());

    let response = app
        .oneshot(get(&format!("/links/{code}/stats")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let stats = json_body(response).await;
    assert_eq!(stats["clicks"], 1);
    assert_eq!(stats["original_url"], "example.com/page");
    assert!(stats["last_clicked_at"].is_i64());
}

#[tokio::test]
async fn test_unknown_code_is_404() {
    let app = create_app(create_test_storage().await);

    let response = app.clone().oneshot(get("/links/nothing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/links/nothing/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(response).await["error"], "Link not found");
}

#[tokio::test]
async fn test_alias_taken_is_400() {
    let app = create_app(create_test_storage().await);
    let body = r#"{"original_url": "example.com", "custom_alias": "promo"}"#;

    let first = app.clone().oneshot(shorten_request(body, None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(json_body(first).await["short_code"], "promo");

    let second = app.oneshot(shorten_request(body, None)).await.unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(second).await["error"], "Alias already exists");
}

#[tokio::test]
async fn test_concurrent_alias_creation() {
    let app = create_app(create_test_storage().await);

    let mut handles = vec![];
    for i in 0..10 {
        let app_clone = app.clone();
        handles.push(tokio::spawn(async move {
            let body = format!(
                r#"{{"original_url": "https://example.com/{i}", "custom_alias": "contested"}}"#
            );
            app_clone.oneshot(shorten_request(&body, None)).await.unwrap()
        }));
    }

    let mut success_count = 0;
    let mut conflict_count = 0;
    for handle in handles {
        match handle.await.unwrap().status() {
            StatusCode::OK => success_count += 1,
            StatusCode::BAD_REQUEST => conflict_count += 1,
            other => panic!("unexpected status {other}"),
        }
    }

    assert_eq!(success_count, 1, "Exactly one creation should succeed");
    assert_eq!(conflict_count, 9, "All others should see the alias taken");
}

#[tokio::test]
async fn test_invalid_alias_is_422() {
    let app = create_app(create_test_storage().await);

    for alias in ["ab", "has space", "search"] {
        let body = format!(r#"{{"original_url": "example.com", "custom_alias": "{alias}"}}"#);
        let response = app.clone().oneshot(shorten_request(&body, None)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNPROCESSABLE_ENTITY,
            "alias {alias:?}"
        );
    }
}

#[tokio::test]
async fn test_shorten_records_owner_from_api_key() {
    let app = create_app(create_test_storage().await);

    let response = app
        .clone()
        .oneshot(shorten_request(
            r#"{"original_url": "example.com"}"#,
            Some("alice-key"),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["owner_id"], "alice");

    let response = app
        .oneshot(shorten_request(
            r#"{"original_url": "example.com"}"#,
            Some("wrong-key"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_returns_only_resolvable_links() {
    let storage = create_test_storage().await;
    let now = chrono::Utc::now().timestamp();
    storage.create("live", "example.com", None, None).await.unwrap();
    storage
        .create("expired", "example.com", None, Some(now - 60))
        .await
        .unwrap();
    storage
        .create("deleted", "example.com", Some("alice"), None)
        .await
        .unwrap();
    storage.soft_delete("deleted", "alice").await.unwrap();

    let app = create_app(storage);

    let response = app
        .clone()
        .oneshot(get("/links/search?original_url=https%3A%2F%2Fwww.example.com%2F"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let links = json_body(response).await;
    let links = links.as_array().unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0]["short_code"], "live");

    let response = app
        .oneshot(get("/links/search?original_url=unknown.org"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_expired_link_not_redirected() {
    let storage = create_test_storage().await;
    let now = chrono::Utc::now().timestamp();
    storage
        .create("stale", "example.com", None, Some(now - 1))
        .await
        .unwrap();

    let app = create_app(storage.clone());
    let response = app.oneshot(get("/links/stale")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(storage.get("stale").await.unwrap().unwrap().clicks, 0);
}

#[tokio::test]
async fn test_update_requires_owner() {
    let app = create_app(create_test_storage().await);

    app.clone()
        .oneshot(shorten_request(
            r#"{"original_url": "example.com", "custom_alias": "owned"}"#,
            Some("alice-key"),
        ))
        .await
        .unwrap();

    let put = |key: Option<&'static str>, code: &'static str| {
        let mut builder = Request::builder()
            .method("PUT")
            .uri(format!("/links/{code}"))
            .header("content-type", "application/json");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder
            .body(Body::from(r#"{"new_url": "https://www.new.example.com/"}"#))
            .unwrap()
    };

    let response = app.clone().oneshot(put(None, "owned")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Not owned and nonexistent look the same
    let not_owned = app.clone().oneshot(put(Some("bob-key"), "owned")).await.unwrap();
    let missing = app.clone().oneshot(put(Some("bob-key"), "ghost")).await.unwrap();
    assert_eq!(not_owned.status(), StatusCode::NOT_FOUND);
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(not_owned).await, json_body(missing).await);

    let response = app.clone().oneshot(put(Some("alice-key"), "owned")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["original_url"], "new.example.com");

    let response = app.oneshot(get("/links/owned")).await.unwrap();
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        "https://new.example.com"
    );
}

#[tokio::test]
async fn test_delete_soft_deletes_for_owner() {
    let storage = create_test_storage().await;
    let app = create_app(storage.clone());

    app.clone()
        .oneshot(shorten_request(
            r#"{"original_url": "example.com", "custom_alias": "bye-bye"}"#,
            Some("alice-key"),
        ))
        .await
        .unwrap();

    // Warm the redirect cache before deleting
    let response = app.clone().oneshot(get("/links/bye-bye")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let delete = |key: Option<&'static str>| {
        let mut builder = Request::builder().method("DELETE").uri("/links/bye-bye");
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::empty()).unwrap()
    };

    assert_eq!(
        app.clone().oneshot(delete(None)).await.unwrap().status(),
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        app.clone().oneshot(delete(Some("bob-key"))).await.unwrap().status(),
        StatusCode::NOT_FOUND
    );

    let response = app.clone().oneshot(delete(Some("alice-key"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = json_body(response).await;
    assert_eq!(ack["status"], "success");

    let response = app.clone().oneshot(get("/links/bye-bye")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = app.oneshot(get("/links/bye-bye/stats")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let row = storage.get("bye-bye").await.unwrap().unwrap();
    assert!(!row.is_active);
    assert!(row.expires_at.is_some());
}

#[tokio::test]
async fn test_health_check() {
    let app = create_app(create_test_storage().await);
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
