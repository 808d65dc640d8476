use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use coffee_auth::{AuthConfig, AuthError, JwksFetcher, JwksVerifier, KeySet};
use coffee_drinks_server::adapter::handler::{router, AppState};
use coffee_drinks_server::adapter::repository::InMemoryDrinkRepository;
use coffee_drinks_server::domain::entity::{Ingredient, NewDrink};
use coffee_drinks_server::domain::repository::DrinkRepository;
use coffee_telemetry::Metrics;
use coffee_test_helper::{JwtTestHelper, TestClaims};

const DOMAIN: &str = "fsndproject.au.auth0.com";
const ISSUER: &str = "https://fsndproject.au.auth0.com/";
const AUDIENCE: &str = "homepage";

// --- Test doubles ---

/// 共有テスト鍵の JWKS を返し、取得回数を数える。
struct StaticFetcher {
    calls: AtomicUsize,
}

#[async_trait]
impl JwksFetcher for StaticFetcher {
    async fn fetch_keys(&self, _jwks_url: &str) -> Result<KeySet, AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(serde_json::from_value(JwtTestHelper::shared().jwks()).unwrap())
    }
}

struct TestApp {
    app: Router,
    repo: Arc<InMemoryDrinkRepository>,
    fetcher: Arc<StaticFetcher>,
}

async fn setup() -> TestApp {
    let repo = Arc::new(InMemoryDrinkRepository::new());
    repo.create(&NewDrink {
        title: "water".to_string(),
        recipe: vec![Ingredient {
            name: "water".to_string(),
            color: "blue".to_string(),
            parts: 1,
        }],
    })
    .await
    .unwrap();

    let fetcher = Arc::new(StaticFetcher {
        calls: AtomicUsize::new(0),
    });
    let verifier =
        JwksVerifier::with_fetcher(&AuthConfig::new(DOMAIN, AUDIENCE), fetcher.clone()).unwrap();
    let metrics = Arc::new(Metrics::new("coffee-drinks-server-test").unwrap());

    let state = AppState::new(repo.clone(), Arc::new(verifier), metrics);
    TestApp {
        app: router(state),
        repo,
        fetcher,
    }
}

fn token(permissions: &[&str]) -> String {
    JwtTestHelper::shared().sign(&TestClaims::new(ISSUER, AUDIENCE).with_permissions(permissions))
}

fn request(
    method: Method,
    uri: &str,
    bearer: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

// --- Public routes ---

#[tokio::test]
async fn test_list_drinks_is_public_and_short() {
    let t = setup().await;
    let (status, body) = send(&t.app, request(Method::GET, "/drinks", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["title"], "water");
    assert_eq!(
        body["drinks"][0]["recipe"][0],
        serde_json::json!({"color": "blue", "parts": 1})
    );
    assert_eq!(t.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_healthz_and_readyz() {
    let t = setup().await;
    let (status, body) = send(&t.app, request(Method::GET, "/healthz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, _) = send(&t.app, request(Method::GET, "/readyz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let t = setup().await;
    let (status, body) = send(&t.app, request(Method::GET, "/coffee", None, None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 404);
}

#[tokio::test]
async fn test_cors_header_is_present() {
    let t = setup().await;
    let req = Request::builder()
        .uri("/drinks")
        .header(header::ORIGIN, "http://localhost:4200")
        .body(Body::empty())
        .unwrap();
    let resp = t.app.clone().oneshot(req).await.unwrap();

    assert!(resp
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// --- Authorization ---

#[tokio::test]
async fn test_drinks_detail_without_header() {
    let t = setup().await;
    let (status, body) = send(&t.app, request(Method::GET, "/drinks-detail", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_header");
    assert_eq!(t.fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_drinks_detail_with_permission_is_long() {
    let t = setup().await;
    let bearer = token(&["get:drinks-detail"]);
    let (status, body) = send(
        &t.app,
        request(Method::GET, "/drinks-detail", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["drinks"][0]["recipe"][0],
        serde_json::json!({"name": "water", "color": "blue", "parts": 1})
    );
}

#[tokio::test]
async fn test_wrong_permission_is_rejected() {
    let t = setup().await;
    let bearer = token(&["get:drinks-detail"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            "/drinks",
            Some(&bearer),
            Some(serde_json::json!({"title": "tea", "recipe": {"name": "tea", "color": "green", "parts": 1}})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "permission_denied");
    assert_eq!(t.repo.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_permissions_claim_is_rejected() {
    let t = setup().await;
    let bearer = JwtTestHelper::shared().sign(&TestClaims::new(ISSUER, AUDIENCE));
    let (status, body) = send(
        &t.app,
        request(Method::GET, "/drinks-detail", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "missing_permissions_claim");
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let t = setup().await;
    let bearer = JwtTestHelper::shared().sign(
        &TestClaims::new(ISSUER, AUDIENCE)
            .with_permissions(&["get:drinks-detail"])
            .expired(),
    );
    let (status, body) = send(
        &t.app,
        request(Method::GET, "/drinks-detail", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "token_expired");
}

#[tokio::test]
async fn test_wrong_audience_is_rejected() {
    let t = setup().await;
    let bearer = JwtTestHelper::shared().sign(
        &TestClaims::new(ISSUER, "another-api").with_permissions(&["get:drinks-detail"]),
    );
    let (status, body) = send(
        &t.app,
        request(Method::GET, "/drinks-detail", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "invalid_claims");
}

// --- CRUD ---

#[tokio::test]
async fn test_create_drink_with_single_ingredient() {
    let t = setup().await;
    let bearer = token(&["post:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            "/drinks",
            Some(&bearer),
            Some(serde_json::json!({
                "title": "matcha",
                "recipe": {"name": "matcha", "color": "green", "parts": 1}
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["drinks"][0]["id"], 2);
    assert_eq!(body["drinks"][0]["title"], "matcha");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "matcha");
}

#[tokio::test]
async fn test_create_drink_without_recipe() {
    let t = setup().await;
    let bearer = token(&["post:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            "/drinks",
            Some(&bearer),
            Some(serde_json::json!({"title": "matcha"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], 422);
}

#[tokio::test]
async fn test_create_duplicate_title() {
    let t = setup().await;
    let bearer = token(&["post:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::POST,
            "/drinks",
            Some(&bearer),
            Some(serde_json::json!({
                "title": "water",
                "recipe": [{"name": "water", "color": "blue", "parts": 1}]
            })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(t.repo.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_patch_title_only() {
    let t = setup().await;
    let bearer = token(&["patch:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::PATCH,
            "/drinks/1",
            Some(&bearer),
            Some(serde_json::json!({"title": "still water"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["drinks"][0]["title"], "still water");
    assert_eq!(body["drinks"][0]["recipe"][0]["name"], "water");
}

#[tokio::test]
async fn test_patch_unknown_drink() {
    let t = setup().await;
    let bearer = token(&["patch:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::PATCH,
            "/drinks/42",
            Some(&bearer),
            Some(serde_json::json!({"title": "ghost"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], 404);
}

#[tokio::test]
async fn test_patch_unknown_drink_with_existing_title() {
    let t = setup().await;
    let bearer = token(&["patch:drinks"]);
    let (status, body) = send(
        &t.app,
        request(
            Method::PATCH,
            "/drinks/999",
            Some(&bearer),
            Some(serde_json::json!({"title": "water"})),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], 404);
}

#[tokio::test]
async fn test_delete_drink() {
    let t = setup().await;
    let bearer = token(&["delete:drinks"]);
    let (status, body) = send(
        &t.app,
        request(Method::DELETE, "/drinks/1", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({"success": true, "delete": 1}));
    assert!(t.repo.find_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_unknown_drink() {
    let t = setup().await;
    let bearer = token(&["delete:drinks"]);
    let (status, body) = send(
        &t.app,
        request(Method::DELETE, "/drinks/42", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, serde_json::json!({"success": false, "delete": 42}));
}

#[tokio::test]
async fn test_delete_requires_delete_permission() {
    let t = setup().await;
    let bearer = token(&["patch:drinks"]);
    let (status, body) = send(
        &t.app,
        request(Method::DELETE, "/drinks/1", Some(&bearer), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "permission_denied");
    assert_eq!(t.repo.find_all().await.unwrap().len(), 1);
}
