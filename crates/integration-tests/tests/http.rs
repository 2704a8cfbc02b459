//! Integration tests for the storefront router.
//!
//! Most tests point the Supabase clients at a closed local port, covering
//! the paths that are answered without the backend plus how backend failures
//! are reported. The anonymous store tests run against a local REST catalog
//! and carry the session cookie from one request to the next.

#![allow(clippy::unwrap_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use maison_core::Product;
use maison_integration_tests::{config_for, product, spawn_rest_catalog, test_config};
use maison_storefront::app;
use maison_storefront::middleware::session::SESSION_COOKIE_NAME;
use maison_storefront::state::AppState;

fn router() -> Router {
    app(AppState::new(test_config()))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.7")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// One router instance, with the session cookie replayed like a browser.
struct Browser {
    router: Router,
    cookie: Option<String>,
}

impl Browser {
    async fn new(products: Vec<Product>) -> Self {
        let url = spawn_rest_catalog(products).await;
        Self {
            router: app(AppState::new(config_for(&url))),
            cookie: None,
        }
    }

    async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, HeaderValue::from_str(cookie).unwrap());
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }
}

// =============================================================================
// Health and middleware
// =============================================================================

#[tokio::test]
async fn test_liveness() {
    let response = router().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_backend() {
    let response = router().oneshot(get("/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_security_headers_and_request_id() {
    let request = Request::builder()
        .uri("/api/support/faq")
        .header("x-request-id", "edge-7f3a")
        .body(Body::empty())
        .unwrap();
    let response = router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-request-id"], "edge-7f3a");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["cache-control"], "no-store, max-age=0");
}

// =============================================================================
// Support
// =============================================================================

#[tokio::test]
async fn test_faq_lists_categories() {
    let response = router().oneshot(get("/api/support/faq")).await.unwrap();
    let body = json_body(response).await;
    let ids: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["warranty", "service", "authenticity", "care"]);
}

#[tokio::test]
async fn test_contact_validation() {
    let app = router();

    let missing = app
        .clone()
        .oneshot(post_json(
            "/api/support/contact",
            &json!({"name": "Ada", "email": "ada@example.com", "message": "Hello"}),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(missing).await["error"].as_str().is_some());

    let accepted = app
        .oneshot(post_json(
            "/api/support/contact",
            &json!({
                "name": "Ada",
                "email": "ada@example.com",
                "subject": "Service",
                "message": "My Explorer needs a service."
            }),
        ))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(json_body(accepted).await["success"], true);
}

// =============================================================================
// Store
// =============================================================================

#[tokio::test]
async fn test_anonymous_store_starts_empty() {
    let response = router().oneshot(get("/api/store")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["signed_in"], false);
    assert_eq!(body["cart_count"], 0);
    assert_eq!(body["summary"]["formatted_grand_total"], "$0.00");
}

#[tokio::test]
async fn test_reading_store_does_not_create_session() {
    let router = router();
    for _ in 0..5 {
        let response = router.clone().oneshot(get("/api/store")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }
}

#[tokio::test]
async fn test_anonymous_cart_persists_in_session() {
    let submariner = product("Submariner Date", 10_250, Some("Submariner"), None, None);
    let mut browser = Browser::new(vec![submariner.clone()]).await;
    let add = json!({ "product_id": submariner.id });

    let response = browser.send(post_json("/api/cart/items", &add)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = browser.cookie.clone().unwrap();
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));

    let response = browser.send(post_json("/api/cart/items", &add)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["cart_count"], 2);
    assert_eq!(body["cart_items"].as_array().unwrap().len(), 1);
    assert_eq!(body["cart_items"][0]["quantity"], 2);
    assert_eq!(body["cart_items"][0]["id"], submariner.id.to_string());

    // A fresh request with the cookie sees the same cart
    let body = json_body(browser.send(get("/api/store")).await).await;
    assert_eq!(body["signed_in"], false);
    assert_eq!(body["cart_count"], 2);
    assert_eq!(body["summary"]["formatted_subtotal"], "$20,500.00");
}

#[tokio::test]
async fn test_anonymous_add_of_unknown_product_is_not_found() {
    let mut browser = Browser::new(Vec::new()).await;
    let response = browser
        .send(post_json(
            "/api/cart/items",
            &json!({ "product_id": "3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(browser.cookie.is_none());
}

#[tokio::test]
async fn test_anonymous_wishlist_rejects_duplicates() {
    let datejust = product("Datejust 36", 8_950, Some("Datejust"), None, None);
    let mut browser = Browser::new(vec![datejust.clone()]).await;
    let add = json!({ "product_id": datejust.id });

    let response = browser.send(post_json("/api/wishlist/items", &add)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["wishlist_items"][0]["id"], datejust.id.to_string());

    let response = browser.send(post_json("/api/wishlist/items", &add)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(response).await["error"], "Already in wishlist");

    let body = json_body(browser.send(get("/api/store")).await).await;
    assert_eq!(body["wishlist_items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_anonymous_checkout_empties_cart_and_sign_out_keeps_local_store() {
    let submariner = product("Submariner Date", 10_250, Some("Submariner"), None, None);
    let datejust = product("Datejust 36", 8_950, Some("Datejust"), None, None);
    let mut browser = Browser::new(vec![submariner.clone(), datejust.clone()]).await;
    browser
        .send(post_json("/api/cart/items", &json!({ "product_id": submariner.id })))
        .await;
    browser
        .send(post_json("/api/wishlist/items", &json!({ "product_id": datejust.id })))
        .await;

    let response = browser.send(post_json("/api/checkout", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert!(body["confirmation"].as_str().unwrap().starts_with("MS-"));
    assert_eq!(body["items"][0]["quantity"], 1);
    assert_eq!(body["store"]["cart_count"], 0);

    let body = json_body(browser.send(get("/api/store")).await).await;
    assert_eq!(body["cart_count"], 0);
    assert_eq!(body["wishlist_items"].as_array().unwrap().len(), 1);

    let response = browser.send(post_json("/api/checkout", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = browser.send(post_json("/api/auth/sign-out", &json!({}))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["user"], Value::Null);
    assert_eq!(body["store"]["signed_in"], false);
    assert_eq!(body["store"]["cart_count"], 0);
    assert_eq!(body["store"]["wishlist_items"][0]["id"], datejust.id.to_string());
}

#[tokio::test]
async fn test_checkout_of_empty_cart_is_rejected() {
    let response = router()
        .oneshot(post_json("/api/checkout", &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_negative_quantity_is_rejected() {
    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/api/cart/items/3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"quantity": -1}).to_string()))
        .unwrap();
    let response = router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_backend_failure_hides_details() {
    let response = router()
        .oneshot(post_json(
            "/api/cart/items",
            &json!({"product_id": "3f2a9c1e-8b7d-4e6f-a5c4-1d2e3f4a5b6c"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(json_body(response).await["error"], "External service error");
}

// =============================================================================
// Auth and admin
// =============================================================================

#[tokio::test]
async fn test_admin_requires_sign_in() {
    for uri in ["/api/admin/products", "/api/admin/boutiques", "/api/admin/stats"] {
        let response = router().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
}

#[tokio::test]
async fn test_me_without_session() {
    let response = router().oneshot(get("/api/auth/me")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["user"], Value::Null);
}

#[tokio::test]
async fn test_sign_in_rejects_malformed_email() {
    let response = router()
        .oneshot(post_json(
            "/api/auth/sign-in",
            &json!({"email": "not-an-email", "password": "correct horse"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["error"], "Invalid email address");
}

#[tokio::test]
async fn test_sign_in_is_rate_limited_per_client() {
    let app = router();
    let mut statuses = Vec::new();
    for _ in 0..7 {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/auth/sign-in",
                &json!({"email": "nobody", "password": "x"}),
            ))
            .await
            .unwrap();
        statuses.push(response.status());
    }
    assert!(statuses.contains(&StatusCode::BAD_REQUEST));
    assert_eq!(statuses.last(), Some(&StatusCode::TOO_MANY_REQUESTS));
}
