//! Integration tests for the directory endpoints outside the listing pages:
//! homepage, search bar suggestions, company pages, favorites, profile
//! forms and "locate me" statistics.

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, StatusCode},
    Router,
};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use studiomap_core::config::ListingConfig;
use studiomap_core::{InMemoryPartnerStore, NamedRef, Partner};
use studiomap_serve::{create_app, AppState, ServerConfig};
use tower::ServiceExt;

const BOUNDARY: &str = "studiomap-test-boundary";

fn user_header() -> HeaderName {
    HeaderName::from_static("x-user-id")
}

fn fixture_store() -> Arc<InMemoryPartnerStore> {
    let france = NamedRef::new(75, "France");
    let spain = NamedRef::new(34, "Spain");

    let mut blue_fox = Partner::new(1, "Blue Fox");
    blue_fox.city = Some("Paris".to_string());
    blue_fox.country = Some(france.clone());
    blue_fox.industries = vec![NamedRef::new(1, "VFX")];
    blue_fox.image = Some("aW1n".to_string());

    let mut pixel = Partner::new(2, "Pixel Barn");
    pixel.city = Some("Lyon".to_string());
    pixel.country = Some(france);
    pixel.industries = vec![NamedRef::new(2, "Animation")];
    pixel.image = Some("aW1n".to_string());

    let mut sol = Partner::new(3, "Sol Studio");
    sol.city = Some("Madrid".to_string());
    sol.country = Some(spain);
    sol.image = Some("aW1n".to_string());

    let store = InMemoryPartnerStore::with_partners([blue_fox, pixel, sol]);
    store.add_country(NamedRef::new(49, "Germany"));
    Arc::new(store)
}

fn create_test_app(store: Arc<InMemoryPartnerStore>) -> Router {
    let state = AppState::from_store(store, &ListingConfig::default(), ServerConfig::default())
        .unwrap();
    create_app(state)
}

fn create_test_server() -> TestServer {
    TestServer::new(create_test_app(fixture_store())).unwrap()
}

fn multipart_body(fields: &[(&str, &str)], image: Option<&[u8]>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some(bytes) = image {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"image_file\"; filename=\"logo.png\"\r\nContent-Type: image/png\r\n\r\n",
                BOUNDARY
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Helper to post a multipart profile form
async fn post_profile_form(router: Router, uri: &str, body: Vec<u8>) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_homepage_counts_companies_by_country() {
    let server = create_test_server();

    let response = server.get("/").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let counts = body["by_countries"].as_array().unwrap();
    assert_eq!(counts.len(), 2);
    assert_eq!(counts[0]["country"]["name"], "Spain");
    assert_eq!(counts[0]["count"], 1);
    assert_eq!(counts[1]["country"]["name"], "France");
    assert_eq!(counts[1]["count"], 2);
}

#[tokio::test]
async fn test_autocomplete_suggestions() {
    let server = create_test_server();

    let response = server
        .get("/ajax/search_bar/get_auto_complete_search_values")
        .add_query_param("term", "an")
        .await;
    response.assert_status_ok();

    let values: Vec<String> = response.json();
    assert_eq!(values, vec!["Animation", "France", "Germany"]);
}

#[tokio::test]
async fn test_autocomplete_without_term_is_empty() {
    let server = create_test_server();

    let response = server
        .get("/ajax/search_bar/get_auto_complete_search_values")
        .await;
    response.assert_status_ok();

    let values: Vec<String> = response.json();
    assert!(values.is_empty());
}

#[tokio::test]
async fn test_company_page_by_slug() {
    let server = create_test_server();

    let response = server.get("/directory/company/blue-fox-1").await;
    response.assert_status_ok();

    let page: Value = response.json();
    assert_eq!(page["partner"]["name"], "Blue Fox");
    assert_eq!(page["url"], "/directory/company/blue-fox-1");
    assert_eq!(page["favorite"], Value::Null);

    let same_location = page["same_location"].as_array().unwrap();
    assert_eq!(same_location.len(), 1);
    assert_eq!(same_location[0]["name"], "Pixel Barn");
}

#[tokio::test]
async fn test_company_page_unknown_slug() {
    let server = create_test_server();

    let response = server.get("/directory/company/no-such-studio").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let response = server.get("/directory/company/ghost-99").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_favorite_round_trip_for_user() {
    let server = create_test_server();

    let response = server
        .post("/directory/company/1/favorite")
        .add_header(user_header(), HeaderValue::from_static("7"))
        .json(&json!({ "favorite": true }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["favorite"], true);

    let page: Value = server
        .get("/directory/company/blue-fox-1")
        .add_header(user_header(), HeaderValue::from_static("7"))
        .await
        .json();
    assert_eq!(page["favorite"], true);

    let page: Value = server
        .get("/directory/company/blue-fox-1")
        .add_header(user_header(), HeaderValue::from_static("8"))
        .await
        .json();
    assert_eq!(page["favorite"], false);
}

#[tokio::test]
async fn test_favorite_requires_user() {
    let server = create_test_server();

    let response = server
        .post("/directory/company/1/favorite")
        .json(&json!({ "favorite": true }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_favorite_unknown_company() {
    let server = create_test_server();

    let response = server
        .post("/directory/company/42/favorite")
        .add_header(user_header(), HeaderValue::from_static("7"))
        .json(&json!({ "favorite": true }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allows_user_header() {
    let router = create_test_app(fixture_store());

    let response = router
        .oneshot(
            Request::builder()
                .uri("/directory/company/1/favorite")
                .method("OPTIONS")
                .header("origin", "https://studios.example")
                .header("access-control-request-method", "POST")
                .header("access-control-request-headers", "content-type,x-user-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let allowed = response
        .headers()
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(allowed.contains("x-user-id"));
    assert!(allowed.contains("content-type"));
}

#[tokio::test]
async fn test_locate_me_records_stat() {
    let store = fixture_store();
    let server = TestServer::new(create_test_app(store.clone())).unwrap();

    let response = server
        .post("/locate_me")
        .add_header(user_header(), HeaderValue::from_static("3"))
        .json(&json!({ "success": true, "latitude": 48.85, "longitude": 2.35 }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let response = server
        .post("/locate_me")
        .json(&json!({ "success": false }))
        .await;
    response.assert_status(StatusCode::NO_CONTENT);

    let stats = store.locate_me_stats();
    assert_eq!(stats.len(), 2);
    assert!(stats[0].success);
    assert_eq!(stats[0].latitude, Some(48.85));
    assert!(!stats[1].success);
    assert!(stats[1].user_id.is_none());
}

#[tokio::test]
async fn test_create_company_from_profile_form() {
    let store = fixture_store();
    let router = create_test_app(store.clone());

    let body = multipart_body(
        &[
            ("name", "Nord Motion"),
            ("city", "Berlin"),
            ("country_id", "49"),
            ("industry_ids", "2"),
            ("csrf_token", "ignored"),
        ],
        Some(&b"png-bytes"[..]),
    );
    let (status, page) = post_profile_form(router, "/directory/company/create", body).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(page["partner"]["id"], 4);
    assert_eq!(page["partner"]["country"]["name"], "Germany");
    assert_eq!(page["partner"]["industries"][0]["name"], "Animation");
    assert_eq!(page["partner"]["image"], "cG5nLWJ5dGVz");
    assert_eq!(page["url"], "/directory/company/nord-motion-4");
    assert_eq!(store.len(), 4);
}

#[tokio::test]
async fn test_create_company_requires_name() {
    let router = create_test_app(fixture_store());

    let body = multipart_body(&[("city", "Berlin")], None);
    let (status, _) = post_profile_form(router, "/directory/company/create", body).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_save_company_updates_submitted_fields() {
    let store = fixture_store();
    let router = create_test_app(store.clone());

    let body = multipart_body(&[("city", "Marseille"), ("remove_image", "1")], None);
    let (status, page) = post_profile_form(router, "/directory/company/1/save", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["partner"]["name"], "Blue Fox");
    assert_eq!(page["partner"]["city"], "Marseille");
    assert_eq!(page["partner"]["image"], Value::Null);
    assert_eq!(page["partner"]["industries"][0]["name"], "VFX");
}

#[tokio::test]
async fn test_save_company_rejects_bad_country() {
    let router = create_test_app(fixture_store());

    let body = multipart_body(&[("country_id", "france")], None);
    let (status, _) = post_profile_form(router.clone(), "/directory/company/1/save", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let body = multipart_body(&[("country_id", "999")], None);
    let (status, _) = post_profile_form(router, "/directory/company/1/save", body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_saving_a_company_is_visible_in_listing() {
    let store = fixture_store();
    let server = TestServer::new(create_test_app(store.clone())).unwrap();

    let before: Value = server.get("/directory?search=marseille").await.json();
    assert_eq!(before["partner_count"], 0);

    let router = create_test_app(store);
    let body = multipart_body(&[("city", "Marseille")], None);
    let (status, _) = post_profile_form(router, "/directory/company/2/save", body).await;
    assert_eq!(status, StatusCode::OK);

    let after: Value = server.get("/directory?search=marseille").await.json();
    assert_eq!(after["partner_count"], 1);
}
