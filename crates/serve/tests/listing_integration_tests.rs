//! Integration tests for the listing pages
//!
//! These tests drive the full router (middleware included) against an
//! in-memory partner store.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use studiomap_core::config::ListingConfig;
use studiomap_core::{InMemoryPartnerStore, NamedRef, Partner};
use studiomap_serve::{create_app, AppState, ServerConfig};
use tower::ServiceExt;

fn studio(id: i64, name: &str, city: &str, industries: &[(i64, &str)]) -> Partner {
    let mut partner = Partner::new(id, name);
    partner.email = Some(format!("hello@studio{}.example", id));
    partner.city = Some(city.to_string());
    partner.state = Some(NamedRef::new(11, "Ile-de-France"));
    partner.country = Some(NamedRef::new(75, "France"));
    partner.industries = industries
        .iter()
        .map(|(id, name)| NamedRef::new(*id, *name))
        .collect();
    partner.latitude = Some(48.85);
    partner.longitude = Some(2.35);
    partner
}

fn test_state() -> AppState {
    let mut inactive = studio(3, "Old Paris Works", "Paris", &[(1, "VFX")]);
    inactive.active = false;
    let mut unlocated = studio(4, "Cloud Animation", "Paris", &[(2, "Animation")]);
    unlocated.latitude = None;
    let mut closed = studio(5, "Closed Shop", "Paris", &[(1, "VFX")]);
    closed.status = studiomap_core::CompanyStatus::Closed;

    let store = InMemoryPartnerStore::with_partners([
        studio(1, "Paris Studio", "Lyon", &[(1, "VFX"), (2, "Animation")]),
        studio(2, "Atelier Nord", "Paris", &[(2, "Animation")]),
        inactive,
        unlocated,
        closed,
    ]);

    AppState::from_store(
        Arc::new(store),
        &ListingConfig::default(),
        ServerConfig::default(),
    )
    .unwrap()
}

fn create_test_router() -> (Router, AppState) {
    let state = test_state();
    (create_app(state.clone()), state)
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

/// Helper to make GET request
async fn make_get_request(router: Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    (status, body_string(response).await)
}

/// Helper to make form POST request
async fn make_form_request(router: Router, uri: &str, form: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header("content-type", "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    (status, body_string(response).await)
}

fn row_names(body: &str) -> Vec<String> {
    let rows: Value = serde_json::from_str(body).unwrap();
    rows.as_array()
        .unwrap()
        .iter()
        .map(|row| row["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_get_partners_paris_example() {
    let (router, _) = create_test_router();

    let (status, body) = make_form_request(
        router,
        "/directory/get_partners",
        "search=paris&company_status=open",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let names = row_names(&body);
    assert_eq!(names.len(), 3);
    assert!(names[0].contains("Atelier Nord"));
    assert!(names[1].contains("Cloud Animation"));
    assert!(names[2].contains("Paris Studio"));
    assert!(!body.contains("Old Paris Works"));
}

#[tokio::test]
async fn test_get_partners_ands_sub_terms() {
    let (router, _) = create_test_router();

    let (_, body) = make_form_request(
        router,
        "/directory/get_partners",
        "search=paris+vfx",
    )
    .await;

    let names = row_names(&body);
    assert_eq!(names.len(), 1);
    assert!(names[0].contains("Paris Studio"));
}

#[tokio::test]
async fn test_get_partners_closed_status() {
    let (router, _) = create_test_router();

    let (status, body) =
        make_form_request(router, "/directory/get_partners", "company_status=closed").await;

    assert_eq!(status, StatusCode::OK);
    let names = row_names(&body);
    assert_eq!(names.len(), 1);
    assert!(names[0].contains("Closed Shop"));
    assert!(body.contains("company_status=closed"));
}

#[tokio::test]
async fn test_get_partners_row_shape() {
    let (router, _) = create_test_router();

    let (_, body) = make_form_request(router, "/directory/get_partners", "search=nord").await;
    let rows: Value = serde_json::from_str(&body).unwrap();
    let row = &rows[0];

    assert_eq!(row["email"], "hello@studio2.example");
    assert_eq!(row["city"], "Paris");
    assert_eq!(row["state_name"], "Ile-de-France");
    assert_eq!(row["country_name"], "France");
    assert!(row["logo"]
        .as_str()
        .unwrap()
        .contains("/website/image/res.partner/2/image_small"));
    assert!(row["industries"]
        .as_str()
        .unwrap()
        .contains("/directory/list?search=Animation&company_status=open"));
}

#[tokio::test]
async fn test_map_page_omits_records_without_coordinates() {
    let (router, _) = create_test_router();

    let (status, body) = make_get_request(router, "/directory?search=paris").await;
    assert_eq!(status, StatusCode::OK);

    let page: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(page["search"], "paris");
    assert_eq!(page["company_status"], "open");
    assert_eq!(page["partner_count"], 3);
    assert_eq!(page["url"], "/directory");
    assert_eq!(page["list_url"], "/directory/list");
    assert_eq!(page["keep"], "/directory?search=paris&company_status=open");

    let geoloc: Value = serde_json::from_str(page["geoloc"].as_str().unwrap()).unwrap();
    let markers = geoloc.as_object().unwrap();
    assert_eq!(markers.len(), 2);
    assert!(markers.contains_key("1"));
    assert!(markers.contains_key("2"));

    let marker = markers["1"].as_array().unwrap();
    assert_eq!(marker[0], 48.85);
    let html = marker[2].as_str().unwrap();
    assert!(html.contains("/directory?search=VFX&company_status=open"));
    assert!(html.contains("/directory?search=Animation&company_status=open"));
}

#[tokio::test]
async fn test_list_page_context() {
    let (router, _) = create_test_router();

    let (status, body) =
        make_get_request(router, "/directory/list?search=vfx&company_status=closed").await;
    assert_eq!(status, StatusCode::OK);

    let page: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(page["url"], "/directory/list");
    assert_eq!(page["map_url"], "/directory");
    assert_eq!(page["keep"], "/directory/list?search=vfx&company_status=closed");
}

#[tokio::test]
async fn test_list_force_cache_reset_rebuilds_payload() {
    let (router, state) = create_test_router();

    let (_, first) =
        make_form_request(router.clone(), "/directory/get_partners", "search=paris").await;
    let cached = state.listing.list_payload("paris", Default::default(), false).await.unwrap();
    assert_eq!(&*cached, first);

    let (status, _) = make_get_request(router, "/directory/list?force_cache_reset=1").await;
    assert_eq!(status, StatusCode::OK);

    let rebuilt = state.listing.list_payload("paris", Default::default(), false).await.unwrap();
    assert!(!Arc::ptr_eq(&cached, &rebuilt));
    assert_eq!(cached, rebuilt);
}

#[tokio::test]
async fn test_map_force_cache_reset_rebuilds_markers() {
    let (router, state) = create_test_router();

    let (_, first) = make_get_request(router.clone(), "/directory?search=paris").await;
    let cached = state
        .listing
        .map_payload("paris", Default::default(), false)
        .await
        .unwrap();
    let page: Value = serde_json::from_str(&first).unwrap();
    assert_eq!(page["geoloc"], &*cached.geoloc);

    let (status, body) =
        make_get_request(router, "/directory?search=paris&force_cache_reset=1").await;
    assert_eq!(status, StatusCode::OK);
    let page: Value = serde_json::from_str(&body).unwrap();

    let rebuilt = state
        .listing
        .map_payload("paris", Default::default(), false)
        .await
        .unwrap();
    assert!(!Arc::ptr_eq(&cached.geoloc, &rebuilt.geoloc));
    assert_eq!(cached.geoloc, rebuilt.geoloc);
    assert_eq!(page["geoloc"], &*rebuilt.geoloc);
}

#[tokio::test]
async fn test_invalid_status_is_rejected() {
    let (router, _) = create_test_router();

    let (status, _) = make_get_request(router, "/directory?company_status=sometimes").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_endpoint() {
    let (router, _) = create_test_router();

    let (status, body) = make_get_request(router, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"status\":\"healthy\""));
}
