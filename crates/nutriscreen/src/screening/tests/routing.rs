use super::common::*;
use axum::body::Body;
use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::config::ImportConfig;
use crate::screening::import::{ImportOptions, IntakeChannel};
use crate::screening::router::register_handler;
use crate::screening::ScreeningService;

fn json_request(uri: &str, payload: &serde_json::Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(payload).unwrap()))
        .unwrap()
}

fn csv_request(uri: &str, csv: String) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "text/csv")
        .body(Body::from(csv))
        .unwrap()
}

fn form_json() -> serde_json::Value {
    serde_json::to_value(adult_form()).unwrap()
}

#[tokio::test]
async fn assess_route_returns_assessment() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request("/api/v1/screening/assess", &form_json()))
        .await
        .unwrap();

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], 71);
    assert_eq!(body["level"], "high");
}

#[tokio::test]
async fn assess_route_returns_unprocessable_with_issues() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let mut payload = form_json();
    payload["barangay"] = "Pilar".into();

    let response = router
        .oneshot(json_request("/api/v1/screening/assess", &payload))
        .await
        .unwrap();

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["issues"][0]["field"], "barangay");
}

#[tokio::test]
async fn records_route_creates_then_conflicts() {
    let (service, store) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(json_request("/api/v1/screening/records", &form_json()))
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["user_email"], "ana@example.com");
    assert_eq!(body["assessment"]["score"], 71);
    assert_eq!(store.len(), 1);

    let response = router
        .oneshot(json_request("/api/v1/screening/records", &form_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_handler_returns_internal_error_on_store_failure() {
    let service = Arc::new(ScreeningService::new(Arc::new(UnavailableStore)));

    let response =
        register_handler::<UnavailableStore>(State(service), axum::Json(adult_form())).await;

    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "store unavailable: database offline");
}

#[tokio::test]
async fn import_route_reports_row_failures_with_ok_status() {
    let (service, _) = build_service();
    let router = router_with_service(service);
    let csv = mobile_csv().replace(",boy,18,", ",Male,18,");

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/v1/screening/import?skip_duplicates=true")
                .header(header::CONTENT_TYPE, "text/csv")
                .body(Body::from(csv.clone()))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success_count"], 2);
    assert_eq!(body["failed_count"], 1);
    assert_eq!(body["errors"][0]["row_number"], 3);

    let response = router
        .oneshot(
            Request::post("/api/v1/screening/import?skip_duplicates=true&channel=legacy_template")
                .body(Body::from(csv))
                .unwrap(),
        )
        .await
        .unwrap();
    let (_, body) = json_body(response).await;
    assert_eq!(body["skipped_count"], 2);
}

#[tokio::test]
async fn template_and_export_routes_serve_csv() {
    let (service, _) = build_service();
    service
        .register(adult_form(), as_of())
        .expect("registered");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/screening/template")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let (status, text) = text_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert!(text.starts_with("user_email,name,birthday,gender,weight,height,barangay,income,"));

    let response = router
        .oneshot(
            Request::get("/api/v1/screening/export")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, text) = text_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(text.lines().count(), 2);
    assert!(text.contains("ana@example.com"));
}

#[tokio::test]
async fn import_route_applies_configured_defaults_unless_overridden() {
    let (service, store) = build_service();
    let service = service.with_import_defaults(ImportConfig {
        skip_duplicates: true,
        channel: IntakeChannel::MobileCsv,
    });
    service.import_csv(&mobile_csv(), &ImportOptions::new(as_of()));
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(csv_request("/api/v1/screening/import", mobile_csv()))
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["skipped_count"], 3);
    assert_eq!(body["failed_count"], 0);

    let response = router
        .oneshot(csv_request(
            "/api/v1/screening/import?skip_duplicates=false",
            mobile_csv(),
        ))
        .await
        .unwrap();
    let (_, body) = json_body(response).await;
    assert_eq!(body["failed_count"], 3);
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn record_routes_prefill_update_and_delete() {
    let (service, store) = build_service();
    service.register(adult_form(), as_of()).expect("registered");
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/screening/records/ana@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, mut form) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["barangay"], "Santo Niño");

    form["weight"] = "60".into();
    let response = router
        .clone()
        .oneshot(
            Request::put("/api/v1/screening/records/ana@example.com")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&form).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assessment"]["score"], 46);

    let response = router
        .clone()
        .oneshot(
            Request::delete("/api/v1/screening/records/ana@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(store.len(), 0);

    let response = router
        .oneshot(
            Request::get("/api/v1/screening/records/ana@example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "no screening found for ana@example.com");
}

#[tokio::test]
async fn barangay_delete_and_summary_routes() {
    let (service, store) = build_service();
    service.import_csv(&mobile_csv(), &ImportOptions::new(as_of()));
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(
            Request::get("/api/v1/screening/summary")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["distribution"]["high"], 1);
    assert_eq!(body["barangays"].as_array().map(Vec::len), Some(3));

    let response = router
        .clone()
        .oneshot(
            Request::delete("/api/v1/screening/barangays/San%20Roque/records")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (status, body) = json_body(response).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["barangay"], "San Roque");
    assert_eq!(body["deleted_count"], 1);
    assert_eq!(store.len(), 2);

    let response = router
        .oneshot(
            Request::get("/api/v1/screening/summary?barangay=San%20Roque")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let (_, body) = json_body(response).await;
    assert_eq!(body["total"], 0);
}
