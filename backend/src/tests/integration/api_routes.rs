// Router tests that answer before any database access

use axum::http::StatusCode;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::tests::helpers::{get_request, json_request, json_request_as, read_json};
use crate::tests::offline_state;

#[tokio::test]
async fn test_field_type_catalogue() {
    let app = crate::app(offline_state());

    let response = app.oneshot(get_request("/api/v1/field-types")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Vec<Value> = read_json(response).await;
    assert_eq!(body.len(), 11);
    assert_eq!(body[0], json!({ "type": "text", "label": "Text" }));
    assert_eq!(body[10]["type"], "relation");
}

#[tokio::test]
async fn test_invalid_entity_type_is_rejected() {
    let app = crate::app(offline_state());

    let payload = json!({
        "name": "",
        "slug": "Not A Slug",
        "fields": [{ "id": Uuid::new_v4(), "name": "stage", "type": "select", "label": "Stage" }]
    });
    let response = app
        .oneshot(json_request("POST", "/api/v1/entity-types", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = read_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["details"]["name"].is_array());
    assert!(body["details"]["slug"].is_array());
    assert_eq!(
        body["details"]["fields[0]"][0],
        "Select field must have at least one option"
    );
}

#[tokio::test]
async fn test_malformed_user_header_is_unauthorized() {
    let app = crate::app(offline_state());

    let payload = json!({ "name": "Lead", "slug": "lead" });
    let response = app
        .oneshot(json_request_as("not-a-uuid", "POST", "/api/v1/entity-types", &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rule_without_trigger_is_rejected() {
    let app = crate::app(offline_state());

    let uri = format!("/api/v1/entity-types/{}/automations", Uuid::new_v4());
    let response = app
        .oneshot(json_request("POST", &uri, &json!({ "name": "no trigger", "actions": [] })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = read_json(response).await;
    assert!(body["details"]["trigger"].is_array());
}

#[tokio::test]
async fn test_non_uuid_path_is_bad_request() {
    let app = crate::app(offline_state());

    let response = app.oneshot(get_request("/api/v1/records/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_unreachable_database() {
    let app = crate::app(offline_state());

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body: Value = read_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["automations_enabled"], true);
}
