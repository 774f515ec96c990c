use axum::http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;
use uuid::Uuid;

use crate::automations::{PgAutomationStore, RecordStore, RuleStore};
use crate::tests::fixtures::{escalation_rule, record_fixture, EntityTypeFixture};
use crate::tests::helpers::{get_request, json_request, read_json, wait_for_record};
use crate::tests::TestContext;

async fn create_entity_type(app: &axum::Router) -> String {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/entity-types", &EntityTypeFixture::default().to_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = read_json(response).await;
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_created_record_runs_matching_rule() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let entity_type_id = create_entity_type(&app).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/entity-types/{}/automations", entity_type_id),
            &escalation_rule("urgent"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/api/v1/entity-types/{}/records", entity_type_id),
            &record_fixture("high"),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let record: Value = read_json(response).await;
    let record_id: Uuid = record["id"].as_str().unwrap().parse().unwrap();

    let data = wait_for_record(&ctx.db_pool, record_id, |data| data["status_id"] == "urgent").await;
    assert_eq!(data["status_id"], "urgent");
    assert_eq!(data["priority"], "high");

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_record_crud_and_ordering() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let entity_type_id = create_entity_type(&app).await;
    let records_uri = format!("/api/v1/entity-types/{}/records", entity_type_id);

    let mut ids = Vec::new();
    for priority in ["low", "medium"] {
        let response = app
            .clone()
            .oneshot(json_request("POST", &records_uri, &record_fixture(priority)))
            .await
            .unwrap();
        let body: Value = read_json(response).await;
        ids.push(body["id"].as_str().unwrap().to_string());
    }

    let response = app.clone().oneshot(get_request(&records_uri)).await.unwrap();
    let listed: Vec<Value> = read_json(response).await;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["id"], ids[1].as_str());

    let response = app
        .clone()
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/records/{}", ids[0]),
            &json!({ "data": { "priority": "high", "age": "30" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = read_json(response).await;
    assert_eq!(updated["data"]["priority"], "high");

    let response = app
        .oneshot(get_request(&format!("/api/v1/records/{}", Uuid::new_v4())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_store_skips_inactive_rules() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let entity_type_id = create_entity_type(&app).await;
    let uri = format!("/api/v1/entity-types/{}/automations", entity_type_id);

    let mut inactive = escalation_rule("urgent");
    inactive["is_active"] = json!(false);
    for rule in [escalation_rule("urgent"), inactive] {
        let response = app.clone().oneshot(json_request("POST", &uri, &rule)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let store = PgAutomationStore::new(ctx.db_pool.clone());
    let entity_type_id: Uuid = entity_type_id.parse().unwrap();

    let rules = store.query_rules(entity_type_id, "created").await.unwrap();
    assert_eq!(rules.len(), 1);
    assert!(store.query_rules(entity_type_id, "updated").await.unwrap().is_empty());

    let missing = store
        .update_record(Uuid::new_v4(), &Default::default(), chrono::Utc::now())
        .await;
    assert!(missing.is_err());

    ctx.cleanup().await;
}
