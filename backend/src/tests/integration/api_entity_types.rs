use axum::http::StatusCode;
use serde_json::{json, Value};
use serial_test::serial;
use tower::ServiceExt;
use uuid::Uuid;

use crate::tests::fixtures::EntityTypeFixture;
use crate::tests::helpers::{get_request, json_request, json_request_as, read_json};
use crate::tests::TestContext;

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_entity_type_lifecycle() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let fixture = EntityTypeFixture::default();
    let owner = Uuid::new_v4();

    let response = app
        .clone()
        .oneshot(json_request_as(&owner.to_string(), "POST", "/api/v1/entity-types", &fixture.to_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created: Value = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["icon"], "box");
    assert_eq!(created["user_id"], owner.to_string());
    assert_eq!(created["statuses"].as_array().unwrap().len(), 2);
    assert_eq!(created["statuses"][1]["name"], "Urgent");

    let response = app
        .clone()
        .oneshot(get_request(&format!("/api/v1/entity-types/slug/{}", fixture.slug)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let by_slug: Value = read_json(response).await;
    assert_eq!(by_slug["id"], created["id"]);

    // Statuses are replaced wholesale on update.
    let mut update = fixture.to_json();
    update["name"] = json!("Renamed");
    update["statuses"] = json!([{ "name": "Done" }]);
    let response = app
        .clone()
        .oneshot(json_request("PUT", &format!("/api/v1/entity-types/{}", id), &update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Value = read_json(response).await;
    assert_eq!(updated["name"], "Renamed");
    assert_eq!(updated["statuses"].as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(
            axum::http::Request::builder()
                .method("DELETE")
                .uri(format!("/api/v1/entity-types/{}", id))
                .body(axum::body::Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get_request(&format!("/api/v1/entity-types/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_duplicate_slug_conflicts() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let fixture = EntityTypeFixture::default();

    let first = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/entity-types", &fixture.to_json()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app
        .oneshot(json_request("POST", "/api/v1/entity-types", &fixture.to_json()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);

    ctx.cleanup().await;
}

#[tokio::test]
#[serial]
#[ignore = "requires a Docker daemon or TEST_DATABASE_URL"]
async fn test_update_keeps_echoed_status_ids() {
    let ctx = TestContext::new().await;
    let app = crate::app(ctx.state());
    let fixture = EntityTypeFixture::default();

    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/v1/entity-types", &fixture.to_json()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = read_json(response).await;
    let id = created["id"].as_str().unwrap().to_string();
    let urgent_id = created["statuses"][1]["id"].clone();

    // Echo the stored statuses back, reordered, plus one new status.
    let mut update = fixture.to_json();
    update["statuses"] = json!([
        { "id": urgent_id, "name": "Urgent" },
        { "id": created["statuses"][0]["id"], "name": "Open" },
        { "name": "Closed" }
    ]);
    let response = app
        .oneshot(json_request("PUT", &format!("/api/v1/entity-types/{}", id), &update))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated: Value = read_json(response).await;
    let statuses = updated["statuses"].as_array().unwrap();
    assert_eq!(statuses.len(), 3);
    assert_eq!(statuses[0]["id"], urgent_id);
    assert_eq!(statuses[1]["id"], created["statuses"][0]["id"]);
    assert_ne!(statuses[2]["id"], urgent_id);

    ctx.cleanup().await;
}
