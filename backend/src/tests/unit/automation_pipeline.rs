// Engine tests with the real reqwest webhook client against a mock server

use chrono::Utc;
use serde_json::json;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use wiremock::matchers::{body_json, body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use recordflow_shared::{FieldValue, RecordData};

use crate::automations::{
    Action, ActionStatus, AutomationEngine, AutomationRule, Condition, HttpWebhookClient,
    MockRecordStore, MockRuleStore, TriggerEvent,
};
use crate::tests::helpers::{create_mock_webhook_server, init_test_logging};

fn rule(name: &str, conditions: Vec<Condition>, actions: Vec<Action>) -> AutomationRule {
    AutomationRule {
        id: Uuid::new_v4(),
        entity_type_id: Uuid::nil(),
        name: name.to_string(),
        trigger: "created".to_string(),
        conditions,
        actions,
        is_active: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn data(value: serde_json::Value) -> RecordData {
    serde_json::from_value(value).unwrap()
}

fn engine_with(rules: Vec<AutomationRule>, records: MockRecordStore) -> AutomationEngine {
    let mut store = MockRuleStore::new();
    store.expect_query_rules().returning(move |_, _| Ok(rules.clone()));

    let webhooks = HttpWebhookClient::new("recordflow-test", None).unwrap();
    AutomationEngine::new(Arc::new(store), Arc::new(records), Arc::new(webhooks))
}

#[tokio::test]
async fn test_webhook_posts_templated_json() {
    init_test_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/42"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({ "v": "a" })))
        .respond_with(ResponseTemplate::new(200).set_body_string("thanks"))
        .expect(1)
        .mount(&server)
        .await;

    let hook = Action::webhook(
        &format!("{}/{{{{id}}}}", server.uri()),
        None,
        Some(r#"{"v":"{{name}}"}"#),
    );
    let engine = engine_with(vec![rule("notify", vec![], vec![hook])], MockRecordStore::new());

    let event = TriggerEvent::record_created(Uuid::nil(), Uuid::new_v4(), data(json!({ "id": "42", "name": "a" })));
    let report = engine.process_event(event).await.unwrap();

    assert_eq!(report.actions[0].status, ActionStatus::Completed);
    assert_eq!(report.actions[0].output.as_deref(), Some("thanks"));
}

#[tokio::test]
async fn test_non_json_body_is_sent_raw() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/raw"))
        .and(body_string("stage=review"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let hook = Action::webhook(&format!("{}/raw", server.uri()), Some("put"), Some("stage={{stage}}"));
    let engine = engine_with(vec![rule("notify", vec![], vec![hook])], MockRecordStore::new());

    let event = TriggerEvent::record_created(Uuid::nil(), Uuid::new_v4(), data(json!({ "stage": "review" })));
    let report = engine.process_event(event).await.unwrap();

    assert!(report.actions[0].is_success());
}

#[tokio::test]
async fn test_webhook_sees_mutations_from_earlier_actions() {
    let server = create_mock_webhook_server().await;
    let received = Arc::new(Mutex::new(Vec::new()));

    let mut records = MockRecordStore::new();
    let log = received.clone();
    records.expect_update_record().returning(move |_, data, _| {
        log.lock().unwrap().push(data.clone());
        Ok(())
    });

    let rules = vec![
        rule(
            "escalate",
            vec![Condition::equals("priority", "high")],
            vec![Action::status_update("urgent"), Action::field_update("ticket", "42")],
        ),
        rule(
            "notify",
            vec![Condition::equals("status_id", "urgent")],
            vec![Action::webhook(&format!("{}/hooks/{{{{ticket}}}}", server.uri()), None, None)],
        ),
    ];

    let engine = engine_with(rules, records);
    let event = TriggerEvent::record_created(Uuid::nil(), Uuid::new_v4(), data(json!({ "priority": "high" })));
    let report = engine.process_event(event).await.unwrap();

    assert_eq!(report.rules_executed, 2);
    assert_eq!(report.failed_actions(), 0);
    assert_eq!(report.actions[2].output.as_deref(), Some("ok"));

    // One write per mutating action, each carrying the full record.
    let writes = received.lock().unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0].get("ticket"), None);
    assert_eq!(writes[1]["status_id"], FieldValue::text("urgent"));
    assert_eq!(writes[1]["ticket"], FieldValue::text("42"));
}

#[tokio::test]
async fn test_unreachable_webhook_does_not_block_later_actions() {
    let mut records = MockRecordStore::new();
    records.expect_update_record().times(1).returning(|_, _, _| Ok(()));

    let rules = vec![rule(
        "best effort",
        vec![],
        vec![
            Action::webhook("http://127.0.0.1:1/down", None, Some("ping")),
            Action::field_update("notified", false),
        ],
    )];

    let report = engine_with(rules, records)
        .process_event(TriggerEvent::record_created(Uuid::nil(), Uuid::new_v4(), RecordData::new()))
        .await
        .unwrap();

    assert_eq!(report.actions[0].status, ActionStatus::Failed);
    assert_eq!(report.actions[1].status, ActionStatus::Completed);
    assert_eq!(report.data["notified"], FieldValue::Bool(false));
}
