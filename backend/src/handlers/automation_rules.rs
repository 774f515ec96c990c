use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, put},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::entity_types::fetch_entity_type;
use crate::automations::AutomationRuleRow;
use crate::{validation::Validator, ApiError, ApiResult, AppState};

const RULE_COLUMNS: &str =
    "id, entity_type_id, name, trigger, conditions, actions, is_active, created_at, updated_at";

/// Conditions and actions are stored as sent. The engine parses them leniently
/// when a matching event arrives.
#[derive(Debug, Serialize, Deserialize)]
pub struct AutomationRuleRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub trigger: Option<String>,
    #[serde(default = "empty_list")]
    pub conditions: serde_json::Value,
    #[serde(default = "empty_list")]
    pub actions: serde_json::Value,
    pub is_active: Option<bool>,
}

fn empty_list() -> serde_json::Value {
    serde_json::Value::Array(Vec::new())
}

impl AutomationRuleRequest {
    fn validate(&self) -> ApiResult<()> {
        Validator::new()
            .required_string(&self.trigger, "trigger")
            .max_length(&self.trigger, "trigger", 64)
            .max_length(&self.name, "name", 255)
            .error_if(!self.conditions.is_array(), "conditions", "conditions must be a list")
            .error_if(!self.actions.is_array(), "actions", "actions must be a list")
            .finish()
    }
}

/// Routes nested under `/entity-types/:id/automations`
pub fn entity_type_automation_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_rules).post(create_rule))
}

pub fn automation_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id", put(update_rule).delete(delete_rule))
}

async fn list_rules(
    State(state): State<Arc<AppState>>,
    Path(entity_type_id): Path<Uuid>,
) -> ApiResult<Json<Vec<AutomationRuleRow>>> {
    let rules = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        "SELECT {} FROM automation_rules WHERE entity_type_id = $1 ORDER BY created_at",
        RULE_COLUMNS
    ))
    .bind(entity_type_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(rules))
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Path(entity_type_id): Path<Uuid>,
    Json(payload): Json<AutomationRuleRequest>,
) -> ApiResult<(StatusCode, Json<AutomationRuleRow>)> {
    payload.validate()?;
    fetch_entity_type(&state.db_pool, entity_type_id).await?;

    let rule = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        r#"INSERT INTO automation_rules
               (id, entity_type_id, name, trigger, conditions, actions, is_active, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
           RETURNING {}"#,
        RULE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(entity_type_id)
    .bind(payload.name.as_deref().unwrap_or_default().trim())
    .bind(payload.trigger.as_deref().map(str::trim))
    .bind(&payload.conditions)
    .bind(&payload.actions)
    .bind(payload.is_active.unwrap_or(true))
    .bind(Utc::now())
    .fetch_one(&state.db_pool)
    .await?;

    tracing::info!(
        "Created automation rule '{}' on '{}' for entity type {}",
        rule.name, rule.trigger, entity_type_id
    );
    Ok((StatusCode::CREATED, Json(rule)))
}

async fn update_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AutomationRuleRequest>,
) -> ApiResult<Json<AutomationRuleRow>> {
    payload.validate()?;

    let rule = sqlx::query_as::<_, AutomationRuleRow>(&format!(
        r#"UPDATE automation_rules
           SET name = $2, trigger = $3, conditions = $4, actions = $5,
               is_active = $6, updated_at = $7
           WHERE id = $1
           RETURNING {}"#,
        RULE_COLUMNS
    ))
    .bind(id)
    .bind(payload.name.as_deref().unwrap_or_default().trim())
    .bind(payload.trigger.as_deref().map(str::trim))
    .bind(&payload.conditions)
    .bind(&payload.actions)
    .bind(payload.is_active.unwrap_or(true))
    .bind(Utc::now())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Automation rule"))?;

    Ok(Json(rule))
}

async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM automation_rules WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Automation rule"));
    }

    Ok(StatusCode::NO_CONTENT)
}
