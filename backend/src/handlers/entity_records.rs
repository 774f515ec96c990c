use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use recordflow_shared::{EntityRecord, RecordData};

use super::entity_types::fetch_entity_type;
use crate::automations::TriggerEvent;
use crate::{middleware::RequestUser, ApiError, ApiResult, AppState};

const RECORD_COLUMNS: &str = "id, entity_type_id, data, created_at, updated_at, created_by";

#[derive(Debug, Serialize, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub data: RecordData,
}

/// Routes nested under `/entity-types/:id/records`
pub fn entity_type_record_routes() -> Router<Arc<AppState>> {
    Router::new().route("/", get(list_records).post(create_record))
}

pub fn record_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id", get(get_record).put(update_record).delete(delete_record))
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Path(entity_type_id): Path<Uuid>,
) -> ApiResult<Json<Vec<EntityRecord>>> {
    let records = sqlx::query_as::<_, EntityRecord>(&format!(
        "SELECT {} FROM entity_records WHERE entity_type_id = $1 ORDER BY created_at DESC",
        RECORD_COLUMNS
    ))
    .bind(entity_type_id)
    .fetch_all(&state.db_pool)
    .await?;

    Ok(Json(records))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EntityRecord>> {
    let record = sqlx::query_as::<_, EntityRecord>(&format!(
        "SELECT {} FROM entity_records WHERE id = $1",
        RECORD_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Record"))?;

    Ok(Json(record))
}

async fn create_record(
    State(state): State<Arc<AppState>>,
    RequestUser(user_id): RequestUser,
    Path(entity_type_id): Path<Uuid>,
    Json(payload): Json<RecordRequest>,
) -> ApiResult<(StatusCode, Json<EntityRecord>)> {
    let entity_type = fetch_entity_type(&state.db_pool, entity_type_id).await?;
    let data = entity_type.type_record_data(payload.data);
    let now = Utc::now();

    let record = sqlx::query_as::<_, EntityRecord>(&format!(
        r#"INSERT INTO entity_records (id, entity_type_id, data, created_at, updated_at, created_by)
           VALUES ($1, $2, $3, $4, $4, $5)
           RETURNING {}"#,
        RECORD_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(entity_type_id)
    .bind(sqlx::types::Json(&data))
    .bind(now)
    .bind(user_id)
    .fetch_one(&state.db_pool)
    .await?;

    dispatch(
        &state,
        TriggerEvent::record_created(record.entity_type_id, record.id, record.data.clone()),
    );

    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordRequest>,
) -> ApiResult<Json<EntityRecord>> {
    let entity_type_id = sqlx::query_scalar::<_, Uuid>("SELECT entity_type_id FROM entity_records WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db_pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Record"))?;

    let entity_type = fetch_entity_type(&state.db_pool, entity_type_id).await?;
    let data = entity_type.type_record_data(payload.data);

    let record = sqlx::query_as::<_, EntityRecord>(&format!(
        "UPDATE entity_records SET data = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
        RECORD_COLUMNS
    ))
    .bind(id)
    .bind(sqlx::types::Json(&data))
    .bind(Utc::now())
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Record"))?;

    dispatch(
        &state,
        TriggerEvent::record_updated(record.entity_type_id, record.id, record.data.clone()),
    );

    Ok(Json(record))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM entity_records WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Record"));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Runs automations in the background; the response never waits for them.
fn dispatch(state: &Arc<AppState>, event: TriggerEvent) {
    let engine = state.automations.clone();
    tokio::spawn(async move {
        engine.run_automations(event).await;
    });
}
