use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use recordflow_shared::{duplicate_names, EntityType, FieldDefinition, StatusDefinition};

use crate::{middleware::RequestUser, validation::Validator, ApiError, ApiResult, AppState};

const DEFAULT_ICON: &str = "box";

const ENTITY_TYPE_COLUMNS: &str =
    "id, name, slug, description, fields, icon, user_id, created_at, updated_at";

#[derive(Debug, Serialize, Deserialize)]
pub struct EntityTypeRequest {
    pub name: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    pub icon: Option<String>,
    /// Replaces every status of the type when present
    pub statuses: Option<Vec<StatusRequest>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRequest {
    /// Existing status id to keep. New statuses get a fresh id.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    pub color: Option<String>,
}

impl EntityTypeRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut validator = Validator::new()
            .required_string(&self.name, "name")
            .max_length(&self.name, "name", 255)
            .required_string(&self.slug, "slug")
            .slug(&self.slug, "slug")
            .fields(&self.fields, "fields");

        if let Some(statuses) = &self.statuses {
            for (i, status) in statuses.iter().enumerate() {
                validator = validator.error_if(
                    status.name.trim().is_empty(),
                    &format!("statuses[{}]", i),
                    "Status name is required",
                );
            }
        }

        validator.finish()
    }

    fn icon(&self) -> String {
        self.icon
            .as_deref()
            .map(str::trim)
            .filter(|icon| !icon.is_empty())
            .unwrap_or(DEFAULT_ICON)
            .to_string()
    }
}

pub fn entity_type_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_entity_types).post(create_entity_type))
        .route("/slug/:slug", get(get_entity_type_by_slug))
        .route(
            "/:id",
            get(get_entity_type).put(update_entity_type).delete(delete_entity_type),
        )
}

async fn list_entity_types(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<EntityType>>> {
    let mut entity_types = sqlx::query_as::<_, EntityType>(&format!(
        "SELECT {} FROM entity_types ORDER BY created_at DESC",
        ENTITY_TYPE_COLUMNS
    ))
    .fetch_all(&state.db_pool)
    .await?;

    let ids: Vec<Uuid> = entity_types.iter().map(|et| et.id).collect();
    let mut statuses = load_statuses(&state.db_pool, &ids).await?;
    for entity_type in &mut entity_types {
        entity_type.statuses = statuses.remove(&entity_type.id).unwrap_or_default();
    }

    Ok(Json(entity_types))
}

async fn get_entity_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EntityType>> {
    Ok(Json(fetch_entity_type(&state.db_pool, id).await?))
}

async fn get_entity_type_by_slug(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> ApiResult<Json<EntityType>> {
    let mut entity_type = sqlx::query_as::<_, EntityType>(&format!(
        "SELECT {} FROM entity_types WHERE slug = $1",
        ENTITY_TYPE_COLUMNS
    ))
    .bind(&slug)
    .fetch_optional(&state.db_pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Entity type"))?;

    entity_type.statuses = load_statuses(&state.db_pool, &[entity_type.id])
        .await?
        .remove(&entity_type.id)
        .unwrap_or_default();

    Ok(Json(entity_type))
}

async fn create_entity_type(
    State(state): State<Arc<AppState>>,
    RequestUser(user_id): RequestUser,
    Json(payload): Json<EntityTypeRequest>,
) -> ApiResult<(StatusCode, Json<EntityType>)> {
    payload.validate()?;
    warn_duplicate_fields(&payload.fields);

    let mut tx = state.db_pool.begin().await?;

    let mut entity_type = sqlx::query_as::<_, EntityType>(&format!(
        r#"INSERT INTO entity_types (id, name, slug, description, fields, icon, user_id, created_at, updated_at)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
           RETURNING {}"#,
        ENTITY_TYPE_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(payload.name.as_deref().map(str::trim))
    .bind(&payload.slug)
    .bind(&payload.description)
    .bind(sqlx::types::Json(&payload.fields))
    .bind(payload.icon())
    .bind(user_id)
    .bind(Utc::now())
    .fetch_one(&mut *tx)
    .await?;

    entity_type.statuses =
        replace_statuses(&mut tx, entity_type.id, payload.statuses.as_deref().unwrap_or_default()).await?;

    tx.commit().await?;

    tracing::info!("Created entity type '{}' ({})", entity_type.slug, entity_type.id);
    Ok((StatusCode::CREATED, Json(entity_type)))
}

async fn update_entity_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<EntityTypeRequest>,
) -> ApiResult<Json<EntityType>> {
    payload.validate()?;
    warn_duplicate_fields(&payload.fields);

    let mut tx = state.db_pool.begin().await?;

    let mut entity_type = sqlx::query_as::<_, EntityType>(&format!(
        r#"UPDATE entity_types
           SET name = $2, slug = $3, description = $4, fields = $5, icon = $6, updated_at = $7
           WHERE id = $1
           RETURNING {}"#,
        ENTITY_TYPE_COLUMNS
    ))
    .bind(id)
    .bind(payload.name.as_deref().map(str::trim))
    .bind(&payload.slug)
    .bind(&payload.description)
    .bind(sqlx::types::Json(&payload.fields))
    .bind(payload.icon())
    .bind(Utc::now())
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| ApiError::not_found("Entity type"))?;

    // Field edits never rewrite stored record data.
    entity_type.statuses = match &payload.statuses {
        Some(statuses) => replace_statuses(&mut tx, id, statuses).await?,
        None => {
            sqlx::query_as::<_, StatusDefinition>(
                "SELECT id, entity_type_id, name, color, position FROM status_definitions
                 WHERE entity_type_id = $1 ORDER BY position",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;

    Ok(Json(entity_type))
}

async fn delete_entity_type(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM entity_types WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Entity type"));
    }

    tracing::info!("Deleted entity type {}", id);
    Ok(StatusCode::NO_CONTENT)
}

/// Loads an entity type together with its statuses.
pub async fn fetch_entity_type(pool: &PgPool, id: Uuid) -> ApiResult<EntityType> {
    let mut entity_type = sqlx::query_as::<_, EntityType>(&format!(
        "SELECT {} FROM entity_types WHERE id = $1",
        ENTITY_TYPE_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Entity type"))?;

    entity_type.statuses = load_statuses(pool, &[id]).await?.remove(&id).unwrap_or_default();
    Ok(entity_type)
}

async fn load_statuses(pool: &PgPool, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, Vec<StatusDefinition>>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let statuses = sqlx::query_as::<_, StatusDefinition>(
        "SELECT id, entity_type_id, name, color, position FROM status_definitions
         WHERE entity_type_id = ANY($1) ORDER BY position",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<Uuid, Vec<StatusDefinition>> = HashMap::new();
    for status in statuses {
        grouped.entry(status.entity_type_id).or_default().push(status);
    }
    Ok(grouped)
}

/// Deletes every status of the entity type and inserts `statuses` in order,
/// keeping the ids the caller sent back.
async fn replace_statuses(
    tx: &mut Transaction<'_, Postgres>,
    entity_type_id: Uuid,
    statuses: &[StatusRequest],
) -> ApiResult<Vec<StatusDefinition>> {
    sqlx::query("DELETE FROM status_definitions WHERE entity_type_id = $1")
        .bind(entity_type_id)
        .execute(&mut **tx)
        .await?;

    let mut inserted = Vec::with_capacity(statuses.len());
    for (position, status) in statuses.iter().enumerate() {
        let row = sqlx::query_as::<_, StatusDefinition>(
            r#"INSERT INTO status_definitions (id, entity_type_id, name, color, position)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, entity_type_id, name, color, position"#,
        )
        .bind(status.id.unwrap_or_else(Uuid::new_v4))
        .bind(entity_type_id)
        .bind(status.name.trim())
        .bind(&status.color)
        .bind(position as i32)
        .fetch_one(&mut **tx)
        .await?;
        inserted.push(row);
    }

    Ok(inserted)
}

fn warn_duplicate_fields(fields: &[FieldDefinition]) {
    let duplicates = duplicate_names(fields);
    if !duplicates.is_empty() {
        tracing::warn!("Entity type has duplicate field names: {}", duplicates.join(", "));
    }
}
