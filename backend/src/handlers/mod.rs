use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use recordflow_shared::{field_types, FieldType};

use crate::{database, AppState};

pub mod automation_rules;
pub mod entity_records;
pub mod entity_types;

pub use automation_rules::{automation_routes, entity_type_automation_routes};
pub use entity_records::{entity_type_record_routes, record_routes};
pub use entity_types::entity_type_routes;

/// Everything served under `/api/v1`
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/field-types", get(list_field_types))
        .nest("/entity-types", entity_type_routes())
        .nest("/entity-types/:id/records", entity_type_record_routes())
        .nest("/entity-types/:id/automations", entity_type_automation_routes())
        .nest("/records", record_routes())
        .nest("/automations", automation_routes())
}

#[derive(Debug, Serialize)]
pub struct FieldTypeInfo {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: &'static str,
}

async fn list_field_types() -> Json<Vec<FieldTypeInfo>> {
    Json(
        field_types()
            .into_iter()
            .map(|(field_type, label)| FieldTypeInfo { field_type, label })
            .collect(),
    )
}

#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    pub database: database::PoolStats,
    pub automations_enabled: bool,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthCheckResponse>) {
    let healthy = database::health_check(&state.db_pool).await;
    if !healthy {
        tracing::warn!("Health check failed: database unreachable");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION"),
        database: database::get_pool_stats(&state.db_pool),
        automations_enabled: state.automations.is_enabled(),
    };

    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
