// Automation Storage - Rule lookup and record persistence for the engine

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::warn;
use uuid::Uuid;

use recordflow_shared::RecordData;

use super::{Action, AutomationRule, Condition};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules for the entity type whose trigger matches exactly, in
    /// creation order.
    async fn query_rules(&self, entity_type_id: Uuid, trigger: &str) -> StoreResult<Vec<AutomationRule>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Writes the full data payload and timestamp of one record.
    async fn update_record(
        &self,
        entity_id: Uuid,
        data: &RecordData,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}

/// Raw `automation_rules` row. Conditions and actions stay untyped until the
/// rule is assembled so a single bad entry does not hide the whole rule set.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AutomationRuleRow {
    pub id: Uuid,
    pub entity_type_id: Uuid,
    pub name: String,
    pub trigger: String,
    pub conditions: serde_json::Value,
    pub actions: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AutomationRuleRow {
    /// Returns `None` when the stored condition list cannot be read. Individual
    /// actions that fail to parse are kept as `Action::Unsupported`.
    pub fn into_rule(self) -> Option<AutomationRule> {
        let conditions: Vec<Condition> = match self.conditions {
            serde_json::Value::Null => Vec::new(),
            raw => match serde_json::from_value(raw) {
                Ok(conditions) => conditions,
                Err(e) => {
                    warn!("Automation rule {} has unreadable conditions: {}", self.id, e);
                    return None;
                }
            },
        };

        let actions = match self.actions {
            serde_json::Value::Null => Vec::new(),
            serde_json::Value::Array(items) => items.into_iter().map(Action::from_value).collect(),
            other => {
                warn!("Automation rule {} has non-list actions: {}", self.id, other);
                return None;
            }
        };

        Some(AutomationRule {
            id: self.id,
            entity_type_id: self.entity_type_id,
            name: self.name,
            trigger: self.trigger,
            conditions,
            actions,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Postgres implementation of both collaborator traits.
#[derive(Clone)]
pub struct PgAutomationStore {
    db_pool: PgPool,
}

impl PgAutomationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl RuleStore for PgAutomationStore {
    async fn query_rules(&self, entity_type_id: Uuid, trigger: &str) -> StoreResult<Vec<AutomationRule>> {
        let rows = sqlx::query_as::<_, AutomationRuleRow>(
            r#"
            SELECT id, entity_type_id, name, trigger, conditions, actions,
                   is_active, created_at, updated_at
            FROM automation_rules
            WHERE entity_type_id = $1 AND trigger = $2 AND is_active = true
            ORDER BY created_at ASC
            "#,
        )
        .bind(entity_type_id)
        .bind(trigger)
        .fetch_all(&self.db_pool)
        .await?;

        Ok(rows.into_iter().filter_map(AutomationRuleRow::into_rule).collect())
    }
}

#[async_trait]
impl RecordStore for PgAutomationStore {
    async fn update_record(
        &self,
        entity_id: Uuid,
        data: &RecordData,
        updated_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let result = sqlx::query("UPDATE entity_records SET data = $1, updated_at = $2 WHERE id = $3")
            .bind(sqlx::types::Json(data))
            .bind(updated_at)
            .bind(entity_id)
            .execute(&self.db_pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::RecordNotFound(entity_id));
        }

        Ok(())
    }
}
