// Automation Executor - Applies a rule's actions to the working record

use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recordflow_shared::{FieldValue, RecordData};

use super::{
    Action, ActionResult, AutomationError, RecordStore, WebhookAction, WebhookClient,
};

/// Field written by `status_update` actions
pub const STATUS_FIELD: &str = "status_id";

/// The record an invocation mutates. Each invocation owns its own copy, and
/// every rule in that invocation sees the latest state.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkingRecord {
    pub entity_id: Uuid,
    pub data: RecordData,
}

impl WorkingRecord {
    pub fn new(entity_id: Uuid, data: RecordData) -> Self {
        Self { entity_id, data }
    }
}

pub struct ActionExecutor {
    records: Arc<dyn RecordStore>,
    webhooks: Arc<dyn WebhookClient>,
}

impl ActionExecutor {
    pub fn new(records: Arc<dyn RecordStore>, webhooks: Arc<dyn WebhookClient>) -> Self {
        Self { records, webhooks }
    }

    /// Executes one action. Failures are contained in the returned result and
    /// never stop the caller from running the next action.
    pub async fn execute_action(&self, action: &Action, record: &mut WorkingRecord) -> ActionResult {
        let start = Instant::now();
        let action_type = action.action_type();

        let result = match action {
            Action::StatusUpdate { status } if status.is_truthy() => {
                Some(self.execute_status_update(status, record).await)
            }
            Action::FieldUpdate {
                field,
                value: Some(value),
            } if !field.is_empty() => Some(self.execute_field_update(field, value, record).await),
            Action::Webhook(webhook) if !webhook.url.is_empty() => {
                Some(self.execute_webhook(webhook, record).await)
            }
            Action::Unsupported(_) if action.is_malformed() => {
                warn!("Skipping malformed '{}' action", action_type);
                None
            }
            Action::Unsupported(_) => {
                debug!("Skipping unsupported action type '{}'", action_type);
                None
            }
            _ => {
                debug!("Skipping '{}' action with missing parameters", action_type);
                None
            }
        };

        let duration = start.elapsed().as_millis() as i64;

        match result {
            None => ActionResult::skipped(action_type).with_duration(duration),
            Some(Ok(output)) => ActionResult::success(action_type, output).with_duration(duration),
            Some(Err(e)) => {
                error!(
                    "Action '{}' failed for record {}: {}",
                    action_type, record.entity_id, e
                );
                ActionResult::failure(action_type, &e.to_string()).with_duration(duration)
            }
        }
    }

    async fn execute_status_update(
        &self,
        status: &FieldValue,
        record: &mut WorkingRecord,
    ) -> Result<Option<String>, AutomationError> {
        record.data.insert(STATUS_FIELD.to_string(), status.clone());
        self.persist(record).await?;

        info!("Record {} moved to status {}", record.entity_id, status);
        Ok(None)
    }

    async fn execute_field_update(
        &self,
        field: &str,
        value: &FieldValue,
        record: &mut WorkingRecord,
    ) -> Result<Option<String>, AutomationError> {
        record.data.insert(field.to_string(), value.clone());
        self.persist(record).await?;

        info!("Record {} field '{}' updated", record.entity_id, field);
        Ok(None)
    }

    async fn execute_webhook(
        &self,
        webhook: &WebhookAction,
        record: &WorkingRecord,
    ) -> Result<Option<String>, AutomationError> {
        let request = webhook.resolve(&record.data);
        info!("Sending webhook {} {}", request.method, request.url);

        let response = self.webhooks.send(request).await?;
        Ok(Some(response))
    }

    /// Mutations are written immediately, one update per mutating action.
    async fn persist(&self, record: &WorkingRecord) -> Result<(), AutomationError> {
        self.records
            .update_record(record.entity_id, &record.data, Utc::now())
            .await
            .map_err(AutomationError::Persist)
    }
}
