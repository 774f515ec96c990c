// Automation Engine - Matches record events to rules and runs their actions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recordflow_shared::RecordData;

use super::{
    conditions, Action, ActionExecutor, ActionResult, Condition, RecordStore, RuleStore,
    StoreError, TriggerEvent, WebhookClient, WebhookError, WorkingRecord,
};

#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    #[error("Failed to load automation rules: {0}")]
    RuleFetch(#[source] StoreError),
    #[error("Failed to persist record: {0}")]
    Persist(#[source] StoreError),
    #[error("Webhook failed: {0}")]
    Webhook(#[from] WebhookError),
}

/// A trigger, an ordered condition chain and an ordered action list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: Uuid,
    pub entity_type_id: Uuid,
    pub name: String,
    pub trigger: String,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary of one invocation
#[derive(Debug, Clone, Serialize)]
pub struct AutomationReport {
    pub event_id: Uuid,
    pub rules_matched: usize,
    pub rules_executed: usize,
    pub actions: Vec<ActionResult>,
    /// Record data after every executed action
    pub data: RecordData,
}

impl AutomationReport {
    pub fn failed_actions(&self) -> usize {
        self.actions.iter().filter(|a| a.error.is_some()).count()
    }
}

pub struct AutomationEngine {
    rules: Arc<dyn RuleStore>,
    executor: ActionExecutor,
    enabled: bool,
}

impl AutomationEngine {
    pub fn new(
        rules: Arc<dyn RuleStore>,
        records: Arc<dyn RecordStore>,
        webhooks: Arc<dyn WebhookClient>,
    ) -> Self {
        Self {
            rules,
            executor: ActionExecutor::new(records, webhooks),
            enabled: true,
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Entry point for record handlers. Never fails from the caller's point
    /// of view; every problem is logged.
    pub async fn run_automations(&self, event: TriggerEvent) {
        if !self.enabled {
            debug!("Automations disabled, ignoring '{}' event", event.trigger);
            return;
        }

        let entity_id = event.entity_id;
        match self.process_event(event).await {
            Ok(report) => {
                if report.rules_matched > 0 {
                    info!(
                        "Automations for record {}: {} rule(s) executed, {} action(s), {} failed",
                        entity_id,
                        report.rules_executed,
                        report.actions.len(),
                        report.failed_actions()
                    );
                }
            }
            Err(e) => error!("Automations aborted for record {}: {}", entity_id, e),
        }
    }

    /// Fetches the rules for the event, then evaluates and executes them in
    /// order against one working record. Only a rule fetch failure aborts.
    pub async fn process_event(&self, event: TriggerEvent) -> Result<AutomationReport, AutomationError> {
        info!(
            "Processing '{}' event for record {} (entity type {})",
            event.trigger, event.entity_id, event.entity_type_id
        );

        let rules = self
            .rules
            .query_rules(event.entity_type_id, &event.trigger)
            .await
            .map_err(AutomationError::RuleFetch)?;

        let mut record = WorkingRecord::new(event.entity_id, event.entity_data);
        let mut report = AutomationReport {
            event_id: event.event_id,
            rules_matched: rules.len(),
            rules_executed: 0,
            actions: Vec::new(),
            data: RecordData::new(),
        };

        for rule in &rules {
            if !rule.is_active {
                continue;
            }

            if !conditions::evaluate_all(&rule.conditions, &record.data) {
                debug!("Rule '{}' conditions not met", rule.name);
                continue;
            }

            info!("Executing rule '{}' ({} action(s))", rule.name, rule.actions.len());
            for action in &rule.actions {
                let result = self.executor.execute_action(action, &mut record).await;
                if result.error.is_some() {
                    warn!("Rule '{}' continues after failed '{}' action", rule.name, result.action_type);
                }
                report.actions.push(result);
            }
            report.rules_executed += 1;
        }

        report.data = record.data;
        Ok(report)
    }
}
