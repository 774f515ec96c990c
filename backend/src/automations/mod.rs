// Record Automation Engine
//
// Rules attached to an entity type react to record events: every condition is
// checked against the record, then the actions run in order.

pub mod actions;
pub mod conditions;
pub mod engine;
pub mod executor;
pub mod store;
pub mod template;
pub mod triggers;
pub mod webhook;

pub use actions::{Action, ActionResult, ActionStatus, WebhookAction};
pub use conditions::{Condition, ConditionOperator};
pub use engine::{AutomationEngine, AutomationError, AutomationReport, AutomationRule};
pub use executor::{ActionExecutor, WorkingRecord};
pub use store::{AutomationRuleRow, PgAutomationStore, RecordStore, RuleStore, StoreError};
pub use triggers::TriggerEvent;
pub use webhook::{HttpWebhookClient, WebhookBody, WebhookClient, WebhookError, WebhookRequest};

#[cfg(test)]
pub use store::{MockRecordStore, MockRuleStore};
#[cfg(test)]
pub use webhook::MockWebhookClient;
