// Automation Actions - Effects a rule applies once its conditions pass

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use recordflow_shared::{FieldValue, RecordData};

use super::template;
use super::webhook::{WebhookBody, WebhookRequest};

/// An action attached to a rule, dispatched on its `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Moves the record into a status by writing `status_id`
    StatusUpdate {
        #[serde(default)]
        status: FieldValue,
    },
    /// Writes a literal into one record field
    FieldUpdate {
        #[serde(default)]
        field: String,
        /// `None` when the key is absent; an explicit `null` is a value.
        #[serde(
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        value: Option<FieldValue>,
    },
    /// Calls an external URL with templated parameters
    Webhook(WebhookAction),
    /// Anything this build cannot interpret. Executing it is a no-op.
    #[serde(skip)]
    Unsupported(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookAction {
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// A string template, or any JSON value (rendered to text, then templated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

/// Outcome of executing an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Completed,
    Skipped,
    Failed,
}

/// Result of executing an action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_type: String,
    pub status: ActionStatus,
    pub output: Option<String>,
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl Action {
    /// Parses one stored action. Unknown `type` tags and malformed payloads
    /// become `Unsupported` rather than failing the whole rule.
    pub fn from_value(value: serde_json::Value) -> Self {
        match serde_json::from_value(value.clone()) {
            Ok(action) => action,
            Err(e) => {
                let action = Action::Unsupported(value);
                if action.is_malformed() {
                    warn!("Dropping malformed '{}' action: {}", action.action_type(), e);
                }
                action
            }
        }
    }

    /// An `Unsupported` action whose tag names a known type, for example a
    /// `field_update` carrying an array value.
    pub fn is_malformed(&self) -> bool {
        match self {
            Action::Unsupported(raw) => matches!(
                raw.get("type").and_then(|t| t.as_str()),
                Some("status_update" | "field_update" | "webhook")
            ),
            _ => false,
        }
    }

    pub fn status_update(status: impl Into<FieldValue>) -> Self {
        Action::StatusUpdate {
            status: status.into(),
        }
    }

    pub fn field_update(field: &str, value: impl Into<FieldValue>) -> Self {
        Action::FieldUpdate {
            field: field.to_string(),
            value: Some(value.into()),
        }
    }

    pub fn webhook(url: &str, method: Option<&str>, body: Option<&str>) -> Self {
        Action::Webhook(WebhookAction {
            url: url.to_string(),
            method: method.map(str::to_string),
            body: body.map(|b| serde_json::Value::String(b.to_string())),
            headers: BTreeMap::new(),
        })
    }

    /// Tag used in logs and results
    pub fn action_type(&self) -> String {
        match self {
            Action::StatusUpdate { .. } => "status_update".to_string(),
            Action::FieldUpdate { .. } => "field_update".to_string(),
            Action::Webhook(_) => "webhook".to_string(),
            Action::Unsupported(raw) => raw
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("unknown")
                .to_string(),
        }
    }
}

impl WebhookAction {
    pub fn method(&self) -> String {
        self.method
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or("POST")
            .trim()
            .to_uppercase()
    }

    /// Resolves URL, headers and body against the current record data.
    ///
    /// A body that parses as JSON after substitution is sent as JSON; any
    /// other text is sent raw.
    pub fn resolve(&self, data: &RecordData) -> WebhookRequest {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), template::apply(value, data)))
            .collect();

        let body = self
            .body_template()
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                let rendered = template::apply(&raw, data);
                match serde_json::from_str::<serde_json::Value>(&rendered) {
                    Ok(json) => WebhookBody::Json(json),
                    Err(_) => WebhookBody::Raw(rendered),
                }
            });

        WebhookRequest {
            url: template::apply(&self.url, data),
            method: self.method(),
            headers,
            body,
        }
    }

    fn body_template(&self) -> Option<String> {
        match self.body.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl ActionResult {
    pub fn success(action_type: String, output: Option<String>) -> Self {
        Self {
            action_type,
            status: ActionStatus::Completed,
            output,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn skipped(action_type: String) -> Self {
        Self {
            action_type,
            status: ActionStatus::Skipped,
            output: None,
            error: None,
            duration_ms: 0,
        }
    }

    pub fn failure(action_type: String, error: &str) -> Self {
        Self {
            action_type,
            status: ActionStatus::Failed,
            output: None,
            error: Some(error.to_string()),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: i64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == ActionStatus::Completed
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<FieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    FieldValue::deserialize(deserializer).map(Some)
}
