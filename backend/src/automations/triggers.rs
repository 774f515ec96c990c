// Automation Triggers - Record events that start rule evaluation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use recordflow_shared::RecordData;

/// Trigger tag emitted after a record is created
pub const RECORD_CREATED: &str = "created";
/// Trigger tag emitted after a record is updated
pub const RECORD_UPDATED: &str = "updated";

/// A record event. The trigger is an open tag matched exactly against the
/// `trigger` column of stored rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub event_id: Uuid,
    pub entity_type_id: Uuid,
    pub entity_id: Uuid,
    pub trigger: String,
    pub entity_data: RecordData,
    pub timestamp: DateTime<Utc>,
}

impl TriggerEvent {
    pub fn new(
        entity_type_id: Uuid,
        entity_id: Uuid,
        trigger: impl Into<String>,
        entity_data: RecordData,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            entity_type_id,
            entity_id,
            trigger: trigger.into(),
            entity_data,
            timestamp: Utc::now(),
        }
    }

    pub fn record_created(entity_type_id: Uuid, entity_id: Uuid, entity_data: RecordData) -> Self {
        Self::new(entity_type_id, entity_id, RECORD_CREATED, entity_data)
    }

    pub fn record_updated(entity_type_id: Uuid, entity_id: Uuid, entity_data: RecordData) -> Self {
        Self::new(entity_type_id, entity_id, RECORD_UPDATED, entity_data)
    }
}
