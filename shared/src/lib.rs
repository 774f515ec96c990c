use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod fields;
pub mod value;

pub use fields::{
    create_empty_field, field_types, validate_field, FieldDefinition, FieldOption, FieldType,
    FieldValidationError,
};
pub use value::{FieldValue, RecordData};

/// A user-defined schema.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityType {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub fields: Vec<FieldDefinition>,
    pub icon: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    #[serde(default)]
    pub statuses: Vec<StatusDefinition>,
}

impl EntityType {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names used by more than one field. Uniqueness is not enforced.
    pub fn duplicate_field_names(&self) -> Vec<String> {
        duplicate_names(&self.fields)
    }

    /// Applies each field's type to the matching entries of `data`. Keys with
    /// no field definition pass through unchanged.
    pub fn type_record_data(&self, data: RecordData) -> RecordData {
        data.into_iter()
            .map(|(key, value)| {
                let value = match self.field(&key) {
                    Some(field) => value.typed_for(field.field_type),
                    None => value,
                };
                (key, value)
            })
            .collect()
    }
}

pub fn duplicate_names(fields: &[FieldDefinition]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut duplicates = Vec::new();
    for field in fields {
        if !seen.insert(field.name.as_str()) && !duplicates.contains(&field.name) {
            duplicates.push(field.name.clone());
        }
    }
    duplicates
}

/// A named status an entity type's records can be moved into.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub id: Uuid,
    pub entity_type_id: Uuid,
    pub name: String,
    pub color: Option<String>,
    pub position: i32,
}

/// One data instance of an entity type.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: Uuid,
    pub entity_type_id: Uuid,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub data: RecordData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
}
