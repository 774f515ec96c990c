//! Field schema model: the configurable attributes of an entity type.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::value::FieldValue;

static FIELD_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("field name pattern"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    Select,
    Date,
    Time,
    Datetime,
    Email,
    Phone,
    Url,
    Relation,
}

impl FieldType {
    pub const ALL: [FieldType; 11] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Boolean,
        FieldType::Select,
        FieldType::Date,
        FieldType::Time,
        FieldType::Datetime,
        FieldType::Email,
        FieldType::Phone,
        FieldType::Url,
        FieldType::Relation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Select => "select",
            Self::Date => "date",
            Self::Time => "time",
            Self::Datetime => "datetime",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Url => "url",
            Self::Relation => "relation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Select => "Select",
            Self::Date => "Date",
            Self::Time => "Time",
            Self::Datetime => "Date and time",
            Self::Email => "Email",
            Self::Phone => "Phone",
            Self::Url => "URL",
            Self::Relation => "Relation to another entity",
        }
    }

    /// Canonical value a freshly created field of this type starts with.
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::Number => FieldValue::Number(0.0),
            Self::Boolean => FieldValue::Bool(false),
            Self::Relation => FieldValue::Null,
            Self::Text
            | Self::Select
            | Self::Date
            | Self::Time
            | Self::Datetime
            | Self::Email
            | Self::Phone
            | Self::Url => FieldValue::text(""),
        }
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Unknown field type: {}", s))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDefinition {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default_value: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<FieldOption>>,
    /// Target entity type of a `relation` field.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "blank_as_none"
    )]
    pub entity_type_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldValidationError {
    #[error("Field name is required")]
    MissingName,
    #[error("Field label is required")]
    MissingLabel,
    #[error("Field name can only contain letters, numbers, and underscores")]
    InvalidName,
    #[error("Select field must have at least one option")]
    MissingOptions,
    #[error("Relation field must reference an entity type")]
    MissingRelationTarget,
}

impl FieldDefinition {
    pub fn validate(&self) -> Result<(), FieldValidationError> {
        validate_field(self)
    }
}

/// Checks a field definition, reporting the first failed constraint.
///
/// Only the definition is checked. Values already stored under the field are
/// never inspected.
pub fn validate_field(field: &FieldDefinition) -> Result<(), FieldValidationError> {
    if field.name.is_empty() {
        return Err(FieldValidationError::MissingName);
    }
    if field.label.is_empty() {
        return Err(FieldValidationError::MissingLabel);
    }
    if !FIELD_NAME_PATTERN.is_match(&field.name) {
        return Err(FieldValidationError::InvalidName);
    }

    match field.field_type {
        FieldType::Select if field.options.as_ref().is_none_or(|o| o.is_empty()) => {
            Err(FieldValidationError::MissingOptions)
        }
        FieldType::Relation if field.entity_type_id.is_none() => {
            Err(FieldValidationError::MissingRelationTarget)
        }
        _ => Ok(()),
    }
}

/// Builds a blank field of the named type. Unknown type names fall back to
/// `text`.
pub fn create_empty_field(type_name: &str) -> FieldDefinition {
    let field_type = type_name.parse().unwrap_or(FieldType::Text);

    FieldDefinition {
        id: Uuid::new_v4(),
        name: String::new(),
        field_type,
        label: String::new(),
        placeholder: None,
        required: false,
        default_value: field_type.default_value(),
        options: (field_type == FieldType::Select).then(Vec::new),
        entity_type_id: None,
    }
}

/// Field type catalogue for schema editors, in display order.
pub fn field_types() -> Vec<(FieldType, &'static str)> {
    FieldType::ALL.into_iter().map(|t| (t, t.label())).collect()
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => Uuid::parse_str(s).map(Some).map_err(serde::de::Error::custom),
    }
}
