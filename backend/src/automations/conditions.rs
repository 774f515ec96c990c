// Automation Conditions - Comparisons between a record field and a literal

use serde::{Deserialize, Serialize};

use recordflow_shared::{FieldValue, RecordData};

/// Condition operators. Stored rules may name operators this build does not
/// know; those are kept as `Unrecognized` and always fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    NotContains,
    After,
    Before,
    Unrecognized(String),
}

impl ConditionOperator {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "equals",
            Self::GreaterThan => "greater_than",
            Self::LessThan => "less_than",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
            Self::After => "after",
            Self::Before => "before",
            Self::Unrecognized(op) => op,
        }
    }
}

impl Default for ConditionOperator {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl From<String> for ConditionOperator {
    fn from(op: String) -> Self {
        match op.as_str() {
            "equals" => Self::Equals,
            "greater_than" => Self::GreaterThan,
            "less_than" => Self::LessThan,
            "contains" => Self::Contains,
            "not_contains" => Self::NotContains,
            "after" => Self::After,
            "before" => Self::Before,
            _ => Self::Unrecognized(op),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        match op {
            ConditionOperator::Unrecognized(op) => op,
            known => known.as_str().to_string(),
        }
    }
}

/// A single condition to evaluate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Record field providing the left-hand operand
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub operator: ConditionOperator,
    /// Literal to compare against
    #[serde(default)]
    pub value: FieldValue,
}

impl Condition {
    pub fn new(field: &str, operator: ConditionOperator, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value: value.into(),
        }
    }

    pub fn equals(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    pub fn greater_than(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::GreaterThan, value)
    }

    pub fn less_than(field: &str, value: impl Into<FieldValue>) -> Self {
        Self::new(field, ConditionOperator::LessThan, value)
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Contains, value)
    }

    pub fn not_contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::NotContains, value)
    }

    pub fn after(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::After, value)
    }

    pub fn before(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Before, value)
    }
}

/// Text form of an operand for string comparisons. Unlike templates, a
/// missing field reads as `"undefined"` and a null as `"null"`, so neither
/// matches the empty string.
fn comparison_text(operand: Option<&FieldValue>) -> String {
    match operand {
        None => "undefined".to_string(),
        Some(FieldValue::Null) => "null".to_string(),
        Some(value) => value.as_text(),
    }
}

/// Evaluates one condition against record data. Never fails: values that do
/// not coerce make the comparison false. A missing field reads as
/// `"undefined"`, `NaN` and "no date" respectively.
pub fn evaluate(condition: &Condition, data: &RecordData) -> bool {
    let operand = data.get(&condition.field);
    let text = || comparison_text(operand);
    let number = || operand.map_or(f64::NAN, FieldValue::as_number);
    let date = || operand.and_then(FieldValue::as_datetime);
    let expected = &condition.value;
    let expected_text = || comparison_text(Some(expected));

    match &condition.operator {
        ConditionOperator::Equals => text() == expected_text(),
        ConditionOperator::GreaterThan => number() > expected.as_number(),
        ConditionOperator::LessThan => number() < expected.as_number(),
        ConditionOperator::Contains => text().contains(&expected_text()),
        ConditionOperator::NotContains => !text().contains(&expected_text()),
        ConditionOperator::After => match (date(), expected.as_datetime()) {
            (Some(actual), Some(bound)) => actual > bound,
            _ => false,
        },
        ConditionOperator::Before => match (date(), expected.as_datetime()) {
            (Some(actual), Some(bound)) => actual < bound,
            _ => false,
        },
        ConditionOperator::Unrecognized(_) => false,
    }
}

/// Runs `check` over the chain in order and stops at the first false result.
/// An empty chain passes.
pub fn evaluate_chain<F>(conditions: &[Condition], mut check: F) -> bool
where
    F: FnMut(&Condition) -> bool,
{
    conditions.iter().all(|condition| check(condition))
}

/// True when every condition holds for `data`.
pub fn evaluate_all(conditions: &[Condition], data: &RecordData) -> bool {
    evaluate_chain(conditions, |condition| evaluate(condition, data))
}
