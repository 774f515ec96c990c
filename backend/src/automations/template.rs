// Template Substitution - `{{field}}` placeholders resolved against record data

use regex::{Captures, Regex};
use std::sync::LazyLock;

use recordflow_shared::RecordData;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Za-z0-9_]+)\}\}").expect("placeholder pattern"));

/// Replaces every `{{identifier}}` with the text form of `data[identifier]`.
///
/// Missing keys and null values become the empty string. Placeholders whose
/// name is not a plain identifier (`{{a.b}}`, `{{ name }}`) do not match and
/// stay in the output verbatim.
pub fn apply(template: &str, data: &RecordData) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            data.get(&caps[1]).map(|v| v.as_text()).unwrap_or_default()
        })
        .into_owned()
}
