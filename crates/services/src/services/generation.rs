//! Error type and small helpers shared by the generation services.

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use utils::text::non_blank;

use super::{llm_client::LlmError, youtube::YoutubeError};

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Bad or missing input; reported back to the caller as-is.
    #[error("{0}")]
    Validation(String),
    #[error("model returned invalid JSON")]
    InvalidJson(#[source] LlmError),
    #[error("language model error: {0}")]
    Llm(#[source] LlmError),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::InvalidJson(_) => Self::InvalidJson(err),
            other => Self::Llm(other),
        }
    }
}

impl From<YoutubeError> for GenerationError {
    fn from(err: YoutubeError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl GenerationError {
    pub fn is_invalid_json(&self) -> bool {
        matches!(self, Self::InvalidJson(_))
    }
}

/// Trimmed value of a required text field.
pub fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, GenerationError> {
    non_blank(value).ok_or_else(|| GenerationError::Validation(format!("Missing {field}")))
}

/// Accept either a string or a list of strings; lists are joined one item per line.
pub fn text_or_lines<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrLines {
        Text(String),
        Lines(Vec<String>),
        Other(serde_json::Value),
    }

    Ok(match TextOrLines::deserialize(deserializer)? {
        TextOrLines::Text(text) => text,
        TextOrLines::Lines(lines) => lines.join("\n"),
        TextOrLines::Other(serde_json::Value::Null) => String::new(),
        TextOrLines::Other(value) => value.to_string(),
    })
}

/// Accept a list of strings, a single string, or null. Non-string items are dropped.
pub fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                serde_json::Value::Object(map) => map
                    .get("text")
                    .or_else(|| map.get("label"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .collect(),
        serde_json::Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    })
}

/// Accept a string, number or bool as text; null and anything else become empty.
pub fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    })
}

/// A number, or a numeric string such as `"2"` or `"1.5%"`.
pub fn number_from(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim_end().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite())
}

/// Optional number that tolerates numeric strings; anything else is `None`.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from(&Value::deserialize(deserializer)?))
}

/// Accept an array and keep the items that parse as `T`; anything else is empty.
pub fn lenient_items<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                debug!(error = %e, "Dropping malformed item");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Deserialize)]
    struct Shape {
        #[serde(default, deserialize_with = "text_or_lines")]
        rules: String,
        #[serde(default, deserialize_with = "lenient_list")]
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        label: String,
    }

    #[derive(Deserialize)]
    struct Loose {
        #[serde(default, deserialize_with = "lenient_text")]
        name: String,
        #[serde(default, deserialize_with = "lenient_number")]
        score: Option<f64>,
        #[serde(default, deserialize_with = "lenient_items")]
        items: Vec<Item>,
    }

    #[test]
    fn required_rejects_blank() {
        assert_eq!(required(Some(" EURUSD "), "pair").unwrap(), "EURUSD");
        let err = required(Some("  "), "pair").unwrap_err();
        assert_eq!(err.to_string(), "Missing pair");
        assert!(required(None, "pair").is_err());
    }

    #[test]
    fn rules_accept_text_or_list() {
        let shape: Shape = serde_json::from_value(json!({ "rules": ["a", "b"] })).unwrap();
        assert_eq!(shape.rules, "a\nb");
        let shape: Shape = serde_json::from_value(json!({ "rules": "plain" })).unwrap();
        assert_eq!(shape.rules, "plain");
        let shape: Shape = serde_json::from_value(json!({ "rules": null })).unwrap();
        assert_eq!(shape.rules, "");
    }

    #[test]
    fn lists_default_and_coerce() {
        let shape: Shape = serde_json::from_value(json!({})).unwrap();
        assert!(shape.tags.is_empty());
        let shape: Shape = serde_json::from_value(json!({ "tags": "ict" })).unwrap();
        assert_eq!(shape.tags, vec!["ict"]);
        let shape: Shape =
            serde_json::from_value(json!({ "tags": ["fvg", 3, "", { "label": "killzone" }] }))
                .unwrap();
        assert_eq!(shape.tags, vec!["fvg", "killzone"]);
    }

    #[test]
    fn invalid_json_is_distinguished() {
        let err: GenerationError = LlmError::InvalidJson("x".into()).into();
        assert!(err.is_invalid_json());
        let err: GenerationError = LlmError::Timeout.into();
        assert!(!err.is_invalid_json());
    }

    #[test]
    fn loose_fields_default_instead_of_failing() {
        let loose: Loose = serde_json::from_value(json!({
            "name": null,
            "score": "1.5%",
            "items": [{ "label": "kept" }, null, { "label": 3 }, { "label": "also kept" }]
        }))
        .unwrap();
        assert_eq!(loose.name, "");
        assert_eq!(loose.score, Some(1.5));
        assert_eq!(
            loose.items,
            vec![
                Item { label: "kept".into() },
                Item { label: "also kept".into() }
            ]
        );

        let loose: Loose =
            serde_json::from_value(json!({ "name": 42, "score": "high", "items": null })).unwrap();
        assert_eq!(loose.name, "42");
        assert_eq!(loose.score, None);
        assert!(loose.items.is_empty());
    }
}
