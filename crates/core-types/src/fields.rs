use crate::error::CoreError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;

/// The shape of an admin-defined order field.
///
/// Serialized as `{"type": "DROPDOWN", "options": [...]}`, mirroring the platform's
/// `custom_fields.type` / `custom_fields.options` columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "UPPERCASE")]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Dropdown(Vec<String>),
}

impl FieldKind {
    /// The value stored in the `type` column.
    pub fn tag(&self) -> &'static str {
        match self {
            FieldKind::Text => "TEXT",
            FieldKind::Number => "NUMBER",
            FieldKind::Boolean => "BOOLEAN",
            FieldKind::Dropdown(_) => "DROPDOWN",
        }
    }

    /// Decodes the stored `(type, options)` pair.
    ///
    /// Dropdown options are accepted either as a JSON array or as a string holding a
    /// JSON array, since older rows were written with the array pre-encoded.
    pub fn decode(tag: &str, options: Option<&JsonValue>) -> Result<Self, CoreError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(FieldKind::Text),
            "NUMBER" => Ok(FieldKind::Number),
            "BOOLEAN" => Ok(FieldKind::Boolean),
            "DROPDOWN" => {
                let options = match options {
                    Some(JsonValue::Array(items)) => strings_of(items)?,
                    Some(JsonValue::String(encoded)) => {
                        let parsed: Vec<JsonValue> = serde_json::from_str(encoded).map_err(|e| {
                            CoreError::InvalidInput("dropdown options".into(), e.to_string())
                        })?;
                        strings_of(&parsed)?
                    }
                    Some(JsonValue::Null) | None => Vec::new(),
                    Some(other) => {
                        return Err(CoreError::InvalidInput(
                            "dropdown options".into(),
                            other.to_string(),
                        ));
                    }
                };
                Ok(FieldKind::Dropdown(options))
            }
            other => Err(CoreError::UnknownFieldKind(other.to_string())),
        }
    }

    /// The JSON stored in the `options` column (`null` for everything but dropdowns).
    pub fn options_json(&self) -> JsonValue {
        match self {
            FieldKind::Dropdown(options) => JsonValue::from(options.clone()),
            _ => JsonValue::Null,
        }
    }

    /// Builds a dropdown from the admin form's comma-separated list.
    pub fn dropdown_from_list(list: &str) -> Result<Self, CoreError> {
        let options: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        if options.is_empty() {
            return Err(CoreError::InvalidInput(
                "dropdown options".into(),
                "at least one option is required".into(),
            ));
        }
        Ok(FieldKind::Dropdown(options))
    }
}

fn strings_of(items: &[JsonValue]) -> Result<Vec<String>, CoreError> {
    items
        .iter()
        .map(|item| match item {
            JsonValue::String(s) => Ok(s.clone()),
            other => Err(CoreError::InvalidInput("dropdown option".into(), other.to_string())),
        })
        .collect()
}

/// A typed value collected for a custom field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum FieldValue {
    Text(String),
    Number(Decimal),
    Boolean(bool),
    Choice(String),
}

impl fmt::Display for FieldValue {
    /// The raw form stored in `order_custom_values.value`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) | FieldValue::Choice(s) => f.write_str(s),
            FieldValue::Number(n) => write!(f, "{n}"),
            FieldValue::Boolean(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomField {
    pub id: i64,
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    pub is_active: bool,
}

impl CustomField {
    /// Decodes raw form input for this field.
    ///
    /// Blank input means "not filled in" and yields `Ok(None)`.
    pub fn decode_value(&self, raw: &str) -> Result<Option<FieldValue>, CoreError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let invalid = || CoreError::InvalidInput(self.name.clone(), raw.to_string());
        let value = match &self.kind {
            FieldKind::Text => FieldValue::Text(raw.to_string()),
            FieldKind::Number => FieldValue::Number(Decimal::from_str(raw).map_err(|_| invalid())?),
            FieldKind::Boolean => match raw.to_ascii_lowercase().as_str() {
                "true" => FieldValue::Boolean(true),
                "false" => FieldValue::Boolean(false),
                _ => return Err(invalid()),
            },
            FieldKind::Dropdown(options) => {
                if !options.iter().any(|o| o == raw) {
                    return Err(invalid());
                }
                FieldValue::Choice(raw.to_string())
            }
        };
        Ok(Some(value))
    }
}

/// One entry of the order form's custom-values list, before decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomValueInput {
    pub field_id: i64,
    #[serde(default)]
    pub value: Option<String>,
}
