use crate::auth::{AuthUser, Session};
use chrono::{DateTime, Duration, Utc};
use core_types::{CoreError, CustomField, FieldKind, Metric, MetricName, Order, Profile, Role, Theme};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;
use std::str::FromStr;
use uuid::Uuid;

// Rows mirror the platform's snake_case columns. Conversion into core types happens
// here, once, so nothing past this module sees untyped data.

/// Reads a numeric column that may arrive as a JSON number, a numeric string, or
/// garbage. Garbage becomes zero; one bad row must not blank the whole ranking.
pub fn decimal_or_zero(raw: &JsonValue) -> Decimal {
    let parsed = match raw {
        JsonValue::Number(n) => parse_decimal(&n.to_string()),
        JsonValue::String(s) => parse_decimal(s.trim()),
        JsonValue::Null => return Decimal::ZERO,
        _ => None,
    };
    parsed.unwrap_or_else(|| {
        tracing::warn!(value = %raw, "Malformed numeric value treated as zero.");
        Decimal::ZERO
    })
}

fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s).or_else(|_| Decimal::from_scientific(s)).ok()
}

fn lenient_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = JsonValue::deserialize(deserializer)?;
    Ok(decimal_or_zero(&raw))
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRow {
    pub id: i64,
    pub user_id: Uuid,
    #[serde(default)]
    pub client_code: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub volume: Decimal,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub revenue: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            operator_id: row.user_id,
            client_code: row.client_code.unwrap_or_default(),
            product: row.product.unwrap_or_default(),
            volume: row.volume,
            revenue: row.revenue,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricRow {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_decimal")]
    pub weight: Decimal,
}

impl MetricRow {
    /// `None` for metric names this build does not know how to score.
    pub fn into_metric(self) -> Option<Metric> {
        match MetricName::from_str(&self.name) {
            Ok(name) => Some(Metric { id: self.id, name, weight: self.weight }),
            Err(e) => {
                tracing::warn!(metric_id = self.id, error = %e, "Skipping unknown metric.");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub theme_preference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        let role = match row.role.as_deref().map(Role::from_str) {
            Some(Ok(role)) => role,
            Some(Err(e)) => {
                tracing::warn!(profile_id = %row.id, error = %e, "Unknown role, treating as operator.");
                Role::Operator
            }
            None => Role::Operator,
        };
        let theme = row
            .theme_preference
            .as_deref()
            .and_then(|t| Theme::from_str(t).ok())
            .unwrap_or_default();
        Profile {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            theme,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomFieldRow {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub options: Option<JsonValue>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl TryFrom<CustomFieldRow> for CustomField {
    type Error = CoreError;

    fn try_from(row: CustomFieldRow) -> Result<Self, Self::Error> {
        Ok(CustomField {
            id: row.id,
            kind: FieldKind::decode(&row.kind, row.options.as_ref())?,
            name: row.name,
            is_active: row.is_active.unwrap_or(true),
        })
    }
}

/// Decodes custom field rows, skipping (and logging) the ones with an unknown shape.
pub fn decode_custom_fields(rows: Vec<CustomFieldRow>) -> Vec<CustomField> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            CustomField::try_from(row)
                .map_err(|e| tracing::warn!(field_id = id, error = %e, "Skipping undecodable custom field."))
                .ok()
        })
        .collect()
}

/// The auth API's token grant response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl TokenResponse {
    pub fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .unwrap_or_else(|| now + Duration::seconds(self.expires_in));
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user,
        }
    }
}

/// Sign-up answers with a session when email confirmation is off, or with the bare
/// user when confirmation is pending.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SignUpResponse {
    Session(TokenResponse),
    PendingConfirmation(AuthUser),
}

/// Error bodies from both the data API (`message`) and the auth API
/// (`msg` / `error_description`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: Option<JsonValue>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiErrorResponse {
    pub fn describe(&self) -> String {
        let text = self
            .message
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.error_description.as_deref())
            .unwrap_or("unknown error");
        match (&self.code, &self.hint) {
            (Some(code), Some(hint)) => format!("{text} (code {code}; hint: {hint})"),
            (Some(code), None) => format!("{text} (code {code})"),
            _ => text.to_string(),
        }
    }
}
