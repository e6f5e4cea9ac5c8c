use crate::enums::{MetricName, Role, Theme};
use crate::error::CoreError;
use crate::fields::CustomValueInput;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered sales order. Orders are never edited, only deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub operator_id: Uuid,
    pub client_code: String,
    pub product: String,
    pub volume: Decimal,
    pub revenue: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The payload of the order form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub client_code: String,
    pub product: String,
    pub volume: Decimal,
    pub revenue: Decimal,
    #[serde(default)]
    pub custom_values: Vec<CustomValueInput>,
    /// Admins may register an order on behalf of another user.
    #[serde(default)]
    pub target_operator: Option<Uuid>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.client_code.trim().is_empty() {
            return Err(CoreError::InvalidInput("clientCode".into(), "must not be empty".into()));
        }
        if self.product.trim().is_empty() {
            return Err(CoreError::InvalidInput("product".into(), "must not be empty".into()));
        }
        if self.volume.is_sign_negative() {
            return Err(CoreError::InvalidInput("volume".into(), self.volume.to_string()));
        }
        if self.revenue.is_sign_negative() {
            return Err(CoreError::InvalidInput("revenue".into(), self.revenue.to_string()));
        }
        Ok(())
    }
}

/// A ranking metric and its admin-configured weight, in percent (0-100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub id: i64,
    pub name: MetricName,
    pub weight: Decimal,
}

/// A user of the application, as stored in the platform's `profiles` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub theme: Theme,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// The name shown on the leaderboard: the stored name, else one derived from the
    /// email, else the id.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match self.email.as_deref() {
            Some(email) if !email.trim().is_empty() => name_from_email(email),
            _ => self.id.to_string(),
        }
    }
}

/// A roster entry: the identity the ranking needs for each operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: Uuid,
    pub name: String,
}

impl From<&Profile> for Operator {
    fn from(profile: &Profile) -> Self {
        Self { id: profile.id, name: profile.display_name() }
    }
}

/// Derives a display name from a corporate email address:
/// `rodrigo.vignoli@example.com` becomes `Rodrigo Vignoli`.
pub fn name_from_email(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    local
        .split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
