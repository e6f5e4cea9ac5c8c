use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The privilege level of a profile. Stored on the platform as `"user"` / `"admin"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Role {
    #[default]
    #[serde(rename = "user")]
    Operator,
    #[serde(rename = "admin")]
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Operator => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" | "operator" => Ok(Role::Operator),
            "admin" => Ok(Role::Admin),
            other => Err(CoreError::InvalidInput("role".into(), other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(CoreError::InvalidInput("theme".into(), other.to_string())),
        }
    }
}

/// The closed set of quantities a ranking metric can weigh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricName {
    #[serde(rename = "revenue")]
    Revenue,
    #[serde(rename = "orderCount")]
    OrderCount,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Revenue => "revenue",
            MetricName::OrderCount => "orderCount",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "revenue" => Ok(MetricName::Revenue),
            "orderCount" | "order_count" => Ok(MetricName::OrderCount),
            other => Err(CoreError::UnknownMetric(other.to_string())),
        }
    }
}

/// Which orders a read is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    /// Only the orders owned by this operator.
    Mine(Uuid),
    /// Every order on the platform (admins, and the ranking).
    All,
}

impl OrderScope {
    pub fn admits(&self, operator_id: Uuid) -> bool {
        match self {
            OrderScope::Mine(id) => *id == operator_id,
            OrderScope::All => true,
        }
    }
}
