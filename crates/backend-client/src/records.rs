use core_types::FieldValue;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A validated order ready to be stored, with its custom values already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub client_code: String,
    pub product: String,
    pub volume: Decimal,
    pub revenue: Decimal,
    pub custom_values: Vec<(i64, FieldValue)>,
}

/// A stored custom value, in its raw textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomValueRow {
    pub order_id: i64,
    pub field_id: i64,
    pub value: Option<String>,
}
