//! # Salesboard Core Types
//!
//! The foundational data structures shared by every other crate in the workspace:
//! orders, ranking metrics, user profiles, custom order fields and reporting periods.
//!
//! This is a Layer 0 crate. It knows nothing about the hosted platform, HTTP or SQL;
//! it only defines the vocabulary and the validation rules that belong to the values
//! themselves.

pub mod enums;
pub mod error;
pub mod fields;
pub mod period;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{MetricName, OrderScope, Role, Theme};
pub use error::CoreError;
pub use fields::{CustomField, CustomValueInput, FieldKind, FieldValue};
pub use period::ReportingPeriod;
pub use structs::{name_from_email, Metric, NewOrder, Operator, Order, Profile};
