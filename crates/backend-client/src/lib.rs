//! # Salesboard Backend Client
//!
//! The typed remote-procedure interface to the hosted backend-as-a-service that owns
//! authentication and persistence.
//!
//! - `Backend` is the data contract (orders, metrics, profiles, custom fields).
//! - `AuthProvider` is the authentication contract, including the auth-change stream.
//! - `RestBackend` implements both over the platform's HTTP APIs.
//! - `InMemoryBackend` implements both in process, for tests and local demos.
//!
//! Everything returned through these traits is already decoded into `core-types`;
//! malformed numbers are zeroed and unknown metric or field shapes are skipped at
//! this boundary.

use async_trait::async_trait;
use core_types::{CustomField, FieldKind, Metric, Order, OrderScope, Profile, ReportingPeriod, Role};
use rust_decimal::Decimal;
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod auth;
pub mod error;
pub mod memory;
pub mod records;
pub mod responses;
pub mod rest;

// --- Public API ---
pub use auth::{default_profile, AuthEvent, AuthUser, Session};
pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use records::{CustomValueRow, OrderDraft};
pub use rest::RestBackend;

/// The data operations the application needs from the platform.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Orders visible in `scope`, newest first, optionally restricted to one period.
    async fn list_orders(
        &self,
        scope: OrderScope,
        period: Option<ReportingPeriod>,
    ) -> Result<Vec<Order>, BackendError>;

    async fn get_order(&self, id: i64) -> Result<Option<Order>, BackendError>;

    /// Stores an order owned by `owner`, together with its custom values.
    async fn insert_order(&self, owner: Uuid, draft: &OrderDraft) -> Result<Order, BackendError>;

    async fn delete_order(&self, id: i64) -> Result<(), BackendError>;

    async fn list_metrics(&self) -> Result<Vec<Metric>, BackendError>;

    async fn update_metric_weight(&self, id: i64, weight: Decimal) -> Result<Metric, BackendError>;

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError>;

    /// Stores a new profile. A duplicate id is reported as `Api { status: 409 }`.
    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, BackendError>;

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, BackendError>;

    /// Creates the platform account for a new operator and its profile.
    async fn invite_operator(&self, email: &str, name: &str) -> Result<Profile, BackendError>;

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, BackendError>;

    async fn insert_custom_field(&self, name: &str, kind: &FieldKind) -> Result<CustomField, BackendError>;

    async fn delete_custom_field(&self, id: i64) -> Result<(), BackendError>;

    async fn custom_values_for(&self, order_ids: &[i64]) -> Result<Vec<CustomValueRow>, BackendError>;
}

/// Authentication against the platform.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The session this client currently holds, if any.
    async fn current_session(&self) -> Result<Option<Session>, BackendError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    /// Registers a new account. `None` when the platform waits for email confirmation.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;

    /// Resolves a bearer token presented by a caller into the platform user.
    async fn user_for_token(&self, token: &str) -> Result<AuthUser, BackendError>;

    /// A fresh receiver of every auth state change from now on.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}
