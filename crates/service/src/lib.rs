//! # Salesboard Service
//!
//! The use-case layer between the presentation layer and the platform. Each operation
//! takes the `Caller` it runs for and checks permissions before any data moves.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Orchestration:** Fetches from a `Backend`, hands snapshots to the pure
//!   `ranking` core, and shapes the results into views. No HTTP, no SQL.
//! - **Explicit failure states:** an unreachable platform surfaces as
//!   `ServiceError::DataUnavailable`, distinct from an empty result.
//!
//! ## Public API
//!
//! - `SalesService`: ranking, orders, metrics, custom fields, users and CSV export.
//! - `Caller`: the authenticated profile an operation runs for.
//! - `RankingView`, `OrderListing`, `CsvExport`: what operations return.
//! - `ServiceError`: the specific error types that can be returned from this crate.

pub mod admin;
pub mod caller;
pub mod error;
pub mod export;
pub mod sales;
pub mod views;

pub use admin::CustomFieldDraft;
pub use caller::Caller;
pub use error::ServiceError;
pub use export::export_file_name;
pub use sales::SalesService;
pub use views::{CsvExport, OrderListing, RankingView, PODIUM_SIZE};
