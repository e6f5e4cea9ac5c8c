//! # Salesboard Database Crate
//!
//! A direct PostgreSQL adapter for the same schema the hosted platform exposes over
//! REST. Used for self-hosted deployments and for applying the schema itself.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** Implements the `Backend` trait from `backend-client`, so the service
//!   layer cannot tell it apart from the REST client.
//! - **Runtime-checked SQL:** Queries are built with `sqlx::query`/`query_as` and bound
//!   parameters; the crate builds without a live database.
//! - **Asynchronous & Pooled:** All operations share one `PgPool`.
//!
//! ## Public API
//!
//! - `connect`: Establishes the connection pool from `DATABASE_URL`.
//! - `run_migrations`: Applies the embedded schema migrations.
//! - `DbRepository`: The `Backend` implementation over the pool.
//! - `DbError`: The specific error types that can be returned from this crate.

pub mod connection;
pub mod error;
pub mod repository;

pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::DbRepository;
