//! # Salesboard Session
//!
//! Tracks who is signed in. A `SessionListener` queries the platform once, then follows
//! its auth-change stream and publishes a `SessionState` on a `tokio::sync::watch`
//! channel. The returned `SessionHandle` owns the subscription; shutting it down or
//! dropping it releases the listener.
//!
//! Also home to the profile resolution shared with the HTTP layer: a user's first
//! sign-in creates an operator profile named after their email.

pub mod error;
pub mod listener;
pub mod profile;
pub mod state;

pub use error::SessionError;
pub use listener::{SessionHandle, SessionListener};
pub use profile::{register, resolve_profile};
pub use state::SessionState;
