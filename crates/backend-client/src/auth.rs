use chrono::{DateTime, Utc};
use core_types::{name_from_email, Profile, Role};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The platform's view of an authenticated user (not the application profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// An authenticated session as issued by the platform's auth API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// A change in authentication state, published to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
    UserUpdated(Session),
}

impl AuthEvent {
    /// The session carried by the event; `None` once signed out.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::SignedIn(s) | AuthEvent::TokenRefreshed(s) | AuthEvent::UserUpdated(s) => Some(s),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Capacity of the auth event channel. Subscribers that fall further behind than this
/// see a lag notice and resynchronize from `current_session`.
pub const AUTH_EVENT_CAPACITY: usize = 32;

/// Builds the profile a first-time user gets: operator role, name from the email.
pub fn default_profile(user: &AuthUser) -> Profile {
    Profile {
        id: user.id,
        name: user.email.as_deref().map(name_from_email),
        email: user.email.clone(),
        role: Role::Operator,
        theme: Default::default(),
        created_at: Utc::now(),
    }
}
