use backend_client::AuthUser;
use core_types::Profile;
use serde::Serialize;
use uuid::Uuid;

/// What the application knows about who is using it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SessionState {
    /// The initial session query has not finished yet.
    Loading,
    SignedOut,
    SignedIn { user: AuthUser, profile: Profile },
}

impl SessionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_admin(&self) -> bool {
        self.profile().is_some_and(Profile::is_admin)
    }

    /// The signed-in user's id, which is also their operator id on the leaderboard.
    pub fn operator_id(&self) -> Option<Uuid> {
        self.profile().map(|p| p.id)
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            SessionState::SignedIn { profile, .. } => Some(profile),
            _ => None,
        }
    }
}
