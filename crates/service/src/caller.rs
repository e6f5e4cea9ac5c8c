use crate::error::ServiceError;
use core_types::Profile;
use uuid::Uuid;

/// The authenticated user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub profile: Profile,
}

impl Caller {
    pub fn new(profile: Profile) -> Self {
        Self { profile }
    }

    pub fn id(&self) -> Uuid {
        self.profile.id
    }

    pub fn is_admin(&self) -> bool {
        self.profile.is_admin()
    }

    pub fn require_admin(&self, action: &str) -> Result<(), ServiceError> {
        if self.is_admin() {
            Ok(())
        } else {
            tracing::warn!(user_id = %self.id(), action, "Admin-only action refused.");
            Err(ServiceError::Forbidden(format!("only admins can {action}")))
        }
    }
}
