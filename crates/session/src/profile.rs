use crate::error::SessionError;
use backend_client::{default_profile, AuthProvider, AuthUser, Backend, BackendError, Session};
use configuration::AuthConfig;
use core_types::Profile;

/// Fetches the profile for `user`, creating the default operator profile on first sign-in.
pub async fn resolve_profile(backend: &dyn Backend, user: &AuthUser) -> Result<Profile, SessionError> {
    if let Some(profile) = backend.get_profile(user.id).await? {
        return Ok(profile);
    }

    let fresh = default_profile(user);
    match backend.insert_profile(&fresh).await {
        Ok(profile) => {
            tracing::info!(user_id = %user.id, "Created profile on first sign-in.");
            Ok(profile)
        }
        // Another client created it between our read and write.
        Err(BackendError::Api { status: 409, .. }) => {
            backend.get_profile(user.id).await?.ok_or(SessionError::Backend(BackendError::NotFound))
        }
        Err(e) => Err(e.into()),
    }
}

/// Registers a new account after checking the corporate email domain.
///
/// Returns `None` when the platform holds the account until the email is confirmed.
pub async fn register(
    auth: &dyn AuthProvider,
    config: &AuthConfig,
    email: &str,
    password: &str,
) -> Result<Option<Session>, SessionError> {
    if !config.accepts_email(email) {
        return Err(SessionError::EmailDomain(format!("@{}", config.allowed_email_domain)));
    }
    Ok(auth.sign_up(email.trim(), password).await?)
}
