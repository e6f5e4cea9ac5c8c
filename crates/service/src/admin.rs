use crate::caller::Caller;
use crate::error::ServiceError;
use crate::sales::SalesService;
use core_types::{name_from_email, CustomField, FieldKind, Metric, Profile, Role};
use ranking::{weights_balanced, weights_total};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

/// The admin form for a new custom field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomFieldDraft {
    pub name: String,
    /// `TEXT`, `NUMBER`, `BOOLEAN` or `DROPDOWN`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Comma-separated dropdown options.
    #[serde(default)]
    pub options: Option<String>,
}

impl CustomFieldDraft {
    fn kind(&self) -> Result<FieldKind, ServiceError> {
        match self.kind.trim().to_ascii_uppercase().as_str() {
            "DROPDOWN" => Ok(FieldKind::dropdown_from_list(self.options.as_deref().unwrap_or_default())?),
            other => Ok(FieldKind::decode(other, None)?),
        }
    }
}

impl SalesService {
    pub async fn metrics(&self) -> Result<Vec<Metric>, ServiceError> {
        Ok(self.backend.list_metrics().await?)
    }

    /// Sets a metric's weight (percent, 0 to 100).
    ///
    /// The weights are not required to sum to 100; an unbalanced set is only logged.
    pub async fn update_metric_weight(&self, caller: &Caller, id: i64, weight: Decimal) -> Result<Metric, ServiceError> {
        caller.require_admin("change metric weights")?;
        if weight < Decimal::ZERO || weight > Decimal::ONE_HUNDRED {
            return Err(ServiceError::Validation(format!("weight must be between 0 and 100, got {weight}")));
        }

        let metric = self.backend.update_metric_weight(id, weight).await?;
        let metrics = self.backend.list_metrics().await?;
        if !weights_balanced(&metrics) {
            tracing::warn!(total = %weights_total(&metrics), "Metric weights do not sum to 100.");
        }
        tracing::info!(metric = %metric.name, %weight, "Metric weight updated.");
        Ok(metric)
    }

    pub async fn create_custom_field(&self, caller: &Caller, draft: CustomFieldDraft) -> Result<CustomField, ServiceError> {
        caller.require_admin("create custom fields")?;
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(ServiceError::Validation("custom field name must not be empty".into()));
        }
        let kind = draft.kind()?;
        let field = self.backend.insert_custom_field(name, &kind).await?;
        tracing::info!(field_id = field.id, kind = kind.tag(), "Custom field created.");
        Ok(field)
    }

    pub async fn delete_custom_field(&self, caller: &Caller, id: i64) -> Result<(), ServiceError> {
        caller.require_admin("delete custom fields")?;
        self.backend.delete_custom_field(id).await?;
        tracing::info!(field_id = id, "Custom field deleted.");
        Ok(())
    }

    pub async fn users(&self, caller: &Caller) -> Result<Vec<Profile>, ServiceError> {
        caller.require_admin("list users")?;
        Ok(self.backend.list_profiles().await?)
    }

    pub async fn promote(&self, caller: &Caller, target: Uuid) -> Result<Profile, ServiceError> {
        self.set_role(caller, target, Role::Admin).await
    }

    /// Demotes an admin to operator. Admins cannot demote themselves.
    pub async fn demote(&self, caller: &Caller, target: Uuid) -> Result<Profile, ServiceError> {
        caller.require_admin("change user roles")?;
        if target == caller.id() {
            return Err(ServiceError::Forbidden("admins cannot demote themselves".into()));
        }
        self.set_role(caller, target, Role::Operator).await
    }

    async fn set_role(&self, caller: &Caller, target: Uuid, role: Role) -> Result<Profile, ServiceError> {
        caller.require_admin("change user roles")?;
        let profile = self.backend.update_role(target, role).await.map_err(|e| match e {
            backend_client::BackendError::NotFound => ServiceError::NotFound(format!("user {target}")),
            other => other.into(),
        })?;
        tracing::info!(user_id = %target, role = role.as_str(), by = %caller.id(), "User role changed.");
        Ok(profile)
    }

    /// Creates an operator account for a corporate email address.
    ///
    /// The name defaults to one derived from the email.
    pub async fn invite_operator(&self, caller: &Caller, email: &str, name: Option<&str>) -> Result<Profile, ServiceError> {
        caller.require_admin("create users")?;
        let email = email.trim();
        if !self.auth.accepts_email(email) {
            return Err(ServiceError::Validation(format!(
                "email must end with @{}",
                self.auth.allowed_email_domain
            )));
        }
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => name_from_email(email),
        };
        let profile = self.backend.invite_operator(email, &name).await?;
        tracing::info!(user_id = %profile.id, "Operator invited.");
        Ok(profile)
    }
}
