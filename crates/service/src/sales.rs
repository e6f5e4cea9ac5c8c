use crate::caller::Caller;
use crate::error::ServiceError;
use crate::views::{OrderListing, RankingView};
use backend_client::{Backend, OrderDraft};
use configuration::{AuthConfig, ExportConfig};
use core_types::{
    CustomField, FieldValue, NewOrder, Operator, Order, OrderScope, Profile, ReportingPeriod, Role,
};
use ranking::{find_position, RankedEntry, RankingEngine};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// The use-case layer: every operation the presentation layer can ask for, with the
/// caller's permissions checked before anything reaches the platform.
#[derive(Clone)]
pub struct SalesService {
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) engine: RankingEngine,
    pub(crate) auth: AuthConfig,
    pub(crate) export: ExportConfig,
}

impl SalesService {
    pub fn new(backend: Arc<dyn Backend>, auth: AuthConfig, export: ExportConfig) -> Self {
        Self { backend, engine: RankingEngine::new(), auth, export }
    }

    /// Fetches, scores and ranks the operators for `period`.
    ///
    /// Any caller may view the leaderboard; `me` is the caller's own standing.
    pub async fn ranking(&self, caller: &Caller, period: ReportingPeriod) -> Result<RankingView, ServiceError> {
        let entries = self.leaderboard(period).await?;
        let me = find_position(&entries, caller.id());
        Ok(RankingView::new(period, entries, me))
    }

    /// The ranked roster for `period`, without any caller-specific view.
    pub async fn leaderboard(&self, period: ReportingPeriod) -> Result<Vec<RankedEntry>, ServiceError> {
        // 1. Fetch
        let orders = self.backend.list_orders(OrderScope::All, Some(period)).await?;
        let metrics = self.backend.list_metrics().await?;
        let roster = self.roster().await?;

        // 2. Score and rank
        let entries = self.engine.compute_for_period(period, &orders, &metrics, &roster);
        tracing::info!(%period, operators = entries.len(), orders = orders.len(), "Ranking computed.");
        Ok(entries)
    }

    /// Every profile with the operator role, in the order the platform returns them.
    pub async fn roster(&self) -> Result<Vec<Operator>, ServiceError> {
        Ok(self
            .backend
            .list_profiles()
            .await?
            .iter()
            .filter(|p| p.role == Role::Operator)
            .map(Operator::from)
            .collect())
    }

    /// Lists the caller's orders, or everyone's for admins, optionally filtered by `search`.
    pub async fn list_orders(&self, caller: &Caller, search: Option<&str>) -> Result<Vec<OrderListing>, ServiceError> {
        let scope = if caller.is_admin() { OrderScope::All } else { OrderScope::Mine(caller.id()) };
        let orders = self.backend.list_orders(scope, None).await?;
        let names = self.display_names().await?;

        Ok(orders
            .into_iter()
            .map(|order| OrderListing {
                operator_name: name_for(&names, order.operator_id),
                order,
            })
            .filter(|listing| search.is_none_or(|needle| listing.matches(needle)))
            .collect())
    }

    /// Registers an order. Admins may register it on behalf of another user.
    pub async fn create_order(&self, caller: &Caller, new_order: NewOrder) -> Result<Order, ServiceError> {
        new_order.validate()?;

        let owner = match new_order.target_operator {
            Some(target) if target != caller.id() => {
                caller.require_admin("register orders for other users")?;
                if self.backend.get_profile(target).await?.is_none() {
                    return Err(ServiceError::NotFound(format!("user {target}")));
                }
                target
            }
            _ => caller.id(),
        };

        let fields = self.backend.list_custom_fields().await?;
        let mut custom_values = Vec::new();
        for input in &new_order.custom_values {
            let field = fields
                .iter()
                .find(|f| f.id == input.field_id && f.is_active)
                .ok_or_else(|| ServiceError::Validation(format!("unknown custom field {}", input.field_id)))?;
            if let Some(value) = decode_input(field, input.value.as_deref())? {
                custom_values.push((field.id, value));
            }
        }

        let draft = OrderDraft {
            client_code: new_order.client_code.trim().to_string(),
            product: new_order.product.trim().to_string(),
            volume: new_order.volume,
            revenue: new_order.revenue,
            custom_values,
        };
        let order = self.backend.insert_order(owner, &draft).await?;
        tracing::info!(order_id = order.id, operator_id = %owner, by = %caller.id(), "Order registered.");
        Ok(order)
    }

    /// Deletes an order. Only its owner or an admin may do so.
    pub async fn delete_order(&self, caller: &Caller, id: i64) -> Result<(), ServiceError> {
        let order = self
            .backend
            .get_order(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {id}")))?;
        if order.operator_id != caller.id() {
            caller.require_admin("delete other users' orders")?;
        }
        self.backend.delete_order(id).await?;
        tracing::info!(order_id = id, by = %caller.id(), "Order deleted.");
        Ok(())
    }

    /// Custom fields for the order form (active only), or all of them for admins who ask.
    pub async fn custom_fields(&self, caller: &Caller, include_inactive: bool) -> Result<Vec<CustomField>, ServiceError> {
        if include_inactive {
            caller.require_admin("see inactive custom fields")?;
        }
        let fields = self.backend.list_custom_fields().await?;
        Ok(fields.into_iter().filter(|f| include_inactive || f.is_active).collect())
    }

    pub(crate) async fn display_names(&self) -> Result<HashMap<Uuid, String>, ServiceError> {
        Ok(self
            .backend
            .list_profiles()
            .await?
            .iter()
            .map(|p: &Profile| (p.id, p.display_name()))
            .collect())
    }
}

pub(crate) fn name_for(names: &HashMap<Uuid, String>, id: Uuid) -> String {
    names.get(&id).cloned().unwrap_or_else(|| id.to_string())
}

fn decode_input(field: &CustomField, raw: Option<&str>) -> Result<Option<FieldValue>, ServiceError> {
    match raw {
        Some(raw) => Ok(field.decode_value(raw)?),
        None => Ok(None),
    }
}
