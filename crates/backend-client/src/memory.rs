use crate::auth::{AuthEvent, AuthUser, Session, AUTH_EVENT_CAPACITY};
use crate::error::BackendError;
use crate::records::{CustomValueRow, OrderDraft};
use crate::{AuthProvider, Backend};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use core_types::{
    CustomField, FieldKind, Metric, MetricName, Order, OrderScope, Profile, ReportingPeriod, Role,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use uuid::Uuid;

const SESSION_LIFETIME_SECS: i64 = 3600;

struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Default)]
struct State {
    profiles: Vec<Profile>,
    orders: Vec<Order>,
    metrics: Vec<Metric>,
    fields: Vec<CustomField>,
    values: Vec<CustomValueRow>,
    accounts: HashMap<String, Account>,
    tokens: HashMap<String, AuthUser>,
    session: Option<Session>,
    next_id: i64,
    offline: bool,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_session(&mut self, user: AuthUser, now: DateTime<Utc>) -> Session {
        let session = Session {
            access_token: format!("access-{}", Uuid::new_v4()),
            refresh_token: format!("refresh-{}", Uuid::new_v4()),
            expires_at: now + Duration::seconds(SESSION_LIFETIME_SECS),
            user: user.clone(),
        };
        self.tokens.insert(session.access_token.clone(), user);
        self.session = Some(session.clone());
        session
    }
}

/// An in-process stand-in for the hosted platform.
///
/// Holds the same tables the platform does and honours the same contracts, so the
/// service, session and HTTP layers can be exercised without a network. `set_offline`
/// makes every data call fail as if the platform were unreachable.
#[derive(Clone)]
pub struct InMemoryBackend {
    state: Arc<Mutex<State>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { state: Arc::new(Mutex::new(State::default())), events }
    }

    /// A backend seeded with the two standard metrics at the given weights.
    pub fn with_metrics(revenue_weight: Decimal, order_count_weight: Decimal) -> Self {
        let backend = Self::new();
        backend.add_metric(MetricName::Revenue, revenue_weight);
        backend.add_metric(MetricName::OrderCount, order_count_weight);
        backend
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, BackendError> {
        let state = self
            .state
            .lock()
            .map_err(|_| BackendError::Unavailable("in-memory state poisoned".into()))?;
        if state.offline {
            return Err(BackendError::Unavailable("backend is offline".into()));
        }
        Ok(state)
    }

    // Seeding helpers bypass the offline switch so tests can arrange state freely.
    fn seed(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.seed().offline = offline;
    }

    pub fn add_profile(&self, profile: Profile) {
        let mut state = self.seed();
        state.profiles.retain(|p| p.id != profile.id);
        state.profiles.push(profile);
    }

    /// Adds a profile with the given role and returns it.
    pub fn add_user(&self, name: &str, role: Role) -> Profile {
        let profile = Profile {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            email: None,
            role,
            theme: Default::default(),
            created_at: Utc::now(),
        };
        self.add_profile(profile.clone());
        profile
    }

    /// Stores an order as-is, with a fresh id, and returns it.
    pub fn add_order(
        &self,
        operator_id: Uuid,
        revenue: Decimal,
        created_at: DateTime<Utc>,
    ) -> Order {
        let mut state = self.seed();
        let order = Order {
            id: state.next_id(),
            operator_id,
            client_code: format!("C-{}", state.next_id),
            product: "CDB".into(),
            volume: revenue,
            revenue,
            created_at,
        };
        state.orders.push(order.clone());
        order
    }

    pub fn add_metric(&self, name: MetricName, weight: Decimal) -> Metric {
        let mut state = self.seed();
        let metric = Metric { id: state.next_id(), name, weight };
        state.metrics.push(metric.clone());
        metric
    }

    pub fn add_custom_field(&self, name: &str, kind: FieldKind, is_active: bool) -> CustomField {
        let mut state = self.seed();
        let field = CustomField { id: state.next_id(), name: name.to_string(), kind, is_active };
        state.fields.push(field.clone());
        field
    }

    /// Registers credentials without signing in. Returns the platform user.
    pub fn register_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()) };
        self.seed().accounts.insert(
            email.trim().to_ascii_lowercase(),
            Account { password: password.to_string(), user: user.clone() },
        );
        user
    }

    /// Issues a bearer token resolving to `user_id`, as if that user had signed in elsewhere.
    pub fn issue_token(&self, user_id: Uuid) -> String {
        let token = format!("token-{}", Uuid::new_v4());
        self.seed().tokens.insert(token.clone(), AuthUser { id: user_id, email: None });
        token
    }

    /// Publishes an auth event, as the platform does when a session changes elsewhere.
    pub fn emit(&self, event: AuthEvent) {
        let _ = self.events.send(event);
    }

    /// Stores a raw custom value directly, as rows written before a field was retired.
    pub fn add_custom_value(&self, order_id: i64, field_id: i64, value: &str) {
        self.seed().values.push(CustomValueRow { order_id, field_id, value: Some(value.to_string()) });
    }

    pub fn custom_values(&self) -> Vec<CustomValueRow> {
        self.seed().values.clone()
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn list_orders(
        &self,
        scope: OrderScope,
        period: Option<ReportingPeriod>,
    ) -> Result<Vec<Order>, BackendError> {
        let state = self.lock()?;
        let mut orders: Vec<Order> = state
            .orders
            .iter()
            .filter(|o| scope.admits(o.operator_id))
            .filter(|o| period.is_none_or(|p| p.contains(&o.created_at)))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, BackendError> {
        Ok(self.lock()?.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn insert_order(&self, owner: Uuid, draft: &OrderDraft) -> Result<Order, BackendError> {
        let mut state = self.lock()?;
        let order = Order {
            id: state.next_id(),
            operator_id: owner,
            client_code: draft.client_code.clone(),
            product: draft.product.clone(),
            volume: draft.volume,
            revenue: draft.revenue,
            created_at: Utc::now(),
        };
        state.orders.push(order.clone());
        for (field_id, value) in &draft.custom_values {
            state.values.push(CustomValueRow {
                order_id: order.id,
                field_id: *field_id,
                value: Some(value.to_string()),
            });
        }
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        let before = state.orders.len();
        state.orders.retain(|o| o.id != id);
        if state.orders.len() == before {
            return Err(BackendError::NotFound);
        }
        state.values.retain(|v| v.order_id != id);
        Ok(())
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, BackendError> {
        Ok(self.lock()?.metrics.clone())
    }

    async fn update_metric_weight(&self, id: i64, weight: Decimal) -> Result<Metric, BackendError> {
        let mut state = self.lock()?;
        let metric = state.metrics.iter_mut().find(|m| m.id == id).ok_or(BackendError::NotFound)?;
        metric.weight = weight;
        Ok(metric.clone())
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        Ok(self.lock()?.profiles.clone())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        Ok(self.lock()?.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, BackendError> {
        let mut state = self.lock()?;
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(BackendError::Api { status: 409, message: "duplicate profile".into() });
        }
        state.profiles.push(profile.clone());
        Ok(profile.clone())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, BackendError> {
        let mut state = self.lock()?;
        let profile = state.profiles.iter_mut().find(|p| p.id == id).ok_or(BackendError::NotFound)?;
        profile.role = role;
        Ok(profile.clone())
    }

    async fn invite_operator(&self, email: &str, name: &str) -> Result<Profile, BackendError> {
        let mut state = self.lock()?;
        let key = email.trim().to_ascii_lowercase();
        if state.accounts.contains_key(&key) {
            return Err(BackendError::Api { status: 422, message: "User already registered".into() });
        }
        let user = AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()) };
        state.accounts.insert(key, Account { password: String::new(), user: user.clone() });

        let profile = Profile {
            id: user.id,
            name: Some(name.to_string()),
            email: user.email,
            role: Role::Operator,
            theme: Default::default(),
            created_at: Utc::now(),
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, BackendError> {
        Ok(self.lock()?.fields.clone())
    }

    async fn insert_custom_field(&self, name: &str, kind: &FieldKind) -> Result<CustomField, BackendError> {
        let mut state = self.lock()?;
        let field = CustomField { id: state.next_id(), name: name.to_string(), kind: kind.clone(), is_active: true };
        state.fields.push(field.clone());
        Ok(field)
    }

    async fn delete_custom_field(&self, id: i64) -> Result<(), BackendError> {
        let mut state = self.lock()?;
        let before = state.fields.len();
        state.fields.retain(|f| f.id != id);
        if state.fields.len() == before {
            return Err(BackendError::NotFound);
        }
        state.values.retain(|v| v.field_id != id);
        Ok(())
    }

    async fn custom_values_for(&self, order_ids: &[i64]) -> Result<Vec<CustomValueRow>, BackendError> {
        Ok(self
            .lock()?
            .values
            .iter()
            .filter(|v| order_ids.contains(&v.order_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuthProvider for InMemoryBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        let mut state = self.lock()?;
        if state.session.as_ref().is_some_and(|s| s.is_expired(Utc::now())) {
            state.session = None;
        }
        Ok(state.session.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let session = {
            let mut state = self.lock()?;
            let user = match state.accounts.get(&email.trim().to_ascii_lowercase()) {
                Some(account) if account.password == password => account.user.clone(),
                _ => return Err(BackendError::Unauthorized("Invalid login credentials".into())),
            };
            state.issue_session(user, Utc::now())
        };
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, BackendError> {
        let session = {
            let mut state = self.lock()?;
            let key = email.trim().to_ascii_lowercase();
            if state.accounts.contains_key(&key) {
                return Err(BackendError::Api { status: 422, message: "User already registered".into() });
            }
            let user = AuthUser { id: Uuid::new_v4(), email: Some(email.to_string()) };
            state.accounts.insert(key, Account { password: password.to_string(), user: user.clone() });
            state.issue_session(user, Utc::now())
        };
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(Some(session))
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        {
            let mut state = self.lock()?;
            if let Some(session) = state.session.take() {
                state.tokens.remove(&session.access_token);
            }
        }
        self.emit(AuthEvent::SignedOut);
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> Result<AuthUser, BackendError> {
        let state = self.lock()?;
        let user = state
            .tokens
            .get(token)
            .cloned()
            .ok_or_else(|| BackendError::Unauthorized("invalid or expired token".into()))?;
        // Accounts carry the email; tokens issued for bare profiles do not.
        let email = user.email.clone().or_else(|| {
            state.accounts.values().find(|a| a.user.id == user.id).and_then(|a| a.user.email.clone())
        });
        Ok(AuthUser { id: user.id, email })
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn orders_are_scoped_and_filtered_by_period() {
        let backend = InMemoryBackend::new();
        let ana = backend.add_user("Ana", Role::Operator);
        let bruno = backend.add_user("Bruno", Role::Operator);
        backend.add_order(ana.id, dec!(100), Utc.with_ymd_and_hms(2024, 5, 3, 10, 0, 0).unwrap());
        backend.add_order(ana.id, dec!(50), Utc.with_ymd_and_hms(2024, 4, 30, 23, 59, 59).unwrap());
        backend.add_order(bruno.id, dec!(70), Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap());

        let may = ReportingPeriod::new(2024, 5).unwrap();
        let all_may = backend.list_orders(OrderScope::All, Some(may)).await.unwrap();
        assert_eq!(all_may.len(), 2);
        assert_eq!(all_may[0].operator_id, bruno.id);

        let mine = backend.list_orders(OrderScope::Mine(ana.id), None).await.unwrap();
        assert_eq!(mine.len(), 2);
    }

    #[tokio::test]
    async fn offline_backend_reports_unavailable() {
        let backend = InMemoryBackend::with_metrics(dec!(50), dec!(50));
        backend.set_offline(true);
        let err = backend.list_metrics().await.unwrap_err();
        assert!(err.is_unavailable());

        backend.set_offline(false);
        assert_eq!(backend.list_metrics().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deleting_an_order_drops_its_custom_values() {
        let backend = InMemoryBackend::new();
        let owner = backend.add_user("Ana", Role::Operator).id;
        let draft = OrderDraft {
            client_code: "C-1".into(),
            product: "LCA".into(),
            volume: dec!(1000),
            revenue: dec!(10),
            custom_values: vec![(9, core_types::FieldValue::Text("Mesa".into()))],
        };
        let order = backend.insert_order(owner, &draft).await.unwrap();
        assert_eq!(backend.custom_values_for(&[order.id]).await.unwrap().len(), 1);

        backend.delete_order(order.id).await.unwrap();
        assert!(backend.custom_values().is_empty());
        assert!(matches!(backend.delete_order(order.id).await, Err(BackendError::NotFound)));
    }

    #[tokio::test]
    async fn sign_in_publishes_event_and_token_resolves() {
        let backend = InMemoryBackend::new();
        let user = backend.register_account("ana.souza@investsmart.com.br", "secret");
        let mut events = backend.subscribe();

        assert!(backend.sign_in("ana.souza@investsmart.com.br", "wrong").await.is_err());
        let session = backend.sign_in("Ana.Souza@investsmart.com.br", "secret").await.unwrap();

        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedIn(session.clone()));
        let resolved = backend.user_for_token(&session.access_token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        backend.sign_out().await.unwrap();
        assert_eq!(events.recv().await.unwrap(), AuthEvent::SignedOut);
        assert!(backend.user_for_token(&session.access_token).await.is_err());
    }
}
