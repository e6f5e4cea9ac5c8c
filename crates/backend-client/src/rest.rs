use crate::auth::{AuthEvent, AuthUser, Session, AUTH_EVENT_CAPACITY};
use crate::error::BackendError;
use crate::records::{CustomValueRow, OrderDraft};
use crate::responses::{
    decode_custom_fields, ApiErrorResponse, CustomFieldRow, MetricRow, OrderRow, ProfileRow,
    SignUpResponse, TokenResponse,
};
use crate::{AuthProvider, Backend};
use async_trait::async_trait;
use chrono::Utc;
use configuration::BackendConfig;
use core_types::{CustomField, FieldKind, Metric, Order, OrderScope, Profile, ReportingPeriod, Role};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

/// A client for the platform's REST data API (`/rest/v1`) and auth API (`/auth/v1`).
///
/// Cloning is cheap; clones share the HTTP pool, the held session and the event channel.
#[derive(Clone)]
pub struct RestBackend {
    client: reqwest::Client,
    base_url: String,
    anon_key: String,
    service_key: Option<String>,
    fixed_bearer: Option<String>,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl RestBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.anon_key)
                .map_err(|e| BackendError::InvalidData(format!("Invalid anon key: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            service_key: config.service_key.clone().filter(|k| !k.trim().is_empty()),
            fixed_bearer: None,
            session: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// Makes data calls on behalf of the user owning `access_token`, for one-shot
    /// command-line use where no sign-in flow runs.
    pub fn with_access_token(mut self, access_token: impl Into<String>) -> Self {
        self.fixed_bearer = Some(access_token.into());
        self
    }

    /// Exchanges the held refresh token for a new session.
    pub async fn refresh_session(&self) -> Result<Session, BackendError> {
        let refresh_token = self
            .held_session()
            .map(|s| s.refresh_token)
            .ok_or_else(|| BackendError::Unauthorized("no session to refresh".into()))?;

        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token }));
        let grant: TokenResponse = Self::read(request).await?;

        let session = grant.into_session(Utc::now());
        self.store_session(Some(session.clone()));
        self.publish(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn held_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn store_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    fn publish(&self, event: AuthEvent) {
        // No subscribers is fine; the event is simply not observed.
        let _ = self.events.send(event);
    }

    /// The bearer for data calls: the service key, else the user's token, else the anon key.
    fn data_bearer(&self) -> String {
        self.service_key
            .clone()
            .or_else(|| self.fixed_bearer.clone())
            .or_else(|| self.held_session().map(|s| s.access_token))
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn data_request(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, self.rest_url(table))
            .header(AUTHORIZATION, format!("Bearer {}", self.data_bearer()))
    }

    fn returning(builder: RequestBuilder) -> RequestBuilder {
        builder.header("Prefer", "return=representation")
    }

    async fn read<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::checked(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str::<T>(&text).map_err(|e| BackendError::Deserialization(e.to_string()))
    }

    async fn checked(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let body: ApiErrorResponse = serde_json::from_str(&text).unwrap_or_default();
        let message = if text.is_empty() { status.to_string() } else { body.describe() };
        match status.as_u16() {
            401 | 403 => Err(BackendError::Unauthorized(message)),
            404 => Err(BackendError::NotFound),
            code => Err(BackendError::Api { status: code, message }),
        }
    }

    /// Takes the single row a `return=representation` write answers with.
    fn single<T>(rows: Vec<T>) -> Result<T, BackendError> {
        rows.into_iter().next().ok_or(BackendError::NotFound)
    }

    async fn remove_order(&self, id: i64) -> Result<(), BackendError> {
        let request = Self::returning(self.data_request(Method::DELETE, "orders"))
            .query(&[("id", format!("eq.{id}"))]);
        let deleted: Vec<OrderRow> = Self::read(request).await?;
        if deleted.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn insert_custom_values(&self, order_id: i64, draft: &OrderDraft) -> Result<(), BackendError> {
        if draft.custom_values.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = draft
            .custom_values
            .iter()
            .map(|(field_id, value)| {
                json!({ "order_id": order_id, "field_id": field_id, "value": value.to_string() })
            })
            .collect();
        let request = self.data_request(Method::POST, "order_custom_values").json(&rows);
        Self::checked(request.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for RestBackend {
    async fn list_orders(
        &self,
        scope: OrderScope,
        period: Option<ReportingPeriod>,
    ) -> Result<Vec<Order>, BackendError> {
        let mut query: Vec<(&str, String)> = vec![
            ("select", "id,user_id,client_code,product,volume,revenue,created_at".into()),
            ("order", "created_at.desc".into()),
        ];
        if let OrderScope::Mine(owner) = scope {
            query.push(("user_id", format!("eq.{owner}")));
        }
        if let Some(period) = period {
            let (start, end) = period.bounds();
            query.push(("created_at", format!("gte.{}", start.to_rfc3339())));
            query.push(("created_at", format!("lt.{}", end.to_rfc3339())));
        }

        let rows: Vec<OrderRow> = Self::read(self.data_request(Method::GET, "orders").query(&query)).await?;
        tracing::debug!(count = rows.len(), "Fetched orders.");
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, BackendError> {
        let request = self
            .data_request(Method::GET, "orders")
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let rows: Vec<OrderRow> = Self::read(request).await?;
        Ok(rows.into_iter().next().map(Order::from))
    }

    async fn insert_order(&self, owner: Uuid, draft: &OrderDraft) -> Result<Order, BackendError> {
        let body = json!([{
            "user_id": owner,
            "client_code": draft.client_code,
            "product": draft.product,
            "volume": draft.volume,
            "revenue": draft.revenue,
        }]);
        let request = Self::returning(self.data_request(Method::POST, "orders")).json(&body);
        let order: Order = Self::single(Self::read::<Vec<OrderRow>>(request).await?)?.into();

        // The two writes are separate requests; undo the order if its values fail.
        if let Err(e) = self.insert_custom_values(order.id, draft).await {
            match self.remove_order(order.id).await {
                Ok(()) => tracing::warn!(order_id = order.id, error = %e, "Custom values rejected; order rolled back."),
                Err(cleanup) => tracing::error!(
                    order_id = order.id,
                    error = %e,
                    cleanup_error = %cleanup,
                    "Custom values rejected and the order could not be removed; it is stored without them."
                ),
            }
            return Err(e);
        }
        tracing::info!(order_id = order.id, operator_id = %owner, "Order stored.");
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<(), BackendError> {
        self.remove_order(id).await
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, BackendError> {
        let request = self
            .data_request(Method::GET, "ranking_metrics")
            .query(&[("select", "id,name,weight"), ("order", "id.asc")]);
        let rows: Vec<MetricRow> = Self::read(request).await?;
        Ok(rows.into_iter().filter_map(MetricRow::into_metric).collect())
    }

    async fn update_metric_weight(&self, id: i64, weight: Decimal) -> Result<Metric, BackendError> {
        let request = Self::returning(self.data_request(Method::PATCH, "ranking_metrics"))
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "weight": weight }));
        let row = Self::single(Self::read::<Vec<MetricRow>>(request).await?)?;
        row.into_metric()
            .ok_or_else(|| BackendError::InvalidData(format!("metric {id} has an unknown name")))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        let request = self
            .data_request(Method::GET, "profiles")
            .query(&[("select", "*"), ("order", "created_at.asc")]);
        let rows: Vec<ProfileRow> = Self::read(request).await?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        let request = self
            .data_request(Method::GET, "profiles")
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))]);
        let rows: Vec<ProfileRow> = Self::read(request).await?;
        Ok(rows.into_iter().next().map(Profile::from))
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, BackendError> {
        let body = json!([{
            "id": profile.id,
            "name": profile.name,
            "email": profile.email,
            "role": profile.role.as_str(),
        }]);
        let request = Self::returning(self.data_request(Method::POST, "profiles")).json(&body);
        Ok(Self::single(Self::read::<Vec<ProfileRow>>(request).await?)?.into())
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, BackendError> {
        let request = Self::returning(self.data_request(Method::PATCH, "profiles"))
            .query(&[("id", format!("eq.{id}"))])
            .json(&json!({ "role": role.as_str(), "updated_at": Utc::now() }));
        Ok(Self::single(Self::read::<Vec<ProfileRow>>(request).await?)?.into())
    }

    async fn invite_operator(&self, email: &str, name: &str) -> Result<Profile, BackendError> {
        let key = self
            .service_key
            .as_deref()
            .ok_or_else(|| BackendError::Unauthorized("inviting users requires the service key".into()))?;
        let request = self
            .client
            .post(self.auth_url("invite"))
            .header(AUTHORIZATION, format!("Bearer {key}"))
            .json(&json!({ "email": email, "data": { "name": name } }));
        let user: AuthUser = Self::read(request).await?;

        let profile = Profile {
            id: user.id,
            name: Some(name.to_string()),
            email: user.email.or_else(|| Some(email.to_string())),
            role: Role::Operator,
            theme: Default::default(),
            created_at: Utc::now(),
        };
        self.insert_profile(&profile).await
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, BackendError> {
        let request = self
            .data_request(Method::GET, "custom_fields")
            .query(&[("select", "*"), ("order", "id.asc")]);
        let rows: Vec<CustomFieldRow> = Self::read(request).await?;
        Ok(decode_custom_fields(rows))
    }

    async fn insert_custom_field(&self, name: &str, kind: &FieldKind) -> Result<CustomField, BackendError> {
        let body = json!([{
            "name": name,
            "type": kind.tag(),
            "options": kind.options_json(),
            "is_active": true,
        }]);
        let request = Self::returning(self.data_request(Method::POST, "custom_fields")).json(&body);
        let row = Self::single(Self::read::<Vec<CustomFieldRow>>(request).await?)?;
        Ok(CustomField::try_from(row)?)
    }

    async fn delete_custom_field(&self, id: i64) -> Result<(), BackendError> {
        let request = Self::returning(self.data_request(Method::DELETE, "custom_fields"))
            .query(&[("id", format!("eq.{id}"))]);
        let deleted: Vec<CustomFieldRow> = Self::read(request).await?;
        if deleted.is_empty() {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }

    async fn custom_values_for(&self, order_ids: &[i64]) -> Result<Vec<CustomValueRow>, BackendError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = order_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(",");
        let request = self
            .data_request(Method::GET, "order_custom_values")
            .query(&[("select", "order_id,field_id,value".to_string()), ("order_id", format!("in.({ids})"))]);
        Self::read(request).await
    }
}

#[async_trait]
impl AuthProvider for RestBackend {
    async fn current_session(&self) -> Result<Option<Session>, BackendError> {
        match self.held_session() {
            Some(session) if session.is_expired(Utc::now()) => match self.refresh_session().await {
                Ok(fresh) => Ok(Some(fresh)),
                Err(e) => {
                    tracing::warn!(error = %e, "Session refresh failed; treating as signed out.");
                    self.store_session(None);
                    self.publish(AuthEvent::SignedOut);
                    Ok(None)
                }
            },
            other => Ok(other),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let request = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .json(&json!({ "email": email, "password": password }));
        let grant: TokenResponse = Self::read(request).await?;

        let session = grant.into_session(Utc::now());
        self.store_session(Some(session.clone()));
        self.publish(AuthEvent::SignedIn(session.clone()));
        tracing::info!(user_id = %session.user.id, "Signed in.");
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>, BackendError> {
        let request = self
            .client
            .post(self.auth_url("signup"))
            .json(&json!({ "email": email, "password": password }));
        match Self::read::<SignUpResponse>(request).await? {
            SignUpResponse::Session(grant) => {
                let session = grant.into_session(Utc::now());
                self.store_session(Some(session.clone()));
                self.publish(AuthEvent::SignedIn(session.clone()));
                Ok(Some(session))
            }
            SignUpResponse::PendingConfirmation(user) => {
                tracing::info!(user_id = %user.id, "Sign-up awaiting email confirmation.");
                Ok(None)
            }
        }
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        if let Some(session) = self.held_session() {
            let request = self
                .client
                .post(self.auth_url("logout"))
                .header(AUTHORIZATION, format!("Bearer {}", session.access_token));
            // The local session is dropped even if the platform call fails.
            let outcome = match request.send().await {
                Ok(response) => Self::checked(response).await.map(drop),
                Err(e) => Err(e.into()),
            };
            if let Err(e) = outcome {
                tracing::warn!(error = %e, "Remote sign-out failed.");
            }
        }
        self.store_session(None);
        self.publish(AuthEvent::SignedOut);
        Ok(())
    }

    async fn user_for_token(&self, token: &str) -> Result<AuthUser, BackendError> {
        let request = self
            .client
            .get(self.auth_url("user"))
            .header(AUTHORIZATION, format!("Bearer {token}"));
        Self::read(request).await
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
