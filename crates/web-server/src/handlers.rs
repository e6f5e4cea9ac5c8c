use crate::{auth::Authenticated, error::AppError, AppState};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use core_types::{CustomField, Metric, NewOrder, Order, Profile, ReportingPeriod};
use rust_decimal::Decimal;
use serde::Deserialize;
use service::{CustomFieldDraft, OrderListing, RankingView};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl PeriodQuery {
    /// Missing parts default to the current month.
    fn resolve(&self) -> Result<ReportingPeriod, AppError> {
        let current = ReportingPeriod::current();
        ReportingPeriod::new(
            self.year.unwrap_or(current.year()),
            self.month.unwrap_or(current.month()),
        )
        .map_err(|e| AppError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FieldsQuery {
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct WeightUpdate {
    pub weight: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct InviteRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// # GET /api/ranking?year=&month=
pub async fn get_ranking(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<PeriodQuery>,
) -> Result<Json<RankingView>, AppError> {
    let view = state.service.ranking(&caller, query.resolve()?).await?;
    Ok(Json(view))
}

/// # GET /api/orders?search=
pub async fn get_orders(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<OrderListing>>, AppError> {
    let orders = state.service.list_orders(&caller, query.search.as_deref()).await?;
    Ok(Json(orders))
}

/// # POST /api/orders
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Json(new_order): Json<NewOrder>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    let order = state.service.create_order(&caller, new_order).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// # DELETE /api/orders/:id
pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete_order(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # GET /api/metrics
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    Authenticated(_caller): Authenticated,
) -> Result<Json<Vec<Metric>>, AppError> {
    Ok(Json(state.service.metrics().await?))
}

/// # PUT /api/metrics/:id
pub async fn update_metric(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i64>,
    Json(update): Json<WeightUpdate>,
) -> Result<Json<Metric>, AppError> {
    let metric = state.service.update_metric_weight(&caller, id, update.weight).await?;
    Ok(Json(metric))
}

/// # GET /api/custom-fields?all=
pub async fn get_custom_fields(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<FieldsQuery>,
) -> Result<Json<Vec<CustomField>>, AppError> {
    Ok(Json(state.service.custom_fields(&caller, query.all).await?))
}

/// # POST /api/custom-fields
pub async fn create_custom_field(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Json(draft): Json<CustomFieldDraft>,
) -> Result<(StatusCode, Json<CustomField>), AppError> {
    let field = state.service.create_custom_field(&caller, draft).await?;
    Ok((StatusCode::CREATED, Json(field)))
}

/// # DELETE /api/custom-fields/:id
pub async fn delete_custom_field(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete_custom_field(&caller, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// # GET /api/users
pub async fn get_users(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
) -> Result<Json<Vec<Profile>>, AppError> {
    Ok(Json(state.service.users(&caller).await?))
}

/// # POST /api/users
pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Json(request): Json<InviteRequest>,
) -> Result<(StatusCode, Json<Profile>), AppError> {
    let profile = state
        .service
        .invite_operator(&caller, &request.email, request.name.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// # POST /api/users/:id/promote
pub async fn promote_user(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.service.promote(&caller, id).await?))
}

/// # POST /api/users/:id/demote
pub async fn demote_user(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Path(id): Path<Uuid>,
) -> Result<Json<Profile>, AppError> {
    Ok(Json(state.service.demote(&caller, id).await?))
}

/// # GET /api/export?year=&month=
/// Streams the period's orders as a CSV attachment.
pub async fn export_orders(
    State(state): State<Arc<AppState>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<PeriodQuery>,
) -> Result<impl IntoResponse, AppError> {
    let export = state.service.export_orders(&caller, query.resolve()?).await?;
    let disposition = format!("attachment; filename=\"{}\"", export.file_name);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.content,
    ))
}
