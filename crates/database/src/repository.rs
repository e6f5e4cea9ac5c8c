use crate::DbError;
use async_trait::async_trait;
use backend_client::{Backend, BackendError, CustomValueRow, OrderDraft};
use chrono::{DateTime, Utc};
use core_types::{
    CustomField, FieldKind, Metric, MetricName, Order, OrderScope, Profile, ReportingPeriod, Role, Theme,
};
use rust_decimal::Decimal;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgPool, Postgres};
use sqlx::{FromRow, QueryBuilder};
use std::str::FromStr;
use uuid::Uuid;

/// The `DbRepository` talks to the platform schema directly over a pooled connection.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
}

#[derive(Debug, Clone, FromRow)]
struct DbOrder {
    id: i64,
    user_id: Uuid,
    client_code: String,
    product: String,
    volume: Decimal,
    revenue: Decimal,
    created_at: DateTime<Utc>,
}

impl From<DbOrder> for Order {
    fn from(row: DbOrder) -> Self {
        Order {
            id: row.id,
            operator_id: row.user_id,
            client_code: row.client_code,
            product: row.product,
            volume: row.volume,
            revenue: row.revenue,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbMetric {
    id: i64,
    name: String,
    weight: Decimal,
}

impl DbMetric {
    fn into_metric(self) -> Option<Metric> {
        match MetricName::from_str(&self.name) {
            Ok(name) => Some(Metric { id: self.id, name, weight: self.weight }),
            Err(e) => {
                tracing::warn!(metric_id = self.id, error = %e, "Skipping unknown metric.");
                None
            }
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbProfile {
    id: Uuid,
    name: Option<String>,
    email: Option<String>,
    role: String,
    theme_preference: String,
    created_at: DateTime<Utc>,
}

impl From<DbProfile> for Profile {
    fn from(row: DbProfile) -> Self {
        let role = Role::from_str(&row.role).unwrap_or_else(|e| {
            tracing::warn!(profile_id = %row.id, error = %e, "Unknown role, treating as operator.");
            Role::Operator
        });
        Profile {
            id: row.id,
            name: row.name,
            email: row.email,
            role,
            theme: Theme::from_str(&row.theme_preference).unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct DbCustomField {
    id: i64,
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    options: Option<JsonValue>,
    is_active: bool,
}

impl DbCustomField {
    fn into_field(self) -> Option<CustomField> {
        match FieldKind::decode(&self.kind, self.options.as_ref()) {
            Ok(kind) => Some(CustomField { id: self.id, name: self.name, kind, is_active: self.is_active }),
            Err(e) => {
                tracing::warn!(field_id = self.id, error = %e, "Skipping undecodable custom field.");
                None
            }
        }
    }
}

const ORDER_COLUMNS: &str = "id, user_id, client_code, product, volume, revenue, created_at";
const PROFILE_COLUMNS: &str = "id, name, email, role, theme_preference, created_at";

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn orders(&self, scope: OrderScope, period: Option<ReportingPeriod>) -> Result<Vec<Order>, DbError> {
        let mut query: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE TRUE"));
        if let OrderScope::Mine(owner) = scope {
            query.push(" AND user_id = ").push_bind(owner);
        }
        if let Some(period) = period {
            let (start, end) = period.bounds();
            query.push(" AND created_at >= ").push_bind(start);
            query.push(" AND created_at < ").push_bind(end);
        }
        query.push(" ORDER BY created_at DESC, id DESC");

        let rows = query.build_query_as::<DbOrder>().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Order::from).collect())
    }

    async fn store_order(&self, owner: Uuid, draft: &OrderDraft) -> Result<Order, DbError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, DbOrder>(&format!(
            "INSERT INTO orders (user_id, client_code, product, volume, revenue) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {ORDER_COLUMNS}"
        ))
        .bind(owner)
        .bind(&draft.client_code)
        .bind(&draft.product)
        .bind(draft.volume)
        .bind(draft.revenue)
        .fetch_one(&mut *tx)
        .await?;

        for (field_id, value) in &draft.custom_values {
            sqlx::query("INSERT INTO order_custom_values (order_id, field_id, value) VALUES ($1, $2, $3)")
                .bind(row.id)
                .bind(field_id)
                .bind(value.to_string())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(row.into())
    }

    async fn profile(&self, id: Uuid) -> Result<Option<Profile>, DbError> {
        let row = sqlx::query_as::<_, DbProfile>(&format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Profile::from))
    }

    async fn save_profile(&self, profile: &Profile) -> Result<Profile, DbError> {
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "INSERT INTO profiles (id, name, email, role, theme_preference, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(profile.id)
        .bind(&profile.name)
        .bind(&profile.email)
        .bind(profile.role.as_str())
        .bind(profile.theme.as_str())
        .bind(profile.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Moves a profile created by `invite_operator` onto the id of the login that now
    /// owns its email. The invited name and role are kept; orders follow the id.
    async fn adopt_profile(&self, id: Uuid, email: &str) -> Result<Option<Profile>, DbError> {
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "UPDATE profiles SET id = $1, updated_at = NOW() \
             WHERE lower(email) = lower($2) AND id <> $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Profile::from))
    }

    /// Deletes by id and fails with `NotFound` when nothing matched.
    async fn delete_by_id(&self, table: &'static str, id: i64) -> Result<(), DbError> {
        let result = sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl Backend for DbRepository {
    async fn list_orders(
        &self,
        scope: OrderScope,
        period: Option<ReportingPeriod>,
    ) -> Result<Vec<Order>, BackendError> {
        Ok(self.orders(scope, period).await?)
    }

    async fn get_order(&self, id: i64) -> Result<Option<Order>, BackendError> {
        let row = sqlx::query_as::<_, DbOrder>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(row.map(Order::from))
    }

    async fn insert_order(&self, owner: Uuid, draft: &OrderDraft) -> Result<Order, BackendError> {
        let order = self.store_order(owner, draft).await?;
        tracing::info!(order_id = order.id, operator_id = %owner, "Order stored.");
        Ok(order)
    }

    async fn delete_order(&self, id: i64) -> Result<(), BackendError> {
        Ok(self.delete_by_id("orders", id).await?)
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, BackendError> {
        let rows = sqlx::query_as::<_, DbMetric>("SELECT id, name, weight FROM ranking_metrics ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;
        Ok(rows.into_iter().filter_map(DbMetric::into_metric).collect())
    }

    async fn update_metric_weight(&self, id: i64, weight: Decimal) -> Result<Metric, BackendError> {
        let row = sqlx::query_as::<_, DbMetric>(
            "UPDATE ranking_metrics SET weight = $1 WHERE id = $2 RETURNING id, name, weight",
        )
        .bind(weight)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?
        .ok_or(BackendError::NotFound)?;
        row.into_metric()
            .ok_or_else(|| BackendError::InvalidData(format!("metric {id} has an unknown name")))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        let rows = sqlx::query_as::<_, DbProfile>(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().map(Profile::from).collect())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, BackendError> {
        Ok(self.profile(id).await?)
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<Profile, BackendError> {
        if let Some(email) = profile.email.as_deref() {
            if let Some(invited) = self.adopt_profile(profile.id, email).await? {
                tracing::info!(profile_id = %invited.id, "Invited profile linked to its login.");
                return Ok(invited);
            }
        }
        Ok(self.save_profile(profile).await?)
    }

    async fn update_role(&self, id: Uuid, role: Role) -> Result<Profile, BackendError> {
        let row = sqlx::query_as::<_, DbProfile>(&format!(
            "UPDATE profiles SET role = $1, updated_at = NOW() WHERE id = $2 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(role.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::from)?
        .ok_or(BackendError::NotFound)?;
        Ok(row.into())
    }

    /// Without the platform's auth service only the profile can be created here. It gets
    /// a placeholder id and is adopted by the login that first signs in with the same
    /// email (see `insert_profile`).
    async fn invite_operator(&self, email: &str, name: &str) -> Result<Profile, BackendError> {
        let profile = Profile {
            id: Uuid::new_v4(),
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            role: Role::Operator,
            theme: Theme::default(),
            created_at: Utc::now(),
        };
        Ok(self.save_profile(&profile).await?)
    }

    async fn list_custom_fields(&self) -> Result<Vec<CustomField>, BackendError> {
        let rows = sqlx::query_as::<_, DbCustomField>(
            "SELECT id, name, type, options, is_active FROM custom_fields ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows.into_iter().filter_map(DbCustomField::into_field).collect())
    }

    async fn insert_custom_field(&self, name: &str, kind: &FieldKind) -> Result<CustomField, BackendError> {
        let row = sqlx::query_as::<_, DbCustomField>(
            "INSERT INTO custom_fields (name, type, options) VALUES ($1, $2, $3) \
             RETURNING id, name, type, options, is_active",
        )
        .bind(name)
        .bind(kind.tag())
        .bind(Some(kind.options_json()).filter(|options| !options.is_null()))
        .fetch_one(&self.pool)
        .await
        .map_err(DbError::from)?;
        row.into_field()
            .ok_or_else(|| BackendError::InvalidData(format!("custom field '{name}' could not be decoded")))
    }

    async fn delete_custom_field(&self, id: i64) -> Result<(), BackendError> {
        Ok(self.delete_by_id("custom_fields", id).await?)
    }

    async fn custom_values_for(&self, order_ids: &[i64]) -> Result<Vec<CustomValueRow>, BackendError> {
        if order_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(i64, i64, Option<String>)> = sqlx::query_as(
            "SELECT order_id, field_id, value FROM order_custom_values WHERE order_id = ANY($1)",
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|(order_id, field_id, value)| CustomValueRow { order_id, field_id, value })
            .collect())
    }
}
