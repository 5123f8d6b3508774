//! Postgres-backed [`OrderStore`].
//!
//! Table `orders(order_uid text primary key, order_json jsonb)`; see
//! `migrations/0001_orders.sql`. Queries use `sqlx::query()` + binds, no
//! compile-time checked macros, so builds do not need a live database.

use async_trait::async_trait;
use ocs_schemas::OrderRecord;
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::store::{decode_stored, encode_stored, OrderStore, StoreError};

const PK_CONSTRAINT: &str = "orders_pkey";

#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        let payload = encode_stored(order)?;

        sqlx::query(
            r#"
            insert into orders (order_uid, order_json)
            values ($1, $2)
            "#,
        )
        .bind(&order.order_uid)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(&order.order_uid, e))?;

        debug!(order_uid = %order.order_uid, "order inserted");
        Ok(())
    }

    async fn upsert(&self, order: &OrderRecord) -> Result<(), StoreError> {
        let payload = encode_stored(order)?;

        let res = sqlx::query(
            r#"
            insert into orders (order_uid, order_json)
            values ($1, $2)
            on conflict (order_uid) do update
              set order_json = excluded.order_json,
                  stored_at_utc = now()
            "#,
        )
        .bind(&order.order_uid)
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(|e| write_error(&order.order_uid, e))?;

        debug!(order_uid = %order.order_uid, rows = res.rows_affected(), "order upserted");
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<OrderRecord>, StoreError> {
        let rows = sqlx::query("select order_uid, order_json from orders")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Read(format!("select all orders: {e}")))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let (order_uid, payload) = split_row(&row)?;
            out.push(decode_stored(order_uid, payload)?);
        }
        Ok(out)
    }

    async fn get_by_id(&self, order_uid: &str) -> Result<OrderRecord, StoreError> {
        let row = sqlx::query(
            r#"
            select order_uid, order_json
            from orders
            where order_uid = $1
            "#,
        )
        .bind(order_uid)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Read(format!("select order {order_uid}: {e}")))?;

        let Some(row) = row else {
            return Err(StoreError::NotFound(order_uid.to_string()));
        };
        let (stored_uid, payload) = split_row(&row)?;
        decode_stored(stored_uid, payload)
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as::<_, (i64,)>("select count(*)::bigint from orders")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Read(format!("count orders: {e}")))?;
        Ok(n)
    }
}

fn split_row(row: &sqlx::postgres::PgRow) -> Result<(String, Value), StoreError> {
    let order_uid: String = row
        .try_get("order_uid")
        .map_err(|e| StoreError::Read(format!("order_uid column: {e}")))?;
    let payload: Value = row
        .try_get("order_json")
        .map_err(|e| StoreError::Read(format!("order_json column for {order_uid}: {e}")))?;
    Ok((order_uid, payload))
}

fn write_error(order_uid: &str, err: sqlx::Error) -> StoreError {
    let reason = if is_unique_constraint_violation(&err, PK_CONSTRAINT) {
        format!("duplicate order_uid ({PK_CONSTRAINT})")
    } else {
        err.to_string()
    };
    StoreError::Write {
        order_uid: order_uid.to_string(),
        reason,
    }
}

/// Detect a Postgres unique constraint violation by name.
fn is_unique_constraint_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.constraint() == Some(constraint)
                || (db_err.code().as_deref() == Some("23505") && db_err.constraint().is_none())
        }
        _ => false,
    }
}
