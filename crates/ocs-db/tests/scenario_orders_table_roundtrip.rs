//! DB-backed scenarios for `PgOrderStore`.
//!
//! Skipped when OCS_DATABASE_URL is not set. Each test uses fresh
//! identifiers so the suite can share one database.

use ocs_db::{OrderStore, PgOrderStore, StoreError};
use ocs_testkit::sample_order;
use uuid::Uuid;

async fn store_or_skip() -> anyhow::Result<Option<PgOrderStore>> {
    let url = match std::env::var(ocs_db::ENV_DB_URL) {
        Ok(v) => v,
        Err(_) => {
            eprintln!("SKIP: OCS_DATABASE_URL not set");
            return Ok(None);
        }
    };

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .connect(&url)
        .await?;
    ocs_db::migrate(&pool).await?;
    Ok(Some(PgOrderStore::new(pool)))
}

fn fresh_uid(tag: &str) -> String {
    format!("{tag}_{}", Uuid::new_v4().simple())
}

#[tokio::test]
async fn insert_then_get_by_id_returns_identical_order() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let order = sample_order(&fresh_uid("RT"));
    store.insert(&order).await?;

    let back = store.get_by_id(&order.order_uid).await?;
    assert_eq!(back, order);
    Ok(())
}

#[tokio::test]
async fn second_insert_with_same_uid_is_rejected_and_leaves_one_row() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let order = sample_order(&fresh_uid("DUP"));
    store.insert(&order).await?;

    let err = store.insert(&order).await.unwrap_err();
    match err {
        StoreError::Write { order_uid, reason } => {
            assert_eq!(order_uid, order.order_uid);
            assert!(reason.contains("duplicate"), "unexpected reason: {reason}");
        }
        other => panic!("expected Write, got {other:?}"),
    }

    let matching = store
        .get_all()
        .await?
        .into_iter()
        .filter(|o| o.order_uid == order.order_uid)
        .count();
    assert_eq!(matching, 1);
    Ok(())
}

#[tokio::test]
async fn upsert_overwrites_payload_in_place() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let mut order = sample_order(&fresh_uid("UPS"));
    store.upsert(&order).await?;
    order.track_number = "REPLACED".to_string();
    store.upsert(&order).await?;

    let back = store.get_by_id(&order.order_uid).await?;
    assert_eq!(back.track_number, "REPLACED");

    let (n,): (i64,) = sqlx::query_as("select count(*)::bigint from orders where order_uid = $1")
        .bind(&order.order_uid)
        .fetch_one(store.pool())
        .await?;
    assert_eq!(n, 1);
    Ok(())
}

#[tokio::test]
async fn column_identifier_overrides_payload_identifier() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let column_uid = fresh_uid("COL");
    let payload = serde_json::to_value(sample_order("payload-uid-differs"))?;
    sqlx::query("insert into orders (order_uid, order_json) values ($1, $2)")
        .bind(&column_uid)
        .bind(&payload)
        .execute(store.pool())
        .await?;

    let by_id = store.get_by_id(&column_uid).await?;
    assert_eq!(by_id.order_uid, column_uid);

    let in_all = store.get_all().await?;
    assert!(in_all.iter().any(|o| o.order_uid == column_uid));
    assert!(!in_all.iter().any(|o| o.order_uid == "payload-uid-differs"));
    Ok(())
}

#[tokio::test]
async fn missing_uid_is_not_found() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    let err = store.get_by_id(&fresh_uid("MISSING")).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn migrate_is_idempotent() -> anyhow::Result<()> {
    let Some(store) = store_or_skip().await? else {
        return Ok(());
    };

    ocs_db::migrate(store.pool()).await?;
    let st = ocs_db::status(store.pool()).await?;
    assert!(st.ok);
    assert!(st.has_orders_table);
    Ok(())
}
