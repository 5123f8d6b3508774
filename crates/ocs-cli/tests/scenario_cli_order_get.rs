use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

/// `ocs order get` reads straight from the store.
///
/// This test is DB-backed and is skipped if OCS_DATABASE_URL is not set.
#[tokio::test]
async fn order_get_prints_stored_order_and_fails_on_missing() -> anyhow::Result<()> {
    if std::env::var(ocs_db::ENV_DB_URL).is_err() {
        eprintln!("SKIP: OCS_DATABASE_URL not set");
        return Ok(());
    }

    let pool = ocs_db::connect_from_env().await?;
    ocs_db::migrate(&pool).await?;
    let store = ocs_db::PgOrderStore::new(pool);

    let mut order =
        ocs_testkit::load_order_json(concat!(env!("CARGO_MANIFEST_DIR"), "/../../fixtures/model.json"))?;
    order.order_uid = format!("cli-{}", uuid::Uuid::new_v4());
    ocs_db::OrderStore::upsert(&store, &order).await?;

    Command::cargo_bin("ocs")?
        .args(["order", "get", "--order-uid", &order.order_uid])
        .assert()
        .success()
        .stdout(predicate::str::contains(order.order_uid.as_str()))
        .stdout(predicate::str::contains("WBILMTESTTRACK"));

    Command::cargo_bin("ocs")?
        .args(["order", "get", "--order-uid", "cli-definitely-missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("order not found"));

    Command::cargo_bin("ocs")?
        .args(["db", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("has_orders_table=true"));

    Ok(())
}
