//! Postgres persistence tests for quoting-service.
//!
//! These tests need PostgreSQL. Set TEST_DATABASE_URL to run them; they are
//! skipped otherwise.

mod common;

use common::{dec, init_tracing, text};
use quoting_service::derivation::{derive, LastEdited, Pass, QuoteLineFields, RuleSet};
use quoting_service::models::NewQuoteLine;
use quoting_service::services::Database;
use rust_decimal::Decimal;
use serial_test::serial;
use service_core::error::AppError;
use uuid::Uuid;

async fn test_db() -> Option<Database> {
    let Ok(database_url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("Skipping test: TEST_DATABASE_URL is not set");
        return None;
    };
    init_tracing();

    let db = Database::new(&database_url, 2, 1)
        .await
        .expect("Failed to connect to test database");
    db.run_migrations()
        .await
        .expect("Failed to run migrations");
    Some(db)
}

async fn insert_product(db: &Database, tenant_id: Uuid, name: &str, unit_price: &str) -> Uuid {
    let product_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO products (product_id, tenant_id, name, unit_price, currency, vat_percent)
        VALUES ($1, $2, $3, $4, 'EUR', $5)
        "#,
    )
    .bind(product_id)
    .bind(tenant_id)
    .bind(name)
    .bind(dec(unit_price))
    .bind(Some(dec("20")))
    .execute(db.pool())
    .await
    .expect("Failed to insert product");
    product_id
}

fn derived_line(product_id: Uuid, name: &str, price: &str, sort_order: i32) -> NewQuoteLine {
    let fields = QuoteLineFields {
        product_id: Some(product_id),
        product_name: name.to_string(),
        currency: Some("EUR".to_string()),
        product_unit_price: Some(dec(price)),
        quoted_quantity: Some(dec("3")),
        unit_price_discount_percent: Some(dec("10")),
        vat_percent: Some(dec("20")),
        ..Default::default()
    };
    NewQuoteLine {
        quote_line_id: Uuid::new_v4(),
        fields: derive(&fields, Pass::Edit(LastEdited::default()), RuleSet::Full).fields,
        sort_order,
    }
}

#[tokio::test]
#[serial]
async fn derived_line_round_trips_with_fixed_point_values() {
    let Some(db) = test_db().await else {
        return;
    };
    let tenant_id = Uuid::new_v4();
    let quote_id = Uuid::new_v4();
    let product_id = insert_product(&db, tenant_id, "Support plan", "200").await;
    let line = derived_line(product_id, "Support plan", "200", 0);

    db.replace_quote_lines(tenant_id, quote_id, std::slice::from_ref(&line))
        .await
        .expect("Failed to save quote lines");

    let stored = db
        .list_quote_lines(tenant_id, quote_id)
        .await
        .expect("Failed to list quote lines");

    assert_eq!(stored.len(), 1);
    let fields = &stored[0].fields;
    assert_eq!(stored[0].quote_line_id, line.quote_line_id);
    assert_eq!(fields.product_name, "Support plan");
    assert_eq!(text(fields.quote_unit_price), "200.000");
    assert_eq!(text(fields.unit_price_discount_amount), "20.000");
    assert_eq!(text(fields.final_unit_price), "180.000");
    assert_eq!(text(fields.subtotal_before_row_discounts), "540.000");
    assert_eq!(text(fields.vat_on_subtotal), "108.000");
    assert_eq!(text(fields.gross_subtotal), "648.000");
    assert_eq!(fields.product_unit_price_override, None);
    assert_eq!(fields, &line.fields);
}

#[tokio::test]
#[serial]
async fn replace_keeps_sort_order_and_drops_missing_lines() {
    let Some(db) = test_db().await else {
        return;
    };
    let tenant_id = Uuid::new_v4();
    let quote_id = Uuid::new_v4();
    let product_id = insert_product(&db, tenant_id, "Widget", "10").await;

    let first = vec![
        derived_line(product_id, "A", "10", 0),
        derived_line(product_id, "B", "10", 1),
        derived_line(product_id, "C", "10", 2),
    ];
    db.replace_quote_lines(tenant_id, quote_id, &first)
        .await
        .unwrap();

    let mut second = vec![first[2].clone(), first[0].clone()];
    second[0].sort_order = 0;
    second[1].sort_order = 1;
    db.replace_quote_lines(tenant_id, quote_id, &second)
        .await
        .unwrap();

    let stored = db.list_quote_lines(tenant_id, quote_id).await.unwrap();
    let names: Vec<&str> = stored
        .iter()
        .map(|line| line.fields.product_name.as_str())
        .collect();
    assert_eq!(names, vec!["C", "A"]);
}

#[tokio::test]
#[serial]
async fn failed_insert_mid_batch_keeps_previous_lines() {
    let Some(db) = test_db().await else {
        return;
    };
    let tenant_id = Uuid::new_v4();
    let quote_id = Uuid::new_v4();
    let product_id = insert_product(&db, tenant_id, "Widget", "10").await;
    let original = derived_line(product_id, "Original", "10", 0);
    db.replace_quote_lines(tenant_id, quote_id, std::slice::from_ref(&original))
        .await
        .unwrap();

    let batch = vec![
        derived_line(product_id, "Replacement", "10", 0),
        derived_line(Uuid::new_v4(), "Unknown product", "10", 1),
    ];
    let err = db
        .replace_quote_lines(tenant_id, quote_id, &batch)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)), "got {err:?}");
    let stored = db.list_quote_lines(tenant_id, quote_id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].quote_line_id, original.quote_line_id);
    assert_eq!(stored[0].fields.product_name, "Original");
}

#[tokio::test]
#[serial]
async fn line_id_owned_by_another_quote_is_conflict() {
    let Some(db) = test_db().await else {
        return;
    };
    let tenant_id = Uuid::new_v4();
    let product_id = insert_product(&db, tenant_id, "Widget", "10").await;
    let line = derived_line(product_id, "Shared id", "10", 0);
    let owner_quote = Uuid::new_v4();
    db.replace_quote_lines(tenant_id, owner_quote, std::slice::from_ref(&line))
        .await
        .unwrap();

    let err = db
        .replace_quote_lines(tenant_id, Uuid::new_v4(), std::slice::from_ref(&line))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
    assert_eq!(
        db.list_quote_lines(tenant_id, owner_quote).await.unwrap().len(),
        1
    );
}

#[tokio::test]
#[serial]
async fn queries_are_tenant_scoped() {
    let Some(db) = test_db().await else {
        return;
    };
    let tenant_id = Uuid::new_v4();
    let other_tenant = Uuid::new_v4();
    let quote_id = Uuid::new_v4();
    let product_id = insert_product(&db, tenant_id, "Widget", "10").await;
    let line = derived_line(product_id, "Mine", "10", 0);
    db.replace_quote_lines(tenant_id, quote_id, std::slice::from_ref(&line))
        .await
        .unwrap();

    assert!(db
        .list_quote_lines(other_tenant, quote_id)
        .await
        .unwrap()
        .is_empty());
    assert!(db
        .get_product(other_tenant, product_id)
        .await
        .unwrap()
        .is_none());

    let product = db.get_product(tenant_id, product_id).await.unwrap().unwrap();
    assert_eq!(product.unit_price, Decimal::from(10));

    // Another tenant's batch replace must not wipe these lines.
    db.replace_quote_lines(other_tenant, quote_id, &[])
        .await
        .unwrap();
    assert!(!db
        .delete_quote_line(other_tenant, quote_id, line.quote_line_id)
        .await
        .unwrap());
    assert_eq!(db.list_quote_lines(tenant_id, quote_id).await.unwrap().len(), 1);

    assert!(db
        .delete_quote_line(tenant_id, quote_id, line.quote_line_id)
        .await
        .unwrap());
    assert!(db
        .list_quote_lines(tenant_id, quote_id)
        .await
        .unwrap()
        .is_empty());
}
