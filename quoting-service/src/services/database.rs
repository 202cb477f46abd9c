//! Database service for quoting-service.

use crate::models::{NewQuoteLine, Product, QuoteLine};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::store::QuoteLineStore;
use async_trait::async_trait;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "quoting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Product Operations
    // -------------------------------------------------------------------------

    /// Get an active product by ID.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id))]
    pub async fn get_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_product"])
            .start_timer();

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT product_id, tenant_id, name, unit_price, currency, vat_percent, active, created_utc
            FROM products
            WHERE tenant_id = $1 AND product_id = $2 AND active = TRUE
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get product: {}", e)))?;

        timer.observe_duration();

        Ok(product)
    }

    // -------------------------------------------------------------------------
    // Quote Line Operations
    // -------------------------------------------------------------------------

    /// Get the lines of a quote.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, quote_id = %quote_id))]
    pub async fn list_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_quote_lines"])
            .start_timer();

        let lines = sqlx::query_as::<_, QuoteLine>(
            r#"
            SELECT quote_line_id, quote_id, tenant_id, product_id, product_name, currency,
                product_unit_price, product_unit_price_override, quote_unit_price,
                unit_price_discount_percent, unit_price_discount_amount, final_unit_price,
                quoted_quantity, subtotal_before_row_discounts,
                discount_percent_on_subtotal, discount_amount_on_subtotal, final_subtotal,
                vat_percent, vat_unit_amount, vat_on_subtotal, gross_subtotal,
                sort_order, created_utc
            FROM quote_lines
            WHERE tenant_id = $1 AND quote_id = $2
            ORDER BY sort_order, created_utc
            "#,
        )
        .bind(tenant_id)
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list quote lines: {}", e)))?;

        timer.observe_duration();

        Ok(lines)
    }

    /// Replace all lines of a quote in a single transaction.
    #[instrument(skip(self, lines), fields(tenant_id = %tenant_id, quote_id = %quote_id, line_count = lines.len()))]
    pub async fn replace_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        lines: &[NewQuoteLine],
    ) -> Result<Vec<QuoteLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["replace_quote_lines"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let removed = sqlx::query("DELETE FROM quote_lines WHERE tenant_id = $1 AND quote_id = $2")
            .bind(tenant_id)
            .bind(quote_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to clear quote lines: {}", e))
            })?
            .rows_affected();

        let mut saved = Vec::with_capacity(lines.len());
        for line in lines {
            let f = &line.fields;
            let row = sqlx::query_as::<_, QuoteLine>(
                r#"
                INSERT INTO quote_lines (
                    quote_line_id, quote_id, tenant_id, product_id, product_name, currency,
                    product_unit_price, product_unit_price_override, quote_unit_price,
                    unit_price_discount_percent, unit_price_discount_amount, final_unit_price,
                    quoted_quantity, subtotal_before_row_discounts,
                    discount_percent_on_subtotal, discount_amount_on_subtotal, final_subtotal,
                    vat_percent, vat_unit_amount, vat_on_subtotal, gross_subtotal, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22)
                RETURNING quote_line_id, quote_id, tenant_id, product_id, product_name, currency,
                    product_unit_price, product_unit_price_override, quote_unit_price,
                    unit_price_discount_percent, unit_price_discount_amount, final_unit_price,
                    quoted_quantity, subtotal_before_row_discounts,
                    discount_percent_on_subtotal, discount_amount_on_subtotal, final_subtotal,
                    vat_percent, vat_unit_amount, vat_on_subtotal, gross_subtotal,
                    sort_order, created_utc
                "#,
            )
            .bind(line.quote_line_id)
            .bind(quote_id)
            .bind(tenant_id)
            .bind(f.product_id)
            .bind(&f.product_name)
            .bind(&f.currency)
            .bind(f.product_unit_price)
            .bind(f.product_unit_price_override)
            .bind(f.quote_unit_price)
            .bind(f.unit_price_discount_percent)
            .bind(f.unit_price_discount_amount)
            .bind(f.final_unit_price)
            .bind(f.quoted_quantity)
            .bind(f.subtotal_before_row_discounts)
            .bind(f.discount_percent_on_subtotal)
            .bind(f.discount_amount_on_subtotal)
            .bind(f.final_subtotal)
            .bind(f.vat_percent)
            .bind(f.vat_unit_amount)
            .bind(f.vat_on_subtotal)
            .bind(f.gross_subtotal)
            .bind(line.sort_order)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                    AppError::BadRequest(anyhow::anyhow!(
                        "Quote line {} references an unknown product",
                        line.quote_line_id
                    ))
                }
                sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                    AppError::Conflict(anyhow::anyhow!(
                        "Quote line {} belongs to another quote",
                        line.quote_line_id
                    ))
                }
                _ => AppError::DatabaseError(anyhow::anyhow!("Failed to save quote line: {}", e)),
            })?;
            saved.push(row);
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit quote lines: {}", e))
        })?;

        timer.observe_duration();

        info!(
            removed = removed,
            saved = saved.len(),
            "Quote lines replaced"
        );

        Ok(saved)
    }

    /// Delete a single persisted quote line.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, quote_id = %quote_id, quote_line_id = %quote_line_id))]
    pub async fn delete_quote_line(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        quote_line_id: Uuid,
    ) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_quote_line"])
            .start_timer();

        let result = sqlx::query(
            "DELETE FROM quote_lines WHERE tenant_id = $1 AND quote_id = $2 AND quote_line_id = $3",
        )
        .bind(tenant_id)
        .bind(quote_id)
        .bind(quote_line_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete quote line: {}", e)))?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!("Quote line deleted");
        }

        Ok(deleted)
    }
}

#[async_trait]
impl QuoteLineStore for Database {
    async fn get_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        Database::get_product(self, tenant_id, product_id).await
    }

    async fn list_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteLine>, AppError> {
        Database::list_quote_lines(self, tenant_id, quote_id).await
    }

    async fn replace_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        lines: &[NewQuoteLine],
    ) -> Result<Vec<QuoteLine>, AppError> {
        Database::replace_quote_lines(self, tenant_id, quote_id, lines).await
    }

    async fn delete_quote_line(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        quote_line_id: Uuid,
    ) -> Result<bool, AppError> {
        Database::delete_quote_line(self, tenant_id, quote_id, quote_line_id).await
    }
}
