use crate::models::{NewQuoteLine, Product, QuoteLine};
use async_trait::async_trait;
use service_core::error::AppError;
use uuid::Uuid;

/// Product lookup and quote line persistence used by [`QuoteEditor`].
///
/// [`QuoteEditor`]: super::QuoteEditor
#[async_trait]
pub trait QuoteLineStore: Send + Sync {
    async fn get_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError>;

    async fn list_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteLine>, AppError>;

    /// Overwrite every line of the quote with `lines`. All or nothing.
    async fn replace_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        lines: &[NewQuoteLine],
    ) -> Result<Vec<QuoteLine>, AppError>;

    /// Returns `false` when no such line was persisted.
    async fn delete_quote_line(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        quote_line_id: Uuid,
    ) -> Result<bool, AppError>;
}
