//! Quote line model for quoting-service.

use crate::derivation::QuoteLineFields;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted line of a quote.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuoteLine {
    pub quote_line_id: Uuid,
    pub quote_id: Uuid,
    pub tenant_id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: QuoteLineFields,
    pub sort_order: i32,
    pub created_utc: DateTime<Utc>,
}

/// Input for one line of a batch save.
#[derive(Debug, Clone)]
pub struct NewQuoteLine {
    pub quote_line_id: Uuid,
    pub fields: QuoteLineFields,
    pub sort_order: i32,
}
