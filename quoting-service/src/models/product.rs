//! Product model for quoting-service.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog product used to seed a quote line.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub product_id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub unit_price: Decimal,
    pub currency: String,
    pub vat_percent: Option<Decimal>,
    pub active: bool,
    pub created_utc: DateTime<Utc>,
}
