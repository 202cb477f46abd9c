//! Common test utilities for quoting-service integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use quoting_service::derivation::QuoteLineFields;
use quoting_service::models::{NewQuoteLine, Product, QuoteLine};
use quoting_service::services::QuoteLineStore;
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, Once};
use uuid::Uuid;

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,quoting_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).expect("valid decimal literal")
}

/// Render an optional value the way it is stored: fixed-point text or empty.
pub fn text(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// In-memory store standing in for Postgres.
#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<Uuid, Product>>,
    lines: Mutex<HashMap<Uuid, Vec<QuoteLine>>>,
    fail_saves: AtomicBool,
    pub save_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(
        &self,
        tenant_id: Uuid,
        name: &str,
        unit_price: &str,
        vat_percent: Option<&str>,
    ) -> Uuid {
        let product = Product {
            product_id: Uuid::new_v4(),
            tenant_id,
            name: name.to_string(),
            unit_price: dec(unit_price),
            currency: "EUR".to_string(),
            vat_percent: vat_percent.map(dec),
            active: true,
            created_utc: Utc::now(),
        };
        let product_id = product.product_id;
        self.products.lock().unwrap().insert(product_id, product);
        product_id
    }

    /// Seed a persisted line as if an earlier session had saved it.
    pub fn seed_line(&self, tenant_id: Uuid, quote_id: Uuid, fields: QuoteLineFields) -> Uuid {
        let mut lines = self.lines.lock().unwrap();
        let entry = lines.entry(quote_id).or_default();
        let line = QuoteLine {
            quote_line_id: Uuid::new_v4(),
            quote_id,
            tenant_id,
            fields,
            sort_order: entry.len() as i32,
            created_utc: Utc::now(),
        };
        let quote_line_id = line.quote_line_id;
        entry.push(line);
        quote_line_id
    }

    pub fn stored(&self, quote_id: Uuid) -> Vec<QuoteLine> {
        self.lines
            .lock()
            .unwrap()
            .get(&quote_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuoteLineStore for MemoryStore {
    async fn get_product(
        &self,
        tenant_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<Product>, AppError> {
        Ok(self
            .products
            .lock()
            .unwrap()
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id && p.active)
            .cloned())
    }

    async fn list_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
    ) -> Result<Vec<QuoteLine>, AppError> {
        Ok(self
            .stored(quote_id)
            .into_iter()
            .filter(|line| line.tenant_id == tenant_id)
            .collect())
    }

    async fn replace_quote_lines(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        lines: &[NewQuoteLine],
    ) -> Result<Vec<QuoteLine>, AppError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(anyhow::anyhow!(
                "connection reset by peer"
            )));
        }

        let saved: Vec<QuoteLine> = lines
            .iter()
            .map(|line| QuoteLine {
                quote_line_id: line.quote_line_id,
                quote_id,
                tenant_id,
                fields: line.fields.clone(),
                sort_order: line.sort_order,
                created_utc: Utc::now(),
            })
            .collect();
        self.lines.lock().unwrap().insert(quote_id, saved.clone());
        Ok(saved)
    }

    async fn delete_quote_line(
        &self,
        tenant_id: Uuid,
        quote_id: Uuid,
        quote_line_id: Uuid,
    ) -> Result<bool, AppError> {
        let mut lines = self.lines.lock().unwrap();
        let Some(entry) = lines.get_mut(&quote_id) else {
            return Ok(false);
        };
        let before = entry.len();
        entry.retain(|line| !(line.quote_line_id == quote_line_id && line.tenant_id == tenant_id));
        Ok(entry.len() < before)
    }
}
