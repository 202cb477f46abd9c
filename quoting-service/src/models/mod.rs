//! Domain models for quoting-service.

mod product;
mod quote_line;

pub use product::Product;
pub use quote_line::{NewQuoteLine, QuoteLine};
