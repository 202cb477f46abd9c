//! Services module for quoting-service.

pub mod database;
pub mod editor;
pub mod metrics;
pub mod store;

pub use database::Database;
pub use editor::{EditorLine, QuoteEditor, QuoteTotals};
pub use metrics::{get_metrics, init_metrics};
pub use store::QuoteLineStore;
