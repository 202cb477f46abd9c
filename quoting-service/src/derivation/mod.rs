//! Quote line derivation engine.

mod engine;
mod fields;
pub mod numeric;

pub use engine::{derive, Derivation, LastEdited, PairSide, Pass, RuleSet};
pub use fields::{Field, QuoteLineFields};
