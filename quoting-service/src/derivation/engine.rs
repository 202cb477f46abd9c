//! Dependency-ordered recalculation of a quote line's derived fields.
//!
//! [`derive`] is a pure function of the current field values, the pass kind
//! and the rule set. It never touches an input field except the
//! non-authoritative member of a discount pair and, on initial load, the
//! override of a line whose stored quote price has no source. It only writes
//! a value when it differs from the stored one by at least [`TOLERANCE`].
//!
//! [`TOLERANCE`]: super::numeric::TOLERANCE

use super::fields::{Field, QuoteLineFields};
use super::numeric::{
    add, mul, percent_from, percent_of, sub, to_fixed, value_of, within_tolerance,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Member of a percent/amount pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairSide {
    #[default]
    Percent,
    Amount,
}

/// Which member of each discount pair the user typed into last.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastEdited {
    pub unit_discount: PairSide,
    pub subtotal_discount: PairSide,
}

impl LastEdited {
    /// Record a user edit. Fields outside the discount pairs are ignored.
    pub fn record(&mut self, field: Field) {
        match field {
            Field::UnitPriceDiscountPercent => self.unit_discount = PairSide::Percent,
            Field::UnitPriceDiscountAmount => self.unit_discount = PairSide::Amount,
            Field::DiscountPercentOnSubtotal => self.subtotal_discount = PairSide::Percent,
            Field::DiscountAmountOnSubtotal => self.subtotal_discount = PairSide::Amount,
            _ => {}
        }
    }
}

/// Kind of recompute pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// One-time reconciliation of a persisted line. Pair sync is replaced by
    /// reconciliation, which also decides the discriminators.
    InitialLoad,
    /// Regular pass after a field change.
    Edit(LastEdited),
}

/// Rule set applied to a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSet {
    /// Unit price, unit discount, row discount and VAT.
    #[default]
    Full,
    /// Unit price and unit discount only; row discount and VAT fields are
    /// left as they are.
    Basic,
}

impl RuleSet {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleSet::Full => "full",
            RuleSet::Basic => "basic",
        }
    }

    /// Case-insensitive; `None` for anything but `full` or `basic`.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Some(RuleSet::Full),
            "basic" => Some(RuleSet::Basic),
            _ => None,
        }
    }
}

/// Result of a recompute pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub fields: QuoteLineFields,
    /// Fields written by this pass, in evaluation order.
    pub changed: Vec<Field>,
    /// Discriminators to use for the next pass on this line.
    pub last_edited: LastEdited,
}

impl Derivation {
    pub fn is_unchanged(&self) -> bool {
        self.changed.is_empty()
    }
}

#[derive(Clone, Copy)]
struct Pair {
    percent: Field,
    amount: Field,
}

const UNIT_DISCOUNT: Pair = Pair {
    percent: Field::UnitPriceDiscountPercent,
    amount: Field::UnitPriceDiscountAmount,
};

const SUBTOTAL_DISCOUNT: Pair = Pair {
    percent: Field::DiscountPercentOnSubtotal,
    amount: Field::DiscountAmountOnSubtotal,
};

struct Writer {
    fields: QuoteLineFields,
    changed: Vec<Field>,
}

impl Writer {
    fn value(&self, field: Field) -> Decimal {
        value_of(self.fields.get(field))
    }

    fn write(&mut self, field: Field, value: Decimal) {
        let value = to_fixed(value);
        if within_tolerance(self.fields.get(field), value) {
            return;
        }
        self.fields.set(field, Some(value));
        self.changed.push(field);
    }

    /// Recompute the member the user did not edit last.
    fn sync_pair(&mut self, pair: Pair, authoritative: PairSide, base: Decimal) {
        match authoritative {
            PairSide::Percent => {
                let amount = percent_of(base, self.value(pair.percent));
                self.write(pair.amount, amount);
            }
            PairSide::Amount => {
                let percent = percent_from(self.value(pair.amount), base);
                self.write(pair.percent, percent);
            }
        }
    }

    /// Back-fill the dependent member of a persisted pair and report the
    /// member that turned out to be authoritative. A stored non-zero amount
    /// wins; otherwise the amount follows the percentage.
    fn reconcile(&mut self, pair: Pair, base: Decimal) -> PairSide {
        let amount = self.value(pair.amount);

        if amount.is_zero() {
            let percent = self.value(pair.percent);
            self.write(pair.amount, percent_of(base, percent));
            PairSide::Percent
        } else {
            self.write(pair.percent, percent_from(amount, base));
            PairSide::Amount
        }
    }
}

/// Run one recompute pass over `line`.
pub fn derive(line: &QuoteLineFields, pass: Pass, rules: RuleSet) -> Derivation {
    let initial = pass == Pass::InitialLoad;
    let mut last_edited = match pass {
        Pass::Edit(last_edited) => last_edited,
        Pass::InitialLoad => LastEdited::default(),
    };
    let mut w = Writer {
        fields: line.clone(),
        changed: Vec::new(),
    };

    // Effective unit price. A persisted line whose non-zero quote price has
    // no source adopts it as the override, so later passes keep it.
    match line.product_unit_price_override.or(line.product_unit_price) {
        Some(price) => w.write(Field::QuoteUnitPrice, price),
        None => match line.quote_unit_price {
            Some(stored) if initial && !stored.is_zero() => {
                w.write(Field::ProductUnitPriceOverride, stored);
                w.write(Field::QuoteUnitPrice, stored);
            }
            _ => w.write(Field::QuoteUnitPrice, Decimal::ZERO),
        },
    }
    let quote_unit_price = w.value(Field::QuoteUnitPrice);

    // The unit pair settles before the final unit price reads its amount.
    if initial {
        last_edited.unit_discount = w.reconcile(UNIT_DISCOUNT, quote_unit_price);
    } else {
        w.sync_pair(UNIT_DISCOUNT, last_edited.unit_discount, quote_unit_price);
    }

    let final_unit_price = sub(quote_unit_price, w.value(Field::UnitPriceDiscountAmount));
    w.write(Field::FinalUnitPrice, final_unit_price);
    let final_unit_price = w.value(Field::FinalUnitPrice);

    let quantity = w.value(Field::QuotedQuantity);
    w.write(
        Field::SubtotalBeforeRowDiscounts,
        mul(quantity, final_unit_price),
    );

    if rules == RuleSet::Full {
        let subtotal = w.value(Field::SubtotalBeforeRowDiscounts);
        if initial {
            last_edited.subtotal_discount = w.reconcile(SUBTOTAL_DISCOUNT, subtotal);
        } else {
            w.sync_pair(SUBTOTAL_DISCOUNT, last_edited.subtotal_discount, subtotal);
        }

        let final_subtotal = sub(subtotal, w.value(Field::DiscountAmountOnSubtotal));
        w.write(Field::FinalSubtotal, final_subtotal);

        let vat_unit_amount = percent_of(final_unit_price, w.value(Field::VatPercent));
        w.write(Field::VatUnitAmount, vat_unit_amount);

        let vat_on_subtotal = mul(w.value(Field::VatUnitAmount), quantity);
        w.write(Field::VatOnSubtotal, vat_on_subtotal);

        let gross_subtotal = add(w.value(Field::FinalSubtotal), w.value(Field::VatOnSubtotal));
        w.write(Field::GrossSubtotal, gross_subtotal);
    }

    Derivation {
        fields: w.fields,
        changed: w.changed,
        last_edited,
    }
}
