//! Field set of a single quote line.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Numeric field of a quote line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    ProductUnitPrice,
    ProductUnitPriceOverride,
    QuoteUnitPrice,
    UnitPriceDiscountPercent,
    UnitPriceDiscountAmount,
    FinalUnitPrice,
    QuotedQuantity,
    SubtotalBeforeRowDiscounts,
    DiscountPercentOnSubtotal,
    DiscountAmountOnSubtotal,
    FinalSubtotal,
    VatPercent,
    VatUnitAmount,
    VatOnSubtotal,
    GrossSubtotal,
}

impl Field {
    pub const ALL: [Field; 15] = [
        Field::ProductUnitPrice,
        Field::ProductUnitPriceOverride,
        Field::QuoteUnitPrice,
        Field::UnitPriceDiscountPercent,
        Field::UnitPriceDiscountAmount,
        Field::FinalUnitPrice,
        Field::QuotedQuantity,
        Field::SubtotalBeforeRowDiscounts,
        Field::DiscountPercentOnSubtotal,
        Field::DiscountAmountOnSubtotal,
        Field::FinalSubtotal,
        Field::VatPercent,
        Field::VatUnitAmount,
        Field::VatOnSubtotal,
        Field::GrossSubtotal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ProductUnitPrice => "productUnitPrice",
            Field::ProductUnitPriceOverride => "productUnitPriceOverride",
            Field::QuoteUnitPrice => "quoteUnitPrice",
            Field::UnitPriceDiscountPercent => "unitPriceDiscountPercent",
            Field::UnitPriceDiscountAmount => "unitPriceDiscountAmount",
            Field::FinalUnitPrice => "finalUnitPrice",
            Field::QuotedQuantity => "quotedQuantity",
            Field::SubtotalBeforeRowDiscounts => "subtotalBeforeRowDiscounts",
            Field::DiscountPercentOnSubtotal => "discountPercentOnSubtotal",
            Field::DiscountAmountOnSubtotal => "discountAmountOnSubtotal",
            Field::FinalSubtotal => "finalSubtotal",
            Field::VatPercent => "vatPercent",
            Field::VatUnitAmount => "vatUnitAmount",
            Field::VatOnSubtotal => "vatOnSubtotal",
            Field::GrossSubtotal => "grossSubtotal",
        }
    }

    pub fn from_string(s: &str) -> Option<Self> {
        Field::ALL.into_iter().find(|field| field.as_str() == s)
    }

    /// Derived fields are written only by the derivation rules.
    pub fn is_derived(&self) -> bool {
        matches!(
            self,
            Field::QuoteUnitPrice
                | Field::FinalUnitPrice
                | Field::SubtotalBeforeRowDiscounts
                | Field::FinalSubtotal
                | Field::VatUnitAmount
                | Field::VatOnSubtotal
                | Field::GrossSubtotal
        )
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current values of one quote line.
///
/// `None` means nothing has been entered or derived yet; the rules read it
/// as zero but never write it back for input fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuoteLineFields {
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub product_name: String,
    pub currency: Option<String>,
    pub product_unit_price: Option<Decimal>,
    pub product_unit_price_override: Option<Decimal>,
    pub quote_unit_price: Option<Decimal>,
    pub unit_price_discount_percent: Option<Decimal>,
    pub unit_price_discount_amount: Option<Decimal>,
    pub final_unit_price: Option<Decimal>,
    pub quoted_quantity: Option<Decimal>,
    pub subtotal_before_row_discounts: Option<Decimal>,
    pub discount_percent_on_subtotal: Option<Decimal>,
    pub discount_amount_on_subtotal: Option<Decimal>,
    pub final_subtotal: Option<Decimal>,
    pub vat_percent: Option<Decimal>,
    pub vat_unit_amount: Option<Decimal>,
    pub vat_on_subtotal: Option<Decimal>,
    pub gross_subtotal: Option<Decimal>,
}

impl QuoteLineFields {
    pub fn get(&self, field: Field) -> Option<Decimal> {
        match field {
            Field::ProductUnitPrice => self.product_unit_price,
            Field::ProductUnitPriceOverride => self.product_unit_price_override,
            Field::QuoteUnitPrice => self.quote_unit_price,
            Field::UnitPriceDiscountPercent => self.unit_price_discount_percent,
            Field::UnitPriceDiscountAmount => self.unit_price_discount_amount,
            Field::FinalUnitPrice => self.final_unit_price,
            Field::QuotedQuantity => self.quoted_quantity,
            Field::SubtotalBeforeRowDiscounts => self.subtotal_before_row_discounts,
            Field::DiscountPercentOnSubtotal => self.discount_percent_on_subtotal,
            Field::DiscountAmountOnSubtotal => self.discount_amount_on_subtotal,
            Field::FinalSubtotal => self.final_subtotal,
            Field::VatPercent => self.vat_percent,
            Field::VatUnitAmount => self.vat_unit_amount,
            Field::VatOnSubtotal => self.vat_on_subtotal,
            Field::GrossSubtotal => self.gross_subtotal,
        }
    }

    pub fn set(&mut self, field: Field, value: Option<Decimal>) {
        let slot = match field {
            Field::ProductUnitPrice => &mut self.product_unit_price,
            Field::ProductUnitPriceOverride => &mut self.product_unit_price_override,
            Field::QuoteUnitPrice => &mut self.quote_unit_price,
            Field::UnitPriceDiscountPercent => &mut self.unit_price_discount_percent,
            Field::UnitPriceDiscountAmount => &mut self.unit_price_discount_amount,
            Field::FinalUnitPrice => &mut self.final_unit_price,
            Field::QuotedQuantity => &mut self.quoted_quantity,
            Field::SubtotalBeforeRowDiscounts => &mut self.subtotal_before_row_discounts,
            Field::DiscountPercentOnSubtotal => &mut self.discount_percent_on_subtotal,
            Field::DiscountAmountOnSubtotal => &mut self.discount_amount_on_subtotal,
            Field::FinalSubtotal => &mut self.final_subtotal,
            Field::VatPercent => &mut self.vat_percent,
            Field::VatUnitAmount => &mut self.vat_unit_amount,
            Field::VatOnSubtotal => &mut self.vat_on_subtotal,
            Field::GrossSubtotal => &mut self.gross_subtotal,
        };
        *slot = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_string(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_string("productName"), None);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&Field::SubtotalBeforeRowDiscounts).unwrap();
        assert_eq!(json, "\"subtotalBeforeRowDiscounts\"");
    }

    #[test]
    fn derived_fields_are_exactly_the_rule_outputs() {
        let derived: Vec<Field> = Field::ALL.into_iter().filter(Field::is_derived).collect();
        assert_eq!(
            derived,
            vec![
                Field::QuoteUnitPrice,
                Field::FinalUnitPrice,
                Field::SubtotalBeforeRowDiscounts,
                Field::FinalSubtotal,
                Field::VatUnitAmount,
                Field::VatOnSubtotal,
                Field::GrossSubtotal,
            ]
        );
    }

    #[test]
    fn set_then_get_addresses_same_slot() {
        let mut fields = QuoteLineFields::default();
        for (i, field) in Field::ALL.into_iter().enumerate() {
            fields.set(field, Some(Decimal::from(i as i64)));
        }
        for (i, field) in Field::ALL.into_iter().enumerate() {
            assert_eq!(fields.get(field), Some(Decimal::from(i as i64)));
        }
    }
}
