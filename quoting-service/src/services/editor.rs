//! In-memory editing state for the lines of one quote.
//!
//! The editor owns every line being edited, feeds each change through
//! [`derive`] and keeps the per-line discriminators between passes. Nothing
//! reaches the store until [`QuoteEditor::save`], which writes the whole
//! batch or nothing.

use crate::derivation::numeric::{add, value_of};
use crate::derivation::{derive, numeric, Field, LastEdited, Pass, QuoteLineFields, RuleSet};
use crate::models::{NewQuoteLine, QuoteLine};
use crate::services::metrics::{
    DERIVATION_PASSES_TOTAL, ERRORS_TOTAL, FIELD_WRITES_TOTAL, QUOTE_SAVES_TOTAL,
};
use crate::services::store::QuoteLineStore;
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// A quote line as held by the editor.
#[derive(Debug, Clone)]
pub struct EditorLine {
    pub quote_line_id: Uuid,
    pub fields: QuoteLineFields,
    pub last_edited: LastEdited,
    persisted: bool,
    reconciled: bool,
}

impl EditorLine {
    fn new() -> Self {
        Self {
            quote_line_id: Uuid::new_v4(),
            fields: QuoteLineFields::default(),
            last_edited: LastEdited::default(),
            persisted: false,
            // New lines have nothing to reconcile.
            reconciled: true,
        }
    }

    fn from_persisted(line: QuoteLine) -> Self {
        Self {
            quote_line_id: line.quote_line_id,
            fields: line.fields,
            last_edited: LastEdited::default(),
            persisted: true,
            reconciled: false,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciled
    }

    fn recompute(&mut self, pass: Pass, rules: RuleSet, trigger: &str) {
        let derivation = derive(&self.fields, pass, rules);

        DERIVATION_PASSES_TOTAL.with_label_values(&[trigger]).inc();
        for field in &derivation.changed {
            FIELD_WRITES_TOTAL.with_label_values(&[field.as_str()]).inc();
        }
        debug!(
            quote_line_id = %self.quote_line_id,
            trigger = trigger,
            changed = derivation.changed.len(),
            "Quote line recomputed"
        );

        self.fields = derivation.fields;
        self.last_edited = derivation.last_edited;
    }
}

/// Quote-level sums over all lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuoteTotals {
    pub subtotal: Decimal,
    pub vat: Decimal,
    pub gross: Decimal,
}

/// Editing session for the lines of one quote.
#[derive(Debug)]
pub struct QuoteEditor {
    tenant_id: Uuid,
    quote_id: Uuid,
    rules: RuleSet,
    lines: Vec<EditorLine>,
}

impl QuoteEditor {
    /// Start editing a quote that has no persisted lines.
    pub fn new(tenant_id: Uuid, quote_id: Uuid, rules: RuleSet) -> Self {
        Self {
            tenant_id,
            quote_id,
            rules,
            lines: Vec::new(),
        }
    }

    /// Load the persisted lines of a quote and reconcile each one.
    #[instrument(skip(store), fields(tenant_id = %tenant_id, quote_id = %quote_id))]
    pub async fn load(
        store: &dyn QuoteLineStore,
        tenant_id: Uuid,
        quote_id: Uuid,
        rules: RuleSet,
    ) -> Result<Self, AppError> {
        let persisted = store.list_quote_lines(tenant_id, quote_id).await?;

        let mut editor = Self::new(tenant_id, quote_id, rules);
        editor.lines = persisted
            .into_iter()
            .map(EditorLine::from_persisted)
            .collect();
        for line in &mut editor.lines {
            Self::reconcile_line(line, rules);
        }

        info!(line_count = editor.lines.len(), "Quote loaded for editing");

        Ok(editor)
    }

    pub fn tenant_id(&self) -> Uuid {
        self.tenant_id
    }

    pub fn quote_id(&self) -> Uuid {
        self.quote_id
    }

    pub fn rules(&self) -> RuleSet {
        self.rules
    }

    pub fn lines(&self) -> &[EditorLine] {
        &self.lines
    }

    pub fn line(&self, quote_line_id: Uuid) -> Option<&EditorLine> {
        self.lines
            .iter()
            .find(|line| line.quote_line_id == quote_line_id)
    }

    /// Run the one-time reconciliation of a loaded line. Returns `false` if
    /// the line was already reconciled.
    pub fn reconcile(&mut self, quote_line_id: Uuid) -> Result<bool, AppError> {
        let rules = self.rules;
        let line = self.line_mut(quote_line_id)?;
        Ok(Self::reconcile_line(line, rules))
    }

    fn reconcile_line(line: &mut EditorLine, rules: RuleSet) -> bool {
        if line.reconciled {
            return false;
        }
        line.recompute(Pass::InitialLoad, rules, "initial_load");
        line.reconciled = true;
        true
    }

    /// Append an empty line and return its id. Derived fields stay `None`
    /// until the first edit.
    pub fn add_line(&mut self) -> Uuid {
        let line = EditorLine::new();
        let quote_line_id = line.quote_line_id;
        self.lines.push(line);
        debug!(quote_line_id = %quote_line_id, "Quote line added");
        quote_line_id
    }

    /// Drop a line from the editing session. Persisted lines disappear from
    /// the store on the next save.
    pub fn remove_line(&mut self, quote_line_id: Uuid) -> Option<EditorLine> {
        let index = self
            .lines
            .iter()
            .position(|line| line.quote_line_id == quote_line_id)?;
        Some(self.lines.remove(index))
    }

    /// Delete a persisted line right away instead of waiting for the next
    /// save.
    #[instrument(skip(self, store), fields(quote_id = %self.quote_id))]
    pub async fn delete_persisted_line(
        &mut self,
        store: &dyn QuoteLineStore,
        quote_line_id: Uuid,
    ) -> Result<(), AppError> {
        let persisted = self.line_mut(quote_line_id)?.persisted;

        if persisted {
            let deleted = store
                .delete_quote_line(self.tenant_id, self.quote_id, quote_line_id)
                .await?;
            if !deleted {
                warn!(quote_line_id = %quote_line_id, "Quote line was already gone from the store");
            }
        }

        self.remove_line(quote_line_id);
        Ok(())
    }

    /// Seed a line from a catalog product and recompute it.
    #[instrument(skip(self, store), fields(quote_id = %self.quote_id))]
    pub async fn select_product(
        &mut self,
        store: &dyn QuoteLineStore,
        quote_line_id: Uuid,
        product_id: Uuid,
    ) -> Result<&EditorLine, AppError> {
        self.line_mut(quote_line_id)?;

        let product = store
            .get_product(self.tenant_id, product_id)
            .await?
            .ok_or_else(|| {
                ERRORS_TOTAL.with_label_values(&["product_not_found"]).inc();
                AppError::NotFound(anyhow::anyhow!("Product {} not found", product_id))
            })?;

        let rules = self.rules;
        let line = self.line_mut(quote_line_id)?;
        line.fields.product_id = Some(product.product_id);
        line.fields.product_name = product.name;
        line.fields.currency = Some(product.currency);
        line.fields.product_unit_price = Some(product.unit_price);
        if product.vat_percent.is_some() {
            line.fields.vat_percent = product.vat_percent;
        }

        let pass = Pass::Edit(line.last_edited);
        line.recompute(pass, rules, "product_selected");

        Ok(&*line)
    }

    /// Apply text typed by the user. Blank or non-numeric text is stored as
    /// "nothing entered".
    pub fn set_field(
        &mut self,
        quote_line_id: Uuid,
        field: Field,
        raw: &str,
    ) -> Result<&EditorLine, AppError> {
        self.set_value(quote_line_id, field, numeric::parse_input(raw))
    }

    /// Apply a user edit to an input field and recompute the line.
    pub fn set_value(
        &mut self,
        quote_line_id: Uuid,
        field: Field,
        value: Option<Decimal>,
    ) -> Result<&EditorLine, AppError> {
        if field.is_derived() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} is derived and cannot be edited",
                field
            )));
        }

        let rules = self.rules;
        let line = self.line_mut(quote_line_id)?;
        line.fields.set(field, value);
        line.last_edited.record(field);

        let pass = Pass::Edit(line.last_edited);
        line.recompute(pass, rules, "edit");

        Ok(&*line)
    }

    pub fn totals(&self) -> QuoteTotals {
        self.lines
            .iter()
            .fold(QuoteTotals::default(), |totals, line| {
                let f = &line.fields;
                let subtotal = f.final_subtotal.or(f.subtotal_before_row_discounts);
                QuoteTotals {
                    subtotal: add(totals.subtotal, value_of(subtotal)),
                    vat: add(totals.vat, value_of(f.vat_on_subtotal)),
                    gross: add(totals.gross, value_of(f.gross_subtotal)),
                }
            })
    }

    /// Persist every line in one batch.
    ///
    /// On failure the editor is left exactly as it was, so the user can fix
    /// the problem and submit again.
    #[instrument(skip(self, store), fields(tenant_id = %self.tenant_id, quote_id = %self.quote_id))]
    pub async fn save(&mut self, store: &dyn QuoteLineStore) -> Result<Vec<QuoteLine>, AppError> {
        if let Some(index) = self
            .lines
            .iter()
            .position(|line| line.fields.product_id.is_none())
        {
            QUOTE_SAVES_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line {} has no product",
                index + 1
            )));
        }

        let batch: Vec<NewQuoteLine> = self
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| NewQuoteLine {
                quote_line_id: line.quote_line_id,
                fields: line.fields.clone(),
                sort_order: index as i32,
            })
            .collect();

        let saved = match store
            .replace_quote_lines(self.tenant_id, self.quote_id, &batch)
            .await
        {
            Ok(saved) => saved,
            Err(e) => {
                QUOTE_SAVES_TOTAL.with_label_values(&["failed"]).inc();
                ERRORS_TOTAL.with_label_values(&["save_failed"]).inc();
                warn!(error = %e, error_kind = e.kind(), "Quote save failed, keeping unsaved edits");
                return Err(e);
            }
        };

        for line in &mut self.lines {
            line.persisted = true;
        }
        QUOTE_SAVES_TOTAL.with_label_values(&["ok"]).inc();
        info!(line_count = saved.len(), "Quote saved");

        Ok(saved)
    }

    fn line_mut(&mut self, quote_line_id: Uuid) -> Result<&mut EditorLine, AppError> {
        self.lines
            .iter_mut()
            .find(|line| line.quote_line_id == quote_line_id)
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("Quote line {} not found", quote_line_id))
            })
    }
}
