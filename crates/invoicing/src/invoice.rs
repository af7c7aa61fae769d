use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billkeep_core::{Amount, DomainError, DomainResult, InvoiceId, PartyId, ProductId, TenantId};

use crate::balance::{self, BalanceState};

/// Invoice variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceKind {
    Sale,
    Purchase,
}

/// Derived payment status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
    /// Unit price in smallest currency unit.
    pub unit_price: Amount,
    pub line_total: Amount,
}

impl LineItem {
    pub fn new(product_id: ProductId, quantity: i64, unit_price: Amount) -> DomainResult<Self> {
        if quantity <= 0 {
            return Err(DomainError::validation("line quantity must be positive"));
        }
        if unit_price < 0 {
            return Err(DomainError::validation("unit price cannot be negative"));
        }
        let line_total = quantity
            .checked_mul(unit_price)
            .ok_or_else(|| DomainError::validation("line total overflow"))?;
        Ok(Self {
            product_id,
            quantity,
            unit_price,
            line_total,
        })
    }
}

/// Input for creating an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub tenant_id: TenantId,
    pub kind: InvoiceKind,
    /// Nullable for walk-in sales; required for purchases.
    pub party_id: Option<PartyId>,
    pub lines: Vec<LineItem>,
    /// Header total. May exceed the line sum (tax, shipping, rounding);
    /// defaults to the line sum when absent.
    pub total_amount: Option<Amount>,
    /// Amount paid at creation time; seeds the balance state.
    pub paid_now: Amount,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// A Sale or Purchase invoice.
///
/// `paid_amount`, `balance_amount`, and `status` are materialized views over
/// the invoice's payment history; they change only through the methods here,
/// which delegate to the balance mutator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    id: InvoiceId,
    tenant_id: TenantId,
    kind: InvoiceKind,
    party_id: Option<PartyId>,
    lines: Vec<LineItem>,
    total_amount: Amount,
    paid_amount: Amount,
    balance_amount: Amount,
    status: PaymentStatus,
    date: NaiveDate,
    /// Per-tenant insertion sequence; the `(date, seq)` pair orders ledgers.
    seq: u64,
    created_at: DateTime<Utc>,
    note: Option<String>,
}

impl Invoice {
    /// Validate and create an invoice, seeding its balance state.
    pub fn create(
        id: InvoiceId,
        seq: u64,
        created_at: DateTime<Utc>,
        draft: NewInvoice,
    ) -> DomainResult<Self> {
        if draft.lines.is_empty() {
            return Err(DomainError::validation("invoice must have at least one line"));
        }
        if draft.kind == InvoiceKind::Purchase && draft.party_id.is_none() {
            return Err(DomainError::validation("purchase invoice requires a party"));
        }

        let mut line_sum: Amount = 0;
        for line in &draft.lines {
            if line.quantity <= 0 {
                return Err(DomainError::validation("line quantity must be positive"));
            }
            if line.unit_price < 0 {
                return Err(DomainError::validation("unit price cannot be negative"));
            }
            line_sum = line_sum
                .checked_add(line.line_total)
                .ok_or_else(|| DomainError::validation("invoice total overflow"))?;
        }

        let total = draft.total_amount.unwrap_or(line_sum);
        if total < line_sum {
            return Err(DomainError::validation(
                "invoice total cannot be below the sum of its lines",
            ));
        }

        let state = balance::initial_state(total, draft.paid_now);
        Ok(Self {
            id,
            tenant_id: draft.tenant_id,
            kind: draft.kind,
            party_id: draft.party_id,
            lines: draft.lines,
            total_amount: total,
            paid_amount: state.paid_amount,
            balance_amount: state.balance_amount,
            status: state.status,
            date: draft.date,
            seq,
            created_at,
            note: draft.note,
        })
    }

    pub fn id(&self) -> InvoiceId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> InvoiceKind {
        self.kind
    }

    pub fn party_id(&self) -> Option<PartyId> {
        self.party_id
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn total_amount(&self) -> Amount {
        self.total_amount
    }

    pub fn paid_amount(&self) -> Amount {
        self.paid_amount
    }

    pub fn balance_amount(&self) -> Amount {
        self.balance_amount
    }

    pub fn status(&self) -> PaymentStatus {
        self.status
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    fn apply_state(&mut self, state: BalanceState) {
        self.paid_amount = state.paid_amount;
        self.balance_amount = state.balance_amount;
        self.status = state.status;
    }

    /// Record a bill-wise payment against this invoice.
    ///
    /// Fails with `AmountExceedsBalance` before any field changes.
    pub fn record_payment(&mut self, amount: Amount) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("payment amount must be positive"));
        }
        let state = balance::payment_delta(self.total_amount, self.paid_amount, amount)?;
        self.apply_state(state);
        Ok(())
    }

    /// Reverse a previously recorded payment (payment deletion or edit).
    ///
    /// Floors paid at zero if records are inconsistent.
    pub fn reverse_payment(&mut self, amount: Amount) -> DomainResult<()> {
        if amount <= 0 {
            return Err(DomainError::validation("reversal amount must be positive"));
        }
        let state = balance::payment_delta(self.total_amount, self.paid_amount, -amount)?;
        self.apply_state(state);
        Ok(())
    }

    /// Edit the invoice total, carrying the existing paid amount over.
    ///
    /// The new total must still cover the sum of the invoice's lines.
    /// Fails with `TotalBelowPaid` if it is under what has already been
    /// allocated bill-wise.
    pub fn set_total(&mut self, new_total: Amount) -> DomainResult<()> {
        let line_sum: Amount = self.lines.iter().map(|l| l.line_total).sum();
        if new_total < line_sum {
            return Err(DomainError::validation(
                "invoice total cannot be below the sum of its lines",
            ));
        }
        let state = balance::retotal(new_total, self.paid_amount)?;
        self.total_amount = new_total;
        self.apply_state(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(kind: InvoiceKind, paid_now: Amount) -> NewInvoice {
        NewInvoice {
            tenant_id: TenantId::new(),
            kind,
            party_id: Some(PartyId::new()),
            lines: vec![LineItem::new(ProductId::new(), 2, 500).unwrap()],
            total_amount: None,
            paid_now,
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            note: None,
        }
    }

    fn make(kind: InvoiceKind, paid_now: Amount) -> Invoice {
        Invoice::create(InvoiceId::new(), 1, Utc::now(), draft(kind, paid_now)).unwrap()
    }

    #[test]
    fn partial_payment_at_creation() {
        let inv = make(InvoiceKind::Sale, 400);
        assert_eq!(inv.total_amount(), 1000);
        assert_eq!(inv.paid_amount(), 400);
        assert_eq!(inv.balance_amount(), 600);
        assert_eq!(inv.status(), PaymentStatus::Partial);
    }

    #[test]
    fn header_total_may_exceed_line_sum() {
        let mut d = draft(InvoiceKind::Sale, 0);
        d.total_amount = Some(1080); // lines sum to 1000, header adds tax
        let inv = Invoice::create(InvoiceId::new(), 1, Utc::now(), d).unwrap();
        assert_eq!(inv.total_amount(), 1080);
        assert_eq!(inv.balance_amount(), 1080);
    }

    #[test]
    fn header_total_below_line_sum_is_rejected() {
        let mut d = draft(InvoiceKind::Sale, 0);
        d.total_amount = Some(900);
        let err = Invoice::create(InvoiceId::new(), 1, Utc::now(), d).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn purchase_requires_party() {
        let mut d = draft(InvoiceKind::Purchase, 0);
        d.party_id = None;
        let err = Invoice::create(InvoiceId::new(), 1, Utc::now(), d).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn walk_in_sale_has_no_party() {
        let mut d = draft(InvoiceKind::Sale, 0);
        d.party_id = None;
        let inv = Invoice::create(InvoiceId::new(), 1, Utc::now(), d).unwrap();
        assert_eq!(inv.party_id(), None);
    }

    #[test]
    fn record_then_reverse_restores_prior_state() {
        let mut inv = make(InvoiceKind::Sale, 400);
        inv.record_payment(600).unwrap();
        assert_eq!(inv.status(), PaymentStatus::Paid);
        inv.reverse_payment(600).unwrap();
        assert_eq!(inv.paid_amount(), 400);
        assert_eq!(inv.balance_amount(), 600);
        assert_eq!(inv.status(), PaymentStatus::Partial);
    }

    #[test]
    fn overpayment_leaves_invoice_unchanged() {
        let mut inv = make(InvoiceKind::Sale, 400);
        let before = inv.clone();
        let err = inv.record_payment(700).unwrap_err();
        assert_eq!(err, DomainError::AmountExceedsBalance);
        assert_eq!(inv, before);
    }

    #[test]
    fn shrinking_total_under_paid_is_rejected() {
        // Header total 1500 over a 1000 line sum, with 1400 already paid:
        // 1200 still covers the lines but not the allocation.
        let mut d = draft(InvoiceKind::Sale, 1400);
        d.total_amount = Some(1500);
        let mut inv = Invoice::create(InvoiceId::new(), 1, Utc::now(), d).unwrap();
        let err = inv.set_total(1200).unwrap_err();
        assert_eq!(err, DomainError::TotalBelowPaid);
        assert_eq!(inv.total_amount(), 1500);
    }

    #[test]
    fn shrinking_total_below_line_sum_is_rejected() {
        let mut inv = make(InvoiceKind::Sale, 0);
        let err = inv.set_total(100).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(inv.total_amount(), 1000);
        assert_eq!(inv.balance_amount(), 1000);
    }

    #[test]
    fn growing_total_reopens_paid_invoice() {
        let mut inv = make(InvoiceKind::Sale, 1000);
        assert_eq!(inv.status(), PaymentStatus::Paid);
        inv.set_total(1500).unwrap();
        assert_eq!(inv.paid_amount(), 1000);
        assert_eq!(inv.balance_amount(), 500);
        assert_eq!(inv.status(), PaymentStatus::Partial);
    }
}
