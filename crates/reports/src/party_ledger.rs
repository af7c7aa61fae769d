//! Party transaction ledger merger.
//!
//! Merges sales, purchases, receipts, and payments into one chronological
//! stream with a running monetary balance. A single signed-impact model
//! serves both receivable and payable semantics: sales and payments push
//! the balance up, receipts and purchases push it down.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billkeep_core::{Amount, InvoiceId, PartyId, PaymentEventId};
use billkeep_invoicing::Invoice;
use billkeep_payments::PaymentEvent;

/// What kind of record a ledger entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryKind {
    Sale,
    Purchase,
    Receipt,
    Payment,
}

/// Typed back-reference to the source record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "record", content = "id", rename_all = "lowercase")]
pub enum LedgerRef {
    Invoice(InvoiceId),
    Event(PaymentEventId),
}

/// One merged ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyLedgerEntry {
    pub date: NaiveDate,
    pub seq: u64,
    pub kind: LedgerEntryKind,
    pub source: LedgerRef,
    pub party_id: Option<PartyId>,
    pub amount: Amount,
    /// Signed contribution: Sale = +amount, Receipt = -amount,
    /// Purchase = -amount, Payment = +amount.
    pub impact: Amount,
    /// Strict left fold of `impact`, seeded at 0 at the start of the
    /// queried window. For a date-bounded query this is relative to the
    /// window, not an opening-balance-adjusted figure.
    pub running_balance: Amount,
}

impl LedgerEntryKind {
    fn impact(self, amount: Amount) -> Amount {
        match self {
            LedgerEntryKind::Sale | LedgerEntryKind::Payment => amount,
            LedgerEntryKind::Purchase | LedgerEntryKind::Receipt => -amount,
        }
    }
}

/// Merge the four record streams into one chronological ledger.
///
/// Sorted by `(date, seq)` ascending; insertion order breaks same-day ties
/// to preserve causal order. The running balance always seeds at 0.
pub fn merge_ledger(
    sales: &[Invoice],
    purchases: &[Invoice],
    receipts: &[PaymentEvent],
    payments: &[PaymentEvent],
) -> Vec<PartyLedgerEntry> {
    let mut entries: Vec<PartyLedgerEntry> = Vec::with_capacity(
        sales.len() + purchases.len() + receipts.len() + payments.len(),
    );

    let invoice_entry = |inv: &Invoice, kind: LedgerEntryKind| PartyLedgerEntry {
        date: inv.date(),
        seq: inv.seq(),
        kind,
        source: LedgerRef::Invoice(inv.id()),
        party_id: inv.party_id(),
        amount: inv.total_amount(),
        impact: kind.impact(inv.total_amount()),
        running_balance: 0,
    };
    let event_entry = |ev: &PaymentEvent, kind: LedgerEntryKind| PartyLedgerEntry {
        date: ev.date(),
        seq: ev.seq(),
        kind,
        source: LedgerRef::Event(ev.id()),
        party_id: ev.party_id(),
        amount: ev.amount(),
        impact: kind.impact(ev.amount()),
        running_balance: 0,
    };

    entries.extend(sales.iter().map(|i| invoice_entry(i, LedgerEntryKind::Sale)));
    entries.extend(
        purchases
            .iter()
            .map(|i| invoice_entry(i, LedgerEntryKind::Purchase)),
    );
    entries.extend(
        receipts
            .iter()
            .map(|e| event_entry(e, LedgerEntryKind::Receipt)),
    );
    entries.extend(
        payments
            .iter()
            .map(|e| event_entry(e, LedgerEntryKind::Payment)),
    );

    entries.sort_by_key(|e| (e.date, e.seq));

    let mut balance: Amount = 0;
    for entry in &mut entries {
        balance += entry.impact;
        entry.running_balance = balance;
    }
    entries
}
