//! Outstanding aggregator.
//!
//! Rolls up receivable (sales - receipts) and payable (purchases -
//! payments) per party and globally, and lists individually pending
//! invoices. Pending amounts are recomputed from `(total, paid)` rather
//! than trusting the stored balance, as a consistency cross-check.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use billkeep_core::{Amount, InvoiceId, PartyId, clamp_non_negative};
use billkeep_invoicing::{Invoice, InvoiceKind};
use billkeep_parties::Party;
use billkeep_payments::{PaymentEvent, PaymentKind};

/// An invoice with money still owed on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvoice {
    pub invoice_id: InvoiceId,
    pub party_id: Option<PartyId>,
    pub date: NaiveDate,
    pub total_amount: Amount,
    pub paid_amount: Amount,
    pub pending: Amount,
}

/// Per-party roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyOutstanding {
    pub party_id: PartyId,
    pub name: String,
    pub total_sales: Amount,
    pub total_receipts: Amount,
    pub total_purchases: Amount,
    pub total_payments: Amount,
    pub receivable: Amount,
    pub payable: Amount,
    pub net_balance: Amount,
}

/// Sums over the filtered result sets (not over all records).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutstandingTotals {
    pub sale_pending: Amount,
    pub purchase_pending: Amount,
    pub receivable: Amount,
    pub payable: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingReport {
    pub sale_pending: Vec<PendingInvoice>,
    pub purchase_pending: Vec<PendingInvoice>,
    pub party_outstanding: Vec<PartyOutstanding>,
    pub totals: OutstandingTotals,
}

#[derive(Default)]
struct PartyAccumulator {
    sales: Amount,
    receipts: Amount,
    purchases: Amount,
    payments: Amount,
}

fn pending_list(invoices: &[Invoice]) -> Vec<PendingInvoice> {
    let mut list: Vec<PendingInvoice> = invoices
        .iter()
        .filter_map(|inv| {
            let pending = clamp_non_negative(inv.total_amount() - inv.paid_amount());
            (pending > 0).then(|| PendingInvoice {
                invoice_id: inv.id(),
                party_id: inv.party_id(),
                date: inv.date(),
                total_amount: inv.total_amount(),
                paid_amount: inv.paid_amount(),
                pending,
            })
        })
        .collect();
    list.sort_by(|a, b| b.date.cmp(&a.date));
    list
}

/// Build the outstanding report.
///
/// Parties with both receivable and payable at zero are excluded; the
/// remainder is sorted by party name ascending. Invoices and events with
/// no party contribute to the pending lists but not to party roll-ups.
pub fn aggregate(
    sales: &[Invoice],
    purchases: &[Invoice],
    receipts: &[PaymentEvent],
    payments: &[PaymentEvent],
    parties: &[Party],
) -> OutstandingReport {
    debug_assert!(sales.iter().all(|i| i.kind() == InvoiceKind::Sale));
    debug_assert!(purchases.iter().all(|i| i.kind() == InvoiceKind::Purchase));
    debug_assert!(receipts.iter().all(|e| e.kind() == PaymentKind::Receipt));
    debug_assert!(payments.iter().all(|e| e.kind() == PaymentKind::Payment));

    let sale_pending = pending_list(sales);
    let purchase_pending = pending_list(purchases);

    let mut by_party: HashMap<PartyId, PartyAccumulator> = HashMap::new();
    for inv in sales {
        if let Some(p) = inv.party_id() {
            by_party.entry(p).or_default().sales += inv.total_amount();
        }
    }
    for inv in purchases {
        if let Some(p) = inv.party_id() {
            by_party.entry(p).or_default().purchases += inv.total_amount();
        }
    }
    for ev in receipts {
        if let Some(p) = ev.party_id() {
            by_party.entry(p).or_default().receipts += ev.amount();
        }
    }
    for ev in payments {
        if let Some(p) = ev.party_id() {
            by_party.entry(p).or_default().payments += ev.amount();
        }
    }

    let names: HashMap<PartyId, &str> =
        parties.iter().map(|p| (p.id, p.name.as_str())).collect();

    let mut party_outstanding: Vec<PartyOutstanding> = by_party
        .into_iter()
        .filter_map(|(party_id, acc)| {
            let receivable = clamp_non_negative(acc.sales - acc.receipts);
            let payable = clamp_non_negative(acc.purchases - acc.payments);
            if receivable == 0 && payable == 0 {
                return None;
            }
            let name = names
                .get(&party_id)
                .map(|n| n.to_string())
                .unwrap_or_else(|| party_id.to_string());
            Some(PartyOutstanding {
                party_id,
                name,
                total_sales: acc.sales,
                total_receipts: acc.receipts,
                total_purchases: acc.purchases,
                total_payments: acc.payments,
                receivable,
                payable,
                net_balance: receivable - payable,
            })
        })
        .collect();
    party_outstanding.sort_by(|a, b| a.name.cmp(&b.name));

    let totals = OutstandingTotals {
        sale_pending: sale_pending.iter().map(|p| p.pending).sum(),
        purchase_pending: purchase_pending.iter().map(|p| p.pending).sum(),
        receivable: party_outstanding.iter().map(|p| p.receivable).sum(),
        payable: party_outstanding.iter().map(|p| p.payable).sum(),
    };

    OutstandingReport {
        sale_pending,
        purchase_pending,
        party_outstanding,
        totals,
    }
}
