//! Bill-wise allocation resolver.
//!
//! Decides whether a payment event settles a specific invoice or floats
//! on-account, and validates the link before any state changes. All checks
//! happen against a snapshot; the caller applies the returned balance state
//! under its own mutation lock.

use billkeep_core::{DomainError, DomainResult, PartyId};
use billkeep_invoicing::{BalanceState, Invoice, balance};

use crate::event::{AllocationTarget, PaymentEvent};

/// Outcome of resolving a payment event against its (optional) target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocation {
    /// Party the event belongs to: its own, or inherited from the invoice.
    pub party_id: Option<PartyId>,
    /// New balance state for the target invoice, if the event is bill-wise.
    pub balance: Option<BalanceState>,
}

/// Resolve a payment event.
///
/// For a bill-wise event the target invoice must exist, belong to the same
/// tenant, and be of the kind the event settles (`Payment` → Purchase,
/// `Receipt` → Sale); anything else is `TargetNotFound`. The amount must
/// not exceed the invoice's remaining balance (`AmountExceedsBalance`).
/// On-account events touch no invoice.
pub fn resolve(event: &PaymentEvent, target: Option<&Invoice>) -> DomainResult<Allocation> {
    match event.target() {
        AllocationTarget::OnAccount => Ok(Allocation {
            party_id: event.party_id(),
            balance: None,
        }),
        AllocationTarget::Invoice(invoice_id) => {
            let invoice = target.ok_or(DomainError::TargetNotFound)?;
            if invoice.id() != invoice_id
                || invoice.tenant_id() != event.tenant_id()
                || invoice.kind() != event.kind().invoice_kind()
            {
                return Err(DomainError::TargetNotFound);
            }

            let state =
                balance::payment_delta(invoice.total_amount(), invoice.paid_amount(), event.amount())?;
            Ok(Allocation {
                party_id: event.party_id().or(invoice.party_id()),
                balance: Some(state),
            })
        }
    }
}

/// Apply a resolved allocation back onto the event (party inheritance).
pub fn adopt_party(event: &mut PaymentEvent, allocation: &Allocation) {
    event.set_party(allocation.party_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use billkeep_core::{InvoiceId, PaymentEventId, ProductId, TenantId};
    use billkeep_invoicing::{InvoiceKind, LineItem, NewInvoice, PaymentStatus};

    use crate::event::{NewPaymentEvent, PaymentKind, PaymentMethod};

    fn sale(tenant: TenantId, party: Option<PartyId>, total: i64, paid: i64) -> Invoice {
        Invoice::create(
            InvoiceId::new(),
            1,
            Utc::now(),
            NewInvoice {
                tenant_id: tenant,
                kind: InvoiceKind::Sale,
                party_id: party,
                lines: vec![LineItem::new(ProductId::new(), 1, total).unwrap()],
                total_amount: None,
                paid_now: paid,
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                note: None,
            },
        )
        .unwrap()
    }

    fn receipt(tenant: TenantId, target: AllocationTarget, amount: i64) -> PaymentEvent {
        PaymentEvent::create(
            PaymentEventId::new(),
            2,
            Utc::now(),
            NewPaymentEvent {
                tenant_id: tenant,
                kind: PaymentKind::Receipt,
                amount,
                method: PaymentMethod::Cash,
                target,
                party_id: None,
                date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                note: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn settles_matching_sale_and_inherits_party() {
        let tenant = TenantId::new();
        let party = PartyId::new();
        let inv = sale(tenant, Some(party), 1000, 400);
        let ev = receipt(tenant, AllocationTarget::Invoice(inv.id()), 600);

        let alloc = resolve(&ev, Some(&inv)).unwrap();
        assert_eq!(alloc.party_id, Some(party));
        let state = alloc.balance.unwrap();
        assert_eq!(state.paid_amount, 1000);
        assert_eq!(state.balance_amount, 0);
        assert_eq!(state.status, PaymentStatus::Paid);
    }

    #[test]
    fn missing_target_is_rejected() {
        let tenant = TenantId::new();
        let ev = receipt(tenant, AllocationTarget::Invoice(InvoiceId::new()), 100);
        assert_eq!(resolve(&ev, None).unwrap_err(), DomainError::TargetNotFound);
    }

    #[test]
    fn foreign_tenant_invoice_is_rejected() {
        let inv = sale(TenantId::new(), None, 1000, 0);
        let ev = receipt(TenantId::new(), AllocationTarget::Invoice(inv.id()), 100);
        assert_eq!(
            resolve(&ev, Some(&inv)).unwrap_err(),
            DomainError::TargetNotFound
        );
    }

    #[test]
    fn wrong_kind_invoice_is_rejected() {
        // A receipt (money in) cannot settle a purchase.
        let tenant = TenantId::new();
        let party = PartyId::new();
        let purchase = Invoice::create(
            InvoiceId::new(),
            1,
            Utc::now(),
            NewInvoice {
                tenant_id: tenant,
                kind: InvoiceKind::Purchase,
                party_id: Some(party),
                lines: vec![LineItem::new(ProductId::new(), 1, 500).unwrap()],
                total_amount: None,
                paid_now: 0,
                date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
                note: None,
            },
        )
        .unwrap();
        let ev = receipt(tenant, AllocationTarget::Invoice(purchase.id()), 100);
        assert_eq!(
            resolve(&ev, Some(&purchase)).unwrap_err(),
            DomainError::TargetNotFound
        );
    }

    #[test]
    fn overpaying_the_balance_is_rejected() {
        let tenant = TenantId::new();
        let inv = sale(tenant, None, 1000, 400);
        let ev = receipt(tenant, AllocationTarget::Invoice(inv.id()), 700);
        assert_eq!(
            resolve(&ev, Some(&inv)).unwrap_err(),
            DomainError::AmountExceedsBalance
        );
    }

    #[test]
    fn on_account_touches_no_invoice() {
        let tenant = TenantId::new();
        let party = PartyId::new();
        let ev = PaymentEvent::create(
            PaymentEventId::new(),
            1,
            Utc::now(),
            NewPaymentEvent {
                tenant_id: tenant,
                kind: PaymentKind::Payment,
                amount: 300,
                method: PaymentMethod::BankTransfer,
                target: AllocationTarget::OnAccount,
                party_id: Some(party),
                date: NaiveDate::from_ymd_opt(2025, 3, 15).unwrap(),
                note: None,
            },
        )
        .unwrap();

        let alloc = resolve(&ev, None).unwrap();
        assert_eq!(alloc.party_id, Some(party));
        assert!(alloc.balance.is_none());
    }
}
