use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billkeep_core::{Amount, DomainError, DomainResult, InvoiceId, PartyId, PaymentEventId, TenantId};
use billkeep_invoicing::InvoiceKind;

/// Payment event variant.
///
/// `Payment` is money out, settling purchases; `Receipt` is money in,
/// settling sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentKind {
    Payment,
    Receipt,
}

impl PaymentKind {
    /// The invoice kind a bill-wise event of this kind may settle.
    pub fn invoice_kind(self) -> InvoiceKind {
        match self {
            PaymentKind::Payment => InvoiceKind::Purchase,
            PaymentKind::Receipt => InvoiceKind::Sale,
        }
    }
}

/// How the money moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    Upi,
    Cheque,
    Other,
}

/// What a payment event settles.
///
/// Typed replacement for a loose `(ref_type, ref_id)` pair: an event either
/// names one live invoice or is a pure on-account party transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "ref_type", content = "ref_id", rename_all = "lowercase")]
pub enum AllocationTarget {
    Invoice(InvoiceId),
    #[serde(rename = "none")]
    OnAccount,
}

/// Input for posting a payment event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPaymentEvent {
    pub tenant_id: TenantId,
    pub kind: PaymentKind,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub target: AllocationTarget,
    /// May be unset for bill-wise events; the resolver inherits the target
    /// invoice's party. On-account events must carry one.
    pub party_id: Option<PartyId>,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// A posted payment or receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    id: PaymentEventId,
    tenant_id: TenantId,
    kind: PaymentKind,
    amount: Amount,
    method: PaymentMethod,
    target: AllocationTarget,
    party_id: Option<PartyId>,
    date: NaiveDate,
    /// Per-tenant insertion sequence; the `(date, seq)` pair orders ledgers.
    seq: u64,
    created_at: DateTime<Utc>,
    note: Option<String>,
}

impl PaymentEvent {
    pub fn create(
        id: PaymentEventId,
        seq: u64,
        created_at: DateTime<Utc>,
        draft: NewPaymentEvent,
    ) -> DomainResult<Self> {
        if draft.amount <= 0 {
            return Err(DomainError::validation("event amount must be positive"));
        }
        if draft.target == AllocationTarget::OnAccount && draft.party_id.is_none() {
            return Err(DomainError::validation(
                "on-account event requires a party",
            ));
        }
        Ok(Self {
            id,
            tenant_id: draft.tenant_id,
            kind: draft.kind,
            amount: draft.amount,
            method: draft.method,
            target: draft.target,
            party_id: draft.party_id,
            date: draft.date,
            seq,
            created_at,
            note: draft.note,
        })
    }

    pub fn id(&self) -> PaymentEventId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn kind(&self) -> PaymentKind {
        self.kind
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn method(&self) -> PaymentMethod {
        self.method
    }

    pub fn target(&self) -> AllocationTarget {
        self.target
    }

    pub fn party_id(&self) -> Option<PartyId> {
        self.party_id
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

    /// Whether this event is linked to the given invoice.
    pub fn settles(&self, invoice_id: InvoiceId) -> bool {
        self.target == AllocationTarget::Invoice(invoice_id)
    }

    /// Adopt the party resolved from the target invoice.
    pub(crate) fn set_party(&mut self, party_id: Option<PartyId>) {
        self.party_id = party_id;
    }
}
