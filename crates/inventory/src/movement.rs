use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use billkeep_core::{DomainError, DomainResult, InvoiceId, MovementId, ProductId, TenantId};

/// Origin of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    /// Inbound line of a purchase invoice.
    PurchaseLine,
    /// Outbound line of a sale invoice.
    SaleLine,
    /// Manual correction, either direction.
    ManualAdjustment,
}

/// Cached stock snapshot around a manual adjustment.
///
/// Recorded at the moment the adjustment was made; a fact, never re-derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub stock_before: i64,
    pub stock_after: i64,
}

/// Input for recording a stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementDraft {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub qty_in: i64,
    pub qty_out: i64,
    pub date: NaiveDate,
    /// Set when the movement was created alongside an invoice; movements
    /// are deleted only as a side effect of deleting that invoice.
    pub origin: Option<InvoiceId>,
    pub note: Option<String>,
    pub snapshot: Option<StockSnapshot>,
}

/// One stock movement. Exactly one of `qty_in`/`qty_out` is nonzero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    id: MovementId,
    tenant_id: TenantId,
    product_id: ProductId,
    kind: MovementKind,
    qty_in: i64,
    qty_out: i64,
    date: NaiveDate,
    /// Per-tenant insertion sequence; the `(date, seq)` pair orders ledgers.
    seq: u64,
    created_at: DateTime<Utc>,
    origin: Option<InvoiceId>,
    note: Option<String>,
    snapshot: Option<StockSnapshot>,
}

impl StockMovement {
    pub fn create(
        id: MovementId,
        seq: u64,
        created_at: DateTime<Utc>,
        draft: MovementDraft,
    ) -> DomainResult<Self> {
        if draft.qty_in < 0 || draft.qty_out < 0 {
            return Err(DomainError::validation("movement quantities cannot be negative"));
        }
        let in_set = draft.qty_in > 0;
        let out_set = draft.qty_out > 0;
        if in_set == out_set {
            return Err(DomainError::validation(
                "exactly one of qty_in/qty_out must be nonzero",
            ));
        }
        match draft.kind {
            MovementKind::PurchaseLine if !in_set => {
                return Err(DomainError::validation("purchase line must be inbound"));
            }
            MovementKind::SaleLine if !out_set => {
                return Err(DomainError::validation("sale line must be outbound"));
            }
            MovementKind::ManualAdjustment if draft.snapshot.is_none() => {
                return Err(DomainError::validation(
                    "manual adjustment requires a stock snapshot",
                ));
            }
            _ => {}
        }

        Ok(Self {
            id,
            tenant_id: draft.tenant_id,
            product_id: draft.product_id,
            kind: draft.kind,
            qty_in: draft.qty_in,
            qty_out: draft.qty_out,
            date: draft.date,
            seq,
            created_at,
            origin: draft.origin,
            note: draft.note,
            snapshot: draft.snapshot,
        })
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn kind(&self) -> MovementKind {
        self.kind
    }

    pub fn qty_in(&self) -> i64 {
        self.qty_in
    }

    pub fn qty_out(&self) -> i64 {
        self.qty_out
    }

    /// Net signed effect on stock.
    pub fn net(&self) -> i64 {
        self.qty_in - self.qty_out
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

    pub fn origin(&self) -> Option<InvoiceId> {
        self.origin
    }

    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    pub fn snapshot(&self) -> Option<StockSnapshot> {
        self.snapshot
    }
}
