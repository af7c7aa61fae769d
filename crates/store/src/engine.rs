//! The reconciliation engine facade.
//!
//! Invoice-creating operations seed balance state and stock movements;
//! standalone payment events go through the allocation resolver; deletions
//! reverse their balance/stock effects and cascade over dependent records.
//! Ledger and outstanding queries are pure snapshots.
//!
//! Ordering discipline: every precondition across a multi-step mutation is
//! validated before the first write, and writes to an invoice's balance or
//! a product's stock happen under that record's mutation lock.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use billkeep_core::{
    Amount, DomainError, InvoiceId, MovementId, PartyId, PaymentEventId, ProductId, TenantId,
};
use billkeep_inventory::{
    MovementDraft, MovementKind, Product, StockLedgerRow, StockMovement, StockSnapshot, stock,
};
use billkeep_invoicing::{Invoice, InvoiceKind, LineItem, NewInvoice};
use billkeep_parties::Party;
use billkeep_payments::{
    AllocationTarget, NewPaymentEvent, PaymentEvent, PaymentKind, PaymentMethod, adopt_party,
    resolve,
};
use billkeep_reports::{OutstandingReport, PartyLedgerEntry, aggregate, merge_ledger};

use crate::locks::{KeyedLocks, acquire};
use crate::records::{InMemoryRecords, RecordStore, SeqAllocator};

/// Engine-boundary error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A precondition failed; nothing was written.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Unexpected storage failure. Best effort: log and report, no
    /// partial-state guarantee.
    #[error("storage failure: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// One requested invoice line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInput {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Amount,
}

/// Create a sale or purchase invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateInvoice {
    pub tenant_id: TenantId,
    pub kind: InvoiceKind,
    pub party_id: Option<PartyId>,
    pub lines: Vec<LineInput>,
    /// Header total; defaults to the line sum when absent.
    pub total_amount: Option<Amount>,
    /// Paid at creation; a matching bill-wise event is recorded for it.
    pub paid_now: Amount,
    /// Method for the companion event when `paid_now > 0`.
    pub method: Option<PaymentMethod>,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Post a standalone payment or receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPaymentEvent {
    pub tenant_id: TenantId,
    pub kind: PaymentKind,
    pub amount: Amount,
    pub method: PaymentMethod,
    pub target: AllocationTarget,
    pub party_id: Option<PartyId>,
    pub date: NaiveDate,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentDirection {
    Add,
    Subtract,
}

/// Record a manual stock adjustment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdjustStock {
    pub tenant_id: TenantId,
    pub product_id: ProductId,
    pub direction: AdjustmentDirection,
    pub quantity: i64,
    pub date: NaiveDate,
    pub note: Option<String>,
}

/// Filters for the party ledger query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerQuery {
    pub party_id: Option<PartyId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Filters for the stock ledger query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub product_id: Option<ProductId>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Stock ledger plus the live stock snapshot per product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockLedgerReport {
    /// Chronological rows. With a date-bounded query the running quantity
    /// is relative to the window, not the absolute stock level.
    pub ledger: Vec<StockLedgerRow>,
    /// Live `current_stock` per product, sorted by name.
    pub current_stock: Vec<Product>,
}

/// The engine. Sole writer of invoices, events, movements, and stock.
pub struct Engine {
    parties: Arc<dyn RecordStore<PartyId, Party>>,
    products: Arc<dyn RecordStore<ProductId, Product>>,
    invoices: Arc<dyn RecordStore<InvoiceId, Invoice>>,
    events: Arc<dyn RecordStore<PaymentEventId, PaymentEvent>>,
    movements: Arc<dyn RecordStore<MovementId, StockMovement>>,
    locks: KeyedLocks,
    seq: SeqAllocator,
}

impl Engine {
    /// Engine over in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            parties: Arc::new(InMemoryRecords::new()),
            products: Arc::new(InMemoryRecords::new()),
            invoices: Arc::new(InMemoryRecords::new()),
            events: Arc::new(InMemoryRecords::new()),
            movements: Arc::new(InMemoryRecords::new()),
            locks: KeyedLocks::new(),
            seq: SeqAllocator::new(),
        }
    }

    // ---- master data (input to the engine, managed elsewhere) ----

    pub fn register_party(&self, party: Party) -> EngineResult<()> {
        self.parties.upsert(party.tenant_id, party.id, party)?;
        Ok(())
    }

    pub fn register_product(&self, product: Product) -> EngineResult<()> {
        self.products.upsert(product.tenant_id, product.id, product)?;
        Ok(())
    }

    // ---- invoices ----

    /// Create an invoice, seed its balance, and apply its stock movements.
    ///
    /// All preconditions (party exists, products exist, enough stock for
    /// every sale line, `paid_now` within the total) are validated before
    /// the first write.
    pub fn create_invoice(&self, cmd: CreateInvoice) -> EngineResult<Invoice> {
        let tenant = cmd.tenant_id;

        if cmd.paid_now < 0 {
            return Err(DomainError::validation("paid amount cannot be negative").into());
        }
        let mut lines = Vec::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            lines.push(LineItem::new(line.product_id, line.quantity, line.unit_price)?);
        }
        let mut line_sum: Amount = 0;
        for line in &lines {
            line_sum = line_sum
                .checked_add(line.line_total)
                .ok_or_else(|| DomainError::validation("invoice total overflow"))?;
        }
        let total = cmd.total_amount.unwrap_or(line_sum);
        if cmd.paid_now > total {
            return Err(DomainError::AmountExceedsBalance.into());
        }
        if let Some(party_id) = cmd.party_id {
            self.parties
                .get(tenant, &party_id)?
                .ok_or(DomainError::NotFound)?;
        }

        // Serialize against other writers of the same products.
        let product_keys: Vec<Uuid> = lines.iter().map(|l| *l.product_id.as_uuid()).collect();
        let slots = self.locks.slots_ordered(tenant, &product_keys);
        let _guards: Vec<_> = slots.iter().map(|s| acquire(s)).collect();

        let mut touched: HashMap<ProductId, Product> = HashMap::new();
        for line in &lines {
            if !touched.contains_key(&line.product_id) {
                let product = self
                    .products
                    .get(tenant, &line.product_id)?
                    .ok_or(DomainError::NotFound)?;
                touched.insert(line.product_id, product);
            }
        }

        let invoice_id = InvoiceId::new();
        let invoice_seq = self.seq.next(tenant);
        let now = Utc::now();

        // Stage movements against an in-memory copy of the stock so a
        // failing line leaves nothing written.
        let mut staged: Vec<StockMovement> = Vec::with_capacity(lines.len());
        for line in &lines {
            let (kind, qty_in, qty_out) = match cmd.kind {
                InvoiceKind::Purchase => (MovementKind::PurchaseLine, line.quantity, 0),
                InvoiceKind::Sale => (MovementKind::SaleLine, 0, line.quantity),
            };
            let movement = StockMovement::create(
                MovementId::new(),
                self.seq.next(tenant),
                now,
                MovementDraft {
                    tenant_id: tenant,
                    product_id: line.product_id,
                    kind,
                    qty_in,
                    qty_out,
                    date: cmd.date,
                    origin: Some(invoice_id),
                    note: None,
                    snapshot: None,
                },
            )?;
            let product = touched
                .get_mut(&line.product_id)
                .ok_or(DomainError::NotFound)?;
            product.current_stock = stock::apply_movement(product.current_stock, &movement)?;
            staged.push(movement);
        }

        let invoice = Invoice::create(
            invoice_id,
            invoice_seq,
            now,
            NewInvoice {
                tenant_id: tenant,
                kind: cmd.kind,
                party_id: cmd.party_id,
                lines,
                total_amount: cmd.total_amount,
                paid_now: cmd.paid_now,
                date: cmd.date,
                note: cmd.note,
            },
        )?;

        // Preconditions all passed; persist.
        for movement in staged {
            self.movements.upsert(tenant, movement.id(), movement)?;
        }
        for product in touched.into_values() {
            self.products.upsert(tenant, product.id, product)?;
        }
        self.invoices.upsert(tenant, invoice_id, invoice.clone())?;

        // The invoice was seeded with `paid_now`, so the companion event is
        // recorded without running another payment delta.
        if cmd.paid_now > 0 {
            let event = PaymentEvent::create(
                PaymentEventId::new(),
                self.seq.next(tenant),
                now,
                NewPaymentEvent {
                    tenant_id: tenant,
                    kind: match cmd.kind {
                        InvoiceKind::Sale => PaymentKind::Receipt,
                        InvoiceKind::Purchase => PaymentKind::Payment,
                    },
                    amount: cmd.paid_now,
                    method: cmd.method.unwrap_or(PaymentMethod::Cash),
                    target: AllocationTarget::Invoice(invoice_id),
                    party_id: invoice.party_id(),
                    date: cmd.date,
                    note: None,
                },
            )?;
            self.events.upsert(tenant, event.id(), event)?;
        }

        info!(invoice = %invoice_id, kind = ?cmd.kind, total, "invoice created");
        Ok(invoice)
    }

    /// Edit an invoice's header total, carrying its paid amount over.
    pub fn edit_invoice_total(
        &self,
        tenant: TenantId,
        invoice_id: InvoiceId,
        new_total: Amount,
    ) -> EngineResult<Invoice> {
        let slot = self.locks.slot(tenant, *invoice_id.as_uuid());
        let _guard = acquire(&slot);

        let mut invoice = self
            .invoices
            .get(tenant, &invoice_id)?
            .ok_or(DomainError::NotFound)?;
        invoice.set_total(new_total)?;
        self.invoices.upsert(tenant, invoice_id, invoice.clone())?;
        info!(invoice = %invoice_id, new_total, "invoice total edited");
        Ok(invoice)
    }

    /// Delete an invoice, reversing its stock movements and cascading over
    /// the payment events linked to it.
    pub fn delete_invoice(&self, tenant: TenantId, invoice_id: InvoiceId) -> EngineResult<()> {
        let slot = self.locks.slot(tenant, *invoice_id.as_uuid());
        let _guard = acquire(&slot);

        self.invoices
            .get(tenant, &invoice_id)?
            .ok_or(DomainError::NotFound)?;

        let movements: Vec<StockMovement> = self
            .movements
            .list(tenant)?
            .into_iter()
            .filter(|m| m.origin() == Some(invoice_id))
            .collect();

        let product_keys: Vec<Uuid> = movements
            .iter()
            .map(|m| *m.product_id().as_uuid())
            .collect();
        let slots = self.locks.slots_ordered(tenant, &product_keys);
        let _product_guards: Vec<_> = slots.iter().map(|s| acquire(s)).collect();

        for movement in &movements {
            if let Some(mut product) = self.products.get(tenant, &movement.product_id())? {
                product.current_stock = stock::reverse_movement(product.current_stock, movement);
                self.products.upsert(tenant, product.id, product)?;
            }
            self.movements.remove(tenant, &movement.id())?;
        }

        // No dangling bill-wise references may survive the invoice.
        for event in self.events.list(tenant)? {
            if event.settles(invoice_id) {
                self.events.remove(tenant, &event.id())?;
            }
        }

        self.invoices.remove(tenant, &invoice_id)?;
        info!(invoice = %invoice_id, "invoice deleted");
        Ok(())
    }

    // ---- payment events ----

    /// Post a payment or receipt, bill-wise or on-account.
    pub fn post_payment_event(&self, cmd: PostPaymentEvent) -> EngineResult<PaymentEvent> {
        let tenant = cmd.tenant_id;
        let mut event = PaymentEvent::create(
            PaymentEventId::new(),
            self.seq.next(tenant),
            Utc::now(),
            NewPaymentEvent {
                tenant_id: tenant,
                kind: cmd.kind,
                amount: cmd.amount,
                method: cmd.method,
                target: cmd.target,
                party_id: cmd.party_id,
                date: cmd.date,
                note: cmd.note,
            },
        )?;

        match event.target() {
            AllocationTarget::OnAccount => {
                if let Some(party_id) = event.party_id() {
                    self.parties
                        .get(tenant, &party_id)?
                        .ok_or(DomainError::NotFound)?;
                }
                self.events.upsert(tenant, event.id(), event.clone())?;
            }
            AllocationTarget::Invoice(invoice_id) => {
                let slot = self.locks.slot(tenant, *invoice_id.as_uuid());
                let _guard = acquire(&slot);

                let invoice = self.invoices.get(tenant, &invoice_id)?;
                let allocation = resolve(&event, invoice.as_ref())?;
                let mut invoice = invoice.ok_or(DomainError::TargetNotFound)?;
                invoice.record_payment(event.amount())?;
                adopt_party(&mut event, &allocation);

                self.invoices.upsert(tenant, invoice_id, invoice)?;
                self.events.upsert(tenant, event.id(), event.clone())?;
            }
        }

        info!(event = %event.id(), kind = ?event.kind(), amount = event.amount(), "payment event posted");
        Ok(event)
    }

    /// Delete a payment event, reversing its bill-wise balance effect.
    ///
    /// The event is removed under the target invoice's lock, and the
    /// balance is reversed only by the caller whose remove actually took
    /// the record; a concurrent delete of the same event loses with
    /// `NotFound` instead of reversing twice.
    pub fn delete_payment_event(
        &self,
        tenant: TenantId,
        event_id: PaymentEventId,
    ) -> EngineResult<()> {
        let event = self
            .events
            .get(tenant, &event_id)?
            .ok_or(DomainError::NotFound)?;

        match event.target() {
            AllocationTarget::Invoice(invoice_id) => {
                let slot = self.locks.slot(tenant, *invoice_id.as_uuid());
                let _guard = acquire(&slot);

                let Some(event) = self.events.remove(tenant, &event_id)? else {
                    return Err(DomainError::NotFound.into());
                };
                // The invoice may already be gone; then there is nothing
                // to reverse.
                if let Some(mut invoice) = self.invoices.get(tenant, &invoice_id)? {
                    invoice.reverse_payment(event.amount())?;
                    self.invoices.upsert(tenant, invoice_id, invoice)?;
                }
            }
            AllocationTarget::OnAccount => {
                if self.events.remove(tenant, &event_id)?.is_none() {
                    return Err(DomainError::NotFound.into());
                }
            }
        }

        info!(event = %event_id, "payment event deleted");
        Ok(())
    }

    // ---- stock ----

    /// Record a manual stock adjustment with its before/after snapshot.
    pub fn adjust_stock(&self, cmd: AdjustStock) -> EngineResult<Product> {
        let tenant = cmd.tenant_id;
        if cmd.quantity <= 0 {
            return Err(DomainError::validation("adjustment quantity must be positive").into());
        }

        let slot = self.locks.slot(tenant, *cmd.product_id.as_uuid());
        let _guard = acquire(&slot);

        let mut product = self
            .products
            .get(tenant, &cmd.product_id)?
            .ok_or(DomainError::NotFound)?;

        let (qty_in, qty_out) = match cmd.direction {
            AdjustmentDirection::Add => (cmd.quantity, 0),
            AdjustmentDirection::Subtract => (0, cmd.quantity),
        };
        if qty_out > product.current_stock {
            return Err(DomainError::InsufficientStock.into());
        }

        let before = product.current_stock;
        let movement = StockMovement::create(
            MovementId::new(),
            self.seq.next(tenant),
            Utc::now(),
            MovementDraft {
                tenant_id: tenant,
                product_id: cmd.product_id,
                kind: MovementKind::ManualAdjustment,
                qty_in,
                qty_out,
                date: cmd.date,
                origin: None,
                note: cmd.note,
                snapshot: Some(StockSnapshot {
                    stock_before: before,
                    stock_after: before + qty_in - qty_out,
                }),
            },
        )?;
        product.current_stock = stock::apply_movement(before, &movement)?;

        self.movements.upsert(tenant, movement.id(), movement)?;
        self.products
            .upsert(tenant, product.id, product.clone())?;
        info!(product = %product.id, stock = product.current_stock, "stock adjusted");
        Ok(product)
    }

    // ---- read-side projections (pure, lock-free) ----

    /// Merged party transaction ledger with a running balance.
    ///
    /// The fold seeds at 0 for whatever window was queried; a date-bounded
    /// ledger's running balance is relative to that window.
    pub fn party_ledger(
        &self,
        tenant: TenantId,
        query: LedgerQuery,
    ) -> EngineResult<Vec<PartyLedgerEntry>> {
        let wants = |party: Option<PartyId>, date: NaiveDate| {
            query.party_id.is_none_or(|want| party == Some(want))
                && query.from.is_none_or(|from| date >= from)
                && query.to.is_none_or(|to| date <= to)
        };

        let mut sales = Vec::new();
        let mut purchases = Vec::new();
        for invoice in self.invoices.list(tenant)? {
            if wants(invoice.party_id(), invoice.date()) {
                match invoice.kind() {
                    InvoiceKind::Sale => sales.push(invoice),
                    InvoiceKind::Purchase => purchases.push(invoice),
                }
            }
        }
        let mut receipts = Vec::new();
        let mut payments = Vec::new();
        for event in self.events.list(tenant)? {
            if wants(event.party_id(), event.date()) {
                match event.kind() {
                    PaymentKind::Receipt => receipts.push(event),
                    PaymentKind::Payment => payments.push(event),
                }
            }
        }

        Ok(merge_ledger(&sales, &purchases, &receipts, &payments))
    }

    /// Chronological stock ledger plus the live stock snapshot.
    pub fn stock_ledger(
        &self,
        tenant: TenantId,
        query: StockQuery,
    ) -> EngineResult<StockLedgerReport> {
        let movements: Vec<StockMovement> = self
            .movements
            .list(tenant)?
            .into_iter()
            .filter(|m| {
                query.product_id.is_none_or(|want| m.product_id() == want)
                    && query.from.is_none_or(|from| m.date() >= from)
                    && query.to.is_none_or(|to| m.date() <= to)
            })
            .collect();
        let ledger = billkeep_inventory::project_ledger(movements);

        let mut current_stock: Vec<Product> = self
            .products
            .list(tenant)?
            .into_iter()
            .filter(|p| query.product_id.is_none_or(|want| p.id == want))
            .collect();
        current_stock.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(StockLedgerReport {
            ledger,
            current_stock,
        })
    }

    /// Receivable/payable roll-up and pending invoice lists.
    pub fn outstanding_report(&self, tenant: TenantId) -> EngineResult<OutstandingReport> {
        let mut sales = Vec::new();
        let mut purchases = Vec::new();
        for invoice in self.invoices.list(tenant)? {
            match invoice.kind() {
                InvoiceKind::Sale => sales.push(invoice),
                InvoiceKind::Purchase => purchases.push(invoice),
            }
        }
        let mut receipts = Vec::new();
        let mut payments = Vec::new();
        for event in self.events.list(tenant)? {
            match event.kind() {
                PaymentKind::Receipt => receipts.push(event),
                PaymentKind::Payment => payments.push(event),
            }
        }
        let parties = self.parties.list(tenant)?;

        Ok(aggregate(&sales, &purchases, &receipts, &payments, &parties))
    }

    // ---- point reads ----

    pub fn invoice(&self, tenant: TenantId, id: InvoiceId) -> EngineResult<Option<Invoice>> {
        Ok(self.invoices.get(tenant, &id)?)
    }

    pub fn payment_event(
        &self,
        tenant: TenantId,
        id: PaymentEventId,
    ) -> EngineResult<Option<PaymentEvent>> {
        Ok(self.events.get(tenant, &id)?)
    }

    pub fn product(&self, tenant: TenantId, id: ProductId) -> EngineResult<Option<Product>> {
        Ok(self.products.get(tenant, &id)?)
    }

    /// Payment events linked to one invoice.
    pub fn events_for_invoice(
        &self,
        tenant: TenantId,
        invoice_id: InvoiceId,
    ) -> EngineResult<Vec<PaymentEvent>> {
        let mut linked: Vec<PaymentEvent> = self
            .events
            .list(tenant)?
            .into_iter()
            .filter(|e| e.settles(invoice_id))
            .collect();
        linked.sort_by_key(|e| e.seq());
        Ok(linked)
    }
}
