//! Stock quantity ledger.
//!
//! Write path: [`apply_movement`]/[`reverse_movement`] guard the live
//! `current_stock` scalar. Read path: [`project_ledger`] folds movements
//! chronologically into a running-quantity sequence for reporting.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use billkeep_core::{DomainError, DomainResult, MovementId, ProductId};

use crate::movement::{MovementKind, StockMovement};

/// Apply a movement to the live stock scalar.
///
/// Outbound movements fail with `InsufficientStock` when the quantity
/// exceeds the stock at the moment of application; inbound movements add
/// unconditionally. The caller persists the movement and the new stock in
/// the same step, under its per-product lock.
pub fn apply_movement(current_stock: i64, movement: &StockMovement) -> DomainResult<i64> {
    if movement.qty_out() > current_stock {
        return Err(DomainError::InsufficientStock);
    }
    Ok(current_stock + movement.net())
}

/// Undo a movement's effect on the live stock scalar (invoice deletion).
///
/// Sale lines are added back; purchase lines are subtracted. If records
/// have drifted and the reversal would go negative, the result is floored
/// at zero and a data-integrity warning is emitted.
pub fn reverse_movement(current_stock: i64, movement: &StockMovement) -> i64 {
    let reversed = current_stock - movement.net();
    if reversed < 0 {
        warn!(
            product = %movement.product_id(),
            current_stock,
            net = movement.net(),
            "stock reversal underflows; flooring at zero"
        );
        return 0;
    }
    reversed
}

/// One row of the projected stock ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLedgerRow {
    pub movement_id: MovementId,
    pub product_id: ProductId,
    pub kind: MovementKind,
    pub date: chrono::NaiveDate,
    pub qty_in: i64,
    pub qty_out: i64,
    /// Running net quantity for this row's product, seeded at 0 at the
    /// start of the queried window. For a date-bounded query this is a
    /// relative figure, not the absolute stock level.
    pub running_qty: i64,
    pub note: Option<String>,
}

/// Merge movements into a chronological per-product running sequence.
///
/// Sorted by `(date, seq)` ascending: the date is the primary key and
/// insertion order breaks ties, so two movements on the same day keep
/// their causal order. Each product's running quantity folds independently
/// from 0.
pub fn project_ledger(mut movements: Vec<StockMovement>) -> Vec<StockLedgerRow> {
    movements.sort_by_key(|m| (m.date(), m.seq()));

    let mut running: HashMap<ProductId, i64> = HashMap::new();
    movements
        .into_iter()
        .map(|m| {
            let acc = running.entry(m.product_id()).or_insert(0);
            *acc += m.net();
            StockLedgerRow {
                movement_id: m.id(),
                product_id: m.product_id(),
                kind: m.kind(),
                date: m.date(),
                qty_in: m.qty_in(),
                qty_out: m.qty_out(),
                running_qty: *acc,
                note: m.note().map(str::to_owned),
            }
        })
        .collect()
}
