//! `billkeep-store` — record storage and the reconciliation engine facade.
//!
//! The engine is the only writer of invoices, payment events, movements,
//! and product stock. Every multi-step mutation validates all of its
//! preconditions before the first write, and every write to a shared
//! scalar happens under a per-record lock.

pub mod engine;
pub mod locks;
pub mod records;


pub use engine::{
    AdjustStock, AdjustmentDirection, CreateInvoice, Engine, EngineError, EngineResult,
    LedgerQuery, LineInput, PostPaymentEvent, StockLedgerReport, StockQuery,
};
pub use locks::KeyedLocks;
pub use records::{InMemoryRecords, RecordStore, SeqAllocator};
