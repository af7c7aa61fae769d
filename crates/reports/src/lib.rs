//! `billkeep-reports` — read-side projections.
//!
//! Both reports here are pure: they scan current records and recompute a
//! view, never mutating state. They run safely concurrent with anything.

pub mod outstanding;
pub mod party_ledger;

pub use outstanding::{
    OutstandingReport, OutstandingTotals, PartyOutstanding, PendingInvoice, aggregate,
};
pub use party_ledger::{LedgerEntryKind, LedgerRef, PartyLedgerEntry, merge_ledger};
