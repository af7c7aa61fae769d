//! `billkeep-parties` — party master data.
//!
//! Parties are read-only input to the reconciliation engine: their
//! outstanding figures are never stored, they are recomputed on read by the
//! reports crate.

pub mod party;

pub use party::{Party, PartyKind};
