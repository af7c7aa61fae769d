//! `billkeep-core` — shared domain primitives for the billing engine.
//!
//! Pure types only: identifiers, the domain error taxonomy, and monetary
//! amount helpers. No storage or I/O concerns live here.

pub mod amount;
pub mod error;
pub mod id;

pub use amount::{Amount, clamp_non_negative, to_amount};
pub use error::{DomainError, DomainResult};
pub use id::{InvoiceId, MovementId, PartyId, PaymentEventId, ProductId, TenantId};
