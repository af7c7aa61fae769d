//! `billkeep-payments` — payment/receipt events and bill-wise allocation.
//!
//! A payment event either targets one invoice (bill-wise) or floats as an
//! on-account party transaction. The resolver validates the link and hands
//! the balance change to the invoicing crate's mutator.

pub mod event;
pub mod resolver;

pub use event::{AllocationTarget, NewPaymentEvent, PaymentEvent, PaymentKind, PaymentMethod};
pub use resolver::{Allocation, adopt_party, resolve};
