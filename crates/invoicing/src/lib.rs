//! `billkeep-invoicing` — sale/purchase invoices and their balance state.
//!
//! The balance mutator in [`balance`] is the only way `paid_amount`,
//! `balance_amount`, and `payment_status` ever change; callers never edit
//! those fields directly.

pub mod balance;
pub mod invoice;

pub use balance::{BalanceState, initial_state, payment_delta, retotal, status_for};
pub use invoice::{Invoice, InvoiceKind, LineItem, NewInvoice, PaymentStatus};
