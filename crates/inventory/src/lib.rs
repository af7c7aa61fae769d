//! `billkeep-inventory` — products, stock movements, and the stock ledger.
//!
//! `Product.current_stock` is a materialized scalar updated eagerly as
//! movements are applied; the chronological projection in [`stock`] is the
//! read-side view reporting runs over.

pub mod movement;
pub mod product;
pub mod stock;

pub use movement::{MovementDraft, MovementKind, StockMovement, StockSnapshot};
pub use product::Product;
pub use stock::{StockLedgerRow, apply_movement, project_ledger, reverse_movement};
