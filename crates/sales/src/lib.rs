//! Sales domain module: orders, their line items and the order state machine.
//!
//! Business rules only (no IO, no HTTP, no storage). Stock effects of a
//! transition are applied by the infrastructure layer around these types.

pub mod order;

pub use order::{LineItem, NewLine, Order, OrderStatus};
