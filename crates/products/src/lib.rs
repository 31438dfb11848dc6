//! Product catalog domain module.
//!
//! Product generations and the stock primitives that the inventory engine
//! composes. Pure domain logic: no IO, no storage.

pub mod money;
pub mod product;

pub use money::Money;
pub use product::{ProductFields, ProductGeneration};
