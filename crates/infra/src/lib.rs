//! Infrastructure layer: store, inventory-consistency services, background
//! reaper, config.
//!
//! Every mutating operation stages its writes in a [`store::UnitOfWork`] and
//! commits them as one versioned change set.

pub mod config;
pub mod ledger;
pub mod lifecycle;
pub mod reaper;
pub mod revisioning;
pub mod seed;
pub mod store;

pub use config::ShopConfig;
pub use ledger::StockLedger;
pub use lifecycle::{OrderLifecycle, OrderLineRequest};
pub use reaper::{ExpiryReaper, ReaperRunner, ReaperRunnerHandle, ReaperStats, SweepReport};
pub use revisioning::ProductRevisioning;
pub use store::{InMemoryShopStore, ShopStore, UnitOfWork};
