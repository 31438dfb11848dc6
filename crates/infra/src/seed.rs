//! Demo grocery catalog for local runs.

use chrono::Duration;
use tracing::info;

use stockroom_core::{Clock, DomainResult, OrderId, ProductId};
use stockroom_products::{Money, ProductFields};

use crate::lifecycle::{OrderLifecycle, OrderLineRequest};
use crate::revisioning::ProductRevisioning;
use crate::store::ShopStore;

/// Name, price in minor units, stock.
const CATALOG: [(&str, u64, u32); 15] = [
    ("Milk", 2990, 50),
    ("Bread", 3990, 30),
    ("Eggs 10pcs", 4990, 40),
    ("Butter", 6990, 25),
    ("Edam Cheese", 8990, 20),
    ("Apples", 2990, 100),
    ("Bananas", 3990, 80),
    ("Potatoes", 1990, 200),
    ("Onions", 1590, 150),
    ("Tomatoes", 4990, 60),
    ("Cucumbers", 1990, 70),
    ("Peppers", 3990, 50),
    ("Pasta", 2990, 100),
    ("Rice", 4990, 80),
    ("Oil", 8990, 40),
];

/// What a seeding run created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub products: Vec<ProductId>,
    pub orders: Vec<OrderId>,
}

impl SeedSummary {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.orders.is_empty()
    }
}

/// Insert the demo catalog and one order per status into an empty store.
///
/// Goes through the regular services, so the pending order holds a real
/// reservation, the completed one keeps its stock debited and the cancelled
/// one has released its stock again. A store holding any product or order
/// is left untouched.
pub fn seed_demo_data<S, C>(store: &S, clock: &C, ttl: Duration) -> DomainResult<SeedSummary>
where
    S: ShopStore + Clone,
    C: Clock + Clone,
{
    if !store.list_products()?.is_empty() || !store.list_orders()?.is_empty() {
        info!("store not empty; skipping demo data");
        return Ok(SeedSummary::default());
    }

    let catalog = ProductRevisioning::new(store.clone());
    let orders = OrderLifecycle::new(store.clone(), clock.clone()).with_ttl(ttl);

    let mut summary = SeedSummary::default();
    for (name, price, stock) in CATALOG {
        let product =
            catalog.create_product(ProductFields::new(name, Money::from_minor(price), stock))?;
        summary.products.push(product.id_typed());
    }

    let line = |idx: usize, quantity: u32| OrderLineRequest {
        product_id: summary.products[idx],
        quantity,
    };

    let pending = orders.create(&[line(0, 2), line(1, 1), line(2, 1)])?;

    let completed = orders.create(&[line(3, 2), line(4, 1), line(5, 3)])?;
    orders.complete(completed.id_typed())?;

    let cancelled = orders.create(&[line(6, 2), line(7, 5)])?;
    orders.cancel(cancelled.id_typed())?;

    summary.orders = vec![
        pending.id_typed(),
        completed.id_typed(),
        cancelled.id_typed(),
    ];

    info!(
        products = summary.products.len(),
        orders = summary.orders.len(),
        "demo data seeded"
    );
    Ok(summary)
}
