use std::sync::Arc;

use anyhow::Context;

use stockroom_core::{DomainResult, SystemClock};
use stockroom_infra::{
    ExpiryReaper, InMemoryShopStore, OrderLifecycle, ProductRevisioning, ShopConfig, ShopStore,
    seed,
};
use stockroom_sales::Order;

use crate::app::dto;

pub type Store = Arc<InMemoryShopStore>;
pub type Lifecycle = OrderLifecycle<Store, SystemClock>;
pub type Catalog = ProductRevisioning<Store>;
pub type Reaper = ExpiryReaper<Store, SystemClock>;

/// Shared state handed to every handler.
pub struct AppServices {
    store: Store,
    orders: Arc<Lifecycle>,
    catalog: Catalog,
    reaper: Arc<Reaper>,
}

/// Wire the in-memory store and services from `config`, seeding demo data
/// when asked to.
pub fn build_services(config: &ShopConfig) -> anyhow::Result<AppServices> {
    let ttl = config.order_ttl_chrono()?;
    let store: Store = Arc::new(InMemoryShopStore::new());

    if config.seed_demo_data {
        seed::seed_demo_data(&store, &SystemClock, ttl).context("failed to seed demo data")?;
    }

    let orders = Arc::new(OrderLifecycle::new(Arc::clone(&store), SystemClock).with_ttl(ttl));
    let catalog = ProductRevisioning::new(Arc::clone(&store));
    let reaper = Arc::new(ExpiryReaper::new(Arc::clone(&orders)));

    Ok(AppServices {
        store,
        orders,
        catalog,
        reaper,
    })
}

impl AppServices {
    pub fn orders(&self) -> &Lifecycle {
        &self.orders
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Reaper over the same lifecycle the handlers use; `main` hands it to
    /// the background runner.
    pub fn reaper(&self) -> Arc<Reaper> {
        Arc::clone(&self.reaper)
    }

    /// Render an order with the names of the generations its lines are bound
    /// to. Superseded generations still resolve here.
    pub fn order_view(&self, order: &Order) -> DomainResult<serde_json::Value> {
        let mut names = Vec::with_capacity(order.items().len());
        for item in order.items() {
            let name = self
                .store
                .find_product(item.product_id())?
                .map(|p| p.name().to_string());
            names.push(name);
        }
        Ok(dto::order_to_json(order, &names))
    }
}
