//! Test store that lets a competing operation commit first.

use std::sync::{Arc, Mutex};

use stockroom_core::{DomainResult, OrderId, ProductId};
use stockroom_products::ProductGeneration;
use stockroom_sales::{Order, OrderStatus};

use super::{ChangeSet, Committed, InMemoryShopStore, ShopStore};

type Hook = Box<dyn FnOnce() + Send>;

/// Delegates to an in-memory store and runs a one-shot hook right before the
/// first commit that passes through it. Reads made by the wrapped operation
/// are therefore stale by the time it commits.
pub(crate) struct RacingStore {
    inner: Arc<InMemoryShopStore>,
    before_commit: Mutex<Option<Hook>>,
}

impl RacingStore {
    pub(crate) fn new(inner: Arc<InMemoryShopStore>, hook: impl FnOnce() + Send + 'static) -> Self {
        Self {
            inner,
            before_commit: Mutex::new(Some(Box::new(hook))),
        }
    }
}

impl ShopStore for RacingStore {
    fn find_product(&self, id: ProductId) -> DomainResult<Option<ProductGeneration>> {
        self.inner.find_product(id)
    }

    fn list_products(&self) -> DomainResult<Vec<ProductGeneration>> {
        self.inner.list_products()
    }

    fn find_order(&self, id: OrderId) -> DomainResult<Option<Order>> {
        self.inner.find_order(id)
    }

    fn list_orders(&self) -> DomainResult<Vec<Order>> {
        self.inner.list_orders()
    }

    fn find_orders_by_status(&self, status: OrderStatus) -> DomainResult<Vec<Order>> {
        self.inner.find_orders_by_status(status)
    }

    fn find_orders_referencing(&self, product_id: ProductId) -> DomainResult<Vec<Order>> {
        self.inner.find_orders_referencing(product_id)
    }

    fn commit(&self, changes: ChangeSet) -> DomainResult<Committed> {
        let hook = self.before_commit.lock().unwrap().take();
        if let Some(hook) = hook {
            hook();
        }
        self.inner.commit(changes)
    }
}
