//! Durable store boundary for product generations and orders.
//!
//! Reads return owned snapshots. Writes are staged in a [`UnitOfWork`] and
//! committed as one [`ChangeSet`]: every staged update carries the version it
//! was read at, and the store applies the whole set only if all of them still
//! match (compare-and-swap). Nothing is applied on failure.

pub mod in_memory;
#[cfg(test)]
pub(crate) mod racing;
pub mod unit_of_work;

use std::sync::Arc;

use stockroom_core::{DomainResult, OrderId, ProductId};
use stockroom_products::ProductGeneration;
use stockroom_sales::{Order, OrderStatus};

pub use in_memory::InMemoryShopStore;
pub use unit_of_work::UnitOfWork;

/// One staged write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write<T> {
    /// New entity; the id must not exist yet.
    Insert(T),
    /// Replace an existing entity that must still be at `expected_version`.
    Update { expected_version: u64, value: T },
}

impl<T> Write<T> {
    pub fn value(&self) -> &T {
        match self {
            Write::Insert(v) => v,
            Write::Update { value, .. } => value,
        }
    }

    pub fn value_mut(&mut self) -> &mut T {
        match self {
            Write::Insert(v) => v,
            Write::Update { value, .. } => value,
        }
    }
}

/// All writes of one unit of work, applied atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub products: Vec<Write<ProductGeneration>>,
    pub orders: Vec<Write<Order>>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.orders.is_empty()
    }
}

/// Entities as persisted by a successful commit (with their new versions).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committed {
    pub products: Vec<ProductGeneration>,
    pub orders: Vec<Order>,
}

impl Committed {
    pub fn product(&self, id: ProductId) -> Option<&ProductGeneration> {
        self.products.iter().find(|p| p.id_typed() == id)
    }

    pub fn order(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id_typed() == id)
    }
}

/// Store for product generations and orders.
///
/// Implementations must:
/// - apply a `ChangeSet` all-or-nothing
/// - fail with `DomainError::ConcurrencyConflict` when an update's expected
///   version is stale, when an updated entity is missing, or when an insert
///   collides with an existing id
/// - assign version 0 on insert and `expected_version + 1` on update
/// - keep `find_orders_referencing` consistent with committed line items
pub trait ShopStore: Send + Sync {
    fn find_product(&self, id: ProductId) -> DomainResult<Option<ProductGeneration>>;

    /// Every generation, active or not, in creation order.
    fn list_products(&self) -> DomainResult<Vec<ProductGeneration>>;

    fn find_order(&self, id: OrderId) -> DomainResult<Option<Order>>;

    /// Every order in creation order.
    fn list_orders(&self) -> DomainResult<Vec<Order>>;

    fn find_orders_by_status(&self, status: OrderStatus) -> DomainResult<Vec<Order>>;

    /// Orders with at least one line item bound to `product_id`.
    fn find_orders_referencing(&self, product_id: ProductId) -> DomainResult<Vec<Order>>;

    fn commit(&self, changes: ChangeSet) -> DomainResult<Committed>;
}

impl<S> ShopStore for Arc<S>
where
    S: ShopStore + ?Sized,
{
    fn find_product(&self, id: ProductId) -> DomainResult<Option<ProductGeneration>> {
        (**self).find_product(id)
    }

    fn list_products(&self) -> DomainResult<Vec<ProductGeneration>> {
        (**self).list_products()
    }

    fn find_order(&self, id: OrderId) -> DomainResult<Option<Order>> {
        (**self).find_order(id)
    }

    fn list_orders(&self) -> DomainResult<Vec<Order>> {
        (**self).list_orders()
    }

    fn find_orders_by_status(&self, status: OrderStatus) -> DomainResult<Vec<Order>> {
        (**self).find_orders_by_status(status)
    }

    fn find_orders_referencing(&self, product_id: ProductId) -> DomainResult<Vec<Order>> {
        (**self).find_orders_referencing(product_id)
    }

    fn commit(&self, changes: ChangeSet) -> DomainResult<Committed> {
        (**self).commit(changes)
    }
}
