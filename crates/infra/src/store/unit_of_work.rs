use std::collections::BTreeMap;

use stockroom_core::{AggregateRoot, DomainError, DomainResult, OrderId, ProductId};
use stockroom_products::ProductGeneration;
use stockroom_sales::Order;

use super::{ChangeSet, Committed, ShopStore, Write};

/// Staged reads and writes of one operation.
///
/// The first access to an entity loads it from the store and remembers the
/// version it was read at; later accesses see the staged copy. Dropping the
/// unit of work discards everything.
pub struct UnitOfWork<'s, S: ShopStore + ?Sized> {
    store: &'s S,
    products: BTreeMap<ProductId, Write<ProductGeneration>>,
    orders: BTreeMap<OrderId, Write<Order>>,
}

impl<'s, S: ShopStore + ?Sized> UnitOfWork<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            products: BTreeMap::new(),
            orders: BTreeMap::new(),
        }
    }

    /// Staged generation, loading it on first access. Inactive generations are
    /// returned as-is; callers decide how to treat them.
    pub fn product(&mut self, id: ProductId) -> DomainResult<&mut ProductGeneration> {
        if !self.products.contains_key(&id) {
            let loaded = self
                .store
                .find_product(id)?
                .ok_or_else(|| DomainError::not_found(format!("product {id}")))?;
            self.products.insert(
                id,
                Write::Update {
                    expected_version: loaded.version(),
                    value: loaded,
                },
            );
        }
        self.products
            .get_mut(&id)
            .map(Write::value_mut)
            .ok_or_else(|| DomainError::store("staged product vanished"))
    }

    /// Staged order, loading it on first access.
    pub fn order(&mut self, id: OrderId) -> DomainResult<&mut Order> {
        if !self.orders.contains_key(&id) {
            let loaded = self
                .store
                .find_order(id)?
                .ok_or_else(|| DomainError::not_found(format!("order {id}")))?;
            self.orders.insert(
                id,
                Write::Update {
                    expected_version: loaded.version(),
                    value: loaded,
                },
            );
        }
        self.orders
            .get_mut(&id)
            .map(Write::value_mut)
            .ok_or_else(|| DomainError::store("staged order vanished"))
    }

    pub fn insert_product(&mut self, product: ProductGeneration) {
        self.products.insert(product.id_typed(), Write::Insert(product));
    }

    pub fn insert_order(&mut self, order: Order) {
        self.orders.insert(order.id_typed(), Write::Insert(order));
    }

    pub fn into_changes(self) -> ChangeSet {
        ChangeSet {
            products: self.products.into_values().collect(),
            orders: self.orders.into_values().collect(),
        }
    }

    /// Hand every staged write to the store as one atomic change set.
    pub fn commit(self) -> DomainResult<Committed> {
        let store = self.store;
        store.commit(self.into_changes())
    }
}
