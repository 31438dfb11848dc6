use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::RwLock;

use stockroom_core::{AggregateRoot, DomainError, DomainResult, OrderId, ProductId};
use stockroom_products::ProductGeneration;
use stockroom_sales::{Order, OrderStatus};

use super::{ChangeSet, Committed, ShopStore, Write};

#[derive(Debug, Default)]
struct Tables {
    products: BTreeMap<ProductId, ProductGeneration>,
    orders: BTreeMap<OrderId, Order>,
    /// Non-owning back-index: generation → orders with a line bound to it.
    refs: HashMap<ProductId, BTreeSet<OrderId>>,
}

impl Tables {
    fn check_product(&self, write: &Write<ProductGeneration>) -> DomainResult<()> {
        let id = write.value().id_typed();
        check_version(self.products.get(&id).map(|p| p.version()), write, "product", id)
    }

    fn check_order(&self, write: &Write<Order>) -> DomainResult<()> {
        let id = write.value().id_typed();
        check_version(self.orders.get(&id).map(|o| o.version()), write, "order", id)
    }

    fn index_order(&mut self, order: &Order) {
        if let Some(previous) = self.orders.get(&order.id_typed()) {
            for item in previous.items() {
                if let Some(set) = self.refs.get_mut(&item.product_id()) {
                    set.remove(&order.id_typed());
                    if set.is_empty() {
                        self.refs.remove(&item.product_id());
                    }
                }
            }
        }
        for item in order.items() {
            self.refs
                .entry(item.product_id())
                .or_default()
                .insert(order.id_typed());
        }
    }
}

fn check_version<T>(
    current: Option<u64>,
    write: &Write<T>,
    kind: &str,
    id: impl core::fmt::Display,
) -> DomainResult<()> {
    match (write, current) {
        (Write::Insert(_), None) => Ok(()),
        (Write::Insert(_), Some(_)) => Err(DomainError::conflict(format!(
            "{kind} {id} already exists"
        ))),
        (Write::Update { .. }, None) => Err(DomainError::conflict(format!(
            "{kind} {id} disappeared before commit"
        ))),
        (Write::Update { expected_version, .. }, Some(actual)) if *expected_version != actual => {
            Err(DomainError::conflict(format!(
                "{kind} {id} is at version {actual}, expected {expected_version}"
            )))
        }
        (Write::Update { .. }, Some(_)) => Ok(()),
    }
}

fn persisted_version<T>(write: &Write<T>) -> u64 {
    match write {
        Write::Insert(_) => 0,
        Write::Update { expected_version, .. } => expected_version + 1,
    }
}

/// In-memory store.
///
/// A single `RwLock` over all tables makes every commit serializable; the
/// version checks still decide whether a unit of work read stale data.
#[derive(Debug, Default)]
pub struct InMemoryShopStore {
    tables: RwLock<Tables>,
}

impl InMemoryShopStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> DomainResult<T> {
        let tables = self
            .tables
            .read()
            .map_err(|_| DomainError::store("lock poisoned"))?;
        Ok(f(&tables))
    }
}

impl ShopStore for InMemoryShopStore {
    fn find_product(&self, id: ProductId) -> DomainResult<Option<ProductGeneration>> {
        self.read(|t| t.products.get(&id).cloned())
    }

    fn list_products(&self) -> DomainResult<Vec<ProductGeneration>> {
        self.read(|t| t.products.values().cloned().collect())
    }

    fn find_order(&self, id: OrderId) -> DomainResult<Option<Order>> {
        self.read(|t| t.orders.get(&id).cloned())
    }

    fn list_orders(&self) -> DomainResult<Vec<Order>> {
        self.read(|t| t.orders.values().cloned().collect())
    }

    fn find_orders_by_status(&self, status: OrderStatus) -> DomainResult<Vec<Order>> {
        self.read(|t| {
            t.orders
                .values()
                .filter(|o| o.status() == status)
                .cloned()
                .collect()
        })
    }

    fn find_orders_referencing(&self, product_id: ProductId) -> DomainResult<Vec<Order>> {
        self.read(|t| {
            t.refs
                .get(&product_id)
                .map(|ids| ids.iter().filter_map(|id| t.orders.get(id).cloned()).collect())
                .unwrap_or_default()
        })
    }

    fn commit(&self, changes: ChangeSet) -> DomainResult<Committed> {
        if changes.is_empty() {
            return Ok(Committed::default());
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| DomainError::store("lock poisoned"))?;

        // Validate everything before touching anything.
        for write in &changes.products {
            tables.check_product(write)?;
        }
        for write in &changes.orders {
            tables.check_order(write)?;
        }

        let mut committed = Committed::default();

        for write in changes.products {
            let version = persisted_version(&write);
            let mut product = match write {
                Write::Insert(v) | Write::Update { value: v, .. } => v,
            };
            product.mark_persisted(version);
            tables.products.insert(product.id_typed(), product.clone());
            committed.products.push(product);
        }

        for write in changes.orders {
            let version = persisted_version(&write);
            let mut order = match write {
                Write::Insert(v) | Write::Update { value: v, .. } => v,
            };
            order.mark_persisted(version);
            tables.index_order(&order);
            tables.orders.insert(order.id_typed(), order.clone());
            committed.orders.push(order);
        }

        Ok(committed)
    }
}
