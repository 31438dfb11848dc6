//! Product revisioning: every update supersedes the current generation.
//!
//! The superseded generation is deactivated with its stock and price frozen;
//! the successor gets a fresh id and version 0. Line items of pending orders
//! follow the successor, everything else stays on the old generation.

use tracing::info;

use stockroom_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion, ProductId};
use stockroom_products::{ProductFields, ProductGeneration};

use crate::store::{ShopStore, UnitOfWork};

#[derive(Debug)]
pub struct ProductRevisioning<S> {
    store: S,
}

impl<S> ProductRevisioning<S>
where
    S: ShopStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn create_product(&self, fields: ProductFields) -> DomainResult<ProductGeneration> {
        let product = ProductGeneration::create(ProductId::new(), fields)?;
        let id = product.id_typed();

        let mut uow = UnitOfWork::new(&self.store);
        uow.insert_product(product);
        let committed = uow.commit()?;

        let product = committed
            .product(id)
            .cloned()
            .ok_or_else(|| DomainError::store("committed product missing from receipt"))?;
        info!(product = %id, name = product.name(), "product created");
        Ok(product)
    }

    /// Active generation by id. Inactive generations are `NotFound` here.
    pub fn get_product(&self, id: ProductId) -> DomainResult<ProductGeneration> {
        self.store
            .find_product(id)?
            .filter(ProductGeneration::is_active)
            .ok_or_else(|| DomainError::not_found(format!("product {id}")))
    }

    /// Active generations only.
    pub fn list_products(&self) -> DomainResult<Vec<ProductGeneration>> {
        Ok(self
            .store
            .list_products()?
            .into_iter()
            .filter(ProductGeneration::is_active)
            .collect())
    }

    /// Supersede generation `id` with one built from `fields`.
    ///
    /// Fails `NotFound`, then `InactiveProduct`, then `ConcurrencyConflict`
    /// for a stale `expected_version`. A concurrent writer that commits first
    /// also turns this call into `ConcurrencyConflict`.
    pub fn revise_product(
        &self,
        id: ProductId,
        fields: ProductFields,
        expected_version: u64,
    ) -> DomainResult<ProductGeneration> {
        let mut uow = UnitOfWork::new(&self.store);

        let successor = uow.product(id)?.supersede(
            ExpectedVersion(expected_version),
            ProductId::new(),
            fields,
        )?;
        let successor_id = successor.id_typed();
        let successor_price = successor.price();
        uow.insert_product(successor);

        let mut rebound = 0usize;
        for referencing in self.store.find_orders_referencing(id)? {
            let order = uow.order(referencing.id_typed())?;
            if !order.is_pending() {
                continue;
            }
            rebound += order.rebind(id, successor_id, successor_price)?;
        }

        let committed = uow.commit()?;
        let successor = committed
            .product(successor_id)
            .cloned()
            .ok_or_else(|| DomainError::store("committed product missing from receipt"))?;

        info!(
            product = %id,
            successor = %successor_id,
            rebound_items = rebound,
            "product revised"
        );
        Ok(successor)
    }

    /// Deactivate generation `id`.
    ///
    /// Refused with `ActiveOrderConflict` while a pending order references
    /// it. An order placed concurrently bumps the generation's version and
    /// makes this commit fail instead.
    pub fn deactivate_product(&self, id: ProductId) -> DomainResult<()> {
        let mut uow = UnitOfWork::new(&self.store);
        uow.product(id)?.ensure_active()?;

        let pending = self
            .store
            .find_orders_referencing(id)?
            .into_iter()
            .filter(|o| o.is_pending())
            .count();
        if pending > 0 {
            return Err(DomainError::active_orders(format!(
                "product {id} is referenced by {pending} pending order(s)"
            )));
        }

        let product = uow.product(id)?;
        product.deactivate()?;
        let version = product.version();
        uow.commit()?;

        info!(product = %id, version, "product deactivated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;
    use stockroom_core::{ManualClock, OrderId};
    use stockroom_products::Money;

    use crate::lifecycle::{OrderLifecycle, OrderLineRequest};
    use crate::store::InMemoryShopStore;
    use crate::store::racing::RacingStore;

    struct Shop {
        store: Arc<InMemoryShopStore>,
        catalog: ProductRevisioning<Arc<InMemoryShopStore>>,
        orders: OrderLifecycle<Arc<InMemoryShopStore>, Arc<ManualClock>>,
    }

    fn shop() -> Shop {
        let store = Arc::new(InMemoryShopStore::new());
        Shop {
            catalog: ProductRevisioning::new(Arc::clone(&store)),
            orders: OrderLifecycle::new(Arc::clone(&store), Arc::new(ManualClock::starting_now()))
                .with_ttl(Duration::minutes(30)),
            store,
        }
    }

    fn fields(name: &str, price: u64, stock: u32) -> ProductFields {
        ProductFields::new(name, Money::from_minor(price), stock)
    }

    fn order(shop: &Shop, product_id: ProductId, quantity: u32) -> OrderId {
        shop.orders
            .create(&[OrderLineRequest {
                product_id,
                quantity,
            }])
            .unwrap()
            .id_typed()
    }

    #[test]
    fn revision_rebinds_pending_items_only() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Apples", 5, 12)).unwrap();
        let a_id = a.id_typed();

        let completed = order(&shop, a_id, 2);
        shop.orders.complete(completed).unwrap();
        let pending = order(&shop, a_id, 2);

        // Stock on A is now 8; bring the revision back to a stock of 10.
        let current = shop.store.find_product(a_id).unwrap().unwrap();
        let b = shop
            .catalog
            .revise_product(a_id, fields("Apples", 7, 10), current.version())
            .unwrap();

        assert!(b.is_active());
        assert_eq!(b.stock_quantity(), 10);
        assert_eq!(b.version(), 0);
        assert_ne!(b.id_typed(), a_id);

        let old = shop.store.find_product(a_id).unwrap().unwrap();
        assert!(!old.is_active());
        assert_eq!(old.price(), Money::from_minor(5));

        let pending = shop.orders.get(pending).unwrap();
        assert_eq!(pending.items()[0].product_id(), b.id_typed());
        assert_eq!(pending.items()[0].price(), Money::from_minor(7));

        let completed = shop.orders.get(completed).unwrap();
        assert_eq!(completed.items()[0].product_id(), a_id);
        assert_eq!(completed.items()[0].price(), Money::from_minor(5));
    }

    #[test]
    fn cancelling_rebound_order_releases_onto_successor() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Pears", 5, 10)).unwrap();
        let pending = order(&shop, a.id_typed(), 2);

        let b = shop
            .catalog
            .revise_product(a.id_typed(), fields("Pears", 6, 10), 1)
            .unwrap();
        shop.orders.cancel(pending).unwrap();

        assert_eq!(shop.catalog.get_product(b.id_typed()).unwrap().stock_quantity(), 12);
        let frozen = shop.store.find_product(a.id_typed()).unwrap().unwrap();
        assert_eq!(frozen.stock_quantity(), 8);
    }

    #[test]
    fn cancel_that_would_overflow_successor_stock_is_rejected_whole() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Rice", 5, u32::MAX)).unwrap();
        let pending = order(&shop, a.id_typed(), 2);

        let b = shop
            .catalog
            .revise_product(a.id_typed(), fields("Rice", 5, u32::MAX), 1)
            .unwrap();

        let err = shop.orders.cancel(pending).unwrap_err();
        assert!(matches!(
            err,
            DomainError::StockOverflow {
                releasing: 2,
                stock: u32::MAX,
                ..
            }
        ));
        assert!(shop.orders.get(pending).unwrap().is_pending());
        assert_eq!(
            shop.catalog.get_product(b.id_typed()).unwrap().stock_quantity(),
            u32::MAX
        );
        shop.orders.complete(pending).unwrap();
    }

    #[test]
    fn stale_version_is_conflict_and_changes_nothing() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Plums", 5, 10)).unwrap();
        let err = shop
            .catalog
            .revise_product(a.id_typed(), fields("Plums", 6, 10), 3)
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(shop.catalog.get_product(a.id_typed()).unwrap().is_active());
        assert_eq!(shop.catalog.list_products().unwrap().len(), 1);
    }

    #[test]
    fn revising_superseded_generation_is_inactive() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Kiwis", 5, 10)).unwrap();
        shop.catalog
            .revise_product(a.id_typed(), fields("Kiwis", 6, 10), 0)
            .unwrap();
        let err = shop
            .catalog
            .revise_product(a.id_typed(), fields("Kiwis", 7, 10), 1)
            .unwrap_err();
        assert!(matches!(err, DomainError::InactiveProduct(_)));
    }

    #[test]
    fn revising_unknown_is_not_found() {
        let shop = shop();
        let err = shop
            .catalog
            .revise_product(ProductId::new(), fields("Figs", 1, 1), 0)
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn inactive_generations_are_hidden() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Limes", 5, 10)).unwrap();
        let b = shop
            .catalog
            .revise_product(a.id_typed(), fields("Limes", 6, 10), 0)
            .unwrap();

        assert!(matches!(
            shop.catalog.get_product(a.id_typed()),
            Err(DomainError::NotFound(_))
        ));
        let listed = shop.catalog.list_products().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id_typed(), b.id_typed());
    }

    #[test]
    fn deactivate_without_pending_references() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Dates", 5, 10)).unwrap();
        let done = order(&shop, a.id_typed(), 1);
        shop.orders.complete(done).unwrap();

        shop.catalog.deactivate_product(a.id_typed()).unwrap();
        assert!(shop.catalog.list_products().unwrap().is_empty());
        assert!(matches!(
            shop.catalog.deactivate_product(a.id_typed()),
            Err(DomainError::InactiveProduct(_))
        ));
    }

    #[test]
    fn deactivate_with_pending_reference_is_refused() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Grapes", 5, 10)).unwrap();
        order(&shop, a.id_typed(), 1);

        let err = shop.catalog.deactivate_product(a.id_typed()).unwrap_err();
        assert!(matches!(err, DomainError::ActiveOrderConflict(_)));
        assert!(shop.catalog.get_product(a.id_typed()).unwrap().is_active());
    }

    #[test]
    fn deactivate_unknown_is_not_found() {
        let shop = shop();
        assert!(matches!(
            shop.catalog.deactivate_product(ProductId::new()),
            Err(DomainError::NotFound(_))
        ));
    }

    #[test]
    fn concurrent_revisions_with_same_version_conflict() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Mangoes", 5, 10)).unwrap();
        let a_id = a.id_typed();

        let competitor = ProductRevisioning::new(Arc::clone(&shop.store));
        let racing = ProductRevisioning::new(RacingStore::new(Arc::clone(&shop.store), move || {
            competitor
                .revise_product(a_id, fields("Mangoes", 6, 10), 0)
                .unwrap();
        }));

        let err = racing
            .revise_product(a_id, fields("Mangoes", 9, 10), 0)
            .unwrap_err();
        assert!(err.is_conflict());

        let active = shop.catalog.list_products().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].price(), Money::from_minor(6));
    }

    #[test]
    fn order_placed_during_deactivation_wins() {
        let shop = shop();
        let a = shop.catalog.create_product(fields("Melons", 5, 10)).unwrap();
        let a_id = a.id_typed();

        let competitor =
            OrderLifecycle::new(Arc::clone(&shop.store), Arc::new(ManualClock::starting_now()));
        let racing = ProductRevisioning::new(RacingStore::new(Arc::clone(&shop.store), move || {
            competitor
                .create(&[OrderLineRequest {
                    product_id: a_id,
                    quantity: 1,
                }])
                .unwrap();
        }));

        let err = racing.deactivate_product(a_id).unwrap_err();
        assert!(err.is_conflict());
        assert!(shop.catalog.get_product(a_id).unwrap().is_active());
    }
}
