//! Order lifecycle: create, cancel, complete.
//!
//! ```text
//! PENDING ──complete──▶ COMPLETED
//!    │
//!    └────cancel─────▶ CANCELLED   (stock released per line)
//! ```
//!
//! Each transition runs in one unit of work. The order's version makes
//! racing transitions on the same order mutually exclusive: the loser's
//! commit fails, it re-reads the order, and reports `InvalidStateTransition`
//! once it sees the order already terminal.

use chrono::Duration;
use tracing::info;

use stockroom_core::{Clock, DomainError, DomainResult, OrderId, ProductId};
use stockroom_sales::{NewLine, Order, OrderStatus};

use crate::ledger::StockLedger;
use crate::store::{ShopStore, UnitOfWork};

/// Default reservation window.
pub const DEFAULT_ORDER_TTL_MINUTES: i64 = 30;

/// One requested line of a new order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderLineRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Debug)]
pub struct OrderLifecycle<S, C> {
    store: S,
    clock: C,
    ttl: Duration,
}

impl<S, C> OrderLifecycle<S, C>
where
    S: ShopStore,
    C: Clock,
{
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            ttl: Duration::minutes(DEFAULT_ORDER_TTL_MINUTES),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Place a pending order, reserving stock for every line or for none.
    ///
    /// Each line captures the current price of its generation. Unknown and
    /// inactive generations are both `NotFound`.
    pub fn create(&self, lines: &[OrderLineRequest]) -> DomainResult<Order> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let now = self.clock.now();
        let mut uow = UnitOfWork::new(&self.store);

        let mut new_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let product = uow.product(line.product_id)?;
            if !product.is_active() {
                return Err(DomainError::not_found(format!("product {}", line.product_id)));
            }
            new_lines.push(NewLine {
                product_id: line.product_id,
                quantity: line.quantity,
                price: product.price(),
            });
        }

        let order = Order::place(OrderId::new(), new_lines, now, self.ttl)?;
        StockLedger::reserve_all(
            &mut uow,
            order.items().iter().map(|i| (i.product_id(), i.quantity())),
        )?;

        let order_id = order.id_typed();
        uow.insert_order(order);
        let committed = uow.commit()?;

        let order = committed
            .order(order_id)
            .cloned()
            .ok_or_else(|| DomainError::store("committed order missing from receipt"))?;
        info!(order = %order_id, lines = order.items().len(), expires_at = %order.expires_at(), "order created");
        Ok(order)
    }

    /// PENDING → CANCELLED, releasing every line's stock.
    ///
    /// Releasing bumps each referenced generation's version, so a reservation
    /// committed on one of them in the meantime fails this call with
    /// `ConcurrencyConflict` while the order is still PENDING; the caller may
    /// retry. A release past the stock maximum fails with `StockOverflow`.
    /// Neither failure changes anything.
    pub fn cancel(&self, id: OrderId) -> DomainResult<Order> {
        let attempt = (|| {
            let mut uow = UnitOfWork::new(&self.store);
            let order = uow.order(id)?;
            order.cancel()?;
            let releases: Vec<(ProductId, u32)> = order
                .items()
                .iter()
                .map(|i| (i.product_id(), i.quantity()))
                .collect();
            StockLedger::release_all(&mut uow, releases)?;
            uow.commit()
        })();

        let order = self.settle(id, attempt, "cancel")?;
        info!(order = %id, "order cancelled");
        Ok(order)
    }

    /// PENDING → COMPLETED. Stock stays debited.
    pub fn complete(&self, id: OrderId) -> DomainResult<Order> {
        let attempt = (|| {
            let mut uow = UnitOfWork::new(&self.store);
            uow.order(id)?.complete()?;
            uow.commit()
        })();

        let order = self.settle(id, attempt, "complete")?;
        info!(order = %id, "order completed");
        Ok(order)
    }

    pub fn get(&self, id: OrderId) -> DomainResult<Order> {
        self.store
            .find_order(id)?
            .ok_or_else(|| DomainError::not_found(format!("order {id}")))
    }

    pub fn list(&self) -> DomainResult<Vec<Order>> {
        self.store.list_orders()
    }

    pub fn pending(&self) -> DomainResult<Vec<Order>> {
        self.store.find_orders_by_status(OrderStatus::Pending)
    }

    /// Expiry predicate against the lifecycle's clock.
    pub fn is_expired(&self, order: &Order) -> bool {
        order.is_expired(self.clock.now())
    }

    /// Map a transition attempt to its outcome. A lost commit race on an order
    /// that is now terminal is the same failure as arriving late.
    fn settle(
        &self,
        id: OrderId,
        attempt: DomainResult<crate::store::Committed>,
        action: &str,
    ) -> DomainResult<Order> {
        match attempt {
            Ok(committed) => committed
                .order(id)
                .cloned()
                .ok_or_else(|| DomainError::store("committed order missing from receipt")),
            Err(err) if err.is_conflict() => match self.store.find_order(id)? {
                Some(current) if current.status().is_terminal() => {
                    Err(DomainError::invalid_transition(format!(
                        "cannot {action} order {id} in status {}",
                        current.status()
                    )))
                }
                _ => Err(err),
            },
            Err(err) => Err(err),
        }
    }
}
