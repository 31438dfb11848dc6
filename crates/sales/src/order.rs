use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DomainError, DomainResult, Entity, LineItemId, OrderId, ProductId};
use stockroom_products::Money;

/// Order status lifecycle.
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A line to be placed on a new order. `price` is the generation's unit price
/// at the moment the order is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Money,
}

/// Order line: product generation, quantity, captured unit price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    id: LineItemId,
    order_id: OrderId,
    line_no: u32,
    product_id: ProductId,
    quantity: u32,
    price: Money,
}

impl LineItem {
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn line_no(&self) -> u32 {
        self.line_no
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price captured when the product reference was last set.
    pub fn price(&self) -> Money {
        self.price
    }

    pub fn line_total(&self) -> Option<Money> {
        self.price.times(self.quantity)
    }
}

impl Entity for LineItem {
    type Id = LineItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Aggregate root: Order. Owns its line items exclusively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    status: OrderStatus,
    items: Vec<LineItem>,
    version: u64,
}

impl Order {
    /// Build a pending order expiring `ttl` after `now`.
    pub fn place(
        id: OrderId,
        lines: Vec<NewLine>,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Self> {
        if lines.is_empty() {
            return Err(DomainError::validation("order must contain at least one item"));
        }

        let mut items = Vec::with_capacity(lines.len());
        for (idx, line) in lines.into_iter().enumerate() {
            if line.quantity == 0 {
                return Err(DomainError::validation("quantity must be positive"));
            }
            items.push(LineItem {
                id: LineItemId::new(),
                order_id: id,
                line_no: idx as u32 + 1,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.price,
            });
        }

        Ok(Self {
            id,
            created_at: now,
            expires_at: now + ttl,
            status: OrderStatus::Pending,
            items,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// True iff `now` is strictly past the expiry timestamp.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Sum of line totals, `None` on overflow.
    pub fn total(&self) -> Option<Money> {
        self.items.iter().try_fold(Money::ZERO, |acc, item| {
            let line = item.line_total()?;
            acc.minor().checked_add(line.minor()).map(Money::from_minor)
        })
    }

    fn ensure_pending(&self, action: &str) -> DomainResult<()> {
        if self.status != OrderStatus::Pending {
            return Err(DomainError::invalid_transition(format!(
                "cannot {action} order {} in status {}",
                self.id, self.status
            )));
        }
        Ok(())
    }

    /// PENDING → COMPLETED.
    pub fn complete(&mut self) -> DomainResult<()> {
        self.ensure_pending("complete")?;
        self.status = OrderStatus::Completed;
        Ok(())
    }

    /// PENDING → CANCELLED.
    ///
    /// Returning the reserved stock is the caller's job; every line in
    /// `items()` must be released exactly once.
    pub fn cancel(&mut self) -> DomainResult<()> {
        self.ensure_pending("cancel")?;
        self.status = OrderStatus::Cancelled;
        Ok(())
    }

    /// Point every line on `from` at `to` and re-capture its price.
    ///
    /// NOTE: the captured price is overwritten with the successor's price, so
    /// a revision changes what an already placed pending order costs. This
    /// mirrors the established catalog behaviour and is kept deliberately.
    pub fn rebind(&mut self, from: ProductId, to: ProductId, price: Money) -> DomainResult<usize> {
        self.ensure_pending("re-bind items of")?;
        let mut rebound = 0;
        for item in self.items.iter_mut().filter(|i| i.product_id == from) {
            item.product_id = to;
            item.price = price;
            rebound += 1;
        }
        Ok(rebound)
    }

    /// Record the version assigned by the store on commit.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
