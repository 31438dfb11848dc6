use serde::{Deserialize, Serialize};

use stockroom_core::{AggregateRoot, DomainError, DomainResult, ExpectedVersion, ProductId};

use crate::money::Money;

/// Mutable fields of a product, supplied on creation and on revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFields {
    pub name: String,
    pub price: Money,
    pub stock_quantity: u32,
}

impl ProductFields {
    pub fn new(name: impl Into<String>, price: Money, stock_quantity: u32) -> Self {
        Self {
            name: name.into(),
            price,
            stock_quantity,
        }
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !self.price.is_positive() {
            return Err(DomainError::validation("price must be positive"));
        }
        Ok(())
    }
}

/// Aggregate root: one generation of a product.
///
/// A generation is superseded, never edited in place, once a revision is
/// applied. Successive generations share no link; the predecessor is merely
/// deactivated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductGeneration {
    id: ProductId,
    name: String,
    price: Money,
    stock_quantity: u32,
    active: bool,
    version: u64,
}

impl ProductGeneration {
    /// Create a fresh, active generation at version 0.
    pub fn create(id: ProductId, fields: ProductFields) -> DomainResult<Self> {
        fields.validate()?;
        Ok(Self {
            id,
            name: fields.name,
            price: fields.price,
            stock_quantity: fields.stock_quantity,
            active: true,
            version: 0,
        })
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn ensure_active(&self) -> DomainResult<()> {
        if !self.active {
            return Err(DomainError::inactive(format!("product {}", self.id)));
        }
        Ok(())
    }

    /// Debit `quantity` units. Leaves stock untouched on failure.
    pub fn reserve(&mut self, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if quantity > self.stock_quantity {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                requested: quantity,
                available: self.stock_quantity,
            });
        }
        self.stock_quantity -= quantity;
        Ok(())
    }

    /// Credit `quantity` units back.
    ///
    /// Fails with `StockOverflow`, stock untouched, when the sum does not fit.
    /// A revision can reset stock near the maximum while pending lines still
    /// hold units, so a compensating release is not always representable.
    pub fn release(&mut self, quantity: u32) -> DomainResult<()> {
        self.stock_quantity = self.stock_quantity.checked_add(quantity).ok_or_else(|| {
            DomainError::StockOverflow {
                product: self.name.clone(),
                releasing: quantity,
                stock: self.stock_quantity,
            }
        })?;
        Ok(())
    }

    /// Deactivate this generation.
    ///
    /// Whether pending orders still reference it is checked by the caller,
    /// which owns the order index.
    pub fn deactivate(&mut self) -> DomainResult<()> {
        self.ensure_active()?;
        self.active = false;
        Ok(())
    }

    /// Supersede this generation with a new one built from `fields`.
    ///
    /// Checks run in order: inactive, stale version, invalid fields. On success
    /// `self` is deactivated (stock and price frozen) and the successor is
    /// returned active at version 0.
    pub fn supersede(
        &mut self,
        expected_version: ExpectedVersion,
        successor_id: ProductId,
        fields: ProductFields,
    ) -> DomainResult<ProductGeneration> {
        self.ensure_active()?;
        expected_version.check(self.version)?;
        let successor = ProductGeneration::create(successor_id, fields)?;
        self.active = false;
        Ok(successor)
    }

    /// Record the version assigned by the store on commit.
    pub fn mark_persisted(&mut self, version: u64) {
        self.version = version;
    }
}

impl AggregateRoot for ProductGeneration {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}
