//! Stock ledger: the two stock primitives, applied inside a unit of work.
//!
//! `reserve` debits, `release` credits. Order transitions are compositions of
//! these; nothing else in the crate touches stock counts.

use tracing::debug;

use stockroom_core::{DomainResult, ProductId};

use crate::store::{ShopStore, UnitOfWork};

#[derive(Debug, Default, Copy, Clone)]
pub struct StockLedger;

impl StockLedger {
    /// Debit `quantity` units of `product_id`.
    ///
    /// Fails with `InsufficientStock` when the staged stock is too low; the
    /// unit of work should then be dropped so no earlier reservation of the
    /// same operation survives.
    pub fn reserve<S: ShopStore + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<()> {
        let product = uow.product(product_id)?;
        product.reserve(quantity)?;
        debug!(product = %product_id, quantity, remaining = product.stock_quantity(), "stock reserved");
        Ok(())
    }

    /// Credit `quantity` units of `product_id` back.
    ///
    /// Fails if the generation cannot be loaded or with `StockOverflow`; either
    /// way the unit of work should be dropped.
    pub fn release<S: ShopStore + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<()> {
        let product = uow.product(product_id)?;
        product.release(quantity)?;
        debug!(product = %product_id, quantity, remaining = product.stock_quantity(), "stock released");
        Ok(())
    }

    /// Reserve every `(product, quantity)` pair or fail on the first shortfall.
    pub fn reserve_all<S: ShopStore + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        lines: impl IntoIterator<Item = (ProductId, u32)>,
    ) -> DomainResult<()> {
        for (product_id, quantity) in lines {
            Self::reserve(uow, product_id, quantity)?;
        }
        Ok(())
    }

    pub fn release_all<S: ShopStore + ?Sized>(
        uow: &mut UnitOfWork<'_, S>,
        lines: impl IntoIterator<Item = (ProductId, u32)>,
    ) -> DomainResult<()> {
        for (product_id, quantity) in lines {
            Self::release(uow, product_id, quantity)?;
        }
        Ok(())
    }
}
