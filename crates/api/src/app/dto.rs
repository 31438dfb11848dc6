use serde::Deserialize;

use stockroom_core::{AggregateRoot, DomainError, DomainResult, Entity, ProductId};
use stockroom_infra::OrderLineRequest;
use stockroom_products::{Money, ProductFields, ProductGeneration};
use stockroom_sales::Order;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    /// Minor currency units.
    pub price: i64,
    pub stock_quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReviseProductRequest {
    pub name: String,
    pub price: i64,
    pub stock_quantity: i64,
    /// Version the client last saw.
    pub version: u64,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItemRequest>,
}

impl CreateProductRequest {
    pub fn into_fields(self) -> DomainResult<ProductFields> {
        product_fields(self.name, self.price, self.stock_quantity)
    }
}

impl ReviseProductRequest {
    pub fn into_parts(self) -> DomainResult<(ProductFields, u64)> {
        let version = self.version;
        Ok((product_fields(self.name, self.price, self.stock_quantity)?, version))
    }
}

impl CreateOrderRequest {
    pub fn into_lines(self) -> DomainResult<Vec<OrderLineRequest>> {
        self.items
            .into_iter()
            .map(|item| {
                let product_id: ProductId = item.product_id.parse()?;
                let quantity = u32::try_from(item.quantity)
                    .ok()
                    .filter(|q| *q > 0)
                    .ok_or_else(|| DomainError::validation("quantity must be positive"))?;
                Ok(OrderLineRequest {
                    product_id,
                    quantity,
                })
            })
            .collect()
    }
}

fn product_fields(name: String, price: i64, stock_quantity: i64) -> DomainResult<ProductFields> {
    let price = u64::try_from(price)
        .map_err(|_| DomainError::validation("price must be positive"))?;
    let stock = u32::try_from(stock_quantity)
        .map_err(|_| DomainError::validation("stock_quantity must be between 0 and 4294967295"))?;
    let fields = ProductFields::new(name, Money::from_minor(price), stock);
    fields.validate()?;
    Ok(fields)
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn product_to_json(p: &ProductGeneration) -> serde_json::Value {
    serde_json::json!({
        "id": p.id_typed().to_string(),
        "name": p.name(),
        "price": p.price().minor(),
        "stock_quantity": p.stock_quantity(),
        "version": p.version(),
    })
}

/// `names[i]` is the product name of `order.items()[i]`, if still resolvable.
pub fn order_to_json(order: &Order, names: &[Option<String>]) -> serde_json::Value {
    serde_json::json!({
        "id": order.id_typed().to_string(),
        "created_at": order.created_at().to_rfc3339(),
        "expires_at": order.expires_at().to_rfc3339(),
        "status": order.status().as_str(),
        "version": order.version(),
        "total": order.total().map(|t| t.minor()),
        "items": order.items().iter().zip(names).map(|(i, name)| serde_json::json!({
            "id": i.id().to_string(),
            "line_no": i.line_no(),
            "product_id": i.product_id().to_string(),
            "product_name": name,
            "quantity": i.quantity(),
            "price": i.price().minor(),
        })).collect::<Vec<_>>()
    })
}
