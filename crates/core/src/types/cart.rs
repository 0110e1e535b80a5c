//! Cart snapshot types.
//!
//! The cart store owns the authoritative cart; the checkout flow only ever
//! sees a [`CartState`] snapshot, which is also the order body's top level.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::price::Price;

/// One product line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: ProductId,
    pub title: String,
    /// Unit price.
    pub price: Price,
    pub quantity: u32,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn extended_price(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// Snapshot of the cart store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub added_products: Vec<CartLine>,
    pub total_price: Price,
    /// Total number of items (sum of quantities).
    pub orders_count: u32,
}

impl CartState {
    /// Build a snapshot from lines, deriving the totals.
    #[must_use]
    pub fn from_lines(lines: Vec<CartLine>) -> Self {
        let total_price = lines.iter().map(CartLine::extended_price).sum();
        let orders_count = lines.iter().map(|line| line.quantity).sum();
        Self {
            added_products: lines,
            total_price,
            orders_count,
        }
    }

    /// Returns `true` if there is nothing to order.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_products.iter().all(|line| line.quantity == 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(id: &str, cents: i64, quantity: u32) -> CartLine {
        CartLine {
            id: ProductId::new(id),
            title: format!("Product {id}"),
            price: Price::from_cents(cents),
            quantity,
        }
    }

    #[test]
    fn test_from_lines_derives_totals() {
        let cart = CartState::from_lines(vec![line("a", 250, 2), line("b", 1000, 1)]);
        assert_eq!(cart.total_price, Price::from_cents(1500));
        assert_eq!(cart.orders_count, 3);
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_default_is_empty() {
        assert!(CartState::default().is_empty());
        assert!(CartState::from_lines(vec![line("a", 100, 0)]).is_empty());
    }

    #[test]
    fn test_wire_shape() {
        let cart = CartState::from_lines(vec![line("a", 250, 2)]);
        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "addedProducts": [
                    {"id": "a", "title": "Product a", "price": 2.5, "quantity": 2}
                ],
                "totalPrice": 5.0,
                "ordersCount": 2
            })
        );
    }
}
