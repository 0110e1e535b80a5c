//! Cart store capability.

use std::sync::RwLock;

use doorstep_core::{CartLine, CartState};

/// The externally owned cart, as the checkout flow sees it.
///
/// Checkout only reads snapshots and, after a confirmed order, clears it.
pub trait CartStore: Send + Sync {
    /// Current contents and totals.
    fn snapshot(&self) -> CartState;

    /// Empty the cart.
    fn clear(&self);
}

/// Cart held in memory, with totals derived from its lines.
#[derive(Debug, Default)]
pub struct InMemoryCart {
    state: RwLock<CartState>,
}

impl InMemoryCart {
    /// A cart holding `lines`.
    #[must_use]
    pub fn with_lines(lines: Vec<CartLine>) -> Self {
        Self {
            state: RwLock::new(CartState::from_lines(lines)),
        }
    }

    /// Add a line, merging quantities with an existing line for the same
    /// product.
    pub fn add(&self, line: CartLine) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let mut lines = std::mem::take(&mut state.added_products);
        match lines.iter_mut().find(|existing| existing.id == line.id) {
            Some(existing) => existing.quantity += line.quantity,
            None => lines.push(line),
        }
        *state = CartState::from_lines(lines);
    }
}

impl CartStore for InMemoryCart {
    fn snapshot(&self) -> CartState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            *state = CartState::default();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorstep_core::{Price, ProductId};

    fn line(id: &str, quantity: u32) -> CartLine {
        CartLine {
            id: ProductId::new(id),
            title: id.to_uppercase(),
            price: Price::from_cents(199),
            quantity,
        }
    }

    #[test]
    fn test_add_merges_same_product() {
        let cart = InMemoryCart::default();
        cart.add(line("a", 1));
        cart.add(line("a", 2));
        cart.add(line("b", 1));

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.added_products.len(), 2);
        assert_eq!(snapshot.orders_count, 4);
        assert_eq!(snapshot.total_price, Price::from_cents(796));
    }

    #[test]
    fn test_clear_empties() {
        let cart = InMemoryCart::with_lines(vec![line("a", 1)]);
        cart.clear();
        assert!(cart.snapshot().is_empty());
        assert_eq!(cart.snapshot(), CartState::default());
    }
}
