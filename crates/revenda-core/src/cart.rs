//! # Cart
//!
//! The in-memory cart: an ordered list of line items, at most one per
//! product id.
//!
//! ## Cart Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Operations                                      │
//! │                                                                         │
//! │  add_product(p) ──────────► present? quantity += 1 : push(qty 1)        │
//! │                                                                         │
//! │  update_quantity(id, n) ──► n <= 0 ? remove_item(id) : items[i].qty = n │
//! │                                                                         │
//! │  remove_item(id) ─────────► items.remove(i)                             │
//! │                                                                         │
//! │  clear() ─────────────────► items.clear()                               │
//! │                                                                         │
//! │  summary(rules) ──────────► pricing::compute_summary (never cached)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Failed operations leave the cart unchanged. Persistence and telemetry
//! live in the storefront's `CartStore`, not here.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::pricing::{compute_summary, PricingRules, PricingSummary};
use crate::types::{LineItem, Product, ProductId};
use crate::validation::{validate_product_name, validate_quantity, validate_table_price};
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// The shopping cart.
///
/// ## Invariants
/// - Items are unique by `id` (adding the same product increases quantity)
/// - Every quantity is in `1..=MAX_ITEM_QUANTITY`
/// - At most `MAX_CART_ITEMS` distinct items
/// - Insertion order is preserved
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a cart from stored items, checking every invariant.
    pub fn from_items(items: Vec<LineItem>) -> CoreResult<Self> {
        if items.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let mut cart = Cart::new();
        for item in items {
            validate_quantity(item.quantity)?;
            validate_table_price(item.table_price)?;
            if cart.contains(item.id) {
                return Err(ValidationError::InvalidFormat {
                    field: "cart".to_string(),
                    reason: format!("product {} appears twice", item.id),
                }
                .into());
            }
            cart.items.push(item);
        }
        Ok(cart)
    }

    /// Adds one unit of a product, or inserts it with quantity 1.
    ///
    /// ## Returns
    /// The line's quantity after the add.
    pub fn add_product(&mut self, product: &Product) -> CoreResult<i64> {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == product.id) {
            let new_qty = item.quantity + 1;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(new_qty);
        }

        validate_product_name(&product.name)?;
        validate_table_price(product.table_price)?;

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        self.items.push(LineItem::from_product(product));
        Ok(1)
    }

    /// Sets a line's quantity. `quantity <= 0` removes the line.
    pub fn update_quantity(&mut self, id: ProductId, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(id);
            return Ok(());
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.quantity = quantity;
                Ok(())
            }
            None => Err(CoreError::ItemNotInCart(id)),
        }
    }

    /// Removes a line by product id. Returns false when there was no such
    /// line, which leaves the cart untouched.
    pub fn remove_item(&mut self, id: ProductId) -> bool {
        let initial_len = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != initial_len
    }

    /// Clears all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|i| i.id == id)
    }

    /// Number of distinct products.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Σ quantities.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    /// Prices the cart.
    pub fn summary(&self, rules: &PricingRules) -> PricingSummary {
        compute_summary(&self.items, rules)
    }
}
