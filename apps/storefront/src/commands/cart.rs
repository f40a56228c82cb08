//! # Cart Commands
//!
//! Cart manipulation. Every command answers with the whole cart and its
//! freshly computed pricing.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │  ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐        │
//! │  │  Empty   │────►│ In Cart  │────►│ Checkout │────►│   Paid   │        │
//! │  │  Cart    │     │          │     │          │     │  Order   │        │
//! │  └──────────┘     └──────────┘     └──────────┘     └────┬─────┘        │
//! │       ▲                │                                 │              │
//! │       │           add_to_cart                            │              │
//! │       │           update_cart_item                       │              │
//! │       │           remove_from_cart                       │              │
//! │       │                │                                 │              │
//! │       └── clear_cart ◄─┘◄────────── cleared on payment ──┘              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use revenda_core::validation::{validate_product_name, validate_table_price};
use revenda_core::{LineItem, PricingSummary, Product, ProductId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::Session;

/// Cart response including items and pricing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<LineItem>,
    pub summary: PricingSummary,
}

impl From<(Vec<LineItem>, PricingSummary)> for CartResponse {
    fn from((items, summary): (Vec<LineItem>, PricingSummary)) -> Self {
        CartResponse { items, summary }
    }
}

/// Gets the current cart contents.
///
/// ```text
/// ┌────────────────────────────────────────────────────────────────┐
/// │  CART                                              3 items     │
/// ├────────────────────────────────────────────────────────────────┤
/// │  Hidratante Facial           x2         tabela R$ 200,00       │
/// │  Oferta Especial             x1         tabela R$ 100,00       │
/// ├────────────────────────────────────────────────────────────────┤
/// │  Total com desconto (30%)                      R$ 170,00       │
/// │  No PIX (-3%)                                  R$ 164,90       │
/// │  Faltam R$ 9.860,00 para 35%                                   │
/// └────────────────────────────────────────────────────────────────┘
/// ```
pub async fn get_cart(session: &Session) -> CartResponse {
    debug!("get_cart command");
    session.cart().snapshot().await.into()
}

/// Adds one unit of a product.
///
/// ## Behavior
/// - Already in cart: quantity increases
/// - Not in cart: added with quantity 1 at the given table price
pub async fn add_to_cart(session: &Session, product: Product) -> Result<CartResponse, ApiError> {
    debug!(product_id = product.id, "add_to_cart command");

    validate_product_name(&product.name)?;
    validate_table_price(product.table_price)?;

    session.cart().add_to_cart(&product).await?;
    Ok(get_cart(session).await)
}

/// Removes a line. A product that is not in the cart leaves it unchanged.
pub async fn remove_from_cart(
    session: &Session,
    product_id: ProductId,
) -> Result<CartResponse, ApiError> {
    debug!(product_id, "remove_from_cart command");

    session.cart().remove_from_cart(product_id).await?;
    Ok(get_cart(session).await)
}

/// Sets a line's quantity. Zero or less removes the line.
pub async fn update_cart_item(
    session: &Session,
    product_id: ProductId,
    quantity: i64,
) -> Result<CartResponse, ApiError> {
    debug!(product_id, quantity, "update_cart_item command");

    session.cart().update_quantity(product_id, quantity).await?;
    Ok(get_cart(session).await)
}

pub async fn clear_cart(session: &Session) -> CartResponse {
    debug!("clear_cart command");

    session.cart().clear_cart().await;
    get_cart(session).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::offline_session;
    use crate::error::ErrorCode;
    use revenda_core::Money;

    fn product(id: ProductId, name: &str, cents: i64) -> Product {
        Product {
            id,
            name: name.to_string(),
            table_price: Money::from_cents(cents),
        }
    }

    #[tokio::test]
    async fn test_cart_commands() {
        let session = offline_session().await;

        let cart = add_to_cart(&session, product(1, "Hidratante Facial", 10_000))
            .await
            .unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.summary.total_with_discount, Money::from_cents(7_000));

        let cart = update_cart_item(&session, 1, 3).await.unwrap();
        assert_eq!(cart.summary.item_count, 3);

        let cart = update_cart_item(&session, 1, 0).await.unwrap();
        assert!(cart.items.is_empty());

        add_to_cart(&session, product(2, "Sérum", 5_000)).await.unwrap();
        let cart = clear_cart(&session).await;
        assert!(cart.items.is_empty());
        assert_eq!(cart.summary.total_with_discount, Money::zero());
    }

    #[tokio::test]
    async fn test_add_rejects_bad_product() {
        let session = offline_session().await;

        let err = add_to_cart(&session, product(1, "   ", 100)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = add_to_cart(&session, product(1, "Sérum", -1)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        assert!(get_cart(&session).await.items.is_empty());
    }

    #[tokio::test]
    async fn test_remove_missing_item_is_harmless() {
        let session = offline_session().await;
        add_to_cart(&session, product(1, "Sérum", 5_000)).await.unwrap();

        let cart = remove_from_cart(&session, 42).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].id, 1);

        let err = update_cart_item(&session, 42, 2).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
