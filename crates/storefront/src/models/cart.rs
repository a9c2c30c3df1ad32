//! Shopping cart state container.
//!
//! The cart lives in the visitor's session and is rehydrated on every request.
//! Lines are unique by product ID and always hold a quantity of at least one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_sessions::Session;

use marketstall_core::ProductId;

use super::session_keys;
use crate::backend::Product;

/// Upper bound for a single line's quantity.
pub const MAX_LINE_QUANTITY: u32 = 99;

/// Errors from cart mutations. A failed mutation leaves the cart unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,
    #[error("product {0} is not in the cart")]
    NotInCart(ProductId),
    #[error("product is out of stock")]
    OutOfStock,
}

/// A line in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub product_images: Vec<String>,
    /// Units in stock when the product was last added.
    #[serde(default = "default_available")]
    pub available: u32,
}

const fn default_available() -> u32 {
    MAX_LINE_QUANTITY
}

impl CartItem {
    /// Build a line from an authoritative backend product.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            quantity,
            product_images: product.images.clone(),
            available: product.stock,
        }
    }

    /// Most units this line may hold: the known stock, at most
    /// [`MAX_LINE_QUANTITY`] and never below one.
    #[must_use]
    pub fn max_quantity(&self) -> u32 {
        self.available.clamp(1, MAX_LINE_QUANTITY)
    }

    /// Price multiplied by quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }

    /// Thumbnail image, if any.
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.product_images.first().map(String::as_str)
    }
}

/// Result of changing a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOutcome {
    /// Line quantity after the change.
    pub quantity: u32,
    /// Whether the requested quantity was reduced to fit stock or the line cap.
    pub clamped: bool,
}

impl LineOutcome {
    fn capped(wanted: u32, cap: u32) -> Self {
        let quantity = wanted.min(cap);
        Self {
            quantity,
            clamped: quantity < wanted,
        }
    }
}

/// The visitor's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Lines in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line by product ID.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn get_mut(&mut self, id: &ProductId) -> Result<&mut CartItem, CartError> {
        self.items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| CartError::NotInCart(id.clone()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Sum of every line's price times quantity.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add `item.quantity` units of a product.
    ///
    /// If the product is already in the cart its quantity is increased and
    /// its name, price, images and stock are refreshed from `item`; no second
    /// line is created. The resulting quantity is capped at `item.available`
    /// units and at [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `ZeroQuantity` when asked to add nothing and `OutOfStock` when
    /// nothing is available.
    pub fn add(&mut self, item: CartItem) -> Result<LineOutcome, CartError> {
        if item.quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if item.available == 0 {
            return Err(CartError::OutOfStock);
        }

        let existing = self.get(&item.id).map_or(0, |line| line.quantity);
        let outcome =
            LineOutcome::capped(existing.saturating_add(item.quantity), item.max_quantity());

        match self.items.iter_mut().find(|line| line.id == item.id) {
            Some(line) => {
                line.name = item.name;
                line.price = item.price;
                line.product_images = item.product_images;
                line.available = item.available;
                line.quantity = outcome.quantity;
            }
            None => self.items.push(CartItem {
                quantity: outcome.quantity,
                ..item
            }),
        }

        Ok(outcome)
    }

    /// Set a line's quantity, capped at the line's stock and
    /// [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `ZeroQuantity` for a quantity below one and `NotInCart` for an
    /// unknown product. The cart is unchanged on error.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> Result<LineOutcome, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        let line = self.get_mut(id)?;
        let outcome = LineOutcome::capped(quantity, line.max_quantity());
        line.quantity = outcome.quantity;
        Ok(outcome)
    }

    /// Add one unit to a line, up to the line's stock and
    /// [`MAX_LINE_QUANTITY`].
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` for an unknown product.
    pub fn increment(&mut self, id: &ProductId) -> Result<LineOutcome, CartError> {
        let line = self.get_mut(id)?;
        let outcome = LineOutcome::capped(line.quantity.saturating_add(1), line.max_quantity());
        line.quantity = outcome.quantity;
        Ok(outcome)
    }

    /// Remove one unit from a line. A line at quantity one is left as is.
    ///
    /// # Errors
    ///
    /// Returns `NotInCart` for an unknown product.
    pub fn decrement(&mut self, id: &ProductId) -> Result<u32, CartError> {
        let line = self.get_mut(id)?;
        if line.quantity > 1 {
            line.quantity -= 1;
        }
        Ok(line.quantity)
    }

    /// Remove a line entirely, returning it if it was present.
    pub fn remove(&mut self, id: &ProductId) -> Option<CartItem> {
        let index = self.items.iter().position(|item| &item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Empty the cart.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    // =========================================================================
    // Session persistence
    // =========================================================================

    /// Rehydrate the cart from the session.
    ///
    /// A missing or unreadable cart yields an empty one.
    pub async fn load(session: &Session) -> Self {
        match session.get::<Self>(session_keys::CART).await {
            Ok(Some(cart)) => cart.sanitized(),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable cart from session");
                Self::default()
            }
        }
    }

    /// Persist the cart to the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be written.
    pub async fn save(&self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(session_keys::CART, self).await
    }

    /// Re-establish invariants on data read back from storage: merge duplicate
    /// IDs, drop zero-quantity lines and apply each line's cap.
    fn sanitized(self) -> Self {
        let mut cart = Self::default();
        for item in self.items {
            if item.quantity == 0 {
                continue;
            }
            match cart.items.iter_mut().find(|line| line.id == item.id) {
                Some(line) => {
                    line.quantity = line
                        .quantity
                        .saturating_add(item.quantity)
                        .min(line.max_quantity());
                }
                None => cart.items.push(CartItem {
                    quantity: item.quantity.min(item.max_quantity()),
                    ..item
                }),
            }
        }
        cart
    }
}
