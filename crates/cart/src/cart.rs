use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::LineRequest;
use storefront_core::{DomainError, DomainResult, ProductId, Quantity, UserId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

impl From<&CartLine> for LineRequest {
    fn from(line: &CartLine) -> Self {
        LineRequest::new(line.product_id, i64::from(line.quantity.get()))
    }
}

/// A user's cart. Each product appears on at most one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    user_id: UserId,
    lines: Vec<CartLine>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    pub fn empty(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lines: Vec::new(),
            updated_at: now,
        }
    }

    /// Rehydrate from storage, merging any duplicate product lines.
    pub fn restore(
        user_id: UserId,
        lines: impl IntoIterator<Item = CartLine>,
        updated_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut cart = Self::empty(user_id, updated_at);
        for line in lines {
            cart.merge(line.product_id, line.quantity)?;
        }
        Ok(cart)
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn quantity_of(&self, product_id: ProductId) -> Option<Quantity> {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map(|l| l.quantity)
    }

    /// Line requests for the reservation step, in cart order.
    pub fn line_requests(&self) -> Vec<LineRequest> {
        self.lines.iter().map(LineRequest::from).collect()
    }

    fn merge(&mut self, product_id: ProductId, quantity: Quantity) -> DomainResult<()> {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = line.quantity.checked_add(quantity)?,
            None => self.lines.push(CartLine { product_id, quantity }),
        }
        Ok(())
    }

    /// Add units of a product; an existing line has its quantity increased.
    pub fn add(&mut self, product_id: ProductId, quantity: Quantity, now: DateTime<Utc>) -> DomainResult<()> {
        self.merge(product_id, quantity)?;
        self.updated_at = now;
        Ok(())
    }

    /// Replace the quantity of an existing line.
    pub fn set_quantity(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(DomainError::NotFound("cart line"))?;
        line.quantity = quantity;
        self.updated_at = now;
        Ok(())
    }

    /// Drop a product's line. Removing an absent product is a no-op.
    pub fn remove(&mut self, product_id: ProductId, now: DateTime<Utc>) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        let removed = self.lines.len() != before;
        if removed {
            self.updated_at = now;
        }
        removed
    }

    /// Take the checked-out lines back out of the cart, keeping the cart itself.
    ///
    /// Each ordered quantity is subtracted from the matching line and lines
    /// that reach zero are dropped. Units added after the snapshot was taken
    /// stay in the cart. Clearing nothing changes nothing.
    pub fn clear_ordered(&mut self, ordered: &[CartLine], now: DateTime<Utc>) {
        let mut changed = false;
        for taken in ordered {
            let Some(pos) = self.lines.iter().position(|l| l.product_id == taken.product_id) else {
                continue;
            };
            let left = i64::from(self.lines[pos].quantity.get()) - i64::from(taken.quantity.get());
            match Quantity::new(left) {
                Ok(quantity) => self.lines[pos].quantity = quantity,
                Err(_) => {
                    self.lines.remove(pos);
                }
            }
            changed = true;
        }
        if changed {
            self.updated_at = now;
        }
    }
}
