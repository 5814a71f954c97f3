use async_trait::async_trait;

use storefront_cart::{Cart, CartLine};
use storefront_core::{ProductId, Quantity, UserId};

use crate::error::StoreError;

/// Cart persistence. Every mutation returns the cart as stored afterwards.
///
/// A user without a stored cart has an empty one; `load` never fails for that.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn load(&self, user_id: UserId) -> Result<Cart, StoreError>;

    /// Add units; an existing line for the product is increased.
    async fn add_line(&self, user_id: UserId, product_id: ProductId, quantity: Quantity)
    -> Result<Cart, StoreError>;

    /// Replace a line's quantity. A missing line is `Rejected(NotFound)`.
    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError>;

    async fn remove_line(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, StoreError>;

    /// Subtract checked-out quantities in one atomic step; lines that reach
    /// zero are dropped. Units added since `ordered` was read are kept.
    /// Idempotent once the lines are gone.
    async fn clear_ordered(&self, user_id: UserId, ordered: &[CartLine]) -> Result<(), StoreError>;
}
