use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use storefront_cart::{Cart, CartLine};
use storefront_core::{ProductId, Quantity, UserId};

use super::r#trait::CartStore;
use crate::error::StoreError;

#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<UserId, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn update<F>(&self, user_id: UserId, f: F) -> Result<Cart, StoreError>
    where
        F: FnOnce(&mut Cart) -> Result<(), StoreError>,
    {
        let mut carts = self.carts.write().map_err(|_| StoreError::Poisoned)?;
        let mut cart = carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id, Utc::now()));
        f(&mut cart)?;
        carts.insert(user_id, cart.clone());
        Ok(cart)
    }
}

#[async_trait]
impl CartStore for InMemoryCartStore {
    async fn load(&self, user_id: UserId) -> Result<Cart, StoreError> {
        let carts = self.carts.read().map_err(|_| StoreError::Poisoned)?;
        Ok(carts
            .get(&user_id)
            .cloned()
            .unwrap_or_else(|| Cart::empty(user_id, Utc::now())))
    }

    async fn add_line(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        self.update(user_id, |cart| Ok(cart.add(product_id, quantity, Utc::now())?))
    }

    async fn set_quantity(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, StoreError> {
        self.update(user_id, |cart| Ok(cart.set_quantity(product_id, quantity, Utc::now())?))
    }

    async fn remove_line(&self, user_id: UserId, product_id: ProductId) -> Result<Cart, StoreError> {
        self.update(user_id, |cart| {
            cart.remove(product_id, Utc::now());
            Ok(())
        })
    }

    async fn clear_ordered(&self, user_id: UserId, ordered: &[CartLine]) -> Result<(), StoreError> {
        let mut carts = self.carts.write().map_err(|_| StoreError::Poisoned)?;
        if let Some(cart) = carts.get_mut(&user_id) {
            cart.clear_ordered(ordered, Utc::now());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::DomainError;

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    #[tokio::test]
    async fn unknown_user_has_empty_cart() {
        let store = InMemoryCartStore::new();
        assert!(store.load(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_merges_and_clearing_the_order_empties() {
        let store = InMemoryCartStore::new();
        let (user, product) = (UserId::new(), ProductId::new());

        store.add_line(user, product, qty(1)).await.unwrap();
        let cart = store.add_line(user, product, qty(2)).await.unwrap();
        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.quantity_of(product), Some(qty(3)));

        store.clear_ordered(user, cart.lines()).await.unwrap();
        store.clear_ordered(user, cart.lines()).await.unwrap();
        assert!(store.load(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn clearing_an_order_keeps_later_additions() {
        let store = InMemoryCartStore::new();
        let (user, a, b) = (UserId::new(), ProductId::new(), ProductId::new());

        let snapshot = store.add_line(user, a, qty(2)).await.unwrap();
        store.add_line(user, a, qty(1)).await.unwrap();
        store.add_line(user, b, qty(4)).await.unwrap();

        store.clear_ordered(user, snapshot.lines()).await.unwrap();
        let cart = store.load(user).await.unwrap();
        assert_eq!(cart.quantity_of(a), Some(qty(1)));
        assert_eq!(cart.quantity_of(b), Some(qty(4)));
    }

    #[tokio::test]
    async fn set_quantity_on_missing_line_is_not_found() {
        let store = InMemoryCartStore::new();
        let err = store
            .set_quantity(UserId::new(), ProductId::new(), qty(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn carts_are_per_user() {
        let store = InMemoryCartStore::new();
        let (alice, bob, product) = (UserId::new(), UserId::new(), ProductId::new());
        store.add_line(alice, product, qty(1)).await.unwrap();
        assert!(store.load(bob).await.unwrap().is_empty());
        let cart = store.remove_line(alice, product).await.unwrap();
        assert!(cart.is_empty());
    }
}
