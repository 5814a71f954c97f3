//! Checkout orchestration: cart → reservation → order → ordered lines cleared.

pub mod saga;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, instrument, warn};

use storefront_catalog::StockShortfall;
use storefront_catalog::events::AGGREGATE_TYPE as PRODUCT_AGGREGATE;
use storefront_core::{OrderId, ProductId, UserId};
use storefront_orders::{
    AGGREGATE_TYPE as ORDER_AGGREGATE, OrderEvent, OrderRecord, ShippingDetails, materialize,
};

use crate::cart_store::CartStore;
use crate::catalog_store::CatalogStore;
use crate::order_ledger::OrderLedger;
use crate::publisher::EventPublisher;
use crate::reservation::{Reservation, ReservationError, StockReservation};

pub use saga::{CheckoutSagaEvent, CheckoutSagaState};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    CartEmpty,

    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    #[error(transparent)]
    InsufficientStock(StockShortfall),

    #[error("checkout failed: {0}")]
    Internal(String),
}

impl From<ReservationError> for CheckoutError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Empty => Self::CartEmpty,
            ReservationError::ProductNotFound(id) => Self::ProductNotFound(id),
            ReservationError::InvalidQuantity { product_id, quantity } => {
                Self::InvalidQuantity { product_id, quantity }
            }
            ReservationError::InsufficientStock(shortfall) => Self::InsufficientStock(shortfall),
            ReservationError::Store(err) => Self::Internal(err.to_string()),
            err @ ReservationError::RollbackIncomplete { .. } => Self::Internal(err.to_string()),
        }
    }
}

/// One async mutex per user with a checkout in flight.
#[derive(Debug, Default)]
struct UserLocks {
    inner: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    fn handle(&self, user_id: UserId) -> Result<Arc<AsyncMutex<()>>, CheckoutError> {
        let mut locks = self
            .inner
            .lock()
            .map_err(|_| CheckoutError::Internal("checkout lock table poisoned".to_string()))?;
        // Entries only referenced by the table belong to finished checkouts.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        Ok(locks.entry(user_id).or_default().clone())
    }
}

/// Step-by-step progress of one checkout, logged as it moves.
struct CheckoutSaga {
    user_id: UserId,
    state: CheckoutSagaState,
}

impl CheckoutSaga {
    fn start(user_id: UserId) -> Self {
        Self {
            user_id,
            state: CheckoutSagaState::default(),
        }
    }

    fn record(&mut self, event: CheckoutSagaEvent) {
        self.state.apply(&event);
        debug!(user_id = %self.user_id, state = self.state.name(), "checkout saga advanced");
    }
}

/// Converts a user's cart into an order, all or nothing.
///
/// Checkouts for the same user are serialized; checkouts for different users
/// run concurrently and contend only on the catalog's conditional decrement.
pub struct CheckoutService {
    reservation: StockReservation,
    carts: Arc<dyn CartStore>,
    ledger: Arc<dyn OrderLedger>,
    publisher: EventPublisher,
    locks: UserLocks,
}

impl CheckoutService {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        carts: Arc<dyn CartStore>,
        ledger: Arc<dyn OrderLedger>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            reservation: StockReservation::new(catalog),
            carts,
            ledger,
            publisher,
            locks: UserLocks::default(),
        }
    }

    #[instrument(skip(self, shipping), fields(user_id = %user_id), err)]
    pub async fn checkout(
        &self,
        user_id: UserId,
        shipping: ShippingDetails,
    ) -> Result<OrderRecord, CheckoutError> {
        let lock = self.locks.handle(user_id)?;
        let _guard = lock.lock().await;

        let mut saga = CheckoutSaga::start(user_id);

        let cart = self
            .carts
            .load(user_id)
            .await
            .map_err(|e| CheckoutError::Internal(e.to_string()))?;
        if cart.is_empty() {
            saga.record(CheckoutSagaEvent::Aborted {
                reason: "cart empty".to_string(),
            });
            return Err(CheckoutError::CartEmpty);
        }
        saga.record(CheckoutSagaEvent::CartLoaded {
            lines: cart.lines().len(),
        });

        let reservation = match self.reservation.reserve(&cart.line_requests()).await {
            Ok(reservation) => reservation,
            Err(err) => {
                saga.record(CheckoutSagaEvent::Aborted { reason: err.to_string() });
                return Err(err.into());
            }
        };
        saga.record(CheckoutSagaEvent::StockReserved {
            lines: reservation.lines().to_vec(),
        });
        for event in reservation.events(Utc::now()) {
            self.publisher.publish(PRODUCT_AGGREGATE, event.product_id(), event);
        }

        let (record, events) = match self.record_order(user_id, &reservation, shipping).await {
            Ok(recorded) => recorded,
            Err(reason) => {
                saga.record(CheckoutSagaEvent::OrderFailed { reason: reason.clone() });
                self.compensate(&mut saga).await;
                return Err(CheckoutError::Internal(reason));
            }
        };
        saga.record(CheckoutSagaEvent::OrderRecorded { order_id: record.id });

        for event in events {
            self.publisher.publish(ORDER_AGGREGATE, record.id, event);
        }

        // Only what was ordered leaves the cart; lines added meanwhile stay.
        match self.carts.clear_ordered(user_id, cart.lines()).await {
            Ok(()) => saga.record(CheckoutSagaEvent::CartCleared),
            Err(err) => {
                warn!(
                    order_id = %record.id,
                    error = %err,
                    "order recorded but cart could not be cleared"
                );
                saga.record(CheckoutSagaEvent::CartClearFailed { reason: err.to_string() });
            }
        }

        info!(order_id = %record.id, total = %record.total_price, lines = record.lines.len(), "checkout completed");
        Ok(record)
    }

    async fn record_order(
        &self,
        user_id: UserId,
        reservation: &Reservation,
        shipping: ShippingDetails,
    ) -> Result<(OrderRecord, Vec<OrderEvent>), String> {
        let placed = materialize(OrderId::new(), user_id, reservation.lines(), shipping, Utc::now())
            .map_err(|e| format!("order could not be built: {e}"))?;
        let record = placed
            .order
            .to_record()
            .ok_or_else(|| "materialized order has no record".to_string())?;

        self.ledger
            .insert(record.clone())
            .await
            .map_err(|e| format!("order could not be recorded: {e}"))?;

        Ok((record, placed.events))
    }

    /// Return reserved stock before the failure reaches the caller.
    async fn compensate(&self, saga: &mut CheckoutSaga) {
        let lines = saga.state.pending_release().to_vec();
        let outcome = self.reservation.release(&lines).await;

        for event in outcome.events(Utc::now()) {
            self.publisher.publish(PRODUCT_AGGREGATE, event.product_id(), event);
        }

        if outcome.is_complete() {
            warn!(user_id = %saga.user_id, lines = lines.len(), "checkout compensated: reserved stock released");
            saga.record(CheckoutSagaEvent::StockReleased);
        } else {
            let unreleased: Vec<String> = outcome
                .unreleased
                .iter()
                .map(|l| format!("{}x{}", l.product_id, l.quantity))
                .collect();
            error!(
                user_id = %saga.user_id,
                unreleased = ?unreleased,
                "checkout compensation incomplete: stock must be reconciled manually"
            );
            saga.record(CheckoutSagaEvent::ReleaseFailed {
                unreleased: outcome.unreleased,
            });
        }
    }
}
