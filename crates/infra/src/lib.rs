//! Infrastructure layer: stores, Postgres wiring, and the services that
//! coordinate them (checkout, review gate, fulfillment, catalog, carts).

pub mod cart_service;
pub mod cart_store;
pub mod catalog_service;
pub mod catalog_store;
pub mod checkout;
pub mod db;
pub mod error;
pub mod fulfillment;
pub mod order_ledger;
pub mod publisher;
pub mod reservation;
pub mod review_gate;


pub use cart_service::{CartService, CartServiceError};
pub use catalog_service::{CatalogService, CatalogServiceError};
pub use checkout::{CheckoutError, CheckoutService};
pub use error::StoreError;
pub use fulfillment::{FulfillmentError, FulfillmentService};
pub use publisher::{EventMessage, EventPublisher};
pub use reservation::{ReleaseOutcome, Reservation, ReservationError, StockReservation};
pub use review_gate::{ReviewGate, ReviewGateError};
