//! Orders: the immutable purchase record and its status ledger.

pub mod materializer;
pub mod order;
pub mod report;

pub use materializer::{PlacedOrder, materialize};
pub use order::{
    AGGREGATE_TYPE, Order, OrderCommand, OrderEvent, OrderLine, OrderPlaced, OrderRecord,
    OrderStatus, OrderStatusChanged, PlaceOrder, ShippingDetails, UpdateStatus,
};
pub use report::OrdersReport;
