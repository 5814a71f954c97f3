//! Checkout saga: explicit step tracking and the compensation it implies.
//!
//! Flow:
//! 1. Cart loaded
//! 2. Stock reserved
//! 3. Order recorded
//! 4. Cart cleared → completed
//!
//! Compensating action: release the reserved stock if the order cannot be
//! recorded. Once the order is recorded the saga can no longer compensate;
//! a later failure (clearing the cart) is logged and the checkout stands.

use serde::{Deserialize, Serialize};

use storefront_catalog::ReservedLine;
use storefront_core::OrderId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutSagaState {
    #[default]
    Started,
    CartLoaded {
        lines: usize,
    },
    StockReserved {
        lines: Vec<ReservedLine>,
    },
    OrderRecorded {
        order_id: OrderId,
    },
    Completed {
        order_id: OrderId,
    },
    Compensating {
        lines: Vec<ReservedLine>,
        reason: String,
    },
    Compensated {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CheckoutSagaEvent {
    CartLoaded { lines: usize },
    StockReserved { lines: Vec<ReservedLine> },
    OrderRecorded { order_id: OrderId },
    CartCleared,
    CartClearFailed { reason: String },
    OrderFailed { reason: String },
    StockReleased,
    ReleaseFailed { unreleased: Vec<ReservedLine> },
    Aborted { reason: String },
}

impl CheckoutSagaState {
    pub fn apply(&mut self, event: &CheckoutSagaEvent) {
        let next = match (&*self, event) {
            (Self::Started, CheckoutSagaEvent::CartLoaded { lines }) => Self::CartLoaded { lines: *lines },
            (Self::CartLoaded { .. }, CheckoutSagaEvent::StockReserved { lines }) => {
                Self::StockReserved { lines: lines.clone() }
            }
            (Self::StockReserved { .. }, CheckoutSagaEvent::OrderRecorded { order_id }) => {
                Self::OrderRecorded { order_id: *order_id }
            }
            (Self::StockReserved { lines }, CheckoutSagaEvent::OrderFailed { reason }) => Self::Compensating {
                lines: lines.clone(),
                reason: reason.clone(),
            },
            (
                Self::OrderRecorded { order_id },
                CheckoutSagaEvent::CartCleared | CheckoutSagaEvent::CartClearFailed { .. },
            ) => Self::Completed { order_id: *order_id },
            (Self::Compensating { reason, .. }, CheckoutSagaEvent::StockReleased) => Self::Compensated {
                reason: reason.clone(),
            },
            (Self::Compensating { reason, .. }, CheckoutSagaEvent::ReleaseFailed { unreleased }) => {
                Self::Failed {
                    reason: format!("{reason}; {} line(s) not released", unreleased.len()),
                }
            }
            (_, CheckoutSagaEvent::Aborted { reason }) if !self.is_terminal() => Self::Failed {
                reason: reason.clone(),
            },
            // Anything else is out of order and leaves the state untouched.
            _ => return,
        };
        *self = next;
    }

    /// Stock that must be returned if the saga fails from this state.
    pub fn pending_release(&self) -> &[ReservedLine] {
        match self {
            Self::StockReserved { lines } | Self::Compensating { lines, .. } => lines,
            _ => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Compensated { .. } | Self::Failed { .. }
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::CartLoaded { .. } => "cart_loaded",
            Self::StockReserved { .. } => "stock_reserved",
            Self::OrderRecorded { .. } => "order_recorded",
            Self::Completed { .. } => "completed",
            Self::Compensating { .. } => "compensating",
            Self::Compensated { .. } => "compensated",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::{Money, ProductId, Quantity};

    fn line() -> ReservedLine {
        ReservedLine {
            product_id: ProductId::new(),
            product_name: "Mug".to_string(),
            quantity: Quantity::new(2).unwrap(),
            unit_price: Money::from_minor(800).unwrap(),
        }
    }

    #[test]
    fn happy_path_reaches_completed() {
        let order_id = OrderId::new();
        let mut state = CheckoutSagaState::default();
        state.apply(&CheckoutSagaEvent::CartLoaded { lines: 1 });
        state.apply(&CheckoutSagaEvent::StockReserved { lines: vec![line()] });
        assert_eq!(state.pending_release().len(), 1);

        state.apply(&CheckoutSagaEvent::OrderRecorded { order_id });
        assert!(state.pending_release().is_empty());

        state.apply(&CheckoutSagaEvent::CartClearFailed {
            reason: "store offline".to_string(),
        });
        assert_eq!(state, CheckoutSagaState::Completed { order_id });
    }

    #[test]
    fn order_failure_compensates_reserved_lines() {
        let reserved = vec![line(), line()];
        let mut state = CheckoutSagaState::CartLoaded { lines: 2 };
        state.apply(&CheckoutSagaEvent::StockReserved { lines: reserved.clone() });
        state.apply(&CheckoutSagaEvent::OrderFailed {
            reason: "ledger down".to_string(),
        });

        assert_eq!(state.name(), "compensating");
        assert_eq!(state.pending_release(), reserved.as_slice());

        state.apply(&CheckoutSagaEvent::StockReleased);
        assert!(state.is_terminal());
        assert!(state.pending_release().is_empty());
    }

    #[test]
    fn failed_release_ends_in_failed() {
        let mut state = CheckoutSagaState::Compensating {
            lines: vec![line()],
            reason: "ledger down".to_string(),
        };
        state.apply(&CheckoutSagaEvent::ReleaseFailed { unreleased: vec![line()] });
        assert!(matches!(state, CheckoutSagaState::Failed { ref reason } if reason.contains("1 line(s)")));
    }

    #[test]
    fn out_of_order_events_are_ignored() {
        let mut state = CheckoutSagaState::Started;
        state.apply(&CheckoutSagaEvent::OrderRecorded { order_id: OrderId::new() });
        assert_eq!(state, CheckoutSagaState::Started);

        let mut done = CheckoutSagaState::Completed { order_id: OrderId::new() };
        let before = done.clone();
        done.apply(&CheckoutSagaEvent::Aborted { reason: "late".to_string() });
        assert_eq!(done, before);
    }
}
