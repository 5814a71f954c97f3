use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_catalog::ReservedLine;
use storefront_core::{
    Aggregate, AggregateRoot, DomainError, Money, OrderId, ProductId, Quantity, UserId,
};
use storefront_events::Event;

pub const AGGREGATE_TYPE: &str = "orders.order";

/// Fulfilment lifecycle. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Shipped,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [OrderStatus::Pending, OrderStatus::Shipped, OrderStatus::Delivered];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
        }
    }

    fn rank(self) -> u8 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::Shipped => 1,
            OrderStatus::Delivered => 2,
        }
    }

    /// Forward moves only; skipping `Shipped` is allowed.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        next.rank() > self.rank()
    }

    pub fn is_terminal(self) -> bool {
        self == OrderStatus::Delivered
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "Invalid status value '{s}'. Allowed: Pending, Shipped, Delivered"
                ))
            })
    }
}

/// Where the order ships. Missing fields are empty strings, never an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShippingDetails {
    pub name: String,
    pub address: String,
    pub phone: String,
}

/// Immutable snapshot of what was bought, at the price paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub line_no: u32,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: Quantity,
    pub unit_price: Money,
}

impl OrderLine {
    pub fn line_total(&self) -> Result<Money, DomainError> {
        self.unit_price.checked_times(self.quantity)
    }
}

/// Flat, serializable view of an order (storage rows and API payloads).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping_details: ShippingDetails,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    user_id: Option<UserId>,
    lines: Vec<OrderLine>,
    shipping: ShippingDetails,
    total_price: Money,
    status: OrderStatus,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// A not-yet-placed order, the starting point for `PlaceOrder`.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            user_id: None,
            lines: Vec::new(),
            shipping: ShippingDetails::default(),
            total_price: Money::ZERO,
            status: OrderStatus::Pending,
            created_at: None,
            updated_at: None,
            version: 0,
            created: false,
        }
    }

    /// Rehydrate a placed order from storage.
    pub fn restore(record: OrderRecord) -> Self {
        Self {
            id: record.id,
            user_id: Some(record.user_id),
            lines: record.lines,
            shipping: record.shipping_details,
            total_price: record.total_price,
            status: record.status,
            created_at: Some(record.created_at),
            updated_at: Some(record.updated_at),
            version: record.version,
            created: true,
        }
    }

    /// Snapshot of a placed order. `None` before `PlaceOrder` has been applied.
    pub fn to_record(&self) -> Option<OrderRecord> {
        Some(OrderRecord {
            id: self.id,
            user_id: self.user_id?,
            lines: self.lines.clone(),
            shipping_details: self.shipping.clone(),
            total_price: self.total_price,
            status: self.status,
            created_at: self.created_at?,
            updated_at: self.updated_at?,
            version: self.version,
        })
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_placed(&self) -> bool {
        self.created
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn shipping(&self) -> &ShippingDetails {
        &self.shipping
    }

    pub fn total_price(&self) -> Money {
        self.total_price
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn contains_product(&self, product_id: ProductId) -> bool {
        self.lines.iter().any(|l| l.product_id == product_id)
    }
}

impl AggregateRoot for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: PlaceOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceOrder {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<ReservedLine>,
    pub shipping: ShippingDetails,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateStatus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatus {
    pub order_id: OrderId,
    pub status: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    PlaceOrder(PlaceOrder),
    UpdateStatus(UpdateStatus),
}

/// Event: OrderPlaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub lines: Vec<OrderLine>,
    pub shipping: ShippingDetails,
    pub total_price: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStatusChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatusChanged {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderPlaced(OrderPlaced),
    OrderStatusChanged(OrderStatusChanged),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderPlaced(_) => "orders.order.placed",
            OrderEvent::OrderStatusChanged(_) => "orders.order.status_changed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderPlaced(e) => e.occurred_at,
            OrderEvent::OrderStatusChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderPlaced(e) => {
                self.id = e.order_id;
                self.user_id = Some(e.user_id);
                self.lines = e.lines.clone();
                self.shipping = e.shipping.clone();
                self.total_price = e.total_price;
                self.status = OrderStatus::Pending;
                self.created_at = Some(e.occurred_at);
                self.updated_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderStatusChanged(e) => {
                self.status = e.to;
                self.updated_at = Some(e.occurred_at);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::PlaceOrder(cmd) => self.handle_place(cmd),
            OrderCommand::UpdateStatus(cmd) => self.handle_update_status(cmd),
        }
    }
}

impl Order {
    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), DomainError> {
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_place(&self, cmd: &PlaceOrder) -> Result<Vec<OrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("order already placed"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.lines.is_empty() {
            return Err(DomainError::validation("an order needs at least one line"));
        }

        let lines: Vec<OrderLine> = cmd
            .lines
            .iter()
            .zip(1u32..)
            .map(|(reserved, line_no)| OrderLine {
                line_no,
                product_id: reserved.product_id,
                product_name: reserved.product_name.clone(),
                quantity: reserved.quantity,
                unit_price: reserved.unit_price,
            })
            .collect();

        // Computed once from the captured prices; never re-derived from the catalog.
        let total_price = lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.line_total()?))?;

        Ok(vec![OrderEvent::OrderPlaced(OrderPlaced {
            order_id: cmd.order_id,
            user_id: cmd.user_id,
            lines,
            shipping: cmd.shipping.clone(),
            total_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_status(&self, cmd: &UpdateStatus) -> Result<Vec<OrderEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found("order"));
        }
        self.ensure_order_id(cmd.order_id)?;

        if cmd.status == self.status {
            return Err(DomainError::conflict(format!("order is already {}", self.status)));
        }
        if !self.status.can_advance_to(cmd.status) {
            return Err(DomainError::invariant(format!(
                "cannot move order from {} back to {}",
                self.status, cmd.status
            )));
        }

        let user_id = self.user_id.ok_or_else(|| DomainError::invariant("placed order has no owner"))?;

        Ok(vec![OrderEvent::OrderStatusChanged(OrderStatusChanged {
            order_id: cmd.order_id,
            user_id,
            from: self.status,
            to: cmd.status,
            occurred_at: cmd.occurred_at,
        })])
    }
}
