//! The four persisted records the reconciliation core keeps consistent.
//!
//! Events gate tickets, tickets aggregate into orders, orders settle against
//! exactly one payment. Status fields are the closed enums from
//! [`crate::status`]; nothing here is a free-form string.

use crate::status::{OrderStatus, PaymentStatus, TicketStatus};
use crate::types::{
    BuyerSnapshot, EventId, EventTitle, GatewayPaymentId, Money, OrderId, PaymentId,
    PaymentMethod, TicketId, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};

/// A sellable event with an optional capacity bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Unique event identifier.
    pub id: EventId,
    /// Display title.
    pub title: EventTitle,
    /// Unit price charged per ticket, fixed per event.
    pub price: Money,
    /// Maximum number of active tickets; `None` means unlimited.
    pub capacity: Option<u32>,
    /// Cached saturation flag. Derived from the active-ticket count and
    /// refreshed on guarded writes; admission decisions always recount.
    pub sold_out: bool,
    /// Whether the event is currently on sale.
    pub is_active: bool,
}

impl EventRecord {
    /// Create a fresh event record, not sold out.
    pub const fn new(
        id: EventId,
        title: EventTitle,
        price: Money,
        capacity: Option<u32>,
        is_active: bool,
    ) -> Self {
        Self {
            id,
            title,
            price,
            capacity,
            sold_out: false,
            is_active,
        }
    }

    /// Whether `active_count` admissions saturate this event.
    pub fn saturated_by(&self, active_count: u32) -> bool {
        self.capacity.is_some_and(|cap| active_count >= cap)
    }
}

/// A single admission, bound to one event and one buyer snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Unique ticket identifier.
    pub id: TicketId,
    /// Owning event; immutable after creation.
    pub event_id: EventId,
    /// Buyer identity captured at purchase time.
    pub buyer: BuyerSnapshot,
    /// Settlement status.
    pub status: TicketStatus,
    /// The order this ticket is bound to, set exactly once.
    pub order_id: Option<OrderId>,
    /// When the ticket was issued.
    pub issued_at: Timestamp,
}

impl TicketRecord {
    /// Create a pending, unbound ticket.
    pub const fn new(id: TicketId, event_id: EventId, buyer: BuyerSnapshot, issued_at: Timestamp) -> Self {
        Self {
            id,
            event_id,
            buyer,
            status: TicketStatus::Pending,
            order_id: None,
            issued_at,
        }
    }
}

/// A set of tickets purchased together, priced once at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Unique order identifier.
    pub id: OrderId,
    /// The purchasing user, if any; guest checkout carries none.
    pub user_id: Option<UserId>,
    /// Sum of the bound tickets' event prices at binding time. Later price
    /// changes never reprice an existing order.
    pub total_price: Money,
    /// Settlement status.
    pub status: OrderStatus,
    /// The tickets bound to this order, fixed at creation.
    pub ticket_ids: Vec<TicketId>,
    /// When the order was created.
    pub created_at: Timestamp,
}

impl OrderRecord {
    /// Create a pending order over an already-validated ticket set.
    pub const fn new(
        id: OrderId,
        user_id: Option<UserId>,
        total_price: Money,
        ticket_ids: Vec<TicketId>,
        created_at: Timestamp,
    ) -> Self {
        Self {
            id,
            user_id,
            total_price,
            status: OrderStatus::Pending,
            ticket_ids,
            created_at,
        }
    }
}

/// The single logical payment record for an order.
///
/// Created on the first settlement callback and updated in place on every
/// later one; there is never a second row for the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// Unique payment identifier (ours, not the gateway's).
    pub id: PaymentId,
    /// The order this payment settles.
    pub order_id: OrderId,
    /// Amount reported by the gateway on the latest callback.
    pub amount: Money,
    /// Payment method reported by the gateway, when known.
    pub method: Option<PaymentMethod>,
    /// Settlement status.
    pub status: PaymentStatus,
    /// Latest gateway-assigned payment id; reassigned when the gateway
    /// re-issues one for a retried attempt.
    pub gateway_payment_id: GatewayPaymentId,
    /// When the first settlement callback created this record. Stable across
    /// later updates.
    pub created_at: Timestamp,
}
