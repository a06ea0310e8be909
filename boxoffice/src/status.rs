//! Status state machines for tickets, orders and payments.
//!
//! The three status enums, the canonical mapping from a gateway outcome to
//! the (payment, order, ticket) status triple, and the transition lattice
//! live here and nowhere else. Call sites never re-derive legality of a
//! transition; they ask this module.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Status of a single ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Issued but not yet settled.
    Pending,
    /// Settled by an approved payment.
    Paid,
    /// Logically cancelled; releases its capacity slot.
    Cancelled,
}

impl TicketStatus {
    /// Whether the ticket occupies a capacity slot on its event.
    pub const fn occupies_capacity(self) -> bool {
        matches!(self, Self::Pending | Self::Paid)
    }

    /// Whether no further transitions are accepted.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }
}

impl Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Awaiting settlement.
    Pending,
    /// Settled by an approved payment.
    Paid,
    /// Settled by a rejected payment.
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transitions are accepted.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Cancelled)
    }

    /// Whether a transition from `self` to `next` is legal.
    ///
    /// `Pending` may move anywhere (including staying `Pending`); terminal
    /// states only permit themselves, which is what makes repeated delivery
    /// of the same outcome idempotent while refusing downgrades.
    pub const fn permits(self, next: Self) -> bool {
        match self {
            Self::Pending => true,
            Self::Paid => matches!(next, Self::Paid),
            Self::Cancelled => matches!(next, Self::Cancelled),
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Paid => write!(f, "PAID"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// Status of the payment record attached to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentStatus {
    /// The gateway has acknowledged the attempt but not resolved it.
    Pending,
    /// The gateway approved the charge.
    Completed,
    /// The gateway rejected the charge.
    Failed,
}

impl PaymentStatus {
    /// Whether no further transitions are accepted.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A gateway-reported outcome this system models.
///
/// Parsed from the gateway's raw status string; anything outside the three
/// modelled outcomes fails to parse and must be surfaced as an unknown
/// outcome by the caller, with no state mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GatewayOutcome {
    /// The charge went through.
    Approved,
    /// The charge was declined.
    Rejected,
    /// The gateway is still working on it.
    Pending,
}

impl GatewayOutcome {
    /// The canonical (payment, order, ticket) statuses for this outcome.
    pub const fn statuses(self) -> StatusTriple {
        match self {
            Self::Approved => StatusTriple {
                payment: PaymentStatus::Completed,
                order: OrderStatus::Paid,
                ticket: TicketStatus::Paid,
            },
            Self::Rejected => StatusTriple {
                payment: PaymentStatus::Failed,
                order: OrderStatus::Cancelled,
                ticket: TicketStatus::Cancelled,
            },
            Self::Pending => StatusTriple {
                payment: PaymentStatus::Pending,
                order: OrderStatus::Pending,
                ticket: TicketStatus::Pending,
            },
        }
    }
}

/// Error returned when the gateway reports a status string this system does
/// not model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized gateway outcome: {0}")]
pub struct UnknownOutcomeError(pub String);

impl FromStr for GatewayOutcome {
    type Err = UnknownOutcomeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            "pending" => Ok(Self::Pending),
            other => Err(UnknownOutcomeError(other.to_string())),
        }
    }
}

impl Display for GatewayOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// The three local statuses a settlement applies as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTriple {
    /// Status for the order's payment record.
    pub payment: PaymentStatus,
    /// Status for the order itself.
    pub order: OrderStatus,
    /// Status for every ticket bound to the order.
    pub ticket: TicketStatus,
}
