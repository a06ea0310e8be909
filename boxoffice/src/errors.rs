//! Error types for the ticketing core.
//!
//! Three layers, converted explicitly at the seams:
//!
//! - **[`TicketingError`]**: service-level failures surfaced to callers as a
//!   typed result, never a bare panic across the boundary.
//! - **[`StoreError`]**: persistence-port failures; a revision conflict is
//!   the signal for the optimistic-concurrency retry loop.
//! - **[`GatewayError`]**: upstream payment-gateway failures, always wrapped
//!   as [`TicketingError::UpstreamUnavailable`] so callers can decide to
//!   retry.

use crate::status::UnknownOutcomeError;
use crate::store::RecordKey;
use crate::types::{EventId, MoneyError, OrderId, Revision, TicketId};
use std::time::Duration;
use thiserror::Error;

/// Failures surfaced by the service operations.
///
/// Validation and state errors are final for the request: the caller must
/// correct its input or wait. `UpstreamUnavailable` invites a caller-driven
/// retry. `Concurrency` means the internal retry budget was exhausted while
/// competing writers kept winning.
#[derive(Debug, Clone, Error)]
pub enum TicketingError {
    /// Input failed validation before any state was touched.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The referenced event does not exist.
    #[error("event '{0}' not found")]
    EventNotFound(EventId),

    /// A referenced ticket does not exist.
    #[error("ticket '{0}' not found")]
    TicketNotFound(TicketId),

    /// The referenced order does not exist. Also raised when a settlement
    /// callback names an order that is gone.
    #[error("order '{0}' not found")]
    OrderNotFound(OrderId),

    /// The event has no capacity left for another active ticket.
    #[error("event '{0}' is sold out")]
    SoldOut(EventId),

    /// The operation is not legal given the current status of the records
    /// involved (e.g. rebinding an already-ordered ticket).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A settlement callback carried no external reference we can map to an
    /// order. Not retried automatically; logged for manual follow-up.
    #[error("settlement callback could not be correlated (external reference {reference:?})")]
    MissingReference {
        /// The raw reference as reported by the gateway, if any.
        reference: Option<String>,
    },

    /// The gateway reported a status this system does not model. Loud and
    /// mutation-free, since it indicates a gateway contract change.
    #[error("unknown gateway outcome '{0}'")]
    UnknownOutcome(String),

    /// A gateway call failed or timed out. No local state was mutated.
    #[error("payment gateway unavailable: {0}")]
    UpstreamUnavailable(GatewayError),

    /// The reported outcome contradicts an already-terminal local state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Optimistic concurrency control kept losing; retries exhausted.
    #[error("concurrent updates on {keys:?}, retries exhausted")]
    Concurrency {
        /// The record keys that kept conflicting.
        keys: Vec<String>,
    },

    /// A persistence failure other than a revision conflict.
    #[error("record store error: {0}")]
    Store(StoreError),

    /// A data-integrity fault (e.g. a ticket referencing a missing event).
    #[error("internal error: {0}")]
    Internal(String),
}

impl TicketingError {
    /// Whether the internal retry loop may run the operation again.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Concurrency { .. })
    }
}

/// Failures at the record-store port.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A write stated an expected revision that no longer holds.
    #[error("revision conflict on {key}: expected {expected}, but current is {current}")]
    VersionConflict {
        /// The record whose revision moved underneath the writer.
        key: RecordKey,
        /// The revision the writer expected.
        expected: Revision,
        /// The revision actually stored.
        current: Revision,
    },

    /// A record could not be encoded or decoded by the backend.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backend is temporarily unreachable.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// An unexpected backend failure.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Failures when calling the external payment gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The call did not complete within the configured deadline.
    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    /// The call failed at the transport level.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The gateway answered with a payload that violates its contract.
    #[error("contract violation: {0}")]
    Contract(String),
}

/// Result alias for service operations.
pub type TicketingResult<T> = Result<T, TicketingError>;

/// Result alias for record-store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<StoreError> for TicketingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict { key, .. } => Self::Concurrency {
                keys: vec![key.to_string()],
            },
            other => Self::Store(other),
        }
    }
}

impl From<GatewayError> for TicketingError {
    fn from(err: GatewayError) -> Self {
        Self::UpstreamUnavailable(err)
    }
}

impl From<MoneyError> for TicketingError {
    fn from(err: MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<UnknownOutcomeError> for TicketingError {
    fn from(err: UnknownOutcomeError) -> Self {
        Self::UnknownOutcome(err.0)
    }
}
