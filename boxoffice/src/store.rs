//! Record-store port.
//!
//! The port is backend-independent: correctness comes from the store's
//! transactional guarantees, not from in-process serialization. Every read
//! returns the record together with its [`Revision`]; every write states the
//! revision it expects, and a multi-record [`commit`](RecordStore::commit)
//! either applies the whole batch or none of it. Check-then-act races are
//! closed by including the checked record in the commit with its observed
//! revision.

use crate::errors::StoreResult;
use crate::records::{EventRecord, OrderRecord, PaymentRecord, TicketRecord};
use crate::types::{EventId, OrderId, Revision, TicketId};
use async_trait::async_trait;
use std::fmt::Display;

/// Addresses a single record in the store.
///
/// Payments are keyed by their order id: one logical payment per order is a
/// storage-level invariant, not a convention.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    /// An event row.
    Event(EventId),
    /// A ticket row.
    Ticket(TicketId),
    /// An order row.
    Order(OrderId),
    /// The payment row of the given order.
    Payment(OrderId),
}

impl Display for RecordKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event(id) => write!(f, "event/{id}"),
            Self::Ticket(id) => write!(f, "ticket/{id}"),
            Self::Order(id) => write!(f, "order/{id}"),
            Self::Payment(id) => write!(f, "payment/{id}"),
        }
    }
}

/// A record together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    /// The stored record.
    pub record: T,
    /// The revision the record was read at.
    pub revision: Revision,
}

impl<T> Versioned<T> {
    /// Pair a record with its revision.
    pub const fn new(record: T, revision: Revision) -> Self {
        Self { record, revision }
    }
}

/// Expected revision for optimistic concurrency control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// The record must not exist yet.
    New,
    /// The record must exist at exactly this revision.
    Exact(Revision),
    /// No concurrency check.
    Any,
}

/// A record of any of the four kinds, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    /// An event row.
    Event(EventRecord),
    /// A ticket row.
    Ticket(TicketRecord),
    /// An order row.
    Order(OrderRecord),
    /// A payment row.
    Payment(PaymentRecord),
}

impl Record {
    /// The key this record is stored under.
    pub fn key(&self) -> RecordKey {
        match self {
            Self::Event(record) => RecordKey::Event(record.id.clone()),
            Self::Ticket(record) => RecordKey::Ticket(record.id.clone()),
            Self::Order(record) => RecordKey::Order(record.id.clone()),
            Self::Payment(record) => RecordKey::Payment(record.order_id.clone()),
        }
    }
}

/// One write in a commit batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordWrite {
    /// The revision this write expects to find.
    pub expected: Expected,
    /// The full new contents of the record.
    pub record: Record,
}

impl RecordWrite {
    /// A write with an explicit expectation.
    pub const fn new(expected: Expected, record: Record) -> Self {
        Self { expected, record }
    }

    /// A write that requires the record not to exist yet.
    pub const fn create(record: Record) -> Self {
        Self::new(Expected::New, record)
    }

    /// A write that requires the record to still be at `revision`.
    pub const fn update(revision: Revision, record: Record) -> Self {
        Self::new(Expected::Exact(revision), record)
    }
}

/// The record-store port all backends must satisfy.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch an event by id.
    async fn fetch_event(&self, id: &EventId) -> StoreResult<Option<Versioned<EventRecord>>>;

    /// Fetch a ticket by id.
    async fn fetch_ticket(&self, id: &TicketId) -> StoreResult<Option<Versioned<TicketRecord>>>;

    /// Fetch an order by id.
    async fn fetch_order(&self, id: &OrderId) -> StoreResult<Option<Versioned<OrderRecord>>>;

    /// Fetch the payment row of an order, if one was created yet.
    async fn fetch_payment(
        &self,
        order_id: &OrderId,
    ) -> StoreResult<Option<Versioned<PaymentRecord>>>;

    /// Count the event's tickets whose status occupies a capacity slot
    /// (PENDING or PAID). This count, not the event's `sold_out` flag, is
    /// the authority for admission decisions.
    async fn active_ticket_count(&self, event_id: &EventId) -> StoreResult<u32>;

    /// Apply a batch of writes atomically.
    ///
    /// Every write's expectation is checked before anything is applied; on
    /// the first mismatch the whole batch is rejected with
    /// [`StoreError::VersionConflict`](crate::errors::StoreError::VersionConflict)
    /// and no record is touched. A reader can therefore never observe a
    /// partially applied batch.
    async fn commit(&self, writes: Vec<RecordWrite>) -> StoreResult<()>;
}
