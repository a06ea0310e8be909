//! In-memory record store for the `boxoffice` ticketing core.
//!
//! This crate provides an in-memory implementation of the `RecordStore`
//! port, useful for testing and development scenarios where persistence is
//! not required. It honors the full commit contract: every expectation in a
//! batch is verified before anything is applied, and commits are serialized,
//! so readers never observe a partially applied batch.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use boxoffice::errors::{StoreError, StoreResult};
use boxoffice::records::{EventRecord, OrderRecord, PaymentRecord, TicketRecord};
use boxoffice::store::{Expected, Record, RecordKey, RecordStore, RecordWrite, Versioned};
use boxoffice::types::{EventId, OrderId, Revision, TicketId};

/// Thread-safe in-memory record store.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    inner: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    events: HashMap<EventId, Versioned<EventRecord>>,
    tickets: HashMap<TicketId, Versioned<TicketRecord>>,
    orders: HashMap<OrderId, Versioned<OrderRecord>>,
    // One payment per order is structural: the table is keyed by order id.
    payments: HashMap<OrderId, Versioned<PaymentRecord>>,
}

impl Tables {
    fn revision_of(&self, key: &RecordKey) -> Option<Revision> {
        match key {
            RecordKey::Event(id) => self.events.get(id).map(|v| v.revision),
            RecordKey::Ticket(id) => self.tickets.get(id).map(|v| v.revision),
            RecordKey::Order(id) => self.orders.get(id).map(|v| v.revision),
            RecordKey::Payment(id) => self.payments.get(id).map(|v| v.revision),
        }
    }

    fn apply(&mut self, record: Record, revision: Revision) {
        match record {
            Record::Event(event) => {
                self.events.insert(event.id.clone(), Versioned::new(event, revision));
            }
            Record::Ticket(ticket) => {
                self.tickets
                    .insert(ticket.id.clone(), Versioned::new(ticket, revision));
            }
            Record::Order(order) => {
                self.orders.insert(order.id.clone(), Versioned::new(order, revision));
            }
            Record::Payment(payment) => {
                self.payments
                    .insert(payment.order_id.clone(), Versioned::new(payment, revision));
            }
        }
    }
}

impl InMemoryRecordStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn fetch_event(&self, id: &EventId) -> StoreResult<Option<Versioned<EventRecord>>> {
        let tables = self.inner.read().expect("RwLock poisoned");
        Ok(tables.events.get(id).cloned())
    }

    async fn fetch_ticket(&self, id: &TicketId) -> StoreResult<Option<Versioned<TicketRecord>>> {
        let tables = self.inner.read().expect("RwLock poisoned");
        Ok(tables.tickets.get(id).cloned())
    }

    async fn fetch_order(&self, id: &OrderId) -> StoreResult<Option<Versioned<OrderRecord>>> {
        let tables = self.inner.read().expect("RwLock poisoned");
        Ok(tables.orders.get(id).cloned())
    }

    async fn fetch_payment(
        &self,
        order_id: &OrderId,
    ) -> StoreResult<Option<Versioned<PaymentRecord>>> {
        let tables = self.inner.read().expect("RwLock poisoned");
        Ok(tables.payments.get(order_id).cloned())
    }

    async fn active_ticket_count(&self, event_id: &EventId) -> StoreResult<u32> {
        let tables = self.inner.read().expect("RwLock poisoned");
        let count = tables
            .tickets
            .values()
            .filter(|v| &v.record.event_id == event_id && v.record.status.occupies_capacity())
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn commit(&self, writes: Vec<RecordWrite>) -> StoreResult<()> {
        let mut tables = self.inner.write().expect("RwLock poisoned");

        // First, verify every expectation against the pre-commit state.
        for write in &writes {
            let key = write.record.key();
            let current = tables.revision_of(&key);
            match write.expected {
                Expected::New => {
                    if let Some(current) = current {
                        return Err(StoreError::VersionConflict {
                            key,
                            expected: Revision::initial(),
                            current,
                        });
                    }
                }
                Expected::Exact(expected) => {
                    let current = current.unwrap_or_else(Revision::initial);
                    if current != expected {
                        return Err(StoreError::VersionConflict {
                            key,
                            expected,
                            current,
                        });
                    }
                }
                Expected::Any => {}
            }
        }

        // All expectations hold; apply the whole batch.
        for write in writes {
            let key = write.record.key();
            let next = tables
                .revision_of(&key)
                .unwrap_or_else(Revision::initial)
                .next();
            tables.apply(write.record, next);
        }

        Ok(())
    }
}
