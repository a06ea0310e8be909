//! Ticket issuance, gated by the capacity guard.
//!
//! The guard's admission authority is the recount of active tickets, never
//! the event's cached `sold_out` flag. The event row rides in the same
//! commit as the new ticket at its observed revision, so concurrent
//! admissions for one event serialize on that revision and the recount
//! cannot go stale between check and commit. Settlement only ever shrinks
//! the active count, which keeps the recount an upper bound for the whole
//! window.

use crate::errors::{TicketingError, TicketingResult};
use crate::gateway::PaymentGateway;
use crate::records::TicketRecord;
use crate::service::BoxOffice;
use crate::store::{Record, RecordStore, RecordWrite, Versioned};
use crate::types::{BuyerSnapshot, EventId, TicketId, Timestamp};
use tracing::{debug, info, instrument};

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Issue a pending ticket for an event, bound to a snapshot of the
    /// buyer's identity.
    ///
    /// Fails with `SoldOut` once the event's active tickets (PENDING or
    /// PAID) have reached its capacity; a sold-out rejection is final until
    /// capacity is raised or a settlement cancels tickets, while an
    /// `UpstreamUnavailable` elsewhere in checkout is worth a client retry.
    #[instrument(skip(self, buyer))]
    pub async fn issue_ticket(
        &self,
        event_id: &EventId,
        buyer: BuyerSnapshot,
    ) -> TicketingResult<TicketRecord> {
        self.with_retry("issue_ticket", || self.try_issue(event_id, buyer.clone()))
            .await
    }

    async fn try_issue(
        &self,
        event_id: &EventId,
        buyer: BuyerSnapshot,
    ) -> TicketingResult<TicketRecord> {
        let Some(Versioned {
            record: mut event,
            revision,
        }) = self.store.fetch_event(event_id).await?
        else {
            return Err(TicketingError::EventNotFound(event_id.clone()));
        };

        if !event.is_active {
            return Err(TicketingError::InvalidState(format!(
                "event {event_id} is not on sale"
            )));
        }

        let active = self.store.active_ticket_count(event_id).await?;
        if event.saturated_by(active) {
            debug!(%event_id, active, capacity = ?event.capacity, "admission refused");
            return Err(TicketingError::SoldOut(event_id.clone()));
        }

        let ticket = TicketRecord::new(
            TicketId::generate(),
            event.id.clone(),
            buyer,
            Timestamp::now(),
        );
        event.sold_out = event.saturated_by(active + 1);

        self.store
            .commit(vec![
                RecordWrite::create(Record::Ticket(ticket.clone())),
                RecordWrite::update(revision, Record::Event(event)),
            ])
            .await?;

        info!(ticket_id = %ticket.id, %event_id, "ticket issued");
        Ok(ticket)
    }
}
