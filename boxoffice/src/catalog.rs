//! Event registration and capacity administration.

use crate::errors::{TicketingError, TicketingResult};
use crate::gateway::PaymentGateway;
use crate::records::EventRecord;
use crate::service::BoxOffice;
use crate::store::{Record, RecordStore, RecordWrite, Versioned};
use crate::types::{EventId, EventTitle, Money};
use tracing::{info, instrument};

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Register a new sellable event.
    #[instrument(skip(self, title))]
    pub async fn register_event(
        &self,
        title: EventTitle,
        price: Money,
        capacity: Option<u32>,
        is_active: bool,
    ) -> TicketingResult<EventRecord> {
        let event = EventRecord::new(EventId::generate(), title, price, capacity, is_active);
        self.store
            .commit(vec![RecordWrite::create(Record::Event(event.clone()))])
            .await?;
        info!(event_id = %event.id, capacity = ?event.capacity, "event registered");
        Ok(event)
    }

    /// Change an event's capacity and recompute its saturation flag from the
    /// authoritative active-ticket count.
    ///
    /// Raising capacity above the active count reopens sales on a sold-out
    /// event. Lowering it below the active count is refused: already-issued
    /// admissions are never invalidated retroactively.
    #[instrument(skip(self))]
    pub async fn update_capacity(
        &self,
        event_id: &EventId,
        capacity: Option<u32>,
    ) -> TicketingResult<EventRecord> {
        self.with_retry("update_capacity", || {
            self.try_update_capacity(event_id, capacity)
        })
        .await
    }

    async fn try_update_capacity(
        &self,
        event_id: &EventId,
        capacity: Option<u32>,
    ) -> TicketingResult<EventRecord> {
        let Some(Versioned {
            record: mut event,
            revision,
        }) = self.store.fetch_event(event_id).await?
        else {
            return Err(TicketingError::EventNotFound(event_id.clone()));
        };

        let active = self.store.active_ticket_count(event_id).await?;
        if capacity.is_some_and(|cap| cap < active) {
            return Err(TicketingError::InvalidState(format!(
                "event {event_id} already has {active} active tickets, cannot cap at {capacity:?}"
            )));
        }

        event.capacity = capacity;
        event.sold_out = event.saturated_by(active);
        self.store
            .commit(vec![RecordWrite::update(revision, Record::Event(event.clone()))])
            .await?;
        info!(%event_id, capacity = ?event.capacity, sold_out = event.sold_out, "capacity updated");
        Ok(event)
    }
}
