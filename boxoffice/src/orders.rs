//! Order aggregation.
//!
//! Binds a set of not-yet-ordered tickets into one order. The order row is
//! created and every ticket's `order_id` is set in a single commit: either
//! all tickets bind or none do. Two orders racing over overlapping tickets
//! cannot both win, because each ticket write states the revision the
//! aggregator read; the loser retries, re-reads, and finds the ticket bound.

use crate::errors::{TicketingError, TicketingResult};
use crate::gateway::PaymentGateway;
use crate::records::OrderRecord;
use crate::service::BoxOffice;
use crate::status::TicketStatus;
use crate::store::{Record, RecordStore, RecordWrite, Versioned};
use crate::types::{EventId, Money, OrderId, TicketId, Timestamp, UserId};
use std::collections::{HashMap, HashSet};
use tracing::{error, info, instrument};

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Aggregate tickets into a new pending order.
    ///
    /// The total price is the sum of each ticket's event price evaluated
    /// now, at binding time; later event price changes never reprice the
    /// order.
    #[instrument(skip(self, user_id, ticket_ids), fields(tickets = ticket_ids.len()))]
    pub async fn create_order(
        &self,
        user_id: Option<UserId>,
        ticket_ids: &[TicketId],
    ) -> TicketingResult<OrderRecord> {
        if ticket_ids.is_empty() {
            return Err(TicketingError::Validation(
                "an order needs at least one ticket".to_string(),
            ));
        }
        let distinct: HashSet<&TicketId> = ticket_ids.iter().collect();
        if distinct.len() != ticket_ids.len() {
            return Err(TicketingError::Validation(
                "duplicate ticket ids in order".to_string(),
            ));
        }

        self.with_retry("create_order", || {
            self.try_create_order(user_id.clone(), ticket_ids)
        })
        .await
    }

    async fn try_create_order(
        &self,
        user_id: Option<UserId>,
        ticket_ids: &[TicketId],
    ) -> TicketingResult<OrderRecord> {
        let mut tickets = Vec::with_capacity(ticket_ids.len());
        for ticket_id in ticket_ids {
            let Some(versioned) = self.store.fetch_ticket(ticket_id).await? else {
                return Err(TicketingError::TicketNotFound(ticket_id.clone()));
            };
            tickets.push(versioned);
        }

        for Versioned { record: ticket, .. } in &tickets {
            if let Some(bound_to) = &ticket.order_id {
                return Err(TicketingError::InvalidState(format!(
                    "ticket {} is already bound to order {bound_to}",
                    ticket.id
                )));
            }
            if ticket.status != TicketStatus::Pending {
                return Err(TicketingError::InvalidState(format!(
                    "ticket {} is {} and cannot be ordered",
                    ticket.id, ticket.status
                )));
            }
        }

        let mut prices: HashMap<EventId, Money> = HashMap::new();
        for Versioned { record: ticket, .. } in &tickets {
            if prices.contains_key(&ticket.event_id) {
                continue;
            }
            let Some(event) = self.store.fetch_event(&ticket.event_id).await? else {
                error!(ticket_id = %ticket.id, event_id = %ticket.event_id, "ticket references a missing event");
                return Err(TicketingError::Internal(format!(
                    "ticket {} references missing event {}",
                    ticket.id, ticket.event_id
                )));
            };
            prices.insert(ticket.event_id.clone(), event.record.price);
        }

        let mut total = Money::zero();
        for Versioned { record: ticket, .. } in &tickets {
            total = total.checked_add(prices[&ticket.event_id])?;
        }

        let order = OrderRecord::new(
            OrderId::generate(),
            user_id,
            total,
            ticket_ids.to_vec(),
            Timestamp::now(),
        );

        let mut writes = Vec::with_capacity(tickets.len() + 1);
        writes.push(RecordWrite::create(Record::Order(order.clone())));
        for Versioned {
            record: mut ticket,
            revision,
        } in tickets
        {
            ticket.order_id = Some(order.id.clone());
            writes.push(RecordWrite::update(revision, Record::Ticket(ticket)));
        }
        self.store.commit(writes).await?;

        info!(order_id = %order.id, total = %order.total_price, "order created");
        Ok(order)
    }
}
