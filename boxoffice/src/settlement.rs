//! Settlement reconciliation.
//!
//! The single entry point that turns a gateway-reported outcome into the
//! consistent (payment, order, tickets) status triple. Both delivery paths,
//! the synchronous card confirmation and the asynchronous webhook, produce
//! a [`SettlementNotice`] and funnel through [`BoxOffice::settle`], so the
//! outcome mapping and the idempotency rules exist in exactly one place.
//!
//! Idempotency key is the order id: the gateway may assign a fresh payment
//! id to a retried attempt on the same order, so the payment row is looked
//! up by order, updated in place, and never duplicated. The whole triple is
//! committed as one batch; a reader never observes a completed payment on a
//! still-pending order.

use crate::errors::{TicketingError, TicketingResult};
use crate::gateway::{
    ChargeRequest, OutcomeReport, PayerInfo, PaymentGateway, WebhookNotice, PAYMENT_TOPIC,
};
use crate::records::PaymentRecord;
use crate::service::BoxOffice;
use crate::status::GatewayOutcome;
use crate::store::{Record, RecordStore, RecordWrite, Versioned};
use crate::types::{
    CardToken, GatewayPaymentId, Installments, Money, OrderId, PaymentId, PaymentMethod,
    Timestamp,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

/// A gateway outcome normalized for reconciliation, whichever path it
/// arrived by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementNotice {
    /// The gateway's id for the payment attempt.
    pub gateway_payment_id: GatewayPaymentId,
    /// Raw outcome string; parsed here, centrally.
    pub status: String,
    /// The external reference the gateway echoed back: our order id.
    pub external_reference: Option<String>,
    /// The amount the gateway processed.
    pub amount: Money,
    /// Payment method, when reported.
    pub method: Option<PaymentMethod>,
}

impl From<OutcomeReport> for SettlementNotice {
    fn from(report: OutcomeReport) -> Self {
        Self {
            gateway_payment_id: report.gateway_payment_id,
            status: report.status,
            external_reference: report.external_reference,
            amount: report.amount,
            method: report.method,
        }
    }
}

/// What a settlement call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReceipt {
    /// The order the callback settled against.
    pub order_id: OrderId,
    /// The parsed outcome.
    pub outcome: GatewayOutcome,
    /// `false` when the callback was a stale `pending` after a terminal
    /// settlement and was deliberately not applied.
    pub applied: bool,
}

/// Result of processing a webhook notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookReceipt {
    /// The notification's topic is not about payments; acknowledged as-is.
    Ignored,
    /// The notification was resolved and settled.
    Settled(SettlementReceipt),
}

/// A synchronous card confirmation from the client-side checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPaymentRequest {
    /// The order being paid.
    pub order_id: OrderId,
    /// Single-use card token.
    pub card_token: CardToken,
    /// Number of installments.
    pub installments: Installments,
    /// Payer identity.
    pub payer: PayerInfo,
    /// The amount the client was shown.
    pub amount: Money,
}

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Apply a gateway-reported outcome to the payment, the order, and every
    /// ticket bound to it, as one atomic unit.
    ///
    /// Safe to call any number of times with the same notice: the payment
    /// row is keyed by order and updated in place, and terminal order states
    /// only re-admit the outcome they were settled with. A `pending`
    /// arriving after a terminal outcome is a logged no-op; a contradicting
    /// terminal outcome is refused loudly with no mutation.
    #[instrument(
        skip(self, notice),
        fields(gateway_payment_id = %notice.gateway_payment_id, status = %notice.status)
    )]
    pub async fn settle(&self, notice: &SettlementNotice) -> TicketingResult<SettlementReceipt> {
        self.with_retry("settle", || self.try_settle(notice)).await
    }

    async fn try_settle(&self, notice: &SettlementNotice) -> TicketingResult<SettlementReceipt> {
        let outcome: GatewayOutcome = notice.status.parse().map_err(|err| {
            error!(
                status = %notice.status,
                gateway_payment_id = %notice.gateway_payment_id,
                "gateway reported an outcome this system does not model"
            );
            TicketingError::from(err)
        })?;

        let order_id = notice
            .external_reference
            .as_ref()
            .and_then(|raw| OrderId::try_new(raw.clone()).ok());
        let Some(order_id) = order_id else {
            error!(
                reference = ?notice.external_reference,
                gateway_payment_id = %notice.gateway_payment_id,
                "settlement callback carries no usable external reference; flagging for manual follow-up"
            );
            return Err(TicketingError::MissingReference {
                reference: notice.external_reference.clone(),
            });
        };

        let Some(Versioned {
            record: order,
            revision: order_revision,
        }) = self.store.fetch_order(&order_id).await?
        else {
            error!(%order_id, "settlement callback for a missing order; flagging for manual follow-up");
            return Err(TicketingError::OrderNotFound(order_id));
        };

        let mut tickets = Vec::with_capacity(order.ticket_ids.len());
        for ticket_id in &order.ticket_ids {
            let Some(versioned) = self.store.fetch_ticket(ticket_id).await? else {
                error!(%order_id, %ticket_id, "order references a missing ticket");
                return Err(TicketingError::Internal(format!(
                    "order {order_id} references missing ticket {ticket_id}"
                )));
            };
            tickets.push(versioned);
        }

        let existing_payment = self.store.fetch_payment(&order_id).await?;
        let mapped = outcome.statuses();

        if !order.status.permits(mapped.order) {
            if outcome == GatewayOutcome::Pending {
                warn!(
                    %order_id,
                    current = %order.status,
                    "stale pending callback after terminal settlement, ignoring"
                );
                return Ok(SettlementReceipt {
                    order_id,
                    outcome,
                    applied: false,
                });
            }
            error!(
                %order_id,
                current = %order.status,
                reported = %outcome,
                "gateway outcome contradicts an already-settled order"
            );
            return Err(TicketingError::Conflict(format!(
                "order {order_id} is already {}, refusing {outcome}",
                order.status
            )));
        }

        if notice.amount != order.total_price {
            warn!(
                %order_id,
                reported = %notice.amount,
                expected = %order.total_price,
                "settled amount differs from order total"
            );
        }

        let payment_write = match &existing_payment {
            Some(versioned) => {
                let mut payment = versioned.record.clone();
                payment.status = mapped.payment;
                payment.amount = notice.amount;
                payment.gateway_payment_id = notice.gateway_payment_id.clone();
                if notice.method.is_some() {
                    payment.method = notice.method.clone();
                }
                RecordWrite::update(versioned.revision, Record::Payment(payment))
            }
            None => RecordWrite::create(Record::Payment(PaymentRecord {
                id: PaymentId::generate(),
                order_id: order_id.clone(),
                amount: notice.amount,
                method: notice.method.clone(),
                status: mapped.payment,
                gateway_payment_id: notice.gateway_payment_id.clone(),
                created_at: Timestamp::now(),
            })),
        };

        let mut writes = Vec::with_capacity(tickets.len() + 2);
        writes.push(payment_write);
        let mut settled_order = order;
        settled_order.status = mapped.order;
        writes.push(RecordWrite::update(order_revision, Record::Order(settled_order)));
        for Versioned {
            record: mut ticket,
            revision,
        } in tickets
        {
            ticket.status = mapped.ticket;
            writes.push(RecordWrite::update(revision, Record::Ticket(ticket)));
        }
        self.store.commit(writes).await?;

        info!(
            %order_id,
            %outcome,
            order_status = %mapped.order,
            "settlement applied"
        );
        Ok(SettlementReceipt {
            order_id,
            outcome,
            applied: true,
        })
    }

    /// Charge a tokenized card for an order and settle the result.
    ///
    /// The pre-check keeps us from charging a card for an order that is gone
    /// or already settled; after the charge, the gateway's report funnels
    /// through [`Self::settle`] exactly like a webhook would.
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    pub async fn confirm_payment(
        &self,
        request: CardPaymentRequest,
    ) -> TicketingResult<SettlementReceipt> {
        let Some(Versioned { record: order, .. }) =
            self.store.fetch_order(&request.order_id).await?
        else {
            return Err(TicketingError::OrderNotFound(request.order_id));
        };
        if order.status.is_terminal() {
            return Err(TicketingError::InvalidState(format!(
                "order {} is already {}",
                order.id, order.status
            )));
        }

        let charge = ChargeRequest {
            amount: request.amount,
            external_reference: order.id,
            card_token: request.card_token,
            installments: request.installments,
            payer: request.payer,
        };
        let report = self.gateway_call("charge", self.gateway.charge(charge)).await?;
        self.settle(&SettlementNotice::from(report)).await
    }

    /// Process an inbound gateway webhook.
    ///
    /// Non-payment topics are acknowledged and ignored. Payment topics only
    /// carry a payment id, so the full outcome is fetched back from the
    /// gateway before settling.
    #[instrument(skip(self, notice), fields(notification_id = %notice.id, topic = %notice.topic))]
    pub async fn handle_webhook(&self, notice: &WebhookNotice) -> TicketingResult<WebhookReceipt> {
        if notice.topic != PAYMENT_TOPIC {
            debug!("ignoring non-payment webhook");
            return Ok(WebhookReceipt::Ignored);
        }

        let Some(payment_id) = &notice.resource else {
            error!("payment webhook without a payment id; flagging for manual follow-up");
            return Err(TicketingError::MissingReference { reference: None });
        };

        let report = self
            .gateway_call("fetch_outcome", self.gateway.fetch_outcome(payment_id))
            .await?;
        let receipt = self.settle(&SettlementNotice::from(report)).await?;
        Ok(WebhookReceipt::Settled(receipt))
    }
}
