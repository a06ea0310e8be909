//! Payment-intent creation.
//!
//! Order creation and intent creation are deliberately separate steps: a
//! failed or timed-out gateway call leaves the order pending and retryable
//! without re-aggregating tickets. No payment record is created here: an
//! intent may never be completed, and payment rows exist only once the
//! gateway reports an outcome.

use crate::errors::{TicketingError, TicketingResult};
use crate::gateway::{IntentHandle, IntentRequest, PayerInfo, PaymentGateway};
use crate::service::BoxOffice;
use crate::status::OrderStatus;
use crate::store::{RecordStore, Versioned};
use crate::types::OrderId;
use tracing::{info, instrument};

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Request a checkout handle from the gateway for an order's total,
    /// carrying the order id as the external reference for settlement
    /// correlation.
    #[instrument(skip(self, payer))]
    pub async fn create_payment_intent(
        &self,
        order_id: &OrderId,
        payer: PayerInfo,
    ) -> TicketingResult<IntentHandle> {
        let Some(Versioned { record: order, .. }) = self.store.fetch_order(order_id).await? else {
            return Err(TicketingError::OrderNotFound(order_id.clone()));
        };
        if order.status != OrderStatus::Pending {
            return Err(TicketingError::InvalidState(format!(
                "order {} is already {}",
                order.id, order.status
            )));
        }

        let request = IntentRequest {
            amount: order.total_price,
            external_reference: order.id.clone(),
            payer,
        };
        let handle = self
            .gateway_call("create_intent", self.gateway.create_intent(request))
            .await?;

        info!(%order_id, intent_id = %handle.intent_id, "payment intent created");
        Ok(handle)
    }
}
