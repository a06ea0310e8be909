//! Payment-gateway port.
//!
//! Abstracts the external gateway's request/response/webhook contract. The
//! gateway's own processing is out of scope; this module only defines what
//! we send it and what it reports back. Implementations talk the concrete
//! wire protocol; the service layer bounds every call with a timeout and
//! never lets a gateway failure mutate local records.

use crate::errors::GatewayResult;
use crate::types::{
    CardToken, EmailAddress, GatewayPaymentId, Installments, IntentId, Money, NationalId,
    NotificationId, OrderId, PersonName, PaymentMethod,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The webhook topic carrying payment outcomes. Every other topic is
/// acknowledged and ignored.
pub const PAYMENT_TOPIC: &str = "payment";

/// Payer identity forwarded to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerInfo {
    /// Payer email, required by the gateway for receipts.
    pub email: EmailAddress,
    /// Payer name, when known.
    pub name: Option<PersonName>,
    /// Identity document, when known.
    pub identification: Option<NationalId>,
}

/// Request to open a payment intent for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRequest {
    /// Amount to charge: the order's total price.
    pub amount: Money,
    /// The order id, echoed back by the gateway on every callback so the
    /// settlement can be correlated.
    pub external_reference: OrderId,
    /// Payer identity.
    pub payer: PayerInfo,
}

/// Opaque handle the checkout UI uses to collect payment details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentHandle {
    /// The gateway's intent ("preference") id.
    pub intent_id: IntentId,
}

/// Request to charge a tokenized card directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeRequest {
    /// Amount to charge.
    pub amount: Money,
    /// The order id, for settlement correlation.
    pub external_reference: OrderId,
    /// Single-use card token from the client-side form.
    pub card_token: CardToken,
    /// Number of installments.
    pub installments: Installments,
    /// Payer identity.
    pub payer: PayerInfo,
}

/// A payment outcome as reported by the gateway.
///
/// Produced by both [`PaymentGateway::charge`] (synchronous confirmation)
/// and [`PaymentGateway::fetch_outcome`] (webhook resolution); the
/// settlement path treats the two identically. The status is kept raw here
/// and parsed centrally during settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeReport {
    /// The gateway's id for this payment attempt.
    pub gateway_payment_id: GatewayPaymentId,
    /// Raw status string (`approved`, `rejected`, `pending`, ...).
    pub status: String,
    /// The external reference the gateway echoes back, if it kept one.
    pub external_reference: Option<String>,
    /// The amount the gateway processed.
    pub amount: Money,
    /// Payment method, when reported.
    pub method: Option<PaymentMethod>,
}

/// An inbound webhook notification from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookNotice {
    /// The gateway's notification id.
    pub id: NotificationId,
    /// Topic of the notification; only [`PAYMENT_TOPIC`] is acted on.
    pub topic: String,
    /// The gateway payment id the notification points at, when present.
    pub resource: Option<GatewayPaymentId>,
}

/// The gateway contract consumed by the service layer.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment intent for an order's total amount.
    async fn create_intent(&self, request: IntentRequest) -> GatewayResult<IntentHandle>;

    /// Resolve a webhook notification that only carries a payment id into a
    /// full outcome report.
    async fn fetch_outcome(&self, payment_id: &GatewayPaymentId) -> GatewayResult<OutcomeReport>;

    /// Charge a tokenized card synchronously.
    async fn charge(&self, request: ChargeRequest) -> GatewayResult<OutcomeReport>;
}
