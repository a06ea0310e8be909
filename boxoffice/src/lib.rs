//! `BoxOffice` - capacity-bounded ticket sales with idempotent settlement
//!
//! This crate keeps three dependent records (ticket, order, payment)
//! consistent under concurrent purchase attempts and duplicated,
//! possibly out-of-order callbacks from an external payment gateway.
//! Correctness comes from the record store's transactional guarantees:
//! every operation reads records with their revisions and commits the full
//! set of dependent writes in one all-or-nothing batch, retrying when a
//! competing writer moved a revision first.
//!
//! The crate is storage- and gateway-agnostic: plug in any
//! [`RecordStore`] backend (see `boxoffice-memory` for the in-memory one)
//! and any [`PaymentGateway`] client.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod intent;
pub mod issuer;
pub mod orders;
pub mod records;
pub mod service;
pub mod settlement;
pub mod status;
pub mod store;
pub mod types;

pub use config::{BoxOfficeConfig, RetryConfig};
pub use errors::{
    GatewayError, GatewayResult, StoreError, StoreResult, TicketingError, TicketingResult,
};
pub use gateway::{
    ChargeRequest, IntentHandle, IntentRequest, OutcomeReport, PayerInfo, PaymentGateway,
    WebhookNotice, PAYMENT_TOPIC,
};
pub use records::{EventRecord, OrderRecord, PaymentRecord, TicketRecord};
pub use service::BoxOffice;
pub use settlement::{CardPaymentRequest, SettlementNotice, SettlementReceipt, WebhookReceipt};
pub use status::{GatewayOutcome, OrderStatus, PaymentStatus, StatusTriple, TicketStatus};
pub use store::{Expected, Record, RecordKey, RecordStore, RecordWrite, Versioned};
pub use types::{
    BuyerSnapshot, CardToken, EmailAddress, EventId, EventTitle, GatewayPaymentId, Installments,
    IntentId, Money, MoneyError, NationalId, NotificationId, OrderId, PaymentId, PaymentMethod,
    PersonName, PhoneNumber, Revision, TicketId, Timestamp, UserId,
};
