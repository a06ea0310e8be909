//! Settlement scenarios: the outcome mapping, idempotent and out-of-order
//! callback handling, both delivery paths, and intent creation.

mod common;

use boxoffice::{
    BoxOffice, CardPaymentRequest, CardToken, GatewayError, GatewayPaymentId, GatewayOutcome,
    Installments, NotificationId, OrderRecord, OrderStatus, OutcomeReport, PaymentStatus,
    RecordStore, SettlementNotice, TicketStatus, TicketingError, WebhookNotice, WebhookReceipt,
};
use boxoffice_memory::InMemoryRecordStore;
use common::{box_office, buyer, event_title, money, payer, price, FakeGateway};
use std::sync::Arc;
use std::time::Duration;

type Service = Arc<BoxOffice<InMemoryRecordStore, FakeGateway>>;

/// Two tickets at 100 each, aggregated into a pending order of 200.
async fn pending_order(service: &Service) -> OrderRecord {
    let event = service
        .register_event(event_title("Settled Nights"), price(100), Some(50), true)
        .await
        .unwrap();
    let first = service.issue_ticket(&event.id, buyer("1")).await.unwrap();
    let second = service.issue_ticket(&event.id, buyer("2")).await.unwrap();
    service
        .create_order(None, &[first.id, second.id])
        .await
        .unwrap()
}

fn notice(gateway_id: &str, status: &str, reference: Option<String>, cents: u64) -> SettlementNotice {
    SettlementNotice {
        gateway_payment_id: GatewayPaymentId::try_new(gateway_id.to_string()).unwrap(),
        status: status.to_string(),
        external_reference: reference,
        amount: money(cents),
        method: None,
    }
}

async fn assert_triple(
    store: &InMemoryRecordStore,
    order_id: &boxoffice::OrderId,
    payment: PaymentStatus,
    order: OrderStatus,
    ticket: TicketStatus,
) {
    let stored_payment = store.fetch_payment(order_id).await.unwrap().unwrap();
    assert_eq!(stored_payment.record.status, payment);

    let stored_order = store.fetch_order(order_id).await.unwrap().unwrap();
    assert_eq!(stored_order.record.status, order);

    for ticket_id in &stored_order.record.ticket_ids {
        let stored_ticket = store.fetch_ticket(ticket_id).await.unwrap().unwrap();
        assert_eq!(stored_ticket.record.status, ticket);
    }
}

#[tokio::test]
async fn an_approved_outcome_settles_the_whole_triple() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    let receipt = service
        .settle(&notice("g1", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    assert!(receipt.applied);
    assert_eq!(receipt.outcome, GatewayOutcome::Approved);
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn a_rejected_outcome_cancels_the_whole_triple() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    service
        .settle(&notice("g1", "rejected", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Failed,
        OrderStatus::Cancelled,
        TicketStatus::Cancelled,
    )
    .await;
}

#[tokio::test]
async fn repeating_a_settlement_verbatim_changes_nothing() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;
    let callback = notice("g1", "approved", Some(order.id.to_string()), 20_000);

    service.settle(&callback).await.unwrap();
    let first = store.fetch_payment(&order.id).await.unwrap().unwrap();

    let receipt = service.settle(&callback).await.unwrap();
    assert!(receipt.applied);

    let second = store.fetch_payment(&order.id).await.unwrap().unwrap();
    assert_eq!(second.record, first.record, "the payment row is updated in place");
    assert_eq!(second.record.id, first.record.id, "never a second payment row");
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn a_late_pending_callback_cannot_downgrade_a_settled_order() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    service
        .settle(&notice("g1", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    // A gateway retry delivers the older interim state out of order.
    let receipt = service
        .settle(&notice("g1", "pending", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();
    assert!(!receipt.applied);

    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn a_contradicting_terminal_outcome_is_refused_loudly() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    service
        .settle(&notice("g1", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    let result = service
        .settle(&notice("g2", "rejected", Some(order.id.to_string()), 20_000))
        .await;
    assert!(matches!(result, Err(TicketingError::Conflict(_))));

    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn a_pending_then_approved_sequence_reuses_the_payment_row() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    service
        .settle(&notice("g1", "pending", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();
    let interim = store.fetch_payment(&order.id).await.unwrap().unwrap();
    assert_eq!(interim.record.status, PaymentStatus::Pending);

    // The gateway re-issued a fresh payment id for the resolved attempt.
    service
        .settle(&notice("g2", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    let settled = store.fetch_payment(&order.id).await.unwrap().unwrap();
    assert_eq!(settled.record.id, interim.record.id);
    assert_eq!(settled.record.status, PaymentStatus::Completed);
    assert_eq!(settled.record.gateway_payment_id.as_ref(), "g2");
    assert_eq!(settled.record.created_at, interim.record.created_at);
}

#[tokio::test]
async fn an_unknown_outcome_mutates_nothing() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    let result = service
        .settle(&notice("g1", "charged_back", Some(order.id.to_string()), 20_000))
        .await;
    assert!(matches!(result, Err(TicketingError::UnknownOutcome(raw)) if raw == "charged_back"));

    assert!(store.fetch_payment(&order.id).await.unwrap().is_none());
    let stored_order = store.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored_order.record.status, OrderStatus::Pending);
    for ticket_id in &stored_order.record.ticket_ids {
        let ticket = store.fetch_ticket(ticket_id).await.unwrap().unwrap();
        assert_eq!(ticket.record.status, TicketStatus::Pending);
    }
}

#[tokio::test]
async fn a_callback_for_a_vanished_order_is_not_found_and_mutates_nothing() {
    let (service, store, _gateway) = box_office();
    let ghost = boxoffice::OrderId::generate();

    let result = service
        .settle(&notice("g1", "approved", Some(ghost.to_string()), 5_000))
        .await;
    assert!(matches!(result, Err(TicketingError::OrderNotFound(id)) if id == ghost));
    assert!(store.fetch_payment(&ghost).await.unwrap().is_none());
}

#[tokio::test]
async fn an_uncorrelatable_reference_is_flagged_for_manual_follow_up() {
    let (service, _store, _gateway) = box_office();

    let result = service.settle(&notice("g1", "approved", None, 5_000)).await;
    assert!(matches!(
        result,
        Err(TicketingError::MissingReference { reference: None })
    ));

    let result = service
        .settle(&notice("g1", "approved", Some("not-an-order".to_string()), 5_000))
        .await;
    assert!(matches!(
        result,
        Err(TicketingError::MissingReference { reference: Some(_) })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_callbacks_for_one_order_collapse_into_one_payment() {
    let (service, store, _gateway) = box_office();
    let order = pending_order(&service).await;

    // The synchronous confirmation and the webhook for the same attempt
    // arrive at once.
    let a = tokio::spawn({
        let service = Arc::clone(&service);
        let callback = notice("g1", "approved", Some(order.id.to_string()), 20_000);
        async move { service.settle(&callback).await }
    });
    let b = tokio::spawn({
        let service = Arc::clone(&service);
        let callback = notice("g2", "approved", Some(order.id.to_string()), 20_000);
        async move { service.settle(&callback).await }
    });

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let payment = store.fetch_payment(&order.id).await.unwrap().unwrap();
    assert_eq!(payment.record.status, PaymentStatus::Completed);
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn card_confirmation_funnels_through_settlement() {
    let (service, store, gateway) = box_office();
    let order = pending_order(&service).await;

    let receipt = service
        .confirm_payment(CardPaymentRequest {
            order_id: order.id.clone(),
            card_token: CardToken::try_new("tok-abc".to_string()).unwrap(),
            installments: Installments::try_new(1).unwrap(),
            payer: payer(),
            amount: money(20_000),
        })
        .await
        .unwrap();

    assert!(receipt.applied);
    assert_eq!(gateway.charge_calls(), 1);
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;

    let payment = store.fetch_payment(&order.id).await.unwrap().unwrap();
    assert!(payment.record.method.is_some());
}

#[tokio::test]
async fn a_declined_card_cancels_the_order() {
    let (service, store, gateway) = box_office();
    let order = pending_order(&service).await;
    gateway.script_charge_status("rejected");

    let receipt = service
        .confirm_payment(CardPaymentRequest {
            order_id: order.id.clone(),
            card_token: CardToken::try_new("tok-bad".to_string()).unwrap(),
            installments: Installments::try_new(3).unwrap(),
            payer: payer(),
            amount: money(20_000),
        })
        .await
        .unwrap();

    assert_eq!(receipt.outcome, GatewayOutcome::Rejected);
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Failed,
        OrderStatus::Cancelled,
        TicketStatus::Cancelled,
    )
    .await;
}

#[tokio::test]
async fn a_settled_order_is_never_charged_again() {
    let (service, _store, gateway) = box_office();
    let order = pending_order(&service).await;

    service
        .settle(&notice("g1", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();

    let result = service
        .confirm_payment(CardPaymentRequest {
            order_id: order.id,
            card_token: CardToken::try_new("tok-late".to_string()).unwrap(),
            installments: Installments::try_new(1).unwrap(),
            payer: payer(),
            amount: money(20_000),
        })
        .await;

    assert!(matches!(result, Err(TicketingError::InvalidState(_))));
    assert_eq!(gateway.charge_calls(), 0, "the card must not be charged");
}

#[tokio::test]
async fn a_payment_webhook_is_resolved_and_settled() {
    let (service, store, gateway) = box_office();
    let order = pending_order(&service).await;

    let gateway_payment_id = GatewayPaymentId::try_new("gw-hook-1".to_string()).unwrap();
    gateway.script_report(OutcomeReport {
        gateway_payment_id: gateway_payment_id.clone(),
        status: "approved".to_string(),
        external_reference: Some(order.id.to_string()),
        amount: money(20_000),
        method: None,
    });

    let receipt = service
        .handle_webhook(&WebhookNotice {
            id: NotificationId::try_new("n-1".to_string()).unwrap(),
            topic: "payment".to_string(),
            resource: Some(gateway_payment_id),
        })
        .await
        .unwrap();

    assert!(matches!(receipt, WebhookReceipt::Settled(r) if r.applied));
    assert_eq!(gateway.fetch_calls(), 1);
    assert_triple(
        &store,
        &order.id,
        PaymentStatus::Completed,
        OrderStatus::Paid,
        TicketStatus::Paid,
    )
    .await;
}

#[tokio::test]
async fn non_payment_webhooks_are_acknowledged_and_ignored() {
    let (service, _store, gateway) = box_office();

    let receipt = service
        .handle_webhook(&WebhookNotice {
            id: NotificationId::try_new("n-2".to_string()).unwrap(),
            topic: "merchant_order".to_string(),
            resource: None,
        })
        .await
        .unwrap();

    assert_eq!(receipt, WebhookReceipt::Ignored);
    assert_eq!(gateway.fetch_calls(), 0);
}

#[tokio::test]
async fn a_payment_webhook_without_a_resource_cannot_be_correlated() {
    let (service, _store, _gateway) = box_office();

    let result = service
        .handle_webhook(&WebhookNotice {
            id: NotificationId::try_new("n-3".to_string()).unwrap(),
            topic: "payment".to_string(),
            resource: None,
        })
        .await;

    assert!(matches!(
        result,
        Err(TicketingError::MissingReference { reference: None })
    ));
}

#[tokio::test]
async fn intent_creation_returns_a_handle_and_creates_no_payment() {
    let (service, _store, gateway) = box_office();
    let order = pending_order(&service).await;

    let handle = service
        .create_payment_intent(&order.id, payer())
        .await
        .unwrap();

    assert!(handle.intent_id.as_ref().starts_with("intent-"));
    assert_eq!(gateway.intent_calls(), 1);
    assert!(service
        .store()
        .fetch_payment(&order.id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn a_failing_gateway_surfaces_as_upstream_unavailable_without_mutation() {
    let (service, store, gateway) = box_office();
    let order = pending_order(&service).await;
    gateway.fail_calls();

    let result = service.create_payment_intent(&order.id, payer()).await;
    assert!(matches!(
        result,
        Err(TicketingError::UpstreamUnavailable(GatewayError::Transport(_)))
    ));

    let stored = store.fetch_order(&order.id).await.unwrap().unwrap();
    assert_eq!(stored.record.status, OrderStatus::Pending);
}

#[tokio::test]
async fn a_hanging_gateway_call_times_out() {
    let (service, _store, gateway) = box_office();
    let order = pending_order(&service).await;
    gateway.hang_for(Duration::from_secs(2));

    let result = service.create_payment_intent(&order.id, payer()).await;
    assert!(matches!(
        result,
        Err(TicketingError::UpstreamUnavailable(GatewayError::Timeout(_)))
    ));
}

#[tokio::test]
async fn intents_are_refused_for_missing_or_settled_orders() {
    let (service, _store, _gateway) = box_office();
    let ghost = boxoffice::OrderId::generate();
    assert!(matches!(
        service.create_payment_intent(&ghost, payer()).await,
        Err(TicketingError::OrderNotFound(_))
    ));

    let order = pending_order(&service).await;
    service
        .settle(&notice("g1", "approved", Some(order.id.to_string()), 20_000))
        .await
        .unwrap();
    assert!(matches!(
        service.create_payment_intent(&order.id, payer()).await,
        Err(TicketingError::InvalidState(_))
    ));
}
