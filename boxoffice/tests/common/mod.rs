//! Shared fixtures for the integration tests: a scripted fake gateway and
//! record builders.

#![allow(dead_code)]

use async_trait::async_trait;
use boxoffice::{
    BoxOffice, BoxOfficeConfig, BuyerSnapshot, ChargeRequest, EmailAddress, EventTitle,
    GatewayError, GatewayPaymentId, GatewayResult, IntentHandle, IntentId, IntentRequest, Money,
    NationalId, OutcomeReport, PayerInfo, PaymentGateway, PersonName,
};
use boxoffice::RetryConfig;
use boxoffice_memory::InMemoryRecordStore;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A payment gateway whose answers are scripted by the test.
#[derive(Clone, Default)]
pub struct FakeGateway {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    reports: HashMap<GatewayPaymentId, OutcomeReport>,
    charge_status: Option<String>,
    fail_calls: bool,
    hang_for: Option<Duration>,
    intent_calls: u32,
    fetch_calls: u32,
    charge_calls: u32,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the report returned by `fetch_outcome` for the report's own
    /// gateway payment id.
    pub fn script_report(&self, report: OutcomeReport) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .reports
            .insert(report.gateway_payment_id.clone(), report);
    }

    /// Script the status every subsequent `charge` call reports.
    pub fn script_charge_status(&self, status: &str) {
        self.inner.lock().unwrap().charge_status = Some(status.to_string());
    }

    /// Make every subsequent call fail at the transport level.
    pub fn fail_calls(&self) {
        self.inner.lock().unwrap().fail_calls = true;
    }

    /// Make every subsequent call stall for `duration` before answering.
    pub fn hang_for(&self, duration: Duration) {
        self.inner.lock().unwrap().hang_for = Some(duration);
    }

    pub fn intent_calls(&self) -> u32 {
        self.inner.lock().unwrap().intent_calls
    }

    pub fn fetch_calls(&self) -> u32 {
        self.inner.lock().unwrap().fetch_calls
    }

    pub fn charge_calls(&self) -> u32 {
        self.inner.lock().unwrap().charge_calls
    }

    async fn gate(&self) -> GatewayResult<()> {
        let (hang, fail) = {
            let inner = self.inner.lock().unwrap();
            (inner.hang_for, inner.fail_calls)
        };
        if let Some(duration) = hang {
            tokio::time::sleep(duration).await;
        }
        if fail {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_intent(&self, request: IntentRequest) -> GatewayResult<IntentHandle> {
        self.inner.lock().unwrap().intent_calls += 1;
        self.gate().await?;
        let intent_id = IntentId::try_new(format!("intent-{}", request.external_reference))
            .expect("intent id should be valid");
        Ok(IntentHandle { intent_id })
    }

    async fn fetch_outcome(&self, payment_id: &GatewayPaymentId) -> GatewayResult<OutcomeReport> {
        self.inner.lock().unwrap().fetch_calls += 1;
        self.gate().await?;
        let inner = self.inner.lock().unwrap();
        inner
            .reports
            .get(payment_id)
            .cloned()
            .ok_or_else(|| GatewayError::Contract(format!("no payment {payment_id}")))
    }

    async fn charge(&self, request: ChargeRequest) -> GatewayResult<OutcomeReport> {
        self.inner.lock().unwrap().charge_calls += 1;
        self.gate().await?;
        let inner = self.inner.lock().unwrap();
        let status = inner
            .charge_status
            .clone()
            .unwrap_or_else(|| "approved".to_string());
        Ok(OutcomeReport {
            gateway_payment_id: GatewayPaymentId::try_new(format!("gw-charge-{}", inner.charge_calls))
                .expect("gateway payment id should be valid"),
            status,
            external_reference: Some(request.external_reference.to_string()),
            amount: request.amount,
            method: Some(
                boxoffice::PaymentMethod::try_new("credit_card".to_string())
                    .expect("method should be valid"),
            ),
        })
    }
}

/// A service over a fresh memory store and fake gateway, plus handles to
/// both for direct inspection.
pub fn box_office() -> (
    Arc<BoxOffice<InMemoryRecordStore, FakeGateway>>,
    InMemoryRecordStore,
    FakeGateway,
) {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let store = InMemoryRecordStore::new();
    let gateway = FakeGateway::new();
    // Deep retry budget with short delays: contention tests pile many
    // writers onto one event, and the suite should stay fast.
    let config = BoxOfficeConfig::default()
        .with_retry(RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
        })
        .with_gateway_timeout(Duration::from_millis(250));
    let service = Arc::new(BoxOffice::with_config(
        store.clone(),
        gateway.clone(),
        config,
    ));
    (service, store, gateway)
}

pub fn money(cents: u64) -> Money {
    Money::from_cents(cents).expect("test amount should be valid")
}

pub fn price(units: i64) -> Money {
    Money::new(Decimal::new(units * 100, 2)).expect("test price should be valid")
}

pub fn buyer(tag: &str) -> BuyerSnapshot {
    BuyerSnapshot::new(
        PersonName::try_new(format!("Buyer{tag}")).expect("name should be valid"),
        PersonName::try_new("Tester".to_string()).expect("surname should be valid"),
        EmailAddress::try_new(format!("buyer.{tag}@example.com")).expect("email should be valid"),
        None,
        NationalId::try_new(format!("DOC{tag}")).expect("national id should be valid"),
    )
}

pub fn payer() -> PayerInfo {
    PayerInfo {
        email: EmailAddress::try_new("payer@example.com".to_string()).expect("email should be valid"),
        name: None,
        identification: None,
    }
}

pub fn event_title(s: &str) -> EventTitle {
    EventTitle::try_new(s.to_string()).expect("title should be valid")
}
