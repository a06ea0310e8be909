//! The service facade.
//!
//! [`BoxOffice`] wires a [`RecordStore`] backend and a [`PaymentGateway`]
//! client together and exposes the public operations; the per-operation
//! logic lives in the sibling modules (`catalog`, `issuer`, `orders`,
//! `intent`, `settlement`), each implemented as an `impl` block on this
//! type. This module only carries the two shared mechanisms: the
//! optimistic-concurrency retry loop and the timeout-bounded gateway call.

use crate::config::BoxOfficeConfig;
use crate::errors::{GatewayError, TicketingError, TicketingResult};
use crate::gateway::PaymentGateway;
use crate::store::RecordStore;
use std::future::Future;
use tracing::warn;

/// The ticket sales service.
///
/// Cheap to share behind an `Arc`; every operation takes `&self` and runs as
/// an independent unit of work against the store.
#[derive(Debug)]
pub struct BoxOffice<S, G> {
    pub(crate) store: S,
    pub(crate) gateway: G,
    pub(crate) config: BoxOfficeConfig,
}

impl<S, G> BoxOffice<S, G>
where
    S: RecordStore,
    G: PaymentGateway,
{
    /// Create a service with default configuration.
    pub fn new(store: S, gateway: G) -> Self {
        Self::with_config(store, gateway, BoxOfficeConfig::default())
    }

    /// Create a service with explicit configuration.
    pub const fn with_config(store: S, gateway: G, config: BoxOfficeConfig) -> Self {
        Self {
            store,
            gateway,
            config,
        }
    }

    /// The underlying record store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Run `body` until it succeeds, fails non-retryably, or exhausts the
    /// retry budget. Only concurrency conflicts are retried; the body must
    /// re-read all state on every attempt.
    pub(crate) async fn with_retry<T, Fut>(
        &self,
        operation: &'static str,
        mut body: impl FnMut() -> Fut,
    ) -> TicketingResult<T>
    where
        Fut: Future<Output = TicketingResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match body().await {
                Err(err) if err.is_retryable() && attempt < self.config.retry.max_attempts => {
                    warn!(
                        operation,
                        attempt,
                        error = %err,
                        "lost an optimistic-concurrency race, retrying"
                    );
                    tokio::time::sleep(self.config.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// Await a gateway call under the configured deadline. Failures and
    /// timeouts surface as `UpstreamUnavailable`; no record is mutated here.
    pub(crate) async fn gateway_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> TicketingResult<T> {
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                warn!(operation, error = %err, "gateway call failed");
                Err(TicketingError::UpstreamUnavailable(err))
            }
            Err(_) => {
                let timeout = self.config.gateway_timeout;
                warn!(operation, ?timeout, "gateway call timed out");
                Err(TicketingError::UpstreamUnavailable(GatewayError::Timeout(
                    timeout,
                )))
            }
        }
    }
}
