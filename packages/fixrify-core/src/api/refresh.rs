//! Single-flight credential renewal.
//!
//! Several requests sharing one expired access token can fail with 401 at the
//! same time. Issuing one renewal per failure is wrong: if the backend
//! invalidates a refresh credential on use, only the first would succeed and
//! the rest would fail needlessly. The coordinator guarantees that at most
//! one renewal is in flight; every other caller queues and shares its
//! outcome.

use crate::api::transport::{ApiRequest, Transport};
use crate::error::EventSink;
use crate::session::TokenStore;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    InFlight,
}

/// What the shared renewal settled to. Cheap to clone: every queued caller
/// receives a copy and replays its own request with the new credential.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    Renewed { access_token: String },
    Failed,
}

/// `POST /auth/refresh` response. The refresh credential itself is not
/// rotated by the backend.
#[derive(Debug, Deserialize)]
struct RefreshPayload {
    access_token: String,
}

struct Inner {
    state: RefreshState,
    /// FIFO: waiters are notified in enqueue order when the renewal settles.
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    store: Arc<TokenStore>,
    events: Arc<dyn EventSink>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<TokenStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                waiters: Vec::new(),
            }),
            store,
            events,
        }
    }

    /// Called by the pipeline when a request came back 401. Resolves when the
    /// (possibly already in-flight) renewal settles.
    ///
    /// The check-and-set below is atomic: the lock is taken and released with
    /// no await point inside, so two callers can never both observe `Idle`.
    pub async fn renew(&self, transport: &dyn Transport) -> RefreshOutcome {
        let waiter = {
            let mut inner = self.inner.lock().expect("refresh state lock poisoned");
            match inner.state {
                RefreshState::InFlight => {
                    let (tx, rx) = oneshot::channel();
                    inner.waiters.push(tx);
                    Some(rx)
                }
                RefreshState::Idle => {
                    inner.state = RefreshState::InFlight;
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            tracing::debug!("renewal already in flight, queueing");
            // The sender is dropped only after settle(), so a recv error can
            // only mean the leader panicked; treat it as a failed renewal.
            return rx.await.unwrap_or(RefreshOutcome::Failed);
        }

        let outcome = self.run_renewal(transport).await;
        self.settle(outcome.clone());
        outcome
    }

    async fn run_renewal(&self, transport: &dyn Transport) -> RefreshOutcome {
        let session = self.store.get();
        let Some(refresh_token) = session.refresh_token.clone() else {
            tracing::warn!("401 with no refresh credential, forcing logout");
            self.force_logout();
            return RefreshOutcome::Failed;
        };

        tracing::debug!("renewing access credential");
        let request =
            ApiRequest::post("/auth/refresh", serde_json::json!({})).with_bearer(refresh_token);

        match transport.send(&request).await {
            Ok(response) if response.is_success() => match response.json::<RefreshPayload>() {
                Ok(payload) => {
                    let mut renewed = session;
                    renewed.access_token = Some(payload.access_token.clone());
                    if let Err(e) = self.store.set(renewed) {
                        tracing::warn!("failed to persist renewed session: {:#}", e);
                    }
                    tracing::info!("access credential renewed");
                    RefreshOutcome::Renewed {
                        access_token: payload.access_token,
                    }
                }
                Err(e) => {
                    tracing::warn!("malformed refresh response: {}", e);
                    self.force_logout();
                    RefreshOutcome::Failed
                }
            },
            Ok(response) => {
                tracing::warn!(status = response.status, "refresh credential rejected");
                self.force_logout();
                RefreshOutcome::Failed
            }
            Err(e) => {
                tracing::warn!("renewal transport failure: {}", e);
                self.force_logout();
                RefreshOutcome::Failed
            }
        }
    }

    /// Forced logout: clear storage once and signal a single login redirect,
    /// regardless of how many callers are queued on this renewal. Also used
    /// by the pipeline when a replayed request is rejected outright.
    pub(crate) fn force_logout(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("failed to clear session storage: {:#}", e);
        }
        self.events.redirect_to_login();
    }

    fn settle(&self, outcome: RefreshOutcome) {
        let waiters = {
            let mut inner = self.inner.lock().expect("refresh state lock poisoned");
            inner.state = RefreshState::Idle;
            std::mem::take(&mut inner.waiters)
        };
        for waiter in waiters {
            // A dropped receiver just means the caller went away.
            let _ = waiter.send(outcome.clone());
        }
    }
}
